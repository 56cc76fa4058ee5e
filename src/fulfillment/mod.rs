//! Order fulfillment: the order model, rendering and lifecycle bookkeeping

pub mod coordinator;
pub mod order;
pub mod record;
pub mod tracker;
pub mod traits;

pub use coordinator::FulfillmentCoordinator;
pub use order::{Customer, LineItem, LineItemProperty, Order};
pub use record::{FulfillmentResult, GenerationRecord};
pub use tracker::{GenerationState, GenerationTracker};
pub use traits::{AuditSink, MapRenderer};
