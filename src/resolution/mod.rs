//! Configuration resolution: the resolver chain and its collaborators

pub mod activity;
pub mod activity_api;
pub mod context;
pub mod declared;
pub mod orchestrator;
pub mod session;
pub mod traits;

pub use activity::{
    ActivityCheck, ActivityConfigBuilder, ActivityPreferences, NormalizedActivity,
    normalize_activity, validate_activity_for_rendering,
};
pub use activity_api::ActivityApiResolver;
pub use context::ResolutionContext;
pub use declared::DeclaredPropertiesResolver;
pub use orchestrator::ResolutionOrchestrator;
pub use session::SessionStorageResolver;
pub use traits::{ActivityApi, ConfigResolver, ConfigurationStore, SessionStore};
