//! Infrastructure layer - concrete implementations of domain ports

pub mod audit;
pub mod renderer;
pub mod session;
pub mod store;
pub mod strava;

pub use audit::SqliteAuditSink;
pub use renderer::CommandRenderer;
pub use session::{InMemorySessionStore, UnavailableSessionStore};
pub use store::FileConfigurationStore;
pub use strava::{AccessToken, StravaClient, StravaCredentials};
