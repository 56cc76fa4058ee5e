//! Port interfaces for the resolution domain

use async_trait::async_trait;
use serde_json::Value;

use crate::configuration::{ConfigSource, MapConfiguration};
use crate::core::error::Result;
use crate::resolution::ResolutionContext;

/// Persisted configuration artifacts keyed by config id
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    /// Load the raw artifact document, `None` when it does not exist
    async fn load(&self, config_id: &str) -> Result<Option<Value>>;

    /// Mark a pending artifact as processed. `false` when it was not pending.
    async fn move_to_processed(&self, config_id: &str) -> Result<bool>;

    /// Mark a pending artifact as failed, recording the error
    async fn move_to_failed(&self, config_id: &str, error: &str) -> Result<bool>;
}

/// Short-lived preview sessions written by the storefront
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn find_by_preview_id(&self, preview_id: &str) -> Result<Option<Value>>;
}

/// Third-party activity API
#[async_trait]
pub trait ActivityApi: Send + Sync {
    /// Fetch a raw activity payload, optionally on behalf of a specific athlete
    async fn get_activity(&self, activity_id: &str, owner_hint: Option<&str>) -> Result<Value>;
}

/// One way of producing a map configuration for a line item
#[async_trait]
pub trait ConfigResolver: Send + Sync {
    /// Short name used in logs and error reports
    fn name(&self) -> &'static str;

    /// Provenance applied when the resolver does not set a finer one
    fn provenance(&self) -> ConfigSource;

    /// Try to produce a configuration. `Ok(None)` means "not applicable".
    async fn attempt(&self, context: &ResolutionContext<'_>) -> Result<Option<MapConfiguration>>;

    /// Infallible wrapper the orchestrator calls: errors are logged and
    /// turned into `None` so the next resolver can run.
    async fn resolve(&self, context: &ResolutionContext<'_>) -> Option<MapConfiguration> {
        match self.attempt(context).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    resolver = self.name(),
                    order_id = context.order.id,
                    line_item_id = context.line_item.id,
                    error_kind = e.kind(),
                    error = %e,
                    "Resolver failed, moving on"
                );
                None
            }
        }
    }
}
