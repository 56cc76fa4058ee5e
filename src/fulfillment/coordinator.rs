//! Generation and lifecycle coordination
//!
//! Wraps resolution and rendering in one hard deadline, then records the
//! outcome against the audit trail and the configuration artifact.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::configuration::{ConfigSource, MapConfiguration};
use crate::core::error::{FulfillmentError, Result};
use crate::fulfillment::order::{LineItem, Order};
use crate::fulfillment::{
    AuditSink, FulfillmentResult, GenerationRecord, GenerationTracker, MapRenderer,
};
use crate::resolution::context::CONFIGURATION_ID;
use crate::resolution::{ConfigurationStore, ResolutionContext, ResolutionOrchestrator};

/// Drives one line item from order to rendered map
pub struct FulfillmentCoordinator {
    orchestrator: Arc<ResolutionOrchestrator>,
    renderer: Arc<dyn MapRenderer>,
    store: Arc<dyn ConfigurationStore>,
    audit: Arc<dyn AuditSink>,
    timeout: Duration,
}

impl FulfillmentCoordinator {
    pub fn new(
        orchestrator: Arc<ResolutionOrchestrator>,
        renderer: Arc<dyn MapRenderer>,
        store: Arc<dyn ConfigurationStore>,
        audit: Arc<dyn AuditSink>,
        timeout: Duration,
    ) -> Self {
        Self {
            orchestrator,
            renderer,
            store,
            audit,
            timeout,
        }
    }

    /// Resolve, render and record one line item.
    ///
    /// Audit and lifecycle failures never change the outcome. On success
    /// they are reported as warnings; on failure the original error is
    /// returned.
    pub async fn fulfill_order_line_item(
        &self,
        order: &Order,
        line_item: &LineItem,
    ) -> Result<FulfillmentResult> {
        let tracker = GenerationTracker::new(order.id, line_item.id);
        let context = ResolutionContext::new(order, line_item);

        tracing::info!(
            order_id = order.id,
            line_item_id = line_item.id,
            timeout_secs = self.timeout.as_secs(),
            "Starting map generation"
        );

        // Timing out drops the pipeline future, and any renderer child with it.
        let outcome = match tokio::time::timeout(self.timeout, self.pipeline(&context, &tracker)).await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(FulfillmentError::GenerationTimeout {
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        };

        match outcome {
            Ok((config, map_path)) => {
                tracker.succeeded();
                Ok(self.on_success(&context, &config, map_path).await)
            }
            Err(error) => {
                tracker.failed();
                self.on_failure(&context, &tracker, &error).await;
                Err(error)
            }
        }
    }

    async fn pipeline(
        &self,
        context: &ResolutionContext<'_>,
        tracker: &GenerationTracker,
    ) -> Result<(MapConfiguration, PathBuf)> {
        let config = self.orchestrator.resolve(context).await?;
        let source = config.source_or(ConfigSource::OrderProperties);
        tracker.rendering(source, config.config_id.as_deref());

        let map_path = self.renderer.render(&config).await?;
        if !tokio::fs::try_exists(&map_path).await.unwrap_or(false) {
            return Err(FulfillmentError::render(format!(
                "renderer reported {} but no file exists there",
                map_path.display()
            )));
        }

        Ok((config, map_path))
    }

    async fn on_success(
        &self,
        context: &ResolutionContext<'_>,
        config: &MapConfiguration,
        map_path: PathBuf,
    ) -> FulfillmentResult {
        let source = config.source_or(ConfigSource::OrderProperties);
        let mut warnings = Vec::new();

        let record = GenerationRecord::new(context.order, context.line_item, config, source, &map_path);
        if let Err(e) = self.audit.write_record(&record).await {
            tracing::warn!(
                order_id = context.order.id,
                line_item_id = context.line_item.id,
                error = %e,
                "Failed to write generation record"
            );
            warnings.push(format!("audit record not written: {e}"));
        }

        match config.config_id.as_deref() {
            Some(config_id) if source.is_persisted_artifact() => {
                match self.store.move_to_processed(config_id).await {
                    Ok(true) => {
                        tracing::info!(config_id = %config_id, "Configuration artifact marked processed")
                    }
                    Ok(false) => {
                        tracing::warn!(config_id = %config_id, "Configuration artifact was not pending");
                        warnings.push(format!("artifact {config_id} was not pending"));
                    }
                    Err(e) => {
                        tracing::warn!(config_id = %config_id, error = %e, "Failed to mark artifact processed");
                        warnings.push(format!("artifact {config_id} not marked processed: {e}"));
                    }
                }
            }
            _ => tracing::debug!(source = %source, "No persisted artifact to transition"),
        }

        tracing::info!(
            order_id = context.order.id,
            line_item_id = context.line_item.id,
            source = %source,
            map_path = %map_path.display(),
            warnings = warnings.len(),
            "Map generation succeeded"
        );

        FulfillmentResult {
            map_path,
            config_source: source,
            config_id: config.config_id.clone(),
            order_id: context.order.id,
            line_item_id: context.line_item.id,
            warnings,
        }
    }

    async fn on_failure(
        &self,
        context: &ResolutionContext<'_>,
        tracker: &GenerationTracker,
        error: &FulfillmentError,
    ) {
        tracing::error!(
            order_id = context.order.id,
            line_item_id = context.line_item.id,
            error_kind = error.kind(),
            error = %error,
            "Map generation failed"
        );

        let Some(config_id) = tracker
            .config_id()
            .or_else(|| context.property(CONFIGURATION_ID))
        else {
            return;
        };

        match self.store.move_to_failed(&config_id, &error.to_string()).await {
            Ok(moved) => {
                tracing::info!(config_id = %config_id, moved, "Configuration artifact marked failed")
            }
            Err(e) => {
                tracing::warn!(config_id = %config_id, error = %e, "Failed to mark artifact failed")
            }
        }
    }
}
