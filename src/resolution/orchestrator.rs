//! Resolution orchestration - tries each resolver in priority order

use std::sync::Arc;

use crate::configuration::{MapConfiguration, validate_configuration};
use crate::core::config::RenderDefaults;
use crate::core::error::{FulfillmentError, Result};
use crate::resolution::{
    ActivityApi, ActivityApiResolver, ConfigResolver, ConfigurationStore,
    DeclaredPropertiesResolver, ResolutionContext, SessionStorageResolver, SessionStore,
};

/// Runs resolvers in order and returns the first valid configuration
pub struct ResolutionOrchestrator {
    resolvers: Vec<Arc<dyn ConfigResolver>>,
}

impl ResolutionOrchestrator {
    pub fn new(resolvers: Vec<Arc<dyn ConfigResolver>>) -> Self {
        Self { resolvers }
    }

    /// The standard chain: declared properties, then preview session, then
    /// the activity API
    pub fn standard(
        store: Arc<dyn ConfigurationStore>,
        sessions: Arc<dyn SessionStore>,
        api: Arc<dyn ActivityApi>,
        defaults: RenderDefaults,
    ) -> Self {
        let resolvers: Vec<Arc<dyn ConfigResolver>> = vec![
            Arc::new(DeclaredPropertiesResolver::new(store, defaults.clone())),
            Arc::new(SessionStorageResolver::new(sessions)),
            Arc::new(ActivityApiResolver::new(api, defaults)),
        ];
        Self::new(resolvers)
    }

    pub fn resolver_names(&self) -> Vec<&'static str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    /// Resolve the configuration for one line item.
    ///
    /// Later resolvers only run when earlier ones produced nothing usable.
    pub async fn resolve(&self, context: &ResolutionContext<'_>) -> Result<MapConfiguration> {
        let mut attempted = Vec::with_capacity(self.resolvers.len());

        for resolver in &self.resolvers {
            attempted.push(resolver.name().to_string());

            let Some(mut config) = resolver.resolve(context).await else {
                tracing::debug!(resolver = resolver.name(), "Resolver produced nothing");
                continue;
            };

            let report = validate_configuration(&serde_json::to_value(&config)?);
            if !report.valid {
                tracing::warn!(
                    resolver = resolver.name(),
                    missing = ?report.missing,
                    errors = ?report.errors,
                    "Resolver returned an invalid configuration, discarding"
                );
                continue;
            }

            config.tag_source(resolver.provenance());
            tracing::info!(
                order_id = context.order.id,
                line_item_id = context.line_item.id,
                resolver = resolver.name(),
                source = %config.source_or(resolver.provenance()),
                config_id = ?config.config_id,
                "Map configuration resolved"
            );
            return Ok(config);
        }

        tracing::error!(
            order_id = context.order.id,
            line_item_id = context.line_item.id,
            attempted = ?attempted,
            "No resolver produced a configuration"
        );
        Err(FulfillmentError::ConfigurationUnresolved {
            order_id: context.order.id,
            line_item_id: context.line_item.id,
            attempted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::ConfigSource;
    use crate::fulfillment::order::{LineItem, Order};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Outcome {
        Nothing,
        Fails,
        Produces(Option<ConfigSource>),
    }

    struct Scripted {
        name: &'static str,
        provenance: ConfigSource,
        outcome: Outcome,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(name: &'static str, provenance: ConfigSource, outcome: Outcome) -> Arc<Self> {
            Arc::new(Self {
                name,
                provenance,
                outcome,
                calls: AtomicUsize::new(0),
            })
        }
    }

    fn valid_config(source: Option<ConfigSource>) -> MapConfiguration {
        let mut config = MapConfiguration::from_candidate(
            json!({
                "width": 2480,
                "height": 3508,
                "center": [0.5, 0.5],
                "bounds": {"north": 1.0, "south": 0.0, "east": 1.0, "west": 0.0},
                "style": "mapbox://styles/mapbox/outdoors-v12",
                "route": {"coordinates": [[0.0, 0.0], [1.0, 1.0]]}
            }),
            "test",
        )
        .unwrap();
        config.source = source;
        config
    }

    #[async_trait]
    impl ConfigResolver for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        fn provenance(&self) -> ConfigSource {
            self.provenance
        }

        async fn attempt(&self, _context: &ResolutionContext<'_>) -> Result<Option<MapConfiguration>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.outcome {
                Outcome::Nothing => Ok(None),
                Outcome::Fails => Err(FulfillmentError::fetch("boom")),
                Outcome::Produces(source) => Ok(Some(valid_config(*source))),
            }
        }
    }

    fn order() -> (Order, LineItem) {
        let item = LineItem {
            id: 2,
            ..Default::default()
        };
        let order = Order {
            id: 1,
            line_items: vec![item.clone()],
            ..Default::default()
        };
        (order, item)
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let a = Scripted::new(
            "a",
            ConfigSource::OrderProperties,
            Outcome::Produces(Some(ConfigSource::JsonFile)),
        );
        let b = Scripted::new("b", ConfigSource::SessionStorage, Outcome::Produces(None));
        let chain: Vec<Arc<dyn ConfigResolver>> = vec![a.clone(), b.clone()];
        let orchestrator = ResolutionOrchestrator::new(chain);
        let (order, item) = order();

        let config = orchestrator
            .resolve(&ResolutionContext::new(&order, &item))
            .await
            .unwrap();

        assert_eq!(config.source, Some(ConfigSource::JsonFile));
        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
        assert_eq!(b.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failures_fall_through_and_provenance_applies() {
        let a = Scripted::new("a", ConfigSource::OrderProperties, Outcome::Fails);
        let b = Scripted::new("b", ConfigSource::SessionStorage, Outcome::Nothing);
        let c = Scripted::new(
            "c",
            ConfigSource::StravaApiReconstruction,
            Outcome::Produces(None),
        );
        let chain: Vec<Arc<dyn ConfigResolver>> = vec![a, b, c];
        let orchestrator = ResolutionOrchestrator::new(chain);
        let (order, item) = order();

        let config = orchestrator
            .resolve(&ResolutionContext::new(&order, &item))
            .await
            .unwrap();
        assert_eq!(config.source, Some(ConfigSource::StravaApiReconstruction));
    }

    #[tokio::test]
    async fn test_all_exhausted_lists_attempts() {
        let chain: Vec<Arc<dyn ConfigResolver>> = vec![
            Scripted::new("a", ConfigSource::OrderProperties, Outcome::Nothing),
            Scripted::new("b", ConfigSource::SessionStorage, Outcome::Fails),
        ];
        let orchestrator = ResolutionOrchestrator::new(chain);
        let (order, item) = order();

        match orchestrator.resolve(&ResolutionContext::new(&order, &item)).await {
            Err(FulfillmentError::ConfigurationUnresolved {
                order_id,
                line_item_id,
                attempted,
            }) => {
                assert_eq!((order_id, line_item_id), (1, 2));
                assert_eq!(attempted, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("Expected ConfigurationUnresolved, got {other:?}"),
        }
    }
}
