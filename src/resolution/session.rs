//! Session storage resolver

use async_trait::async_trait;
use std::sync::Arc;

use crate::configuration::{ConfigSource, MapConfiguration};
use crate::core::error::Result;
use crate::resolution::context::{PREVIEW_ID, ResolutionContext};
use crate::resolution::{ConfigResolver, SessionStore};

/// Looks the line item's preview id up in the preview session store
pub struct SessionStorageResolver {
    sessions: Arc<dyn SessionStore>,
}

impl SessionStorageResolver {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl ConfigResolver for SessionStorageResolver {
    fn name(&self) -> &'static str {
        "session_storage"
    }

    fn provenance(&self) -> ConfigSource {
        ConfigSource::SessionStorage
    }

    async fn attempt(&self, context: &ResolutionContext<'_>) -> Result<Option<MapConfiguration>> {
        let Some(preview_id) = context.property(PREVIEW_ID) else {
            return Ok(None);
        };

        let Some(session) = self.sessions.find_by_preview_id(&preview_id).await? else {
            tracing::debug!(preview_id = %preview_id, "No preview session found");
            return Ok(None);
        };

        let config = MapConfiguration::from_candidate(session, self.provenance().as_str())?;
        tracing::info!(preview_id = %preview_id, "Configuration found in preview session");
        Ok(Some(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::FulfillmentError;
    use crate::fulfillment::order::{LineItem, LineItemProperty, Order};
    use serde_json::{Value, json};

    struct OneSession(Value);

    #[async_trait]
    impl SessionStore for OneSession {
        async fn find_by_preview_id(&self, preview_id: &str) -> Result<Option<Value>> {
            Ok((preview_id == "prev_1").then(|| self.0.clone()))
        }
    }

    struct BrokenSessions;

    #[async_trait]
    impl SessionStore for BrokenSessions {
        async fn find_by_preview_id(&self, _preview_id: &str) -> Result<Option<Value>> {
            Err(FulfillmentError::fetch("session backend unreachable"))
        }
    }

    fn session() -> Value {
        json!({
            "width": 3508,
            "height": 2480,
            "format": "A4",
            "orientation": "landscape",
            "center": [2.35, 48.86],
            "bounds": {"north": 48.9, "south": 48.82, "east": 2.4, "west": 2.3},
            "style": "mapbox://styles/mapbox/streets-v12",
            "route": {"coordinates": [[2.3, 48.82], [2.4, 48.9]]}
        })
    }

    fn item(preview_id: &str) -> (Order, LineItem) {
        let item = LineItem {
            id: 3,
            title: None,
            properties: vec![LineItemProperty::new("Preview ID", preview_id)],
        };
        let order = Order {
            id: 30,
            line_items: vec![item.clone()],
            ..Default::default()
        };
        (order, item)
    }

    #[tokio::test]
    async fn test_found_session() {
        let resolver = SessionStorageResolver::new(Arc::new(OneSession(session())));
        let (order, item) = item("prev_1");
        let config = resolver
            .attempt(&ResolutionContext::new(&order, &item))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(config.width, 3508);
        assert!(config.source.is_none());
    }

    #[tokio::test]
    async fn test_unknown_preview_is_not_applicable() {
        let resolver = SessionStorageResolver::new(Arc::new(OneSession(session())));
        let (order, item) = item("prev_2");
        let result = resolver.attempt(&ResolutionContext::new(&order, &item)).await;
        assert!(result.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_backend_error_becomes_none_in_resolve() {
        let resolver = SessionStorageResolver::new(Arc::new(BrokenSessions));
        let (order, item) = item("prev_1");
        let context = ResolutionContext::new(&order, &item);
        assert!(resolver.attempt(&context).await.is_err());
        assert!(resolver.resolve(&context).await.is_none());
    }
}
