//! Preview session stores

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::core::error::{FulfillmentError, Result};
use crate::resolution::SessionStore;

/// Ten years; longer lifetimes are clamped
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

struct SessionEntry {
    config: Value,
    expires_at: DateTime<Utc>,
}

/// Process-local session store with a fixed time to live
pub struct InMemorySessionStore {
    ttl: Duration,
    entries: RwLock<HashMap<String, SessionEntry>>,
}

impl InMemorySessionStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_secs.min(MAX_TTL_SECS) as i64),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, preview_id: impl Into<String>, config: Value) {
        self.insert_at(preview_id.into(), config, Utc::now()).await;
    }

    /// Expired entries are swept on every insert
    async fn insert_at(&self, preview_id: String, config: Value, now: DateTime<Utc>) {
        let expires_at = now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        let sweep_at = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > sweep_at);
        if entries.len() < before {
            tracing::debug!(
                evicted = before - entries.len(),
                "Swept expired preview sessions"
            );
        }
        entries.insert(preview_id, SessionEntry { config, expires_at });
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn find_by_preview_id(&self, preview_id: &str) -> Result<Option<Value>> {
        let now = Utc::now();
        {
            let entries = self.entries.read().await;
            match entries.get(preview_id) {
                None => return Ok(None),
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.config.clone())),
                Some(_) => {}
            }
        }

        tracing::debug!(preview_id = %preview_id, "Evicting expired preview session");
        self.entries.write().await.remove(preview_id);
        Ok(None)
    }
}

/// Stand-in used where no session backend is reachable
#[derive(Debug, Default)]
pub struct UnavailableSessionStore;

#[async_trait]
impl SessionStore for UnavailableSessionStore {
    async fn find_by_preview_id(&self, _preview_id: &str) -> Result<Option<Value>> {
        Err(FulfillmentError::fetch(
            "session storage is not reachable from the fulfillment context",
        ))
    }
}
