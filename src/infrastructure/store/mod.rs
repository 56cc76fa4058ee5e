//! File-backed configuration store
//!
//! Artifacts live under `<root>/{pending,processed,failed}/<config id>.json`.
//! Transitions move files between the three directories and never delete
//! an artifact.

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::core::error::{FulfillmentError, Result};
use crate::resolution::ConfigurationStore;

static CONFIG_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,128}$").expect("valid regex"));

const PENDING: &str = "pending";
const PROCESSED: &str = "processed";
const FAILED: &str = "failed";

pub struct FileConfigurationStore {
    root: PathBuf,
}

impl FileConfigurationStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a new pending artifact, creating directories as needed
    pub async fn save_pending(&self, config_id: &str, document: &Value) -> Result<PathBuf> {
        let path = self.path(PENDING, config_id)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, serde_json::to_vec_pretty(document)?).await?;
        tracing::debug!(config_id = %config_id, path = %path.display(), "Saved pending artifact");
        Ok(path)
    }

    fn path(&self, state: &str, config_id: &str) -> Result<PathBuf> {
        if !CONFIG_ID.is_match(config_id) {
            return Err(FulfillmentError::fetch(format!(
                "invalid configuration id '{config_id}'"
            )));
        }
        Ok(self.root.join(state).join(format!("{config_id}.json")))
    }

    async fn read(path: &Path) -> Result<Option<Value>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FulfillmentError::fetch(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    /// Write `document` into `state` and remove the pending copy
    async fn transition(&self, config_id: &str, state: &str, document: &Value) -> Result<()> {
        let pending = self.path(PENDING, config_id)?;
        let target = self.path(state, config_id)?;
        let lifecycle = |e: std::io::Error| {
            FulfillmentError::LifecycleTransition(format!(
                "moving {config_id} to {state}: {e}"
            ))
        };

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(lifecycle)?;
        }
        let bytes = serde_json::to_vec_pretty(document)?;
        tokio::fs::write(&target, bytes).await.map_err(lifecycle)?;
        tokio::fs::remove_file(&pending).await.map_err(lifecycle)?;
        Ok(())
    }

    async fn pending_document(&self, config_id: &str) -> Result<Option<Value>> {
        let path = self.path(PENDING, config_id)?;
        Self::read(&path).await.map_err(|e| {
            FulfillmentError::LifecycleTransition(format!("reading pending {config_id}: {e}"))
        })
    }
}

#[async_trait]
impl ConfigurationStore for FileConfigurationStore {
    async fn load(&self, config_id: &str) -> Result<Option<Value>> {
        for state in [PENDING, PROCESSED, FAILED] {
            let path = self.path(state, config_id)?;
            if let Some(document) = Self::read(&path).await? {
                tracing::debug!(config_id = %config_id, state, "Loaded configuration artifact");
                return Ok(Some(document));
            }
        }
        Ok(None)
    }

    async fn move_to_processed(&self, config_id: &str) -> Result<bool> {
        let Some(mut document) = self.pending_document(config_id).await? else {
            return Ok(false);
        };
        if let Some(object) = document.as_object_mut() {
            object.insert("processedAt".into(), json!(Utc::now().to_rfc3339()));
        }
        self.transition(config_id, PROCESSED, &document).await?;
        Ok(true)
    }

    async fn move_to_failed(&self, config_id: &str, error: &str) -> Result<bool> {
        let Some(mut document) = self.pending_document(config_id).await? else {
            return Ok(false);
        };
        if let Some(object) = document.as_object_mut() {
            object.insert(
                "failure".into(),
                json!({"error": error, "failedAt": Utc::now().to_rfc3339()}),
            );
        }
        self.transition(config_id, FAILED, &document).await?;
        Ok(true)
    }
}
