//! Hand-written fakes shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use routeprint::configuration::MapConfiguration;
use routeprint::fulfillment::{
    AuditSink, GenerationRecord, LineItem, LineItemProperty, MapRenderer, Order,
};
use routeprint::resolution::{ActivityApi, ConfigurationStore, SessionStore};
use routeprint::{FulfillmentError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

pub fn order_with(properties: Vec<LineItemProperty>) -> Order {
    Order {
        id: 1001,
        name: Some("#1001".into()),
        email: Some("buyer@example.com".into()),
        customer: None,
        line_items: vec![LineItem {
            id: 1,
            title: Some("Route poster".into()),
            properties,
        }],
    }
}

#[derive(Default)]
pub struct FakeStore {
    pub documents: HashMap<String, Value>,
    pub fail_transitions: bool,
    pub loads: AtomicUsize,
    pub processed: Mutex<Vec<String>>,
    pub failed: Mutex<Vec<(String, String)>>,
}

impl FakeStore {
    pub fn with(config_id: &str, document: Value) -> Self {
        Self {
            documents: HashMap::from([(config_id.to_string(), document)]),
            ..Default::default()
        }
    }

    pub fn processed(&self) -> Vec<String> {
        self.processed.lock().unwrap().clone()
    }

    pub fn failed(&self) -> Vec<(String, String)> {
        self.failed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConfigurationStore for FakeStore {
    async fn load(&self, config_id: &str) -> Result<Option<Value>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.documents.get(config_id).cloned())
    }

    async fn move_to_processed(&self, config_id: &str) -> Result<bool> {
        if self.fail_transitions {
            return Err(FulfillmentError::LifecycleTransition("disk full".into()));
        }
        self.processed.lock().unwrap().push(config_id.to_string());
        Ok(true)
    }

    async fn move_to_failed(&self, config_id: &str, error: &str) -> Result<bool> {
        if self.fail_transitions {
            return Err(FulfillmentError::LifecycleTransition("disk full".into()));
        }
        self.failed
            .lock()
            .unwrap()
            .push((config_id.to_string(), error.to_string()));
        Ok(true)
    }
}

#[derive(Default)]
pub struct CountingSessions {
    pub sessions: HashMap<String, Value>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl SessionStore for CountingSessions {
    async fn find_by_preview_id(&self, preview_id: &str) -> Result<Option<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.sessions.get(preview_id).cloned())
    }
}

#[derive(Default)]
pub struct CountingApi {
    pub payload: Option<Value>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl ActivityApi for CountingApi {
    async fn get_activity(&self, activity_id: &str, _owner_hint: Option<&str>) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payload
            .clone()
            .ok_or_else(|| FulfillmentError::fetch(format!("activity {activity_id} not found")))
    }
}

pub enum RenderBehaviour {
    WritesFile,
    Fails,
    Hangs,
    ReportsMissingFile,
}

pub struct FakeRenderer {
    pub behaviour: RenderBehaviour,
    pub dir: TempDir,
    pub rendered: Mutex<Vec<MapConfiguration>>,
}

impl FakeRenderer {
    pub fn new(behaviour: RenderBehaviour) -> Self {
        Self {
            behaviour,
            dir: tempfile::tempdir().unwrap(),
            rendered: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.rendered.lock().unwrap().len()
    }
}

#[async_trait]
impl MapRenderer for FakeRenderer {
    async fn render(&self, config: &MapConfiguration) -> Result<PathBuf> {
        self.rendered.lock().unwrap().push(config.clone());
        let path = self.dir.path().join("map.png");
        match self.behaviour {
            RenderBehaviour::WritesFile => {
                std::fs::write(&path, b"png")?;
                Ok(path)
            }
            RenderBehaviour::Fails => Err(FulfillmentError::render("renderer crashed")),
            RenderBehaviour::Hangs => std::future::pending().await,
            RenderBehaviour::ReportsMissingFile => Ok(path),
        }
    }
}

#[derive(Default)]
pub struct FakeAudit {
    pub fail: bool,
    pub records: Mutex<Vec<GenerationRecord>>,
}

#[async_trait]
impl AuditSink for FakeAudit {
    async fn write_record(&self, record: &GenerationRecord) -> Result<()> {
        if self.fail {
            return Err(FulfillmentError::Audit("database locked".into()));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}
