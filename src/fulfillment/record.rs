//! Audit record and caller-facing result of one fulfillment

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::configuration::{ConfigSource, MapConfiguration};
use crate::fulfillment::order::{LineItem, Order};
use crate::geometry::{Orientation, PrintFormat};

/// Audit row written after a successful render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub order_id: u64,
    pub line_item_id: u64,
    pub order_name: Option<String>,
    pub config_source: ConfigSource,
    pub config_id: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: Option<PrintFormat>,
    pub orientation: Option<Orientation>,
    pub style: String,
    pub customer_email: Option<String>,
    pub customer_id: Option<u64>,
    pub map_path: PathBuf,
    pub created_at: DateTime<Utc>,
}

impl GenerationRecord {
    pub fn new(
        order: &Order,
        line_item: &LineItem,
        config: &MapConfiguration,
        source: ConfigSource,
        map_path: &Path,
    ) -> Self {
        Self {
            order_id: order.id,
            line_item_id: line_item.id,
            order_name: order.name.clone(),
            config_source: source,
            config_id: config.config_id.clone(),
            width: config.width,
            height: config.height,
            format: config.format,
            orientation: config.orientation,
            style: config.style.clone(),
            customer_email: order.customer_email().map(str::to_string),
            customer_id: order.customer_id(),
            map_path: map_path.to_path_buf(),
            created_at: Utc::now(),
        }
    }
}

/// What the caller gets back from a successful fulfillment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FulfillmentResult {
    pub map_path: PathBuf,
    pub config_source: ConfigSource,
    pub config_id: Option<String>,
    pub order_id: u64,
    pub line_item_id: u64,
    /// Failures of best-effort bookkeeping that did not affect the outcome
    pub warnings: Vec<String>,
}
