//! Port interfaces for the fulfillment domain

use async_trait::async_trait;
use std::path::PathBuf;

use crate::configuration::MapConfiguration;
use crate::core::error::Result;
use crate::fulfillment::GenerationRecord;

/// External map renderer
#[async_trait]
pub trait MapRenderer: Send + Sync {
    /// Render the configuration and return the path of the produced image
    async fn render(&self, config: &MapConfiguration) -> Result<PathBuf>;
}

/// Write-once audit trail of generated maps
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist a record. Writing the same `(order, line item)` twice keeps
    /// the first record.
    async fn write_record(&self, record: &GenerationRecord) -> Result<()>;
}
