//! SQLite-backed generation audit trail

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Row, params};
use std::path::PathBuf;

use crate::configuration::ConfigSource;
use crate::core::error::{FulfillmentError, Result};
use crate::fulfillment::{AuditSink, GenerationRecord};
use crate::geometry::{Orientation, PrintFormat};

const IN_MEMORY: &str = ":memory:";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS generation_records (
    order_id INTEGER NOT NULL,
    line_item_id INTEGER NOT NULL,
    order_name TEXT,
    config_source TEXT NOT NULL,
    config_id TEXT,
    width INTEGER NOT NULL,
    height INTEGER NOT NULL,
    format TEXT,
    orientation TEXT,
    style TEXT NOT NULL,
    customer_email TEXT,
    customer_id INTEGER,
    map_path TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (order_id, line_item_id)
)";

/// Write-once audit sink over a pooled SQLite database
pub struct SqliteAuditSink {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAuditSink {
    /// Open (or create) the database at `database_path`. `":memory:"` gives
    /// a private in-memory database.
    pub async fn open(database_path: &str) -> Result<Self> {
        let (manager, max_size) = if database_path == IN_MEMORY {
            // Every in-memory connection is its own database, so keep one.
            (SqliteConnectionManager::memory(), 1)
        } else {
            (SqliteConnectionManager::file(database_path), 4)
        };

        let pool = Pool::builder()
            .max_size(max_size)
            .build(manager)
            .map_err(|e| {
                FulfillmentError::Audit(format!("Failed to create connection pool: {e}"))
            })?;

        let sink = Self { pool };
        sink.with_connection(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL").ok();
            conn.execute(SCHEMA, [])?;
            Ok(())
        })
        .await?;

        tracing::debug!(database = %database_path, "Audit database ready");
        Ok(sink)
    }

    async fn with_connection<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut rusqlite::Connection) -> rusqlite::Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| {
                FulfillmentError::Audit(format!("Failed to get pooled connection: {e}"))
            })?;
            f(&mut conn)
                .map_err(|e| FulfillmentError::Audit(format!("Database operation failed: {e}")))
        })
        .await
        .map_err(|e| FulfillmentError::Audit(format!("Task execution failed: {e}")))?
    }

    /// Look up the record for one line item
    pub async fn find_record(
        &self,
        order_id: u64,
        line_item_id: u64,
    ) -> Result<Option<GenerationRecord>> {
        self.with_connection(move |conn| {
            conn.query_row(
                "SELECT order_id, line_item_id, order_name, config_source, config_id, width,
                        height, format, orientation, style, customer_email, customer_id,
                        map_path, created_at
                 FROM generation_records WHERE order_id = ?1 AND line_item_id = ?2",
                params![to_sql_id(order_id)?, to_sql_id(line_item_id)?],
                record_from_row,
            )
            .optional()
        })
        .await
    }
}

#[async_trait]
impl AuditSink for SqliteAuditSink {
    async fn write_record(&self, record: &GenerationRecord) -> Result<()> {
        let record = record.clone();
        let inserted = self
            .with_connection(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO generation_records (
                        order_id, line_item_id, order_name, config_source, config_id, width,
                        height, format, orientation, style, customer_email, customer_id,
                        map_path, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                    params![
                        to_sql_id(record.order_id)?,
                        to_sql_id(record.line_item_id)?,
                        record.order_name,
                        record.config_source.as_str(),
                        record.config_id,
                        record.width,
                        record.height,
                        record.format.map(|f| f.as_str()),
                        record.orientation.map(|o| o.as_str()),
                        record.style,
                        record.customer_email,
                        record.customer_id.map(to_sql_id).transpose()?,
                        record.map_path.to_string_lossy().into_owned(),
                        record.created_at.to_rfc3339(),
                    ],
                )
            })
            .await?;

        if inserted == 0 {
            tracing::debug!("Generation record already exists, keeping the original");
        }
        Ok(())
    }
}

fn to_sql_id(id: u64) -> rusqlite::Result<i64> {
    i64::try_from(id).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn column_id(row: &Row<'_>, index: usize) -> rusqlite::Result<u64> {
    let raw: i64 = row.get(index)?;
    u64::try_from(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Integer, Box::new(e)))
}

fn column_parsed<T, E>(
    row: &Row<'_>,
    index: usize,
    parse: impl FnOnce(&str) -> std::result::Result<T, E>,
) -> rusqlite::Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(index)?;
    parse(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<GenerationRecord> {
    let format: Option<String> = row.get(7)?;
    let orientation: Option<String> = row.get(8)?;
    let customer_id: Option<i64> = row.get(11)?;
    let map_path: String = row.get(12)?;

    Ok(GenerationRecord {
        order_id: column_id(row, 0)?,
        line_item_id: column_id(row, 1)?,
        order_name: row.get(2)?,
        config_source: column_parsed(row, 3, |s| {
            serde_json::from_value::<ConfigSource>(serde_json::Value::String(s.to_string()))
        })?,
        config_id: row.get(4)?,
        width: row.get(5)?,
        height: row.get(6)?,
        format: format
            .map(|f| f.parse::<PrintFormat>())
            .transpose()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?,
        orientation: orientation
            .map(|o| o.parse::<Orientation>())
            .transpose()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e)))?,
        style: row.get(9)?,
        customer_email: row.get(10)?,
        customer_id: customer_id.and_then(|id| u64::try_from(id).ok()),
        map_path: PathBuf::from(map_path),
        created_at: column_parsed(row, 13, |s| {
            DateTime::parse_from_rfc3339(s).map(|t| t.with_timezone(&Utc))
        })?,
    })
}
