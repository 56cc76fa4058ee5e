//! Error handling for the routeprint fulfillment pipeline.
//!
//! This module defines the crate-wide error type [`FulfillmentError`] along
//! with a convenient `Result` alias. The first five variants are the outcomes
//! a caller of the pipeline can observe; the rest describe internal failures
//! that strategies and adapters convert or log before they reach the caller.
//!
//! # Examples
//!
//! ```
//! use routeprint::core::error::{FulfillmentError, Result};
//!
//! fn might_fail() -> Result<()> {
//!     Err(FulfillmentError::render("renderer produced no file"))
//! }
//!
//! assert!(might_fail().is_err());
//! ```

use thiserror::Error;

use crate::geometry::GeometryError;

/// Result type for fulfillment operations
pub type Result<T> = std::result::Result<T, FulfillmentError>;

/// Main error type for fulfillment operations
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// Every resolution strategy was exhausted without a valid configuration
    #[error("No valid map configuration for order {order_id} line item {line_item_id} (tried: {})", attempted.join(", "))]
    ConfigurationUnresolved {
        order_id: u64,
        line_item_id: u64,
        attempted: Vec<String>,
    },

    /// A candidate configuration failed validation and could not be repaired
    #[error("Invalid map configuration from {origin}: missing [{}], errors [{}]", missing.join(", "), errors.join("; "))]
    ConfigurationInvalid {
        origin: String,
        missing: Vec<String>,
        errors: Vec<String>,
    },

    /// A call to the configuration store, session store or activity API failed
    #[error("External fetch failed: {0}")]
    ExternalFetchFailed(String),

    /// The renderer failed or produced no output
    #[error("Render failed: {0}")]
    RenderFailed(String),

    /// The overall generation deadline elapsed
    #[error("Map generation timed out after {timeout_ms}ms")]
    GenerationTimeout { timeout_ms: u64 },

    /// Geometry helper error
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// Moving a persisted configuration artifact failed
    #[error("Lifecycle transition failed: {0}")]
    LifecycleTransition(String),

    /// Writing the generation audit record failed
    #[error("Audit write failed: {0}")]
    Audit(String),

    /// Pipeline configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FulfillmentError {
    /// Create a new external fetch error
    pub fn fetch<S: Into<String>>(msg: S) -> Self {
        Self::ExternalFetchFailed(msg.into())
    }

    /// Create a new render error
    pub fn render<S: Into<String>>(msg: S) -> Self {
        Self::RenderFailed(msg.into())
    }

    /// Create a new pipeline configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Stable short name used in logs and lifecycle annotations
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigurationUnresolved { .. } => "configuration_unresolved",
            Self::ConfigurationInvalid { .. } => "configuration_invalid",
            Self::ExternalFetchFailed(_) => "external_fetch_failed",
            Self::RenderFailed(_) => "render_failed",
            Self::GenerationTimeout { .. } => "generation_timeout",
            Self::Geometry(_) => "geometry",
            Self::LifecycleTransition(_) => "lifecycle_transition",
            Self::Audit(_) => "audit",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_unresolved_lists_attempts() {
        let error = FulfillmentError::ConfigurationUnresolved {
            order_id: 1001,
            line_item_id: 7,
            attempted: vec!["declared_properties".into(), "session_storage".into()],
        };
        assert_eq!(
            error.to_string(),
            "No valid map configuration for order 1001 line item 7 (tried: declared_properties, session_storage)"
        );
        assert_eq!(error.kind(), "configuration_unresolved");
    }

    #[test]
    fn test_invalid_lists_missing_fields() {
        let error = FulfillmentError::ConfigurationInvalid {
            origin: "json_file".into(),
            missing: vec!["width".into(), "height".into()],
            errors: vec![],
        };
        assert!(error.to_string().contains("missing [width, height]"));
    }

    #[test]
    fn test_helper_constructors() {
        assert!(matches!(
            FulfillmentError::fetch("boom"),
            FulfillmentError::ExternalFetchFailed(_)
        ));
        assert_eq!(
            FulfillmentError::render("no file").to_string(),
            "Render failed: no file"
        );
        assert_eq!(
            FulfillmentError::config("bad timeout").to_string(),
            "Configuration error: bad timeout"
        );
    }

    #[test]
    fn test_timeout_message() {
        let error = FulfillmentError::GenerationTimeout { timeout_ms: 300_000 };
        assert_eq!(error.to_string(), "Map generation timed out after 300000ms");
    }

    #[test]
    fn test_from_conversions() {
        let error: FulfillmentError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(error, FulfillmentError::Io(_)));

        let error: FulfillmentError = GeometryError::EmptyRoute.into();
        assert_eq!(error.kind(), "geometry");

        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: FulfillmentError = json_error.into();
        assert!(error.to_string().contains("JSON parsing error"));
    }
}
