//! Error types for the geometry domain

use thiserror::Error;

/// Errors raised by the pure geometry helpers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Polyline ended mid-value at byte {offset}")]
    TruncatedPolyline { offset: usize },

    #[error("Route has no coordinates")]
    EmptyRoute,
}
