//! Core building blocks shared by every layer: the error taxonomy and the
//! pipeline configuration.

pub mod config;
pub mod error;

pub use config::PipelineConfig;
pub use error::{FulfillmentError, Result};
