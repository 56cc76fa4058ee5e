//! routeprint - order-time map configuration resolution for route posters
//!
//! Given a completed order line item, resolves the map configuration the
//! customer designed, renders it, and records the outcome.
#![deny(unsafe_code)]

pub mod configuration;
pub mod core;
pub mod fulfillment;
pub mod geometry;
pub mod infrastructure;
pub mod resolution;

pub use crate::core::error::{FulfillmentError, Result};
