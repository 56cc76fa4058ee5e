//! Geometry domain - pure helpers for route geometry and print sizing
//!
//! Everything here is synchronous and side-effect free apart from the
//! warning emitted when a print layout falls back to its default.

pub mod bounds;
pub mod errors;
pub mod polyline;
pub mod print;

pub use bounds::*;
pub use errors::*;
pub use print::*;

/// A `[longitude, latitude]` pair in GeoJSON axis order
pub type LngLat = [f64; 2];
