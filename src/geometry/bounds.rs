//! Bounding box and center computation for routes

use crate::geometry::{GeometryError, LngLat};
use serde::{Deserialize, Serialize};

/// Axis-aligned geographic envelope
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Bounds {
    /// Whether a `[lng, lat]` point lies inside the envelope (edges inclusive)
    pub fn contains(&self, point: &LngLat) -> bool {
        let [lng, lat] = *point;
        lat >= self.south && lat <= self.north && lng >= self.west && lng <= self.east
    }

    /// Whether every point of a route lies inside the envelope
    pub fn contains_all(&self, points: &[LngLat]) -> bool {
        points.iter().all(|p| self.contains(p))
    }
}

/// Compute the envelope of a coordinate sequence
pub fn calculate_bounds(coordinates: &[LngLat]) -> Result<Bounds, GeometryError> {
    let (first, rest) = coordinates
        .split_first()
        .ok_or(GeometryError::EmptyRoute)?;

    let [lng, lat] = *first;
    let mut bounds = Bounds {
        north: lat,
        south: lat,
        east: lng,
        west: lng,
    };

    for &[lng, lat] in rest {
        bounds.north = bounds.north.max(lat);
        bounds.south = bounds.south.min(lat);
        bounds.east = bounds.east.max(lng);
        bounds.west = bounds.west.min(lng);
    }

    Ok(bounds)
}

/// Midpoint of a bounding box as `[lng, lat]`.
///
/// No antimeridian correction: a route crossing 180° gets a center on the
/// far side of the globe.
pub fn calculate_center(bounds: &Bounds) -> LngLat {
    [
        (bounds.west + bounds.east) / 2.0,
        (bounds.south + bounds.north) / 2.0,
    ]
}
