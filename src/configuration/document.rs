//! Read-only view over a persisted configuration artifact.
//!
//! Artifacts were written by several generations of the storefront, so the
//! same fact can live in more than one place. Each accessor walks its
//! candidate locations in priority order and returns the first usable value.

use serde_json::Value;

use crate::configuration::validator::as_lng_lat;
use crate::geometry::LngLat;

const MAP_CONFIGURATION: &[&str] = &["/mapConfiguration", "/mapConfig"];
const PRINT_SIZE: &[&str] = &[
    "/mapConfiguration/format",
    "/printSize",
    "/format",
    "/printPreferences/format",
    "/printPreferences/printSize",
];
const PRINT_PREFERENCES_SIZE: &[&str] =
    &["/printPreferences/format", "/printPreferences/printSize"];
const ORIENTATION: &[&str] = &[
    "/mapConfiguration/orientation",
    "/orientation",
    "/printPreferences/orientation",
];
const PRINT_PREFERENCES_ORIENTATION: &[&str] = &["/printPreferences/orientation", "/orientation"];
const STYLE: &[&str] = &[
    "/mapStyle",
    "/styleSettings/mapStyle",
    "/styleSettings/style",
    "/mapConfiguration/mapStyle",
];
// Tracks inside `activityData` are read by the activity conversion, not here.
const COORDINATES: &[&str] = &["/routeData/coordinates", "/coordinates"];
const POLYLINE: &[&str] = &["/routeData/polyline", "/routeData/summaryPolyline", "/polyline"];
const ACTIVITY_ID: &[&str] = &["/activityId", "/routeData/activityId", "/activityData/id"];

/// Borrowed view over a raw artifact document
#[derive(Debug, Clone, Copy)]
pub struct ArtifactDocument<'a> {
    raw: &'a Value,
}

impl<'a> ArtifactDocument<'a> {
    pub fn new(raw: &'a Value) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &'a Value {
        self.raw
    }

    pub fn is_object(&self) -> bool {
        self.raw.is_object()
    }

    /// The nested map-configuration object, if any
    pub fn map_configuration(&self) -> Option<&'a Value> {
        MAP_CONFIGURATION
            .iter()
            .filter_map(|p| self.raw.pointer(p))
            .find(|v| v.is_object())
    }

    /// Declared print size from anywhere in the document
    pub fn print_size(&self) -> Option<&'a str> {
        self.first_str(PRINT_SIZE)
    }

    pub fn orientation(&self) -> Option<&'a str> {
        self.first_str(ORIENTATION)
    }

    /// Print size from the print-preferences sub-object only
    pub fn preferred_print_size(&self) -> Option<&'a str> {
        self.first_str(PRINT_PREFERENCES_SIZE)
    }

    pub fn preferred_orientation(&self) -> Option<&'a str> {
        self.first_str(PRINT_PREFERENCES_ORIENTATION)
    }

    /// Alternate style reference
    pub fn style(&self) -> Option<&'a str> {
        self.first_str(STYLE)
    }

    /// First embedded coordinate list made entirely of `[lng, lat]` pairs
    pub fn coordinates(&self) -> Option<Vec<LngLat>> {
        COORDINATES.iter().find_map(|p| {
            let items = self.raw.pointer(p)?.as_array()?;
            if items.is_empty() {
                return None;
            }
            items.iter().map(as_lng_lat).collect()
        })
    }

    pub fn polyline(&self) -> Option<&'a str> {
        self.first_str(POLYLINE)
    }

    /// Activity identifier, accepting both string and numeric forms
    pub fn activity_id(&self) -> Option<String> {
        ACTIVITY_ID.iter().find_map(|p| match self.raw.pointer(p)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// Stored activity payload captured when the customer designed the poster
    pub fn activity_data(&self) -> Option<&'a Value> {
        self.raw
            .pointer("/activityData")
            .filter(|v| v.as_object().is_some_and(|o| !o.is_empty()))
    }

    pub fn route_color(&self) -> Option<&'a str> {
        self.first_str(&["/routeStyle/color"])
    }

    pub fn route_width(&self) -> Option<f64> {
        self.raw.pointer("/routeStyle/width").and_then(Value::as_f64)
    }

    fn first_str(&self, pointers: &[&str]) -> Option<&'a str> {
        pointers
            .iter()
            .filter_map(|p| self.raw.pointer(p)?.as_str())
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}
