//! Activity payload checks, normalisation and conversion into a map
//! configuration.
//!
//! Used both for payloads fetched live from the activity API and for the
//! copy stored inside a configuration artifact.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::configuration::{
    ActivitySummary, ArtifactDocument, MapConfiguration, Markers, RouteLayer,
};
use crate::core::config::RenderDefaults;
use crate::core::error::{FulfillmentError, Result};
use crate::geometry::{self, LngLat, polyline};
use crate::resolution::context::{self, ResolutionContext};

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("valid regex"));

/// Whether a payload carries enough track data to draw
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityCheck {
    pub valid: bool,
    pub reason: Option<String>,
}

impl ActivityCheck {
    fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// Activity reduced to what the poster needs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedActivity {
    pub id: String,
    pub name: String,
    pub distance: f64,
    pub moving_time: u64,
    pub elevation_gain: f64,
    pub activity_type: String,
    pub coordinates: Vec<LngLat>,
}

fn embedded_coordinates(payload: &Value) -> Option<Vec<LngLat>> {
    let items = payload.get("coordinates")?.as_array()?;
    items
        .iter()
        .map(crate::configuration::validator::as_lng_lat)
        .collect()
}

fn first_number(payload: &Value, keys: &[&str]) -> f64 {
    keys.iter()
        .find_map(|k| payload.get(*k).and_then(Value::as_f64))
        .unwrap_or(0.0)
}

/// Track points from the payload: embedded coordinates, then the detailed
/// polyline, then the summary polyline.
fn track(payload: &Value) -> std::result::Result<Vec<LngLat>, String> {
    if let Some(coordinates) = embedded_coordinates(payload).filter(|c| !c.is_empty()) {
        return Ok(coordinates);
    }

    let mut last_error = None;
    for pointer in ["/map/polyline", "/map/summary_polyline"] {
        let Some(encoded) = payload.pointer(pointer).and_then(Value::as_str) else {
            continue;
        };
        if encoded.is_empty() {
            continue;
        }
        match polyline::decode(encoded) {
            Ok(points) => return Ok(points),
            Err(e) => last_error = Some(format!("{pointer} could not be decoded: {e}")),
        }
    }

    Err(last_error.unwrap_or_else(|| "activity has no GPS track".to_string()))
}

/// Check a payload has a drawable track
pub fn validate_activity_for_rendering(payload: &Value) -> ActivityCheck {
    if !payload.is_object() {
        return ActivityCheck::rejected("activity payload is not an object");
    }
    match track(payload) {
        Ok(points) if points.len() >= 2 => ActivityCheck::ok(),
        Ok(points) => ActivityCheck::rejected(format!(
            "activity track has {} point(s), at least 2 are needed",
            points.len()
        )),
        Err(reason) => ActivityCheck::rejected(reason),
    }
}

/// Normalise a raw or previously-normalised payload
pub fn normalize_activity(payload: &Value) -> Result<NormalizedActivity> {
    let coordinates = track(payload).map_err(|reason| FulfillmentError::ConfigurationInvalid {
        origin: "activity".to_string(),
        missing: vec!["route.coordinates".to_string()],
        errors: vec![reason],
    })?;

    let text = |key: &str| payload.get(key).and_then(Value::as_str).map(str::to_string);

    let id = match payload.get("id") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    };

    Ok(NormalizedActivity {
        id,
        name: text("name").unwrap_or_default(),
        distance: first_number(payload, &["distance"]),
        moving_time: first_number(payload, &["moving_time", "movingTime"]).max(0.0) as u64,
        elevation_gain: first_number(
            payload,
            &["total_elevation_gain", "elevationGain", "elevation_gain"],
        ),
        activity_type: text("sport_type")
            .or_else(|| text("type"))
            .unwrap_or_else(|| "Activity".to_string()),
        coordinates,
    })
}

/// Print and styling choices declared by the customer, all optional
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityPreferences {
    pub format: Option<String>,
    pub orientation: Option<String>,
    pub style: Option<String>,
    pub route_color: Option<String>,
    pub route_width: Option<f64>,
}

impl ActivityPreferences {
    /// Preferences declared as line item properties
    pub fn from_properties(ctx: &ResolutionContext<'_>) -> Self {
        Self {
            format: ctx.property(context::PRINT_SIZE),
            orientation: ctx.property(context::ORIENTATION),
            style: ctx.property(context::MAP_STYLE),
            route_color: ctx.property(context::ROUTE_COLOR),
            route_width: ctx
                .property(context::ROUTE_WIDTH)
                .and_then(|w| w.trim().trim_end_matches("px").parse().ok()),
        }
    }

    /// Preferences recorded in a configuration artifact. Values already in
    /// the partial configuration win over the document's own fields.
    pub fn from_artifact(doc: &ArtifactDocument<'_>, partial: &Value) -> Self {
        let partial_str = |pointer: &str| {
            partial
                .pointer(pointer)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
        };
        Self {
            format: partial_str("/format").or_else(|| doc.print_size().map(str::to_string)),
            orientation: partial_str("/orientation")
                .or_else(|| doc.orientation().map(str::to_string)),
            style: partial_str("/style").or_else(|| doc.style().map(str::to_string)),
            route_color: partial_str("/route/color")
                .or_else(|| doc.route_color().map(str::to_string)),
            route_width: partial
                .pointer("/route/width")
                .and_then(Value::as_f64)
                .or_else(|| doc.route_width()),
        }
    }
}

/// Builds complete configurations from normalised activities
#[derive(Debug, Clone)]
pub struct ActivityConfigBuilder {
    defaults: RenderDefaults,
}

impl ActivityConfigBuilder {
    pub fn new(defaults: RenderDefaults) -> Self {
        Self { defaults }
    }

    pub fn build(
        &self,
        activity: &NormalizedActivity,
        preferences: &ActivityPreferences,
    ) -> Result<MapConfiguration> {
        let layout = geometry::get_print_dimensions(
            preferences
                .format
                .as_deref()
                .unwrap_or(self.defaults.print_format.as_str()),
            preferences
                .orientation
                .as_deref()
                .unwrap_or(self.defaults.orientation.as_str()),
        );
        let bounds = geometry::calculate_bounds(&activity.coordinates)?;

        Ok(MapConfiguration {
            width: layout.width,
            height: layout.height,
            format: Some(layout.format),
            orientation: Some(layout.orientation),
            center: geometry::calculate_center(&bounds),
            bounds,
            style: self.style(preferences),
            route: RouteLayer {
                coordinates: activity.coordinates.clone(),
                color: self.route_color(preferences),
                width: self.route_width(preferences),
            },
            markers: Markers::from_route(&activity.coordinates),
            source: None,
            config_id: None,
            activity: Some(ActivitySummary {
                id: activity.id.clone(),
                name: activity.name.clone(),
                distance: activity.distance,
                moving_time: activity.moving_time,
                elevation_gain: activity.elevation_gain,
                activity_type: activity.activity_type.clone(),
            }),
        })
    }

    fn style(&self, preferences: &ActivityPreferences) -> String {
        match preferences.style.as_deref().map(str::trim) {
            Some(style) if !style.is_empty() => style.to_string(),
            _ => {
                tracing::warn!(style = %self.defaults.style, "No map style declared, using the default style");
                self.defaults.style.clone()
            }
        }
    }

    fn route_color(&self, preferences: &ActivityPreferences) -> String {
        match preferences.route_color.as_deref().map(str::trim) {
            Some(color) if HEX_COLOR.is_match(color) => color.to_string(),
            Some(color) => {
                tracing::warn!(color = %color, "Ignoring invalid route color");
                self.defaults.route_color.clone()
            }
            None => self.defaults.route_color.clone(),
        }
    }

    fn route_width(&self, preferences: &ActivityPreferences) -> f64 {
        preferences
            .route_width
            .filter(|w| w.is_finite() && *w > 0.0)
            .unwrap_or(self.defaults.route_width)
    }
}
