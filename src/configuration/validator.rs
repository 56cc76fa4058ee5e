//! Configuration validator - the single gate every candidate passes through
//!
//! Works on the raw JSON candidate rather than the typed model so it can
//! report every problem at once instead of stopping at the first serde error.
//! Never mutates its input and never performs I/O.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::core::error::FulfillmentError;
use crate::geometry::{Bounds, LngLat, Orientation, PrintFormat, PrintLayout};

/// Top-level keys every configuration must carry
pub const REQUIRED_FIELDS: [&str; 6] = ["width", "height", "center", "bounds", "style", "route"];

const DIRECTIONS: [&str; 4] = ["north", "south", "east", "west"];

/// Outcome of validating one candidate
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub missing: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn into_error(self, origin: &str) -> FulfillmentError {
        FulfillmentError::ConfigurationInvalid {
            origin: origin.to_string(),
            missing: self.missing,
            errors: self.errors,
        }
    }

    fn finish(mut self) -> Self {
        self.valid = self.missing.is_empty() && self.errors.is_empty();
        self
    }
}

/// JavaScript-style truthiness, which is what the storefront wrote against
pub(crate) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Read a `[lng, lat]` pair
pub(crate) fn as_lng_lat(value: &Value) -> Option<[f64; 2]> {
    match value.as_array()?.as_slice() {
        [lng, lat] => Some([lng.as_f64()?, lat.as_f64()?]),
        _ => None,
    }
}

/// Validate a candidate map configuration
pub fn validate_configuration(config: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();

    let object = match config {
        Value::Null => {
            report.errors.push("configuration is null".to_string());
            report.missing = REQUIRED_FIELDS.iter().map(|f| f.to_string()).collect();
            return report.finish();
        }
        Value::Object(object) => object,
        _ => {
            report
                .errors
                .push("configuration must be a JSON object".to_string());
            return report.finish();
        }
    };

    for field in REQUIRED_FIELDS {
        if !is_truthy(object.get(field)) {
            report.missing.push(field.to_string());
        }
    }

    check_route(object, &mut report);
    check_center(object, &mut report);
    check_bounds(object, &mut report);
    check_route_within_bounds(object, &mut report);
    check_dimensions(object, &mut report);

    if let Some(style) = object.get("style").filter(|v| is_truthy(Some(*v))) {
        match style.as_str() {
            Some(s) if !s.trim().is_empty() => {}
            _ => report.errors.push("style must be a non-empty string".to_string()),
        }
    }

    let report = report.finish();
    if !report.valid {
        tracing::debug!(
            missing = ?report.missing,
            errors = ?report.errors,
            "Map configuration failed validation"
        );
    }
    report
}

fn check_route(object: &Map<String, Value>, report: &mut ValidationReport) {
    let Some(route) = object.get("route").filter(|v| is_truthy(Some(*v))) else {
        return;
    };
    let Some(route) = route.as_object() else {
        report.errors.push("route must be an object".to_string());
        return;
    };

    let coordinates = match route.get("coordinates").and_then(Value::as_array) {
        Some(coordinates) if !coordinates.is_empty() => coordinates,
        _ => {
            report.missing.push("route.coordinates".to_string());
            return;
        }
    };

    if let Some(index) = coordinates.iter().position(|c| as_lng_lat(c).is_none()) {
        report.errors.push(format!(
            "route.coordinates[{index}] must be a [lng, lat] number pair"
        ));
    } else if coordinates.len() < 2 {
        report
            .errors
            .push("route.coordinates needs at least 2 points".to_string());
    }
}

fn check_center(object: &Map<String, Value>, report: &mut ValidationReport) {
    let Some(center) = object.get("center").filter(|v| is_truthy(Some(*v))) else {
        return;
    };
    match as_lng_lat(center) {
        None => report
            .errors
            .push("center must be a [lng, lat] number pair".to_string()),
        Some([lng, lat]) => {
            if !(-180.0..=180.0).contains(&lng) {
                report
                    .errors
                    .push(format!("center longitude {lng} is outside [-180, 180]"));
            }
            if !(-90.0..=90.0).contains(&lat) {
                report
                    .errors
                    .push(format!("center latitude {lat} is outside [-90, 90]"));
            }
        }
    }
}

fn check_bounds(object: &Map<String, Value>, report: &mut ValidationReport) {
    let Some(bounds) = object.get("bounds").filter(|v| is_truthy(Some(*v))) else {
        return;
    };
    let Some(bounds) = bounds.as_object() else {
        report.errors.push("bounds must be an object".to_string());
        return;
    };

    let mut all_numeric = true;
    for direction in DIRECTIONS {
        if bounds.get(direction).and_then(Value::as_f64).is_none() {
            report
                .errors
                .push(format!("bounds.{direction} must be a number"));
            all_numeric = false;
        }
    }

    if all_numeric {
        let north = bounds["north"].as_f64().unwrap_or_default();
        let south = bounds["south"].as_f64().unwrap_or_default();
        if south > north {
            report
                .errors
                .push(format!("bounds.south ({south}) is greater than bounds.north ({north})"));
        }
    }
}

fn parsed_bounds(object: &Map<String, Value>) -> Option<Bounds> {
    let bounds = object.get("bounds")?.as_object()?;
    let direction = |key: &str| bounds.get(key).and_then(Value::as_f64);
    Some(Bounds {
        north: direction("north")?,
        south: direction("south")?,
        east: direction("east")?,
        west: direction("west")?,
    })
}

fn parsed_route(object: &Map<String, Value>) -> Option<Vec<LngLat>> {
    object
        .get("route")?
        .get("coordinates")?
        .as_array()?
        .iter()
        .map(as_lng_lat)
        .collect()
}

/// Every route point must sit inside the bounds. Inverted bounds are
/// already reported by `check_bounds`.
fn check_route_within_bounds(object: &Map<String, Value>, report: &mut ValidationReport) {
    let (Some(bounds), Some(route)) = (parsed_bounds(object), parsed_route(object)) else {
        return;
    };
    if bounds.south > bounds.north {
        return;
    }
    for (index, point) in route.iter().enumerate() {
        if !bounds.contains(point) {
            report.errors.push(format!(
                "route.coordinates[{index}] [{}, {}] lies outside bounds",
                point[0], point[1]
            ));
        }
    }
}

fn positive_integer(value: &Value) -> Option<u32> {
    let number = value.as_f64()?;
    (number > 0.0 && number.fract() == 0.0 && number <= f64::from(u32::MAX)).then_some(number as u32)
}

fn check_dimensions(object: &Map<String, Value>, report: &mut ValidationReport) {
    let mut pixels = [None, None];
    for (slot, field) in pixels.iter_mut().zip(["width", "height"]) {
        let Some(value) = object.get(field).filter(|v| is_truthy(Some(*v))) else {
            continue;
        };
        *slot = positive_integer(value);
        if slot.is_none() {
            report
                .errors
                .push(format!("{field} must be a positive integer, got {value}"));
        }
    }

    let format = match object.get("format") {
        None | Some(Value::Null) => None,
        Some(value) => match value.as_str().map(str::parse::<PrintFormat>) {
            Some(Ok(format)) => Some(format),
            _ => {
                report
                    .errors
                    .push(format!("format {value} is not a supported print format"));
                None
            }
        },
    };
    let orientation = match object.get("orientation") {
        None | Some(Value::Null) => None,
        Some(value) => match value.as_str().map(str::parse::<Orientation>) {
            Some(Ok(orientation)) => Some(orientation),
            _ => {
                report
                    .errors
                    .push(format!("orientation {value} must be portrait or landscape"));
                None
            }
        },
    };

    if let (Some(format), Some(orientation), [Some(width), Some(height)]) =
        (format, orientation, pixels)
    {
        let canonical = PrintLayout::new(format, orientation);
        if (width, height) != (canonical.width, canonical.height) {
            report.errors.push(format!(
                "{width}x{height} does not match {format} {orientation} ({}x{})",
                canonical.width, canonical.height
            ));
        }
    }
}
