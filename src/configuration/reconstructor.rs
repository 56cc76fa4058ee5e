//! Configuration reconstructor - best-effort repair of partial configurations
//!
//! Fills gaps in a partial configuration from other places in the artifact
//! it came from. When the only thing left is an activity id, it flags that an
//! external re-fetch is needed instead of failing.

use serde_json::{Map, Value, json};

use crate::configuration::document::ArtifactDocument;
use crate::configuration::types::Markers;
use crate::configuration::validator::{as_lng_lat, is_truthy};
use crate::core::config::RenderDefaults;
use crate::geometry::{self, LngLat, polyline};

/// Result of a reconstruction pass. The configuration may still be invalid.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    pub config: Value,
    /// Route could only be recovered from the activity API
    pub needs_external_reconstruction: bool,
    pub activity_id: Option<String>,
    /// Fields this pass filled in
    pub repaired: Vec<&'static str>,
}

/// Repairs partial configurations using their raw source document
#[derive(Debug, Clone)]
pub struct ConfigReconstructor {
    defaults: RenderDefaults,
}

impl ConfigReconstructor {
    pub fn new(defaults: RenderDefaults) -> Self {
        Self { defaults }
    }

    /// Attempt to complete `partial` from `raw`.
    ///
    /// Returns `None` when the raw document cannot be searched or derived
    /// geometry is unusable.
    pub fn reconstruct(&self, partial: &Value, raw: &Value) -> Option<Reconstruction> {
        let doc = ArtifactDocument::new(raw);
        if !doc.is_object() {
            tracing::warn!("Cannot reconstruct from a raw document that is not an object");
            return None;
        }

        let mut config = partial.as_object().cloned().unwrap_or_default();
        let mut outcome = Reconstruction {
            config: Value::Null,
            needs_external_reconstruction: false,
            activity_id: None,
            repaired: Vec::new(),
        };

        self.fill_dimensions(&mut config, &doc, &mut outcome);
        self.fill_style(&mut config, &doc, &mut outcome);
        self.fill_route(&mut config, &doc, &mut outcome);
        if !Self::fill_geometry(&mut config, &mut outcome) {
            return None;
        }

        tracing::debug!(
            repaired = ?outcome.repaired,
            needs_external = outcome.needs_external_reconstruction,
            "Reconstruction pass finished"
        );
        outcome.config = Value::Object(config);
        Some(outcome)
    }

    fn fill_dimensions(
        &self,
        config: &mut Map<String, Value>,
        doc: &ArtifactDocument<'_>,
        outcome: &mut Reconstruction,
    ) {
        if is_truthy(config.get("width")) && is_truthy(config.get("height")) {
            return;
        }
        let Some(format) = doc.preferred_print_size().or_else(|| doc.print_size()) else {
            return;
        };
        let orientation = doc
            .preferred_orientation()
            .or_else(|| doc.orientation())
            .unwrap_or(self.defaults.orientation.as_str());

        // Never trust stored pixel sizes: recompute from the table.
        let layout = geometry::get_print_dimensions(format, orientation);
        config.insert("width".into(), json!(layout.width));
        config.insert("height".into(), json!(layout.height));
        config.insert("format".into(), json!(layout.format));
        config.insert("orientation".into(), json!(layout.orientation));
        outcome.repaired.push("dimensions");
    }

    fn fill_style(
        &self,
        config: &mut Map<String, Value>,
        doc: &ArtifactDocument<'_>,
        outcome: &mut Reconstruction,
    ) {
        if is_truthy(config.get("style")) {
            return;
        }
        let style = match doc.style() {
            Some(style) => style.to_string(),
            None => {
                tracing::warn!(
                    style = %self.defaults.style,
                    "No map style in artifact, using the default style"
                );
                self.defaults.style.clone()
            }
        };
        config.insert("style".into(), Value::String(style));
        outcome.repaired.push("style");
    }

    fn fill_route(
        &self,
        config: &mut Map<String, Value>,
        doc: &ArtifactDocument<'_>,
        outcome: &mut Reconstruction,
    ) {
        if route_coordinates(config).is_some_and(|c| !c.is_empty()) {
            return;
        }

        let coordinates = doc.coordinates().or_else(|| {
            let encoded = doc.polyline()?;
            match polyline::decode(encoded) {
                Ok(points) if !points.is_empty() => Some(points),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(error = %e, "Stored polyline could not be decoded");
                    None
                }
            }
        });

        let Some(coordinates) = coordinates else {
            if let Some(activity_id) = doc.activity_id() {
                tracing::info!(
                    activity_id = %activity_id,
                    "Route geometry not stored locally, activity re-fetch required"
                );
                outcome.needs_external_reconstruction = true;
                outcome.activity_id = Some(activity_id);
            }
            return;
        };

        let existing = config.get("route").and_then(Value::as_object);
        let color = existing
            .and_then(|r| r.get("color"))
            .and_then(Value::as_str)
            .or_else(|| doc.route_color())
            .unwrap_or(self.defaults.route_color.as_str())
            .to_string();
        let width = existing
            .and_then(|r| r.get("width"))
            .and_then(Value::as_f64)
            .or_else(|| doc.route_width())
            .unwrap_or(self.defaults.route_width);

        config.insert(
            "route".into(),
            json!({"coordinates": coordinates, "color": color, "width": width}),
        );
        outcome.repaired.push("route");
    }

    /// Derive bounds, center and markers from a known route.
    /// Returns false when the geometry helpers reject the route.
    fn fill_geometry(config: &mut Map<String, Value>, outcome: &mut Reconstruction) -> bool {
        let Some(coordinates) = route_coordinates(config).filter(|c| !c.is_empty()) else {
            return true;
        };

        if !is_truthy(config.get("bounds")) {
            match geometry::calculate_bounds(&coordinates) {
                Ok(bounds) => {
                    config.insert("bounds".into(), json!(bounds));
                    outcome.repaired.push("bounds");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Could not derive bounds from route");
                    return false;
                }
            }
        }

        if !is_truthy(config.get("center")) {
            let bounds = config
                .get("bounds")
                .cloned()
                .and_then(|b| serde_json::from_value::<geometry::Bounds>(b).ok());
            if let Some(bounds) = bounds {
                config.insert("center".into(), json!(geometry::calculate_center(&bounds)));
                outcome.repaired.push("center");
            }
        }

        if !is_truthy(config.get("markers")) {
            if let Some(markers) = Markers::from_route(&coordinates) {
                config.insert("markers".into(), json!(markers));
            }
        }

        true
    }
}

/// Parsed `route.coordinates`, or `None` when absent or malformed
fn route_coordinates(config: &Map<String, Value>) -> Option<Vec<LngLat>> {
    config
        .get("route")?
        .get("coordinates")?
        .as_array()?
        .iter()
        .map(as_lng_lat)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::validate_configuration;
    use crate::geometry::polyline;

    fn reconstructor() -> ConfigReconstructor {
        ConfigReconstructor::new(RenderDefaults::default())
    }

    fn partial_without_route() -> Value {
        json!({
            "width": 2480,
            "height": 3508,
            "style": "mapbox://styles/mapbox/dark-v11"
        })
    }

    #[test]
    fn test_dimensions_come_from_print_preferences() {
        let partial = json!({"width": 999});
        let raw = json!({"printPreferences": {"format": "A3", "orientation": "landscape"}});
        let result = reconstructor().reconstruct(&partial, &raw).unwrap();
        assert_eq!(result.config["width"], 4961);
        assert_eq!(result.config["height"], 3508);
        assert_eq!(result.config["format"], "A3");
        assert!(result.repaired.contains(&"dimensions"));
    }

    #[test]
    fn test_dimensions_left_alone_without_preferences() {
        let result = reconstructor().reconstruct(&json!({}), &json!({})).unwrap();
        assert!(result.config.get("width").is_none());
    }

    #[test]
    fn test_style_from_alternate_field_then_default() {
        let raw = json!({"styleSettings": {"mapStyle": "mapbox://styles/acme/ink"}});
        let result = reconstructor().reconstruct(&json!({}), &raw).unwrap();
        assert_eq!(result.config["style"], "mapbox://styles/acme/ink");

        let result = reconstructor().reconstruct(&json!({}), &json!({})).unwrap();
        assert_eq!(result.config["style"], RenderDefaults::default().style);
    }

    #[test]
    fn test_route_from_embedded_coordinates() {
        let raw = json!({
            "routeData": {"coordinates": [[6.1, 45.9], [6.2, 46.0], [6.15, 45.8]]},
            "routeStyle": {"color": "#112233", "width": 6}
        });
        let result = reconstructor()
            .reconstruct(&partial_without_route(), &raw)
            .unwrap();

        assert!(!result.needs_external_reconstruction);
        assert_eq!(result.config["route"]["color"], "#112233");
        assert_eq!(result.config["route"]["width"], 6.0);
        assert_eq!(result.config["bounds"]["north"], 46.0);
        assert_eq!(result.config["bounds"]["west"], 6.1);
        assert_eq!(result.config["markers"]["end"], json!([6.15, 45.8]));
        assert!(validate_configuration(&result.config).valid);
    }

    #[test]
    fn test_route_from_polyline() {
        let encoded = polyline::encode(&[[-120.2, 38.5], [-120.95, 40.7]]);
        let raw = json!({"routeData": {"summaryPolyline": encoded}});
        let result = reconstructor()
            .reconstruct(&partial_without_route(), &raw)
            .unwrap();

        assert_eq!(
            result.config["route"]["coordinates"],
            json!([[-120.2, 38.5], [-120.95, 40.7]])
        );
        let center = geometry::calculate_center(&geometry::calculate_bounds(&[[-120.2, 38.5], [-120.95, 40.7]]).unwrap());
        assert_eq!(result.config["center"], json!(center));
        assert!(validate_configuration(&result.config).valid);
    }

    #[test]
    fn test_bad_polyline_falls_through_to_activity_id() {
        let raw = json!({"routeData": {"polyline": "_p~iF", "activityId": 123}});
        let result = reconstructor()
            .reconstruct(&partial_without_route(), &raw)
            .unwrap();
        assert!(result.needs_external_reconstruction);
        assert_eq!(result.activity_id.as_deref(), Some("123"));
    }

    #[test]
    fn test_activity_id_only_flags_external_reconstruction() {
        let raw = json!({"activityId": "555"});
        let result = reconstructor()
            .reconstruct(&partial_without_route(), &raw)
            .unwrap();
        assert!(result.needs_external_reconstruction);
        assert!(result.config.get("route").is_none());
        assert!(!validate_configuration(&result.config).valid);
    }

    #[test]
    fn test_existing_route_keeps_bounds_and_derives_center() {
        let partial = json!({
            "route": {"coordinates": [[1.0, 1.0], [3.0, 5.0]]},
            "bounds": {"north": 6.0, "south": 0.0, "east": 4.0, "west": 0.0}
        });
        let result = reconstructor().reconstruct(&partial, &json!({})).unwrap();
        assert_eq!(result.config["bounds"]["north"], 6.0);
        assert_eq!(result.config["center"], json!([2.0, 3.0]));
        assert!(!result.repaired.contains(&"route"));
    }

    #[test]
    fn test_non_object_raw_document() {
        assert!(reconstructor().reconstruct(&json!({}), &json!("nope")).is_none());
    }
}
