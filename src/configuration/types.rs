//! Map configuration model

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::config::{DEFAULT_ROUTE_COLOR, DEFAULT_ROUTE_WIDTH};
use crate::core::error::{FulfillmentError, Result};
use crate::geometry::{Bounds, LngLat, Orientation, PrintFormat};

/// Which resolution path produced a configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    OrderProperties,
    JsonFile,
    JsonFileReconstructed,
    StravaFromStoredData,
    StravaApiReconstruction,
    SessionStorage,
    Base64Legacy,
}

impl ConfigSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigSource::OrderProperties => "order_properties",
            ConfigSource::JsonFile => "json_file",
            ConfigSource::JsonFileReconstructed => "json_file_reconstructed",
            ConfigSource::StravaFromStoredData => "strava_from_stored_data",
            ConfigSource::StravaApiReconstruction => "strava_api_reconstruction",
            ConfigSource::SessionStorage => "session_storage",
            ConfigSource::Base64Legacy => "base64_legacy",
        }
    }

    /// Sources backed by a persisted artifact that has a lifecycle
    pub fn is_persisted_artifact(&self) -> bool {
        matches!(
            self,
            ConfigSource::JsonFile
                | ConfigSource::JsonFileReconstructed
                | ConfigSource::StravaFromStoredData
        )
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_route_color() -> String {
    DEFAULT_ROUTE_COLOR.to_string()
}

fn default_route_width() -> f64 {
    DEFAULT_ROUTE_WIDTH
}

/// The route line drawn on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteLayer {
    pub coordinates: Vec<LngLat>,
    #[serde(default = "default_route_color")]
    pub color: String,
    #[serde(default = "default_route_width")]
    pub width: f64,
}

/// Start and finish markers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Markers {
    pub start: LngLat,
    pub end: LngLat,
}

impl Markers {
    /// First and last point of a route, if it has any
    pub fn from_route(coordinates: &[LngLat]) -> Option<Self> {
        Some(Self {
            start: *coordinates.first()?,
            end: *coordinates.last()?,
        })
    }
}

/// Caption data carried over from the source activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub id: String,
    pub name: String,
    pub distance: f64,
    pub moving_time: u64,
    pub elevation_gain: f64,
    #[serde(rename = "type")]
    pub activity_type: String,
}

/// A complete, validated map rendering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapConfiguration {
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<PrintFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    pub center: LngLat,
    pub bounds: Bounds,
    pub style: String,
    pub route: RouteLayer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markers: Option<Markers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ConfigSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<ActivitySummary>,
}

impl MapConfiguration {
    /// Validate a raw candidate and convert it into the typed model.
    ///
    /// `origin` only labels the error. Provenance and the artifact id are
    /// never taken from the candidate; the resolving strategy sets them.
    pub fn from_candidate(mut candidate: serde_json::Value, origin: &str) -> Result<Self> {
        let report = crate::configuration::validate_configuration(&candidate);
        if !report.valid {
            return Err(report.into_error(origin));
        }
        if let Some(object) = candidate.as_object_mut() {
            object.remove("source");
            object.remove("configId");
            // Browser-produced documents sometimes carry 2480.0 for 2480.
            for key in ["width", "height"] {
                if let Some(whole) = object.get(key).and_then(serde_json::Value::as_f64) {
                    object.insert(key.to_string(), serde_json::json!(whole as u64));
                }
            }
        }
        serde_json::from_value(candidate).map_err(|e| FulfillmentError::ConfigurationInvalid {
            origin: origin.to_string(),
            missing: Vec::new(),
            errors: vec![format!("configuration does not match the expected shape: {e}")],
        })
    }

    /// Record provenance unless a more specific source was already set
    pub fn tag_source(&mut self, source: ConfigSource) {
        self.source.get_or_insert(source);
    }

    pub fn source_or(&self, fallback: ConfigSource) -> ConfigSource {
        self.source.unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate() -> serde_json::Value {
        json!({
            "width": 2480,
            "height": 3508,
            "format": "A4",
            "orientation": "portrait",
            "center": [-122.42, 37.775],
            "bounds": {"north": 37.8, "south": 37.75, "east": -122.39, "west": -122.45},
            "style": "mapbox://styles/mapbox/outdoors-v12",
            "route": {"coordinates": [[-122.45, 37.75], [-122.39, 37.8]]}
        })
    }

    #[test]
    fn test_from_candidate_applies_route_defaults() {
        let config = MapConfiguration::from_candidate(candidate(), "test").unwrap();
        assert_eq!(config.route.color, "#fc5200");
        assert_eq!(config.route.width, 4.0);
        assert_eq!(config.format, Some(PrintFormat::A4));
        assert!(config.source.is_none());
    }

    #[test]
    fn test_from_candidate_rejects_invalid() {
        let mut value = candidate();
        value.as_object_mut().unwrap().remove("style");
        match MapConfiguration::from_candidate(value, "json_file") {
            Err(FulfillmentError::ConfigurationInvalid { origin, missing, .. }) => {
                assert_eq!(origin, "json_file");
                assert_eq!(missing, vec!["style".to_string()]);
            }
            other => panic!("Expected ConfigurationInvalid, got {other:?}"),
        }
    }

    #[test]
    fn test_from_candidate_ignores_embedded_provenance() {
        let mut value = candidate();
        value["source"] = json!("strava_api_reconstruction");
        value["configId"] = json!("cfg_other");
        let config = MapConfiguration::from_candidate(value, "json_file").unwrap();
        assert!(config.source.is_none());
        assert!(config.config_id.is_none());

        let mut value = candidate();
        value["source"] = json!("preview");
        let config = MapConfiguration::from_candidate(value, "session_storage").unwrap();
        assert!(config.source.is_none());
    }

    #[test]
    fn test_tag_source_never_overwrites() {
        let mut config = MapConfiguration::from_candidate(candidate(), "test").unwrap();
        config.tag_source(ConfigSource::JsonFileReconstructed);
        config.tag_source(ConfigSource::OrderProperties);
        assert_eq!(config.source, Some(ConfigSource::JsonFileReconstructed));
    }

    #[test]
    fn test_serialises_camel_case_and_snake_case_source() {
        let mut config = MapConfiguration::from_candidate(candidate(), "test").unwrap();
        config.config_id = Some("cfg_1".into());
        config.tag_source(ConfigSource::StravaFromStoredData);
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["configId"], "cfg_1");
        assert_eq!(value["source"], "strava_from_stored_data");
        assert!(value.get("markers").is_none());
    }

    #[test]
    fn test_persisted_sources() {
        assert!(ConfigSource::JsonFile.is_persisted_artifact());
        assert!(ConfigSource::StravaFromStoredData.is_persisted_artifact());
        assert!(!ConfigSource::StravaApiReconstruction.is_persisted_artifact());
        assert!(!ConfigSource::Base64Legacy.is_persisted_artifact());
        assert!(!ConfigSource::SessionStorage.is_persisted_artifact());
    }

    #[test]
    fn test_markers_from_route() {
        let markers = Markers::from_route(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]).unwrap();
        assert_eq!(markers.start, [1.0, 2.0]);
        assert_eq!(markers.end, [5.0, 6.0]);
        assert!(Markers::from_route(&[]).is_none());
    }
}
