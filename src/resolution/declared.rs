//! Declared-properties resolver
//!
//! Reads the configuration artifact named by the `Configuration ID`
//! property, repairing it when needed. Line items from before artifacts
//! existed carry the whole configuration as base64 JSON in `Map Config`.

use async_trait::async_trait;
use base64::prelude::*;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::configuration::{
    ArtifactDocument, ConfigReconstructor, ConfigSource, MapConfiguration, validate_configuration,
};
use crate::core::config::RenderDefaults;
use crate::core::error::{FulfillmentError, Result};
use crate::geometry;
use crate::resolution::activity::{
    ActivityConfigBuilder, ActivityPreferences, normalize_activity,
    validate_activity_for_rendering,
};
use crate::resolution::context::{CONFIGURATION_ID, MAP_CONFIG, ResolutionContext};
use crate::resolution::{ConfigResolver, ConfigurationStore};

pub struct DeclaredPropertiesResolver {
    store: Arc<dyn ConfigurationStore>,
    reconstructor: ConfigReconstructor,
    activity_builder: ActivityConfigBuilder,
    defaults: RenderDefaults,
}

impl DeclaredPropertiesResolver {
    pub fn new(store: Arc<dyn ConfigurationStore>, defaults: RenderDefaults) -> Self {
        Self {
            store,
            reconstructor: ConfigReconstructor::new(defaults.clone()),
            activity_builder: ActivityConfigBuilder::new(defaults.clone()),
            defaults,
        }
    }

    async fn resolve_artifact(&self, config_id: &str) -> Result<MapConfiguration> {
        let raw = self.store.load(config_id).await?.ok_or_else(|| {
            FulfillmentError::fetch(format!("configuration artifact {config_id} not found"))
        })?;
        let doc = ArtifactDocument::new(&raw);

        let candidate = self.extract_candidate(&doc, config_id);
        let report = validate_configuration(&candidate);
        if report.valid {
            tracing::debug!(config_id = %config_id, "Stored configuration is complete");
            return Self::finish(candidate, ConfigSource::JsonFile, config_id);
        }

        tracing::warn!(
            config_id = %config_id,
            missing = ?report.missing,
            errors = ?report.errors,
            "Stored configuration incomplete, attempting reconstruction"
        );

        let Some(reconstruction) = self.reconstructor.reconstruct(&candidate, &raw) else {
            return Err(report.into_error(ConfigSource::JsonFile.as_str()));
        };

        let repaired = validate_configuration(&reconstruction.config);
        if repaired.valid {
            tracing::info!(
                config_id = %config_id,
                repaired = ?reconstruction.repaired,
                "Stored configuration reconstructed"
            );
            return Self::finish(
                reconstruction.config,
                ConfigSource::JsonFileReconstructed,
                config_id,
            );
        }

        match (reconstruction.needs_external_reconstruction, doc.activity_data()) {
            (true, Some(activity)) => {
                self.convert_stored_activity(activity, &doc, &reconstruction.config, config_id)
            }
            (true, None) => {
                tracing::warn!(
                    config_id = %config_id,
                    activity_id = ?reconstruction.activity_id,
                    "Route needs the activity API but no activity data is stored"
                );
                Err(repaired.into_error(ConfigSource::JsonFileReconstructed.as_str()))
            }
            (false, _) => Err(repaired.into_error(ConfigSource::JsonFileReconstructed.as_str())),
        }
    }

    /// Nested map configuration merged with sibling print fields. Pixel
    /// sizes are always recomputed from the declared format, or from the
    /// default format when the document declares none.
    fn extract_candidate(&self, doc: &ArtifactDocument<'_>, config_id: &str) -> Value {
        let mut candidate = doc
            .map_configuration()
            .cloned()
            .unwrap_or_else(|| json!({}));

        if let Some(object) = candidate.as_object_mut() {
            let format = doc
                .print_size()
                .unwrap_or(self.defaults.print_format.as_str());
            let orientation = doc
                .orientation()
                .unwrap_or(self.defaults.orientation.as_str());
            let layout = geometry::get_print_dimensions(format, orientation);
            object.insert("width".into(), json!(layout.width));
            object.insert("height".into(), json!(layout.height));
            object.insert("format".into(), json!(layout.format));
            object.insert("orientation".into(), json!(layout.orientation));
        }

        if let Some(object) = candidate.as_object_mut() {
            object.insert("configId".into(), json!(config_id));
        }
        candidate
    }

    /// Convert the activity payload captured at design time, skipping a
    /// second trip through the activity API.
    fn convert_stored_activity(
        &self,
        activity: &Value,
        doc: &ArtifactDocument<'_>,
        partial: &Value,
        config_id: &str,
    ) -> Result<MapConfiguration> {
        let check = validate_activity_for_rendering(activity);
        if !check.valid {
            return Err(FulfillmentError::ConfigurationInvalid {
                origin: ConfigSource::StravaFromStoredData.as_str().to_string(),
                missing: vec!["route".to_string()],
                errors: check.reason.into_iter().collect(),
            });
        }

        let normalized = normalize_activity(activity)?;
        let preferences = ActivityPreferences::from_artifact(doc, partial);
        let mut config = self.activity_builder.build(&normalized, &preferences)?;
        config.config_id = Some(config_id.to_string());
        config.tag_source(ConfigSource::StravaFromStoredData);

        tracing::info!(
            config_id = %config_id,
            activity_id = %normalized.id,
            "Configuration rebuilt from stored activity data"
        );
        Ok(config)
    }

    fn decode_legacy(encoded: &str) -> Result<MapConfiguration> {
        let origin = ConfigSource::Base64Legacy.as_str();
        let bytes = BASE64_STANDARD.decode(encoded.trim()).map_err(|e| {
            FulfillmentError::ConfigurationInvalid {
                origin: origin.to_string(),
                missing: Vec::new(),
                errors: vec![format!("Map Config is not valid base64: {e}")],
            }
        })?;
        let value: Value = serde_json::from_slice(&bytes)?;

        let mut config = MapConfiguration::from_candidate(value, origin)?;
        config.config_id = None;
        config.source = Some(ConfigSource::Base64Legacy);
        tracing::info!("Configuration decoded from legacy Map Config property");
        Ok(config)
    }

    fn finish(candidate: Value, source: ConfigSource, config_id: &str) -> Result<MapConfiguration> {
        let mut config = MapConfiguration::from_candidate(candidate, source.as_str())?;
        config.config_id = Some(config_id.to_string());
        config.tag_source(source);
        Ok(config)
    }
}

#[async_trait]
impl ConfigResolver for DeclaredPropertiesResolver {
    fn name(&self) -> &'static str {
        "declared_properties"
    }

    fn provenance(&self) -> ConfigSource {
        ConfigSource::OrderProperties
    }

    async fn attempt(&self, context: &ResolutionContext<'_>) -> Result<Option<MapConfiguration>> {
        if let Some(config_id) = context.property(CONFIGURATION_ID) {
            tracing::debug!(config_id = %config_id, "Resolving from configuration artifact");
            return self.resolve_artifact(&config_id).await.map(Some);
        }

        match context.property(MAP_CONFIG) {
            Some(encoded) => Self::decode_legacy(&encoded).map(Some),
            None => Ok(None),
        }
    }
}
