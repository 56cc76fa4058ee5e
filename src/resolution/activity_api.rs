//! Activity API resolver, the last resort

use async_trait::async_trait;
use std::sync::Arc;

use crate::configuration::{ConfigSource, MapConfiguration};
use crate::core::config::RenderDefaults;
use crate::core::error::{FulfillmentError, Result};
use crate::resolution::activity::{
    ActivityConfigBuilder, ActivityPreferences, normalize_activity,
    validate_activity_for_rendering,
};
use crate::resolution::context::{ACTIVITY_ID, ATHLETE_ID, ResolutionContext};
use crate::resolution::{ActivityApi, ConfigResolver};

/// Rebuilds the configuration from a freshly fetched activity
pub struct ActivityApiResolver {
    api: Arc<dyn ActivityApi>,
    builder: ActivityConfigBuilder,
}

impl ActivityApiResolver {
    pub fn new(api: Arc<dyn ActivityApi>, defaults: RenderDefaults) -> Self {
        Self {
            api,
            builder: ActivityConfigBuilder::new(defaults),
        }
    }
}

#[async_trait]
impl ConfigResolver for ActivityApiResolver {
    fn name(&self) -> &'static str {
        "activity_api"
    }

    fn provenance(&self) -> ConfigSource {
        ConfigSource::StravaApiReconstruction
    }

    async fn attempt(&self, context: &ResolutionContext<'_>) -> Result<Option<MapConfiguration>> {
        let Some(activity_id) = context.property(ACTIVITY_ID) else {
            return Ok(None);
        };
        let athlete_id = context.property(ATHLETE_ID);

        tracing::info!(
            activity_id = %activity_id,
            athlete_id = ?athlete_id,
            "Fetching activity to rebuild configuration"
        );
        let payload = self
            .api
            .get_activity(&activity_id, athlete_id.as_deref())
            .await?;

        let check = validate_activity_for_rendering(&payload);
        if !check.valid {
            return Err(FulfillmentError::ConfigurationInvalid {
                origin: self.provenance().as_str().to_string(),
                missing: vec!["route".to_string()],
                errors: check.reason.into_iter().collect(),
            });
        }

        let activity = normalize_activity(&payload)?;
        let preferences = ActivityPreferences::from_properties(context);
        let mut config = self.builder.build(&activity, &preferences)?;
        config.tag_source(self.provenance());
        Ok(Some(config))
    }
}
