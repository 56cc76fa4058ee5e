//! Strava activity API client

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use url::Url;
use zeroize::Zeroize;

use crate::core::config::{SecretString, StravaConfig};
use crate::core::error::{FulfillmentError, Result};
use crate::resolution::ActivityApi;

/// OAuth access token, wiped from memory on drop
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

impl Drop for AccessToken {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Default token plus per-athlete tokens for activities owned by others
#[derive(Debug, Clone, Default)]
pub struct StravaCredentials {
    default_token: Option<AccessToken>,
    athlete_tokens: HashMap<String, AccessToken>,
}

impl StravaCredentials {
    pub fn new(default_token: Option<AccessToken>) -> Self {
        Self {
            default_token,
            athlete_tokens: HashMap::new(),
        }
    }

    pub fn with_athlete(mut self, athlete_id: impl Into<String>, token: AccessToken) -> Self {
        self.athlete_tokens.insert(athlete_id.into(), token);
        self
    }

    /// Token for the owner hint, else the default token
    pub fn token_for(&self, owner_hint: Option<&str>) -> Option<&AccessToken> {
        owner_hint
            .and_then(|athlete| self.athlete_tokens.get(athlete))
            .or(self.default_token.as_ref())
    }
}

impl From<&StravaConfig> for StravaCredentials {
    fn from(config: &StravaConfig) -> Self {
        let default_token = config
            .access_token
            .as_ref()
            .map(SecretString::expose)
            .filter(|t| !t.trim().is_empty())
            .map(AccessToken::new);
        config
            .athlete_tokens
            .iter()
            .fold(Self::new(default_token), |credentials, (athlete, token)| {
                credentials.with_athlete(athlete.clone(), AccessToken::new(token.expose()))
            })
    }
}

/// Fetches activities from the Strava v3 REST API
pub struct StravaClient {
    client: Client,
    base_url: Url,
    credentials: StravaCredentials,
}

impl StravaClient {
    pub fn new(base_url: Url, credentials: StravaCredentials, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| FulfillmentError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    pub fn from_config(config: &StravaConfig) -> Result<Self> {
        Self::new(
            config.base_url.clone(),
            StravaCredentials::from(config),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn activity_url(&self, activity_id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                FulfillmentError::config(format!(
                    "Strava base URL {} cannot be a base",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push("activities")
            .push(activity_id);
        Ok(url)
    }

    fn status_error(status: StatusCode, activity_id: &str) -> FulfillmentError {
        let detail = match status {
            StatusCode::UNAUTHORIZED => "access token rejected".to_string(),
            StatusCode::FORBIDDEN => "access to this activity is forbidden".to_string(),
            StatusCode::NOT_FOUND => "activity not found".to_string(),
            StatusCode::TOO_MANY_REQUESTS => "rate limited by Strava".to_string(),
            other => format!("unexpected response {other}"),
        };
        FulfillmentError::fetch(format!(
            "Strava activity {activity_id}: {detail} (HTTP {})",
            status.as_u16()
        ))
    }
}

#[async_trait]
impl ActivityApi for StravaClient {
    async fn get_activity(&self, activity_id: &str, owner_hint: Option<&str>) -> Result<Value> {
        let activity_id = activity_id.trim();
        if activity_id.is_empty() || !activity_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(FulfillmentError::fetch(format!(
                "invalid Strava activity id '{activity_id}'"
            )));
        }

        let token = self.credentials.token_for(owner_hint).ok_or_else(|| {
            FulfillmentError::fetch("no Strava access token configured")
        })?;
        let url = self.activity_url(activity_id)?;

        tracing::debug!(
            activity_id = %activity_id,
            owner_hint = ?owner_hint,
            "Requesting Strava activity"
        );
        let response = self
            .client
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|e| {
                FulfillmentError::fetch(format!(
                    "Strava request for activity {activity_id} failed: {e}"
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                activity_id = %activity_id,
                status = status.as_u16(),
                "Strava request rejected"
            );
            return Err(Self::status_error(status, activity_id));
        }

        response.json::<Value>().await.map_err(|e| {
            FulfillmentError::fetch(format!(
                "Strava returned an unreadable body for {activity_id}: {e}"
            ))
        })
    }
}
