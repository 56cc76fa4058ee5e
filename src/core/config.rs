//! Pipeline configuration loaded from TOML with environment overrides.
//!
//! Every section carries defaults, so an empty file (or no file at all)
//! yields a runnable configuration pointed at local directories.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::core::error::{FulfillmentError, Result};

pub const ENV_STRAVA_TOKEN: &str = "ROUTEPRINT_STRAVA_TOKEN";
pub const ENV_GENERATION_TIMEOUT: &str = "ROUTEPRINT_GENERATION_TIMEOUT_SECS";
pub const ENV_STORE_ROOT: &str = "ROUTEPRINT_STORE_ROOT";

pub const DEFAULT_STYLE: &str = "mapbox://styles/mapbox/outdoors-v12";
pub const DEFAULT_ROUTE_COLOR: &str = "#fc5200";
pub const DEFAULT_ROUTE_WIDTH: f64 = 4.0;

/// Top-level pipeline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Hard ceiling on resolve + render, in seconds
    pub generation_timeout_secs: u64,
    pub defaults: RenderDefaults,
    pub store: StoreConfig,
    pub session: SessionConfig,
    pub strava: StravaConfig,
    pub audit: AuditConfig,
    pub renderer: RendererConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            generation_timeout_secs: 300,
            defaults: RenderDefaults::default(),
            store: StoreConfig::default(),
            session: SessionConfig::default(),
            strava: StravaConfig::default(),
            audit: AuditConfig::default(),
            renderer: RendererConfig::default(),
        }
    }
}

/// Values used whenever an order does not declare its own
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderDefaults {
    pub style: String,
    pub route_color: String,
    pub route_width: f64,
    pub print_format: String,
    pub orientation: String,
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            style: DEFAULT_STYLE.to_string(),
            route_color: DEFAULT_ROUTE_COLOR.to_string(),
            route_width: DEFAULT_ROUTE_WIDTH,
            print_format: "A4".to_string(),
            orientation: "portrait".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("map-configs"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Use an in-process session store instead of treating it as unreachable
    pub in_memory: bool,
    pub ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            in_memory: false,
            ttl_secs: 3600,
        }
    }
}

/// Secret read from configuration, wiped from memory on drop
#[derive(Clone, Default, PartialEq, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct StravaConfig {
    pub base_url: Url,
    pub access_token: Option<SecretString>,
    pub request_timeout_secs: u64,
    /// Per-athlete access tokens keyed by athlete id
    pub athlete_tokens: HashMap<String, SecretString>,
}

impl Default for StravaConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://www.strava.com/api/v3")
                .expect("static Strava URL is valid"),
            access_token: None,
            request_timeout_secs: 30,
            athlete_tokens: HashMap::new(),
        }
    }
}

impl std::fmt::Debug for StravaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StravaConfig")
            .field("base_url", &self.base_url.as_str())
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("athlete_tokens", &self.athlete_tokens.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// SQLite file path, or ":memory:"
    pub database_path: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            database_path: "generation_records.sqlite".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Shell command with `{config}` and `{output}` placeholders
    pub command: String,
    pub output_dir: PathBuf,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            command: "node render-map.js --config {config} --output {output}".to_string(),
            output_dir: PathBuf::from("renders"),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from an explicit path, the user config directory,
    /// or built-in defaults, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => {
                    tracing::debug!("No configuration file found, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.check()?;
        Ok(config)
    }

    /// `<config dir>/routeprint/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("routeprint").join("config.toml"))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FulfillmentError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), "Loaded pipeline configuration");
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| FulfillmentError::config(format!("Failed to parse configuration: {e}")))
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(ENV_STRAVA_TOKEN).filter(|t| !t.trim().is_empty()) {
            self.strava.access_token = Some(SecretString::new(token));
        }
        if let Some(raw) = lookup(ENV_GENERATION_TIMEOUT) {
            self.generation_timeout_secs = raw.trim().parse().map_err(|_| {
                FulfillmentError::config(format!("{ENV_GENERATION_TIMEOUT} must be an integer, got '{raw}'"))
            })?;
        }
        if let Some(root) = lookup(ENV_STORE_ROOT).filter(|r| !r.trim().is_empty()) {
            self.store.root = PathBuf::from(root);
        }
        Ok(())
    }

    fn check(&self) -> Result<()> {
        if self.generation_timeout_secs == 0 {
            return Err(FulfillmentError::config(
                "generation_timeout_secs must be greater than zero",
            ));
        }
        if self.defaults.style.trim().is_empty() {
            return Err(FulfillmentError::config("defaults.style cannot be empty"));
        }
        Ok(())
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.generation_timeout(), Duration::from_secs(300));
        assert_eq!(config.defaults.route_color, "#fc5200");
        assert_eq!(config.defaults.route_width, 4.0);
        assert_eq!(config.strava.base_url.as_str(), "https://www.strava.com/api/v3");
        assert!(!config.session.in_memory);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml(
            r##"
            generation_timeout_secs = 120

            [defaults]
            style = "mapbox://styles/acme/poster"

            [strava]
            access_token = "abc123"

            [strava.athlete_tokens]
            "42" = "athlete-token"
            "##,
        )
        .unwrap();

        assert_eq!(config.generation_timeout_secs, 120);
        assert_eq!(config.defaults.style, "mapbox://styles/acme/poster");
        assert_eq!(config.defaults.route_color, "#fc5200");
        assert_eq!(
            config.strava.access_token.as_ref().map(SecretString::expose),
            Some("abc123")
        );
        assert_eq!(config.strava.athlete_tokens["42"].expose(), "athlete-token");
        assert_eq!(config.audit.database_path, "generation_records.sqlite");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = PipelineConfig::from_toml("generation_timeout_secs = \"soon\"");
        assert!(matches!(result, Err(FulfillmentError::Config(_))));
    }

    #[test]
    fn test_overrides() {
        let mut config = PipelineConfig::default();
        config
            .apply_overrides(|key| match key {
                ENV_STRAVA_TOKEN => Some("env-token".to_string()),
                ENV_GENERATION_TIMEOUT => Some("45".to_string()),
                ENV_STORE_ROOT => Some("/srv/configs".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(
            config.strava.access_token.as_ref().map(SecretString::expose),
            Some("env-token")
        );
        assert_eq!(config.generation_timeout_secs, 45);
        assert_eq!(config.store.root, PathBuf::from("/srv/configs"));
    }

    #[test]
    fn test_bad_timeout_override() {
        let mut config = PipelineConfig::default();
        let result = config.apply_overrides(|key| {
            (key == ENV_GENERATION_TIMEOUT).then(|| "five".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file_rejects_zero_timeout() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "generation_timeout_secs = 0").unwrap();
        let result = PipelineConfig::load(Some(file.path()));
        assert!(matches!(result, Err(FulfillmentError::Config(_))));
    }

    #[test]
    fn test_secret_string_zeroize_clears_value() {
        let mut secret = SecretString::new("athlete-token");
        secret.zeroize();
        assert_eq!(secret.expose(), "");
        assert_eq!(format!("{:?}", SecretString::new("abc123")), "[REDACTED]");
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let mut config = PipelineConfig::default();
        config.strava.access_token = Some(SecretString::new("super-secret-token"));
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }
}
