//! Sink construction options and the on-disk hook configuration.
//!
//! [`SinkOptions`] is what a caller hands to [`crate::Synchronizer::new`]. It is
//! validated synchronously, before the synchronizer subscribes to anything.
//!
//! [`SinkConfig`] is the optional JSON file read by the hook binary
//! (`~/.trailmark/config.json`). Reads are best-effort; a missing or malformed
//! file yields defaults so the hook keeps working.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs_err as fs;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::api::AnalyticsApi;
use crate::error::ConfigError;
use crate::source::TelemetrySource;

/// Builder for the inputs a [`crate::Synchronizer`] needs.
#[derive(Default, Clone)]
pub struct SinkOptions {
    app_host_name: Option<String>,
    api: Option<Arc<dyn AnalyticsApi>>,
    telemetry_source: Option<Arc<dyn TelemetrySource>>,
}

impl SinkOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host part of the `app://{host}/` base URL, e.g. `"myapp"`.
    pub fn app_host_name(mut self, host: impl Into<String>) -> Self {
        self.app_host_name = Some(host.into());
        self
    }

    pub fn api(mut self, api: Arc<dyn AnalyticsApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn telemetry_source(mut self, source: Arc<dyn TelemetrySource>) -> Self {
        self.telemetry_source = Some(source);
        self
    }

    /// Checks every required field, in declaration order.
    pub fn validate(self) -> Result<ValidatedOptions, ConfigError> {
        let host = match self.app_host_name {
            Some(h) if !h.trim().is_empty() => h,
            _ => return Err(ConfigError::MissingAppHostName),
        };
        let api = self.api.ok_or(ConfigError::MissingApi)?;
        let telemetry_source = self
            .telemetry_source
            .ok_or(ConfigError::MissingTelemetrySource)?;
        let base_url = base_app_url(&host)?;

        Ok(ValidatedOptions {
            base_url,
            api,
            telemetry_source,
        })
    }
}

impl fmt::Debug for SinkOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkOptions")
            .field("app_host_name", &self.app_host_name)
            .field("api", &self.api.is_some())
            .field("telemetry_source", &self.telemetry_source.is_some())
            .finish()
    }
}

/// Options that passed validation.
pub struct ValidatedOptions {
    pub base_url: Url,
    pub api: Arc<dyn AnalyticsApi>,
    pub telemetry_source: Arc<dyn TelemetrySource>,
}

/// Returns `app://{host}/`.
pub fn base_app_url(host: &str) -> Result<Url, ConfigError> {
    let host = host.trim();
    Url::parse(&format!("app://{}/", host)).map_err(|source| ConfigError::InvalidAppHostName {
        host: host.to_string(),
        source,
    })
}

/// Persisted settings for the hook binary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(default)]
    pub app_host_name: Option<String>,
}

/// Returns the path to the Trailmark data directory (~/.trailmark).
pub fn get_trailmark_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".trailmark"))
}

/// Returns the path to the hook configuration file.
pub fn get_config_path() -> Option<PathBuf> {
    get_trailmark_dir().map(|d| d.join("config.json"))
}

/// Loads the hook configuration, returning defaults if the file doesn't exist.
pub fn load_sink_config() -> SinkConfig {
    get_config_path()
        .map(|p| load_sink_config_from(&p))
        .unwrap_or_default()
}

/// Loads the hook configuration from a specific file.
pub fn load_sink_config_from(path: &Path) -> SinkConfig {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return SinkConfig::default(),
    };

    if content.trim().is_empty() {
        return SinkConfig::default();
    }

    match serde_json::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                error = %e,
                path = %path.display(),
                "Failed to parse config file, using defaults"
            );
            SinkConfig::default()
        }
    }
}

/// Saves the hook configuration, creating the parent directory if needed.
pub fn save_sink_config_to(path: &Path, config: &SinkConfig) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, content).map_err(|e| format!("Failed to write config: {}", e))
}
