//! Typed viewer configuration with provenance

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use crate::fetcher::FetcherConfig;
use crate::render::RenderConfig;
use crate::transport::HttpSourceConfig;

const REDACTED: &str = "[REDACTED]";

/// Fetch pacing settings (`[fetch]` table)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetchSettings {
    pub max_consecutive_errors: u32,
    pub back_off_interval_ms: u64,
    pub regular_interval_ms: u64,
    pub request_timeout_seconds: u64,
}

/// Render loop settings (`[render]` table)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderSettings {
    /// Events folded per tick; unset folds everything queued.
    #[serde(default)]
    pub batch_limit: Option<usize>,
}

/// Configuration for one job log view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewerConfig {
    /// Events endpoint. Required to follow a live job.
    #[serde(default)]
    pub events_url: Option<String>,

    /// Bearer token for the events endpoint
    #[serde(default)]
    pub token: Option<String>,

    pub fetch: FetchSettings,

    #[serde(default)]
    pub render: RenderSettings,
}

/// Origin of a configuration layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    File,
    Cli,
}

/// A contributing layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (files only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the raw file bytes (files only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Merged configuration plus the layers it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ViewerConfig,
    pub sources: Vec<ConfigSource>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {message}")]
    Io { path: String, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl LoadedConfig {
    /// Merge defaults, an optional TOML file and CLI overrides, then validate.
    pub fn load(file: Option<&Path>, cli_overrides: Option<Value>) -> Result<Self, ConfigError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];

        if let Some(path) = file {
            let (value, digest) = load_toml_file(path)?;
            layers.push(value);
            sources.push(ConfigSource {
                origin: ConfigOrigin::File,
                path: Some(path.display().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let config = ViewerConfig::from_value(merge_layers(layers))?;
        Ok(Self { config, sources })
    }
}

fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
    let bytes = fs::read(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let digest = hex::encode(Sha256::digest(&bytes));

    let contents = String::from_utf8(bytes)
        .map_err(|e| ConfigError::Parse(format!("Invalid UTF-8 in {}: {}", path.display(), e)))?;
    let table: toml::Table = toml::from_str(&contents)
        .map_err(|e| ConfigError::Parse(format!("TOML parse error in {}: {}", path.display(), e)))?;
    let value = serde_json::to_value(table)
        .map_err(|e| ConfigError::Parse(format!("Unsupported value in {}: {}", path.display(), e)))?;

    Ok((value, digest))
}

impl ViewerConfig {
    /// Deserialize and validate a merged config value.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let config: ViewerConfig =
            serde_json::from_value(value).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults only, with the given endpoint.
    pub fn with_events_url(url: impl Into<String>) -> Self {
        let defaults = BuiltinDefaults::default();
        Self {
            events_url: Some(url.into()),
            token: None,
            fetch: FetchSettings {
                max_consecutive_errors: defaults.max_consecutive_errors,
                back_off_interval_ms: defaults.back_off_interval_ms,
                regular_interval_ms: defaults.regular_interval_ms,
                request_timeout_seconds: defaults.request_timeout_seconds,
            },
            render: RenderSettings::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref url) = self.events_url {
            if url.trim().is_empty() {
                return Err(ConfigError::Validation("events_url must not be empty".to_string()));
            }
        }

        if self.fetch.max_consecutive_errors == 0 {
            return Err(ConfigError::Validation(
                "fetch.max_consecutive_errors must be at least 1".to_string(),
            ));
        }

        if self.fetch.back_off_interval_ms == 0 || self.fetch.regular_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "fetch.back_off_interval_ms and fetch.regular_interval_ms must be positive".to_string(),
            ));
        }

        if self.fetch.request_timeout_seconds == 0 || self.fetch.request_timeout_seconds > 300 {
            return Err(ConfigError::Validation(
                "fetch.request_timeout_seconds must be in (0, 300]".to_string(),
            ));
        }

        if self.render.batch_limit == Some(0) {
            return Err(ConfigError::Validation(
                "render.batch_limit must be positive when set".to_string(),
            ));
        }

        Ok(())
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            max_consecutive_errors: self.fetch.max_consecutive_errors,
            back_off_interval: Duration::from_millis(self.fetch.back_off_interval_ms),
            regular_interval: Duration::from_millis(self.fetch.regular_interval_ms),
        }
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            batch_limit: self.render.batch_limit,
        }
    }

    /// HTTP source settings. Fails when no endpoint is configured.
    pub fn http_source_config(&self) -> Result<HttpSourceConfig, ConfigError> {
        let url = self
            .events_url
            .clone()
            .ok_or_else(|| ConfigError::Validation("events_url is required".to_string()))?;

        Ok(HttpSourceConfig {
            url,
            token: self.token.clone(),
            request_timeout: Duration::from_secs(self.fetch.request_timeout_seconds),
        })
    }

    /// JSON form with the token masked, for display and logs.
    pub fn redacted(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Some(token) = value.get_mut("token") {
            if !token.is_null() {
                *token = Value::String(REDACTED.to_string());
            }
        }
        value
    }
}
