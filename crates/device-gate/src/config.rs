//! Gate configuration
//!
//! Settings are read once at startup from a JSON, YAML or TOML file (chosen
//! by extension). Every field has a default so an empty file is valid; the
//! CLI layers flag and environment overrides on top.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{GateError, Result};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Configuration for the request gate service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Socket address to listen on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Rule catalog file
    #[serde(default = "default_rules_path")]
    pub rules_path: PathBuf,
    /// Base URL of the CRUD backend accepted requests are forwarded to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_url: Option<String>,
    /// Upstream request timeout in milliseconds
    #[serde(default = "default_upstream_timeout_ms")]
    pub upstream_timeout_ms: u64,
    /// Path prefix of the protected resource, compared case-insensitively
    #[serde(default = "default_protected_prefix")]
    pub protected_prefix: String,
    /// Top-level body field holding the device type
    #[serde(default = "default_discriminator_field")]
    pub discriminator_field: String,
    /// Top-level body field holding the precondition value
    #[serde(default = "default_precondition_field")]
    pub precondition_field: String,
    /// Top-level body field holding the property bag
    #[serde(default = "default_properties_field")]
    pub properties_field: String,
    /// Maximum request body size in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_rules_path() -> PathBuf {
    PathBuf::from("example_validation_rules.json")
}

fn default_upstream_timeout_ms() -> u64 {
    30000 // 30 seconds
}

fn default_protected_prefix() -> String {
    "/api/devices".to_string()
}

fn default_discriminator_field() -> String {
    "deviceTypeName".to_string()
}

fn default_precondition_field() -> String {
    device_rules::DEFAULT_PRECONDITION_FIELD.to_string()
}

fn default_properties_field() -> String {
    "additionalProperties".to_string()
}

fn default_max_body_size() -> usize {
    1024 * 1024 // 1MB
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            rules_path: default_rules_path(),
            upstream_url: None,
            upstream_timeout_ms: default_upstream_timeout_ms(),
            protected_prefix: default_protected_prefix(),
            discriminator_field: default_discriminator_field(),
            precondition_field: default_precondition_field(),
            properties_field: default_properties_field(),
            max_body_size: default_max_body_size(),
            log_format: LogFormat::default(),
        }
    }
}

impl GateConfig {
    /// Load settings from a file, choosing the format by extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GateError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let config: GateConfig = match extension.as_str() {
            "json" => serde_json::from_str(&content)?,
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "toml" => toml::from_str(&content)?,
            _ => {
                return Err(GateError::config(format!(
                    "Unsupported config format: {}. Supported formats: json, yaml, yml, toml",
                    extension
                )))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints serde cannot express
    pub fn validate(&self) -> Result<()> {
        if !self.protected_prefix.starts_with('/') {
            return Err(GateError::config(format!(
                "protected_prefix must start with '/', got '{}'",
                self.protected_prefix
            )));
        }
        if self.max_body_size == 0 {
            return Err(GateError::config("max_body_size must be greater than zero"));
        }
        if self.upstream_timeout_ms == 0 {
            return Err(GateError::config("upstream_timeout_ms must be greater than zero"));
        }
        for (name, value) in [
            ("discriminator_field", &self.discriminator_field),
            ("precondition_field", &self.precondition_field),
            ("properties_field", &self.properties_field),
        ] {
            if value.trim().is_empty() {
                return Err(GateError::config(format!("{} must not be empty", name)));
            }
        }
        if let Some(url) = &self.upstream_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(GateError::config(format!(
                    "upstream_url must be an http(s) URL, got '{}'",
                    url
                )));
            }
        }
        Ok(())
    }
}
