//! Service-level error types
//!
//! These cover startup and command failures. Per-request rejections live in
//! [`crate::handler::GateRejection`] and never surface here.

use device_rules::CatalogError;
use thiserror::Error;

use crate::handler::ForwardError;
use crate::telemetry::TelemetryError;

/// Errors that stop the gate from starting or a command from completing
#[derive(Error, Debug)]
pub enum GateError {
    /// Invalid settings or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration file could not be read or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// File access or socket I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The rule catalog failed to load
    #[error("Rule catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Metrics registry setup failed
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    /// Upstream client could not be built
    #[error("Upstream error: {0}")]
    Upstream(#[from] ForwardError),

    /// Command output could not be rendered
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GateError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        GateError::InvalidInput(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        GateError::Config(msg.into())
    }

    /// Check if this is a user-facing error (vs internal)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            GateError::InvalidInput(_) | GateError::Config(_) | GateError::Catalog(_)
        )
    }
}

impl From<serde_json::Error> for GateError {
    fn from(err: serde_json::Error) -> Self {
        GateError::Config(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for GateError {
    fn from(err: serde_yaml::Error) -> Self {
        GateError::Config(format!("YAML error: {}", err))
    }
}

impl From<toml::de::Error> for GateError {
    fn from(err: toml::de::Error) -> Self {
        GateError::Config(format!("TOML error: {}", err))
    }
}

/// Result type alias for gate operations
pub type Result<T> = std::result::Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GateError::config("upstream_url is required");
        assert_eq!(err.to_string(), "Configuration error: upstream_url is required");
    }

    #[test]
    fn test_is_user_error() {
        assert!(GateError::invalid_input("bad").is_user_error());
        assert!(GateError::Catalog(CatalogError::parse_error("bad")).is_user_error());
        assert!(!GateError::Io(std::io::Error::new(std::io::ErrorKind::Other, "x")).is_user_error());
    }
}
