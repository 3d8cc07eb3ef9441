//! Error types for rule catalog loading
//!
//! Every variant is a startup-time failure: a catalog that fails to load
//! must never be put into service.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or compiling a rule catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The rules file could not be read
    #[error("Failed to read rules file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The rules source is not valid JSON, YAML or TOML
    #[error("Parse error: {0}")]
    Parse(String),

    /// The file extension does not map to a supported format
    #[error("Unsupported rules format: {0}. Supported formats: json, yaml, yml, toml")]
    UnsupportedFormat(String),

    /// A rule set record lacks a mandatory key
    #[error("Rule set #{index}: missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    /// A rule set record declares no field rules
    #[error("Rule set #{index} ({rule_type}): field rules must not be empty")]
    EmptyFieldRules { index: usize, rule_type: String },

    /// A field rule lacks its parameter name
    #[error("Rule set #{index}, rule #{position}: missing 'paramName'")]
    MissingParamName { index: usize, position: usize },

    /// A field rule declares zero or several matchers
    #[error("Rule set #{index}, parameter '{param}': expected exactly one matcher, found {found}")]
    MatcherCount {
        index: usize,
        param: String,
        found: usize,
    },

    /// A pattern failed to compile
    #[error("Rule set #{index}, parameter '{param}': invalid pattern: {source}")]
    InvalidPattern {
        index: usize,
        param: String,
        #[source]
        source: regex::Error,
    },

    /// An allowed-value list is empty
    #[error("Rule set #{index}, parameter '{param}': allowed value set must not be empty")]
    EmptyAllowedSet { index: usize, param: String },
}

impl CatalogError {
    /// Create a parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        CatalogError::Parse(msg.into())
    }

    /// Whether the error stems from the content of the rules rather than
    /// from reading them
    pub fn is_content_error(&self) -> bool {
        !matches!(self, CatalogError::Io { .. })
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Parse(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for CatalogError {
    fn from(err: serde_yaml::Error) -> Self {
        CatalogError::Parse(format!("YAML error: {}", err))
    }
}

impl From<toml::de::Error> for CatalogError {
    fn from(err: toml::de::Error) -> Self {
        CatalogError::Parse(format!("TOML error: {}", err))
    }
}

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;
