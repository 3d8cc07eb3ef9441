//! Catalog loading
//!
//! Reads rule-set records from JSON, YAML or TOML text, checks their
//! structure and compiles every pattern. Loading is all-or-nothing: the
//! first structural problem aborts with a [`CatalogError`].
//!
//! Records follow the shape used by the device administration backend:
//!
//! ```json
//! {
//!   "validations": [
//!     {
//!       "type": "Laptop",
//!       "preRequestName": "isEnabled",
//!       "preRequestValue": "true",
//!       "rules": [
//!         { "paramName": "serialNumber", "regex": "^[A-Z]{2}\\d{6}$" },
//!         { "paramName": "warrantyYears", "regex": ["1", "2", "3"] }
//!       ]
//!     }
//!   ]
//! }
//! ```

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

use crate::catalog::{FieldRule, RuleCatalog, RuleSet};
use crate::error::{CatalogError, Result};
use crate::property::PropertyValue;

/// Serialization format of a rules source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Yaml,
    Toml,
}

impl SourceFormat {
    /// Pick the format from a file extension. Files without an extension
    /// are read as JSON.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("json")
            .to_lowercase();

        match extension.as_str() {
            "json" => Ok(SourceFormat::Json),
            "yaml" | "yml" => Ok(SourceFormat::Yaml),
            "toml" => Ok(SourceFormat::Toml),
            _ => Err(CatalogError::UnsupportedFormat(extension)),
        }
    }

    fn parse(self, source: &str) -> Result<Value> {
        match self {
            SourceFormat::Json => Ok(serde_json::from_str(source)?),
            SourceFormat::Yaml => Ok(serde_yaml::from_str(source)?),
            SourceFormat::Toml => {
                let toml_value: toml::Value = toml::from_str(source)?;
                serde_json::to_value(toml_value)
                    .map_err(|e| CatalogError::parse_error(format!("Conversion error: {}", e)))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRuleSet {
    #[serde(rename = "type", alias = "Type")]
    rule_type: Option<String>,
    #[serde(
        rename = "preRequestName",
        alias = "PreRequestName",
        alias = "preconditionFieldName",
        alias = "PreconditionFieldName"
    )]
    precondition_field: Option<String>,
    #[serde(
        rename = "preRequestValue",
        alias = "PreRequestValue",
        alias = "preconditionValue",
        alias = "PreconditionValue"
    )]
    precondition_value: Option<Value>,
    #[serde(
        rename = "rules",
        alias = "Rules",
        alias = "fieldRules",
        alias = "FieldRules"
    )]
    field_rules: Option<Vec<RawFieldRule>>,
}

#[derive(Debug, Deserialize)]
struct RawFieldRule {
    #[serde(rename = "paramName", alias = "ParamName")]
    param_name: Option<String>,
    #[serde(alias = "Regex")]
    regex: Option<RawMatcher>,
    #[serde(alias = "Pattern")]
    pattern: Option<String>,
    #[serde(alias = "Allowed")]
    allowed: Option<Vec<Value>>,
}

/// `regex` holds a pattern when it is a string and an allowed set when it
/// is a list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawMatcher {
    Pattern(String),
    Allowed(Vec<Value>),
}

enum MatcherSpec {
    Pattern(String),
    Allowed(Vec<Value>),
}

/// Builds a [`RuleCatalog`] from configuration text
pub struct CatalogLoader;

impl CatalogLoader {
    /// Load a catalog from a file, choosing the format by extension
    pub fn load(path: impl AsRef<Path>) -> Result<RuleCatalog> {
        let path = path.as_ref();
        let format = SourceFormat::from_path(path)?;
        let source = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(path = %path.display(), ?format, "Loading rule catalog");
        Self::parse(&source, format)
    }

    /// Parse a catalog from text in the given format
    pub fn parse(source: &str, format: SourceFormat) -> Result<RuleCatalog> {
        let records = match format.parse(source)? {
            Value::Array(records) => records,
            Value::Object(mut map) => match map
                .remove("validations")
                .or_else(|| map.remove("Validations"))
            {
                Some(Value::Array(records)) => records,
                Some(_) => {
                    return Err(CatalogError::parse_error(
                        "'validations' must be a list of rule sets",
                    ))
                }
                None => {
                    return Err(CatalogError::parse_error(
                        "expected a 'validations' list or a top-level list of rule sets",
                    ))
                }
            },
            _ => {
                return Err(CatalogError::parse_error(
                    "rules source must be an object or a list",
                ))
            }
        };

        let rule_sets = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| build_rule_set(index, record))
            .collect::<Result<Vec<_>>>()?;

        let catalog = RuleCatalog::new(rule_sets);
        tracing::info!(
            rule_sets = catalog.len(),
            digest = %catalog.digest(),
            "Rule catalog loaded"
        );
        Ok(catalog)
    }
}

fn build_rule_set(index: usize, record: Value) -> Result<RuleSet> {
    let raw: RawRuleSet = serde_json::from_value(record)
        .map_err(|e| CatalogError::parse_error(format!("Rule set #{}: {}", index, e)))?;

    let rule_type = raw
        .rule_type
        .ok_or(CatalogError::MissingField { index, field: "type" })?;
    let precondition_field = raw.precondition_field.ok_or(CatalogError::MissingField {
        index,
        field: "preRequestName",
    })?;
    let precondition_value = match raw.precondition_value {
        None | Some(Value::Null) => {
            return Err(CatalogError::MissingField {
                index,
                field: "preRequestValue",
            })
        }
        Some(value @ (Value::Array(_) | Value::Object(_))) => {
            return Err(CatalogError::parse_error(format!(
                "Rule set #{}: precondition value must be a scalar, found {}",
                index, value
            )))
        }
        Some(value) => PropertyValue::new(&value).canonical_string(),
    };

    let raw_rules = raw
        .field_rules
        .ok_or(CatalogError::MissingField { index, field: "rules" })?;
    if raw_rules.is_empty() {
        return Err(CatalogError::EmptyFieldRules { index, rule_type });
    }

    let mut seen = HashSet::new();
    let mut field_rules = Vec::with_capacity(raw_rules.len());
    for (position, raw_rule) in raw_rules.into_iter().enumerate() {
        let rule = build_field_rule(index, position, raw_rule)?;
        if !seen.insert(rule.param_name.clone()) {
            tracing::warn!(
                rule_type = %rule_type,
                param = %rule.param_name,
                "Duplicate parameter in rule set; both rules are evaluated in order"
            );
        }
        field_rules.push(rule);
    }

    Ok(RuleSet::new(
        rule_type,
        precondition_field,
        precondition_value,
        field_rules,
    ))
}

fn build_field_rule(index: usize, position: usize, raw: RawFieldRule) -> Result<FieldRule> {
    let param = raw
        .param_name
        .ok_or(CatalogError::MissingParamName { index, position })?;

    let mut specs: Vec<MatcherSpec> = Vec::with_capacity(1);
    match raw.regex {
        Some(RawMatcher::Pattern(p)) => specs.push(MatcherSpec::Pattern(p)),
        Some(RawMatcher::Allowed(values)) => specs.push(MatcherSpec::Allowed(values)),
        None => {}
    }
    if let Some(p) = raw.pattern {
        specs.push(MatcherSpec::Pattern(p));
    }
    if let Some(values) = raw.allowed {
        specs.push(MatcherSpec::Allowed(values));
    }

    if specs.len() != 1 {
        return Err(CatalogError::MatcherCount {
            index,
            param,
            found: specs.len(),
        });
    }

    match specs.remove(0) {
        MatcherSpec::Pattern(pattern) => FieldRule::pattern(param.clone(), &pattern)
            .map_err(|source| CatalogError::InvalidPattern {
                index,
                param,
                source,
            }),
        MatcherSpec::Allowed(values) => {
            if values.is_empty() {
                return Err(CatalogError::EmptyAllowedSet { index, param });
            }
            let allowed: Vec<String> = values
                .iter()
                .map(|v| PropertyValue::new(v).canonical_string())
                .collect();
            Ok(FieldRule::allowed(param, allowed))
        }
    }
}
