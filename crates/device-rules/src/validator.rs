//! Field validation
//!
//! Applies a rule set's field rules, in declared order, to a property bag.
//! Evaluation stops at the first failing rule and that rule alone decides
//! the verdict.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::{RuleSet, ValueMatcher};
use crate::property::PropertyBag;

/// Why a property was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    /// The property is absent from the bag
    MissingProperty,
    /// The value does not match the rule's pattern
    PatternMismatch,
    /// The value is not in the rule's allowed set
    ValueNotAllowed,
}

impl InvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidReason::MissingProperty => "missing_property",
            InvalidReason::PatternMismatch => "pattern_mismatch",
            InvalidReason::ValueNotAllowed => "value_not_allowed",
        }
    }

    /// Client-facing diagnostic for a property refused for this reason
    pub fn message_for(&self, param_name: &str) -> String {
        match self {
            InvalidReason::MissingProperty => format!("Missing property: {}", param_name),
            InvalidReason::PatternMismatch => format!("Invalid format for {}", param_name),
            InvalidReason::ValueNotAllowed => format!("Invalid value for {}", param_name),
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of validating a property bag against a rule set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Valid,
    Invalid {
        param_name: String,
        reason: InvalidReason,
    },
}

impl Verdict {
    pub fn invalid(param_name: impl Into<String>, reason: InvalidReason) -> Self {
        Verdict::Invalid {
            param_name: param_name.into(),
            reason,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }

    /// Client-facing diagnostic; `None` for a valid verdict
    pub fn message(&self) -> Option<String> {
        match self {
            Verdict::Valid => None,
            Verdict::Invalid { param_name, reason } => Some(reason.message_for(param_name)),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(message) => f.write_str(&message),
            None => f.write_str("valid"),
        }
    }
}

/// Stateless validator over precompiled rule sets
#[derive(Debug, Default, Clone, Copy)]
pub struct FieldValidator;

impl FieldValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate `properties` against every rule of `rule_set`, stopping at
    /// the first failure
    pub fn validate(&self, rule_set: &RuleSet, properties: &PropertyBag<'_>) -> Verdict {
        for rule in &rule_set.field_rules {
            let Some(value) = properties.get(&rule.param_name) else {
                return Verdict::invalid(&rule.param_name, InvalidReason::MissingProperty);
            };

            let candidate = value.canonical_string();
            if !rule.matcher.matches(&candidate) {
                let reason = match rule.matcher {
                    ValueMatcher::Pattern(_) => InvalidReason::PatternMismatch,
                    ValueMatcher::AllowedSet(_) => InvalidReason::ValueNotAllowed,
                };
                tracing::debug!(
                    rule_type = %rule_set.rule_type,
                    param = %rule.param_name,
                    %reason,
                    "Field rule failed"
                );
                return Verdict::invalid(&rule.param_name, reason);
            }
        }

        Verdict::Valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldRule;
    use serde_json::json;

    fn laptop() -> RuleSet {
        RuleSet::new(
            "Laptop",
            "isEnabled",
            "true",
            vec![
                FieldRule::pattern("serialNumber", r"^[A-Z]{2}\d{6}$").unwrap(),
                FieldRule::allowed("warrantyYears", ["1", "2", "3"]),
            ],
        )
    }

    fn check(properties: serde_json::Value) -> Verdict {
        let bag = PropertyBag::from_value(&properties).unwrap();
        FieldValidator::new().validate(&laptop(), &bag)
    }

    #[test]
    fn test_all_rules_pass() {
        let verdict = check(json!({"serialNumber": "AB123456", "warrantyYears": "2"}));
        assert!(verdict.is_valid());
        assert_eq!(verdict.message(), None);
        assert_eq!(verdict.to_string(), "valid");
    }

    #[test]
    fn test_pattern_mismatch() {
        let verdict = check(json!({"serialNumber": "ab123456", "warrantyYears": "2"}));
        assert_eq!(
            verdict,
            Verdict::invalid("serialNumber", InvalidReason::PatternMismatch)
        );
        assert_eq!(verdict.message().unwrap(), "Invalid format for serialNumber");
    }

    #[test]
    fn test_value_not_allowed() {
        let verdict = check(json!({"serialNumber": "AB123456", "warrantyYears": "5"}));
        assert_eq!(verdict.message().unwrap(), "Invalid value for warrantyYears");
    }

    #[test]
    fn test_missing_property() {
        let verdict = check(json!({"serialNumber": "AB123456"}));
        assert_eq!(
            verdict,
            Verdict::invalid("warrantyYears", InvalidReason::MissingProperty)
        );
        assert_eq!(verdict.message().unwrap(), "Missing property: warrantyYears");
    }

    #[test]
    fn test_first_failure_wins() {
        // Both rules fail; only the first declared one is reported.
        let verdict = check(json!({"serialNumber": "bad", "warrantyYears": "9"}));
        assert_eq!(verdict.message().unwrap(), "Invalid format for serialNumber");

        let verdict = check(json!({"warrantyYears": "9"}));
        assert_eq!(verdict.message().unwrap(), "Missing property: serialNumber");
    }

    #[test]
    fn test_numeric_value_uses_canonical_form() {
        let verdict = check(json!({"serialNumber": "AB123456", "warrantyYears": 3}));
        assert!(verdict.is_valid());

        let verdict = check(json!({"serialNumber": "AB123456", "warrantyYears": 3.0}));
        assert_eq!(
            verdict,
            Verdict::invalid("warrantyYears", InvalidReason::ValueNotAllowed)
        );
    }

    #[test]
    fn test_large_and_trailing_zero_numbers_match_as_written() {
        let rule_set = RuleSet::new(
            "Scale",
            "isEnabled",
            "true",
            vec![
                FieldRule::pattern("serial", r"^\d+$").unwrap(),
                FieldRule::allowed("price", ["2.50"]),
            ],
        );
        let properties: serde_json::Value =
            serde_json::from_str(r#"{"serial": 12345678901234567890123, "price": 2.50}"#).unwrap();
        let bag = PropertyBag::from_value(&properties).unwrap();
        assert_eq!(FieldValidator::new().validate(&rule_set, &bag), Verdict::Valid);

        let properties: serde_json::Value =
            serde_json::from_str(r#"{"serial": 12345678901234567890123, "price": 2.5}"#).unwrap();
        let bag = PropertyBag::from_value(&properties).unwrap();
        assert_eq!(
            FieldValidator::new().validate(&rule_set, &bag),
            Verdict::invalid("price", InvalidReason::ValueNotAllowed)
        );
    }

    #[test]
    fn test_duplicate_params_evaluated_in_order() {
        let rule_set = RuleSet::new(
            "Laptop",
            "isEnabled",
            "true",
            vec![
                FieldRule::pattern("code", r"^\d+$").unwrap(),
                FieldRule::allowed("code", ["1"]),
            ],
        );
        let value = json!({"code": "2"});
        let bag = PropertyBag::from_value(&value).unwrap();
        assert_eq!(
            FieldValidator::new().validate(&rule_set, &bag),
            Verdict::invalid("code", InvalidReason::ValueNotAllowed)
        );
    }

    #[test]
    fn test_verdict_serialization() {
        let verdict = Verdict::invalid("serialNumber", InvalidReason::PatternMismatch);
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["verdict"], "invalid");
        assert_eq!(json["param_name"], "serialNumber");
        assert_eq!(json["reason"], "pattern_mismatch");

        let json = serde_json::to_value(Verdict::Valid).unwrap();
        assert_eq!(json, json!({"verdict": "valid"}));
    }
}
