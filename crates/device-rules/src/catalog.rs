//! Rule catalog data model
//!
//! The catalog is an ordered, immutable list of rule sets. Each rule set
//! binds a device type and a precondition value to an ordered list of field
//! rules. Patterns are compiled when a [`FieldRule`] is built, never at
//! validation time.

use regex::Regex;
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;

/// How a property's canonical string is checked
#[derive(Debug, Clone)]
pub enum ValueMatcher {
    /// The value must contain a match of the expression. Anchors in the
    /// expression itself decide whether partial matches pass.
    Pattern(Regex),
    /// The value must equal one member exactly (case-sensitive)
    AllowedSet(HashSet<String>),
}

impl ValueMatcher {
    /// Check a canonical property string against this matcher
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            ValueMatcher::Pattern(regex) => regex.is_match(candidate),
            ValueMatcher::AllowedSet(allowed) => allowed.contains(candidate),
        }
    }

    /// Allowed values in sorted order, for display
    fn sorted_allowed(allowed: &HashSet<String>) -> Vec<&str> {
        let mut values: Vec<&str> = allowed.iter().map(|s| s.as_str()).collect();
        values.sort_unstable();
        values
    }
}

impl fmt::Display for ValueMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueMatcher::Pattern(regex) => write!(f, "pattern /{}/", regex.as_str()),
            ValueMatcher::AllowedSet(allowed) => {
                write!(f, "one of [{}]", Self::sorted_allowed(allowed).join(", "))
            }
        }
    }
}

impl Serialize for ValueMatcher {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "snake_case")]
        enum Repr<'a> {
            Pattern(&'a str),
            Allowed(Vec<&'a str>),
        }

        match self {
            ValueMatcher::Pattern(regex) => Repr::Pattern(regex.as_str()),
            ValueMatcher::AllowedSet(allowed) => Repr::Allowed(Self::sorted_allowed(allowed)),
        }
        .serialize(serializer)
    }
}

/// A constraint on one named property of the property bag
#[derive(Debug, Clone, Serialize)]
pub struct FieldRule {
    /// Property name to look up
    pub param_name: String,
    /// Check applied to the property's canonical string
    pub matcher: ValueMatcher,
}

impl FieldRule {
    /// Build a pattern rule, compiling the expression
    pub fn pattern(
        param_name: impl Into<String>,
        pattern: &str,
    ) -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            param_name: param_name.into(),
            matcher: ValueMatcher::Pattern(Regex::new(pattern)?),
        })
    }

    /// Build an allowed-set rule
    pub fn allowed<I, S>(param_name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            param_name: param_name.into(),
            matcher: ValueMatcher::AllowedSet(values.into_iter().map(Into::into).collect()),
        }
    }
}

/// Validation policy for one device type / precondition combination
#[derive(Debug, Clone, Serialize)]
pub struct RuleSet {
    /// Device type discriminator, compared case-insensitively
    #[serde(rename = "type")]
    pub rule_type: String,
    /// Name of the top-level request field holding the precondition
    pub precondition_field: String,
    /// Expected precondition value in canonical string form
    pub precondition_value: String,
    /// Rules in evaluation order
    pub field_rules: Vec<FieldRule>,
}

impl RuleSet {
    pub fn new(
        rule_type: impl Into<String>,
        precondition_field: impl Into<String>,
        precondition_value: impl Into<String>,
        field_rules: Vec<FieldRule>,
    ) -> Self {
        Self {
            rule_type: rule_type.into(),
            precondition_field: precondition_field.into(),
            precondition_value: precondition_value.into(),
            field_rules,
        }
    }

    /// Whether this rule set is keyed on the given precondition field
    pub fn uses_precondition_field(&self, field: &str) -> bool {
        self.precondition_field.eq_ignore_ascii_case(field)
    }

    /// Whether this rule set applies to a device type and precondition value
    pub fn applies_to(&self, device_type: &str, precondition_value: &str) -> bool {
        self.rule_type.to_lowercase() == device_type.to_lowercase()
            && self.precondition_value.to_lowercase() == precondition_value.to_lowercase()
    }

    fn selector(&self) -> (String, String, String) {
        (
            self.rule_type.to_lowercase(),
            self.precondition_field.to_lowercase(),
            self.precondition_value.to_lowercase(),
        )
    }
}

/// Ordered, immutable table of rule sets
#[derive(Debug, Clone)]
pub struct RuleCatalog {
    rule_sets: Vec<RuleSet>,
    digest: String,
}

impl RuleCatalog {
    /// Build a catalog from rule sets, keeping their order
    pub fn new(rule_sets: Vec<RuleSet>) -> Self {
        let mut seen = HashSet::new();
        for (index, rule_set) in rule_sets.iter().enumerate() {
            if !seen.insert(rule_set.selector()) {
                tracing::debug!(
                    index,
                    rule_type = %rule_set.rule_type,
                    precondition_value = %rule_set.precondition_value,
                    "Rule set shadowed by an earlier entry with the same selector"
                );
            }
        }

        let digest = fingerprint(&rule_sets);
        Self { rule_sets, digest }
    }

    /// An empty catalog; every request passes through
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Rule sets in catalog order
    pub fn rule_sets(&self) -> &[RuleSet] {
        &self.rule_sets
    }

    pub fn len(&self) -> usize {
        self.rule_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rule_sets.is_empty()
    }

    /// Hex SHA-256 over the catalog's content, independent of source format
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

fn fingerprint(rule_sets: &[RuleSet]) -> String {
    let mut hasher = Sha256::new();
    for rule_set in rule_sets {
        hasher.update(rule_set.rule_type.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(rule_set.precondition_field.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(rule_set.precondition_value.as_bytes());
        for rule in &rule_set.field_rules {
            hasher.update(b"\x1e");
            hasher.update(rule.param_name.as_bytes());
            hasher.update(b"\x1f");
            hasher.update(rule.matcher.to_string().as_bytes());
        }
        hasher.update(b"\x1d");
    }
    hex::encode(hasher.finalize())
}
