//! Rule set selection

use crate::catalog::{RuleCatalog, RuleSet};

/// Default precondition field for device requests
pub const DEFAULT_PRECONDITION_FIELD: &str = "isEnabled";

/// Selects the rule set that governs a request.
///
/// A matcher serves one precondition field; rule sets keyed on a different
/// field are never selected. When several rule sets share a selector the
/// first in catalog order wins.
#[derive(Debug, Clone, Copy)]
pub struct RuleMatcher<'a> {
    catalog: &'a RuleCatalog,
    precondition_field: &'a str,
}

impl<'a> RuleMatcher<'a> {
    pub fn new(catalog: &'a RuleCatalog, precondition_field: &'a str) -> Self {
        Self {
            catalog,
            precondition_field,
        }
    }

    /// First rule set whose type and precondition value match, ignoring case
    pub fn find(&self, device_type: &str, precondition_value: &str) -> Option<&'a RuleSet> {
        self.catalog.rule_sets().iter().find(|rule_set| {
            rule_set.uses_precondition_field(self.precondition_field)
                && rule_set.applies_to(device_type, precondition_value)
        })
    }

    /// Same as [`find`](Self::find) for a boolean precondition
    pub fn find_for_flag(&self, device_type: &str, flag: bool) -> Option<&'a RuleSet> {
        self.find(device_type, if flag { "true" } else { "false" })
    }

    pub fn precondition_field(&self) -> &str {
        self.precondition_field
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldRule;

    fn rule_set(rule_type: &str, field: &str, value: &str, param: &str) -> RuleSet {
        RuleSet::new(
            rule_type,
            field,
            value,
            vec![FieldRule::allowed(param, ["x"])],
        )
    }

    fn catalog() -> RuleCatalog {
        RuleCatalog::new(vec![
            rule_set("Laptop", "isEnabled", "true", "first"),
            rule_set("Laptop", "isEnabled", "false", "disabled"),
            rule_set("laptop", "isEnabled", "TRUE", "second"),
            rule_set("Phone", "isActive", "true", "other-field"),
        ])
    }

    #[test]
    fn test_case_insensitive_match() {
        let catalog = catalog();
        let matcher = RuleMatcher::new(&catalog, DEFAULT_PRECONDITION_FIELD);

        let found = matcher.find("LAPTOP", "True").unwrap();
        assert_eq!(found.field_rules[0].param_name, "first");

        let found = matcher.find("laptop", "false").unwrap();
        assert_eq!(found.field_rules[0].param_name, "disabled");
    }

    #[test]
    fn test_first_in_catalog_order_wins() {
        let catalog = catalog();
        let matcher = RuleMatcher::new(&catalog, "isEnabled");
        let found = matcher.find_for_flag("laptop", true).unwrap();
        assert_eq!(found.field_rules[0].param_name, "first");
    }

    #[test]
    fn test_no_match() {
        let catalog = catalog();
        let matcher = RuleMatcher::new(&catalog, "isEnabled");
        assert!(matcher.find("Tablet", "true").is_none());
        assert!(matcher.find("Laptop", "maybe").is_none());
        assert!(RuleMatcher::new(&RuleCatalog::empty(), "isEnabled")
            .find("Laptop", "true")
            .is_none());
    }

    #[test]
    fn test_other_precondition_field_ignored() {
        let catalog = catalog();
        assert!(RuleMatcher::new(&catalog, "isEnabled")
            .find("Phone", "true")
            .is_none());

        let matcher = RuleMatcher::new(&catalog, "IsActive");
        assert_eq!(matcher.precondition_field(), "IsActive");
        let found = matcher.find("phone", "true").unwrap();
        assert_eq!(found.field_rules[0].param_name, "other-field");
    }
}
