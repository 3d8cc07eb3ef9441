//! Device Rules
//!
//! Conditional field validation for device write requests. A request names a
//! device type and carries a precondition flag plus a bag of additional
//! properties; the catalog decides which properties must be present and what
//! shape their values must have.
//!
//! ## Architecture
//!
//! 1. **Catalog** (`catalog`): immutable, ordered rule sets with precompiled
//!    patterns.
//! 2. **Loader** (`loader`): reads JSON, YAML or TOML rule records and fails
//!    on the first structural problem.
//! 3. **Matcher** (`matcher`): picks the first rule set for a device type and
//!    precondition value.
//! 4. **Property bag** (`property`): typed lookups over the request's
//!    additional properties with one canonical string form per value.
//! 5. **Validator** (`validator`): fail-fast evaluation producing a
//!    [`Verdict`].
//!
//! ## Example
//!
//! ```rust
//! use device_rules::{CatalogLoader, FieldValidator, PropertyBag, RuleMatcher, SourceFormat};
//!
//! let catalog = CatalogLoader::parse(
//!     r#"[{"type": "Laptop", "preRequestName": "isEnabled", "preRequestValue": "true",
//!          "rules": [{"paramName": "warrantyYears", "regex": ["1", "2", "3"]}]}]"#,
//!     SourceFormat::Json,
//! )
//! .unwrap();
//!
//! let properties = serde_json::json!({"warrantyYears": "5"});
//! let bag = PropertyBag::from_value(&properties).unwrap();
//!
//! let rule_set = RuleMatcher::new(&catalog, "isEnabled")
//!     .find("laptop", "true")
//!     .unwrap();
//! let verdict = FieldValidator::new().validate(rule_set, &bag);
//! assert_eq!(verdict.message().unwrap(), "Invalid value for warrantyYears");
//! ```

pub mod catalog;
pub mod error;
pub mod loader;
pub mod matcher;
pub mod property;
pub mod validator;

pub use catalog::{FieldRule, RuleCatalog, RuleSet, ValueMatcher};
pub use error::{CatalogError, Result};
pub use loader::{CatalogLoader, SourceFormat};
pub use matcher::{RuleMatcher, DEFAULT_PRECONDITION_FIELD};
pub use property::{PropertyBag, PropertyKind, PropertyValue};
pub use validator::{FieldValidator, InvalidReason, Verdict};
