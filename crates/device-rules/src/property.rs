//! Typed view over the property bag carried in a request body

use serde_json::{Map, Value};
use std::fmt;

/// Kind of a property value, as seen by the validator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyKind::Null => "null",
            PropertyKind::Bool => "boolean",
            PropertyKind::Number => "number",
            PropertyKind::String => "string",
            PropertyKind::Array => "array",
            PropertyKind::Object => "object",
        };
        f.write_str(name)
    }
}

/// A borrowed property value
#[derive(Debug, Clone, Copy)]
pub struct PropertyValue<'a>(&'a Value);

impl<'a> PropertyValue<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self(value)
    }

    pub fn kind(&self) -> PropertyKind {
        match self.0 {
            Value::Null => PropertyKind::Null,
            Value::Bool(_) => PropertyKind::Bool,
            Value::Number(_) => PropertyKind::Number,
            Value::String(_) => PropertyKind::String,
            Value::Array(_) => PropertyKind::Array,
            Value::Object(_) => PropertyKind::Object,
        }
    }

    /// The text every matcher sees.
    ///
    /// Strings are unquoted, numbers keep the decimal text they were written
    /// with, booleans are lowercase and `null` is `null`. Arrays and objects render as compact
    /// JSON.
    pub fn canonical_string(&self) -> String {
        match self.0 {
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Null => "null".to_string(),
            other => other.to_string(),
        }
    }

    pub fn as_value(&self) -> &'a Value {
        self.0
    }
}

/// Read-only, name-addressed set of properties
#[derive(Debug, Clone, Copy)]
pub struct PropertyBag<'a> {
    properties: &'a Map<String, Value>,
}

impl<'a> PropertyBag<'a> {
    pub fn new(properties: &'a Map<String, Value>) -> Self {
        Self { properties }
    }

    /// View a JSON value as a property bag; `None` unless it is an object
    pub fn from_value(value: &'a Value) -> Option<Self> {
        value.as_object().map(Self::new)
    }

    /// Look up a property by exact name
    pub fn get(&self, name: &str) -> Option<PropertyValue<'a>> {
        self.properties.get(name).map(PropertyValue::new)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}
