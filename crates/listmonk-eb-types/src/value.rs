//! Property values and intrinsic references
//!
//! A resource's configuration is a tree of [`Property`] nodes whose leaves are
//! [`Value`]s. Values either carry a literal or point at another resource
//! (its id, one of its attributes, or a field of a stored secret). Pointers
//! are what turn a flat list of resources into a dependency graph.

use crate::LogicalId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A scalar configuration value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Known at plan time
    Literal(String),

    /// The primary identifier of another resource
    Ref(LogicalId),

    /// A named attribute of another resource, known only after it exists
    GetAtt { target: LogicalId, attribute: String },

    /// Concatenation of values
    Join { delimiter: String, parts: Vec<Value> },

    /// Dynamic reference to one field of a stored secret.
    ///
    /// The provider resolves it when it applies the plan; the plan itself
    /// only ever holds the pointer.
    SecretField { secret: LogicalId, field: String },
}

impl Value {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn reference(target: &LogicalId) -> Self {
        Self::Ref(target.clone())
    }

    pub fn attribute(target: &LogicalId, attribute: impl Into<String>) -> Self {
        Self::GetAtt {
            target: target.clone(),
            attribute: attribute.into(),
        }
    }

    pub fn join(delimiter: impl Into<String>, parts: Vec<Value>) -> Self {
        Self::Join {
            delimiter: delimiter.into(),
            parts,
        }
    }

    pub fn secret_field(secret: &LogicalId, field: impl Into<String>) -> Self {
        Self::SecretField {
            secret: secret.clone(),
            field: field.into(),
        }
    }

    /// The literal text, if this value is fully known at plan time
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(s) => Some(s),
            _ => None,
        }
    }

    /// Collect every resource this value points at
    pub fn collect_references(&self, out: &mut BTreeSet<LogicalId>) {
        match self {
            Self::Literal(_) => {}
            Self::Ref(target) | Self::GetAtt { target, .. } => {
                out.insert(target.clone());
            }
            Self::SecretField { secret, .. } => {
                out.insert(secret.clone());
            }
            Self::Join { parts, .. } => {
                for part in parts {
                    part.collect_references(out);
                }
            }
        }
    }

    pub fn references(&self) -> BTreeSet<LogicalId> {
        let mut out = BTreeSet::new();
        self.collect_references(&mut out);
        out
    }

    /// Whether resolving this value would materialize secret material
    pub fn contains_secret(&self) -> bool {
        match self {
            Self::SecretField { .. } => true,
            Self::Join { parts, .. } => parts.iter().any(Value::contains_secret),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Literal(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}

/// A node in a resource's property tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Property {
    Value(Value),
    Bool(bool),
    Int(i64),
    Number(f64),
    List(Vec<Property>),
    Map(Properties),
}

impl Property {
    pub fn list<I, P>(items: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Property>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn collect_references(&self, out: &mut BTreeSet<LogicalId>) {
        match self {
            Self::Value(v) => v.collect_references(out),
            Self::List(items) => {
                for item in items {
                    item.collect_references(out);
                }
            }
            Self::Map(map) => map.collect_references(out),
            Self::Bool(_) | Self::Int(_) | Self::Number(_) => {}
        }
    }

    pub fn references(&self) -> BTreeSet<LogicalId> {
        let mut out = BTreeSet::new();
        self.collect_references(&mut out);
        out
    }

    pub fn contains_secret(&self) -> bool {
        match self {
            Self::Value(v) => v.contains_secret(),
            Self::List(items) => items.iter().any(Property::contains_secret),
            Self::Map(map) => map.values().any(Property::contains_secret),
            Self::Bool(_) | Self::Int(_) | Self::Number(_) => false,
        }
    }
}

impl From<Value> for Property {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for Property {
    fn from(value: &str) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<String> for Property {
    fn from(value: String) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<bool> for Property {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Property {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u16> for Property {
    fn from(value: u16) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Property {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Property {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Vec<Property>> for Property {
    fn from(value: Vec<Property>) -> Self {
        Self::List(value)
    }
}

impl From<Properties> for Property {
    fn from(value: Properties) -> Self {
        Self::Map(value)
    }
}

/// Keyed property map with a stable (sorted) key order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(BTreeMap<String, Property>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Property>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a property, returning the previous value if the key was set
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Property>) -> Option<Property> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Property> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Property> {
        self.0.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Property)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn collect_references(&self, out: &mut BTreeSet<LogicalId>) {
        for value in self.0.values() {
            value.collect_references(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> LogicalId {
        LogicalId::new(s)
    }

    #[test]
    fn literal_has_no_references() {
        assert!(Value::literal("10.0.0.0/16").references().is_empty());
    }

    #[test]
    fn join_collects_nested_references() {
        let v = Value::join(
            ",",
            vec![
                Value::reference(&id("SubnetA")),
                Value::reference(&id("SubnetB")),
                Value::literal("x"),
            ],
        );
        let refs = v.references();
        assert_eq!(refs.len(), 2);
        assert!(refs.contains(&id("SubnetA")));
    }

    #[test]
    fn secret_field_is_detected_inside_structures() {
        let props = Properties::new().with(
            "Settings",
            Property::list([Properties::new().with("Value", Value::secret_field(&id("Secret"), "password"))]),
        );
        assert!(Property::Map(props.clone()).contains_secret());
        assert!(Property::Map(props).references().contains(&id("Secret")));
    }

    #[test]
    fn properties_iterate_in_sorted_order() {
        let props = Properties::new().with("Zeta", 1i64).with("Alpha", true);
        let keys: Vec<_> = props.keys().cloned().collect();
        assert_eq!(keys, vec!["Alpha".to_string(), "Zeta".to_string()]);
    }

    #[test]
    fn insert_reports_previous_value() {
        let mut props = Properties::new();
        assert!(props.insert("Port", 80u16).is_none());
        assert_eq!(props.insert("Port", 443u16), Some(Property::Int(80)));
    }
}
