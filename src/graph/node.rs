//! Node vocabulary: labels, identities and typed property values

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Property carrying the externally assigned identifier on every label.
pub const IDENTITY_PROPERTY: &str = "id";

/// Entity type tag attached to a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    Work,
    Author,
    Institution,
    Concept,
    Venue,
}

impl Label {
    /// All labels, in population order
    pub const ALL: [Label; 5] = [
        Label::Work,
        Label::Institution,
        Label::Author,
        Label::Concept,
        Label::Venue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Work => "Work",
            Label::Author => "Author",
            Label::Institution => "Institution",
            Label::Concept => "Concept",
            Label::Venue => "Venue",
        }
    }

    /// Parse a label name as stored in the graph
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.as_str() == s)
    }

    /// Name of the identifier index for this label.
    ///
    /// Stable across runs so the index manager can recognise its own indexes.
    pub fn index_name(&self) -> String {
        format!("idx_{}_{}", self.as_str().to_lowercase(), IDENTITY_PROPERTY)
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed property values
///
/// There is no null variant: absent attributes are left off the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<PropertyValue>),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PropertyValue]> {
        match self {
            PropertyValue::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

/// Properties collection
pub type Properties = HashMap<String, PropertyValue>;

/// Builder helper for property maps that skips absent values.
#[derive(Debug, Default)]
pub struct PropertiesBuilder(Properties);

impl PropertiesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn set_opt<V: Into<PropertyValue>>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.0.insert(key.to_string(), v.into());
        }
        self
    }

    /// Store a nested JSON attribute as its serialized text.
    pub fn set_json(mut self, key: &str, value: Option<&serde_json::Value>) -> Self {
        match value {
            None | Some(serde_json::Value::Null) => {}
            Some(v) => {
                self.0.insert(key.to_string(), PropertyValue::String(v.to_string()));
            }
        }
        self
    }

    pub fn build(self) -> Properties {
        self.0
    }
}

/// Reference to a node by label and identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub label: Label,
    pub id: String,
}

impl NodeRef {
    pub fn new(label: Label, id: impl Into<String>) -> Self {
        Self {
            label,
            id: id.into(),
        }
    }
}

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}:{})", self.label, self.id)
    }
}

/// A node ready to be written: label plus its property map
#[derive(Debug, Clone, PartialEq)]
pub struct NodeWrite {
    pub label: Label,
    pub properties: Properties,
}

impl NodeWrite {
    pub fn new(label: Label, properties: Properties) -> Self {
        Self { label, properties }
    }

    /// Identifier carried in the properties, if any
    pub fn id(&self) -> Option<&str> {
        self.properties.get(IDENTITY_PROPERTY).and_then(|v| v.as_str())
    }
}
