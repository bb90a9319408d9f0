//! Relationship vocabulary and merge descriptions

use super::node::{NodeRef, Properties, PropertyValue};
use serde::{Deserialize, Serialize};

/// Type of a directed relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelType {
    /// Author → Work
    Authored,
    /// Author → Institution, accumulating `through_works`
    AffiliatedWith,
    /// Work → Venue
    PublishedIn,
    /// Work → Concept, carrying `confidence`
    About,
}

impl RelType {
    pub const ALL: [RelType; 4] = [
        RelType::Authored,
        RelType::AffiliatedWith,
        RelType::PublishedIn,
        RelType::About,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelType::Authored => "AUTHORED",
            RelType::AffiliatedWith => "AFFILIATED_WITH",
            RelType::PublishedIn => "PUBLISHED_IN",
            RelType::About => "ABOUT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == s)
    }
}

impl std::fmt::Display for RelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Property key holding the works that evidenced an affiliation.
pub const THROUGH_WORKS: &str = "through_works";

/// Property key holding the concept classifier score on `ABOUT`.
pub const CONFIDENCE: &str = "confidence";

/// Property key holding the author's byline position on `AUTHORED`.
pub const POSITION: &str = "position";

/// Value appended to a list-valued property when an existing edge is matched.
///
/// The list behaves as an ordered set: a value already present is not
/// appended again.
#[derive(Debug, Clone, PartialEq)]
pub struct ListAppend {
    pub key: String,
    pub value: PropertyValue,
}

/// A merge (create-if-absent) of one relationship between two existing nodes.
///
/// At most one edge of a given type exists between a (source, target) pair.
/// `on_create` is applied only when the edge is new; `append` is applied on
/// both paths, so a fresh edge starts with a single-element list.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipWrite {
    pub rel_type: RelType,
    pub source: NodeRef,
    pub target: NodeRef,
    pub on_create: Properties,
    pub append: Option<ListAppend>,
}

impl RelationshipWrite {
    pub fn new(rel_type: RelType, source: NodeRef, target: NodeRef) -> Self {
        Self {
            rel_type,
            source,
            target,
            on_create: Properties::new(),
            append: None,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.on_create.insert(key.into(), value.into());
        self
    }

    pub fn with_append(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.append = Some(ListAppend {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Properties of the edge if it does not exist yet.
    pub fn initial_properties(&self) -> Properties {
        let mut props = self.on_create.clone();
        if let Some(append) = &self.append {
            props.insert(
                append.key.clone(),
                PropertyValue::Array(vec![append.value.clone()]),
            );
        }
        props
    }
}

impl std::fmt::Display for RelationshipWrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-[:{}]->{}", self.source, self.rel_type, self.target)
    }
}

/// What a relationship merge did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No edge existed; one was created
    Created,
    /// An edge existed and the list property was extended
    Merged,
    /// An edge existed and already carried everything in the write
    Unchanged,
    /// Either endpoint was not found; nothing was written
    MissingEndpoint,
}

/// A relationship as read back from the store
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub rel_type: RelType,
    pub source_id: String,
    pub target_id: String,
    pub properties: Properties,
}

impl Relationship {
    /// String items of a list-valued property, in stored order
    pub fn string_list(&self, key: &str) -> Vec<String> {
        self.properties
            .get(key)
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|i| i.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Apply a list append to an existing property map.
///
/// Returns `true` when the map changed. A missing or non-list property is
/// treated as an empty list.
pub fn apply_append(properties: &mut Properties, append: &ListAppend) -> bool {
    let entry = properties
        .entry(append.key.clone())
        .or_insert_with(|| PropertyValue::Array(Vec::new()));
    if !matches!(entry, PropertyValue::Array(_)) {
        *entry = PropertyValue::Array(Vec::new());
    }
    match entry {
        PropertyValue::Array(items) if !items.contains(&append.value) => {
            items.push(append.value.clone());
            true
        }
        _ => false,
    }
}
