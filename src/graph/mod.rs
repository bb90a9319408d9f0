//! Property-graph vocabulary shared by the store and the ingestion engine

mod edge;
mod node;

pub use edge::{
    apply_append, ListAppend, MergeOutcome, RelType, Relationship, RelationshipWrite, CONFIDENCE,
    POSITION, THROUGH_WORKS,
};
pub use node::{
    Label, NodeRef, NodeWrite, Properties, PropertiesBuilder, PropertyValue, IDENTITY_PROPERTY,
};
