//! Flat entities and associations extracted from publication records

use super::record::{AuthorRecord, ConceptRecord, InstitutionRecord, VenueRecord, WorkMatch};
use crate::graph::{
    Label, NodeRef, NodeWrite, PropertiesBuilder, RelType, RelationshipWrite, CONFIDENCE,
    IDENTITY_PROPERTY, POSITION, THROUGH_WORKS,
};

/// An entity with an externally assigned identifier and a node label
pub trait Identified {
    const LABEL: Label;

    fn id(&self) -> Option<&str>;

    /// Node to create for this entity
    fn to_node(&self) -> NodeWrite;
}

/// Blank identifiers count as missing.
fn present(id: &Option<String>) -> Option<&str> {
    id.as_deref().filter(|s| !s.trim().is_empty())
}

#[derive(Debug, Clone, Default)]
pub struct Work(pub WorkMatch);

impl Identified for Work {
    const LABEL: Label = Label::Work;

    fn id(&self) -> Option<&str> {
        present(&self.0.id)
    }

    fn to_node(&self) -> NodeWrite {
        let w = &self.0;
        let properties = PropertiesBuilder::new()
            .set_opt(IDENTITY_PROPERTY, w.id.clone())
            .set_opt("doi", w.doi.clone())
            .set_opt("title", w.title.clone())
            .set_opt("publication_date", w.publication_date.clone())
            .set_opt("type", w.work_type.clone())
            .set_json("open_access", w.open_access.as_ref())
            .set_opt("cited_by_count", w.cited_by_count)
            .set_json("biblio", w.biblio.as_ref())
            .set_opt("is_retracted", w.is_retracted)
            .set_opt("is_paratext", w.is_paratext)
            .set_json("locations", w.locations.as_ref())
            .set_opt("ngrams_url", w.ngrams_url.clone())
            .set_json("abstract_inverted_index", w.abstract_inverted_index.as_ref())
            .set_opt("cited_by_api_url", w.cited_by_api_url.clone())
            .set_json("counts_by_year", w.counts_by_year.as_ref())
            .build();
        NodeWrite::new(Label::Work, properties)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Author(pub AuthorRecord);

impl Identified for Author {
    const LABEL: Label = Label::Author;

    fn id(&self) -> Option<&str> {
        present(&self.0.id)
    }

    fn to_node(&self) -> NodeWrite {
        let a = &self.0;
        let properties = PropertiesBuilder::new()
            .set_opt(IDENTITY_PROPERTY, a.id.clone())
            .set_opt("name", a.display_name.clone())
            .set_opt("orcid", a.orcid.clone())
            .build();
        NodeWrite::new(Label::Author, properties)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Institution(pub InstitutionRecord);

impl Identified for Institution {
    const LABEL: Label = Label::Institution;

    fn id(&self) -> Option<&str> {
        present(&self.0.id)
    }

    fn to_node(&self) -> NodeWrite {
        let i = &self.0;
        let properties = PropertiesBuilder::new()
            .set_opt(IDENTITY_PROPERTY, i.id.clone())
            .set_opt("name", i.display_name.clone())
            .set_opt("ror", i.ror.clone())
            .set_opt("country", i.country_code.clone())
            .set_opt("type", i.institution_type.clone())
            .build();
        NodeWrite::new(Label::Institution, properties)
    }
}

/// A concept as a node; the classifier score lives on the `ABOUT` edge
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Concept {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub level: Option<i64>,
    pub wikidata: Option<String>,
}

impl From<&ConceptRecord> for Concept {
    fn from(c: &ConceptRecord) -> Self {
        Self {
            id: c.id.clone(),
            display_name: c.display_name.clone(),
            level: c.level,
            wikidata: c.wikidata.clone(),
        }
    }
}

impl Identified for Concept {
    const LABEL: Label = Label::Concept;

    fn id(&self) -> Option<&str> {
        present(&self.id)
    }

    fn to_node(&self) -> NodeWrite {
        let properties = PropertiesBuilder::new()
            .set_opt(IDENTITY_PROPERTY, self.id.clone())
            .set_opt("name", self.display_name.clone())
            .set_opt("level", self.level)
            .set_opt("wikidata", self.wikidata.clone())
            .build();
        NodeWrite::new(Label::Concept, properties)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Venue(pub VenueRecord);

impl Identified for Venue {
    const LABEL: Label = Label::Venue;

    fn id(&self) -> Option<&str> {
        present(&self.0.id)
    }

    fn to_node(&self) -> NodeWrite {
        let v = &self.0;
        let properties = PropertiesBuilder::new()
            .set_opt(IDENTITY_PROPERTY, v.id.clone())
            .set_opt("issn", v.issn_l.clone())
            .set_opt("name", v.display_name.clone())
            .set_opt("publisher", v.publisher.clone())
            .set_opt("type", v.venue_type.clone())
            .set_opt("url", v.url.clone())
            .set_opt("is_oa", v.is_oa)
            .set_opt("version", v.version.clone())
            .set_opt("license", v.license.clone())
            .build();
        NodeWrite::new(Label::Venue, properties)
    }
}

/// Author wrote work
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Authorship {
    pub author_id: String,
    pub work_id: String,
    pub position: Option<String>,
}

/// Author was affiliated with institution, as evidenced by work
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Affiliation {
    pub author_id: String,
    pub institution_id: String,
    pub work_id: String,
}

/// Work is about concept, with the classifier's confidence
#[derive(Debug, Clone, PartialEq)]
pub struct Topicality {
    pub work_id: String,
    pub concept_id: String,
    pub confidence: Option<f64>,
}

/// Work was published in venue
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hosting {
    pub work_id: String,
    pub venue_id: String,
}

impl Authorship {
    pub fn to_write(&self) -> RelationshipWrite {
        let write = RelationshipWrite::new(
            RelType::Authored,
            NodeRef::new(Label::Author, &self.author_id),
            NodeRef::new(Label::Work, &self.work_id),
        );
        match &self.position {
            Some(position) => write.with_property(POSITION, position.as_str()),
            None => write,
        }
    }
}

impl Affiliation {
    pub fn to_write(&self) -> RelationshipWrite {
        RelationshipWrite::new(
            RelType::AffiliatedWith,
            NodeRef::new(Label::Author, &self.author_id),
            NodeRef::new(Label::Institution, &self.institution_id),
        )
        .with_append(THROUGH_WORKS, self.work_id.as_str())
    }
}

impl Topicality {
    pub fn to_write(&self) -> RelationshipWrite {
        let write = RelationshipWrite::new(
            RelType::About,
            NodeRef::new(Label::Work, &self.work_id),
            NodeRef::new(Label::Concept, &self.concept_id),
        );
        match self.confidence {
            Some(confidence) => write.with_property(CONFIDENCE, confidence),
            None => write,
        }
    }
}

impl Hosting {
    pub fn to_write(&self) -> RelationshipWrite {
        RelationshipWrite::new(
            RelType::PublishedIn,
            NodeRef::new(Label::Work, &self.work_id),
            NodeRef::new(Label::Venue, &self.venue_id),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PropertyValue;

    #[test]
    fn blank_id_counts_as_missing() {
        let author = Author(AuthorRecord {
            id: Some("  ".into()),
            ..Default::default()
        });
        assert_eq!(author.id(), None);
    }

    #[test]
    fn work_node_serializes_nested_fields() {
        let work = Work(WorkMatch {
            id: Some("W1".into()),
            title: Some("Graphs".into()),
            cited_by_count: Some(12),
            biblio: Some(serde_json::json!({"volume": "3"})),
            counts_by_year: Some(serde_json::json!([{"year": 2022, "cited_by_count": 5}])),
            ..Default::default()
        });
        let node = work.to_node();
        assert_eq!(node.label, Label::Work);
        assert_eq!(node.id(), Some("W1"));
        assert_eq!(node.properties.get("cited_by_count"), Some(&PropertyValue::Int(12)));
        assert_eq!(
            node.properties.get("biblio").and_then(|v| v.as_str()),
            Some(r#"{"volume":"3"}"#)
        );
        assert!(!node.properties.contains_key("doi"));
    }

    #[test]
    fn venue_node_uses_graph_property_names() {
        let venue = Venue(VenueRecord {
            id: Some("V1".into()),
            issn_l: Some("1234-5678".into()),
            display_name: Some("Journal of Graphs".into()),
            ..Default::default()
        });
        let node = venue.to_node();
        assert_eq!(node.properties.get("issn").and_then(|v| v.as_str()), Some("1234-5678"));
        assert_eq!(node.properties.get("name").and_then(|v| v.as_str()), Some("Journal of Graphs"));
    }

    #[test]
    fn authorship_write_carries_position() {
        let mut a = Authorship {
            author_id: "A1".into(),
            work_id: "W1".into(),
            position: Some("first".into()),
        };
        let write = a.to_write();
        assert_eq!(write.rel_type, RelType::Authored);
        assert_eq!(write.on_create.get(POSITION), Some(&PropertyValue::String("first".into())));

        a.position = None;
        assert!(a.to_write().on_create.is_empty());
    }

    #[test]
    fn topicality_without_score_has_no_confidence() {
        let t = Topicality {
            work_id: "W1".into(),
            concept_id: "C1".into(),
            confidence: None,
        };
        assert!(t.to_write().on_create.is_empty());
    }

    #[test]
    fn affiliation_write_appends_work() {
        let a = Affiliation {
            author_id: "A1".into(),
            institution_id: "I1".into(),
            work_id: "W2".into(),
        };
        let write = a.to_write();
        assert_eq!(write.rel_type, RelType::AffiliatedWith);
        assert_eq!(write.append.map(|ap| ap.value), Some(PropertyValue::from("W2")));
    }
}
