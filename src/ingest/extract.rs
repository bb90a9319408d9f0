//! Entity extraction: nested publication records to flat, deduplicated collections

use super::dedup::{dedup_by_id, DedupStats};
use super::entity::{
    Affiliation, Author, Authorship, Concept, Hosting, Identified, Institution, Topicality, Venue,
    Work,
};
use super::record::PublicationRecord;
use crate::graph::Label;
use std::collections::HashSet;
use tracing::info;

/// Dedup counts per label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub works: DedupStats,
    pub authors: DedupStats,
    pub institutions: DedupStats,
    pub concepts: DedupStats,
    pub venues: DedupStats,
}

impl ExtractionStats {
    pub fn for_label(&self, label: Label) -> DedupStats {
        match label {
            Label::Work => self.works,
            Label::Author => self.authors,
            Label::Institution => self.institutions,
            Label::Concept => self.concepts,
            Label::Venue => self.venues,
        }
    }
}

/// Everything the graph is built from
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub works: Vec<Work>,
    pub authors: Vec<Author>,
    pub institutions: Vec<Institution>,
    pub concepts: Vec<Concept>,
    pub venues: Vec<Venue>,

    pub authorships: Vec<Authorship>,
    pub affiliations: Vec<Affiliation>,
    pub topics: Vec<Topicality>,
    pub hosts: Vec<Hosting>,

    pub stats: ExtractionStats,
}

impl Extraction {
    /// Number of nodes a fully populated store holds for this input
    pub fn expected_node_count(&self) -> u64 {
        (self.works.len()
            + self.authors.len()
            + self.institutions.len()
            + self.concepts.len()
            + self.venues.len()) as u64
    }

    pub fn relationship_count(&self) -> usize {
        self.authorships.len() + self.affiliations.len() + self.topics.len() + self.hosts.len()
    }
}

/// Walk the records and produce deduplicated entities and their associations.
///
/// A repeated work keeps only its first occurrence, including the nested
/// data of that occurrence. Associations are recorded only when both
/// endpoints carry an identifier, in order of discovery.
pub fn extract(records: &[PublicationRecord]) -> Extraction {
    let raw_works: Vec<Work> = records
        .iter()
        .flat_map(|r| r.matches().iter().cloned().map(Work))
        .collect();
    let (works, work_stats) = dedup_by_id(raw_works);

    let mut authors = Vec::new();
    let mut institutions = Vec::new();
    let mut concepts = Vec::new();
    let mut venues = Vec::new();

    let mut authorships = Vec::new();
    let mut affiliations = Vec::new();
    let mut topics = Vec::new();
    let mut hosts = Vec::new();

    let mut seen_authorships: HashSet<(String, String)> = HashSet::new();
    let mut seen_affiliations: HashSet<Affiliation> = HashSet::new();
    let mut seen_topics: HashSet<(String, String)> = HashSet::new();

    for work in &works {
        let Some(work_id) = work.id() else { continue };
        let w = &work.0;

        for authorship in w.authorships.iter().flatten() {
            let author = authorship.author.clone().map(Author);
            let author_id = author.as_ref().and_then(|a| a.id()).map(str::to_string);
            if let Some(author) = author {
                authors.push(author);
            }

            if let Some(author_id) = &author_id {
                if seen_authorships.insert((author_id.clone(), work_id.to_string())) {
                    authorships.push(Authorship {
                        author_id: author_id.clone(),
                        work_id: work_id.to_string(),
                        position: authorship.author_position.clone(),
                    });
                }
            }

            for institution in authorship.institutions.iter().flatten() {
                let institution = Institution(institution.clone());
                if let (Some(author_id), Some(institution_id)) = (&author_id, institution.id()) {
                    let affiliation = Affiliation {
                        author_id: author_id.clone(),
                        institution_id: institution_id.to_string(),
                        work_id: work_id.to_string(),
                    };
                    if seen_affiliations.insert(affiliation.clone()) {
                        affiliations.push(affiliation);
                    }
                }
                institutions.push(institution);
            }
        }

        for concept in w.concepts.iter().flatten() {
            let node = Concept::from(concept);
            if let Some(concept_id) = node.id() {
                if seen_topics.insert((work_id.to_string(), concept_id.to_string())) {
                    topics.push(Topicality {
                        work_id: work_id.to_string(),
                        concept_id: concept_id.to_string(),
                        confidence: concept.score,
                    });
                }
            }
            concepts.push(node);
        }

        if let Some(venue) = &w.host_venue {
            let venue = Venue(venue.clone());
            if let Some(venue_id) = venue.id() {
                hosts.push(Hosting {
                    work_id: work_id.to_string(),
                    venue_id: venue_id.to_string(),
                });
            }
            venues.push(venue);
        }
    }

    let (authors, author_stats) = dedup_by_id(authors);
    let (institutions, institution_stats) = dedup_by_id(institutions);
    let (concepts, concept_stats) = dedup_by_id(concepts);
    let (venues, venue_stats) = dedup_by_id(venues);

    let stats = ExtractionStats {
        works: work_stats,
        authors: author_stats,
        institutions: institution_stats,
        concepts: concept_stats,
        venues: venue_stats,
    };

    for label in Label::ALL {
        let s = stats.for_label(label);
        info!(
            label = %label,
            kept = s.kept,
            removed = s.removed(),
            "extracted entities"
        );
    }

    Extraction {
        works,
        authors,
        institutions,
        concepts,
        venues,
        authorships,
        affiliations,
        topics,
        hosts,
        stats,
    }
}
