//! Graph ingestion engine
//!
//! Turns line-delimited publication records into Work, Author, Institution,
//! Concept and Venue nodes joined by `AUTHORED`, `AFFILIATED_WITH`,
//! `PUBLISHED_IN` and `ABOUT` relationships.

mod batch;
mod cancel;
mod dedup;
mod entity;
mod error;
mod extract;
mod gate;
mod index;
mod pipeline;
mod reader;
mod record;
mod writer;

pub use batch::{BatchLoader, DEFAULT_CHUNK_SIZE};
pub use cancel::CancellationToken;
pub use dedup::{dedup_by_id, DedupStats};
pub use entity::{
    Affiliation, Author, Authorship, Concept, Hosting, Identified, Institution, Topicality, Venue,
    Work,
};
pub use error::{IngestError, IngestResult};
pub use extract::{extract, Extraction, ExtractionStats};
pub use gate::{check_population, GateDecision, RepopulateReason};
pub use index::{drop_all_indexes, ensure_indexes, IndexReport};
pub use pipeline::{IngestReport, Ingestor};
pub use reader::{parse_records, read_records, ReadReport};
pub use record::{
    AuthorRecord, AuthorshipRecord, ConceptRecord, InstitutionRecord, PublicationRecord,
    VenueRecord, WorkMatch,
};
pub use writer::{GraphWriter, WriteTally};
