//! Ingestion run: records in, populated graph out
//!
//! Steps, in order:
//! 1. Extract and deduplicate entities and associations
//! 2. Population gate decides whether node writes are needed
//! 3. On rebuild: wipe the store, then create nodes (per item or in bulk)
//! 4. Ensure identifier indexes (index-assisted runs only)
//! 5. Merge relationships, one at a time, in discovery order
//!
//! Relationship merges run on every pass. They are idempotent, so a run
//! over an already-populated store leaves the graph unchanged.

use super::batch::BatchLoader;
use super::cancel::CancellationToken;
use super::entity::Identified;
use super::error::IngestResult;
use super::extract::{extract, Extraction, ExtractionStats};
use super::gate::{check_population, GateDecision};
use super::index::{drop_all_indexes, ensure_indexes, IndexReport};
use super::reader::{read_records, ReadReport};
use super::record::PublicationRecord;
use super::writer::{GraphWriter, WriteTally};
use crate::config::IngestConfig;
use crate::graph::{Label, RelType};
use crate::storage::{GraphStore, LookupStrategy};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Everything a run did
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Present when the run read its own input file
    pub read: Option<ReadReport>,
    pub dedup: ExtractionStats,
    pub gate: GateDecision,
    pub strategy: LookupStrategy,
    pub bulk_nodes: bool,
    pub indexes_dropped: usize,
    /// Present when identifier indexes were ensured
    pub indexes: Option<IndexReport>,
    pub nodes: BTreeMap<Label, WriteTally>,
    pub relationships: BTreeMap<RelType, WriteTally>,
}

impl IngestReport {
    fn new(dedup: ExtractionStats, gate: GateDecision, config: &IngestConfig) -> Self {
        Self {
            read: None,
            dedup,
            gate,
            strategy: config.lookup_strategy(),
            bulk_nodes: config.use_batch_insert,
            indexes_dropped: 0,
            indexes: None,
            nodes: BTreeMap::new(),
            relationships: BTreeMap::new(),
        }
    }

    pub fn nodes_total(&self) -> WriteTally {
        let mut total = WriteTally::default();
        for tally in self.nodes.values() {
            total += *tally;
        }
        total
    }

    pub fn relationships_total(&self) -> WriteTally {
        let mut total = WriteTally::default();
        for tally in self.relationships.values() {
            total += *tally;
        }
        total
    }

    /// Items that failed to write, nodes and relationships together
    pub fn failed(&self) -> usize {
        self.nodes_total().failed + self.relationships_total().failed
    }
}

impl std::fmt::Display for IngestReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(read) = &self.read {
            writeln!(f, "records read: {} (skipped {})", read.records, read.skipped)?;
        }
        match &self.gate {
            GateDecision::AlreadyPopulated { existing } => {
                writeln!(f, "store already populated ({} nodes), node writes skipped", existing)?
            }
            GateDecision::Repopulate { reason } => writeln!(f, "store rebuilt: {}", reason)?,
        }
        for (label, tally) in &self.nodes {
            writeln!(f, "  {:<12} created {:>7} / {:<7} failed {}", label.as_str(), tally.created, tally.attempted, tally.failed)?;
        }
        if let Some(indexes) = &self.indexes {
            writeln!(f, "indexes: {} created, {} existing", indexes.created.len(), indexes.existing.len())?;
        }
        for (rel_type, tally) in &self.relationships {
            writeln!(
                f,
                "  {:<16} created {:>7}  merged {:>7}  unchanged {:>7}  missing {:>5}  failed {}",
                rel_type.as_str(),
                tally.created,
                tally.merged,
                tally.unchanged,
                tally.missing_endpoint,
                tally.failed
            )?;
        }
        Ok(())
    }
}

/// Runs ingestion against one store
pub struct Ingestor {
    store: Arc<dyn GraphStore>,
    config: IngestConfig,
    cancel: CancellationToken,
}

impl Ingestor {
    pub fn new(store: Arc<dyn GraphStore>, config: IngestConfig) -> Self {
        Self {
            store,
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Read a line-delimited JSON file and ingest it.
    pub async fn ingest_file(&self, path: impl AsRef<Path>) -> IngestResult<IngestReport> {
        let (records, read) = read_records(path, self.config.row_cap)?;
        let mut report = self.run(&records).await?;
        report.read = Some(read);
        Ok(report)
    }

    /// Ingest already-parsed records.
    pub async fn run(&self, records: &[PublicationRecord]) -> IngestResult<IngestReport> {
        let records = match self.config.row_cap {
            Some(cap) if cap < records.len() => &records[..cap],
            _ => records,
        };
        let extraction = extract(records);
        info!(
            records = records.len(),
            nodes = extraction.expected_node_count(),
            relationships = extraction.relationship_count(),
            "extraction finished"
        );
        let store: &dyn GraphStore = self.store.as_ref();

        let gate = check_population(store, extraction.expected_node_count(), self.config.force_rebuild).await;
        let mut report = IngestReport::new(extraction.stats, gate.clone(), &self.config);

        if gate.needs_population() {
            store.clear().await?;
            if self.config.drop_indexes_on_rebuild && !self.config.use_batch_insert {
                report.indexes_dropped = drop_all_indexes(store).await?;
            }
            self.populate(&extraction, &mut report).await?;
        }

        if self.config.use_index {
            report.indexes = Some(ensure_indexes(store).await?);
        }

        self.link(&extraction, &mut report).await?;

        let nodes = report.nodes_total();
        let rels = report.relationships_total();
        info!(
            nodes_created = nodes.created,
            relationships_created = rels.created,
            relationships_merged = rels.merged,
            failed = report.failed(),
            "ingestion finished"
        );
        Ok(report)
    }

    async fn populate(&self, ex: &Extraction, report: &mut IngestReport) -> IngestResult<()> {
        for label in Label::ALL {
            let tally = match label {
                Label::Work => self.write_label(&ex.works).await?,
                Label::Author => self.write_label(&ex.authors).await?,
                Label::Institution => self.write_label(&ex.institutions).await?,
                Label::Concept => self.write_label(&ex.concepts).await?,
                Label::Venue => self.write_label(&ex.venues).await?,
            };
            info!(label = %label, created = tally.created, failed = tally.failed, "nodes populated");
            report.nodes.insert(label, tally);
        }
        Ok(())
    }

    async fn write_label<T: Identified + Sync>(&self, entities: &[T]) -> IngestResult<WriteTally> {
        let store: &dyn GraphStore = self.store.as_ref();
        if self.config.use_batch_insert {
            BatchLoader::new(store)
                .with_chunk_size(self.config.chunk_size)
                .with_cancellation(self.cancel.clone())
                .load(entities)
                .await
        } else {
            self.writer().write_nodes(entities).await
        }
    }

    async fn link(&self, ex: &Extraction, report: &mut IngestReport) -> IngestResult<()> {
        let writer = self.writer();

        let authored = writer
            .write_relationships(ex.authorships.iter().map(|a| a.to_write()))
            .await?;
        report.relationships.insert(RelType::Authored, authored);

        let affiliated = writer
            .write_relationships(ex.affiliations.iter().map(|a| a.to_write()))
            .await?;
        report.relationships.insert(RelType::AffiliatedWith, affiliated);

        let about = writer
            .write_relationships(ex.topics.iter().map(|t| t.to_write()))
            .await?;
        report.relationships.insert(RelType::About, about);

        let published = writer
            .write_relationships(ex.hosts.iter().map(|h| h.to_write()))
            .await?;
        report.relationships.insert(RelType::PublishedIn, published);

        for (rel_type, tally) in &report.relationships {
            info!(
                relationship = %rel_type,
                created = tally.created,
                merged = tally.merged,
                missing_endpoint = tally.missing_endpoint,
                failed = tally.failed,
                "relationships written"
            );
        }
        Ok(())
    }

    fn writer(&self) -> GraphWriter<'_> {
        GraphWriter::new(self.store.as_ref(), self.config.lookup_strategy())
            .with_cancellation(self.cancel.clone())
    }
}
