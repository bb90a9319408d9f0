//! Common test utilities for ingestion scenarios
//!
//! Record builders for the publication JSON shape and a `GraphStore`
//! wrapper that injects failures.

#![allow(dead_code)]

use async_trait::async_trait;
use pubgraph::{
    GraphStore, IndexInfo, Label, LookupStrategy, MergeOutcome, NodeWrite, OpenStore, Properties,
    RelType, Relationship, RelationshipWrite, SqliteStore, StorageError, StorageResult,
};
use pubgraph::ingest::PublicationRecord;
use serde_json::{json, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// One authorship entry: author id plus institution ids
pub fn authorship(author: &str, institutions: &[&str]) -> Value {
    let institutions: Vec<Value> = institutions
        .iter()
        .map(|id| json!({"id": id, "display_name": format!("Institution {}", id), "country_code": "US"}))
        .collect();
    json!({
        "author_position": "middle",
        "author": {"id": author, "display_name": format!("Author {}", author), "orcid": null},
        "institutions": institutions,
    })
}

/// A work record with the given authorships and no concepts or venue
pub fn work(id: &str, authorships: Vec<Value>) -> Value {
    json!({
        "id": id,
        "doi": format!("https://doi.org/10.0/{}", id.to_lowercase()),
        "title": format!("Title of {}", id),
        "publication_year": 2021,
        "type": "article",
        "cited_by_count": 3,
        "authorships": authorships,
        "concepts": [],
        "host_venue": null,
    })
}

/// Attach concepts as `(id, score)` pairs
pub fn with_concepts(mut work: Value, concepts: &[(&str, f64)]) -> Value {
    let concepts: Vec<Value> = concepts
        .iter()
        .map(|(id, score)| json!({"id": id, "display_name": format!("Concept {}", id), "level": 1, "score": score}))
        .collect();
    work["concepts"] = Value::Array(concepts);
    work
}

pub fn with_venue(mut work: Value, venue: &str) -> Value {
    work["host_venue"] = json!({"id": venue, "display_name": format!("Venue {}", venue), "issn_l": "1234-5678"});
    work
}

/// Wrap works into one input line
pub fn line(works: Vec<Value>) -> Value {
    json!({ "matches": works })
}

pub fn records(lines: Vec<Value>) -> Vec<PublicationRecord> {
    lines
        .into_iter()
        .map(|v| serde_json::from_value(v).expect("fixture is a valid record"))
        .collect()
}

/// Two works sharing author A1 at institution I1; A2 has no institution
pub fn two_work_scenario() -> Vec<Value> {
    vec![
        line(vec![work("W1", vec![authorship("A1", &["I1"])])]),
        line(vec![work("W2", vec![authorship("A1", &["I1"]), authorship("A2", &[])])]),
    ]
}

/// Write lines to `name` under `dir`, one JSON document per line
pub fn write_jsonl(dir: &Path, name: &str, lines: &[Value]) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).expect("create input file");
    for value in lines {
        writeln!(file, "{}", value).expect("write input line");
    }
    path
}

/// SQLite store that can be told to fail specific operations
pub struct FlakyStore {
    inner: SqliteStore,
    pub fail_count: AtomicBool,
    pub fail_merges_to: Option<String>,
    pub store_gone: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteStore::open_in_memory().expect("in-memory store"),
            fail_count: AtomicBool::new(false),
            fail_merges_to: None,
            store_gone: AtomicBool::new(false),
        }
    }

    /// Fail every relationship merge whose target has this id
    pub fn failing_merges_to(mut self, id: &str) -> Self {
        self.fail_merges_to = Some(id.to_string());
        self
    }

    pub fn inner(&self) -> &SqliteStore {
        &self.inner
    }

    fn check_gone(&self) -> StorageResult<()> {
        if self.store_gone.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("connection closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl GraphStore for FlakyStore {
    async fn create_node(&self, node: &NodeWrite) -> StorageResult<()> {
        self.check_gone()?;
        self.inner.create_node(node).await
    }

    async fn create_nodes(&self, label: Label, nodes: &[Properties]) -> StorageResult<u64> {
        self.check_gone()?;
        self.inner.create_nodes(label, nodes).await
    }

    async fn count_nodes(&self) -> StorageResult<u64> {
        if self.fail_count.load(Ordering::SeqCst) {
            return Err(StorageError::Query("count timed out".into()));
        }
        self.inner.count_nodes().await
    }

    async fn count_nodes_with_label(&self, label: Label) -> StorageResult<u64> {
        self.inner.count_nodes_with_label(label).await
    }

    async fn clear(&self) -> StorageResult<()> {
        self.check_gone()?;
        self.inner.clear().await
    }

    async fn list_indexes(&self) -> StorageResult<Vec<IndexInfo>> {
        self.inner.list_indexes().await
    }

    async fn create_index(&self, name: &str, label: Label, property: &str) -> StorageResult<()> {
        self.inner.create_index(name, label, property).await
    }

    async fn drop_index(&self, name: &str) -> StorageResult<()> {
        self.inner.drop_index(name).await
    }

    async fn merge_relationship(
        &self,
        write: &RelationshipWrite,
        lookup: LookupStrategy,
    ) -> StorageResult<MergeOutcome> {
        self.check_gone()?;
        if self.fail_merges_to.as_deref() == Some(write.target.id.as_str()) {
            return Err(StorageError::Query(format!("rejected merge to {}", write.target.id)));
        }
        self.inner.merge_relationship(write, lookup).await
    }

    async fn count_relationships(&self, rel_type: Option<RelType>) -> StorageResult<u64> {
        self.inner.count_relationships(rel_type).await
    }

    async fn relationships(&self, rel_type: RelType) -> StorageResult<Vec<Relationship>> {
        self.inner.relationships(rel_type).await
    }
}
