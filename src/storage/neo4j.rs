//! Neo4j storage backend (Bolt), enabled with the `neo4j` feature

use super::traits::{GraphStore, IndexInfo, LookupStrategy, StorageError, StorageResult};
use crate::graph::{
    Label, MergeOutcome, NodeRef, NodeWrite, Properties, PropertyValue, RelType, Relationship,
    RelationshipWrite, IDENTITY_PROPERTY,
};
use async_trait::async_trait;
use neo4rs::{query, BoltType, Graph, Query};
use std::collections::HashMap;

/// Transient flag set by `ON CREATE` so the merge can report what happened.
const CREATED_MARKER: &str = "_pubgraph_created";

fn map_err(e: neo4rs::Error) -> StorageError {
    match e {
        neo4rs::Error::ConnectionError | neo4rs::Error::IOError { .. } => {
            StorageError::Unavailable(e.to_string())
        }
        other => StorageError::Query(other.to_string()),
    }
}

fn decode_err(column: &str, e: impl std::fmt::Display) -> StorageError {
    StorageError::Query(format!("cannot decode column {}: {}", column, e))
}

fn to_bolt(value: &PropertyValue) -> BoltType {
    match value {
        PropertyValue::String(s) => BoltType::from(s.clone()),
        PropertyValue::Int(i) => BoltType::from(*i),
        PropertyValue::Float(f) => BoltType::from(*f),
        PropertyValue::Bool(b) => BoltType::from(*b),
        PropertyValue::Array(items) => BoltType::from(items.iter().map(to_bolt).collect::<Vec<BoltType>>()),
    }
}

fn to_bolt_map(properties: &Properties) -> BoltType {
    let map: HashMap<String, BoltType> = properties
        .iter()
        .map(|(k, v)| (k.clone(), to_bolt(v)))
        .collect();
    BoltType::from(map)
}

/// Neo4j-backed graph store
pub struct Neo4jStore {
    graph: Graph,
}

impl Neo4jStore {
    /// Connect and verify the server answers
    pub async fn connect(uri: &str, user: &str, password: &str) -> StorageResult<Self> {
        let graph = Graph::new(uri, user, password).await.map_err(|e| {
            StorageError::Unavailable(format!("cannot connect to {}: {}", uri, e))
        })?;
        let store = Self { graph };
        store.count_nodes().await?;
        Ok(store)
    }

    async fn scalar(&self, q: Query, column: &str) -> StorageResult<u64> {
        let mut stream = self.graph.execute(q).await.map_err(map_err)?;
        match stream.next().await.map_err(map_err)? {
            Some(row) => {
                let n: i64 = row.get(column).map_err(|e| decode_err(column, e))?;
                Ok(n as u64)
            }
            None => Ok(0),
        }
    }

    fn match_clause(var: &str, node: &NodeRef, param: &str, lookup: LookupStrategy) -> String {
        match lookup {
            LookupStrategy::IndexHint => format!(
                "MATCH ({v}:{l}) USING INDEX {v}:{l}({p}) WHERE {v}.{p} = ${param}",
                v = var,
                l = node.label,
                p = IDENTITY_PROPERTY,
                param = param
            ),
            LookupStrategy::DirectMatch => format!(
                "MATCH ({v}:{l} {{{p}: ${param}}})",
                v = var,
                l = node.label,
                p = IDENTITY_PROPERTY,
                param = param
            ),
        }
    }

    fn merge_cypher(write: &RelationshipWrite, lookup: LookupStrategy) -> String {
        let mut cypher = format!(
            "{}\n{}\nMERGE (s)-[r:{}]->(t)\nON CREATE SET r += $initial, r.{m} = true\n",
            Self::match_clause("s", &write.source, "source_id", lookup),
            Self::match_clause("t", &write.target, "target_id", lookup),
            write.rel_type,
            m = CREATED_MARKER,
        );
        match &write.append {
            Some(append) => cypher.push_str(&format!(
                "WITH r, coalesce(r.{m}, false) AS created, coalesce(r.{k}, []) AS current\n\
                 REMOVE r.{m}\n\
                 SET r.{k} = CASE WHEN $value IN current THEN current ELSE current + $value END\n\
                 RETURN created, NOT ($value IN current) AS changed",
                m = CREATED_MARKER,
                k = append.key,
            )),
            None => cypher.push_str(&format!(
                "WITH r, coalesce(r.{m}, false) AS created\n\
                 REMOVE r.{m}\n\
                 RETURN created, false AS changed",
                m = CREATED_MARKER,
            )),
        }
        cypher
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn create_node(&self, node: &NodeWrite) -> StorageResult<()> {
        let q = query(&format!("CREATE (n:{}) SET n = $props", node.label))
            .param("props", to_bolt_map(&node.properties));
        self.graph.run(q).await.map_err(map_err)
    }

    async fn create_nodes(&self, label: Label, nodes: &[Properties]) -> StorageResult<u64> {
        let rows: Vec<BoltType> = nodes.iter().map(to_bolt_map).collect();
        let q = query(&format!(
            "UNWIND $rows AS row CREATE (n:{}) SET n = row RETURN count(n) AS created",
            label
        ))
        .param("rows", rows);
        self.scalar(q, "created").await
    }

    async fn count_nodes(&self) -> StorageResult<u64> {
        self.scalar(query("MATCH (n) RETURN count(n) AS n"), "n").await
    }

    async fn count_nodes_with_label(&self, label: Label) -> StorageResult<u64> {
        self.scalar(query(&format!("MATCH (n:{}) RETURN count(n) AS n", label)), "n")
            .await
    }

    async fn clear(&self) -> StorageResult<()> {
        self.graph
            .run(query("MATCH (n) DETACH DELETE n"))
            .await
            .map_err(map_err)
    }

    async fn list_indexes(&self) -> StorageResult<Vec<IndexInfo>> {
        let mut stream = self
            .graph
            .execute(query("SHOW INDEXES YIELD name, labelsOrTypes, properties"))
            .await
            .map_err(map_err)?;
        let mut indexes = Vec::new();
        while let Some(row) = stream.next().await.map_err(map_err)? {
            let name: String = row.get("name").map_err(|e| decode_err("name", e))?;
            // Token lookup indexes report null labels and properties
            let labels: Vec<String> = row.get("labelsOrTypes").unwrap_or_default();
            let properties: Vec<String> = row.get("properties").unwrap_or_default();
            indexes.push(IndexInfo {
                name,
                label: labels.into_iter().next(),
                properties,
            });
        }
        Ok(indexes)
    }

    async fn create_index(&self, name: &str, label: Label, property: &str) -> StorageResult<()> {
        let q = query(&format!(
            "CREATE INDEX {} IF NOT EXISTS FOR (n:{}) ON (n.{})",
            name, label, property
        ));
        self.graph.run(q).await.map_err(map_err)
    }

    async fn drop_index(&self, name: &str) -> StorageResult<()> {
        self.graph
            .run(query(&format!("DROP INDEX {} IF EXISTS", name)))
            .await
            .map_err(map_err)
    }

    async fn merge_relationship(
        &self,
        write: &RelationshipWrite,
        lookup: LookupStrategy,
    ) -> StorageResult<MergeOutcome> {
        let mut q = query(&Self::merge_cypher(write, lookup))
            .param("source_id", write.source.id.clone())
            .param("target_id", write.target.id.clone())
            .param("initial", to_bolt_map(&write.initial_properties()));
        if let Some(append) = &write.append {
            q = q.param("value", to_bolt(&append.value));
        }

        let mut stream = self.graph.execute(q).await.map_err(map_err)?;
        let Some(row) = stream.next().await.map_err(map_err)? else {
            return Ok(MergeOutcome::MissingEndpoint);
        };
        let created: bool = row.get("created").map_err(|e| decode_err("created", e))?;
        let changed: bool = row.get("changed").map_err(|e| decode_err("changed", e))?;
        Ok(match (created, changed) {
            (true, _) => MergeOutcome::Created,
            (false, true) => MergeOutcome::Merged,
            (false, false) => MergeOutcome::Unchanged,
        })
    }

    async fn count_relationships(&self, rel_type: Option<RelType>) -> StorageResult<u64> {
        let cypher = match rel_type {
            Some(rel_type) => format!("MATCH ()-[r:{}]->() RETURN count(r) AS n", rel_type),
            None => "MATCH ()-[r]->() RETURN count(r) AS n".to_string(),
        };
        self.scalar(query(&cypher), "n").await
    }

    async fn relationships(&self, rel_type: RelType) -> StorageResult<Vec<Relationship>> {
        let q = query(&format!(
            "MATCH (s)-[r:{}]->(t) RETURN s.{p} AS source, t.{p} AS target, properties(r) AS props",
            rel_type,
            p = IDENTITY_PROPERTY
        ));
        let mut stream = self.graph.execute(q).await.map_err(map_err)?;
        let mut relationships = Vec::new();
        while let Some(row) = stream.next().await.map_err(map_err)? {
            relationships.push(Relationship {
                rel_type,
                source_id: row.get("source").map_err(|e| decode_err("source", e))?,
                target_id: row.get("target").map_err(|e| decode_err("target", e))?,
                properties: row.get("props").map_err(|e| decode_err("props", e))?,
            });
        }
        Ok(relationships)
    }
}
