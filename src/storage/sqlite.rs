//! SQLite storage backend for pubgraph
//!
//! An embedded property graph: labelled nodes with JSON properties and typed
//! relationships between them. Identifier indexes are partial SQLite
//! expression indexes, one per label over that label's rows only, recorded in
//! a registry table so they can be listed by label and property.

use super::traits::{GraphStore, IndexInfo, LookupStrategy, OpenStore, StorageError, StorageResult};
use crate::graph::{
    apply_append, Label, MergeOutcome, NodeRef, NodeWrite, Properties, RelType, Relationship,
    RelationshipWrite, IDENTITY_PROPERTY,
};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed graph store
///
/// Thread-safe via internal mutex on the connection. Each trait call runs in
/// its own transaction.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS nodes (
                node_key INTEGER PRIMARY KEY AUTOINCREMENT,
                label TEXT NOT NULL,
                properties_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_nodes_label ON nodes(label);

            -- At most one edge of a type between a pair of nodes
            CREATE TABLE IF NOT EXISTS relationships (
                rel_key INTEGER PRIMARY KEY AUTOINCREMENT,
                rel_type TEXT NOT NULL,
                source_key INTEGER NOT NULL,
                target_key INTEGER NOT NULL,
                properties_json TEXT NOT NULL,
                UNIQUE (rel_type, source_key, target_key),
                FOREIGN KEY (source_key) REFERENCES nodes(node_key) ON DELETE CASCADE,
                FOREIGN KEY (target_key) REFERENCES nodes(node_key) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_relationships_type ON relationships(rel_type);

            -- Identifier indexes created through the GraphStore API
            CREATE TABLE IF NOT EXISTS property_indexes (
                name TEXT PRIMARY KEY,
                label TEXT NOT NULL,
                property TEXT NOT NULL
            );

            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Unavailable("sqlite connection mutex poisoned".to_string()))
    }

    /// Names and properties are spliced into DDL, so only plain identifiers pass.
    fn check_identifier(s: &str) -> StorageResult<()> {
        let valid = !s.is_empty()
            && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !s.starts_with(|c: char| c.is_ascii_digit());
        if valid {
            Ok(())
        } else {
            Err(StorageError::Query(format!("invalid identifier: {:?}", s)))
        }
    }

    fn identity_expr() -> String {
        format!("json_extract(properties_json, '$.{}')", IDENTITY_PROPERTY)
    }

    /// Identity expression against an aliased nodes table
    fn identity_expr_of(alias: &str) -> String {
        format!("json_extract({}.properties_json, '$.{}')", alias, IDENTITY_PROPERTY)
    }

    /// Name of a registered index covering the identity property of `label`
    fn covering_index(tx: &Transaction<'_>, label: Label) -> StorageResult<Option<String>> {
        Ok(tx
            .query_row(
                "SELECT name FROM property_indexes WHERE label = ?1 AND property = ?2 ORDER BY name LIMIT 1",
                params![label.as_str(), IDENTITY_PROPERTY],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn find_node_key(
        tx: &Transaction<'_>,
        node: &NodeRef,
        lookup: LookupStrategy,
    ) -> StorageResult<Option<i64>> {
        let sql = match lookup {
            LookupStrategy::IndexHint => {
                let index = Self::covering_index(tx, node.label)?
                    .ok_or_else(|| StorageError::MissingIndex(node.label.index_name()))?;
                // The label is spliced in so the planner can match the partial index
                format!(
                    "SELECT node_key FROM nodes INDEXED BY \"{}\" WHERE label = '{}' AND {} = ?1 LIMIT 1",
                    index,
                    node.label.as_str(),
                    Self::identity_expr()
                )
            }
            LookupStrategy::DirectMatch => format!(
                "SELECT node_key FROM nodes WHERE label = '{}' AND {} = ?1 LIMIT 1",
                node.label.as_str(),
                Self::identity_expr()
            ),
        };
        Ok(tx
            .query_row(&sql, params![node.id], |row| row.get(0))
            .optional()?)
    }

    fn insert_node(conn: &Connection, label: Label, properties: &Properties) -> StorageResult<()> {
        let properties_json = serde_json::to_string(properties)?;
        conn.execute(
            "INSERT INTO nodes (label, properties_json) VALUES (?1, ?2)",
            params![label.as_str(), properties_json],
        )?;
        Ok(())
    }

    fn merge_in_tx(
        tx: &Transaction<'_>,
        write: &RelationshipWrite,
        lookup: LookupStrategy,
    ) -> StorageResult<MergeOutcome> {
        let Some(source_key) = Self::find_node_key(tx, &write.source, lookup)? else {
            return Ok(MergeOutcome::MissingEndpoint);
        };
        let Some(target_key) = Self::find_node_key(tx, &write.target, lookup)? else {
            return Ok(MergeOutcome::MissingEndpoint);
        };

        let existing: Option<(i64, String)> = tx
            .query_row(
                "SELECT rel_key, properties_json FROM relationships
                 WHERE rel_type = ?1 AND source_key = ?2 AND target_key = ?3",
                params![write.rel_type.as_str(), source_key, target_key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match existing {
            None => {
                let properties_json = serde_json::to_string(&write.initial_properties())?;
                tx.execute(
                    "INSERT INTO relationships (rel_type, source_key, target_key, properties_json)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![write.rel_type.as_str(), source_key, target_key, properties_json],
                )?;
                Ok(MergeOutcome::Created)
            }
            Some((rel_key, properties_json)) => {
                let Some(append) = &write.append else {
                    return Ok(MergeOutcome::Unchanged);
                };
                let mut properties: Properties = serde_json::from_str(&properties_json)?;
                if !apply_append(&mut properties, append) {
                    return Ok(MergeOutcome::Unchanged);
                }
                tx.execute(
                    "UPDATE relationships SET properties_json = ?1 WHERE rel_key = ?2",
                    params![serde_json::to_string(&properties)?, rel_key],
                )?;
                Ok(MergeOutcome::Merged)
            }
        }
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| StorageError::Unavailable(format!("cannot open database: {}", e)))?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl GraphStore for SqliteStore {
    // === Node Operations ===

    async fn create_node(&self, node: &NodeWrite) -> StorageResult<()> {
        let conn = self.lock()?;
        Self::insert_node(&conn, node.label, &node.properties)
    }

    async fn create_nodes(&self, label: Label, nodes: &[Properties]) -> StorageResult<u64> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut created = 0u64;
        {
            let mut stmt = tx.prepare("INSERT INTO nodes (label, properties_json) VALUES (?1, ?2)")?;
            for properties in nodes {
                let properties_json = serde_json::to_string(properties)?;
                created += stmt.execute(params![label.as_str(), properties_json])? as u64;
            }
        }
        tx.commit()?;
        Ok(created)
    }

    async fn count_nodes(&self) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    async fn count_nodes_with_label(&self, label: Label) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM nodes WHERE label = ?1",
            params![label.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    async fn clear(&self) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM relationships", [])?;
        tx.execute("DELETE FROM nodes", [])?;
        tx.commit()?;
        Ok(())
    }

    // === Index Operations ===

    async fn list_indexes(&self) -> StorageResult<Vec<IndexInfo>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT name, label, property FROM property_indexes ORDER BY name")?;
        let indexes = stmt
            .query_map([], |row| {
                Ok(IndexInfo {
                    name: row.get(0)?,
                    label: Some(row.get(1)?),
                    properties: vec![row.get(2)?],
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(indexes)
    }

    async fn create_index(&self, name: &str, label: Label, property: &str) -> StorageResult<()> {
        Self::check_identifier(name)?;
        Self::check_identifier(property)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS \"{}\" ON nodes(json_extract(properties_json, '$.{}')) WHERE label = '{}'",
                name,
                property,
                label.as_str()
            ),
            [],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO property_indexes (name, label, property) VALUES (?1, ?2, ?3)",
            params![name, label.as_str(), property],
        )?;
        tx.commit()?;
        Ok(())
    }

    async fn drop_index(&self, name: &str) -> StorageResult<()> {
        Self::check_identifier(name)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(&format!("DROP INDEX IF EXISTS \"{}\"", name), [])?;
        tx.execute("DELETE FROM property_indexes WHERE name = ?1", params![name])?;
        tx.commit()?;
        Ok(())
    }

    // === Relationship Operations ===

    async fn merge_relationship(
        &self,
        write: &RelationshipWrite,
        lookup: LookupStrategy,
    ) -> StorageResult<MergeOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let outcome = Self::merge_in_tx(&tx, write, lookup)?;
        tx.commit()?;
        Ok(outcome)
    }

    async fn count_relationships(&self, rel_type: Option<RelType>) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = match rel_type {
            Some(rel_type) => conn.query_row(
                "SELECT COUNT(*) FROM relationships WHERE rel_type = ?1",
                params![rel_type.as_str()],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM relationships", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    async fn relationships(&self, rel_type: RelType) -> StorageResult<Vec<Relationship>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {source}, {target}, r.properties_json
             FROM relationships r
             JOIN nodes s ON s.node_key = r.source_key
             JOIN nodes t ON t.node_key = r.target_key
             WHERE r.rel_type = ?1
             ORDER BY r.rel_key",
            source = Self::identity_expr_of("s"),
            target = Self::identity_expr_of("t"),
        ))?;
        let rows = stmt
            .query_map(params![rel_type.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut relationships = Vec::with_capacity(rows.len());
        for (source_id, target_id, properties_json) in rows {
            relationships.push(Relationship {
                rel_type,
                source_id,
                target_id,
                properties: serde_json::from_str(&properties_json)?,
            });
        }
        Ok(relationships)
    }
}
