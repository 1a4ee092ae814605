//! SQLite-backed property-graph store.
//!
//! # Responsibility
//! - Execute graph write statements against `graph_nodes` and
//!   `graph_relationships`, scoped by logical database name.
//! - Provide read-back queries for inspection and tests.
//!
//! # Invariants
//! - Node rows are unique per `(database, id)`.
//! - Relationship rows are unique per
//!   `(database, start_id, end_id, rel_type, description)`.
//! - Read listings are deterministic: nodes by `id`, relationships by key.

use crate::db::migrations::latest_version;
use crate::db::{open_db, open_db_in_memory};
use crate::model::{RelationshipKind, UNKNOWN_LABEL};
use crate::store::statement::{NodeUpsert, RelationshipUpsert, Statement, EXTERNAL_PROPERTY};
use crate::store::{
    tag_property_key, GraphSession, GraphStore, StoreError, StoreResult, WriteSummary,
};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use serde_json::{Map, Value};
use std::path::Path;

const NODE_SELECT_SQL: &str = "SELECT
    id,
    labels,
    node_type,
    name,
    description,
    tags,
    properties
FROM graph_nodes";

const UNKNOWN_NODE_DESCRIPTION: &str = "Unknown node";

/// Node as persisted in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredNode {
    pub id: String,
    pub labels: Vec<String>,
    pub node_type: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    /// `tag_*` flags and `external`.
    pub properties: Map<String, Value>,
}

impl StoredNode {
    pub fn is_external(&self) -> bool {
        self.properties.get(EXTERNAL_PROPERTY) == Some(&Value::Bool(true))
    }

    /// Returns whether the boolean property for `tag` is set.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.properties.get(&tag_property_key(tag)) == Some(&Value::Bool(true))
    }
}

/// Relationship as persisted in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRelationship {
    pub start_id: String,
    pub end_id: String,
    pub kind: RelationshipKind,
    pub description: String,
}

/// SQLite property-graph store holding any number of logical databases.
pub struct SqliteGraphStore {
    conn: Connection,
}

impl SqliteGraphStore {
    /// Opens (or creates) a store file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::try_new(open_db(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Wraps an already migrated connection.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        ensure_graph_connection_ready(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn node(&self, database: &str, id: &str) -> StoreResult<Option<StoredNode>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NODE_SELECT_SQL}
             WHERE database = ?1
               AND id = ?2;"
        ))?;
        let mut rows = stmt.query(params![database, id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_node_row(row)?));
        }
        Ok(None)
    }

    /// Lists nodes of one database ordered by ID.
    pub fn nodes(&self, database: &str) -> StoreResult<Vec<StoredNode>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NODE_SELECT_SQL}
             WHERE database = ?1
             ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query([database])?;
        let mut nodes = Vec::new();
        while let Some(row) = rows.next()? {
            nodes.push(parse_node_row(row)?);
        }
        Ok(nodes)
    }

    /// Lists relationships of one database ordered by identity key.
    pub fn relationships(&self, database: &str) -> StoreResult<Vec<StoredRelationship>> {
        let mut stmt = self.conn.prepare(
            "SELECT start_id, end_id, rel_type, description
             FROM graph_relationships
             WHERE database = ?1
             ORDER BY start_id ASC, end_id ASC, rel_type ASC, description ASC;",
        )?;
        let mut rows = stmt.query([database])?;
        let mut relationships = Vec::new();
        while let Some(row) = rows.next()? {
            relationships.push(parse_relationship_row(row)?);
        }
        Ok(relationships)
    }

    pub fn node_count(&self, database: &str) -> StoreResult<usize> {
        count_rows(&self.conn, "graph_nodes", database)
    }

    pub fn relationship_count(&self, database: &str) -> StoreResult<usize> {
        count_rows(&self.conn, "graph_relationships", database)
    }
}

impl GraphStore for SqliteGraphStore {
    fn open_session(&self, database: &str) -> StoreResult<Box<dyn GraphSession + '_>> {
        let database = database.trim();
        if database.is_empty() {
            return Err(StoreError::InvalidData(
                "database name must not be blank".to_string(),
            ));
        }
        debug!("event=session_open module=store status=ok database={database}");
        Ok(Box::new(SqliteSession {
            conn: &self.conn,
            database: database.to_string(),
            statements_run: 0,
        }))
    }
}

/// Session bound to one logical database of a `SqliteGraphStore`.
struct SqliteSession<'conn> {
    conn: &'conn Connection,
    database: String,
    statements_run: usize,
}

impl GraphSession for SqliteSession<'_> {
    fn database(&self) -> &str {
        &self.database
    }

    fn run(&mut self, statement: &Statement) -> StoreResult<WriteSummary> {
        let summary = match statement {
            Statement::MergeNode(node) => merge_node(self.conn, &self.database, node)?,
            Statement::MergeRelationship(rel) => {
                merge_relationship(self.conn, &self.database, rel)?
            }
            Statement::DeleteDesign { design_id } => {
                delete_design_subtree(self.conn, &self.database, design_id)?
            }
            Statement::DeleteAll => delete_all(self.conn, &self.database)?,
        };
        self.statements_run += 1;
        Ok(summary)
    }

    fn close(self: Box<Self>) -> StoreResult<()> {
        debug!(
            "event=session_close module=store status=ok database={} statements={}",
            self.database, self.statements_run
        );
        Ok(())
    }
}

fn merge_node(conn: &Connection, database: &str, node: &NodeUpsert) -> StoreResult<WriteSummary> {
    let existed = node_exists(conn, database, &node.id)?;
    conn.execute(
        "INSERT INTO graph_nodes (
            database,
            id,
            labels,
            node_type,
            name,
            description,
            tags,
            properties
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT (database, id) DO UPDATE SET
            labels = excluded.labels,
            node_type = excluded.node_type,
            name = excluded.name,
            description = excluded.description,
            tags = excluded.tags,
            properties = excluded.properties,
            updated_at = (strftime('%s', 'now') * 1000);",
        params![
            database,
            node.id,
            serde_json::to_string(&node.labels)?,
            node.node_type,
            node.name,
            node.description,
            serde_json::to_string(&node.tags)?,
            serde_json::to_string(&node.properties())?,
        ],
    )?;

    Ok(WriteSummary {
        nodes_created: usize::from(!existed),
        nodes_updated: usize::from(existed),
        ..WriteSummary::default()
    })
}

fn merge_relationship(
    conn: &Connection,
    database: &str,
    rel: &RelationshipUpsert,
) -> StoreResult<WriteSummary> {
    let mut summary = WriteSummary::default();
    summary.nodes_created += ensure_endpoint(conn, database, &rel.start_id, &rel.start_label)?;
    summary.nodes_created += ensure_endpoint(conn, database, &rel.end_id, &rel.end_label)?;

    summary.relationships_created = conn.execute(
        "INSERT INTO graph_relationships (
            database,
            start_id,
            end_id,
            rel_type,
            description
        ) VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT (database, start_id, end_id, rel_type, description) DO NOTHING;",
        params![
            database,
            rel.start_id,
            rel.end_id,
            rel.kind.as_str(),
            rel.description,
        ],
    )?;
    Ok(summary)
}

/// Matches an endpoint by ID, creating a labelled stub when missing.
fn ensure_endpoint(conn: &Connection, database: &str, id: &str, label: &str) -> StoreResult<usize> {
    let description = if label == UNKNOWN_LABEL {
        UNKNOWN_NODE_DESCRIPTION
    } else {
        ""
    };
    let created = conn.execute(
        "INSERT INTO graph_nodes (
            database,
            id,
            labels,
            node_type,
            name,
            description
        ) VALUES (?1, ?2, ?3, ?4, ?2, ?5)
        ON CONFLICT (database, id) DO NOTHING;",
        params![
            database,
            id,
            serde_json::to_string(&[label])?,
            label,
            description,
        ],
    )?;
    Ok(created)
}

fn delete_design_subtree(
    conn: &Connection,
    database: &str,
    design_id: &str,
) -> StoreResult<WriteSummary> {
    let subtree = list_design_subtree(conn, database, design_id)?;
    let mut summary = WriteSummary::default();
    if subtree.is_empty() {
        return Ok(summary);
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    for id in &subtree {
        summary.relationships_deleted += tx.execute(
            "DELETE FROM graph_relationships
             WHERE database = ?1
               AND (start_id = ?2 OR end_id = ?2);",
            params![database, id],
        )?;
        summary.nodes_deleted += tx.execute(
            "DELETE FROM graph_nodes
             WHERE database = ?1
               AND id = ?2;",
            params![database, id],
        )?;
    }

    // Stubs only referenced by the deleted design are left without edges.
    summary.nodes_deleted += tx.execute(
        "DELETE FROM graph_nodes
         WHERE database = ?1
           AND node_type = ?2
           AND NOT EXISTS (
             SELECT 1
             FROM graph_relationships rel
             WHERE rel.database = ?1
               AND (rel.start_id = graph_nodes.id OR rel.end_id = graph_nodes.id)
           );",
        params![database, UNKNOWN_LABEL],
    )?;
    tx.commit()?;

    info!(
        "event=design_delete module=store status=ok database={} design_id={} nodes_deleted={} relationships_deleted={}",
        database, design_id, summary.nodes_deleted, summary.relationships_deleted
    );
    Ok(summary)
}

/// Lists the design root and every node whose containment chain reaches it.
fn list_design_subtree(
    conn: &Connection,
    database: &str,
    design_id: &str,
) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "WITH RECURSIVE subtree(id) AS (
            SELECT id
            FROM graph_nodes
            WHERE database = ?1
              AND id = ?2
              AND node_type = 'Design'
            UNION
            SELECT rel.start_id
            FROM graph_relationships rel
            INNER JOIN subtree parent ON rel.end_id = parent.id
            WHERE rel.database = ?1
              AND rel.rel_type = 'BELONGS_TO'
        )
        SELECT id FROM subtree;",
    )?;
    let mut rows = stmt.query(params![database, design_id])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        ids.push(row.get::<_, String>(0)?);
    }
    Ok(ids)
}

fn delete_all(conn: &Connection, database: &str) -> StoreResult<WriteSummary> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let relationships_deleted = tx.execute(
        "DELETE FROM graph_relationships WHERE database = ?1;",
        [database],
    )?;
    let nodes_deleted = tx.execute("DELETE FROM graph_nodes WHERE database = ?1;", [database])?;
    tx.commit()?;

    Ok(WriteSummary {
        nodes_deleted,
        relationships_deleted,
        ..WriteSummary::default()
    })
}

fn node_exists(conn: &Connection, database: &str, id: &str) -> StoreResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM graph_nodes WHERE database = ?1 AND id = ?2;",
            params![database, id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn count_rows(conn: &Connection, table: &'static str, database: &str) -> StoreResult<usize> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {table} WHERE database = ?1;"),
        [database],
        |row| row.get(0),
    )?;
    usize::try_from(count)
        .map_err(|_| StoreError::InvalidData(format!("negative row count in {table}")))
}

fn parse_node_row(row: &Row<'_>) -> StoreResult<StoredNode> {
    let labels_text: String = row.get("labels")?;
    let tags_text: String = row.get("tags")?;
    let properties_text: String = row.get("properties")?;

    Ok(StoredNode {
        id: row.get("id")?,
        labels: parse_json_column(&labels_text, "graph_nodes.labels")?,
        node_type: row.get("node_type")?,
        name: row.get("name")?,
        description: row.get("description")?,
        tags: parse_json_column(&tags_text, "graph_nodes.tags")?,
        properties: parse_json_column(&properties_text, "graph_nodes.properties")?,
    })
}

fn parse_relationship_row(row: &Row<'_>) -> StoreResult<StoredRelationship> {
    let rel_type: String = row.get("rel_type")?;
    let kind = RelationshipKind::parse(&rel_type).ok_or_else(|| {
        StoreError::InvalidData(format!(
            "invalid relationship type `{rel_type}` in graph_relationships.rel_type"
        ))
    })?;

    Ok(StoredRelationship {
        start_id: row.get("start_id")?,
        end_id: row.get("end_id")?,
        kind,
        description: row.get("description")?,
    })
}

fn parse_json_column<T: serde::de::DeserializeOwned>(
    value: &str,
    column: &'static str,
) -> StoreResult<T> {
    serde_json::from_str(value)
        .map_err(|err| StoreError::InvalidData(format!("invalid json in {column}: {err}")))
}

fn ensure_graph_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}
