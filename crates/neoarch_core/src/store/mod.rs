//! Property-graph store contracts and implementations.
//!
//! # Responsibility
//! - Define the driver contract consumed by materialization: open a session
//!   bound to a named database, run one parametrized write, close.
//! - Provide the SQLite-backed store and the design materializer.
//!
//! # Invariants
//! - Sessions run statements one at a time; there is no multi-statement
//!   transaction exposed to callers.
//! - Store errors are returned verbatim to the caller.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::AddAssign;

pub mod materialize;
pub mod sqlite;
pub mod statement;

pub use materialize::{clear_store_unsafe, delete_design, save_design, SaveReport};
pub use sqlite::{SqliteGraphStore, StoredNode, StoredRelationship};
pub use statement::{tag_property_key, NodeUpsert, RelationshipUpsert, Statement};

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from graph store sessions and statements.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Property or label payload could not be encoded/decoded.
    Serialization(serde_json::Error),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
    /// Driver-specific failure reported by a non-SQLite store.
    Driver(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "graph payload encoding failed: {err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "graph store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid graph data: {message}"),
            Self::Driver(message) => write!(f, "graph driver error: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::UninitializedConnection { .. } => None,
            Self::InvalidData(_) => None,
            Self::Driver(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Counters reported by one or more statements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub nodes_created: usize,
    pub nodes_updated: usize,
    pub nodes_deleted: usize,
    pub relationships_created: usize,
    pub relationships_deleted: usize,
}

impl AddAssign for WriteSummary {
    fn add_assign(&mut self, other: Self) {
        self.nodes_created += other.nodes_created;
        self.nodes_updated += other.nodes_updated;
        self.nodes_deleted += other.nodes_deleted;
        self.relationships_created += other.relationships_created;
        self.relationships_deleted += other.relationships_deleted;
    }
}

/// Graph database driver.
pub trait GraphStore {
    /// Opens a session bound to the named logical database.
    fn open_session(&self, database: &str) -> StoreResult<Box<dyn GraphSession + '_>>;
}

/// One open session. Each `run` is one write; there is no rollback.
pub trait GraphSession {
    fn database(&self) -> &str;
    fn run(&mut self, statement: &Statement) -> StoreResult<WriteSummary>;
    /// Consumes the session and releases its resources.
    fn close(self: Box<Self>) -> StoreResult<()>;
}
