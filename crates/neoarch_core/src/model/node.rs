//! Architecture element record and hierarchical identifier scheme.
//!
//! # Responsibility
//! - Derive full IDs and full names from the parent chain.
//! - Hold mutable display metadata (tags, labels, external flag).
//!
//! # Invariants
//! - `full_id` is `parent.full_id + "." + id`, or `id` for the root.
//! - `parent` is a lookup key into the owning registry, never an owner.

use crate::model::kind::NodeKind;
use serde::{Deserialize, Serialize};

/// Separator between hierarchy levels in full IDs and full names.
pub const ID_SEPARATOR: char = '.';

/// One architecture element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Local ID, unique among the parent's children.
    pub id: String,
    /// Globally unique hierarchical ID.
    pub full_id: String,
    pub name: String,
    /// Dot-joined chain of ancestor names.
    pub full_name: String,
    pub description: String,
    pub kind: NodeKind,
    /// Display order follows insertion order.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Extra graph-store labels.
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub external: bool,
    /// Full ID of the owning node. `None` only for the design root.
    #[serde(default)]
    pub parent: Option<String>,
}

impl Node {
    /// Creates a node under `parent`, deriving full ID and full name.
    pub fn new(
        id: impl Into<String>,
        parent: Option<&Node>,
        kind: NodeKind,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let id = id.into();
        let name = name.into();
        let (full_id, full_name) = match parent {
            Some(parent) => (
                format!("{}{ID_SEPARATOR}{id}", parent.full_id),
                format!("{}{ID_SEPARATOR}{name}", parent.full_name),
            ),
            None => (id.clone(), name.clone()),
        };

        Self {
            id,
            full_id,
            name,
            full_name,
            description: description.into(),
            kind,
            tags: Vec::new(),
            labels: Vec::new(),
            external: false,
            parent: parent.map(|parent| parent.full_id.clone()),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Validates one local ID before it is combined into a full ID.
pub(crate) fn is_valid_local_id(id: &str) -> bool {
    !id.trim().is_empty() && !id.contains(ID_SEPARATOR)
}
