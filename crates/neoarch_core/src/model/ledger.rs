//! Relationship ledger and implied-use recording.
//!
//! # Responsibility
//! - Keep every relationship in insertion order.
//! - Decide whether an implied-use edge may be recorded.
//!
//! # Invariants
//! - The ledger is append-only; explicit edges are never deduplicated.
//! - An IMPLIED_USE edge `A -> B` is dropped when a BELONGS_TO edge links
//!   `A` and `B` in either direction, or when implied use is disabled.

use crate::model::kind::RelationshipKind;
use serde::{Deserialize, Serialize};

/// Directed, typed edge between two full IDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    pub start_id: String,
    pub end_id: String,
    pub kind: RelationshipKind,
    /// Part of the edge identity for store upserts.
    pub description: String,
}

impl Relationship {
    pub fn new(
        start_id: impl Into<String>,
        end_id: impl Into<String>,
        kind: RelationshipKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            start_id: start_id.into(),
            end_id: end_id.into(),
            kind,
            description: description.into(),
        }
    }

    /// Returns whether this edge connects `a` and `b`, ignoring direction.
    fn links(&self, a: &str, b: &str) -> bool {
        (self.start_id == a && self.end_id == b) || (self.start_id == b && self.end_id == a)
    }
}

/// Ordered relationship ledger of one design.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    entries: Vec<Relationship>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_slice(&self) -> &[Relationship] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Relationship> {
        self.entries.iter()
    }

    /// Appends one explicit relationship.
    pub fn record(&mut self, relationship: Relationship) {
        self.entries.push(relationship);
    }

    /// Appends an IMPLIED_USE edge unless disabled or suppressed.
    ///
    /// Returns whether the edge was recorded.
    pub fn record_implied(
        &mut self,
        implied_use_enabled: bool,
        start_id: &str,
        end_id: &str,
        description: &str,
    ) -> bool {
        if !implied_use_enabled || start_id == end_id {
            return false;
        }
        if self.is_contained(start_id, end_id) {
            return false;
        }

        self.entries.push(Relationship::new(
            start_id,
            end_id,
            RelationshipKind::ImpliedUse,
            description,
        ));
        true
    }

    /// Returns whether a BELONGS_TO edge links the two IDs in either direction.
    pub fn is_contained(&self, a: &str, b: &str) -> bool {
        self.entries
            .iter()
            .any(|rel| rel.kind == RelationshipKind::BelongsTo && rel.links(a, b))
    }

    /// Iterates relationships of one kind in ledger order.
    pub fn of_kind(&self, kind: RelationshipKind) -> impl Iterator<Item = &Relationship> + '_ {
        self.entries.iter().filter(move |rel| rel.kind == kind)
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a Relationship;
    type IntoIter = std::slice::Iter<'a, Relationship>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{Ledger, Relationship};
    use crate::model::kind::RelationshipKind;

    fn belongs_to(child: &str, parent: &str) -> Relationship {
        Relationship::new(child, parent, RelationshipKind::BelongsTo, "Is part of")
    }

    #[test]
    fn explicit_relationships_are_not_deduplicated() {
        let mut ledger = Ledger::new();
        ledger.record(Relationship::new("a", "b", RelationshipKind::Uses, "calls"));
        ledger.record(Relationship::new("a", "b", RelationshipKind::Uses, "calls"));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn implied_use_is_suppressed_by_containment_in_both_directions() {
        let mut ledger = Ledger::new();
        ledger.record(belongs_to("sys.api", "sys"));

        assert!(!ledger.record_implied(true, "sys", "sys.api", "uses"));
        assert!(!ledger.record_implied(true, "sys.api", "sys", "uses"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn implied_use_is_noop_when_disabled() {
        let mut ledger = Ledger::new();
        assert!(!ledger.record_implied(false, "a", "b", "uses"));
        assert!(ledger.is_empty());
    }

    #[test]
    fn implied_use_never_targets_itself() {
        let mut ledger = Ledger::new();
        assert!(!ledger.record_implied(true, "sys", "sys", "uses"));
        assert!(ledger.record_implied(true, "sys", "other", "uses"));
        assert_eq!(ledger.of_kind(RelationshipKind::ImpliedUse).count(), 1);
    }
}
