//! Element and relationship kinds.
//!
//! # Invariants
//! - `NodeKind::label()` is the graph-store label used at materialization.
//! - `RelationshipKind::as_str()` is the graph-store relationship type.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Label used for relationship endpoints that cannot be resolved locally.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Kind of one architecture element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Root aggregate node. Exactly one per design.
    Design,
    Person,
    System,
    Container,
    Component,
    /// Caller-defined element kind; the string is the store label.
    Custom(String),
}

impl NodeKind {
    /// Returns the graph-store label for this kind.
    pub fn label(&self) -> &str {
        match self {
            Self::Design => "Design",
            Self::Person => "Person",
            Self::System => "System",
            Self::Container => "Container",
            Self::Component => "Component",
            Self::Custom(label) => label.as_str(),
        }
    }

    /// Returns whether elements of this kind live inside a system.
    pub fn is_nested(&self) -> bool {
        matches!(self, Self::Container | Self::Component | Self::Custom(_))
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Type of one directed relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipKind {
    /// Explicit usage declared by the caller.
    Uses,
    /// Usage lifted from nested elements to system level.
    ImpliedUse,
    /// Structural containment, child -> parent.
    BelongsTo,
    /// Person-to-person interaction.
    InteractsWith,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uses => "USES",
            Self::ImpliedUse => "IMPLIED_USE",
            Self::BelongsTo => "BELONGS_TO",
            Self::InteractsWith => "INTERACTS_WITH",
        }
    }

    /// Parses a store relationship type.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "USES" => Some(Self::Uses),
            "IMPLIED_USE" => Some(Self::ImpliedUse),
            "BELONGS_TO" => Some(Self::BelongsTo),
            "INTERACTS_WITH" => Some(Self::InteractsWith),
            _ => None,
        }
    }
}

impl Display for RelationshipKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{NodeKind, RelationshipKind};

    #[test]
    fn custom_kind_uses_its_own_label() {
        let kind = NodeKind::Custom("Queue".to_string());
        assert_eq!(kind.label(), "Queue");
        assert!(kind.is_nested());
        assert!(!NodeKind::System.is_nested());
    }

    #[test]
    fn relationship_kind_parses_store_names() {
        for kind in [
            RelationshipKind::Uses,
            RelationshipKind::ImpliedUse,
            RelationshipKind::BelongsTo,
            RelationshipKind::InteractsWith,
        ] {
            assert_eq!(RelationshipKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(RelationshipKind::parse("OWNS"), None);
    }

    #[test]
    fn relationship_kind_serializes_as_store_type() {
        let json = serde_json::to_string(&RelationshipKind::ImpliedUse).unwrap();
        assert_eq!(json, "\"IMPLIED_USE\"");
    }
}
