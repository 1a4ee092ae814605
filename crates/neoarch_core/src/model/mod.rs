//! Architecture model: elements, relationships and the design aggregate.
//!
//! # Responsibility
//! - Define the canonical C4 element and relationship records.
//! - Build designs through typed, capability-scoped builders.
//!
//! # Invariants
//! - Nodes reference their parent by full ID only; the design registry is
//!   the single owner of every node.

pub mod design;
pub mod element;
pub mod kind;
pub mod ledger;
pub mod node;

pub use design::{Design, DesignError, DesignOptions, DesignResult};
pub use element::{
    kinds, CanBeUsedBy, CanUse, Element, ElementBuilder, ElementRef, InteractsWith, Taggable,
};
pub use kind::{NodeKind, RelationshipKind, UNKNOWN_LABEL};
pub use ledger::{Ledger, Relationship};
pub use node::{Node, ID_SEPARATOR};
