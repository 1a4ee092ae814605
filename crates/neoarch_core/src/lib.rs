//! Architecture-as-code core for neoarch.
//!
//! Designs are built in memory as C4 element hierarchies, then materialized
//! into a property-graph store or rendered as Structurizr DSL.

pub mod config;
pub mod db;
pub mod dsl;
pub mod logging;
pub mod model;
pub mod store;

pub use config::{Config, ConfigError, LogConfig, StoreConfig};
pub use dsl::to_structurizr_dsl;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{
    kinds, CanBeUsedBy, CanUse, Design, DesignError, DesignOptions, DesignResult, Element,
    ElementBuilder, ElementRef, InteractsWith, Node, NodeKind, Relationship, RelationshipKind,
    Taggable,
};
pub use store::{
    clear_store_unsafe, delete_design, save_design, GraphSession, GraphStore, SaveReport,
    SqliteGraphStore, Statement, StoreError, StoreResult, WriteSummary,
};

impl Design {
    /// Renders this design as Structurizr DSL. See [`to_structurizr_dsl`].
    pub fn to_structurizr_dsl(&self) -> String {
        dsl::to_structurizr_dsl(self)
    }
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
