//! Design materialization into a graph store.
//!
//! # Responsibility
//! - Translate a design registry and ledger into node and relationship
//!   upserts issued through one store session.
//! - Delete one design subtree or clear a whole logical database.
//!
//! # Invariants
//! - Nodes are written before relationships; nodes in ascending ID order,
//!   relationships in ledger order.
//! - The first failing statement aborts the run; earlier writes stay.
//! - The session is closed on success and on failure.

use crate::config::StoreConfig;
use crate::model::Design;
use crate::store::statement::{NodeUpsert, RelationshipUpsert, Statement};
use crate::store::{GraphSession, GraphStore, StoreResult, WriteSummary};
use log::{error, info};
use std::time::Instant;

/// Outcome of one `save_design` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// Node upserts issued.
    pub nodes: usize,
    /// Relationship upserts issued.
    pub relationships: usize,
    pub summary: WriteSummary,
}

/// Upserts every node and relationship of `design` into the configured
/// database.
///
/// # Errors
/// - Returns the first store error unchanged. The store keeps whatever was
///   written before it.
pub fn save_design<S: GraphStore + ?Sized>(
    store: &S,
    config: &StoreConfig,
    design: &Design,
) -> StoreResult<SaveReport> {
    let started_at = Instant::now();
    info!(
        "event=design_save module=store status=start design_id={} database={}",
        design.id(),
        config.database
    );

    let mut session = store.open_session(&config.database)?;
    let database = session.database().to_string();
    let result = write_design(session.as_mut(), design);
    let closed = session.close();

    match (result, closed) {
        (Ok(report), Ok(())) => {
            info!(
                "event=design_save module=store status=ok design_id={} database={database} nodes={} relationships={} duration_ms={}",
                design.id(),
                report.nodes,
                report.relationships,
                started_at.elapsed().as_millis()
            );
            Ok(report)
        }
        (Err(err), _) | (Ok(_), Err(err)) => {
            error!(
                "event=design_save module=store status=error design_id={} database={database} duration_ms={} error={}",
                design.id(),
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn write_design(session: &mut (dyn GraphSession + '_), design: &Design) -> StoreResult<SaveReport> {
    let mut report = SaveReport::default();

    for node in design.nodes() {
        let statement = Statement::MergeNode(NodeUpsert::from_node(node));
        report.summary += session.run(&statement)?;
        report.nodes += 1;
    }

    for relationship in design.relationships() {
        let statement =
            Statement::MergeRelationship(RelationshipUpsert::from_relationship(relationship, design));
        report.summary += session.run(&statement)?;
        report.relationships += 1;
    }

    Ok(report)
}

/// Deletes the design root `design_id` and everything it contains.
pub fn delete_design<S: GraphStore + ?Sized>(
    store: &S,
    database: &str,
    design_id: &str,
) -> StoreResult<WriteSummary> {
    run_single(
        store,
        database,
        &Statement::DeleteDesign {
            design_id: design_id.to_string(),
        },
    )
}

/// Deletes every node and relationship of `database`, including other
/// designs.
pub fn clear_store_unsafe<S: GraphStore + ?Sized>(
    store: &S,
    database: &str,
) -> StoreResult<WriteSummary> {
    run_single(store, database, &Statement::DeleteAll)
}

fn run_single<S: GraphStore + ?Sized>(
    store: &S,
    database: &str,
    statement: &Statement,
) -> StoreResult<WriteSummary> {
    let started_at = Instant::now();
    let mut session = store.open_session(database)?;
    let database = session.database().to_string();
    let result = session.run(statement);
    let closed = session.close();

    let summary = result.and_then(|summary| closed.map(|()| summary));
    match &summary {
        Ok(summary) => info!(
            "event={} module=store status=ok database={} nodes_deleted={} relationships_deleted={} duration_ms={}",
            statement.name(),
            database,
            summary.nodes_deleted,
            summary.relationships_deleted,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event={} module=store status=error database={} duration_ms={} error={}",
            statement.name(),
            database,
            started_at.elapsed().as_millis(),
            err
        ),
    }
    summary
}

impl Design {
    /// Materializes this design. See [`save_design`].
    pub fn save_to_store<S: GraphStore + ?Sized>(
        &self,
        store: &S,
        config: &StoreConfig,
    ) -> StoreResult<SaveReport> {
        save_design(store, config, self)
    }

    /// Removes this design's subtree from the configured database.
    pub fn delete_from_store<S: GraphStore + ?Sized>(
        &self,
        store: &S,
        config: &StoreConfig,
    ) -> StoreResult<WriteSummary> {
        delete_design(store, &config.database, self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::save_design;
    use crate::config::StoreConfig;
    use crate::model::Design;
    use crate::store::{GraphStore, SqliteGraphStore};

    #[test]
    fn save_reports_issued_statement_counts() {
        let mut design = Design::new("shop", "");
        let user = design.person("User", "").unwrap().finish();
        let web = design.system("Web", "").unwrap().finish();
        design.uses(&user, &web, "browses");

        let store = SqliteGraphStore::open_in_memory().unwrap();
        let report = save_design(&store, &StoreConfig::default(), &design).unwrap();

        assert_eq!(report.nodes, 3);
        assert_eq!(report.relationships, design.relationships().len());
        assert_eq!(report.summary.nodes_created, 3);
        assert_eq!(report.summary.relationships_created, report.relationships);
    }

    #[test]
    fn save_works_through_trait_object() {
        let design = Design::new("empty", "");
        let store = SqliteGraphStore::open_in_memory().unwrap();
        let dyn_store: &dyn GraphStore = &store;

        let report = design
            .save_to_store(dyn_store, &StoreConfig::new("designs"))
            .unwrap();
        assert_eq!(report.nodes, 1);
        assert_eq!(store.node_count("designs").unwrap(), 1);
        assert_eq!(store.node_count("neo4j").unwrap(), 0);
    }
}
