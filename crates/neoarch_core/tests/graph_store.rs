use neoarch_core::store::StoredRelationship;
use neoarch_core::{
    clear_store_unsafe, delete_design, save_design, CanUse, Design, GraphSession, GraphStore,
    RelationshipKind, SqliteGraphStore, Statement, StoreConfig, StoreError, StoreResult,
    Taggable, WriteSummary,
};
use std::cell::RefCell;

fn sample_design(name: &str) -> Design {
    let mut design = Design::new(name, "sample");
    let user = design.person("User", "Customer").unwrap().external().finish();
    let web = design.system("Web", "Storefront").unwrap().tag("edge").finish();
    let db = design.system("Db", "Storage").unwrap().finish();
    let api = design
        .container(&web, "Api", "REST API")
        .unwrap()
        .tag("grpc v2")
        .uses(&db, "queries")
        .finish();
    design.component(&api, "Handler", "").unwrap().finish();
    design.uses(&user, &api, "calls");
    design
}

fn setup() -> SqliteGraphStore {
    SqliteGraphStore::open_in_memory().unwrap()
}

#[test]
fn save_materializes_nodes_labels_and_properties() {
    let store = setup();
    let design = sample_design("shop");
    save_design(&store, &StoreConfig::default(), &design).unwrap();

    assert_eq!(store.node_count("neo4j").unwrap(), design.node_count());
    assert_eq!(
        store.relationship_count("neo4j").unwrap(),
        design.relationships().len()
    );

    let api = store.node("neo4j", "design_shop.Web.Api").unwrap().unwrap();
    assert_eq!(api.labels, vec!["Container".to_string()]);
    assert_eq!(api.node_type, "Container");
    assert_eq!(api.name, "Api");
    assert_eq!(api.tags, vec!["grpc v2".to_string()]);
    assert!(api.has_tag("grpc v2"));
    assert!(api.properties.contains_key("tag_grpc_v2"));
    assert!(!api.is_external());

    let user = store
        .node("neo4j", "design_shop.person_User")
        .unwrap()
        .unwrap();
    assert!(user.is_external());

    let root = store.node("neo4j", "design_shop").unwrap().unwrap();
    assert_eq!(root.node_type, "Design");
}

#[test]
fn saving_twice_creates_no_duplicates() {
    let store = setup();
    let design = sample_design("shop");
    let config = StoreConfig::default();

    let first = save_design(&store, &config, &design).unwrap();
    let nodes = store.node_count("neo4j").unwrap();
    let relationships = store.relationship_count("neo4j").unwrap();

    let second = save_design(&store, &config, &design).unwrap();
    assert_eq!(store.node_count("neo4j").unwrap(), nodes);
    assert_eq!(store.relationship_count("neo4j").unwrap(), relationships);
    assert_eq!(second.summary.nodes_created, 0);
    assert_eq!(second.summary.nodes_updated, first.nodes);
    assert_eq!(second.summary.relationships_created, 0);
}

#[test]
fn description_is_part_of_relationship_identity() {
    let store = setup();
    let mut design = Design::new("shop", "");
    let a = design.system("A", "").unwrap().finish();
    let b = design.system("B", "").unwrap().finish();
    design.uses(&a, &b, "reads");
    design.uses(&a, &b, "writes");
    design.uses(&a, &b, "reads");

    save_design(&store, &StoreConfig::default(), &design).unwrap();

    let uses: Vec<StoredRelationship> = store
        .relationships("neo4j")
        .unwrap()
        .into_iter()
        .filter(|rel| rel.kind == RelationshipKind::Uses)
        .collect();
    let descriptions: Vec<_> = uses.iter().map(|rel| rel.description.as_str()).collect();
    assert_eq!(descriptions, vec!["reads", "writes"]);
}

#[test]
fn resave_overwrites_node_fields() {
    let store = setup();
    let config = StoreConfig::default();
    let mut design = Design::new("shop", "");
    let web = design.system("Web", "old").unwrap().finish();
    save_design(&store, &config, &design).unwrap();

    let mut updated = Design::new("shop", "");
    updated
        .system("Web", "new")
        .unwrap()
        .tag("edge")
        .label("Frontend")
        .finish();
    save_design(&store, &config, &updated).unwrap();

    let node = store.node("neo4j", web.full_id()).unwrap().unwrap();
    assert_eq!(node.description, "new");
    assert_eq!(node.labels, vec!["System".to_string(), "Frontend".to_string()]);
    assert!(node.has_tag("edge"));
}

#[test]
fn unresolved_endpoint_becomes_unknown_stub() {
    let store = setup();
    let mut design = Design::new("shop", "");
    let web = design.system("Web", "").unwrap().finish();
    let ledger = design.reference("design_finance.Ledger");
    design.uses(&web, &ledger, "posts entries");

    save_design(&store, &StoreConfig::default(), &design).unwrap();

    let stub = store
        .node("neo4j", "design_finance.Ledger")
        .unwrap()
        .unwrap();
    assert_eq!(stub.labels, vec!["Unknown".to_string()]);
    assert_eq!(stub.node_type, "Unknown");
}

#[test]
fn delete_design_removes_subtree_and_keeps_other_designs() {
    let store = setup();
    let config = StoreConfig::default();
    let shop = sample_design("shop");
    let blog = sample_design("blog");
    save_design(&store, &config, &shop).unwrap();
    save_design(&store, &config, &blog).unwrap();

    let summary = delete_design(&store, &config.database, shop.id()).unwrap();
    assert_eq!(summary.nodes_deleted, shop.node_count());
    assert_eq!(summary.relationships_deleted, shop.relationships().len());

    let remaining = store.nodes("neo4j").unwrap();
    assert_eq!(remaining.len(), blog.node_count());
    assert!(remaining
        .iter()
        .all(|node| node.id.starts_with("design_blog")));
    assert_eq!(
        store.relationship_count("neo4j").unwrap(),
        blog.relationships().len()
    );
}

#[test]
fn delete_design_removes_stubs_it_alone_referenced() {
    let store = setup();
    let config = StoreConfig::default();
    let mut design = Design::new("shop", "");
    let web = design.system("Web", "").unwrap().finish();
    let ledger = design.reference("design_finance.Ledger");
    design.uses(&web, &ledger, "posts entries");
    save_design(&store, &config, &design).unwrap();

    design.delete_from_store(&store, &config).unwrap();
    assert_eq!(store.node_count("neo4j").unwrap(), 0);
    assert_eq!(store.relationship_count("neo4j").unwrap(), 0);
}

#[test]
fn delete_unknown_design_is_a_no_op() {
    let store = setup();
    let config = StoreConfig::default();
    save_design(&store, &config, &sample_design("shop")).unwrap();

    let summary = delete_design(&store, &config.database, "design_missing").unwrap();
    assert_eq!(summary, WriteSummary::default());
    assert_eq!(
        store.node_count("neo4j").unwrap(),
        sample_design("shop").node_count()
    );
}

#[test]
fn clear_wipes_only_the_named_database() {
    let store = setup();
    let design = sample_design("shop");
    save_design(&store, &StoreConfig::new("alpha"), &design).unwrap();
    save_design(&store, &StoreConfig::new("beta"), &design).unwrap();

    let summary = clear_store_unsafe(&store, "alpha").unwrap();
    assert_eq!(summary.nodes_deleted, design.node_count());
    assert_eq!(store.node_count("alpha").unwrap(), 0);
    assert_eq!(store.relationship_count("alpha").unwrap(), 0);
    assert_eq!(store.node_count("beta").unwrap(), design.node_count());
}

#[test]
fn file_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.db");
    let design = sample_design("shop");

    {
        let store = SqliteGraphStore::open(&path).unwrap();
        save_design(&store, &StoreConfig::default(), &design).unwrap();
    }

    let store = SqliteGraphStore::open(&path).unwrap();
    assert_eq!(store.node_count("neo4j").unwrap(), design.node_count());
    assert_eq!(
        store.relationship_count("neo4j").unwrap(),
        design.relationships().len()
    );
}

/// Records statements and fails on the configured call.
struct FailingStore {
    fail_at: usize,
    log: RefCell<Vec<&'static str>>,
    closed: RefCell<bool>,
}

struct FailingSession<'s> {
    store: &'s FailingStore,
}

impl GraphStore for FailingStore {
    fn open_session(&self, _database: &str) -> StoreResult<Box<dyn GraphSession + '_>> {
        Ok(Box::new(FailingSession { store: self }))
    }
}

impl GraphSession for FailingSession<'_> {
    fn database(&self) -> &str {
        "neo4j"
    }

    fn run(&mut self, statement: &Statement) -> StoreResult<WriteSummary> {
        let mut log = self.store.log.borrow_mut();
        if log.len() == self.store.fail_at {
            return Err(StoreError::Driver("connection reset".to_string()));
        }
        log.push(statement.name());
        Ok(WriteSummary::default())
    }

    fn close(self: Box<Self>) -> StoreResult<()> {
        *self.store.closed.borrow_mut() = true;
        Ok(())
    }
}

#[test]
fn save_stops_at_first_error_and_closes_session() {
    let design = sample_design("shop");
    let store = FailingStore {
        fail_at: 2,
        log: RefCell::new(Vec::new()),
        closed: RefCell::new(false),
    };

    let err = save_design(&store, &StoreConfig::default(), &design).unwrap_err();
    assert!(matches!(err, StoreError::Driver(ref message) if message == "connection reset"));
    assert_eq!(*store.log.borrow(), vec!["merge_node", "merge_node"]);
    assert!(*store.closed.borrow());
}

#[test]
fn save_issues_all_nodes_before_relationships() {
    let design = sample_design("shop");
    let store = FailingStore {
        fail_at: usize::MAX,
        log: RefCell::new(Vec::new()),
        closed: RefCell::new(false),
    };

    save_design(&store, &StoreConfig::default(), &design).unwrap();

    let log = store.log.borrow();
    let first_relationship = log
        .iter()
        .position(|name| *name == "merge_relationship")
        .unwrap();
    assert_eq!(first_relationship, design.node_count());
    assert!(log[first_relationship..]
        .iter()
        .all(|name| *name == "merge_relationship"));
    assert_eq!(log.len(), design.node_count() + design.relationships().len());
}
