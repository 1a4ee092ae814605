//! Typed graph write statements.
//!
//! # Responsibility
//! - Describe every write the materializer issues as one value.
//! - Derive store labels and properties from model records.
//!
//! # Invariants
//! - Node identity is the full ID; relationship identity is
//!   `(start, end, type, description)`.
//! - Tag property keys only contain `[A-Za-z0-9_]`.

use crate::model::{Design, Node, Relationship, RelationshipKind, UNKNOWN_LABEL};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static PROPERTY_KEY_UNSAFE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("valid property key regex"));

/// Property key prefix for per-tag boolean properties.
pub const TAG_PROPERTY_PREFIX: &str = "tag_";
/// Property set on external elements.
pub const EXTERNAL_PROPERTY: &str = "external";

/// Returns the boolean property key for one tag.
pub fn tag_property_key(tag: &str) -> String {
    format!(
        "{TAG_PROPERTY_PREFIX}{}",
        PROPERTY_KEY_UNSAFE_RE.replace_all(tag, "_")
    )
}

/// Node upsert keyed by full ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeUpsert {
    pub id: String,
    /// Kind label first, then extra labels.
    pub labels: Vec<String>,
    pub name: String,
    pub description: String,
    pub node_type: String,
    pub tags: Vec<String>,
    pub external: bool,
}

impl NodeUpsert {
    pub fn from_node(node: &Node) -> Self {
        let mut labels = vec![node.kind.label().to_string()];
        for label in &node.labels {
            if !labels.contains(label) {
                labels.push(label.clone());
            }
        }

        Self {
            id: node.full_id.clone(),
            labels,
            name: node.name.clone(),
            description: node.description.clone(),
            node_type: node.kind.label().to_string(),
            tags: node.tags.clone(),
            external: node.external,
        }
    }

    /// Extra properties: one `tag_*` flag per tag and `external` when set.
    pub fn properties(&self) -> Map<String, Value> {
        let mut properties = Map::new();
        for tag in &self.tags {
            properties.insert(tag_property_key(tag), Value::Bool(true));
        }
        if self.external {
            properties.insert(EXTERNAL_PROPERTY.to_string(), Value::Bool(true));
        }
        properties
    }
}

/// Relationship upsert keyed by `(start, end, type, description)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipUpsert {
    pub start_id: String,
    pub start_label: String,
    pub end_id: String,
    pub end_label: String,
    pub kind: RelationshipKind,
    pub description: String,
}

impl RelationshipUpsert {
    /// Resolves endpoint labels from the design registry, `Unknown` otherwise.
    pub fn from_relationship(relationship: &Relationship, design: &Design) -> Self {
        let label_of = |id: &str| {
            design
                .node(id)
                .map(|node| node.kind.label().to_string())
                .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
        };

        Self {
            start_id: relationship.start_id.clone(),
            start_label: label_of(&relationship.start_id),
            end_id: relationship.end_id.clone(),
            end_label: label_of(&relationship.end_id),
            kind: relationship.kind,
            description: relationship.description.clone(),
        }
    }
}

/// One parametrized graph write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    MergeNode(NodeUpsert),
    MergeRelationship(RelationshipUpsert),
    /// Deletes a design root and everything it contains.
    DeleteDesign { design_id: String },
    /// Deletes every node and relationship of the session database.
    DeleteAll,
}

impl Statement {
    /// Stable statement name used in log events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MergeNode(_) => "merge_node",
            Self::MergeRelationship(_) => "merge_relationship",
            Self::DeleteDesign { .. } => "delete_design",
            Self::DeleteAll => "delete_all",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{tag_property_key, NodeUpsert, RelationshipUpsert, Statement};
    use crate::model::{Design, RelationshipKind, Taggable};

    #[test]
    fn tag_keys_replace_unsafe_characters() {
        assert_eq!(tag_property_key("front-end: web"), "tag_front_end__web");
        assert_eq!(tag_property_key("it's \"db\""), "tag_it_s__db_");
        assert_eq!(tag_property_key("grpc_v2"), "tag_grpc_v2");
    }

    #[test]
    fn node_upsert_carries_labels_tags_and_external_flag() {
        let mut design = Design::new("shop", "");
        let user = design
            .person("User", "Customer")
            .unwrap()
            .external()
            .tag("web-user")
            .label("Actor")
            .finish();

        let upsert = NodeUpsert::from_node(design.node(user.full_id()).unwrap());
        assert_eq!(upsert.labels, vec!["Person".to_string(), "Actor".to_string()]);
        assert_eq!(upsert.node_type, "Person");

        let properties = upsert.properties();
        assert_eq!(properties.get("tag_web_user"), Some(&serde_json::Value::Bool(true)));
        assert_eq!(properties.get("external"), Some(&serde_json::Value::Bool(true)));
    }

    #[test]
    fn relationship_upsert_labels_unresolved_endpoint_as_unknown() {
        let mut design = Design::new("shop", "");
        let system = design.system("Billing", "").unwrap().finish();
        let foreign = design.reference("design_other.Ledger");
        design.uses(&system, &foreign, "posts entries");

        let rel = design
            .relationships()
            .of_kind(RelationshipKind::Uses)
            .next()
            .unwrap();
        let upsert = RelationshipUpsert::from_relationship(rel, &design);
        assert_eq!(upsert.start_label, "System");
        assert_eq!(upsert.end_label, "Unknown");
    }

    #[test]
    fn node_upsert_deduplicates_extra_labels() {
        let mut design = Design::new("shop", "");
        let system = design
            .system("Billing", "")
            .unwrap()
            .label("Team Ledger")
            .label("System")
            .label("Team Ledger")
            .finish();

        let upsert = NodeUpsert::from_node(design.node(system.full_id()).unwrap());
        assert_eq!(
            upsert.labels,
            vec!["System".to_string(), "Team Ledger".to_string()]
        );
        assert!(upsert.properties().is_empty());
    }

    #[test]
    fn statement_names_are_stable() {
        assert_eq!(Statement::DeleteAll.name(), "delete_all");
        assert_eq!(
            Statement::DeleteDesign {
                design_id: "design_shop".to_string()
            }
            .name(),
            "delete_design"
        );
    }
}
