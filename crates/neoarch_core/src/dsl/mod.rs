//! Structurizr DSL rendering.
//!
//! # Responsibility
//! - Render a design as a Structurizr workspace with hierarchical
//!   identifiers, one nested block per containment level.
//! - Emit explicit relationships and default views per top-level system.
//!
//! # Invariants
//! - Rendering is pure: same design, same text.
//! - The design root is never emitted as an element.
//! - BELONGS_TO and IMPLIED_USE edges never appear as relationship lines.
//! - Sibling identifiers are unique; later collisions get `_2`, `_3`, ...
//!   in containment order.
//! - Relationships with an endpoint outside the registry are skipped.

mod writer;

use crate::model::{Design, Node, NodeKind, RelationshipKind};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use writer::IndentWriter;

/// Output when the design has no root node.
pub const NO_DESIGN_NODE: &str = "// No design node found";

static IDENTIFIER_UNSAFE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]").expect("valid identifier regex"));

/// Renders `design` as a Structurizr DSL workspace.
pub fn to_structurizr_dsl(design: &Design) -> String {
    let Some(root) = design.nodes().find(|node| node.kind == NodeKind::Design) else {
        return NO_DESIGN_NODE.to_string();
    };
    let renderer = Renderer::new(design, root);
    let top_level = design.children(&root.full_id);

    let mut out = IndentWriter::new();
    let header = format!(
        "workspace \"{}\" \"{}\"",
        escape_quotes(design.name()),
        escape_quotes(design.description())
    );
    out.block(header, |out| {
        out.line("!identifiers hierarchical");
        out.blank();

        out.block("model", |out| {
            for node in &top_level {
                renderer.emit_element(out, node);
            }
            out.blank();
            renderer.emit_relationships(out);
        });

        out.blank();
        out.block("views", |out| {
            for system in top_level.iter().filter(|node| node.kind == NodeKind::System) {
                renderer.emit_system_views(out, system);
            }
        });
    });
    out.finish()
}

/// Escapes double quotes for use inside a DSL string literal.
pub fn escape_quotes(value: &str) -> String {
    value.replace('"', "\\\"")
}

/// Local DSL identifier: characters outside `[A-Za-z0-9_-]` become `_`.
pub fn identifier(local_id: &str) -> String {
    if local_id.is_empty() {
        return "_".to_string();
    }
    IDENTIFIER_UNSAFE_RE.replace_all(local_id, "_").into_owned()
}

struct Renderer<'d> {
    design: &'d Design,
    /// Full ID to the identifier declared for it within its parent block.
    identifiers: HashMap<&'d str, String>,
}

impl<'d> Renderer<'d> {
    fn new(design: &'d Design, root: &'d Node) -> Self {
        let mut renderer = Self {
            design,
            identifiers: HashMap::new(),
        };
        renderer.assign_identifiers(root);
        renderer
    }

    fn assign_identifiers(&mut self, parent: &'d Node) {
        let design = self.design;
        let mut taken = HashSet::new();
        for child in design.children(&parent.full_id) {
            let base = identifier(&child.id);
            let mut candidate = base.clone();
            let mut suffix = 2;
            while !taken.insert(candidate.clone()) {
                candidate = format!("{base}_{suffix}");
                suffix += 1;
            }
            if candidate != base {
                warn!(
                    "event=dsl_render module=dsl status=renamed reason=identifier_collision full_id={} identifier={candidate}",
                    child.full_id
                );
            }
            self.identifiers.insert(child.full_id.as_str(), candidate);
            self.assign_identifiers(child);
        }
    }

    fn identifier_of(&self, node: &Node) -> String {
        self.identifiers
            .get(node.full_id.as_str())
            .cloned()
            .unwrap_or_else(|| identifier(&node.id))
    }

    fn emit_element(&self, out: &mut IndentWriter, node: &Node) {
        let keyword = match &node.kind {
            NodeKind::Design => return,
            NodeKind::Person => "person",
            NodeKind::System => "softwareSystem",
            NodeKind::Container => "container",
            NodeKind::Component => "component",
            NodeKind::Custom(_) => "element",
        };

        let mut declaration = format!(
            "{} = {keyword} \"{}\"",
            self.identifier_of(node),
            escape_quotes(&node.name)
        );
        if let NodeKind::Custom(label) = &node.kind {
            declaration.push_str(&format!(" \"{}\"", escape_quotes(label)));
        }
        declaration.push_str(&format!(" \"{}\"", escape_quotes(&node.description)));

        let nested = self.design.children(&node.full_id);
        if nested.is_empty() && node.tags.is_empty() {
            out.line(declaration);
            return;
        }

        out.block(declaration, |out| {
            if !node.tags.is_empty() {
                out.line(tags_line(&node.tags));
            }
            for child in nested {
                self.emit_element(out, child);
            }
        });
    }

    fn emit_relationships(&self, out: &mut IndentWriter) {
        for rel in self.design.relationships() {
            if matches!(
                rel.kind,
                RelationshipKind::BelongsTo | RelationshipKind::ImpliedUse
            ) {
                continue;
            }
            let (Some(start), Some(end)) = (
                self.reference_path(&rel.start_id),
                self.reference_path(&rel.end_id),
            ) else {
                warn!(
                    "event=dsl_render module=dsl status=skip reason=unresolved_endpoint start_id={} end_id={}",
                    rel.start_id, rel.end_id
                );
                continue;
            };
            out.line(format!(
                "{start} -> {end} \"{}\"",
                escape_quotes(&rel.description)
            ));
        }
    }

    /// Dotted chain of declared identifiers below the root. `None` when
    /// `full_id` is not in the registry.
    fn reference_path(&self, full_id: &str) -> Option<String> {
        let mut node = self.design.node(full_id)?;
        let mut segments = Vec::new();
        loop {
            if node.is_root() {
                break;
            }
            segments.push(self.identifier_of(node));
            match node
                .parent
                .as_deref()
                .and_then(|parent| self.design.node(parent))
            {
                Some(parent) => node = parent,
                None => break,
            }
        }
        segments.reverse();
        Some(segments.join("."))
    }

    fn emit_system_views(&self, out: &mut IndentWriter, system: &Node) {
        let ident = self.identifier_of(system);
        let name = escape_quotes(&system.name);
        let default_view = |out: &mut IndentWriter| {
            out.line("include *");
            out.line("autolayout lr");
        };

        out.block(
            format!("systemContext {ident} \"system_context_{name}\""),
            default_view,
        );
        out.blank();
        out.block(format!("container {ident} \"container_{name}\""), default_view);
        out.blank();
    }
}

fn tags_line(tags: &[String]) -> String {
    let quoted: Vec<String> = tags
        .iter()
        .map(|tag| format!("\"{}\"", escape_quotes(tag)))
        .collect();
    format!("tags {}", quoted.join(" "))
}

#[cfg(test)]
mod tests {
    use super::{escape_quotes, identifier, to_structurizr_dsl, NO_DESIGN_NODE};
    use crate::model::{CanUse, Design, Taggable};

    #[test]
    fn identifier_replaces_unsafe_characters() {
        assert_eq!(identifier("person_Jane Doe"), "person_Jane_Doe");
        assert_eq!(identifier("api-v2"), "api-v2");
        assert_eq!(identifier(""), "_");
    }

    #[test]
    fn escape_quotes_escapes_every_quote() {
        assert_eq!(escape_quotes(r#"say "hi" now"#), r#"say \"hi\" now"#);
    }

    #[test]
    fn single_system_renders_model_and_two_views() {
        let mut design = Design::new("shop", "Online shop");
        design.system("Billing", "Bills customers").unwrap().finish();

        let dsl = to_structurizr_dsl(&design);
        let expected = [
            "workspace \"shop\" \"Online shop\" {",
            "    !identifiers hierarchical",
            "",
            "    model {",
            "        Billing = softwareSystem \"Billing\" \"Bills customers\"",
            "",
            "    }",
            "",
            "    views {",
            "        systemContext Billing \"system_context_Billing\" {",
            "            include *",
            "            autolayout lr",
            "        }",
            "",
            "        container Billing \"container_Billing\" {",
            "            include *",
            "            autolayout lr",
            "        }",
            "",
            "    }",
            "}",
        ]
        .join("\n");
        assert_eq!(dsl, expected);
        assert!(!dsl.contains("->"));
    }

    #[test]
    fn nested_elements_use_hierarchical_references() {
        let mut design = Design::new("shop", "");
        let web = design.system("Web", "").unwrap().tag("edge").finish();
        let api = design.container(&web, "Api Server", "").unwrap().finish();
        let db = design.system("Db", "").unwrap().finish();
        design.container(&web, "Cache", "").unwrap().uses(&db, "reads").finish();
        design.uses(&api, &db, "queries \"orders\"");

        let dsl = to_structurizr_dsl(&design);
        assert!(dsl.contains("Web = softwareSystem \"Web\" \"\" {"));
        assert!(dsl.contains("tags \"edge\""));
        assert!(dsl.contains("Api_Server = container \"Api Server\" \"\""));
        assert!(dsl.contains("Web.Api_Server -> Db \"queries \\\"orders\\\"\""));
        assert!(dsl.contains("Web.Cache -> Db \"reads\""));
        assert!(!dsl.contains("IMPLIED"));
        assert_eq!(dsl.matches("systemContext ").count(), 2);
    }

    #[test]
    fn custom_elements_render_label_as_metadata() {
        let mut design = Design::new("shop", "");
        let web = design.system("Web", "").unwrap().finish();
        let worker = design.container(&web, "Worker", "").unwrap().finish();
        design
            .custom(&worker, "Queue", "Jobs", "Background jobs")
            .unwrap()
            .finish();

        let dsl = to_structurizr_dsl(&design);
        assert!(dsl.contains("Worker = container \"Worker\" \"\" {"));
        assert!(dsl.contains("Jobs = element \"Jobs\" \"Queue\" \"Background jobs\""));
    }

    #[test]
    fn colliding_sibling_identifiers_get_numeric_suffixes() {
        let mut design = Design::new("shop", "");
        let web = design.system("Web", "").unwrap().finish();
        let spaced = design.container(&web, "Api Server", "").unwrap().finish();
        let underscored = design.container(&web, "Api_Server", "").unwrap().finish();
        design.uses(&spaced, &underscored, "forwards");

        let dsl = to_structurizr_dsl(&design);
        assert_eq!(dsl.matches("Api_Server = container").count(), 1);
        assert!(dsl.contains("Api_Server = container \"Api Server\" \"\""));
        assert!(dsl.contains("Api_Server_2 = container \"Api_Server\" \"\""));
        assert!(dsl.contains("Web.Api_Server -> Web.Api_Server_2 \"forwards\""));
    }

    #[test]
    fn identifiers_are_scoped_to_their_parent() {
        let mut design = Design::new("shop", "");
        let web = design.system("Web", "").unwrap().finish();
        let admin = design.system("Admin", "").unwrap().finish();
        let web_api = design.container(&web, "Api", "").unwrap().finish();
        let admin_api = design.container(&admin, "Api", "").unwrap().finish();
        design.uses(&admin_api, &web_api, "proxies");

        let dsl = to_structurizr_dsl(&design);
        assert_eq!(dsl.matches("Api = container \"Api\"").count(), 2);
        assert!(!dsl.contains("Api_2"));
        assert!(dsl.contains("Admin.Api -> Web.Api \"proxies\""));
    }

    #[test]
    fn unresolved_endpoints_are_left_out_of_relationship_lines() {
        let mut design = Design::new("shop", "");
        let web = design.system("Web", "").unwrap().finish();
        let db = design.system("Db", "").unwrap().finish();
        let ledger = design.reference("design_finance.Ledger");
        design.uses(&web, &ledger, "posts entries");
        design.uses(&web, &db, "reads");

        let dsl = to_structurizr_dsl(&design);
        assert!(!dsl.contains("design_finance"));
        assert!(!dsl.contains("posts entries"));
        assert!(dsl.contains("Web -> Db \"reads\""));
        assert_eq!(dsl.matches("->").count(), 1);
    }

    #[test]
    fn rendering_is_repeatable() {
        let mut design = Design::new("shop", "");
        let user = design.person("User", "").unwrap().finish();
        let web = design.system("Web", "").unwrap().finish();
        design.uses(&user, &web, "browses");
        assert_eq!(to_structurizr_dsl(&design), to_structurizr_dsl(&design));
    }

    #[test]
    fn missing_root_renders_comment() {
        let mut value: serde_json::Value =
            serde_json::from_str(&Design::new("shop", "").to_json().unwrap()).unwrap();
        value["nodes"] = serde_json::json!({});
        let design = Design::from_json(&value.to_string()).unwrap();
        assert_eq!(to_structurizr_dsl(&design), NO_DESIGN_NODE);
    }
}
