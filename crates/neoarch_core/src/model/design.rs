//! Design aggregate: node registry, relationship ledger and inference.
//!
//! # Responsibility
//! - Own every element record of one architecture model.
//! - Create elements under their intended parent and record containment.
//! - Record explicit relationships and the implied-use edges they entail.
//!
//! # Invariants
//! - The root node ID is `"design_" + name`.
//! - Every non-root node has exactly one BELONGS_TO edge to its parent.
//! - Registry iteration is ascending by full ID.
//! - Creating an element whose full ID already exists is rejected.

use crate::model::element::{kinds, Element, ElementBuilder, ElementRef};
use crate::model::kind::{NodeKind, RelationshipKind};
use crate::model::ledger::{Ledger, Relationship};
use crate::model::node::{is_valid_local_id, Node};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Prefix of every design root ID.
pub const DESIGN_ID_PREFIX: &str = "design_";
/// Prefix of person local IDs derived from names.
pub const PERSON_ID_PREFIX: &str = "person_";

const BELONGS_TO_DESCRIPTION: &str = "Belongs to";
const PART_OF_DESCRIPTION: &str = "Is part of";

pub type DesignResult<T> = Result<T, DesignError>;

/// Errors raised while building a design.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesignError {
    /// An element with this full ID already exists.
    DuplicateId(String),
    /// Local ID is blank or contains the hierarchy separator.
    InvalidId(String),
    /// Parent full ID is not in the registry.
    UnknownParent(String),
    /// Parent exists but cannot own an element of the requested kind.
    InvalidParentKind {
        parent_id: String,
        parent_kind: String,
        child_kind: &'static str,
    },
}

impl Display for DesignError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateId(id) => write!(f, "element already exists: {id}"),
            Self::InvalidId(id) => write!(
                f,
                "invalid local id `{id}`: must be non-blank and must not contain `.`"
            ),
            Self::UnknownParent(id) => write!(f, "parent element not found: {id}"),
            Self::InvalidParentKind {
                parent_id,
                parent_kind,
                child_kind,
            } => write!(
                f,
                "{parent_kind} `{parent_id}` cannot contain a {child_kind}"
            ),
        }
    }
}

impl Error for DesignError {}

/// Per-design behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignOptions {
    /// Records IMPLIED_USE edges when enabled.
    pub implied_use: bool,
}

impl Default for DesignOptions {
    fn default() -> Self {
        Self { implied_use: true }
    }
}

/// Root aggregate of one architecture model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Design {
    id: String,
    name: String,
    description: String,
    #[serde(default)]
    options: DesignOptions,
    #[serde(default)]
    nodes: BTreeMap<String, Node>,
    #[serde(default)]
    relationships: Ledger,
}

impl Design {
    /// Creates a design with default options (implied use enabled).
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::with_options(name, description, DesignOptions::default())
    }

    pub fn with_options(
        name: impl Into<String>,
        description: impl Into<String>,
        options: DesignOptions,
    ) -> Self {
        let name = name.into();
        let description = description.into();
        let id = format!("{DESIGN_ID_PREFIX}{name}");

        let mut root = Node::new(
            id.clone(),
            None,
            NodeKind::Design,
            name.clone(),
            description.clone(),
        );
        root.tags.push("design".to_string());

        let mut nodes = BTreeMap::new();
        nodes.insert(id.clone(), root);

        Self {
            id,
            name,
            description,
            options,
            nodes,
            relationships: Ledger::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn options(&self) -> DesignOptions {
        self.options
    }

    /// Enables or disables implied-use recording for subsequent calls.
    pub fn enable_implied_use(&mut self, enable: bool) {
        self.options.implied_use = enable;
    }

    pub fn implied_use_enabled(&self) -> bool {
        self.options.implied_use
    }

    /// Returns the single Design-kind node, if present.
    pub fn root(&self) -> Option<&Node> {
        match self.nodes.get(&self.id) {
            Some(node) if node.kind == NodeKind::Design => Some(node),
            _ => self.nodes.values().find(|node| node.kind == NodeKind::Design),
        }
    }

    /// Returns the root as a typed reference usable in relationships.
    pub fn root_ref(&self) -> ElementRef<kinds::Any> {
        ElementRef::new(self.id.clone())
    }

    pub fn node(&self, full_id: &str) -> Option<&Node> {
        self.nodes.get(full_id)
    }

    pub fn contains(&self, full_id: &str) -> bool {
        self.nodes.contains_key(full_id)
    }

    /// Iterates nodes in ascending full-ID order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relationships(&self) -> &Ledger {
        &self.relationships
    }

    /// Lists direct children in containment-edge order.
    pub fn children(&self, parent_id: &str) -> Vec<&Node> {
        self.relationships
            .of_kind(RelationshipKind::BelongsTo)
            .filter(|rel| rel.end_id == parent_id)
            .filter_map(|rel| self.nodes.get(&rel.start_id))
            .collect()
    }

    /// Walks up from `full_id` (inclusive) to the first System.
    pub fn owning_system(&self, full_id: &str) -> Option<&Node> {
        let mut current = self.nodes.get(full_id)?;
        loop {
            if current.kind == NodeKind::System {
                return Some(current);
            }
            current = self.nodes.get(current.parent.as_deref()?)?;
        }
    }

    /// References an element by full ID without requiring it to exist.
    ///
    /// Unresolvable references are materialized as `Unknown` stub nodes.
    pub fn reference(&self, full_id: impl Into<String>) -> ElementRef<kinds::Any> {
        ElementRef::new(full_id)
    }

    /// Adds a person under the root with local ID `"person_" + name`.
    pub fn person(
        &mut self,
        name: &str,
        description: &str,
    ) -> DesignResult<ElementBuilder<'_, kinds::Person>> {
        let id = format!("{PERSON_ID_PREFIX}{name}");
        self.person_with_id(&id, name, description)
    }

    pub fn person_with_id(
        &mut self,
        id: &str,
        name: &str,
        description: &str,
    ) -> DesignResult<ElementBuilder<'_, kinds::Person>> {
        let parent_id = self.id.clone();
        let full_id = self.attach(
            &parent_id,
            id,
            NodeKind::Person,
            name,
            description,
            BELONGS_TO_DESCRIPTION,
            |kind| *kind == NodeKind::Design,
        )?;
        Ok(ElementBuilder::new(self, full_id))
    }

    /// Adds a system under the root with local ID = name.
    pub fn system(
        &mut self,
        name: &str,
        description: &str,
    ) -> DesignResult<ElementBuilder<'_, kinds::System>> {
        self.system_with_id(name, name, description)
    }

    pub fn system_with_id(
        &mut self,
        id: &str,
        name: &str,
        description: &str,
    ) -> DesignResult<ElementBuilder<'_, kinds::System>> {
        let parent_id = self.id.clone();
        let full_id = self.attach(
            &parent_id,
            id,
            NodeKind::System,
            name,
            description,
            BELONGS_TO_DESCRIPTION,
            |kind| *kind == NodeKind::Design,
        )?;
        Ok(ElementBuilder::new(self, full_id))
    }

    pub fn container(
        &mut self,
        system: &ElementRef<kinds::System>,
        name: &str,
        description: &str,
    ) -> DesignResult<ElementBuilder<'_, kinds::Container>> {
        self.container_with_id(system, name, name, description)
    }

    pub fn container_with_id(
        &mut self,
        system: &ElementRef<kinds::System>,
        id: &str,
        name: &str,
        description: &str,
    ) -> DesignResult<ElementBuilder<'_, kinds::Container>> {
        let full_id = self.attach(
            system.full_id(),
            id,
            NodeKind::Container,
            name,
            description,
            PART_OF_DESCRIPTION,
            |kind| *kind == NodeKind::System,
        )?;
        Ok(ElementBuilder::new(self, full_id))
    }

    pub fn component(
        &mut self,
        container: &ElementRef<kinds::Container>,
        name: &str,
        description: &str,
    ) -> DesignResult<ElementBuilder<'_, kinds::Component>> {
        self.component_with_id(container, name, name, description)
    }

    pub fn component_with_id(
        &mut self,
        container: &ElementRef<kinds::Container>,
        id: &str,
        name: &str,
        description: &str,
    ) -> DesignResult<ElementBuilder<'_, kinds::Component>> {
        let full_id = self.attach(
            container.full_id(),
            id,
            NodeKind::Component,
            name,
            description,
            PART_OF_DESCRIPTION,
            |kind| *kind == NodeKind::Container,
        )?;
        Ok(ElementBuilder::new(self, full_id))
    }

    /// Adds a custom-labelled element under a container, component or custom element.
    pub fn custom<P: kinds::CustomParent>(
        &mut self,
        parent: &ElementRef<P>,
        label: &str,
        name: &str,
        description: &str,
    ) -> DesignResult<ElementBuilder<'_, kinds::Custom>> {
        self.custom_with_id(parent, name, label, name, description, None)
    }

    /// Like `custom`, with an explicit local ID and optional BELONGS_TO text.
    pub fn custom_with_id<P: kinds::CustomParent>(
        &mut self,
        parent: &ElementRef<P>,
        id: &str,
        label: &str,
        name: &str,
        description: &str,
        belongs_to_description: Option<&str>,
    ) -> DesignResult<ElementBuilder<'_, kinds::Custom>> {
        if !is_valid_local_id(label) {
            return Err(DesignError::InvalidId(label.to_string()));
        }
        let full_id = self.attach(
            parent.full_id(),
            id,
            NodeKind::Custom(label.to_string()),
            name,
            description,
            belongs_to_description.unwrap_or(BELONGS_TO_DESCRIPTION),
            |kind| matches!(kind, NodeKind::Container | NodeKind::Component | NodeKind::Custom(_)),
        )?;
        Ok(ElementBuilder::new(self, full_id))
    }

    #[allow(clippy::too_many_arguments)]
    fn attach(
        &mut self,
        parent_id: &str,
        id: &str,
        kind: NodeKind,
        name: &str,
        description: &str,
        belongs_to_description: &str,
        accepts_parent: impl Fn(&NodeKind) -> bool,
    ) -> DesignResult<String> {
        if !is_valid_local_id(id) {
            return Err(DesignError::InvalidId(id.to_string()));
        }
        let parent = self
            .nodes
            .get(parent_id)
            .ok_or_else(|| DesignError::UnknownParent(parent_id.to_string()))?;
        if !accepts_parent(&parent.kind) {
            return Err(DesignError::InvalidParentKind {
                parent_id: parent_id.to_string(),
                parent_kind: parent.kind.label().to_string(),
                child_kind: match kind {
                    NodeKind::Custom(_) => "custom element",
                    NodeKind::Person => "person",
                    NodeKind::System => "system",
                    NodeKind::Container => "container",
                    NodeKind::Component => "component",
                    NodeKind::Design => "design",
                },
            });
        }

        let node = Node::new(id, Some(parent), kind, name, description);
        if self.nodes.contains_key(&node.full_id) {
            warn!(
                "event=element_add module=model status=rejected reason=duplicate_id id={}",
                node.full_id
            );
            return Err(DesignError::DuplicateId(node.full_id));
        }

        let full_id = node.full_id.clone();
        debug!(
            "event=element_add module=model status=ok kind={} id={}",
            node.kind, full_id
        );
        self.relationships.record(Relationship::new(
            full_id.clone(),
            parent_id,
            RelationshipKind::BelongsTo,
            belongs_to_description,
        ));
        self.nodes.insert(full_id.clone(), node);
        Ok(full_id)
    }

    /// Records `source USES target`, lifting nested usage to system level.
    ///
    /// When `source` is a container or component inside a system, an
    /// IMPLIED_USE edge goes from that system to the target's system (or the
    /// target itself when it is not nested), unless both resolve to the same
    /// element. Custom sources are not lifted.
    pub fn uses<S, T>(&mut self, source: &S, target: &T, description: &str)
    where
        S: Element + ?Sized,
        T: Element + ?Sized,
    {
        let source_id = source.full_id();
        let target_id = target.full_id();
        self.relationships.record(Relationship::new(
            source_id,
            target_id,
            RelationshipKind::Uses,
            description,
        ));

        let Some(source_system) = self.liftable_source_system_id(source_id) else {
            return;
        };
        let implied_target = self
            .nested_owning_system_id(target_id)
            .unwrap_or_else(|| target_id.to_string());
        self.relationships.record_implied(
            self.options.implied_use,
            &source_system,
            &implied_target,
            description,
        );
    }

    /// Records `actor USES target`, plus `actor IMPLIED_USE system(target)`
    /// when the target is nested in a system.
    pub fn used_by<T, A>(&mut self, target: &T, actor: &A, description: &str)
    where
        T: Element + ?Sized,
        A: Element + ?Sized,
    {
        let target_id = target.full_id();
        let actor_id = actor.full_id();
        self.relationships.record(Relationship::new(
            actor_id,
            target_id,
            RelationshipKind::Uses,
            description,
        ));

        if let Some(system_id) = self.nested_owning_system_id(target_id) {
            self.relationships.record_implied(
                self.options.implied_use,
                actor_id,
                &system_id,
                description,
            );
        }
    }

    pub fn interacts_with(
        &mut self,
        person: &ElementRef<kinds::Person>,
        other: &ElementRef<kinds::Person>,
        description: &str,
    ) {
        self.relationships.record(Relationship::new(
            person.full_id(),
            other.full_id(),
            RelationshipKind::InteractsWith,
            description,
        ));
    }

    /// Records `system IMPLIED_USE target` directly. Returns whether recorded.
    pub fn implied_use<T: Element + ?Sized>(
        &mut self,
        system: &ElementRef<kinds::System>,
        target: &T,
        description: &str,
    ) -> bool {
        self.relationships.record_implied(
            self.options.implied_use,
            system.full_id(),
            target.full_id(),
            description,
        )
    }

    /// Records `actor IMPLIED_USE system` directly. Returns whether recorded.
    pub fn implied_used_by<A: Element + ?Sized>(
        &mut self,
        system: &ElementRef<kinds::System>,
        actor: &A,
        description: &str,
    ) -> bool {
        self.relationships.record_implied(
            self.options.implied_use,
            actor.full_id(),
            system.full_id(),
            description,
        )
    }

    fn liftable_source_system_id(&self, full_id: &str) -> Option<String> {
        let node = self.nodes.get(full_id)?;
        if !matches!(node.kind, NodeKind::Container | NodeKind::Component) {
            return None;
        }
        self.owning_system(full_id)
            .map(|system| system.full_id.clone())
    }

    fn nested_owning_system_id(&self, full_id: &str) -> Option<String> {
        let node = self.nodes.get(full_id)?;
        if !node.kind.is_nested() {
            return None;
        }
        self.owning_system(full_id)
            .map(|system| system.full_id.clone())
    }

    /// Appends a tag. Returns `false` when the element is not in the registry.
    pub fn tag<E: Element + ?Sized>(&mut self, element: &E, tag: &str) -> bool {
        self.with_node(element, |node| node.tags.push(tag.to_string()))
    }

    /// Appends an extra store label.
    pub fn add_label<E: Element + ?Sized>(&mut self, element: &E, label: &str) -> bool {
        self.with_node(element, |node| node.labels.push(label.to_string()))
    }

    pub fn set_external<E: Element + ?Sized>(&mut self, element: &E, external: bool) -> bool {
        self.with_node(element, |node| node.external = external)
    }

    fn with_node<E: Element + ?Sized>(&mut self, element: &E, apply: impl FnOnce(&mut Node)) -> bool {
        match self.nodes.get_mut(element.full_id()) {
            Some(node) => {
                apply(node);
                true
            }
            None => false,
        }
    }

    /// Serializes the whole design as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(value: &str) -> serde_json::Result<Self> {
        serde_json::from_str(value)
    }
}
