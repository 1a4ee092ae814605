//! Typed element handles and capability traits.
//!
//! # Responsibility
//! - Give callers phantom-typed references to elements they created.
//! - Expose fluent builder capabilities per element kind.
//!
//! # Invariants
//! - Typed refs other than `ElementRef<kinds::Any>` are only produced by
//!   design factories, so their kind matches the registry entry.
//! - Builders hold the design borrow; `finish()` releases it.

use crate::model::design::Design;
use crate::model::node::Node;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;

/// Kind markers used as type parameters of `ElementRef` and `ElementBuilder`.
pub mod kinds {
    mod sealed {
        pub trait Sealed {}
    }

    /// Marker trait implemented by every element kind marker.
    pub trait ElementKind: sealed::Sealed {
        const KIND_NAME: &'static str;
    }

    /// Kinds that may own custom elements.
    pub trait CustomParent: ElementKind {}

    /// Kinds that can be the target of `used_by`.
    pub trait UsedByTarget: ElementKind {}

    macro_rules! element_kind {
        ($($name:ident => $label:literal),* $(,)?) => {
            $(
                #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
                pub struct $name;

                impl sealed::Sealed for $name {}

                impl ElementKind for $name {
                    const KIND_NAME: &'static str = $label;
                }
            )*
        };
    }

    element_kind! {
        Person => "Person",
        System => "System",
        Container => "Container",
        Component => "Component",
        Custom => "Custom",
        Any => "Any",
    }

    impl CustomParent for Container {}
    impl CustomParent for Component {}
    impl CustomParent for Custom {}

    impl UsedByTarget for System {}
    impl UsedByTarget for Container {}
    impl UsedByTarget for Component {}
    impl UsedByTarget for Custom {}
}

use kinds::{ElementKind, UsedByTarget};

/// Anything that names one element by full hierarchical ID.
pub trait Element {
    fn full_id(&self) -> &str;
}

impl Element for Node {
    fn full_id(&self) -> &str {
        &self.full_id
    }
}

impl<T: Element + ?Sized> Element for &T {
    fn full_id(&self) -> &str {
        (**self).full_id()
    }
}

/// Phantom-typed reference to one element of a design.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef<K> {
    full_id: String,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ElementKind> ElementRef<K> {
    pub(crate) fn new(full_id: impl Into<String>) -> Self {
        Self {
            full_id: full_id.into(),
            _kind: PhantomData,
        }
    }

    pub fn full_id(&self) -> &str {
        &self.full_id
    }
}

impl<K: ElementKind> Element for ElementRef<K> {
    fn full_id(&self) -> &str {
        &self.full_id
    }
}

impl<K> Display for ElementRef<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full_id)
    }
}

/// Tag, label and boundary metadata.
pub trait Taggable: Sized {
    fn tag(self, tag: &str) -> Self;
    fn label(self, label: &str) -> Self;
    fn external(self) -> Self;
    fn internal(self) -> Self;
}

/// Declares that this element uses `target`.
pub trait CanUse: Sized {
    fn uses<T: Element + ?Sized>(self, target: &T, description: &str) -> Self;
}

/// Declares that `actor` uses this element.
pub trait CanBeUsedBy: Sized {
    fn used_by<T: Element + ?Sized>(self, actor: &T, description: &str) -> Self;
}

/// Person-to-person interaction.
pub trait InteractsWith: Sized {
    fn interacts_with(self, other: &ElementRef<kinds::Person>, description: &str) -> Self;
}

/// Fluent builder returned by design factories.
pub struct ElementBuilder<'d, K: ElementKind> {
    design: &'d mut Design,
    element: ElementRef<K>,
}

impl<'d, K: ElementKind> ElementBuilder<'d, K> {
    pub(crate) fn new(design: &'d mut Design, full_id: impl Into<String>) -> Self {
        Self {
            design,
            element: ElementRef::new(full_id),
        }
    }

    /// Releases the design borrow and returns the typed reference.
    pub fn finish(self) -> ElementRef<K> {
        self.element
    }
}

impl<K: ElementKind> Element for ElementBuilder<'_, K> {
    fn full_id(&self) -> &str {
        self.element.full_id()
    }
}

impl<K: ElementKind> Taggable for ElementBuilder<'_, K> {
    fn tag(self, tag: &str) -> Self {
        self.design.tag(&self.element, tag);
        self
    }

    fn label(self, label: &str) -> Self {
        self.design.add_label(&self.element, label);
        self
    }

    fn external(self) -> Self {
        self.design.set_external(&self.element, true);
        self
    }

    fn internal(self) -> Self {
        self.design.set_external(&self.element, false);
        self
    }
}

impl<K: ElementKind> CanUse for ElementBuilder<'_, K> {
    fn uses<T: Element + ?Sized>(self, target: &T, description: &str) -> Self {
        self.design.uses(&self.element, target, description);
        self
    }
}

impl<K: UsedByTarget> CanBeUsedBy for ElementBuilder<'_, K> {
    fn used_by<T: Element + ?Sized>(self, actor: &T, description: &str) -> Self {
        self.design.used_by(&self.element, actor, description);
        self
    }
}

impl InteractsWith for ElementBuilder<'_, kinds::Person> {
    fn interacts_with(self, other: &ElementRef<kinds::Person>, description: &str) -> Self {
        self.design.interacts_with(&self.element, other, description);
        self
    }
}

impl ElementBuilder<'_, kinds::System> {
    /// Records an explicit implied-use edge from this system.
    pub fn implied_use<T: Element + ?Sized>(self, target: &T, description: &str) -> Self {
        self.design.implied_use(&self.element, target, description);
        self
    }

    /// Records an explicit implied-use edge from `actor` to this system.
    pub fn implied_used_by<T: Element + ?Sized>(self, actor: &T, description: &str) -> Self {
        self.design.implied_used_by(&self.element, actor, description);
        self
    }
}
