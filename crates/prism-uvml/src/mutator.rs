//! Mutators: property assignments applied after an element is constructed
//!
//! Every mutator supports two call styles. `mutate` computes its value and
//! applies it in one go. `instantiate_value` followed by `mutate_with_value`
//! lets a caller compute a value once and apply it later, or to several
//! targets, without evaluating the value node again.

use crate::context::UvmlInstantiationContext;
use crate::node::{InstantiateNode, UvmlNode};
use prism_core::config::InvalidTargetPolicy;
use prism_core::element::ElementId;
use prism_core::error::{PrismError, Result};
use prism_core::logging::LogCategory;
use prism_core::property::PropertyId;
use prism_core::tree::ElementTree;
use prism_core::value::{Value, ValueKind};
use prism_core::{prism_debug, prism_warn};
use std::sync::Arc;

/// What a mutator did with its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied,
    /// The target could not take the value and the mutator stepped aside
    Skipped,
}

/// Writes the local value of a dependency property
#[derive(Debug, Clone)]
pub struct DependencyPropertyValueMutator {
    pub property: PropertyId,
    pub name: String,
    pub kind: ValueKind,
    pub value: UvmlNode,
}

impl DependencyPropertyValueMutator {
    pub fn new(property: PropertyId, name: impl Into<String>, kind: ValueKind, value: UvmlNode) -> Self {
        Self {
            property,
            name: name.into(),
            kind,
            value,
        }
    }

    pub fn instantiate_value(
        &self,
        tree: &mut ElementTree,
        target: ElementId,
        context: &mut UvmlInstantiationContext<'_>,
    ) -> Result<Value> {
        self.value.instantiate(tree, target, self.kind, context)
    }

    /// Apply a value computed earlier. Plain targets are skipped.
    pub fn mutate_with_value(
        &self,
        tree: &mut ElementTree,
        target: ElementId,
        value: Value,
        _context: &mut UvmlInstantiationContext<'_>,
    ) -> Result<MutationOutcome> {
        if !tree.element(target)?.is_dependency_object() {
            return Ok(self.skip(tree, target));
        }

        tree.set_value(target, self.property, value)?;
        Ok(MutationOutcome::Applied)
    }

    /// Compute and apply the value. Plain targets are skipped before the
    /// value node runs, so nothing it would create is left behind.
    pub fn mutate(
        &self,
        tree: &mut ElementTree,
        target: ElementId,
        context: &mut UvmlInstantiationContext<'_>,
    ) -> Result<MutationOutcome> {
        if !tree.element(target)?.is_dependency_object() {
            return Ok(self.skip(tree, target));
        }

        let value = self.instantiate_value(tree, target, context)?;
        self.mutate_with_value(tree, target, value, context)
    }

    fn skip(&self, tree: &ElementTree, target: ElementId) -> MutationOutcome {
        prism_debug!(
            LogCategory::Uvml,
            "Skipping dependency property '{}' on plain {} element",
            self.name,
            tree.class_name(target)
        );
        MutationOutcome::Skipped
    }
}

/// Writes a standard property through the class accessor table
#[derive(Debug, Clone)]
pub struct StandardPropertyValueMutator {
    pub name: String,
    pub kind: ValueKind,
    pub value: UvmlNode,
}

impl StandardPropertyValueMutator {
    pub fn new(name: impl Into<String>, kind: ValueKind, value: UvmlNode) -> Self {
        Self {
            name: name.into(),
            kind,
            value,
        }
    }

    pub fn instantiate_value(
        &self,
        tree: &mut ElementTree,
        target: ElementId,
        context: &mut UvmlInstantiationContext<'_>,
    ) -> Result<Value> {
        self.value.instantiate(tree, target, self.kind, context)
    }

    /// Apply a value computed earlier.
    ///
    /// A missing or read-only property fails with `InvalidTarget` unless the
    /// environment's policy says to skip it.
    pub fn mutate_with_value(
        &self,
        tree: &mut ElementTree,
        target: ElementId,
        value: Value,
        context: &mut UvmlInstantiationContext<'_>,
    ) -> Result<MutationOutcome> {
        match tree.set_standard_property(target, &self.name, value) {
            Ok(()) => Ok(MutationOutcome::Applied),
            Err(err @ PrismError::InvalidTarget { .. })
                if context.env().config.invalid_target_policy == InvalidTargetPolicy::Skip =>
            {
                prism_warn!(LogCategory::Uvml, "Skipping mutator: {}", err);
                Ok(MutationOutcome::Skipped)
            }
            Err(err) => Err(err),
        }
    }

    pub fn mutate(
        &self,
        tree: &mut ElementTree,
        target: ElementId,
        context: &mut UvmlInstantiationContext<'_>,
    ) -> Result<MutationOutcome> {
        let value = self.instantiate_value(tree, target, context)?;
        self.mutate_with_value(tree, target, value, context)
    }
}

/// Instantiates a nested element and attaches it as a logical child
#[derive(Debug, Clone)]
pub struct ChildMutator {
    pub node: Arc<InstantiateNode>,
}

impl ChildMutator {
    pub fn new(node: InstantiateNode) -> Self {
        Self { node: Arc::new(node) }
    }

    pub fn instantiate_value(
        &self,
        tree: &mut ElementTree,
        _target: ElementId,
        context: &mut UvmlInstantiationContext<'_>,
    ) -> Result<Value> {
        self.node.instantiate(tree, context).map(Value::Element)
    }

    pub fn mutate_with_value(
        &self,
        tree: &mut ElementTree,
        target: ElementId,
        value: Value,
        _context: &mut UvmlInstantiationContext<'_>,
    ) -> Result<MutationOutcome> {
        let child = value.as_element().ok_or_else(|| {
            PrismError::type_mismatch(&self.node.type_name, "element", value.type_name())
        })?;
        tree.attach_child(target, child)?;
        Ok(MutationOutcome::Applied)
    }

    pub fn mutate(
        &self,
        tree: &mut ElementTree,
        target: ElementId,
        context: &mut UvmlInstantiationContext<'_>,
    ) -> Result<MutationOutcome> {
        let value = self.instantiate_value(tree, target, context)?;
        self.mutate_with_value(tree, target, value, context)
    }
}

/// Closed set of mutator kinds
#[derive(Debug, Clone)]
pub enum Mutator {
    DependencyProperty(DependencyPropertyValueMutator),
    StandardProperty(StandardPropertyValueMutator),
    Child(ChildMutator),
}

impl Mutator {
    /// Property (or child type) this mutator writes, for diagnostics
    pub fn target_name(&self) -> &str {
        match self {
            Mutator::DependencyProperty(m) => &m.name,
            Mutator::StandardProperty(m) => &m.name,
            Mutator::Child(m) => &m.node.type_name,
        }
    }

    pub fn instantiate_value(
        &self,
        tree: &mut ElementTree,
        target: ElementId,
        context: &mut UvmlInstantiationContext<'_>,
    ) -> Result<Value> {
        match self {
            Mutator::DependencyProperty(m) => m.instantiate_value(tree, target, context),
            Mutator::StandardProperty(m) => m.instantiate_value(tree, target, context),
            Mutator::Child(m) => m.instantiate_value(tree, target, context),
        }
    }

    pub fn mutate_with_value(
        &self,
        tree: &mut ElementTree,
        target: ElementId,
        value: Value,
        context: &mut UvmlInstantiationContext<'_>,
    ) -> Result<MutationOutcome> {
        match self {
            Mutator::DependencyProperty(m) => m.mutate_with_value(tree, target, value, context),
            Mutator::StandardProperty(m) => m.mutate_with_value(tree, target, value, context),
            Mutator::Child(m) => m.mutate_with_value(tree, target, value, context),
        }
    }

    pub fn mutate(
        &self,
        tree: &mut ElementTree,
        target: ElementId,
        context: &mut UvmlInstantiationContext<'_>,
    ) -> Result<MutationOutcome> {
        match self {
            Mutator::DependencyProperty(m) => m.mutate(tree, target, context),
            Mutator::StandardProperty(m) => m.mutate(tree, target, context),
            Mutator::Child(m) => m.mutate(tree, target, context),
        }
    }

    /// Instantiate nodes this mutator would create
    pub(crate) fn nested(&self) -> Option<&InstantiateNode> {
        match self {
            Mutator::DependencyProperty(m) => m.value.nested(),
            Mutator::StandardProperty(m) => m.value.nested(),
            Mutator::Child(m) => Some(&*m.node),
        }
    }
}

impl From<DependencyPropertyValueMutator> for Mutator {
    fn from(m: DependencyPropertyValueMutator) -> Self {
        Mutator::DependencyProperty(m)
    }
}

impl From<StandardPropertyValueMutator> for Mutator {
    fn from(m: StandardPropertyValueMutator) -> Self {
        Mutator::StandardProperty(m)
    }
}

impl From<ChildMutator> for Mutator {
    fn from(m: ChildMutator) -> Self {
        Mutator::Child(m)
    }
}
