//! Compiled UVML node graph
//!
//! Nodes are immutable once compiled and may be instantiated any number of
//! times; all per-instantiation state lives in the
//! [`UvmlInstantiationContext`].

use crate::context::UvmlInstantiationContext;
use crate::expression::{BindingExpression, ExpressionScope};
use crate::mutator::Mutator;
use prism_core::class::ClassId;
use prism_core::element::ElementId;
use prism_core::error::{ErrorContext, PrismError, Result};
use prism_core::tree::ElementTree;
use prism_core::value::{Value, ValueKind};
use std::sync::Arc;

/// Node producing a property value
#[derive(Debug, Clone)]
pub enum UvmlNode {
    /// Already typed value
    Literal(Value),
    /// Markup text converted to the target kind using the context culture
    LiteralText(String),
    /// Current value of a compiled binding expression
    Binding(BindingExpression),
    /// A freshly instantiated element
    Instantiate(Arc<InstantiateNode>),
    /// An element registered earlier in the same instantiation under this name
    ElementReference(String),
}

impl UvmlNode {
    /// Compute the value this node stands for.
    ///
    /// `target` is the element the value is meant for and `kind` the declared
    /// kind of the receiving property.
    pub fn instantiate(
        &self,
        tree: &mut ElementTree,
        target: ElementId,
        kind: ValueKind,
        context: &mut UvmlInstantiationContext<'_>,
    ) -> Result<Value> {
        match self {
            UvmlNode::Literal(value) => Ok(value.clone()),
            UvmlNode::LiteralText(text) => {
                Value::parse(kind, text, context.culture()).ok_or_else(|| {
                    PrismError::type_mismatch(
                        format!("'{}'", text),
                        kind.as_str(),
                        format!("text in culture '{}'", context.culture().name),
                    )
                })
            }
            UvmlNode::Binding(expression) => {
                let scope = ExpressionScope {
                    tree: &*tree,
                    target,
                    view_model: context.view_model(),
                };
                context.env().expressions.evaluate(expression, &scope)
            }
            UvmlNode::Instantiate(node) => node.instantiate(tree, context).map(Value::Element),
            UvmlNode::ElementReference(name) => context
                .find_name(name)
                .map(Value::Element)
                .ok_or_else(|| {
                    PrismError::template(format!(
                        "'{}' does not name an element created earlier in this template",
                        name
                    ))
                }),
        }
    }

    /// Nested instantiate nodes reachable from this value
    pub(crate) fn nested(&self) -> Option<&InstantiateNode> {
        match self {
            UvmlNode::Instantiate(node) => Some(&**node),
            _ => None,
        }
    }
}

/// Node constructing one element and applying its mutators in declared order
#[derive(Debug, Clone)]
pub struct InstantiateNode {
    pub type_name: String,
    /// Class resolved for `type_name` when the template was compiled
    pub class: Option<ClassId>,
    pub name: Option<String>,
    pub args: Vec<Value>,
    pub mutators: Vec<Mutator>,
}

impl InstantiateNode {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            class: None,
            name: None,
            args: Vec::new(),
            mutators: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn mutator(mut self, mutator: impl Into<Mutator>) -> Self {
        self.mutators.push(mutator.into());
        self
    }

    /// Construct the element, register its name, then run every mutator in order.
    ///
    /// The element is recorded in `context` as soon as it exists, so a failure
    /// anywhere below leaves it for the caller to roll back.
    pub fn instantiate(
        &self,
        tree: &mut ElementTree,
        context: &mut UvmlInstantiationContext<'_>,
    ) -> Result<ElementId> {
        let entry = context.env().factories.lookup(&self.type_name)?;
        if let Some(class) = self.class {
            if class != entry.class {
                return Err(PrismError::template(format!(
                    "'{}' was compiled as {:?} but is now registered as {:?}",
                    self.type_name, class, entry.class
                )));
            }
        }

        let state = entry.create(&self.args)?;
        let element = tree.create_with_state(entry.class, state)?;
        context.record_created(element);

        if let Some(name) = &self.name {
            tree.set_name(element, Some(name.clone()))?;
            context.register_name(name, element)?;
        }

        for mutator in &self.mutators {
            if let Err(err) = mutator.mutate(tree, element, context) {
                if err.context().is_some() {
                    return Err(err);
                }
                return Err(err.with_context(
                    ErrorContext::new("mutate", "uvml")
                        .with_metadata("type", self.type_name.as_str())
                        .with_metadata("property", mutator.target_name()),
                ));
            }
        }

        tracing::trace!(type_name = %self.type_name, ?element, "Instantiated element");
        Ok(element)
    }

    /// This node and every instantiate node below it, parent first
    pub fn walk(&self) -> Vec<&InstantiateNode> {
        let mut out = vec![self];
        let mut index = 0;
        while index < out.len() {
            let node = out[index];
            out.extend(node.mutators.iter().filter_map(Mutator::nested));
            index += 1;
        }
        out
    }
}
