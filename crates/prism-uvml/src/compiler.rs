//! Compiles UVML markup into templates
//!
//! Every type name and attribute is resolved here, once, so instantiation never
//! looks anything up by name except factories and namescope references.

use crate::factory::FactoryRegistry;
use crate::markup::{AttributeValue, UvmlElement};
use crate::mutator::{ChildMutator, DependencyPropertyValueMutator, Mutator, StandardPropertyValueMutator};
use crate::node::{InstantiateNode, UvmlNode};
use crate::template::UvmlTemplate;
use prism_core::class::ClassId;
use prism_core::error::{ErrorContext, PrismError, Result};
use prism_core::property::PropertyRegistry;

/// Resolves markup against a property registry and a factory registry
pub struct UvmlCompiler<'a> {
    registry: &'a PropertyRegistry,
    factories: &'a FactoryRegistry,
}

impl<'a> UvmlCompiler<'a> {
    pub fn new(registry: &'a PropertyRegistry, factories: &'a FactoryRegistry) -> Self {
        Self {
            registry,
            factories,
        }
    }

    /// Compile `markup` into a template
    pub fn compile(&self, markup: &UvmlElement) -> Result<UvmlTemplate> {
        let root = self.compile_element(markup, &markup.type_name)?;
        tracing::debug!(root = %markup.type_name, "Compiled UVML template");
        Ok(UvmlTemplate::new(root))
    }

    fn compile_element(&self, element: &UvmlElement, path: &str) -> Result<InstantiateNode> {
        let annotate = |err: PrismError| {
            if err.context().is_some() {
                err
            } else {
                err.with_context(ErrorContext::new("compile", "uvml").with_call_path(path))
            }
        };

        let class = self.factories.lookup(&element.type_name).map_err(&annotate)?.class;

        let mut node = InstantiateNode::new(&element.type_name);
        node.class = Some(class);
        node.name = element.name.clone();
        node.args = element.args.clone();

        for (name, value) in &element.attributes {
            let mutator = self.compile_attribute(class, name, value).map_err(&annotate)?;
            node.mutators.push(mutator);
        }

        for child in &element.children {
            let child_path = format!("{}/{}", path, child.type_name);
            let child = self.compile_element(child, &child_path)?;
            node.mutators.push(ChildMutator::new(child).into());
        }

        Ok(node)
    }

    /// Dependency property first, then a standard property, else `PropertyNotFound`
    fn compile_attribute(&self, class: ClassId, name: &str, value: &AttributeValue) -> Result<Mutator> {
        let value = Self::value_node(value);

        if let Ok(property) = self.registry.resolve_qualified(name, class) {
            let kind = self
                .registry
                .definition(property)
                .map(|definition| definition.kind)
                .ok_or_else(|| PrismError::property_not_found(name, self.registry.classes().name(class)))?;
            return Ok(DependencyPropertyValueMutator::new(property, name, kind, value).into());
        }

        if let Some(standard) = self.registry.classes().find_standard_property(class, name) {
            return Ok(StandardPropertyValueMutator::new(name, standard.kind, value).into());
        }

        Err(PrismError::property_not_found(
            name,
            self.registry.classes().name(class),
        ))
    }

    fn value_node(value: &AttributeValue) -> UvmlNode {
        match value {
            AttributeValue::Text(text) => UvmlNode::LiteralText(text.clone()),
            AttributeValue::Value(value) => UvmlNode::Literal(value.clone()),
            AttributeValue::Binding(binding) => UvmlNode::Binding(binding.clone()),
            AttributeValue::Reference(name) => UvmlNode::ElementReference(name.clone()),
        }
    }
}
