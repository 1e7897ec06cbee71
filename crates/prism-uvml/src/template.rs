//! Compiled, reusable UVML templates

use crate::context::{UvmlEnvironment, UvmlInstantiationContext};
use crate::node::InstantiateNode;
use prism_core::element::ElementId;
use prism_core::error::{ErrorContext, PrismError, Result};
use prism_core::tree::ElementTree;
use std::any::Any;
use std::sync::Arc;

/// A compiled template. Cheap to clone and safe to instantiate repeatedly.
#[derive(Debug, Clone)]
pub struct UvmlTemplate {
    root: Arc<InstantiateNode>,
}

impl UvmlTemplate {
    pub fn new(root: InstantiateNode) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    pub fn root(&self) -> &InstantiateNode {
        &self.root
    }

    /// Check every type name against the factory registry
    pub fn validate(&self, env: &UvmlEnvironment) -> Result<()> {
        for node in self.root.walk() {
            if !env.factories.contains(&node.type_name) {
                return Err(PrismError::unknown_type(&node.type_name).with_context(
                    ErrorContext::new("validate", "uvml").with_metadata("root", self.root.type_name.as_str()),
                ));
            }
        }
        Ok(())
    }

    /// Instantiate the template with a fresh context
    pub fn instantiate(
        &self,
        tree: &mut ElementTree,
        env: &UvmlEnvironment,
        view_model: Option<Arc<dyn Any + Send + Sync>>,
    ) -> Result<ElementId> {
        let mut context = UvmlInstantiationContext::new(env).with_view_model(view_model);
        self.instantiate_in(tree, &mut context)
    }

    /// Instantiate the template using a caller-built context.
    ///
    /// Either the whole element graph is built or none of it is: on failure
    /// every element created by this call is removed from `tree` before the
    /// error is returned.
    pub fn instantiate_in(
        &self,
        tree: &mut ElementTree,
        context: &mut UvmlInstantiationContext<'_>,
    ) -> Result<ElementId> {
        if context.env().config.validate_templates {
            self.validate(context.env())?;
        }

        match self.root.instantiate(tree, context) {
            Ok(root) => {
                let created = context.take_created();
                tracing::debug!(
                    template = %self.root.type_name,
                    elements = created.len(),
                    "Template instantiated"
                );
                Ok(root)
            }
            Err(err) => {
                let created = context.take_created();
                context.forget_names(&created);
                for element in created.iter().rev() {
                    if tree.contains(*element) {
                        tree.remove(*element)?;
                    }
                }
                tracing::warn!(
                    template = %self.root.type_name,
                    rolled_back = created.len(),
                    "Template instantiation failed: {}",
                    err.format_for_log()
                );
                Err(err)
            }
        }
    }
}
