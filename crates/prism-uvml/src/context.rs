//! Instantiation environment and per-instantiation context

use crate::expression::{CompiledExpressionTable, ExpressionSource};
use crate::factory::FactoryRegistry;
use prism_core::config::{get_config_manager, InstantiationConfig};
use prism_core::element::ElementId;
use prism_core::error::{PrismError, Result};
use prism_core::value::Culture;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Everything templates are instantiated against. Built once and shared.
#[derive(Clone)]
pub struct UvmlEnvironment {
    pub factories: Arc<FactoryRegistry>,
    pub expressions: Arc<dyn ExpressionSource>,
    pub config: InstantiationConfig,
    /// Culture used when no other one is given to an instantiation
    pub culture: Culture,
}

impl UvmlEnvironment {
    /// Environment with an empty expression table and the global instantiation config
    pub fn new(factories: Arc<FactoryRegistry>) -> Self {
        Self {
            factories,
            expressions: Arc::new(CompiledExpressionTable::new()),
            config: get_config_manager()
                .map(|manager| manager.get_instantiation_config())
                .unwrap_or_default(),
            culture: Culture::invariant(),
        }
    }

    pub fn with_expressions(mut self, expressions: Arc<dyn ExpressionSource>) -> Self {
        self.expressions = expressions;
        self
    }

    pub fn with_config(mut self, config: InstantiationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_culture(mut self, culture: Culture) -> Self {
        self.culture = culture;
        self
    }
}

impl fmt::Debug for UvmlEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UvmlEnvironment")
            .field("factories", &self.factories)
            .field("config", &self.config)
            .field("culture", &self.culture)
            .finish()
    }
}

/// Mutable state of one template instantiation.
///
/// Created fresh for every instantiation and dropped afterwards. Every element
/// created through the context is recorded so a failed instantiation can
/// remove all of them.
pub struct UvmlInstantiationContext<'env> {
    env: &'env UvmlEnvironment,
    culture: Culture,
    view_model: Option<Arc<dyn Any + Send + Sync>>,
    namescope: HashMap<String, ElementId>,
    created: Vec<ElementId>,
}

impl<'env> UvmlInstantiationContext<'env> {
    pub fn new(env: &'env UvmlEnvironment) -> Self {
        Self {
            env,
            culture: env.culture.clone(),
            view_model: None,
            namescope: HashMap::new(),
            created: Vec::new(),
        }
    }

    pub fn with_view_model(mut self, view_model: Option<Arc<dyn Any + Send + Sync>>) -> Self {
        self.view_model = view_model;
        self
    }

    pub fn with_culture(mut self, culture: Culture) -> Self {
        self.culture = culture;
        self
    }

    pub fn env(&self) -> &'env UvmlEnvironment {
        self.env
    }

    pub fn culture(&self) -> &Culture {
        &self.culture
    }

    pub fn view_model(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.view_model.as_deref()
    }

    /// Register a named element. Names are unique within one instantiation.
    pub fn register_name(&mut self, name: &str, element: ElementId) -> Result<()> {
        if self.namescope.contains_key(name) {
            return Err(PrismError::template(format!(
                "The name '{}' is already used in this template",
                name
            )));
        }
        self.namescope.insert(name.to_string(), element);
        Ok(())
    }

    pub fn find_name(&self, name: &str) -> Option<ElementId> {
        self.namescope.get(name).copied()
    }

    pub fn namescope(&self) -> &HashMap<String, ElementId> {
        &self.namescope
    }

    /// Drop names registered for `elements`
    pub(crate) fn forget_names(&mut self, elements: &[ElementId]) {
        self.namescope.retain(|_, element| !elements.contains(element));
    }

    pub(crate) fn record_created(&mut self, element: ElementId) {
        self.created.push(element);
    }

    /// Elements created so far, in creation order
    pub fn created(&self) -> &[ElementId] {
        &self.created
    }

    pub(crate) fn take_created(&mut self) -> Vec<ElementId> {
        std::mem::take(&mut self.created)
    }
}

impl fmt::Debug for UvmlInstantiationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UvmlInstantiationContext")
            .field("culture", &self.culture)
            .field("view_model", &self.view_model.is_some())
            .field("namescope", &self.namescope)
            .field("created", &self.created.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::class::ClassKind;
    use prism_core::property::PropertyRegistry;
    use prism_core::tree::ElementTree;

    #[test]
    fn test_names_are_unique() {
        let mut registry = PropertyRegistry::new();
        let visual = registry
            .register_root_class("Visual", ClassKind::DependencyObject)
            .unwrap();
        let mut tree = ElementTree::new(Arc::new(registry));
        let a = tree.create(visual).unwrap();
        let b = tree.create(visual).unwrap();

        let env = UvmlEnvironment::new(Arc::new(FactoryRegistry::new()));
        let mut context = UvmlInstantiationContext::new(&env);
        context.register_name("ok", a).unwrap();

        assert!(matches!(
            context.register_name("ok", b),
            Err(PrismError::Template { .. })
        ));
        assert_eq!(context.find_name("ok"), Some(a));
        assert_eq!(context.find_name("cancel"), None);
    }
}
