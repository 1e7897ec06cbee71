//! Compiled binding expressions
//!
//! Expression compilation belongs to the host. Templates only carry the
//! expression text and ask an [`ExpressionSource`] for its current value.

use prism_core::element::ElementId;
use prism_core::error::{PrismError, Result};
use prism_core::tree::ElementTree;
use prism_core::value::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A `{{...}}` binding as written in markup, without the braces
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingExpression {
    text: String,
}

impl BindingExpression {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into().trim().to_string(),
        }
    }

    /// Parse `{{expr}}`. Returns `None` for anything else.
    pub fn parse(text: &str) -> Option<Self> {
        let inner = text.trim().strip_prefix("{{")?.strip_suffix("}}")?;
        let inner = inner.trim();
        (!inner.is_empty()).then(|| Self::new(inner))
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for BindingExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{{}}}}}", self.text)
    }
}

/// What an expression is evaluated against
pub struct ExpressionScope<'a> {
    pub tree: &'a ElementTree,
    /// Element whose property the binding supplies
    pub target: ElementId,
    pub view_model: Option<&'a (dyn Any + Send + Sync)>,
}

impl<'a> ExpressionScope<'a> {
    /// The view model as `T`, if there is one of that type
    pub fn view_model<T: Any>(&self) -> Option<&'a T> {
        self.view_model?.downcast_ref()
    }
}

/// Source of current values for binding expressions
pub trait ExpressionSource: Send + Sync {
    fn evaluate(&self, expression: &BindingExpression, scope: &ExpressionScope<'_>) -> Result<Value>;
}

/// A compiled expression body
pub type CompiledExpression =
    Arc<dyn Fn(&ExpressionScope<'_>) -> anyhow::Result<Value> + Send + Sync>;

/// Expression source backed by a table of precompiled closures keyed by expression text
#[derive(Default, Clone)]
pub struct CompiledExpressionTable {
    expressions: HashMap<String, CompiledExpression>,
}

impl CompiledExpressionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the compiled body of `text`, replacing any previous one
    pub fn insert<F>(&mut self, text: &str, body: F) -> &mut Self
    where
        F: Fn(&ExpressionScope<'_>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.expressions
            .insert(text.trim().to_string(), Arc::new(body));
        self
    }

    /// Register an expression reading from a view model of type `T`
    pub fn insert_view_model<T, F>(&mut self, text: &str, body: F) -> &mut Self
    where
        T: Any,
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        let name = text.trim().to_string();
        self.insert(text, move |scope| {
            scope.view_model::<T>().map(&body).ok_or_else(|| {
                anyhow::anyhow!(
                    "'{}' needs a {} view model",
                    name,
                    std::any::type_name::<T>()
                )
            })
        })
    }

    pub fn contains(&self, text: &str) -> bool {
        self.expressions.contains_key(text.trim())
    }

    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }
}

impl ExpressionSource for CompiledExpressionTable {
    fn evaluate(&self, expression: &BindingExpression, scope: &ExpressionScope<'_>) -> Result<Value> {
        let body = self.expressions.get(expression.text()).ok_or_else(|| {
            PrismError::expression(format!("No compiled expression for {}", expression))
        })?;

        body(scope).map_err(|e| PrismError::expression(format!("{} failed: {:#}", expression, e)))
    }
}

impl fmt::Debug for CompiledExpressionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.expressions.keys().collect();
        keys.sort();
        f.debug_struct("CompiledExpressionTable")
            .field("expressions", &keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::class::ClassKind;
    use prism_core::property::PropertyRegistry;

    struct Person {
        name: &'static str,
    }

    #[test]
    fn test_parse_binding() {
        assert_eq!(
            BindingExpression::parse("{{ Name }}"),
            Some(BindingExpression::new("Name"))
        );
        assert_eq!(BindingExpression::parse("Name"), None);
        assert_eq!(BindingExpression::parse("{{  }}"), None);
        assert_eq!(BindingExpression::new("Name").to_string(), "{{Name}}");
    }

    #[test]
    fn test_table_evaluation() {
        let mut registry = PropertyRegistry::new();
        let visual = registry
            .register_root_class("Visual", ClassKind::DependencyObject)
            .unwrap();
        let mut tree = ElementTree::new(Arc::new(registry));
        let target = tree.create(visual).unwrap();

        let mut table = CompiledExpressionTable::new();
        table.insert_view_model::<Person, _>("Name", |p| Value::from(p.name));

        let person = Person { name: "Ada" };
        let scope = ExpressionScope {
            tree: &tree,
            target,
            view_model: Some(&person),
        };
        assert_eq!(
            table.evaluate(&BindingExpression::new("Name"), &scope).unwrap(),
            Value::from("Ada")
        );
        assert!(matches!(
            table.evaluate(&BindingExpression::new("Age"), &scope),
            Err(PrismError::Expression { .. })
        ));

        let empty = ExpressionScope {
            tree: &tree,
            target,
            view_model: None,
        };
        assert!(matches!(
            table.evaluate(&BindingExpression::new("Name"), &empty),
            Err(PrismError::Expression { .. })
        ));
    }
}
