//! Parsed UVSS documents
//!
//! Documents arrive already parsed. Setter and trigger values are either typed
//! values or the raw text of the style sheet, which is converted to the kind of
//! the property it ends up on.

use crate::selector::UvssSelector;
use crate::trigger::Trigger;
use prism_core::element::ElementId;
use prism_core::error::Result;
use prism_core::property::PropertyId;
use prism_core::tree::ElementTree;
use prism_core::value::{Culture, Value, ValueKind};
use std::sync::Arc;

/// `property: value;`
#[derive(Debug, Clone, PartialEq)]
pub struct UvssSetter {
    /// Property name, `Owner.Name` for attached properties
    pub property: String,
    pub value: Value,
}

impl UvssSetter {
    pub fn new(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }
}

/// A selector with its setters and triggers
#[derive(Debug, Clone)]
pub struct UvssRule {
    pub selector: UvssSelector,
    pub setters: Vec<UvssSetter>,
    pub triggers: Vec<Arc<Trigger>>,
}

impl UvssRule {
    pub fn new(selector: UvssSelector) -> Self {
        Self {
            selector,
            setters: Vec::new(),
            triggers: Vec::new(),
        }
    }

    /// Rule for a selector written in UVSS syntax
    pub fn parse(selector: &str) -> Result<Self> {
        Ok(Self::new(selector.parse()?))
    }

    pub fn setter(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.setters.push(UvssSetter::new(property, value));
        self
    }

    pub fn trigger(mut self, trigger: Trigger) -> Self {
        self.triggers.push(Arc::new(trigger));
        self
    }
}

/// An ordered list of rules from one source
#[derive(Debug, Clone, Default)]
pub struct UvssDocument {
    pub rules: Vec<UvssRule>,
}

impl UvssDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, rule: UvssRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Resolve `name` against the class of `element`, qualified names included
pub(crate) fn resolve_property(
    tree: &ElementTree,
    element: ElementId,
    name: &str,
) -> Option<(PropertyId, ValueKind)> {
    let class = tree.class_of(element).ok()?;
    let registry = tree.registry();
    let property = registry.resolve_qualified(name, class).ok()?;
    let kind = registry.definition(property)?.kind;
    Some((property, kind))
}

/// Convert a style value to `kind`, parsing style sheet text with the invariant culture
pub(crate) fn convert_value(kind: ValueKind, value: &Value) -> Option<Value> {
    if let Some(converted) = kind.coerce(value.clone()) {
        return Some(converted);
    }
    match value {
        Value::String(text) => Value::parse(kind, text, &Culture::invariant()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::types::Color;

    #[test]
    fn test_text_values_convert_to_property_kind() {
        assert_eq!(
            convert_value(ValueKind::Double, &Value::from("0.5")),
            Some(Value::Double(0.5))
        );
        assert_eq!(
            convert_value(ValueKind::Color, &Value::from("#FFFFFF")),
            Some(Value::Color(Color::WHITE))
        );
        assert_eq!(convert_value(ValueKind::Double, &Value::Int(2)), Some(Value::Double(2.0)));
        assert_eq!(convert_value(ValueKind::Int, &Value::from("wide")), None);
        assert_eq!(convert_value(ValueKind::Bool, &Value::Int(1)), None);
    }
}
