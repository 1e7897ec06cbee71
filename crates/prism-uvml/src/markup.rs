//! Parsed UVML markup
//!
//! This is the description of a template as it comes out of the markup parser:
//! type names and attribute text, nothing resolved yet. [`UvmlCompiler`]
//! turns it into an executable template.
//!
//! [`UvmlCompiler`]: crate::compiler::UvmlCompiler

use crate::expression::BindingExpression;
use prism_core::value::Value;

/// Value of an attribute
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Raw text, converted to the property kind at instantiation
    Text(String),
    /// Already typed value
    Value(Value),
    /// `{{expression}}`
    Binding(BindingExpression),
    /// Reference to a named element of the same template
    Reference(String),
}

impl AttributeValue {
    /// Classify attribute text: `{{...}}` is a binding, anything else literal text
    pub fn from_text(text: &str) -> Self {
        match BindingExpression::parse(text) {
            Some(binding) => AttributeValue::Binding(binding),
            None => AttributeValue::Text(text.to_string()),
        }
    }

    pub fn reference(name: impl Into<String>) -> Self {
        AttributeValue::Reference(name.into())
    }
}

impl From<&str> for AttributeValue {
    fn from(text: &str) -> Self {
        AttributeValue::from_text(text)
    }
}

impl From<String> for AttributeValue {
    fn from(text: String) -> Self {
        AttributeValue::from_text(&text)
    }
}

impl From<Value> for AttributeValue {
    fn from(value: Value) -> Self {
        AttributeValue::Value(value)
    }
}

impl From<BindingExpression> for AttributeValue {
    fn from(binding: BindingExpression) -> Self {
        AttributeValue::Binding(binding)
    }
}

/// One element of UVML markup
#[derive(Debug, Clone, PartialEq)]
pub struct UvmlElement {
    /// Registered type name (e.g. "Button")
    pub type_name: String,
    /// Namescope name
    pub name: Option<String>,
    /// Construction arguments
    pub args: Vec<Value>,
    /// Attributes in document order
    pub attributes: Vec<(String, AttributeValue)>,
    /// Child elements in document order
    pub children: Vec<UvmlElement>,
}

impl UvmlElement {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: None,
            args: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
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

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn child(mut self, child: UvmlElement) -> Self {
        self.children.push(child);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_document_order() {
        let markup = UvmlElement::new("StackPanel")
            .named("root")
            .attribute("Width", "100")
            .attribute("Text", "{{Title}}")
            .attribute("Opacity", Value::Double(0.5))
            .child(UvmlElement::new("Button"));

        assert_eq!(
            markup.attributes,
            vec![
                ("Width".to_string(), AttributeValue::Text("100".to_string())),
                (
                    "Text".to_string(),
                    AttributeValue::Binding(BindingExpression::new("Title"))
                ),
                ("Opacity".to_string(), AttributeValue::Value(Value::Double(0.5))),
            ]
        );
        assert_eq!(markup.children.len(), 1);
        assert_eq!(markup.name.as_deref(), Some("root"));
    }
}
