//! Compound selectors: `Type#name.class`

use prism_core::element::ElementId;
use prism_core::error::{PrismError, Result};
use prism_core::tree::ElementTree;
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// One simple selector of a compound selector
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectorPart {
    /// Matches the class or any class deriving from it
    Type(String),
    /// Matches the element name
    Name(String),
    /// Matches a style class
    Class(String),
}

/// CSS-like specificity: ids, then classes, then types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Specificity {
    pub ids: u16,
    pub classes: u16,
    pub types: u16,
}

/// A compound selector. Every part must match. No parts matches everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct UvssSelector {
    parts: SmallVec<[SelectorPart; 2]>,
}

impl UvssSelector {
    /// Selector matching every element
    pub fn universal() -> Self {
        Self::default()
    }

    pub fn of_type(type_name: impl Into<String>) -> Self {
        Self::universal().with(SelectorPart::Type(type_name.into()))
    }

    pub fn with(mut self, part: SelectorPart) -> Self {
        self.parts.push(part);
        self
    }

    pub fn parts(&self) -> &[SelectorPart] {
        &self.parts
    }

    pub fn specificity(&self) -> Specificity {
        self.parts
            .iter()
            .fold(Specificity::default(), |mut s, part| {
                match part {
                    SelectorPart::Name(_) => s.ids += 1,
                    SelectorPart::Class(_) => s.classes += 1,
                    SelectorPart::Type(_) => s.types += 1,
                }
                s
            })
    }

    pub fn matches(&self, tree: &ElementTree, element: ElementId) -> bool {
        let Some(info) = tree.try_element(element) else {
            return false;
        };
        let classes = tree.registry().classes();

        self.parts.iter().all(|part| match part {
            SelectorPart::Type(type_name) => classes
                .lookup(type_name)
                .map(|class| classes.is_subclass_of(info.class(), class))
                .unwrap_or(false),
            SelectorPart::Name(name) => info.name() == Some(name.as_str()),
            SelectorPart::Class(class) => info.has_style_class(class),
        })
    }
}

impl FromStr for UvssSelector {
    type Err = PrismError;

    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        if text.is_empty() {
            return Err(PrismError::style_sheet("Empty selector"));
        }
        if text == "*" {
            return Ok(Self::universal());
        }

        let mut selector = Self::universal();
        let mut rest = text;
        while !rest.is_empty() {
            let (sigil, body) = match rest.as_bytes()[0] {
                b'#' | b'.' => (Some(rest.as_bytes()[0]), &rest[1..]),
                _ => (None, rest),
            };
            let end = body.find(|c: char| c == '#' || c == '.').unwrap_or(body.len());
            let ident = &body[..end];
            if ident.is_empty() || !ident.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
                return Err(PrismError::style_sheet(format!("Invalid selector '{}'", text)));
            }

            let part = match sigil {
                Some(b'#') => SelectorPart::Name(ident.to_string()),
                Some(_) => SelectorPart::Class(ident.to_string()),
                None if selector.parts.is_empty() => SelectorPart::Type(ident.to_string()),
                None => {
                    return Err(PrismError::style_sheet(format!(
                        "Type must come first in selector '{}'",
                        text
                    )))
                }
            };
            selector.parts.push(part);
            rest = &body[end..];
        }

        Ok(selector)
    }
}

impl fmt::Display for UvssSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parts.is_empty() {
            return write!(f, "*");
        }
        for part in &self.parts {
            match part {
                SelectorPart::Type(name) => write!(f, "{}", name)?,
                SelectorPart::Name(name) => write!(f, "#{}", name)?,
                SelectorPart::Class(name) => write!(f, ".{}", name)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::class::ClassKind;
    use prism_core::property::PropertyRegistry;
    use std::sync::Arc;

    #[test]
    fn test_parse_and_specificity() {
        let selector: UvssSelector = "Button#ok.primary.large".parse().unwrap();
        assert_eq!(
            selector.parts(),
            &[
                SelectorPart::Type("Button".to_string()),
                SelectorPart::Name("ok".to_string()),
                SelectorPart::Class("primary".to_string()),
                SelectorPart::Class("large".to_string()),
            ]
        );
        assert_eq!(
            selector.specificity(),
            Specificity {
                ids: 1,
                classes: 2,
                types: 1
            }
        );
        assert_eq!(selector.to_string(), "Button#ok.primary.large");

        let id: UvssSelector = "#a".parse().unwrap();
        let classes: UvssSelector = ".a.b.c".parse().unwrap();
        assert!(id.specificity() > classes.specificity());
        assert!("".parse::<UvssSelector>().is_err());
        assert!("Button..x".parse::<UvssSelector>().is_err());
        assert!("Button Label".parse::<UvssSelector>().is_err());
    }

    #[test]
    fn test_type_parts_match_subclasses() {
        let mut registry = PropertyRegistry::new();
        let visual = registry
            .register_root_class("Visual", ClassKind::DependencyObject)
            .unwrap();
        let button = registry.register_class("Button", visual).unwrap();
        let mut tree = ElementTree::new(Arc::new(registry));
        let element = tree.create(button).unwrap();
        tree.add_style_class(element, "primary").unwrap();

        assert!("Visual".parse::<UvssSelector>().unwrap().matches(&tree, element));
        assert!("Button.primary".parse::<UvssSelector>().unwrap().matches(&tree, element));
        assert!(!"Button.secondary".parse::<UvssSelector>().unwrap().matches(&tree, element));
        assert!(!"Unknown".parse::<UvssSelector>().unwrap().matches(&tree, element));
        assert!(UvssSelector::universal().matches(&tree, element));
    }
}
