//! Cascade over an ordered list of style documents

use crate::document::{convert_value, resolve_property, UvssDocument, UvssRule};
use crate::selector::Specificity;
use crate::trigger::{Trigger, TriggerState, TriggerTransition};
use prism_core::element::{ElementId, ValueLayer};
use prism_core::error::Result;
use prism_core::logging::LogCategory;
use prism_core::property::PropertyId;
use prism_core::tree::ElementTree;
use prism_core::value::Value;
use prism_core::{prism_trace, prism_warn_rate_limited};
use std::collections::HashMap;
use std::sync::Arc;

/// Style documents in source order. Later sources win ties in specificity.
#[derive(Debug, Clone, Default)]
pub struct CompositeUvssDocument {
    sources: Vec<Arc<UvssDocument>>,
    origin: Option<u64>,
}

impl CompositeUvssDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Composite published by the global style sheet with id `origin`
    pub fn with_origin(origin: u64) -> Self {
        Self {
            sources: Vec::new(),
            origin: Some(origin),
        }
    }

    pub fn push(&mut self, document: Arc<UvssDocument>) {
        self.sources.push(document);
    }

    pub fn sources(&self) -> &[Arc<UvssDocument>] {
        &self.sources
    }

    /// Id of the global style sheet this composite came from
    pub fn origin(&self) -> Option<u64> {
        self.origin
    }

    pub fn is_empty(&self) -> bool {
        self.sources.iter().all(|d| d.is_empty())
    }

    /// Rules matching `element`, weakest first
    pub fn matching_rules(&self, tree: &ElementTree, element: ElementId) -> Vec<&UvssRule> {
        let mut matched: Vec<(Specificity, usize, usize, &UvssRule)> = self
            .sources
            .iter()
            .enumerate()
            .flat_map(|(source, document)| {
                document
                    .rules
                    .iter()
                    .enumerate()
                    .map(move |(index, rule)| (source, index, rule))
            })
            .filter(|(_, _, rule)| rule.selector.matches(tree, element))
            .map(|(source, index, rule)| (rule.selector.specificity(), source, index, rule))
            .collect();
        matched.sort_by_key(|&(specificity, source, index, _)| (specificity, source, index));
        matched.into_iter().map(|(_, _, _, rule)| rule).collect()
    }

    /// Write the winning setter values of `element` into its Styled layer.
    ///
    /// Styled values no longer produced by any rule are cleared. Returns the
    /// number of styled values the element ends up with.
    pub fn apply_styles(&self, tree: &mut ElementTree, element: ElementId) -> Result<usize> {
        if !tree.element(element)?.is_dependency_object() {
            return Ok(0);
        }

        let mut winners: Vec<(PropertyId, Value)> = Vec::new();
        let mut slots: HashMap<PropertyId, usize> = HashMap::new();
        for rule in self.matching_rules(tree, element) {
            for setter in &rule.setters {
                let Some((property, kind)) = resolve_property(tree, element, &setter.property) else {
                    prism_trace!(
                        LogCategory::Styles,
                        "Skipping '{}' on {}: no such property",
                        setter.property,
                        tree.class_name(element)
                    );
                    continue;
                };
                let Some(value) = convert_value(kind, &setter.value) else {
                    prism_warn_rate_limited!(
                        LogCategory::Styles,
                        "Cannot convert {} for '{}' ({}) in rule '{}'",
                        setter.value,
                        setter.property,
                        kind,
                        rule.selector
                    );
                    continue;
                };
                match slots.get(&property) {
                    Some(&slot) => winners[slot].1 = value,
                    None => {
                        slots.insert(property, winners.len());
                        winners.push((property, value));
                    }
                }
            }
        }

        for stale in tree.properties_in_layer(element, ValueLayer::Styled) {
            if !slots.contains_key(&stale) {
                tree.clear_styled_value(element, stale)?;
            }
        }
        let applied = winners.len();
        for (property, value) in winners {
            tree.set_styled_value(element, property, value)?;
        }
        Ok(applied)
    }

    /// [`apply_styles`](Self::apply_styles) on `root` and everything below it
    pub fn apply_styles_recursive(&self, tree: &mut ElementTree, root: ElementId) -> Result<()> {
        for element in tree.descendants(root) {
            self.apply_styles(tree, element)?;
        }
        Ok(())
    }

    fn triggers(&self) -> impl Iterator<Item = (&UvssRule, &Arc<Trigger>)> {
        self.sources
            .iter()
            .flat_map(|document| document.rules.iter())
            .flat_map(|rule| rule.triggers.iter().map(move |trigger| (rule, trigger)))
    }

    /// Evaluate the property triggers of the rules matching `element`.
    ///
    /// Triggers of rules that stopped matching are deactivated. Returns the
    /// number of transitions.
    pub fn update_triggers(&self, tree: &mut ElementTree, element: ElementId) -> usize {
        let mut transitions = 0;
        for (rule, trigger) in self.triggers() {
            if !trigger.is_property_trigger() {
                continue;
            }
            let transition = if rule.selector.matches(tree, element) {
                trigger.evaluate(tree, element)
            } else if trigger.state(element) == TriggerState::Active {
                trigger.set_condition(tree, element, false)
            } else {
                TriggerTransition::None
            };
            if transition != TriggerTransition::None {
                transitions += 1;
            }
        }
        transitions
    }

    /// Drop trigger state for `element`, deactivating active triggers.
    /// Call it for the ids returned by [`ElementTree::remove`].
    pub fn forget(&self, tree: &mut ElementTree, element: ElementId) {
        for (_, trigger) in self.triggers() {
            trigger.forget(tree, element);
        }
    }
}
