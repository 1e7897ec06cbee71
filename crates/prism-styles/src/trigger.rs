//! Style triggers
//!
//! Every (trigger, element) pair runs a two-state machine. A condition that
//! becomes true activates the trigger's actions, a condition that becomes false
//! deactivates them. No coalescing happens here: each transition produces
//! exactly one pass over the action collection.

use crate::action::{TriggerAction, TriggerActionCollection};
use crate::document::{convert_value, resolve_property};
use prism_core::element::ElementId;
use prism_core::error::{PrismError, Result};
use prism_core::logging::LogCategory;
use prism_core::prism_trace;
use prism_core::tree::ElementTree;
use prism_core::value::Value;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a property condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerComparison {
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
}

impl TriggerComparison {
    fn holds(&self, actual: &Value, expected: &Value) -> bool {
        match self {
            TriggerComparison::Equals => actual == expected,
            TriggerComparison::NotEquals => actual != expected,
            ordered => match actual.partial_cmp_value(expected) {
                Some(ordering) => match ordered {
                    TriggerComparison::LessThan => ordering == Ordering::Less,
                    TriggerComparison::GreaterThan => ordering == Ordering::Greater,
                    TriggerComparison::LessThanOrEqual => ordering != Ordering::Greater,
                    TriggerComparison::GreaterThanOrEqual => ordering != Ordering::Less,
                    TriggerComparison::Equals | TriggerComparison::NotEquals => false,
                },
                None => false,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerComparison::Equals => "=",
            TriggerComparison::NotEquals => "<>",
            TriggerComparison::LessThan => "<",
            TriggerComparison::GreaterThan => ">",
            TriggerComparison::LessThanOrEqual => "<=",
            TriggerComparison::GreaterThanOrEqual => ">=",
        }
    }
}

impl FromStr for TriggerComparison {
    type Err = PrismError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "=" => Ok(TriggerComparison::Equals),
            "<>" => Ok(TriggerComparison::NotEquals),
            "<" => Ok(TriggerComparison::LessThan),
            ">" => Ok(TriggerComparison::GreaterThan),
            "<=" => Ok(TriggerComparison::LessThanOrEqual),
            ">=" => Ok(TriggerComparison::GreaterThanOrEqual),
            other => Err(PrismError::style_sheet(format!(
                "Unknown trigger comparison '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for TriggerComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `property <op> value`
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerCondition {
    pub property: String,
    pub comparison: TriggerComparison,
    pub value: Value,
}

impl TriggerCondition {
    pub fn new(property: impl Into<String>, comparison: TriggerComparison, value: impl Into<Value>) -> Self {
        Self {
            property: property.into(),
            comparison,
            value: value.into(),
        }
    }

    /// A condition on a property the element does not have never holds
    pub fn holds(&self, tree: &ElementTree, element: ElementId) -> bool {
        let Some((property, kind)) = resolve_property(tree, element, &self.property) else {
            return false;
        };
        let Ok(actual) = tree.get_value(element, property) else {
            return false;
        };
        match convert_value(kind, &self.value) {
            Some(expected) => self.comparison.holds(&actual, &expected),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TriggerState {
    #[default]
    Inactive,
    Active,
}

/// What a condition update did to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerTransition {
    None,
    Activated,
    Deactivated,
}

/// Conditions plus the actions they switch on and off.
///
/// A trigger without conditions is driven from outside through
/// [`set_condition`](Self::set_condition).
#[derive(Debug, Default)]
pub struct Trigger {
    conditions: Vec<TriggerCondition>,
    actions: TriggerActionCollection,
    states: Mutex<HashMap<ElementId, TriggerState>>,
}

impl Trigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn when(
        property: impl Into<String>,
        comparison: TriggerComparison,
        value: impl Into<Value>,
    ) -> Self {
        Self::new().condition(TriggerCondition::new(property, comparison, value))
    }

    pub fn condition(mut self, condition: TriggerCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn action(mut self, action: impl TriggerAction + 'static) -> Self {
        self.actions.push(action);
        self
    }

    pub fn conditions(&self) -> &[TriggerCondition] {
        &self.conditions
    }

    pub fn actions(&self) -> &TriggerActionCollection {
        &self.actions
    }

    /// Whether the trigger watches property values
    pub fn is_property_trigger(&self) -> bool {
        !self.conditions.is_empty()
    }

    pub fn state(&self, element: ElementId) -> TriggerState {
        self.states.lock().get(&element).copied().unwrap_or_default()
    }

    /// Feed the current value of the condition for `element`
    pub fn set_condition(&self, tree: &mut ElementTree, element: ElementId, condition: bool) -> TriggerTransition {
        let target = if condition {
            TriggerState::Active
        } else {
            TriggerState::Inactive
        };

        {
            let mut states = self.states.lock();
            let state = states.entry(element).or_default();
            if *state == target {
                return TriggerTransition::None;
            }
            *state = target;
        }

        match target {
            TriggerState::Active => {
                prism_trace!(LogCategory::Triggers, "Trigger activated on {:?}", element);
                self.actions.activate(tree, element);
                TriggerTransition::Activated
            }
            TriggerState::Inactive => {
                prism_trace!(LogCategory::Triggers, "Trigger deactivated on {:?}", element);
                self.actions.deactivate(tree, element);
                TriggerTransition::Deactivated
            }
        }
    }

    /// Evaluate the property conditions for `element`. All must hold.
    pub fn evaluate(&self, tree: &mut ElementTree, element: ElementId) -> TriggerTransition {
        if !self.is_property_trigger() {
            return TriggerTransition::None;
        }
        let condition = self.conditions.iter().all(|c| c.holds(&*tree, element));
        self.set_condition(tree, element, condition)
    }

    /// Run the activation pass regardless of the current state.
    /// Returns the number of failed actions.
    pub fn activate(&self, tree: &mut ElementTree, element: ElementId) -> usize {
        self.states.lock().insert(element, TriggerState::Active);
        self.actions.activate(tree, element)
    }

    /// Run the deactivation pass regardless of the current state.
    /// Returns the number of failed actions.
    pub fn deactivate(&self, tree: &mut ElementTree, element: ElementId) -> usize {
        self.states.lock().insert(element, TriggerState::Inactive);
        self.actions.deactivate(tree, element)
    }

    /// Deactivate if active and drop the state kept for `element`.
    ///
    /// The tree does not notify triggers when elements go away; call this for
    /// every id returned by [`ElementTree::remove`].
    pub fn forget(&self, tree: &mut ElementTree, element: ElementId) {
        let previous = self.states.lock().remove(&element);
        if previous == Some(TriggerState::Active) && tree.contains(element) {
            self.actions.deactivate(tree, element);
        }
    }

    /// Number of elements with tracked state
    pub fn tracked(&self) -> usize {
        self.states.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparisons() {
        let one = Value::Double(1.0);
        let two = Value::Double(2.0);
        assert!(TriggerComparison::LessThan.holds(&one, &two));
        assert!(TriggerComparison::LessThanOrEqual.holds(&one, &one));
        assert!(!TriggerComparison::GreaterThan.holds(&one, &two));
        assert!(TriggerComparison::NotEquals.holds(&one, &two));
        assert!(!TriggerComparison::LessThan.holds(&Value::Bool(true), &Value::Bool(false)));
        assert_eq!("<>".parse::<TriggerComparison>().unwrap(), TriggerComparison::NotEquals);
        assert!("!=".parse::<TriggerComparison>().is_err());
    }
}
