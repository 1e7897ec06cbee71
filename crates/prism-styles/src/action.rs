//! Trigger actions

use crate::document::convert_value;
use prism_core::content::{load, SourcedAsset};
use prism_core::element::{ElementId, TriggerSource};
use prism_core::error::{PrismError, Result};
use prism_core::logging::LogCategory;
use prism_core::property::PropertyId;
use prism_core::tree::ElementTree;
use prism_core::value::Value;
use prism_core::{prism_debug, prism_warn_rate_limited};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Something a trigger does when it activates and undoes when it deactivates
pub trait TriggerAction: Send + Sync + fmt::Debug {
    fn activate(&self, tree: &mut ElementTree, element: ElementId) -> Result<()>;

    fn deactivate(&self, tree: &mut ElementTree, element: ElementId) -> Result<()>;
}

/// Which pass of the collection is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Activate,
    Deactivate,
}

/// Ordered actions of one trigger.
///
/// Both passes walk the actions in declared order. A failing action is logged
/// and the remaining actions still run.
#[derive(Debug, Clone, Default)]
pub struct TriggerActionCollection {
    actions: SmallVec<[Arc<dyn TriggerAction>; 2]>,
}

impl TriggerActionCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: impl TriggerAction + 'static) {
        self.actions.push(Arc::new(action));
    }

    pub fn push_shared(&mut self, action: Arc<dyn TriggerAction>) {
        self.actions.push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn TriggerAction>> {
        self.actions.iter()
    }

    /// Activate every action. Returns the number of actions that failed.
    pub fn activate(&self, tree: &mut ElementTree, element: ElementId) -> usize {
        self.run(Pass::Activate, tree, element)
    }

    /// Deactivate every action, in the same order as [`activate`](Self::activate).
    /// Returns the number of actions that failed.
    pub fn deactivate(&self, tree: &mut ElementTree, element: ElementId) -> usize {
        self.run(Pass::Deactivate, tree, element)
    }

    fn run(&self, pass: Pass, tree: &mut ElementTree, element: ElementId) -> usize {
        let mut failures = 0;
        for action in &self.actions {
            let result = match pass {
                Pass::Activate => action.activate(tree, element),
                Pass::Deactivate => action.deactivate(tree, element),
            };
            if let Err(e) = result {
                failures += 1;
                prism_warn_rate_limited!(
                    LogCategory::Triggers,
                    "{:?} of {:?} failed on {:?}: {}",
                    pass,
                    action,
                    element,
                    e.format_for_log()
                );
            }
        }
        failures
    }
}

/// Writes a value into the Triggered layer while the trigger is active.
///
/// Each action owns its Triggered entry, so deactivating one action leaves
/// values written by other active actions on the same property in place.
/// Clones share the entry.
#[derive(Debug, Clone)]
pub struct SetTriggeredValueTriggerAction {
    /// Property name, resolved against the element's class
    pub property: String,
    pub value: Value,
    source: TriggerSource,
}

impl SetTriggeredValueTriggerAction {
    pub fn new(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            source: TriggerSource::next(),
        }
    }

    pub fn source(&self) -> TriggerSource {
        self.source
    }

    fn resolve(&self, tree: &ElementTree, element: ElementId) -> Result<PropertyId> {
        let class = tree.class_of(element)?;
        tree.registry().resolve_qualified(&self.property, class)
    }
}

impl TriggerAction for SetTriggeredValueTriggerAction {
    fn activate(&self, tree: &mut ElementTree, element: ElementId) -> Result<()> {
        let property = self.resolve(tree, element)?;
        let kind = tree
            .registry()
            .definition(property)
            .map(|definition| definition.kind)
            .ok_or_else(|| PrismError::property_not_found(&self.property, tree.class_name(element)))?;
        let value = convert_value(kind, &self.value).ok_or_else(|| {
            PrismError::type_mismatch(&self.property, kind.as_str(), self.value.type_name())
        })?;
        tree.set_triggered_value_for(element, property, self.source, Some(value))
            .map(|_| ())
    }

    fn deactivate(&self, tree: &mut ElementTree, element: ElementId) -> Result<()> {
        let property = self.resolve(tree, element)?;
        tree.set_triggered_value_for(element, property, self.source, None)
            .map(|_| ())
    }
}

/// A playable sound loaded from a content manager
pub trait SoundEffect: Send + Sync {
    fn play(&self) -> anyhow::Result<()>;
}

/// Plays a sound when the trigger activates. Deactivation does nothing.
#[derive(Debug, Clone)]
pub struct PlaySoundTriggerAction {
    pub sound: SourcedAsset,
}

impl PlaySoundTriggerAction {
    pub fn new(sound: SourcedAsset) -> Self {
        Self { sound }
    }

    /// Parse a `"Sounds/Click global"` identifier
    pub fn parse(sound: &str) -> Result<Self> {
        Ok(Self::new(sound.parse()?))
    }
}

impl TriggerAction for PlaySoundTriggerAction {
    fn activate(&self, tree: &mut ElementTree, element: ElementId) -> Result<()> {
        let Some(view) = tree.view_of(element) else {
            prism_debug!(LogCategory::Triggers, "No view for {:?}, not playing {}", element, self.sound);
            return Ok(());
        };
        let Some(content) = view.content_for(self.sound.source) else {
            prism_debug!(LogCategory::Triggers, "No content manager for {}", self.sound);
            return Ok(());
        };

        let sound = load::<Arc<dyn SoundEffect>>(&**content, &self.sound.asset, view.density)?;
        sound
            .play()
            .map_err(|e| PrismError::content(format!("Failed to play '{}': {:#}", self.sound, e)))
    }

    fn deactivate(&self, _tree: &mut ElementTree, _element: ElementId) -> Result<()> {
        Ok(())
    }
}
