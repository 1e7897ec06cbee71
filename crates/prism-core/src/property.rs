//! Dependency property registry
//!
//! The registry is append-only: properties are registered once during startup
//! and then shared immutably (usually behind an `Arc`) by every element tree
//! and template. Registration needs `&mut`, so concurrent registration has to
//! be serialized by whoever owns the registry.

use crate::class::{ClassId, ClassKind, ClassRegistry};
use crate::element::ElementId;
use crate::error::{PrismError, Result};
use crate::tree::ElementTree;
use crate::value::{Value, ValueKind};
use bitflags::bitflags;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

bitflags! {
    /// Side effects of a property change
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PropertyFlags: u32 {
        /// Changing the value invalidates the element's measure pass
        const AFFECTS_MEASURE = 1 << 0;
        /// Changing the value invalidates the element's arrange pass
        const AFFECTS_ARRANGE = 1 << 1;
        /// Unset values are taken from the nearest ancestor
        const INHERITS = 1 << 2;
    }
}

/// Identifier of a registered dependency property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyId(u32);

impl PropertyId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

/// Effective value change delivered to change callbacks
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
    pub property: PropertyId,
    pub old: Value,
    pub new: Value,
}

/// Invoked after an element's effective value changed. The tree is handed back
/// so callbacks can read or write other properties.
pub type PropertyChangedCallback =
    Arc<dyn Fn(&mut ElementTree, ElementId, &PropertyChange) + Send + Sync>;

/// Adjusts a value before it is stored in a layer
pub type CoerceValueCallback = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Default value, flags and callbacks of a property for one owner type
#[derive(Clone)]
pub struct PropertyMetadata {
    default_value: Value,
    flags: PropertyFlags,
    changed: Option<PropertyChangedCallback>,
    coerce: Option<CoerceValueCallback>,
}

impl PropertyMetadata {
    pub fn new(default_value: impl Into<Value>) -> Self {
        Self {
            default_value: default_value.into(),
            flags: PropertyFlags::empty(),
            changed: None,
            coerce: None,
        }
    }

    pub fn with_flags(mut self, flags: PropertyFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn on_changed<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut ElementTree, ElementId, &PropertyChange) + Send + Sync + 'static,
    {
        self.changed = Some(Arc::new(callback));
        self
    }

    pub fn with_coerce<F>(mut self, coerce: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.coerce = Some(Arc::new(coerce));
        self
    }

    pub fn default_value(&self) -> &Value {
        &self.default_value
    }

    pub fn flags(&self) -> PropertyFlags {
        self.flags
    }

    pub fn inherits(&self) -> bool {
        self.flags.contains(PropertyFlags::INHERITS)
    }

    pub fn changed_callback(&self) -> Option<&PropertyChangedCallback> {
        self.changed.as_ref()
    }

    pub fn coerce(&self, value: Value) -> Value {
        match &self.coerce {
            Some(coerce) => coerce(&value),
            None => value,
        }
    }
}

impl fmt::Debug for PropertyMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMetadata")
            .field("default_value", &self.default_value)
            .field("flags", &self.flags)
            .field("changed", &self.changed.is_some())
            .field("coerce", &self.coerce.is_some())
            .finish()
    }
}

/// A registered dependency property
#[derive(Debug)]
pub struct PropertyDefinition {
    pub id: PropertyId,
    pub name: String,
    pub owner: ClassId,
    pub kind: ValueKind,
    pub metadata: PropertyMetadata,
}

/// Global table of property definitions
#[derive(Debug, Default)]
pub struct PropertyRegistry {
    classes: ClassRegistry,
    properties: Vec<PropertyDefinition>,
    by_owner: HashMap<ClassId, HashMap<String, PropertyId>>,
    overrides: HashMap<(PropertyId, ClassId), PropertyMetadata>,
}

impl PropertyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry around an existing class table
    pub fn with_classes(classes: ClassRegistry) -> Self {
        Self {
            classes,
            ..Self::default()
        }
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    pub fn classes_mut(&mut self) -> &mut ClassRegistry {
        &mut self.classes
    }

    /// Shorthand for `classes_mut().register_root(..)`
    pub fn register_root_class(&mut self, name: &str, kind: ClassKind) -> Result<ClassId> {
        self.classes.register_root(name, kind)
    }

    /// Shorthand for `classes_mut().register(..)`
    pub fn register_class(&mut self, name: &str, parent: ClassId) -> Result<ClassId> {
        self.classes.register(name, parent)
    }

    /// Register a property named `name` on `owner`.
    pub fn register(
        &mut self,
        name: &str,
        kind: ValueKind,
        owner: ClassId,
        metadata: PropertyMetadata,
    ) -> Result<PropertyId> {
        let owner_name = self.owner_name(owner)?;

        if self.lookup_direct(owner, name).is_some() {
            tracing::error!(property = name, owner = %owner_name, "Duplicate property registration");
            return Err(PrismError::duplicate_registration(name, owner_name));
        }

        let metadata = Self::check_default(name, kind, metadata)?;
        let id = PropertyId(self.properties.len() as u32);
        self.properties.push(PropertyDefinition {
            id,
            name: name.to_string(),
            owner,
            kind,
            metadata,
        });
        self.by_owner
            .entry(owner)
            .or_default()
            .insert(name.to_string(), id);

        tracing::debug!(property = name, owner = %owner_name, %kind, "Registered dependency property");
        Ok(id)
    }

    /// Make an existing property resolvable by name on another owner type
    pub fn add_owner(&mut self, property: PropertyId, owner: ClassId) -> Result<()> {
        let owner_name = self.owner_name(owner)?;
        let name = self.definition_or_err(property)?.name.clone();

        if self.lookup_direct(owner, &name).is_some() {
            return Err(PrismError::duplicate_registration(name, owner_name));
        }

        self.by_owner.entry(owner).or_default().insert(name, property);
        Ok(())
    }

    /// Replace the metadata of `property` for `class` and the classes deriving from it
    pub fn override_metadata(
        &mut self,
        property: PropertyId,
        class: ClassId,
        metadata: PropertyMetadata,
    ) -> Result<()> {
        let class_name = self.owner_name(class)?;
        let definition = self.definition_or_err(property)?;

        if self.overrides.contains_key(&(property, class)) {
            return Err(PrismError::DuplicateMetadataOverride {
                property: definition.name.clone(),
                class: class_name,
                context: None,
            });
        }

        let metadata = Self::check_default(&definition.name, definition.kind, metadata)?;
        self.overrides.insert((property, class), metadata);
        Ok(())
    }

    /// Resolve `name` on `owner` or the closest ancestor declaring it
    pub fn resolve(&self, name: &str, owner: ClassId) -> Result<PropertyId> {
        self.classes
            .ancestors(owner)
            .iter()
            .find_map(|class| self.lookup_direct(*class, name))
            .ok_or_else(|| PrismError::property_not_found(name, self.classes.name(owner)))
    }

    /// Resolve either a plain name against `class` or an attached `Owner.Name` form
    pub fn resolve_qualified(&self, name: &str, class: ClassId) -> Result<PropertyId> {
        match name.rsplit_once('.') {
            Some((owner, property)) => {
                let owner = self
                    .classes
                    .lookup(owner)
                    .map_err(|_| PrismError::property_not_found(name, self.classes.name(class)))?;
                self.resolve(property, owner)
            }
            None => self.resolve(name, class),
        }
    }

    /// Metadata of `property` as seen by `class`: the closest override on the
    /// ancestor chain, else the registration metadata.
    pub fn metadata(&self, property: PropertyId, class: ClassId) -> Result<&PropertyMetadata> {
        let definition = self.definition_or_err(property)?;
        Ok(self
            .classes
            .ancestors(class)
            .iter()
            .find_map(|ancestor| self.overrides.get(&(property, *ancestor)))
            .unwrap_or(&definition.metadata))
    }

    pub fn definition(&self, property: PropertyId) -> Option<&PropertyDefinition> {
        self.properties.get(property.index())
    }

    /// Property name for diagnostics
    pub fn name(&self, property: PropertyId) -> &str {
        self.definition(property)
            .map(|d| d.name.as_str())
            .unwrap_or("<unregistered>")
    }

    /// Properties that inherit for at least one class
    pub fn inheriting_properties(&self) -> Vec<PropertyId> {
        self.properties
            .iter()
            .filter(|definition| {
                definition.metadata.inherits()
                    || self
                        .overrides
                        .iter()
                        .any(|((id, _), metadata)| *id == definition.id && metadata.inherits())
            })
            .map(|definition| definition.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    fn lookup_direct(&self, owner: ClassId, name: &str) -> Option<PropertyId> {
        self.by_owner.get(&owner)?.get(name).copied()
    }

    fn definition_or_err(&self, property: PropertyId) -> Result<&PropertyDefinition> {
        self.definition(property)
            .ok_or_else(|| PrismError::property_not_found(format!("#{}", property.0), "registry"))
    }

    fn owner_name(&self, owner: ClassId) -> Result<String> {
        self.classes
            .get(owner)
            .map(|c| c.name.clone())
            .ok_or_else(|| PrismError::unknown_type(format!("{:?}", owner)))
    }

    fn check_default(name: &str, kind: ValueKind, mut metadata: PropertyMetadata) -> Result<PropertyMetadata> {
        let default = std::mem::replace(&mut metadata.default_value, Value::Null);
        let actual = default.type_name();
        metadata.default_value = kind
            .coerce(default)
            .ok_or_else(|| PrismError::type_mismatch(name, kind.as_str(), actual))?;
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (PropertyRegistry, ClassId, ClassId) {
        let mut registry = PropertyRegistry::new();
        let visual = registry
            .register_root_class("Visual", ClassKind::DependencyObject)
            .unwrap();
        let button = registry.register_class("Button", visual).unwrap();
        (registry, visual, button)
    }

    #[test]
    fn test_resolve_walks_ancestors() {
        let (mut registry, visual, button) = registry();
        let opacity = registry
            .register("Opacity", ValueKind::Double, visual, PropertyMetadata::new(1.0))
            .unwrap();

        assert_eq!(registry.resolve("Opacity", button).unwrap(), opacity);
        assert!(matches!(
            registry.resolve("Width", button),
            Err(PrismError::PropertyNotFound { .. })
        ));
    }

    #[test]
    fn test_default_must_match_kind() {
        let (mut registry, visual, _) = registry();
        assert!(matches!(
            registry.register("Name", ValueKind::String, visual, PropertyMetadata::new(3)),
            Err(PrismError::TypeMismatch { .. })
        ));

        // Ints widen to doubles
        let width = registry
            .register("Width", ValueKind::Double, visual, PropertyMetadata::new(0))
            .unwrap();
        assert_eq!(
            registry.metadata(width, visual).unwrap().default_value(),
            &Value::Double(0.0)
        );
    }

    #[test]
    fn test_add_owner_and_qualified_names() {
        let (mut registry, visual, button) = registry();
        let grid = registry.register_class("Grid", visual).unwrap();
        let row = registry
            .register("Row", ValueKind::Int, grid, PropertyMetadata::new(0))
            .unwrap();

        assert_eq!(registry.resolve_qualified("Grid.Row", button).unwrap(), row);
        assert!(registry.resolve("Row", button).is_err());

        registry.add_owner(row, button).unwrap();
        assert_eq!(registry.resolve("Row", button).unwrap(), row);
        assert!(matches!(
            registry.add_owner(row, button),
            Err(PrismError::DuplicateRegistration { .. })
        ));
    }

    #[test]
    fn test_second_override_on_same_class_fails() {
        let (mut registry, visual, button) = registry();
        let opacity = registry
            .register("Opacity", ValueKind::Double, visual, PropertyMetadata::new(1.0))
            .unwrap();

        registry
            .override_metadata(opacity, button, PropertyMetadata::new(0.5))
            .unwrap();
        assert!(matches!(
            registry.override_metadata(opacity, button, PropertyMetadata::new(0.25)),
            Err(PrismError::DuplicateMetadataOverride { .. })
        ));
    }
}
