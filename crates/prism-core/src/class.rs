//! Class table: the type hierarchy known to the property system
//!
//! Every class records its ancestor chain once, at registration, so metadata
//! override lookups and property resolution walk a flat list instead of
//! chasing parents. The table also carries the per-class standard-property
//! accessors used for plain (non-dependency) property writes.

use crate::error::{PrismError, Result};
use crate::value::{Value, ValueKind};
use smallvec::SmallVec;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Identifier of a registered class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Capability of instances of a class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    /// Instances own a dependency property store
    DependencyObject,
    /// Instances only expose standard properties
    Plain,
}

/// Reads a standard property from an element's native state
pub type StandardGetter = Arc<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;

/// Writes a standard property into an element's native state
pub type StandardSetter = Arc<dyn Fn(&mut dyn Any, Value) -> Result<()> + Send + Sync>;

/// Accessor pair for a plain property
#[derive(Clone)]
pub struct StandardProperty {
    pub name: String,
    pub kind: ValueKind,
    getter: StandardGetter,
    setter: Option<StandardSetter>,
}

impl StandardProperty {
    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    pub fn get(&self, state: &dyn Any) -> Option<Value> {
        (self.getter)(state)
    }

    /// Write `value`, failing with `InvalidTarget` when the property is read-only.
    pub fn set(&self, class_name: &str, state: &mut dyn Any, value: Value) -> Result<()> {
        match &self.setter {
            Some(setter) => setter(state, value),
            None => Err(PrismError::invalid_target(
                &self.name,
                class_name,
                "property is read-only",
            )),
        }
    }
}

impl fmt::Debug for StandardProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardProperty")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("writable", &self.is_writable())
            .finish()
    }
}

/// A registered class
#[derive(Debug)]
pub struct ClassInfo {
    pub id: ClassId,
    pub name: String,
    pub kind: ClassKind,
    pub parent: Option<ClassId>,
    /// Self first, then parent, grandparent, ...
    pub ancestors: SmallVec<[ClassId; 8]>,
    standard_properties: HashMap<String, StandardProperty>,
}

/// Type hierarchy table
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: Vec<ClassInfo>,
    by_name: HashMap<String, ClassId>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class with no base class
    pub fn register_root(&mut self, name: &str, kind: ClassKind) -> Result<ClassId> {
        self.insert(name, kind, None)
    }

    /// Register a class deriving from `parent`. The capability is inherited.
    pub fn register(&mut self, name: &str, parent: ClassId) -> Result<ClassId> {
        let kind = self
            .get(parent)
            .ok_or_else(|| PrismError::unknown_type(format!("{:?}", parent)))?
            .kind;
        self.insert(name, kind, Some(parent))
    }

    fn insert(&mut self, name: &str, kind: ClassKind, parent: Option<ClassId>) -> Result<ClassId> {
        if self.by_name.contains_key(name) {
            return Err(PrismError::duplicate_registration(name, "class table"));
        }

        let id = ClassId(self.classes.len() as u32);
        let mut ancestors = SmallVec::new();
        ancestors.push(id);
        if let Some(parent) = parent.and_then(|p| self.get(p)) {
            ancestors.extend(parent.ancestors.iter().copied());
        }

        self.classes.push(ClassInfo {
            id,
            name: name.to_string(),
            kind,
            parent,
            ancestors,
            standard_properties: HashMap::new(),
        });
        self.by_name.insert(name.to_string(), id);

        tracing::debug!(class = name, ?kind, "Registered class");
        Ok(id)
    }

    /// Find a class by name
    pub fn lookup(&self, name: &str) -> Result<ClassId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| PrismError::unknown_type(name))
    }

    pub fn get(&self, id: ClassId) -> Option<&ClassInfo> {
        self.classes.get(id.index())
    }

    /// Class name for diagnostics
    pub fn name(&self, id: ClassId) -> &str {
        self.get(id).map(|c| c.name.as_str()).unwrap_or("<unregistered>")
    }

    /// Ancestor chain, self first. Empty for unregistered ids.
    pub fn ancestors(&self, id: ClassId) -> &[ClassId] {
        self.get(id).map(|c| c.ancestors.as_slice()).unwrap_or(&[])
    }

    pub fn is_subclass_of(&self, class: ClassId, ancestor: ClassId) -> bool {
        self.ancestors(class).contains(&ancestor)
    }

    pub fn supports_dependency_properties(&self, id: ClassId) -> bool {
        self.get(id)
            .map(|c| c.kind == ClassKind::DependencyObject)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Register a read/write standard property over the native state type `T`
    pub fn register_standard_property<T, G, S>(
        &mut self,
        class: ClassId,
        name: &str,
        kind: ValueKind,
        get: G,
        set: S,
    ) -> Result<()>
    where
        T: Any,
        G: Fn(&T) -> Value + Send + Sync + 'static,
        S: Fn(&mut T, Value) -> Result<()> + Send + Sync + 'static,
    {
        let class_name = self.name(class).to_string();
        let property_name = name.to_string();
        let setter: StandardSetter = Arc::new(move |state: &mut dyn Any, value: Value| {
            let state = state.downcast_mut::<T>().ok_or_else(|| {
                PrismError::invalid_target(
                    &property_name,
                    &class_name,
                    "element state has an unexpected type",
                )
            })?;
            set(state, value)
        });
        self.insert_standard_property(class, name, kind, Self::getter(get), Some(setter))
    }

    /// Register a standard property without a set accessor
    pub fn register_read_only_property<T, G>(
        &mut self,
        class: ClassId,
        name: &str,
        kind: ValueKind,
        get: G,
    ) -> Result<()>
    where
        T: Any,
        G: Fn(&T) -> Value + Send + Sync + 'static,
    {
        self.insert_standard_property(class, name, kind, Self::getter(get), None)
    }

    fn getter<T: Any, G>(get: G) -> StandardGetter
    where
        G: Fn(&T) -> Value + Send + Sync + 'static,
    {
        Arc::new(move |state: &dyn Any| state.downcast_ref::<T>().map(&get))
    }

    fn insert_standard_property(
        &mut self,
        class: ClassId,
        name: &str,
        kind: ValueKind,
        getter: StandardGetter,
        setter: Option<StandardSetter>,
    ) -> Result<()> {
        let info = self
            .classes
            .get_mut(class.index())
            .ok_or_else(|| PrismError::unknown_type(format!("{:?}", class)))?;

        if info.standard_properties.contains_key(name) {
            return Err(PrismError::duplicate_registration(name, &info.name));
        }

        info.standard_properties.insert(
            name.to_string(),
            StandardProperty {
                name: name.to_string(),
                kind,
                getter,
                setter,
            },
        );
        Ok(())
    }

    /// Find a standard property on `class` or its ancestors
    pub fn find_standard_property(&self, class: ClassId, name: &str) -> Option<&StandardProperty> {
        self.ancestors(class)
            .iter()
            .filter_map(|id| self.get(*id))
            .find_map(|info| info.standard_properties.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Label {
        text: String,
        length: usize,
    }

    #[test]
    fn test_ancestors_are_precomputed() {
        let mut classes = ClassRegistry::new();
        let object = classes.register_root("DependencyObject", ClassKind::DependencyObject).unwrap();
        let element = classes.register("UIElement", object).unwrap();
        let button = classes.register("Button", element).unwrap();

        assert_eq!(classes.ancestors(button), &[button, element, object]);
        assert!(classes.is_subclass_of(button, object));
        assert!(!classes.is_subclass_of(object, button));
        assert!(classes.supports_dependency_properties(button));
    }

    #[test]
    fn test_duplicate_and_unknown_classes() {
        let mut classes = ClassRegistry::new();
        classes.register_root("Model", ClassKind::Plain).unwrap();

        assert!(matches!(
            classes.register_root("Model", ClassKind::Plain),
            Err(PrismError::DuplicateRegistration { .. })
        ));
        assert!(matches!(classes.lookup("Bogus"), Err(PrismError::UnknownType { .. })));
    }

    #[test]
    fn test_standard_property_accessors() {
        let mut classes = ClassRegistry::new();
        let label = classes.register_root("Label", ClassKind::Plain).unwrap();
        let fancy = classes.register("FancyLabel", label).unwrap();

        classes
            .register_standard_property::<Label, _, _>(
                label,
                "Text",
                ValueKind::String,
                |l| Value::from(l.text.as_str()),
                |l, v| {
                    l.text = v.as_str().unwrap_or_default().to_string();
                    Ok(())
                },
            )
            .unwrap();
        classes
            .register_read_only_property::<Label, _>(label, "Length", ValueKind::Int, |l| {
                Value::Int(l.length as i64)
            })
            .unwrap();

        let mut state = Label::default();
        let text = classes.find_standard_property(fancy, "Text").unwrap();
        text.set("FancyLabel", &mut state, Value::from("hello")).unwrap();
        assert_eq!(text.get(&state), Some(Value::from("hello")));

        let length = classes.find_standard_property(fancy, "Length").unwrap();
        assert!(!length.is_writable());
        assert!(matches!(
            length.set("FancyLabel", &mut state, Value::Int(3)),
            Err(PrismError::InvalidTarget { .. })
        ));

        // Wrong native state type
        let mut wrong = 5u8;
        assert!(matches!(
            text.set("FancyLabel", &mut wrong, Value::from("x")),
            Err(PrismError::InvalidTarget { .. })
        ));
    }
}
