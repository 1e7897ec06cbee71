//! Element tree: dependency objects, their values and invalidation
//!
//! Effective values resolve as Local > Triggered > Styled > Inherited >
//! Default. Every layer write funnels through one change path, which compares
//! the effective value before and after the write and does nothing else when
//! they are equal. Otherwise it runs the property's change callback, then
//! marks measure/arrange dirty as the metadata asks, and for inheriting
//! properties walks the descendants parent-first.

use crate::class::ClassId;
use crate::content::PresentationView;
use crate::element::{
    Element, ElementId, InvalidationFlags, PropertyStore, TriggerSource, ValueLayer, ValueSource,
};
use crate::error::{PrismError, Result};
use crate::property::{PropertyChange, PropertyFlags, PropertyId, PropertyRegistry};
use crate::value::{PropertyValue, Value};
use slotmap::SlotMap;
use smallvec::SmallVec;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Arena of elements sharing one property registry
pub struct ElementTree {
    registry: Arc<PropertyRegistry>,
    elements: SlotMap<ElementId, Element>,
    views: HashMap<ElementId, Arc<PresentationView>>,
}

impl ElementTree {
    pub fn new(registry: Arc<PropertyRegistry>) -> Self {
        Self {
            registry,
            elements: SlotMap::with_key(),
            views: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<PropertyRegistry> {
        &self.registry
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(id)
    }

    // ---------------------------------------------------------------------
    // Structure
    // ---------------------------------------------------------------------

    /// Create a detached element of `class` with no native state
    pub fn create(&mut self, class: ClassId) -> Result<ElementId> {
        self.create_with_state(class, Box::new(()))
    }

    /// Create a detached element of `class` owning `state`
    pub fn create_with_state(
        &mut self,
        class: ClassId,
        state: Box<dyn Any + Send + Sync>,
    ) -> Result<ElementId> {
        let classes = self.registry.classes();
        if classes.get(class).is_none() {
            return Err(PrismError::unknown_type(format!("{:?}", class)));
        }

        let properties = classes
            .supports_dependency_properties(class)
            .then(PropertyStore::new);

        Ok(self.elements.insert(Element {
            class,
            name: None,
            style_classes: SmallVec::new(),
            parent: None,
            children: SmallVec::new(),
            properties,
            invalidation: InvalidationFlags::MEASURE | InvalidationFlags::ARRANGE,
            state,
        }))
    }

    /// Remove an element and its whole subtree. Returns the removed ids, parent first.
    ///
    /// Per-element state kept outside the tree, such as trigger states, is not
    /// touched; pass the returned ids to its owner (`Trigger::forget`,
    /// `CompositeUvssDocument::forget`).
    pub fn remove(&mut self, id: ElementId) -> Result<Vec<ElementId>> {
        let parent = self.element(id)?.parent;
        if let Some(parent) = parent {
            if let Some(parent) = self.elements.get_mut(parent) {
                parent.children.retain(|c| *c != id);
                parent.invalidation |= InvalidationFlags::MEASURE;
            }
        }

        let doomed = self.descendants(id);
        for element in &doomed {
            self.elements.remove(*element);
            self.views.remove(element);
        }
        Ok(doomed)
    }

    pub fn try_element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn element(&self, id: ElementId) -> Result<&Element> {
        self.elements
            .get(id)
            .ok_or_else(|| PrismError::element_not_found(format!("{:?}", id)))
    }

    fn element_mut(&mut self, id: ElementId) -> Result<&mut Element> {
        self.elements
            .get_mut(id)
            .ok_or_else(|| PrismError::element_not_found(format!("{:?}", id)))
    }

    pub fn class_of(&self, id: ElementId) -> Result<ClassId> {
        Ok(self.element(id)?.class)
    }

    pub fn class_name(&self, id: ElementId) -> &str {
        self.elements
            .get(id)
            .map(|e| self.registry.classes().name(e.class))
            .unwrap_or("<removed>")
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.elements.get(id)?.parent
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.elements
            .get(id)
            .map(|e| e.children.as_slice())
            .unwrap_or(&[])
    }

    /// `root` and every element below it, parent before children
    pub fn descendants(&self, root: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(element) = self.elements.get(id) {
                out.push(id);
                stack.extend(element.children.iter().rev().copied());
            }
        }
        out
    }

    pub fn is_dependency_object(&self, id: ElementId) -> bool {
        self.elements
            .get(id)
            .map(Element::is_dependency_object)
            .unwrap_or(false)
    }

    pub fn set_name(&mut self, id: ElementId, name: Option<String>) -> Result<()> {
        self.element_mut(id)?.name = name;
        Ok(())
    }

    /// First element named `name` in `root`'s subtree, in pre-order
    pub fn find_by_name(&self, root: ElementId, name: &str) -> Option<ElementId> {
        self.descendants(root)
            .into_iter()
            .find(|id| self.elements[*id].name.as_deref() == Some(name))
    }

    pub fn add_style_class(&mut self, id: ElementId, class: &str) -> Result<()> {
        let element = self.element_mut(id)?;
        if !element.has_style_class(class) {
            element.style_classes.push(class.to_string());
        }
        Ok(())
    }

    pub fn remove_style_class(&mut self, id: ElementId, class: &str) -> Result<()> {
        self.element_mut(id)?.style_classes.retain(|c| c != class);
        Ok(())
    }

    /// Append `child` to `parent`'s children.
    ///
    /// Inheriting properties whose effective value changes on the child because
    /// of its new parent are reported through the normal change path.
    pub fn attach_child(&mut self, parent: ElementId, child: ElementId) -> Result<()> {
        self.element(parent)?;
        if let Some(existing) = self.element(child)?.parent {
            return Err(PrismError::invalid_operation(format!(
                "{:?} is already a child of {:?}",
                child, existing
            )));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(PrismError::invalid_operation(format!(
                "Attaching {:?} under {:?} would create a cycle",
                child, parent
            )));
        }

        self.relink(child, |tree| {
            if let Some(p) = tree.elements.get_mut(parent) {
                p.children.push(child);
                p.invalidation |= InvalidationFlags::MEASURE;
            }
            if let Some(c) = tree.elements.get_mut(child) {
                c.parent = Some(parent);
            }
        })
    }

    /// Detach `child` from its parent, keeping it alive as a root
    pub fn detach(&mut self, child: ElementId) -> Result<()> {
        let Some(parent) = self.element(child)?.parent else {
            return Ok(());
        };

        self.relink(child, |tree| {
            if let Some(p) = tree.elements.get_mut(parent) {
                p.children.retain(|c| *c != child);
                p.invalidation |= InvalidationFlags::MEASURE;
            }
            if let Some(c) = tree.elements.get_mut(child) {
                c.parent = None;
            }
        })
    }

    fn is_ancestor_or_self(&self, ancestor: ElementId, id: ElementId) -> bool {
        let mut current = Some(id);
        while let Some(cur) = current {
            if cur == ancestor {
                return true;
            }
            current = self.elements.get(cur).and_then(|e| e.parent);
        }
        false
    }

    /// Re-parent through `link`, then report inherited values that changed
    fn relink(&mut self, child: ElementId, link: impl FnOnce(&mut Self)) -> Result<()> {
        let inheriting = self.registry.inheriting_properties();
        let frontier = self.dependency_frontier(child);

        let mut before = Vec::with_capacity(inheriting.len() * frontier.len());
        for element in &frontier {
            for property in &inheriting {
                before.push((*element, *property, self.effective(*element, *property)?.0));
            }
        }

        link(self);

        for (element, property, old) in before {
            if !self.contains(element) {
                continue;
            }
            let new = self.effective(element, property)?.0;
            if old != new {
                self.notify_changed(element, property, old, new);
            }
        }
        Ok(())
    }

    /// Topmost dependency objects at or below `id`
    fn dependency_frontier(&self, id: ElementId) -> Vec<ElementId> {
        match self.elements.get(id) {
            Some(element) if element.is_dependency_object() => vec![id],
            Some(element) => element
                .children
                .iter()
                .flat_map(|child| self.dependency_frontier(*child))
                .collect(),
            None => Vec::new(),
        }
    }

    // ---------------------------------------------------------------------
    // Dependency property values
    // ---------------------------------------------------------------------

    /// Effective value of `property` on `id`
    pub fn get_value(&self, id: ElementId, property: PropertyId) -> Result<Value> {
        Ok(self.effective(id, property)?.0)
    }

    /// Effective value of `property` on `id`, converted to `T`
    pub fn get<T: PropertyValue>(&self, id: ElementId, property: PropertyId) -> Result<T> {
        let value = self.get_value(id, property)?;
        T::from_value(&value).ok_or_else(|| {
            PrismError::type_mismatch(
                self.registry.name(property),
                std::any::type_name::<T>(),
                value.type_name(),
            )
        })
    }

    /// Layer or fallback that supplies the effective value
    pub fn value_source(&self, id: ElementId, property: PropertyId) -> Result<ValueSource> {
        Ok(self.effective(id, property)?.1)
    }

    /// Value stored in one layer, if any
    pub fn layer_value(&self, id: ElementId, property: PropertyId, layer: ValueLayer) -> Option<&Value> {
        self.elements.get(id)?.properties.as_ref()?.get(layer, property)
    }

    pub fn has_local_value(&self, id: ElementId, property: PropertyId) -> bool {
        self.layer_value(id, property, ValueLayer::Local).is_some()
    }

    /// Properties currently holding a value in `layer`
    pub fn properties_in_layer(&self, id: ElementId, layer: ValueLayer) -> Vec<PropertyId> {
        self.elements
            .get(id)
            .and_then(|e| e.properties.as_ref())
            .map(|store| store.properties_in(layer))
            .unwrap_or_default()
    }

    pub fn set_value(&mut self, id: ElementId, property: PropertyId, value: impl Into<Value>) -> Result<()> {
        self.set_layer_value(id, property, ValueLayer::Local, Some(value.into()))
            .map(|_| ())
    }

    pub fn clear_local_value(&mut self, id: ElementId, property: PropertyId) -> Result<()> {
        self.set_layer_value(id, property, ValueLayer::Local, None).map(|_| ())
    }

    pub fn set_styled_value(&mut self, id: ElementId, property: PropertyId, value: impl Into<Value>) -> Result<()> {
        self.set_layer_value(id, property, ValueLayer::Styled, Some(value.into()))
            .map(|_| ())
    }

    pub fn clear_styled_value(&mut self, id: ElementId, property: PropertyId) -> Result<()> {
        self.set_layer_value(id, property, ValueLayer::Styled, None).map(|_| ())
    }

    pub fn set_triggered_value(&mut self, id: ElementId, property: PropertyId, value: impl Into<Value>) -> Result<()> {
        self.set_layer_value(id, property, ValueLayer::Triggered, Some(value.into()))
            .map(|_| ())
    }

    pub fn clear_triggered_value(&mut self, id: ElementId, property: PropertyId) -> Result<()> {
        self.set_layer_value(id, property, ValueLayer::Triggered, None)
            .map(|_| ())
    }

    /// Write (`Some`) or clear (`None`) one layer value. Returns whether the
    /// effective value changed.
    ///
    /// Triggered values written here belong to [`TriggerSource::ANONYMOUS`].
    pub fn set_layer_value(
        &mut self,
        id: ElementId,
        property: PropertyId,
        layer: ValueLayer,
        value: Option<Value>,
    ) -> Result<bool> {
        let value = self.prepare_value(id, property, value)?;
        self.write_layer(id, property, |store| {
            store.set(layer, property, value);
        })
    }

    /// Write or clear the Triggered value owned by `source`.
    ///
    /// Other writers of the same property keep their values; when `source`
    /// clears, the most recent remaining writer supplies the layer value.
    pub fn set_triggered_value_for(
        &mut self,
        id: ElementId,
        property: PropertyId,
        source: TriggerSource,
        value: Option<Value>,
    ) -> Result<bool> {
        let value = self.prepare_value(id, property, value)?;
        self.write_layer(id, property, |store| {
            store.set_triggered(property, source, value);
        })
    }

    /// Check the target and convert `value` to the property's kind, then coerce it
    fn prepare_value(&self, id: ElementId, property: PropertyId, value: Option<Value>) -> Result<Option<Value>> {
        let class = self.require_dependency_object(id, property)?;
        let definition = self.registry.definition(property).ok_or_else(|| {
            PrismError::property_not_found(format!("#{}", property.index()), self.registry.classes().name(class))
        })?;

        match value {
            Some(value) => {
                let actual = value.type_name();
                let value = definition.kind.coerce(value).ok_or_else(|| {
                    PrismError::type_mismatch(&definition.name, definition.kind.as_str(), actual)
                })?;
                Ok(Some(self.registry.metadata(property, class)?.coerce(value)))
            }
            None => Ok(None),
        }
    }

    /// Single change path for every layer write
    fn write_layer(
        &mut self,
        id: ElementId,
        property: PropertyId,
        store_value: impl FnOnce(&mut PropertyStore),
    ) -> Result<bool> {
        let (old, _) = self.effective(id, property)?;
        if let Some(store) = self.elements.get_mut(id).and_then(|e| e.properties.as_mut()) {
            store_value(store);
        }
        let (new, _) = self.effective(id, property)?;

        if old == new {
            return Ok(false);
        }

        tracing::trace!(
            property = %self.registry.name(property),
            %old,
            %new,
            "Effective value changed"
        );
        self.notify_changed(id, property, old, new);
        Ok(true)
    }

    fn require_dependency_object(&self, id: ElementId, property: PropertyId) -> Result<ClassId> {
        let element = self.element(id)?;
        if element.is_dependency_object() {
            Ok(element.class)
        } else {
            Err(PrismError::invalid_target(
                self.registry.name(property),
                self.registry.classes().name(element.class),
                "element is not a dependency object",
            ))
        }
    }

    /// Resolve the effective value and its source
    fn effective(&self, id: ElementId, property: PropertyId) -> Result<(Value, ValueSource)> {
        self.require_dependency_object(id, property)?;

        let mut current = id;
        let mut inherited = false;
        loop {
            let element = &self.elements[current];
            // Plain elements are skipped when walking up, so every visited
            // element here has a store.
            let store = element
                .properties
                .as_ref()
                .ok_or_else(|| PrismError::invalid_operation("inheritance walk reached a plain element"))?;

            if let Some((layer, value)) = store.strongest(property) {
                let source = if inherited {
                    ValueSource::Inherited
                } else {
                    layer.into()
                };
                return Ok((value.clone(), source));
            }

            let metadata = self.registry.metadata(property, element.class)?;
            match self.dependency_parent(current) {
                Some(parent) if metadata.inherits() => {
                    current = parent;
                    inherited = true;
                }
                _ => return Ok((metadata.default_value().clone(), ValueSource::Default)),
            }
        }
    }

    /// Nearest ancestor that is a dependency object
    fn dependency_parent(&self, id: ElementId) -> Option<ElementId> {
        let mut current = self.elements.get(id)?.parent;
        while let Some(candidate) = current {
            let element = self.elements.get(candidate)?;
            if element.is_dependency_object() {
                return Some(candidate);
            }
            current = element.parent;
        }
        None
    }

    fn notify_changed(&mut self, id: ElementId, property: PropertyId, old: Value, new: Value) {
        let registry = Arc::clone(&self.registry);
        let Some(class) = self.elements.get(id).map(|e| e.class) else {
            return;
        };
        let Ok(metadata) = registry.metadata(property, class) else {
            return;
        };

        let change = PropertyChange { property, old, new };
        if let Some(callback) = metadata.changed_callback() {
            callback(self, id, &change);
        }

        let flags = metadata.flags();
        let mut dirty = InvalidationFlags::empty();
        if flags.contains(PropertyFlags::AFFECTS_MEASURE) {
            dirty |= InvalidationFlags::MEASURE;
        }
        if flags.contains(PropertyFlags::AFFECTS_ARRANGE) {
            dirty |= InvalidationFlags::ARRANGE;
        }
        if let Some(element) = self.elements.get_mut(id) {
            element.invalidation |= dirty;
        }

        if metadata.inherits() {
            self.propagate_inherited(id, &change);
        }
    }

    /// Pre-order walk below `id` for an inherited value change
    fn propagate_inherited(&mut self, id: ElementId, change: &PropertyChange) {
        let children: SmallVec<[ElementId; 4]> = match self.elements.get(id) {
            Some(element) => element.children.clone(),
            None => return,
        };

        for child in children {
            let Some(element) = self.elements.get(child) else {
                continue;
            };

            match &element.properties {
                // Plain elements pass inherited values through to their children
                None => self.propagate_inherited(child, change),
                Some(store) => {
                    if store.strongest(change.property).is_some() {
                        continue;
                    }
                    let inherits = self
                        .registry
                        .metadata(change.property, element.class)
                        .map(|m| m.inherits())
                        .unwrap_or(false);
                    if inherits {
                        self.notify_changed(child, change.property, change.old.clone(), change.new.clone());
                    }
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Invalidation
    // ---------------------------------------------------------------------

    pub fn invalidation(&self, id: ElementId) -> InvalidationFlags {
        self.elements
            .get(id)
            .map(|e| e.invalidation)
            .unwrap_or_default()
    }

    pub fn invalidate(&mut self, id: ElementId, flags: InvalidationFlags) -> Result<()> {
        self.element_mut(id)?.invalidation |= flags;
        Ok(())
    }

    /// Return and clear the pending invalidation of `id`, as a layout pass would
    pub fn take_invalidation(&mut self, id: ElementId) -> InvalidationFlags {
        self.elements
            .get_mut(id)
            .map(|e| std::mem::take(&mut e.invalidation))
            .unwrap_or_default()
    }

    // ---------------------------------------------------------------------
    // Standard properties and native state
    // ---------------------------------------------------------------------

    /// Write a standard (non-dependency) property through the class accessor table
    pub fn set_standard_property(&mut self, id: ElementId, name: &str, value: Value) -> Result<()> {
        let registry = Arc::clone(&self.registry);
        let element = self.element_mut(id)?;
        let class_name = registry.classes().name(element.class);

        let property = registry
            .classes()
            .find_standard_property(element.class, name)
            .ok_or_else(|| PrismError::invalid_target(name, class_name, "no such property"))?;

        if !property.is_writable() {
            return Err(PrismError::invalid_target(name, class_name, "property is read-only"));
        }

        let actual = value.type_name();
        let value = property
            .kind
            .coerce(value)
            .ok_or_else(|| PrismError::type_mismatch(name, property.kind.as_str(), actual))?;

        property.set(class_name, element.state.as_mut(), value)
    }

    /// Read a standard property through the class accessor table
    pub fn get_standard_property(&self, id: ElementId, name: &str) -> Result<Value> {
        let element = self.element(id)?;
        let classes = self.registry.classes();
        let class_name = classes.name(element.class);

        let property = classes
            .find_standard_property(element.class, name)
            .ok_or_else(|| PrismError::invalid_target(name, class_name, "no such property"))?;

        property.get(element.state.as_ref()).ok_or_else(|| {
            PrismError::invalid_target(name, class_name, "element state has an unexpected type")
        })
    }

    pub fn state<T: Any>(&self, id: ElementId) -> Option<&T> {
        self.elements.get(id)?.state.downcast_ref()
    }

    pub fn state_mut<T: Any>(&mut self, id: ElementId) -> Option<&mut T> {
        self.elements.get_mut(id)?.state.downcast_mut()
    }

    // ---------------------------------------------------------------------
    // Views
    // ---------------------------------------------------------------------

    /// Present the subtree rooted at `root` in `view`
    pub fn attach_view(&mut self, root: ElementId, view: Arc<PresentationView>) -> Result<()> {
        self.element(root)?;
        self.views.insert(root, view);
        Ok(())
    }

    pub fn detach_view(&mut self, root: ElementId) -> Option<Arc<PresentationView>> {
        self.views.remove(&root)
    }

    /// View of the nearest ancestor (or self) with one attached
    pub fn view_of(&self, id: ElementId) -> Option<Arc<PresentationView>> {
        let mut current = Some(id);
        while let Some(cur) = current {
            if let Some(view) = self.views.get(&cur) {
                return Some(Arc::clone(view));
            }
            current = self.elements.get(cur)?.parent;
        }
        None
    }
}

impl std::fmt::Debug for ElementTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementTree")
            .field("elements", &self.elements.len())
            .field("views", &self.views.len())
            .field("properties", &self.registry.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassKind;
    use crate::property::PropertyMetadata;
    use crate::value::ValueKind;

    struct Fixture {
        tree: ElementTree,
        panel: ClassId,
        model: ClassId,
        opacity: PropertyId,
        width: PropertyId,
    }

    fn fixture() -> Fixture {
        let mut registry = PropertyRegistry::new();
        let visual = registry
            .register_root_class("Visual", ClassKind::DependencyObject)
            .unwrap();
        let panel = registry.register_class("Panel", visual).unwrap();
        let model = registry.register_root_class("Model", ClassKind::Plain).unwrap();
        let opacity = registry
            .register(
                "Opacity",
                ValueKind::Double,
                visual,
                PropertyMetadata::new(1.0).with_flags(PropertyFlags::INHERITS),
            )
            .unwrap();
        let width = registry
            .register(
                "Width",
                ValueKind::Double,
                visual,
                PropertyMetadata::new(f64::NAN).with_flags(PropertyFlags::AFFECTS_MEASURE),
            )
            .unwrap();

        Fixture {
            tree: ElementTree::new(Arc::new(registry)),
            panel,
            model,
            opacity,
            width,
        }
    }

    #[test]
    fn test_value_sources() {
        let Fixture { mut tree, panel, opacity, .. } = fixture();
        let parent = tree.create(panel).unwrap();
        let child = tree.create(panel).unwrap();
        tree.attach_child(parent, child).unwrap();

        assert_eq!(tree.value_source(child, opacity).unwrap(), ValueSource::Default);

        tree.set_styled_value(parent, opacity, 0.8).unwrap();
        assert_eq!(tree.value_source(child, opacity).unwrap(), ValueSource::Inherited);

        tree.set_styled_value(child, opacity, 0.7).unwrap();
        assert_eq!(tree.value_source(child, opacity).unwrap(), ValueSource::Styled);

        tree.set_triggered_value(child, opacity, 0.6).unwrap();
        assert_eq!(tree.value_source(child, opacity).unwrap(), ValueSource::Triggered);

        tree.set_value(child, opacity, 0.5).unwrap();
        assert_eq!(tree.value_source(child, opacity).unwrap(), ValueSource::Local);
        assert_eq!(tree.get::<f64>(child, opacity).unwrap(), 0.5);

        tree.clear_local_value(child, opacity).unwrap();
        assert_eq!(tree.get::<f64>(child, opacity).unwrap(), 0.6);
    }

    #[test]
    fn test_type_mismatch_is_rejected() {
        let Fixture { mut tree, panel, opacity, .. } = fixture();
        let element = tree.create(panel).unwrap();

        assert!(matches!(
            tree.set_value(element, opacity, "opaque"),
            Err(PrismError::TypeMismatch { .. })
        ));
        // Ints widen
        tree.set_value(element, opacity, 0).unwrap();
        assert_eq!(tree.get_value(element, opacity).unwrap(), Value::Double(0.0));
    }

    #[test]
    fn test_plain_elements_have_no_property_store() {
        let Fixture { mut tree, model, opacity, .. } = fixture();
        let element = tree.create(model).unwrap();

        assert!(!tree.is_dependency_object(element));
        assert!(matches!(
            tree.get_value(element, opacity),
            Err(PrismError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn test_nan_default_does_not_reinvalidate() {
        let Fixture { mut tree, panel, width, .. } = fixture();
        let element = tree.create(panel).unwrap();
        tree.take_invalidation(element);

        tree.set_value(element, width, f64::NAN).unwrap();
        assert!(tree.invalidation(element).is_empty());

        tree.set_value(element, width, 100.0).unwrap();
        assert!(tree.take_invalidation(element).contains(InvalidationFlags::MEASURE));
    }

    #[test]
    fn test_remove_takes_subtree_and_detaches() {
        let Fixture { mut tree, panel, .. } = fixture();
        let root = tree.create(panel).unwrap();
        let middle = tree.create(panel).unwrap();
        let leaf = tree.create(panel).unwrap();
        tree.attach_child(root, middle).unwrap();
        tree.attach_child(middle, leaf).unwrap();

        assert_eq!(tree.remove(middle).unwrap(), vec![middle, leaf]);
        assert!(tree.children(root).is_empty());
        assert!(!tree.contains(leaf));
        assert!(tree.try_element(leaf).is_none());
        assert_eq!(tree.try_element(root).map(|e| e.children().len()), Some(0));
        assert!(matches!(tree.element(leaf), Err(PrismError::ElementNotFound { .. })));
    }

    #[test]
    fn test_triggered_writers_resolve_to_latest() {
        let Fixture { mut tree, panel, opacity, .. } = fixture();
        let element = tree.create(panel).unwrap();
        let first = TriggerSource::next();
        let second = TriggerSource::next();

        assert!(tree.set_triggered_value_for(element, opacity, first, Some(Value::Double(0.3))).unwrap());
        assert!(tree.set_triggered_value_for(element, opacity, second, Some(Value::Double(0.6))).unwrap());
        assert_eq!(tree.get::<f64>(element, opacity).unwrap(), 0.6);

        // The anonymous writer has nothing to clear
        tree.clear_triggered_value(element, opacity).unwrap();
        assert_eq!(tree.get::<f64>(element, opacity).unwrap(), 0.6);

        assert!(tree.set_triggered_value_for(element, opacity, second, None).unwrap());
        assert_eq!(tree.get::<f64>(element, opacity).unwrap(), 0.3);
        assert!(tree.set_triggered_value_for(element, opacity, first, None).unwrap());
        assert_eq!(tree.value_source(element, opacity).unwrap(), ValueSource::Default);
    }

    #[test]
    fn test_attach_rejects_cycles_and_second_parent() {
        let Fixture { mut tree, panel, .. } = fixture();
        let a = tree.create(panel).unwrap();
        let b = tree.create(panel).unwrap();
        let c = tree.create(panel).unwrap();
        tree.attach_child(a, b).unwrap();

        assert!(matches!(
            tree.attach_child(b, a),
            Err(PrismError::InvalidOperation { .. })
        ));
        assert!(matches!(
            tree.attach_child(c, b),
            Err(PrismError::InvalidOperation { .. })
        ));

        tree.detach(b).unwrap();
        tree.attach_child(c, b).unwrap();
        assert_eq!(tree.parent(b), Some(c));
    }

    #[test]
    fn test_inheritance_passes_through_plain_elements() {
        let Fixture { mut tree, panel, model, opacity, .. } = fixture();
        let root = tree.create(panel).unwrap();
        let holder = tree.create(model).unwrap();
        let leaf = tree.create(panel).unwrap();
        tree.attach_child(root, holder).unwrap();
        tree.attach_child(holder, leaf).unwrap();

        tree.set_value(root, opacity, 0.3).unwrap();
        assert_eq!(tree.get::<f64>(leaf, opacity).unwrap(), 0.3);
    }

    #[test]
    fn test_view_lookup_walks_ancestors() {
        let Fixture { mut tree, panel, .. } = fixture();
        let root = tree.create(panel).unwrap();
        let child = tree.create(panel).unwrap();
        tree.attach_child(root, child).unwrap();

        assert!(tree.view_of(child).is_none());
        tree.attach_view(root, Arc::new(PresentationView::new())).unwrap();
        assert!(tree.view_of(child).is_some());
    }
}
