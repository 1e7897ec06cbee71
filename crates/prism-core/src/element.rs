//! Elements and their layered property storage

use crate::class::ClassId;
use crate::property::PropertyId;
use crate::value::Value;
use bitflags::bitflags;
use smallvec::SmallVec;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

slotmap::new_key_type! {
    /// Key of an element in an [`ElementTree`](crate::tree::ElementTree)
    pub struct ElementId;
}

bitflags! {
    /// Pending layout work on an element
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InvalidationFlags: u8 {
        const MEASURE = 1 << 0;
        const ARRANGE = 1 << 1;
    }
}

/// Value layer a property value is stored in, strongest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueLayer {
    Local,
    Triggered,
    Styled,
}

/// Where an element's effective value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueSource {
    Local,
    Triggered,
    Styled,
    Inherited,
    Default,
}

impl From<ValueLayer> for ValueSource {
    fn from(layer: ValueLayer) -> Self {
        match layer {
            ValueLayer::Local => ValueSource::Local,
            ValueLayer::Triggered => ValueSource::Triggered,
            ValueLayer::Styled => ValueSource::Styled,
        }
    }
}

/// Writer of a Triggered layer value.
///
/// Several active triggers may set the same property. Each keeps its own
/// entry and the most recently written entry is the layer's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriggerSource(u64);

impl TriggerSource {
    /// Writer behind [`ElementTree::set_triggered_value`](crate::tree::ElementTree::set_triggered_value)
    pub const ANONYMOUS: Self = Self(0);

    /// A source distinct from every other one allocated in this process
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

type TriggeredWriters = SmallVec<[(TriggerSource, Value); 1]>;

/// Sparse per-element storage. Properties that were never written have no entry.
#[derive(Debug, Default, Clone)]
pub struct PropertyStore {
    local: HashMap<PropertyId, Value>,
    triggered: HashMap<PropertyId, TriggeredWriters>,
    styled: HashMap<PropertyId, Value>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, layer: ValueLayer, property: PropertyId) -> Option<&Value> {
        match layer {
            ValueLayer::Local => self.local.get(&property),
            ValueLayer::Triggered => self
                .triggered
                .get(&property)
                .and_then(|writers| writers.last())
                .map(|(_, value)| value),
            ValueLayer::Styled => self.styled.get(&property),
        }
    }

    /// Store or remove a layer value, returning the previous one.
    ///
    /// Triggered values written here belong to [`TriggerSource::ANONYMOUS`].
    pub fn set(&mut self, layer: ValueLayer, property: PropertyId, value: Option<Value>) -> Option<Value> {
        let map = match layer {
            ValueLayer::Local => &mut self.local,
            ValueLayer::Styled => &mut self.styled,
            ValueLayer::Triggered => return self.set_triggered(property, TriggerSource::ANONYMOUS, value),
        };
        match value {
            Some(value) => map.insert(property, value),
            None => map.remove(&property),
        }
    }

    /// Store or remove the Triggered value of one writer, returning its previous value.
    /// A store moves the writer on top.
    pub fn set_triggered(
        &mut self,
        property: PropertyId,
        source: TriggerSource,
        value: Option<Value>,
    ) -> Option<Value> {
        let writers = self.triggered.entry(property).or_default();
        let previous = writers
            .iter()
            .position(|(s, _)| *s == source)
            .map(|index| writers.remove(index).1);
        if let Some(value) = value {
            writers.push((source, value));
        }
        if writers.is_empty() {
            self.triggered.remove(&property);
        }
        previous
    }

    /// Number of writers holding a Triggered value for `property`
    pub fn triggered_writers(&self, property: PropertyId) -> usize {
        self.triggered.get(&property).map_or(0, |writers| writers.len())
    }

    /// Strongest stored value and its layer
    pub fn strongest(&self, property: PropertyId) -> Option<(ValueLayer, &Value)> {
        [ValueLayer::Local, ValueLayer::Triggered, ValueLayer::Styled]
            .into_iter()
            .find_map(|layer| self.get(layer, property).map(|v| (layer, v)))
    }

/// Properties holding a value in `layer`
    pub fn properties_in(&self, layer: ValueLayer) -> Vec<PropertyId> {
        let mut ids: Vec<_> = match layer {
            ValueLayer::Local => self.local.keys().copied().collect(),
            ValueLayer::Triggered => self.triggered.keys().copied().collect(),
            ValueLayer::Styled => self.styled.keys().copied().collect(),
        };
        ids.sort();
        ids
    }
}

/// A node of the element tree.
///
/// The parent link is a plain key used for inheritance lookups; the element
/// does not own its parent. Children are listed in order and removed together
/// with their parent.
pub struct Element {
    pub(crate) class: ClassId,
    pub(crate) name: Option<String>,
    pub(crate) style_classes: SmallVec<[String; 2]>,
    pub(crate) parent: Option<ElementId>,
    pub(crate) children: SmallVec<[ElementId; 4]>,
    /// `None` when the class is not a dependency object
    pub(crate) properties: Option<PropertyStore>,
    pub(crate) invalidation: InvalidationFlags,
    pub(crate) state: Box<dyn Any + Send + Sync>,
}

impl Element {
    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn style_classes(&self) -> &[String] {
        &self.style_classes
    }

    pub fn has_style_class(&self, class: &str) -> bool {
        self.style_classes.iter().any(|c| c == class)
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    pub fn is_dependency_object(&self) -> bool {
        self.properties.is_some()
    }

    pub fn properties(&self) -> Option<&PropertyStore> {
        self.properties.as_ref()
    }

    pub fn invalidation(&self) -> InvalidationFlags {
        self.invalidation
    }

    pub fn state<T: Any>(&self) -> Option<&T> {
        self.state.downcast_ref()
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("class", &self.class)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("dependency_object", &self.is_dependency_object())
            .field("invalidation", &self.invalidation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: u32) -> PropertyId {
        PropertyId::from_raw(n)
    }

    #[test]
    fn test_strongest_layer_wins() {
        let p = pid(0);
        let mut store = PropertyStore::new();
        store.set(ValueLayer::Styled, p, Some(Value::Int(1)));
        assert_eq!(store.strongest(p), Some((ValueLayer::Styled, &Value::Int(1))));

        store.set(ValueLayer::Triggered, p, Some(Value::Int(2)));
        assert_eq!(store.strongest(p), Some((ValueLayer::Triggered, &Value::Int(2))));

        store.set(ValueLayer::Local, p, Some(Value::Int(3)));
        assert_eq!(store.strongest(p), Some((ValueLayer::Local, &Value::Int(3))));

        assert_eq!(store.set(ValueLayer::Local, p, None), Some(Value::Int(3)));
        assert_eq!(store.strongest(p), Some((ValueLayer::Triggered, &Value::Int(2))));
    }

    #[test]
    fn test_properties_in_layer() {
        let a = pid(0);
        let b = pid(1);
        let mut store = PropertyStore::new();
        store.set(ValueLayer::Styled, b, Some(Value::Int(1)));
        store.set(ValueLayer::Styled, a, Some(Value::Int(1)));
        assert_eq!(store.properties_in(ValueLayer::Styled).len(), 2);
        assert!(store.properties_in(ValueLayer::Local).is_empty());
    }

    #[test]
    fn test_triggered_writers_stack() {
        let p = pid(0);
        let hover = TriggerSource::next();
        let pressed = TriggerSource::next();
        let mut store = PropertyStore::new();

        store.set_triggered(p, hover, Some(Value::Int(100)));
        store.set_triggered(p, pressed, Some(Value::Int(200)));
        assert_eq!(store.get(ValueLayer::Triggered, p), Some(&Value::Int(200)));
        assert_eq!(store.triggered_writers(p), 2);

        assert_eq!(store.set_triggered(p, pressed, None), Some(Value::Int(200)));
        assert_eq!(store.get(ValueLayer::Triggered, p), Some(&Value::Int(100)));

        // Clearing a writer that holds nothing leaves the others alone
        assert_eq!(store.set_triggered(p, pressed, None), None);
        assert_eq!(store.set(ValueLayer::Triggered, p, None), None);
        assert_eq!(store.get(ValueLayer::Triggered, p), Some(&Value::Int(100)));

        store.set_triggered(p, hover, None);
        assert_eq!(store.get(ValueLayer::Triggered, p), None);
        assert!(store.properties_in(ValueLayer::Triggered).is_empty());
    }
}
