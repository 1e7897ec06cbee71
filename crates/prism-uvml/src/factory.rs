//! Registry mapping UVML type names to element factories

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use prism_core::class::ClassId;
use prism_core::error::{PrismError, Result};
use prism_core::value::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Builds the native state of a new element from its construction arguments
pub type ElementFactory = Arc<dyn Fn(&[Value]) -> Result<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// Class and factory registered for one type name
#[derive(Clone)]
pub struct FactoryEntry {
    pub class: ClassId,
    pub factory: ElementFactory,
}

impl FactoryEntry {
    pub fn create(&self, args: &[Value]) -> Result<Box<dyn Any + Send + Sync>> {
        (self.factory)(args)
    }
}

impl fmt::Debug for FactoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryEntry").field("class", &self.class).finish()
    }
}

/// Registry for mapping type names to their factories.
///
/// Lookups are lock-free reads, so plugins may register types from their own
/// initialisation threads while templates are compiled elsewhere.
#[derive(Default)]
pub struct FactoryRegistry {
    entries: DashMap<String, FactoryEntry>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for `type_name`
    pub fn register<F>(&self, type_name: &str, class: ClassId, factory: F) -> Result<()>
    where
        F: Fn(&[Value]) -> Result<Box<dyn Any + Send + Sync>> + Send + Sync + 'static,
    {
        match self.entries.entry(type_name.to_string()) {
            Entry::Occupied(_) => Err(PrismError::duplicate_registration(type_name, "factory registry")),
            Entry::Vacant(slot) => {
                slot.insert(FactoryEntry {
                    class,
                    factory: Arc::new(factory),
                });
                tracing::debug!(type_name, ?class, "Registered element factory");
                Ok(())
            }
        }
    }

    /// Register a type whose native state is `T::default()` and which takes no arguments
    pub fn register_default<T>(&self, type_name: &str, class: ClassId) -> Result<()>
    where
        T: Default + Any + Send + Sync,
    {
        let name = type_name.to_string();
        self.register(type_name, class, move |args| {
            if !args.is_empty() {
                return Err(PrismError::template(format!(
                    "'{}' takes no construction arguments, got {}",
                    name,
                    args.len()
                )));
            }
            Ok(Box::new(T::default()))
        })
    }

    /// Look up the factory for `type_name`
    pub fn lookup(&self, type_name: &str) -> Result<FactoryEntry> {
        self.entries
            .get(type_name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| PrismError::unknown_type(type_name))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::class::{ClassKind, ClassRegistry};

    #[test]
    fn test_lookup_and_duplicates() {
        let mut classes = ClassRegistry::new();
        let button = classes.register_root("Button", ClassKind::DependencyObject).unwrap();

        let factories = FactoryRegistry::new();
        factories.register_default::<()>("Button", button).unwrap();

        assert_eq!(factories.lookup("Button").unwrap().class, button);
        assert!(matches!(
            factories.register_default::<()>("Button", button),
            Err(PrismError::DuplicateRegistration { .. })
        ));
        assert!(matches!(factories.lookup("Bogus"), Err(PrismError::UnknownType { .. })));
    }

    #[test]
    fn test_default_factory_rejects_arguments() {
        let mut classes = ClassRegistry::new();
        let label = classes.register_root("Label", ClassKind::Plain).unwrap();

        let factories = FactoryRegistry::new();
        factories.register_default::<String>("Label", label).unwrap();

        let entry = factories.lookup("Label").unwrap();
        assert!(entry.create(&[]).is_ok());
        assert!(matches!(
            entry.create(&[Value::Int(1)]),
            Err(PrismError::Template { .. })
        ));
    }
}
