//! Integration tests for dependency property registration, value resolution
//! and change propagation

use pretty_assertions::assert_eq;
use prism_core::prelude::*;
use prism_core::{InvalidationFlags, PropertyChange};
use std::sync::{Arc, Mutex};

type ChangeLog = Arc<Mutex<Vec<(ElementId, PropertyChange)>>>;

struct Fixture {
    registry: PropertyRegistry,
    visual: ClassId,
    panel: ClassId,
    log: ChangeLog,
}

fn fixture() -> Fixture {
    let mut registry = PropertyRegistry::new();
    let visual = registry
        .register_root_class("Visual", ClassKind::DependencyObject)
        .unwrap();
    let panel = registry.register_class("Panel", visual).unwrap();
    Fixture {
        registry,
        visual,
        panel,
        log: Arc::new(Mutex::new(Vec::new())),
    }
}

fn recording(default: impl Into<Value>, flags: PropertyFlags, log: &ChangeLog) -> PropertyMetadata {
    let log = Arc::clone(log);
    PropertyMetadata::new(default)
        .with_flags(flags)
        .on_changed(move |_tree, element, change| {
            log.lock().unwrap().push((element, change.clone()));
        })
}

#[test]
fn test_opacity_inherits_until_overridden_locally() {
    let mut registry = PropertyRegistry::new();
    let visual = registry
        .register_root_class("Visual", ClassKind::DependencyObject)
        .unwrap();
    let opacity = registry
        .register(
            "Opacity",
            ValueKind::Double,
            visual,
            PropertyMetadata::new(1.0).with_flags(PropertyFlags::INHERITS),
        )
        .unwrap();

    let mut tree = ElementTree::new(Arc::new(registry));
    let parent = tree.create(visual).unwrap();
    let child = tree.create(visual).unwrap();
    tree.attach_child(parent, child).unwrap();

    tree.set_value(parent, opacity, 0.5).unwrap();
    assert_eq!(tree.get::<f64>(child, opacity).unwrap(), 0.5);

    tree.set_value(child, opacity, 0.2).unwrap();
    assert_eq!(tree.get::<f64>(child, opacity).unwrap(), 0.2);
    assert_eq!(tree.get::<f64>(parent, opacity).unwrap(), 0.5);
}

#[test]
fn test_setting_equal_value_is_silent() {
    let Fixture { mut registry, visual, log, .. } = fixture();
    let width = registry
        .register(
            "Width",
            ValueKind::Double,
            visual,
            recording(
                0.0,
                PropertyFlags::AFFECTS_MEASURE | PropertyFlags::AFFECTS_ARRANGE,
                &log,
            ),
        )
        .unwrap();

    let mut tree = ElementTree::new(Arc::new(registry));
    let element = tree.create(visual).unwrap();
    tree.take_invalidation(element);

    // Equal to the default
    tree.set_value(element, width, 0.0).unwrap();
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(tree.invalidation(element), InvalidationFlags::empty());

    tree.set_value(element, width, 120.0).unwrap();
    assert_eq!(log.lock().unwrap().len(), 1);
    assert_eq!(
        tree.take_invalidation(element),
        InvalidationFlags::MEASURE | InvalidationFlags::ARRANGE
    );

    // Equal to the current local value
    tree.set_value(element, width, 120.0).unwrap();
    assert_eq!(log.lock().unwrap().len(), 1);
    assert_eq!(tree.invalidation(element), InvalidationFlags::empty());

    // A styled value beneath the local one does not change the effective value
    tree.set_styled_value(element, width, 80.0).unwrap();
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn test_callback_runs_before_invalidation() {
    let Fixture { mut registry, visual, .. } = fixture();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let width = registry
        .register(
            "Width",
            ValueKind::Double,
            visual,
            PropertyMetadata::new(0.0)
                .with_flags(PropertyFlags::AFFECTS_MEASURE)
                .on_changed(move |tree, element, _change| {
                    recorder.lock().unwrap().push(tree.invalidation(element));
                }),
        )
        .unwrap();

    let mut tree = ElementTree::new(Arc::new(registry));
    let element = tree.create(visual).unwrap();
    tree.take_invalidation(element);

    tree.set_value(element, width, 40.0).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![InvalidationFlags::empty()]);
    assert_eq!(tree.invalidation(element), InvalidationFlags::MEASURE);
}

#[test]
fn test_inherited_value_follows_parent_changes() {
    let Fixture { mut registry, visual, panel, log } = fixture();
    let font_size = registry
        .register(
            "FontSize",
            ValueKind::Double,
            visual,
            recording(12.0, PropertyFlags::INHERITS | PropertyFlags::AFFECTS_MEASURE, &log),
        )
        .unwrap();

    let mut tree = ElementTree::new(Arc::new(registry));
    let root = tree.create(panel).unwrap();
    tree.set_value(root, font_size, 16.0).unwrap();

    let child = tree.create(visual).unwrap();
    let grandchild = tree.create(visual).unwrap();
    tree.attach_child(child, grandchild).unwrap();
    log.lock().unwrap().clear();

    // Attaching reports the value the subtree now inherits
    tree.attach_child(root, child).unwrap();
    assert_eq!(tree.get::<f64>(child, font_size).unwrap(), 16.0);
    assert_eq!(tree.get::<f64>(grandchild, font_size).unwrap(), 16.0);
    assert_eq!(tree.value_source(grandchild, font_size).unwrap(), ValueSource::Inherited);
    let notified: Vec<_> = log.lock().unwrap().iter().map(|(e, _)| *e).collect();
    assert_eq!(notified, vec![child, grandchild]);

    log.lock().unwrap().clear();
    tree.take_invalidation(grandchild);
    tree.set_value(root, font_size, 20.0).unwrap();

    assert_eq!(tree.get::<f64>(grandchild, font_size).unwrap(), 20.0);
    assert!(tree.invalidation(grandchild).contains(InvalidationFlags::MEASURE));
    let notified: Vec<_> = log.lock().unwrap().iter().map(|(e, _)| *e).collect();
    assert_eq!(notified, vec![root, child, grandchild]);

    // Detaching falls back to the default
    log.lock().unwrap().clear();
    tree.detach(child).unwrap();
    assert_eq!(tree.get::<f64>(grandchild, font_size).unwrap(), 12.0);
    assert_eq!(log.lock().unwrap().len(), 2);
}

#[test]
fn test_local_value_stops_propagation() {
    let Fixture { mut registry, visual, log, .. } = fixture();
    let foreground = registry
        .register(
            "Foreground",
            ValueKind::Color,
            visual,
            recording(Color::BLACK, PropertyFlags::INHERITS, &log),
        )
        .unwrap();

    let mut tree = ElementTree::new(Arc::new(registry));
    let root = tree.create(visual).unwrap();
    let middle = tree.create(visual).unwrap();
    let leaf = tree.create(visual).unwrap();
    tree.attach_child(root, middle).unwrap();
    tree.attach_child(middle, leaf).unwrap();

    tree.set_value(middle, foreground, Color::WHITE).unwrap();
    log.lock().unwrap().clear();

    let red = Color::rgb(1.0, 0.0, 0.0);
    tree.set_value(root, foreground, red).unwrap();

    assert_eq!(tree.get::<Color>(middle, foreground).unwrap(), Color::WHITE);
    assert_eq!(tree.get::<Color>(leaf, foreground).unwrap(), Color::WHITE);
    let notified: Vec<_> = log.lock().unwrap().iter().map(|(e, _)| *e).collect();
    assert_eq!(notified, vec![root]);

    // Clearing the local value re-exposes the inherited one
    tree.clear_local_value(middle, foreground).unwrap();
    assert_eq!(tree.get::<Color>(leaf, foreground).unwrap(), red);
}

#[test]
fn test_metadata_override_resolution() {
    let mut registry = PropertyRegistry::new();
    let a = registry
        .register_root_class("A", ClassKind::DependencyObject)
        .unwrap();
    let b = registry.register_class("B", a).unwrap();
    let b_child = registry.register_class("BChild", b).unwrap();
    let c = registry
        .register_root_class("C", ClassKind::DependencyObject)
        .unwrap();

    let padding = registry
        .register("Padding", ValueKind::Double, a, PropertyMetadata::new(0.0))
        .unwrap();
    registry
        .override_metadata(
            padding,
            b,
            PropertyMetadata::new(4.0).with_flags(PropertyFlags::AFFECTS_MEASURE),
        )
        .unwrap();

    assert_eq!(
        registry.metadata(padding, b).unwrap().default_value(),
        &Value::Double(4.0)
    );
    assert_eq!(
        registry.metadata(padding, b_child).unwrap().default_value(),
        &Value::Double(4.0)
    );
    assert_eq!(
        registry.metadata(padding, a).unwrap().default_value(),
        &Value::Double(0.0)
    );
    assert!(registry.metadata(padding, a).unwrap().flags().is_empty());

    assert!(matches!(
        registry.resolve("Padding", c),
        Err(PrismError::PropertyNotFound { .. })
    ));

    // Elements see the override of their own class
    let mut tree = ElementTree::new(Arc::new(registry));
    let plain_a = tree.create(a).unwrap();
    let derived = tree.create(b_child).unwrap();
    assert_eq!(tree.get::<f64>(plain_a, padding).unwrap(), 0.0);
    assert_eq!(tree.get::<f64>(derived, padding).unwrap(), 4.0);
}

#[test]
fn test_duplicate_registration_fails() {
    let Fixture { mut registry, visual, panel, .. } = fixture();
    registry
        .register("Foo", ValueKind::Int, visual, PropertyMetadata::new(0))
        .unwrap();

    let err = registry
        .register("Foo", ValueKind::Int, visual, PropertyMetadata::new(0))
        .unwrap_err();
    assert!(matches!(err, PrismError::DuplicateRegistration { .. }));

    // A derived owner may declare its own property with the same name
    assert!(registry
        .register("Foo", ValueKind::Int, panel, PropertyMetadata::new(1))
        .is_ok());
}

#[test]
fn test_callbacks_may_write_other_properties() {
    let Fixture { mut registry, visual, .. } = fixture();
    let actual_width = registry
        .register("ActualWidth", ValueKind::Double, visual, PropertyMetadata::new(0.0))
        .unwrap();
    let width = registry
        .register(
            "Width",
            ValueKind::Double,
            visual,
            PropertyMetadata::new(0.0).on_changed(move |tree, element, change| {
                let doubled = change.new.as_f64().unwrap_or_default() * 2.0;
                tree.set_value(element, actual_width, doubled).unwrap();
            }),
        )
        .unwrap();

    let mut tree = ElementTree::new(Arc::new(registry));
    let element = tree.create(visual).unwrap();
    tree.set_value(element, width, 21.0).unwrap();
    assert_eq!(tree.get::<f64>(element, actual_width).unwrap(), 42.0);
}

#[test]
fn test_coerce_applies_before_comparison() {
    let Fixture { mut registry, visual, log, .. } = fixture();
    let opacity = registry
        .register(
            "Opacity",
            ValueKind::Double,
            visual,
            recording(1.0, PropertyFlags::empty(), &log).with_coerce(|value| {
                Value::Double(value.as_f64().unwrap_or(1.0).clamp(0.0, 1.0))
            }),
        )
        .unwrap();

    let mut tree = ElementTree::new(Arc::new(registry));
    let element = tree.create(visual).unwrap();

    // Clamps to the current value, so nothing changes
    tree.set_value(element, opacity, 3.0).unwrap();
    assert_eq!(tree.get::<f64>(element, opacity).unwrap(), 1.0);
    assert!(log.lock().unwrap().is_empty());

    tree.set_value(element, opacity, -1.0).unwrap();
    assert_eq!(tree.get::<f64>(element, opacity).unwrap(), 0.0);
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn test_standard_properties_on_plain_elements() {
    #[derive(Default)]
    struct Person {
        name: String,
        age: i64,
    }

    let mut registry = PropertyRegistry::new();
    let person = registry.register_root_class("Person", ClassKind::Plain).unwrap();
    registry
        .classes_mut()
        .register_standard_property::<Person, _, _>(
            person,
            "Name",
            ValueKind::String,
            |p| Value::from(p.name.as_str()),
            |p, v| {
                p.name = v.as_str().unwrap_or_default().to_string();
                Ok(())
            },
        )
        .unwrap();
    registry
        .classes_mut()
        .register_read_only_property::<Person, _>(person, "Age", ValueKind::Int, |p| Value::Int(p.age))
        .unwrap();

    let mut tree = ElementTree::new(Arc::new(registry));
    let element = tree
        .create_with_state(person, Box::new(Person { name: String::new(), age: 30 }))
        .unwrap();

    tree.set_standard_property(element, "Name", Value::from("Ada")).unwrap();
    assert_eq!(tree.state::<Person>(element).unwrap().name, "Ada");
    assert_eq!(tree.get_standard_property(element, "Age").unwrap(), Value::Int(30));

    assert!(matches!(
        tree.set_standard_property(element, "Age", Value::Int(31)),
        Err(PrismError::InvalidTarget { .. })
    ));
    assert!(matches!(
        tree.set_standard_property(element, "Height", Value::Int(180)),
        Err(PrismError::InvalidTarget { .. })
    ));
    assert!(matches!(
        tree.set_standard_property(element, "Name", Value::Int(1)),
        Err(PrismError::TypeMismatch { .. })
    ));
}
