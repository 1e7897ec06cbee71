//! Dynamically typed property values
//!
//! Dependency properties, templates and style setters all exchange [`Value`],
//! a closed set of value shapes. Reference-like data travels as
//! [`Value::Element`] (an element in the tree) or [`Value::Object`] (an opaque
//! shared instance compared by identity).

use crate::element::ElementId;
use crate::types::Color;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque shared instance carried by a property value
#[derive(Clone)]
pub struct SharedObject(Arc<dyn Any + Send + Sync>);

impl SharedObject {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn from_arc(value: Arc<dyn Any + Send + Sync>) -> Self {
        Self(value)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }

    pub fn ptr_eq(&self, other: &SharedObject) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const (),
            Arc::as_ptr(&other.0) as *const (),
        )
    }
}

impl fmt::Debug for SharedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedObject({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// Value of a property
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(Arc<str>),
    Color(Color),
    Element(ElementId),
    Object(SharedObject),
}

/// Declared type of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Any,
    Bool,
    Int,
    Double,
    String,
    Color,
    Element,
    Object,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            // NaN must compare equal to itself or re-applying it never settles
            (Value::Double(a), Value::Double(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Color(a), Value::Color(b)) => a == b,
            (Value::Element(a), Value::Element(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Value {
    /// The kind of this value, `None` for `Null`
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(ValueKind::Bool),
            Value::Int(_) => Some(ValueKind::Int),
            Value::Double(_) => Some(ValueKind::Double),
            Value::String(_) => Some(ValueKind::String),
            Value::Color(_) => Some(ValueKind::Color),
            Value::Element(_) => Some(ValueKind::Element),
            Value::Object(_) => Some(ValueKind::Object),
        }
    }

    /// Human readable type name for diagnostics
    pub fn type_name(&self) -> &'static str {
        self.kind().map(|k| k.as_str()).unwrap_or("null")
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(&**s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<ElementId> {
        match self {
            Value::Element(id) => Some(*id),
            _ => None,
        }
    }

    /// Parse literal text into a value of the requested kind.
    pub fn parse(kind: ValueKind, text: &str, culture: &Culture) -> Option<Value> {
        let trimmed = text.trim();
        match kind {
            ValueKind::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            ValueKind::Int => trimmed.parse().ok().map(Value::Int),
            ValueKind::Double => culture.parse_f64(trimmed).map(Value::Double),
            ValueKind::String | ValueKind::Any => Some(Value::from(text)),
            ValueKind::Color => Color::from_hex(trimmed).map(Value::Color),
            ValueKind::Element | ValueKind::Object => None,
        }
    }

    /// Ordering used by trigger comparisons. Numbers compare numerically, strings
    /// lexically; everything else is unordered.
    pub fn partial_cmp_value(&self, other: &Value) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            _ => self.as_f64()?.partial_cmp(&other.as_f64()?),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "\"{}\"", v),
            Value::Color(c) => write!(f, "{}", c.to_hex()),
            Value::Element(id) => write!(f, "{:?}", id),
            Value::Object(o) => write!(f, "{:?}", o),
        }
    }
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Any => "any",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::Color => "color",
            ValueKind::Element => "element",
            ValueKind::Object => "object",
        }
    }

    /// Whether `Null` is a legal value of this kind
    pub fn is_nullable(&self) -> bool {
        matches!(
            self,
            ValueKind::Any | ValueKind::String | ValueKind::Element | ValueKind::Object
        )
    }

    /// Convert `value` to this kind, widening ints to doubles.
    pub fn coerce(&self, value: Value) -> Option<Value> {
        match (self, value) {
            (ValueKind::Any, v) => Some(v),
            (kind, Value::Null) if kind.is_nullable() => Some(Value::Null),
            (ValueKind::Double, Value::Int(v)) => Some(Value::Double(v as f64)),
            (kind, v) if v.kind() == Some(*kind) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Culture settings used when converting literal text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Culture {
    pub name: String,
    pub decimal_separator: char,
}

impl Culture {
    pub fn invariant() -> Self {
        Self {
            name: "invariant".to_string(),
            decimal_separator: '.',
        }
    }

    pub fn new(name: impl Into<String>, decimal_separator: char) -> Self {
        Self {
            name: name.into(),
            decimal_separator,
        }
    }

    fn parse_f64(&self, text: &str) -> Option<f64> {
        if self.decimal_separator == '.' {
            text.parse().ok()
        } else {
            if text.contains('.') {
                return None;
            }
            text.replace(self.decimal_separator, ".").parse().ok()
        }
    }
}

impl Default for Culture {
    fn default() -> Self {
        Self::invariant()
    }
}

/// Typed extraction of a [`Value`]
pub trait PropertyValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

impl PropertyValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl PropertyValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl PropertyValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl PropertyValue for i32 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(v) => i32::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl PropertyValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl PropertyValue for f32 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64().map(|v| v as f32)
    }
}

impl PropertyValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl PropertyValue for Arc<str> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl PropertyValue for Color {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Color(c) => Some(*c),
            _ => None,
        }
    }
}

impl PropertyValue for ElementId {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_element()
    }
}

impl<T: PropertyValue> PropertyValue for Option<T> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}
impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}
impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Double(v as f64)
    }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(Arc::from(v))
    }
}
impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(Arc::from(v))
    }
}
impl From<Color> for Value {
    fn from(v: Color) -> Self {
        Value::Color(v)
    }
}
impl From<ElementId> for Value {
    fn from(v: ElementId) -> Self {
        Value::Element(v)
    }
}
impl From<SharedObject> for Value {
    fn from(v: SharedObject) -> Self {
        Value::Object(v)
    }
}
