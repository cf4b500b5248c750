//! Attribute values and their runtime types.
//!
//! Every component attribute holds a [`Value`]. A component kind's schema is
//! derived from the types of its default values (see
//! [`ComponentSchema`](crate::component::ComponentSchema)), so each slot has a
//! fixed [`ValueType`] that later writes are validated against.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

// ---------------------------------------------------------------------------
// ValueType
// ---------------------------------------------------------------------------

/// The type of an attribute slot, as declared by its default value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Untyped slot (declared with a `nil` default). Accepts any value.
    Any,
    Bool,
    Int,
    Float,
    Str,
    Entity,
    List,
}

impl ValueType {
    /// Whether a value of type `found` may be stored in a slot of this type.
    ///
    /// `Float` slots also accept integers; they are widened on write.
    pub fn accepts(self, found: ValueType) -> bool {
        match (self, found) {
            (ValueType::Any, _) => true,
            (ValueType::Float, ValueType::Int) => true,
            (expected, found) => expected == found,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Any => "any",
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Str => "string",
            ValueType::Entity => "entity",
            ValueType::List => "list",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A single attribute value.
///
/// Entity references are plain [`EntityId`]s: they never own the referenced
/// entity and go stale once it is deleted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Entity(EntityId),
    List(Vec<Value>),
}

impl Value {
    /// The runtime type of this value. `Nil` reports [`ValueType::Any`].
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Nil => ValueType::Any,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Str(_) => ValueType::Str,
            Value::Entity(_) => ValueType::Entity,
            Value::List(_) => ValueType::List,
        }
    }

    /// Convert this value to fit a slot of type `slot`.
    ///
    /// Returns `None` when the slot does not accept this value.
    pub(crate) fn coerce_to(self, slot: ValueType) -> Option<Value> {
        match (slot, self) {
            (ValueType::Float, Value::Int(i)) => Some(Value::Float(i as f64)),
            (slot, value) if slot.accepts(value.value_type()) => Some(value),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of the value. Integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            Value::Entity(e) => Some(*e),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

// -- conversions --------------------------------------------------------------

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

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<EntityId> for Value {
    fn from(v: EntityId) -> Self {
        Value::Entity(v)
    }
}

impl From<Option<EntityId>> for Value {
    fn from(v: Option<EntityId>) -> Self {
        v.map_or(Value::Nil, Value::Entity)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_slot_widens_ints() {
        assert_eq!(Value::Int(3).coerce_to(ValueType::Float), Some(Value::Float(3.0)));
    }

    #[test]
    fn int_slot_rejects_floats() {
        assert_eq!(Value::Float(1.5).coerce_to(ValueType::Int), None);
    }

    #[test]
    fn any_slot_accepts_everything() {
        for v in [
            Value::Nil,
            Value::Bool(true),
            Value::Str("x".into()),
            Value::Entity(EntityId::new(1, 0)),
            Value::List(vec![]),
        ] {
            assert_eq!(v.clone().coerce_to(ValueType::Any), Some(v));
        }
    }

    #[test]
    fn nil_does_not_fit_typed_slots() {
        assert_eq!(Value::Nil.coerce_to(ValueType::Entity), None);
    }

    #[test]
    fn serializes_externally_tagged() {
        let json = serde_json::to_value(Value::List(vec![Value::Int(3), Value::Nil])).unwrap();
        assert_eq!(json, serde_json::json!({"List": [{"Int": 3}, "Nil"]}));
    }

    #[test]
    fn accessors() {
        assert_eq!(Value::from(7).as_int(), Some(7));
        assert_eq!(Value::from(7).as_float(), Some(7.0));
        assert_eq!(Value::from("hi").as_str(), Some("hi"));
        assert_eq!(Value::from(None::<EntityId>), Value::Nil);
        assert!(Value::from(true).as_int().is_none());
    }
}
