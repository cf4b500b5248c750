//! Component kinds, their attribute schemas, and per-instance attribute data.
//!
//! A component kind is registered once with a map of default attribute values.
//! The types of those defaults become the kind's [`ComponentSchema`]. Every
//! entity that attaches the kind receives its own [`Attributes`]: a deep copy
//! of the defaults that shares only the immutable schema with the registry.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::value::{Value, ValueType};
use crate::EcsError;

/// Attribute name -> value. Used for defaults and overrides alike.
pub type AttrMap = BTreeMap<String, Value>;

/// Build an [`AttrMap`] from `(name, value)` pairs.
///
/// ```
/// use drecs_ecs::component::attrs;
/// use drecs_ecs::value::Value;
///
/// let m = attrs([("x", 1), ("y", 2)]);
/// assert_eq!(m["y"], Value::Int(2));
/// ```
pub fn attrs<K, V, I>(pairs: I) -> AttrMap
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

// ---------------------------------------------------------------------------
// ComponentSchema
// ---------------------------------------------------------------------------

/// The fixed set of attribute slots of a component kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSchema {
    kind: String,
    slots: BTreeMap<String, ValueType>,
}

impl ComponentSchema {
    /// Derive a schema from default values.
    pub fn from_defaults(kind: &str, defaults: &AttrMap) -> Self {
        Self {
            kind: kind.to_owned(),
            slots: defaults
                .iter()
                .map(|(name, v)| (name.clone(), v.value_type()))
                .collect(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn slot(&self, attribute: &str) -> Option<ValueType> {
        self.slots.get(attribute).copied()
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// Validate `value` for `attribute`, returning it converted to the slot's
    /// representation.
    pub fn check(&self, attribute: &str, value: Value) -> Result<Value, EcsError> {
        let slot = self.slot(attribute).ok_or_else(|| EcsError::UnknownAttribute {
            component: self.kind.clone(),
            attribute: attribute.to_owned(),
        })?;
        let found = value.value_type();
        value
            .coerce_to(slot)
            .ok_or_else(|| EcsError::AttributeTypeMismatch {
                component: self.kind.clone(),
                attribute: attribute.to_owned(),
                expected: slot,
                found,
            })
    }
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// One instance's attribute data for one component kind.
///
/// Every stored value conforms to the schema: writes go through
/// [`ComponentSchema::check`].
#[derive(Debug, Clone)]
pub struct Attributes {
    schema: Arc<ComponentSchema>,
    values: AttrMap,
}

impl Attributes {
    fn from_defaults(schema: Arc<ComponentSchema>, defaults: AttrMap) -> Self {
        Self {
            schema,
            values: defaults,
        }
    }

    pub fn kind(&self) -> &str {
        self.schema.kind()
    }

    pub fn schema(&self) -> &ComponentSchema {
        &self.schema
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.values.get(attribute)
    }

    /// Numeric attribute, widened to `f64`.
    pub fn float(&self, attribute: &str) -> Option<f64> {
        self.get(attribute).and_then(Value::as_float)
    }

    pub fn int(&self, attribute: &str) -> Option<i64> {
        self.get(attribute).and_then(Value::as_int)
    }

    /// Write one attribute, returning the previous value.
    pub fn set(&mut self, attribute: &str, value: impl Into<Value>) -> Result<Value, EcsError> {
        let value = self.schema.check(attribute, value.into())?;
        Ok(self
            .values
            .insert(attribute.to_owned(), value)
            .unwrap_or_default())
    }

    /// In-place access to a list attribute. Element types are not checked.
    pub fn list_mut(&mut self, attribute: &str) -> Option<&mut Vec<Value>> {
        self.values.get_mut(attribute).and_then(Value::as_list_mut)
    }

    /// Apply `overrides` on top of the current values, attribute by
    /// attribute. Either every override is applied or none is.
    pub fn merge(&mut self, overrides: &AttrMap) -> Result<(), EcsError> {
        let checked = overrides
            .iter()
            .map(|(name, v)| Ok((name.clone(), self.schema.check(name, v.clone())?)))
            .collect::<Result<Vec<_>, EcsError>>()?;
        self.values.extend(checked);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PartialEq for Attributes {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.values == other.values
    }
}

// ---------------------------------------------------------------------------
// ComponentKind
// ---------------------------------------------------------------------------

/// A registered component kind: its schema and default values.
#[derive(Debug, Clone)]
pub struct ComponentKind {
    defaults: Attributes,
}

impl ComponentKind {
    pub fn new(name: &str, defaults: AttrMap) -> Self {
        let schema = Arc::new(ComponentSchema::from_defaults(name, &defaults));
        Self {
            defaults: Attributes::from_defaults(schema, defaults),
        }
    }

    pub fn name(&self) -> &str {
        self.defaults.kind()
    }

    pub fn schema(&self) -> &ComponentSchema {
        self.defaults.schema()
    }

    /// The registered defaults. Read-only; attach uses [`instantiate`](Self::instantiate).
    pub fn defaults(&self) -> &Attributes {
        &self.defaults
    }

    /// A fresh, independent copy of the defaults for one instance.
    pub fn instantiate(&self) -> Attributes {
        self.defaults.clone()
    }
}

// ---------------------------------------------------------------------------
// ComponentRegistry
// ---------------------------------------------------------------------------

/// Name -> [`ComponentKind`]. Re-registering a name replaces the old kind.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    kinds: HashMap<String, ComponentKind>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a component kind. Returns `true` if a previous
    /// registration was replaced.
    pub fn register(&mut self, name: &str, defaults: AttrMap) -> bool {
        let replaced = self
            .kinds
            .insert(name.to_owned(), ComponentKind::new(name, defaults))
            .is_some();
        if replaced {
            debug!(component = name, "component kind re-registered, previous definition replaced");
        }
        replaced
    }

    /// Look up a kind, failing with [`EcsError::UnknownComponent`].
    pub fn get(&self, name: &str) -> Result<&ComponentKind, EcsError> {
        self.kinds.get(name).ok_or_else(|| EcsError::UnknownComponent {
            name: name.to_owned(),
            registered: self.registered_names().join(", "),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Names of all registered kinds, sorted.
    pub fn registered_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.kinds.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn position() -> ComponentKind {
        ComponentKind::new("position", attrs([("x", 0.0), ("y", 0.0)]))
    }

    #[test]
    fn schema_follows_defaults() {
        let kind = ComponentKind::new(
            "sprite",
            attrs([
                ("path", Value::from("a.png")),
                ("tile_x", Value::from(0)),
                ("visible", Value::from(true)),
            ]),
        );
        assert_eq!(kind.schema().slot("path"), Some(ValueType::Str));
        assert_eq!(kind.schema().slot("tile_x"), Some(ValueType::Int));
        assert_eq!(kind.schema().slot("visible"), Some(ValueType::Bool));
        assert_eq!(kind.schema().slot("missing"), None);
    }

    #[test]
    fn instances_do_not_share_values() {
        let kind = position();
        let mut a = kind.instantiate();
        let b = kind.instantiate();
        a.set("x", 5.0).unwrap();
        assert_eq!(a.float("x"), Some(5.0));
        assert_eq!(b.float("x"), Some(0.0));
        assert_eq!(kind.defaults().float("x"), Some(0.0));
    }

    #[test]
    fn set_rejects_unknown_attribute() {
        let mut a = position().instantiate();
        let err = a.set("z", 1.0).unwrap_err();
        assert!(matches!(err, EcsError::UnknownAttribute { ref attribute, .. } if attribute == "z"));
    }

    #[test]
    fn set_rejects_wrong_type() {
        let mut a = position().instantiate();
        let err = a.set("x", "left").unwrap_err();
        assert!(matches!(
            err,
            EcsError::AttributeTypeMismatch { expected: ValueType::Float, found: ValueType::Str, .. }
        ));
    }

    #[test]
    fn merge_is_all_or_nothing() {
        let mut a = position().instantiate();
        let bad = attrs([("x", Value::from(3.0)), ("y", Value::from("up"))]);
        assert!(a.merge(&bad).is_err());
        assert_eq!(a.float("x"), Some(0.0), "partial merge must not leak");

        a.merge(&attrs([("x", 3)])).unwrap();
        assert_eq!(a.get("x"), Some(&Value::Float(3.0)));
    }

    #[test]
    fn nil_default_is_untyped() {
        let kind = ComponentKind::new("parent", attrs([("parent", Value::Nil)]));
        let mut a = kind.instantiate();
        a.set("parent", crate::entity::EntityId::new(3, 0)).unwrap();
        a.set("parent", Value::Nil).unwrap();
        assert!(a.get("parent").unwrap().is_nil());
    }

    #[test]
    fn list_attributes_mutate_in_place() {
        let kind = ComponentKind::new("parts", attrs([("parts", Value::List(vec![]))]));
        let mut a = kind.instantiate();
        a.list_mut("parts").unwrap().push(Value::Int(1));
        assert_eq!(a.get("parts").and_then(Value::as_list).map(<[_]>::len), Some(1));
        assert_eq!(kind.defaults().get("parts"), Some(&Value::List(vec![])));
    }

    #[test]
    fn registry_last_registration_wins() {
        let mut reg = ComponentRegistry::new();
        assert!(!reg.register("health", attrs([("hp", 10)])));
        assert!(reg.register("health", attrs([("hp", 20)])));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("health").unwrap().defaults().int("hp"), Some(20));
    }

    #[test]
    fn unknown_component_lists_registered_names() {
        let mut reg = ComponentRegistry::new();
        reg.register("b", AttrMap::new());
        reg.register("a", AttrMap::new());
        match reg.get("c").unwrap_err() {
            EcsError::UnknownComponent { name, registered } => {
                assert_eq!(name, "c");
                assert_eq!(registered, "a, b");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
