//! Entity templates and attribute overrides.
//!
//! A [`TemplateDef`] names the component kinds an entity starts with, plus
//! optional per-kind [`Overrides`] and bare data fields. Templates are never
//! mutated after registration; instantiation always copies.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use crate::component::AttrMap;
use crate::value::Value;
use crate::EcsError;

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

/// Per-kind attribute overrides: kind -> (attribute -> value).
///
/// Naming a kind here attaches it even if the template does not declare it.
/// An empty attribute map attaches the kind with its registered defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    kinds: BTreeMap<String, AttrMap>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, kind: &str, attribute: &str, value: impl Into<Value>) -> Self {
        self.insert(kind, attribute, value);
        self
    }

    /// Attach `kind` with its defaults (or keep the overrides already given).
    pub fn with_kind(mut self, kind: &str) -> Self {
        self.kinds.entry(kind.to_owned()).or_default();
        self
    }

    /// Merge a whole attribute map for `kind`.
    pub fn with_attrs(mut self, kind: &str, attrs: AttrMap) -> Self {
        self.kinds.entry(kind.to_owned()).or_default().extend(attrs);
        self
    }

    pub fn insert(&mut self, kind: &str, attribute: &str, value: impl Into<Value>) {
        self.kinds
            .entry(kind.to_owned())
            .or_default()
            .insert(attribute.to_owned(), value.into());
    }

    /// Merge `other` into `self`; `other` wins per attribute.
    pub fn extend(&mut self, other: &Overrides) {
        for (kind, attrs) in &other.kinds {
            self.kinds
                .entry(kind.clone())
                .or_default()
                .extend(attrs.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }

    pub fn get(&self, kind: &str) -> Option<&AttrMap> {
        self.kinds.get(kind)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrMap)> {
        self.kinds.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

// ---------------------------------------------------------------------------
// TemplateDef
// ---------------------------------------------------------------------------

/// A named recipe for entities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateDef {
    components: Vec<String>,
    overrides: Overrides,
    fields: AttrMap,
}

impl TemplateDef {
    /// A template attaching `components` with their registered defaults.
    pub fn new<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut components: Vec<String> = components.into_iter().map(Into::into).collect();
        let mut seen = HashSet::new();
        components.retain(|c| seen.insert(c.clone()));
        Self {
            components,
            ..Self::default()
        }
    }

    pub fn with_override(mut self, kind: &str, attribute: &str, value: impl Into<Value>) -> Self {
        self.overrides.insert(kind, attribute, value);
        self
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides.extend(&overrides);
        self
    }

    /// Add a bare data field not backed by any component kind.
    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_owned(), value.into());
        self
    }

    /// Declared component kinds, in declaration order.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    pub fn fields(&self) -> &AttrMap {
        &self.fields
    }

    /// Every kind an instance starts with: declared kinds first, then kinds
    /// that only appear in the template's overrides.
    pub fn attached_kinds(&self) -> impl Iterator<Item = &str> {
        let declared = self.components.iter().map(String::as_str);
        let extra = self
            .overrides
            .iter()
            .map(|(k, _)| k)
            .filter(move |k| !self.components.iter().any(|c| c == k));
        declared.chain(extra)
    }
}

// ---------------------------------------------------------------------------
// TemplateRegistry
// ---------------------------------------------------------------------------

/// Name -> [`TemplateDef`]. Re-registering a name replaces the old template.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, TemplateDef>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, def: TemplateDef) -> bool {
        let replaced = self.templates.insert(name.to_owned(), def).is_some();
        if replaced {
            debug!(template = name, "entity template re-registered, previous definition replaced");
        }
        replaced
    }

    pub fn get(&self, name: &str) -> Result<&TemplateDef, EcsError> {
        self.templates
            .get(name)
            .ok_or_else(|| EcsError::UnknownTemplate {
                name: name.to_owned(),
                registered: self.registered_names().join(", "),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TemplateDef)> {
        self.templates.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn registered_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
