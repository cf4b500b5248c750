//! Entity identifiers, allocation, and the per-entity record.
//!
//! An [`EntityId`] is a 64-bit handle that packs a *generation* counter in the
//! high 32 bits and an *index* in the low 32 bits. The generation is bumped
//! every time an index is recycled, so a handle held past
//! [`EntityStore::delete_entity`](crate::store::EntityStore::delete_entity)
//! or a world switch never resolves to a different entity.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::component::Attributes;
use crate::value::Value;
use crate::EcsError;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A generational entity identifier.
///
/// Layout: `[generation: u32 | index: u32]`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Construct an `EntityId` from an index and generation.
    #[inline]
    pub fn new(index: u32, generation: u32) -> Self {
        Self((generation as u64) << 32 | index as u64)
    }

    /// The index portion (low 32 bits).
    #[inline]
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    /// The generation portion (high 32 bits).
    #[inline]
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}v{})", self.index(), self.generation())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Allocates and recycles [`EntityId`]s with generational tracking.
///
/// Free indices are kept in a FIFO queue so that generations are spread out
/// over time rather than concentrated on a hot index.
#[derive(Debug, Default)]
pub(crate) struct EntityAllocator {
    /// Current generation for each index slot.
    generations: Vec<u32>,
    /// Whether the slot is currently alive.
    alive: Vec<bool>,
    /// Free-list of recyclable indices (FIFO queue).
    free_indices: VecDeque<u32>,
}

impl EntityAllocator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh [`EntityId`], reusing a recycled index if one is
    /// available.
    pub(crate) fn allocate(&mut self) -> EntityId {
        if let Some(index) = self.free_indices.pop_front() {
            // Generation was already bumped on deallocation.
            self.alive[index as usize] = true;
            EntityId::new(index, self.generations[index as usize])
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            self.alive.push(true);
            EntityId::new(index, 0)
        }
    }

    /// Deallocate an entity, bumping the generation for its index so that
    /// outstanding handles become stale.
    ///
    /// Returns `false` if the entity was already dead or had a stale
    /// generation.
    pub(crate) fn deallocate(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let idx = id.index() as usize;
        self.alive[idx] = false;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.free_indices.push_back(id.index());
        true
    }

    pub(crate) fn is_alive(&self, id: EntityId) -> bool {
        let idx = id.index() as usize;
        if idx >= self.generations.len() {
            return false;
        }
        self.alive[idx] && self.generations[idx] == id.generation()
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A live entity instance.
///
/// The attached component set is the key set of the attribute map, so a kind
/// is attached exactly when the entity holds data for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: EntityId,
    template: String,
    alias: Option<String>,
    components: BTreeMap<String, Attributes>,
    fields: BTreeMap<String, Value>,
}

impl Entity {
    pub(crate) fn new(
        id: EntityId,
        template: &str,
        alias: Option<&str>,
        components: BTreeMap<String, Attributes>,
        fields: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            id,
            template: template.to_owned(),
            alias: alias.map(str::to_owned),
            components,
            fields,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Name of the template this entity was created from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The alias currently bound to this entity, if any.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub(crate) fn clear_alias(&mut self) {
        self.alias = None;
    }

    /// Whether `kind` is attached.
    pub fn has_component(&self, kind: &str) -> bool {
        self.components.contains_key(kind)
    }

    /// Whether every kind in `kinds` is attached. Vacuously true for an
    /// empty slice.
    pub fn has_components<S: AsRef<str>>(&self, kinds: &[S]) -> bool {
        kinds.iter().all(|k| self.has_component(k.as_ref()))
    }

    /// Attached component kinds, in name order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    pub fn component(&self, kind: &str) -> Option<&Attributes> {
        self.components.get(kind)
    }

    pub fn component_mut(&mut self, kind: &str) -> Option<&mut Attributes> {
        self.components.get_mut(kind)
    }

    /// Read one attribute of an attached component.
    pub fn get(&self, kind: &str, attribute: &str) -> Option<&Value> {
        self.components.get(kind).and_then(|a| a.get(attribute))
    }

    /// Write one attribute of an attached component, returning the previous
    /// value.
    pub fn set(
        &mut self,
        kind: &str,
        attribute: &str,
        value: impl Into<Value>,
    ) -> Result<Value, EcsError> {
        let id = self.id;
        self.components
            .get_mut(kind)
            .ok_or_else(|| EcsError::MissingComponent {
                entity: id,
                component: kind.to_owned(),
            })?
            .set(attribute, value)
    }

    /// Bare data field copied from the template.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Write a bare data field, returning the previous value if any.
    pub fn set_field(&mut self, name: &str, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.to_owned(), value.into())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn attach(&mut self, kind: &str, attributes: Attributes) {
        self.components.insert(kind.to_owned(), attributes);
    }

    pub(crate) fn detach(&mut self, kind: &str) -> Option<Attributes> {
        self.components.remove(kind)
    }

    pub(crate) fn components(&self) -> &BTreeMap<String, Attributes> {
        &self.components
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
