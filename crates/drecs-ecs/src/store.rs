//! The [`EntityStore`]: live entities of the active world plus the alias
//! table.
//!
//! Entities live in a generational arena indexed by [`EntityId`]. The store
//! keeps a separate list of live ids in creation order, which is the order
//! filtered queries return. Aliases map a well-known name to at most one
//! entity; lookups are a single hash probe.

use std::collections::{BTreeMap, HashMap};

use tracing::trace;

use crate::catalog::Catalog;
use crate::component::AttrMap;
use crate::entity::{Entity, EntityAllocator, EntityId};
use crate::template::Overrides;
use crate::value::Value;
use crate::EcsError;

/// Live entity set and alias table for one world.
#[derive(Debug, Default)]
pub struct EntityStore {
    allocator: EntityAllocator,
    /// Indexed by `EntityId::index()`.
    slots: Vec<Option<Entity>>,
    /// Live ids in creation order.
    live: Vec<EntityId>,
    aliases: HashMap<String, EntityId>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(),
            ..Self::default()
        }
    }

    // -- lifecycle ------------------------------------------------------------

    /// Instantiate `template`.
    ///
    /// Each kind the template attaches gets the registered defaults, then the
    /// template's overrides for that kind, then `overrides` for that kind.
    /// Kinds named only in `overrides` are attached from their registered
    /// defaults. If `alias` is given it is bound to the new entity, replacing
    /// any previous binding.
    ///
    /// Nothing is allocated unless every kind and override checks out.
    pub fn create_entity(
        &mut self,
        catalog: &Catalog,
        template: &str,
        alias: Option<&str>,
        overrides: &Overrides,
    ) -> Result<EntityId, EcsError> {
        let def = catalog.template(template)?;

        let mut components = BTreeMap::new();
        for kind in def.attached_kinds() {
            let attrs = catalog
                .instantiate_component(kind, &[def.overrides().get(kind), overrides.get(kind)])?;
            components.insert(kind.to_owned(), attrs);
        }
        for (kind, attrs) in overrides.iter() {
            if components.contains_key(kind) {
                continue;
            }
            let attrs = catalog.instantiate_component(kind, &[Some(attrs)])?;
            components.insert(kind.to_owned(), attrs);
        }

        let id = self.allocator.allocate();
        let entity = Entity::new(id, template, alias, components, def.fields().clone());
        self.insert(entity);
        if let Some(alias) = alias {
            self.bind_alias(alias, id);
        }
        trace!(entity = %id, template, alias, "entity created");
        Ok(id)
    }

    /// Remove an entity from the live set and clear its alias binding.
    ///
    /// Returns the removed record. Fails with [`EcsError::StaleEntity`] if
    /// the entity was already deleted.
    pub fn delete_entity(&mut self, id: EntityId) -> Result<Entity, EcsError> {
        if !self.allocator.deallocate(id) {
            return Err(EcsError::StaleEntity { entity: id });
        }
        let entity = self.slots[id.index() as usize]
            .take()
            .ok_or(EcsError::StaleEntity { entity: id })?;
        if let Some(pos) = self.live.iter().position(|&e| e == id) {
            self.live.remove(pos);
        }
        if let Some(alias) = entity.alias() {
            // The alias may already have moved on to a newer entity.
            if self.aliases.get(alias) == Some(&id) {
                self.aliases.remove(alias);
            }
        }
        trace!(entity = %id, "entity deleted");
        Ok(entity)
    }

    /// Delete every entity and drop every alias binding.
    ///
    /// Generations are bumped, so ids handed out before the clear stay stale.
    pub fn clear(&mut self) {
        for id in self.live.drain(..) {
            self.allocator.deallocate(id);
            self.slots[id.index() as usize] = None;
        }
        self.aliases.clear();
    }

    // -- components -----------------------------------------------------------

    /// Attach `kind` (or update it if already attached).
    ///
    /// An attached kind keeps its current data with `overrides` applied on
    /// top. A detached kind starts over from the registered defaults, so
    /// values set before a [`remove_component`](Self::remove_component) are
    /// not restored.
    pub fn add_component(
        &mut self,
        catalog: &Catalog,
        id: EntityId,
        kind: &str,
        overrides: &AttrMap,
    ) -> Result<(), EcsError> {
        let entity = self.entity_checked_mut(id)?;
        let attrs = match entity.component(kind) {
            Some(existing) => {
                let mut attrs = existing.clone();
                attrs.merge(overrides)?;
                attrs
            }
            None => catalog.instantiate_component(kind, &[Some(overrides)])?,
        };
        entity.attach(kind, attrs);
        Ok(())
    }

    /// Detach `kind` and drop its data. Returns whether it was attached.
    pub fn remove_component(&mut self, id: EntityId, kind: &str) -> Result<bool, EcsError> {
        Ok(self.entity_checked_mut(id)?.detach(kind).is_some())
    }

    /// Whether `id` is alive and has every kind in `kinds` attached.
    pub fn has_components<S: AsRef<str>>(&self, id: EntityId, kinds: &[S]) -> bool {
        self.entity(id).is_some_and(|e| e.has_components(kinds))
    }

    // -- attribute access ---------------------------------------------------

    pub fn get(&self, id: EntityId, kind: &str, attribute: &str) -> Option<&Value> {
        self.entity(id).and_then(|e| e.get(kind, attribute))
    }

    /// Write one attribute, returning the previous value.
    pub fn set(
        &mut self,
        id: EntityId,
        kind: &str,
        attribute: &str,
        value: impl Into<Value>,
    ) -> Result<Value, EcsError> {
        self.entity_checked_mut(id)?.set(kind, attribute, value)
    }

    // -- aliases --------------------------------------------------------------

    /// The entity currently bound to `alias`.
    pub fn resolve_alias(&self, alias: &str) -> Option<EntityId> {
        self.aliases.get(alias).copied()
    }

    /// Alias bindings, sorted by name.
    pub fn aliases(&self) -> Vec<(&str, EntityId)> {
        let mut out: Vec<(&str, EntityId)> =
            self.aliases.iter().map(|(k, &v)| (k.as_str(), v)).collect();
        out.sort_unstable();
        out
    }

    fn bind_alias(&mut self, alias: &str, id: EntityId) {
        if let Some(previous) = self.aliases.insert(alias.to_owned(), id) {
            if previous != id {
                if let Some(prev) = self.entity_mut(previous) {
                    prev.clear_alias();
                }
                trace!(alias, from = %previous, to = %id, "alias rebound");
            }
        }
    }

    // -- queries --------------------------------------------------------------

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.allocator.is_alive(id)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        if !self.allocator.is_alive(id) {
            return None;
        }
        self.slots.get(id.index() as usize)?.as_ref()
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        if !self.allocator.is_alive(id) {
            return None;
        }
        self.slots.get_mut(id.index() as usize)?.as_mut()
    }

    /// Live ids in creation order.
    pub fn entities(&self) -> &[EntityId] {
        &self.live
    }

    /// Live entities in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.live.iter().filter_map(|&id| self.entity(id))
    }

    /// Live ids having every kind in `kinds`, in creation order. An empty
    /// filter matches everything.
    pub fn query<S: AsRef<str>>(&self, kinds: &[S]) -> Vec<EntityId> {
        if kinds.is_empty() {
            return self.live.clone();
        }
        self.iter()
            .filter(|e| e.has_components(kinds))
            .map(Entity::id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// blake3 digest of the live entities (order, ids, aliases, components,
    /// fields). Equal stores hash equal.
    pub fn state_hash(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.live.len() as u64).to_le_bytes());
        for entity in self.iter() {
            hasher.update(&entity.id().to_raw().to_le_bytes());
            hash_str(&mut hasher, entity.template());
            hash_str(&mut hasher, entity.alias().unwrap_or(""));
            for (kind, attrs) in entity.components() {
                hash_str(&mut hasher, kind);
                for (name, value) in attrs.iter() {
                    hash_str(&mut hasher, name);
                    hash_value(&mut hasher, value);
                }
            }
            for (name, value) in entity.fields() {
                hash_str(&mut hasher, name);
                hash_value(&mut hasher, value);
            }
        }
        hasher.finalize()
    }

    // -- internals ------------------------------------------------------------

    fn insert(&mut self, entity: Entity) {
        let idx = entity.id().index() as usize;
        if idx >= self.slots.len() {
            self.slots.resize_with(idx + 1, || None);
        }
        self.live.push(entity.id());
        self.slots[idx] = Some(entity);
    }

    fn entity_checked_mut(&mut self, id: EntityId) -> Result<&mut Entity, EcsError> {
        self.entity_mut(id)
            .ok_or(EcsError::StaleEntity { entity: id })
    }
}

fn hash_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn hash_value(hasher: &mut blake3::Hasher, value: &Value) {
    match value {
        Value::Nil => {
            hasher.update(&[0]);
        }
        Value::Bool(b) => {
            hasher.update(&[1, *b as u8]);
        }
        Value::Int(i) => {
            hasher.update(&[2]);
            hasher.update(&i.to_le_bytes());
        }
        Value::Float(f) => {
            hasher.update(&[3]);
            hasher.update(&f.to_bits().to_le_bytes());
        }
        Value::Str(s) => {
            hasher.update(&[4]);
            hash_str(hasher, s);
        }
        Value::Entity(e) => {
            hasher.update(&[5]);
            hasher.update(&e.to_raw().to_le_bytes());
        }
        Value::List(items) => {
            hasher.update(&[6]);
            hasher.update(&(items.len() as u64).to_le_bytes());
            for item in items {
                hash_value(hasher, item);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
