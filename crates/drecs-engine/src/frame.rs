//! [`Frame`]: the handle system behaviors (and drivers) use to work on the
//! active world.
//!
//! A frame pairs the read-only [`Registry`] with the mutable
//! [`WorldContext`], so entity operations need no extra arguments. Every
//! change is visible immediately, including to systems that run later in
//! the same tick.

use drecs_ecs::component::AttrMap;
use drecs_ecs::entity::{Entity, EntityId};
use drecs_ecs::store::EntityStore;
use drecs_ecs::template::Overrides;
use drecs_ecs::value::Value;

use crate::error::EngineError;
use crate::registry::Registry;
use crate::world::WorldContext;

/// Access to the active world for the duration of one behavior call.
pub struct Frame<'a, C> {
    registry: &'a Registry<C>,
    world: &'a mut WorldContext,
    fallback_suffix: Option<&'a str>,
}

impl<'a, C> Frame<'a, C> {
    pub(crate) fn new(
        registry: &'a Registry<C>,
        world: &'a mut WorldContext,
        fallback_suffix: Option<&'a str>,
    ) -> Self {
        Self {
            registry,
            world,
            fallback_suffix,
        }
    }

    pub fn registry(&self) -> &Registry<C> {
        self.registry
    }

    pub fn active_world(&self) -> Option<&str> {
        self.world.active_world()
    }

    pub fn store(&self) -> &EntityStore {
        self.world.store()
    }

    // -- entities -------------------------------------------------------------

    /// Instantiate `template`, optionally binding `alias`.
    pub fn create_entity(
        &mut self,
        template: &str,
        alias: Option<&str>,
        overrides: &Overrides,
    ) -> Result<EntityId, EngineError> {
        Ok(self.world.store_mut().create_entity(
            self.registry.catalog(),
            template,
            alias,
            overrides,
        )?)
    }

    /// Instantiate `template` with no alias and no overrides.
    pub fn spawn(&mut self, template: &str) -> Result<EntityId, EngineError> {
        self.create_entity(template, None, &Overrides::new())
    }

    pub fn delete_entity(&mut self, id: EntityId) -> Result<Entity, EngineError> {
        Ok(self.world.store_mut().delete_entity(id)?)
    }

    pub fn add_component(
        &mut self,
        id: EntityId,
        kind: &str,
        overrides: &AttrMap,
    ) -> Result<(), EngineError> {
        Ok(self
            .world
            .store_mut()
            .add_component(self.registry.catalog(), id, kind, overrides)?)
    }

    pub fn remove_component(&mut self, id: EntityId, kind: &str) -> Result<bool, EngineError> {
        Ok(self.world.store_mut().remove_component(id, kind)?)
    }

    pub fn has_components<S: AsRef<str>>(&self, id: EntityId, kinds: &[S]) -> bool {
        self.world.store().has_components(id, kinds)
    }

    pub fn resolve_alias(&self, alias: &str) -> Option<EntityId> {
        self.world.store().resolve_alias(alias)
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.world.store().is_alive(id)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.world.store().entity(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.world.store_mut().entity_mut(id)
    }

    pub fn get(&self, id: EntityId, kind: &str, attribute: &str) -> Option<&Value> {
        self.world.store().get(id, kind, attribute)
    }

    /// Numeric attribute, widened to `f64`.
    pub fn float(&self, id: EntityId, kind: &str, attribute: &str) -> Option<f64> {
        self.get(id, kind, attribute).and_then(Value::as_float)
    }

    pub fn set(
        &mut self,
        id: EntityId,
        kind: &str,
        attribute: &str,
        value: impl Into<Value>,
    ) -> Result<Value, EngineError> {
        Ok(self.world.store_mut().set(id, kind, attribute, value)?)
    }

    /// Live ids in creation order.
    pub fn entities(&self) -> &[EntityId] {
        self.world.store().entities()
    }

    /// Live ids carrying every kind in `kinds`, as of now.
    pub fn query<S: AsRef<str>>(&self, kinds: &[S]) -> Vec<EntityId> {
        self.world.store().query(kinds)
    }

    // -- systems --------------------------------------------------------------

    /// Activate a registered system. Takes effect from the next tick.
    ///
    /// Fails with [`EngineError::UnknownSystem`] if `name` does not resolve.
    pub fn activate_system(&mut self, name: &str) -> Result<bool, EngineError> {
        if self.registry.resolve_system(name, self.fallback_suffix).is_none() {
            return Err(EngineError::UnknownSystem {
                name: name.to_owned(),
            });
        }
        Ok(self.world.schedule_mut().activate(name))
    }

    /// Deactivate a system. Takes effect from the next tick; no-op if the
    /// name is not active.
    pub fn deactivate_system(&mut self, name: &str) -> bool {
        self.world.schedule_mut().deactivate(name)
    }

    pub fn active_systems(&self) -> &[String] {
        self.world.schedule().names()
    }

    /// Switch to world `name` once the current tick has finished.
    pub fn switch_world(&mut self, name: &str) -> Result<(), EngineError> {
        self.registry.world(name)?;
        self.world.request_world(name);
        Ok(())
    }
}
