//! The active world: entity store, active system list, and world switching.
//!
//! A [`WorldContext`] starts empty. [`WorldContext::set_world`] tears down
//! whatever was running (every entity, alias, and active system) and builds
//! the named world from scratch. There is no incremental migration between
//! worlds.

use drecs_ecs::store::EntityStore;
use tracing::debug;

use crate::error::EngineError;
use crate::registry::Registry;
use crate::schedule::Schedule;

/// Mutable state of the running world.
#[derive(Debug, Default)]
pub struct WorldContext {
    store: EntityStore,
    schedule: Schedule,
    active_world: Option<String>,
    /// World requested by a behavior; applied once the current tick ends.
    pending_world: Option<String>,
}

impl WorldContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the running world with `name`.
    ///
    /// Entities are created in declaration order, then systems are activated
    /// in declaration order. Systems the registry does not know are still
    /// activated; the scheduler skips them.
    ///
    /// Handles from the previous world go stale. Every entity spec is checked
    /// before anything is torn down, so on error the previous world keeps
    /// running untouched.
    pub fn set_world<C>(&mut self, registry: &Registry<C>, name: &str) -> Result<(), EngineError> {
        let def = registry.world(name)?;
        for spec in def.entities() {
            registry.check_spec(spec)?;
        }

        self.store.clear();
        self.schedule.clear();
        self.active_world = Some(name.to_owned());
        self.pending_world = None;

        for spec in def.entities() {
            self.store.create_entity(
                registry.catalog(),
                spec.template(),
                spec.alias_name(),
                spec.overrides(),
            )?;
        }
        for system in def.systems() {
            self.schedule.activate(system);
        }

        debug!(
            world = name,
            entities = self.store.len(),
            systems = self.schedule.len(),
            "world started"
        );
        Ok(())
    }

    /// Name of the running world, if any.
    pub fn active_world(&self) -> Option<&str> {
        self.active_world.as_deref()
    }

    /// Fails with [`EngineError::NoActiveWorld`] before the first
    /// `set_world`.
    pub fn require_active(&self, operation: &'static str) -> Result<(), EngineError> {
        match self.active_world {
            Some(_) => Ok(()),
            None => Err(EngineError::NoActiveWorld { operation }),
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn schedule_mut(&mut self) -> &mut Schedule {
        &mut self.schedule
    }

    pub fn pending_world(&self) -> Option<&str> {
        self.pending_world.as_deref()
    }

    pub(crate) fn request_world(&mut self, name: &str) {
        self.pending_world = Some(name.to_owned());
    }

    pub(crate) fn take_pending_world(&mut self) -> Option<String> {
        self.pending_world.take()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{EntitySpec, WorldDef};
    use drecs_ecs::component::attrs;
    use drecs_ecs::template::TemplateDef;
    use drecs_ecs::value::Value;

    fn registry() -> Registry<()> {
        let mut reg = Registry::new();
        reg.register_component("health", attrs([("hp", 10)]))
            .register_template("unit", TemplateDef::new(["health"]))
            .register_world(
                "arena",
                WorldDef::new()
                    .with_systems(["combat", "render", "combat"])
                    .with_entity(EntitySpec::new("unit").alias("hero").with("health", "hp", 30))
                    .with_entity(EntitySpec::new("unit")),
            )
            .register_world(
                "broken",
                WorldDef::new()
                    .with_systems(["combat"])
                    .with_entity(EntitySpec::new("unit"))
                    .with_entity(EntitySpec::new("ghost")),
            )
            .register_world("empty", WorldDef::new());
        reg
    }

    #[test]
    fn set_world_builds_entities_then_systems() {
        let reg = registry();
        let mut ctx = WorldContext::new();
        ctx.set_world(&reg, "arena").unwrap();

        assert_eq!(ctx.active_world(), Some("arena"));
        assert_eq!(ctx.store().len(), 2);
        assert_eq!(ctx.schedule().names(), &["combat".to_owned(), "render".to_owned()]);

        let hero = ctx.store().resolve_alias("hero").unwrap();
        assert_eq!(ctx.store().get(hero, "health", "hp"), Some(&Value::Int(30)));
    }

    #[test]
    fn switching_discards_previous_world() {
        let reg = registry();
        let mut ctx = WorldContext::new();
        ctx.set_world(&reg, "arena").unwrap();
        let hero = ctx.store().resolve_alias("hero").unwrap();

        ctx.set_world(&reg, "empty").unwrap();
        assert!(ctx.store().is_empty());
        assert!(ctx.schedule().is_empty());
        assert_eq!(ctx.store().resolve_alias("hero"), None);
        assert!(!ctx.store().is_alive(hero));
    }

    #[test]
    fn unknown_world_leaves_state_untouched() {
        let reg = registry();
        let mut ctx = WorldContext::new();
        ctx.set_world(&reg, "arena").unwrap();
        assert!(ctx.set_world(&reg, "nowhere").is_err());
        assert_eq!(ctx.active_world(), Some("arena"));
        assert_eq!(ctx.store().len(), 2);
    }

    #[test]
    fn failing_spec_keeps_previous_world() {
        let reg = registry();
        let mut ctx = WorldContext::new();
        ctx.set_world(&reg, "arena").unwrap();
        let hero = ctx.store().resolve_alias("hero").unwrap();

        let err = ctx.set_world(&reg, "broken").unwrap_err();
        assert!(matches!(err, EngineError::Ecs(_)));
        assert_eq!(ctx.active_world(), Some("arena"));
        assert_eq!(ctx.store().len(), 2);
        assert_eq!(ctx.store().resolve_alias("hero"), Some(hero));
        assert!(ctx.store().is_alive(hero));
        assert_eq!(ctx.schedule().names(), &["combat".to_owned(), "render".to_owned()]);
    }

    #[test]
    fn failing_spec_on_first_world_leaves_it_unset() {
        let reg = registry();
        let mut ctx = WorldContext::new();
        assert!(ctx.set_world(&reg, "broken").is_err());
        assert_eq!(ctx.active_world(), None);
        assert!(ctx.store().is_empty());
    }

    #[test]
    fn require_active_before_first_world() {
        let ctx = WorldContext::new();
        assert!(matches!(
            ctx.require_active("tick"),
            Err(EngineError::NoActiveWorld { operation: "tick" })
        ));
    }
}
