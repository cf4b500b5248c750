//! The [`Registry`]: component kinds, entity templates, systems, and worlds,
//! all keyed by name.
//!
//! A registry is filled during startup and then handed to a
//! [`Runtime`](crate::runtime::Runtime), which owns it immutably from then on.
//! Re-registering a name replaces the previous definition.

use std::collections::HashMap;
use std::fmt;

use drecs_ecs::catalog::Catalog;
use drecs_ecs::component::AttrMap;
use drecs_ecs::entity::EntityId;
use drecs_ecs::template::{Overrides, TemplateDef};
use drecs_ecs::value::Value;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::frame::Frame;

// ---------------------------------------------------------------------------
// SystemDef
// ---------------------------------------------------------------------------

/// A system behavior.
///
/// Receives the active world (through the [`Frame`]), the entities matching
/// the system's filter at the moment it started, and the driver's per-tick
/// context.
pub type Behavior<C> = Box<dyn Fn(&mut Frame<'_, C>, &[EntityId], &mut C) -> anyhow::Result<()>>;

/// A registered system: a component filter plus a behavior.
pub struct SystemDef<C> {
    filter: Vec<String>,
    behavior: Behavior<C>,
}

impl<C> SystemDef<C> {
    /// Component kinds an entity must carry to be handed to this system.
    /// Empty means every live entity.
    pub fn filter(&self) -> &[String] {
        &self.filter
    }

    pub(crate) fn run(
        &self,
        frame: &mut Frame<'_, C>,
        entities: &[EntityId],
        ctx: &mut C,
    ) -> anyhow::Result<()> {
        (self.behavior)(frame, entities, ctx)
    }
}

impl<C> fmt::Debug for SystemDef<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemDef")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// EntitySpec / WorldDef
// ---------------------------------------------------------------------------

/// One entity a world creates when it starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntitySpec {
    template: String,
    alias: Option<String>,
    overrides: Overrides,
}

impl EntitySpec {
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_owned(),
            ..Self::default()
        }
    }

    /// Bind the created entity to `alias`.
    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_owned());
        self
    }

    pub fn with(mut self, kind: &str, attribute: &str, value: impl Into<Value>) -> Self {
        self.overrides.insert(kind, attribute, value);
        self
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides.extend(&overrides);
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn alias_name(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }
}

/// A world: systems to activate and entities to create, both in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldDef {
    systems: Vec<String>,
    entities: Vec<EntitySpec>,
}

impl WorldDef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_systems<I, S>(mut self, systems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.systems.extend(systems.into_iter().map(Into::into));
        self
    }

    pub fn with_entity(mut self, spec: EntitySpec) -> Self {
        self.entities.push(spec);
        self
    }

    pub fn with_entities(mut self, specs: impl IntoIterator<Item = EntitySpec>) -> Self {
        self.entities.extend(specs);
        self
    }

    pub fn systems(&self) -> &[String] {
        &self.systems
    }

    pub fn entities(&self) -> &[EntitySpec] {
        &self.entities
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Every definition the runtime can refer to by name.
///
/// `C` is the driver's per-tick context type handed to system behaviors.
pub struct Registry<C> {
    catalog: Catalog,
    systems: HashMap<String, SystemDef<C>>,
    worlds: HashMap<String, WorldDef>,
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self {
            catalog: Catalog::new(),
            systems: HashMap::new(),
            worlds: HashMap::new(),
        }
    }
}

impl<C> Registry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    // -- registration ---------------------------------------------------------

    /// Register a component kind with its default attribute values. The
    /// default types become the kind's schema.
    pub fn register_component(&mut self, kind: &str, defaults: AttrMap) -> &mut Self {
        self.catalog.register_component(kind, defaults);
        self
    }

    pub fn register_template(&mut self, name: &str, def: TemplateDef) -> &mut Self {
        self.catalog.register_template(name, def);
        self
    }

    /// Register a system. An empty `filter` hands the behavior every live
    /// entity.
    pub fn register_system<I, S, F>(&mut self, name: &str, filter: I, behavior: F) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&mut Frame<'_, C>, &[EntityId], &mut C) -> anyhow::Result<()> + 'static,
    {
        let def = SystemDef {
            filter: filter.into_iter().map(Into::into).collect(),
            behavior: Box::new(behavior),
        };
        if self.systems.insert(name.to_owned(), def).is_some() {
            debug!(system = name, "system re-registered, previous definition replaced");
        }
        self
    }

    pub fn register_world(&mut self, name: &str, def: WorldDef) -> &mut Self {
        if self.worlds.insert(name.to_owned(), def).is_some() {
            debug!(world = name, "world re-registered, previous definition replaced");
        }
        self
    }

    // -- lookup -------------------------------------------------------------

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn system(&self, name: &str) -> Result<&SystemDef<C>, EngineError> {
        self.systems
            .get(name)
            .ok_or_else(|| EngineError::UnknownSystem {
                name: name.to_owned(),
            })
    }

    pub fn world(&self, name: &str) -> Result<&WorldDef, EngineError> {
        self.worlds
            .get(name)
            .ok_or_else(|| EngineError::UnknownWorld {
                name: name.to_owned(),
                registered: sorted(self.worlds.keys()).join(", "),
            })
    }

    /// Find the system an active-list entry refers to: `name` itself, or
    /// else `name + fallback_suffix`. Returns the registered name with the
    /// definition.
    pub fn resolve_system(
        &self,
        name: &str,
        fallback_suffix: Option<&str>,
    ) -> Option<(&str, &SystemDef<C>)> {
        if let Some((key, def)) = self.systems.get_key_value(name) {
            return Some((key.as_str(), def));
        }
        let suffix = fallback_suffix?;
        self.systems
            .get_key_value(&format!("{name}{suffix}"))
            .map(|(key, def)| (key.as_str(), def))
    }

    pub fn system_names(&self) -> Vec<&str> {
        sorted(self.systems.keys())
    }

    pub fn world_names(&self) -> Vec<&str> {
        sorted(self.worlds.keys())
    }

    // -- validation ---------------------------------------------------------

    /// Check every cross reference: template kinds and overrides, system
    /// filters, and world entity specs. Systems listed by a world but not
    /// registered are only logged; the scheduler skips them.
    pub fn validate(&self, fallback_suffix: Option<&str>) -> Result<(), EngineError> {
        self.catalog.validate()?;

        for name in self.system_names() {
            for kind in self.system(name)?.filter() {
                self.catalog.component(kind)?;
            }
        }

        for name in self.world_names() {
            let world = self.world(name)?;
            for spec in world.entities() {
                self.check_spec(spec)?;
            }
            for system in world.systems() {
                if self.resolve_system(system, fallback_suffix).is_none() {
                    warn!(world = name, system = %system, "world lists an unregistered system; it will be skipped");
                }
            }
        }
        Ok(())
    }

    /// Check that `spec` would instantiate: its template, every kind it
    /// attaches, and every override attribute.
    pub(crate) fn check_spec(&self, spec: &EntitySpec) -> Result<(), EngineError> {
        let template = self.catalog.template(spec.template())?;
        for kind in template.attached_kinds() {
            self.catalog.instantiate_component(
                kind,
                &[template.overrides().get(kind), spec.overrides().get(kind)],
            )?;
        }
        for (kind, attrs) in spec.overrides().iter() {
            self.catalog.instantiate_component(kind, &[Some(attrs)])?;
        }
        Ok(())
    }
}

impl<C> fmt::Debug for Registry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("components", &self.catalog.components().registered_names())
            .field("templates", &self.catalog.templates().registered_names())
            .field("systems", &self.system_names())
            .field("worlds", &self.world_names())
            .finish()
    }
}

fn sorted<'a>(keys: impl Iterator<Item = &'a String>) -> Vec<&'a str> {
    let mut names: Vec<&str> = keys.map(String::as_str).collect();
    names.sort_unstable();
    names
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use drecs_ecs::component::attrs;
    use drecs_ecs::EcsError;

    fn registry() -> Registry<()> {
        let mut reg = Registry::new();
        reg.register_component("position", attrs([("x", 0), ("y", 0)]))
            .register_component("vel", attrs([("dx", 0)]))
            .register_template("mover", TemplateDef::new(["position", "vel"]))
            .register_system("move", ["position", "vel"], |_f, _e, _c| Ok(()))
            .register_system("render_system", Vec::<String>::new(), |_f, _e, _c| Ok(()));
        reg
    }

    #[test]
    fn resolve_exact_then_suffix() {
        let reg = registry();
        assert_eq!(reg.resolve_system("move", Some("_system")).map(|(n, _)| n), Some("move"));
        assert_eq!(
            reg.resolve_system("render", Some("_system")).map(|(n, _)| n),
            Some("render_system")
        );
        assert!(reg.resolve_system("render", None).is_none());
        assert!(reg.resolve_system("missing", Some("_system")).is_none());
    }

    #[test]
    fn last_registration_wins() {
        let mut reg = registry();
        reg.register_system("move", ["position"], |_f, _e, _c| Ok(()));
        assert_eq!(reg.system("move").unwrap().filter(), &["position".to_owned()]);
        assert_eq!(reg.system_names(), vec!["move", "render_system"]);
    }

    #[test]
    fn unknown_world_lists_registered() {
        let mut reg = registry();
        reg.register_world("menu", WorldDef::new());
        match reg.world("game") {
            Err(EngineError::UnknownWorld { name, registered }) => {
                assert_eq!(name, "game");
                assert_eq!(registered, "menu");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn validate_catches_bad_filter() {
        let mut reg = registry();
        reg.register_system("fall", ["gravity"], |_f, _e, _c| Ok(()));
        let err = reg.validate(None).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Ecs(EcsError::UnknownComponent { ref name, .. }) if name == "gravity"
        ));
    }

    #[test]
    fn validate_catches_bad_world_spec() {
        let mut reg = registry();
        reg.register_world(
            "w",
            WorldDef::new().with_entity(EntitySpec::new("mover").with("position", "z", 1)),
        );
        assert!(matches!(
            reg.validate(None),
            Err(EngineError::Ecs(EcsError::UnknownAttribute { .. }))
        ));
    }

    #[test]
    fn validate_tolerates_unregistered_world_systems() {
        let mut reg = registry();
        reg.register_world(
            "w",
            WorldDef::new()
                .with_systems(["move", "not_yet_written"])
                .with_entity(EntitySpec::new("mover").alias("hero")),
        );
        reg.validate(Some("_system")).unwrap();
    }
}
