//! The [`Runtime`]: owns the sealed registry and the active world, and runs
//! one tick per call.
//!
//! Each tick:
//!
//! 1. The active system list is copied. Activations and deactivations made
//!    during the tick apply from the next tick on.
//! 2. For each name in the copy, in order, the system is resolved (exact
//!    name, then `name + fallback_suffix`). Unresolved names are skipped.
//! 3. The system's entity subset is computed from the store as it is at that
//!    moment, so entities created or deleted by earlier systems in the same
//!    tick are seen.
//! 4. The behavior runs to completion before the next system starts.
//! 5. A world switch requested by a behavior is applied after the last
//!    system.
//!
//! # Example
//!
//! ```
//! use drecs_engine::prelude::*;
//!
//! let mut registry: Registry<Vec<String>> = Registry::new();
//! registry
//!     .register_component("health", attrs([("hp", 10)]))
//!     .register_template("unit", TemplateDef::new(["health"]))
//!     .register_system("half_hp", ["health"], |frame, entities, log| {
//!         for &e in entities {
//!             let hp = frame.get(e, "health", "hp").and_then(Value::as_int).unwrap_or(0);
//!             frame.set(e, "health", "hp", hp / 2)?;
//!         }
//!         log.push(format!("halved {}", entities.len()));
//!         Ok(())
//!     })
//!     .register_world(
//!         "w",
//!         WorldDef::new()
//!             .with_systems(["half_hp"])
//!             .with_entities([EntitySpec::new("unit"), EntitySpec::new("unit")]),
//!     );
//!
//! let mut runtime = Runtime::new(registry, RuntimeConfig::default()).unwrap();
//! runtime.set_world("w").unwrap();
//!
//! let mut log = Vec::new();
//! runtime.tick(&mut log).unwrap();
//!
//! assert_eq!(log, vec!["halved 2".to_owned()]);
//! assert_eq!(runtime.tick_count(), 1);
//! ```

use std::time::{Duration, Instant};

use drecs_ecs::entity::EntityId;
use drecs_ecs::store::EntityStore;
use drecs_ecs::template::Overrides;
use drecs_ecs::value::Value;
use tracing::{debug, trace};

use crate::config::RuntimeConfig;
use crate::error::EngineError;
use crate::frame::Frame;
use crate::registry::Registry;
use crate::world::WorldContext;

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// What happened during the last completed tick.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Zero-based number of the tick.
    pub tick: u64,
    /// Wall-clock time per system that ran, in execution order. Empty when
    /// diagnostics collection is off.
    pub system_times: Vec<(String, Duration)>,
    /// Active names that did not resolve to a registered system.
    pub skipped: Vec<String>,
    /// Total time for the tick, including any deferred world switch.
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// The ECS runtime, generic over the driver's per-tick context `C`.
pub struct Runtime<C> {
    registry: Registry<C>,
    world: WorldContext,
    config: RuntimeConfig,
    tick_counter: u64,
    last_diagnostics: TickDiagnostics,
}

impl<C> Runtime<C> {
    /// Seal `registry` into a runtime with no active world.
    ///
    /// With [`RuntimeConfig::validate_registry`] set, every cross reference
    /// is checked here and the first broken one is returned.
    pub fn new(registry: Registry<C>, config: RuntimeConfig) -> Result<Self, EngineError> {
        if config.validate_registry {
            registry.validate(config.fallback_suffix.as_deref())?;
        }
        Ok(Self {
            registry,
            world: WorldContext::new(),
            config,
            tick_counter: 0,
            last_diagnostics: TickDiagnostics::default(),
        })
    }

    // -- world management ---------------------------------------------------

    /// Tear down the running world and start `name`.
    pub fn set_world(&mut self, name: &str) -> Result<(), EngineError> {
        self.world.set_world(&self.registry, name)
    }

    pub fn active_world(&self) -> Option<&str> {
        self.world.active_world()
    }

    // -- ticking --------------------------------------------------------------

    /// Run every active system once.
    ///
    /// Fails with [`EngineError::NoActiveWorld`] before the first
    /// [`set_world`](Self::set_world). If a behavior fails, the remaining
    /// systems do not run, the tick counter does not advance, and the error
    /// is returned wrapped in [`EngineError::SystemFailed`].
    pub fn tick(&mut self, ctx: &mut C) -> Result<(), EngineError> {
        self.world.require_active("tick")?;

        let tick_start = Instant::now();
        let snapshot = self.world.schedule().snapshot();
        let suffix = self.config.fallback_suffix.as_deref();
        let mut diagnostics = TickDiagnostics {
            tick: self.tick_counter,
            ..TickDiagnostics::default()
        };

        for name in &snapshot {
            let Some((resolved, system)) = self.registry.resolve_system(name, suffix) else {
                debug!(system = %name, "active system not registered, skipped");
                diagnostics.skipped.push(name.clone());
                continue;
            };

            let entities = self.world.store().query(system.filter());
            trace!(system = resolved, entities = entities.len(), "running system");

            let sys_start = Instant::now();
            let mut frame = Frame::new(&self.registry, &mut self.world, suffix);
            system
                .run(&mut frame, &entities, ctx)
                .map_err(|source| EngineError::SystemFailed {
                    system: resolved.to_owned(),
                    source,
                })?;

            if self.config.collect_diagnostics {
                diagnostics
                    .system_times
                    .push((resolved.to_owned(), sys_start.elapsed()));
            }
        }

        self.tick_counter += 1;

        // Every system ran, so the tick counts even if the switch fails.
        let switched = match self.world.take_pending_world() {
            Some(next) => {
                debug!(world = %next, "applying requested world switch");
                self.set_world(&next)
            }
            None => Ok(()),
        };

        diagnostics.total_time = tick_start.elapsed();
        self.last_diagnostics = diagnostics;
        switched
    }

    /// Run `count` ticks with the same context, stopping at the first error.
    pub fn run_ticks(&mut self, count: u64, ctx: &mut C) -> Result<(), EngineError> {
        for _ in 0..count {
            self.tick(ctx)?;
        }
        Ok(())
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }

    // -- systems --------------------------------------------------------------

    /// Activate a registered system on the running world.
    pub fn activate_system(&mut self, name: &str) -> Result<bool, EngineError> {
        self.frame("activate_system")?.activate_system(name)
    }

    /// Deactivate a system on the running world; no-op if not active.
    pub fn deactivate_system(&mut self, name: &str) -> Result<bool, EngineError> {
        Ok(self.frame("deactivate_system")?.deactivate_system(name))
    }

    pub fn active_systems(&self) -> &[String] {
        self.world.schedule().names()
    }

    // -- entities -------------------------------------------------------------

    /// A [`Frame`] on the running world, for driver-side entity work between
    /// ticks.
    pub fn frame(&mut self, operation: &'static str) -> Result<Frame<'_, C>, EngineError> {
        self.world.require_active(operation)?;
        Ok(Frame::new(
            &self.registry,
            &mut self.world,
            self.config.fallback_suffix.as_deref(),
        ))
    }

    pub fn create_entity(
        &mut self,
        template: &str,
        alias: Option<&str>,
        overrides: &Overrides,
    ) -> Result<EntityId, EngineError> {
        self.frame("create_entity")?
            .create_entity(template, alias, overrides)
    }

    pub fn delete_entity(&mut self, id: EntityId) -> Result<(), EngineError> {
        self.frame("delete_entity")?.delete_entity(id).map(|_| ())
    }

    /// The entity bound to `alias`. Fails with
    /// [`EngineError::NoActiveWorld`] before the first world is set, so an
    /// unset world is never mistaken for a missing alias.
    pub fn resolve_alias(&self, alias: &str) -> Result<Option<EntityId>, EngineError> {
        Ok(self.store_for("resolve_alias")?.resolve_alias(alias))
    }

    pub fn has_components<S: AsRef<str>>(
        &self,
        id: EntityId,
        kinds: &[S],
    ) -> Result<bool, EngineError> {
        Ok(self.store_for("has_components")?.has_components(id, kinds))
    }

    pub fn get(
        &self,
        id: EntityId,
        kind: &str,
        attribute: &str,
    ) -> Result<Option<&Value>, EngineError> {
        Ok(self.store_for("get")?.get(id, kind, attribute))
    }

    /// Entity store of the running world.
    pub fn store(&self) -> Result<&EntityStore, EngineError> {
        self.store_for("store")
    }

    fn store_for(&self, operation: &'static str) -> Result<&EntityStore, EngineError> {
        self.world.require_active(operation)?;
        Ok(self.world.store())
    }

    pub fn world(&self) -> &WorldContext {
        &self.world
    }

    pub fn registry(&self) -> &Registry<C> {
        &self.registry
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// blake3 digest of the live entity set.
    pub fn state_hash(&self) -> blake3::Hash {
        self.world.store().state_hash()
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

    /// Per-tick context for tests: a trace of which systems ran.
    type Trace = Vec<String>;

    fn registry() -> Registry<Trace> {
        let mut reg = Registry::new();
        reg.register_component("counter", attrs([("n", 0)]))
            .register_template("clock", TemplateDef::new(["counter"]))
            .register_system("count", ["counter"], |frame, entities, trace: &mut Trace| {
                for &e in entities {
                    let n = frame.get(e, "counter", "n").and_then(Value::as_int).unwrap_or(0);
                    frame.set(e, "counter", "n", n + 1)?;
                }
                trace.push("count".into());
                Ok(())
            })
            .register_system("render_system", Vec::<String>::new(), |_f, _e, trace: &mut Trace| {
                trace.push("render_system".into());
                Ok(())
            })
            .register_system("fail", Vec::<String>::new(), |_f, _e, _t| {
                anyhow::bail!("deliberate failure")
            })
            .register_world(
                "main",
                WorldDef::new()
                    .with_systems(["count", "render", "missing"])
                    .with_entity(EntitySpec::new("clock").alias("clock")),
            )
            .register_world("other", WorldDef::new().with_systems(["render"]));
        reg
    }

    fn runtime(config: RuntimeConfig) -> Runtime<Trace> {
        let mut rt = Runtime::new(registry(), config).unwrap();
        rt.set_world("main").unwrap();
        rt
    }

    #[test]
    fn tick_before_world_is_a_state_error() {
        let mut rt = Runtime::new(registry(), RuntimeConfig::default()).unwrap();
        let err = rt.tick(&mut Trace::new()).unwrap_err();
        assert!(matches!(err, EngineError::NoActiveWorld { operation: "tick" }));
        assert!(matches!(
            rt.create_entity("clock", None, &Overrides::new()),
            Err(EngineError::NoActiveWorld { .. })
        ));
    }

    #[test]
    fn queries_before_world_are_state_errors() {
        let rt = Runtime::new(registry(), RuntimeConfig::default()).unwrap();
        let id = EntityId::new(0, 0);
        assert!(matches!(
            rt.resolve_alias("clock"),
            Err(EngineError::NoActiveWorld { operation: "resolve_alias" })
        ));
        assert!(matches!(
            rt.has_components(id, &["counter"]),
            Err(EngineError::NoActiveWorld { operation: "has_components" })
        ));
        assert!(matches!(
            rt.get(id, "counter", "n"),
            Err(EngineError::NoActiveWorld { operation: "get" })
        ));
        assert!(matches!(rt.store(), Err(EngineError::NoActiveWorld { .. })));
    }

    #[test]
    fn suffix_fallback_and_skips() {
        let mut rt = runtime(RuntimeConfig::default());
        let mut trace = Trace::new();
        rt.tick(&mut trace).unwrap();

        assert_eq!(trace, vec!["count", "render_system"]);
        let diag = rt.last_diagnostics();
        assert_eq!(diag.tick, 0);
        assert_eq!(diag.skipped, vec!["missing".to_owned()]);
        let ran: Vec<&str> = diag.system_times.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(ran, vec!["count", "render_system"]);
    }

    #[test]
    fn strict_config_drops_fallback() {
        let mut rt = runtime(RuntimeConfig::strict());
        let mut trace = Trace::new();
        rt.tick(&mut trace).unwrap();
        assert_eq!(trace, vec!["count"]);
        assert_eq!(
            rt.last_diagnostics().skipped,
            vec!["render".to_owned(), "missing".to_owned()]
        );
    }

    #[test]
    fn failing_behavior_stops_the_tick() {
        let mut rt = runtime(RuntimeConfig::default());
        rt.activate_system("fail").unwrap();
        let mut trace = Trace::new();

        let err = rt.tick(&mut trace).unwrap_err();
        match err {
            EngineError::SystemFailed { ref system, .. } => assert_eq!(system, "fail"),
            ref other => panic!("unexpected: {other}"),
        }
        assert_eq!(err.category(), crate::error::ErrorCategory::System);
        // Systems before the failure ran; the tick did not complete.
        assert_eq!(trace, vec!["count", "render_system"]);
        assert_eq!(rt.tick_count(), 0);
    }

    #[test]
    fn explicit_activation_requires_registration() {
        let mut rt = runtime(RuntimeConfig::default());
        assert!(matches!(
            rt.activate_system("nope"),
            Err(EngineError::UnknownSystem { .. })
        ));
        assert!(!rt.activate_system("count").unwrap());
        assert!(!rt.deactivate_system("nope").unwrap());
    }

    #[test]
    fn counters_advance_per_tick() {
        let mut rt = runtime(RuntimeConfig::default());
        rt.run_ticks(5, &mut Trace::new()).unwrap();
        let clock = rt.resolve_alias("clock").unwrap().unwrap();
        assert_eq!(rt.get(clock, "counter", "n").unwrap(), Some(&Value::Int(5)));
        assert_eq!(rt.tick_count(), 5);
    }

    #[test]
    fn diagnostics_can_be_disabled() {
        let config = RuntimeConfig {
            collect_diagnostics: false,
            ..RuntimeConfig::default()
        };
        let mut rt = runtime(config);
        rt.tick(&mut Trace::new()).unwrap();
        assert!(rt.last_diagnostics().system_times.is_empty());
    }

    #[test]
    fn failed_deferred_switch_still_records_the_tick() {
        let mut reg = registry();
        reg.register_system("leave", Vec::<String>::new(), |frame, _e, _t| {
            frame.switch_world("broken")?;
            Ok(())
        })
        .register_world(
            "broken",
            WorldDef::new().with_entity(EntitySpec::new("ghost")),
        );
        let config = RuntimeConfig {
            validate_registry: false,
            ..RuntimeConfig::default()
        };
        let mut rt = Runtime::new(reg, config).unwrap();
        rt.set_world("main").unwrap();
        rt.activate_system("leave").unwrap();

        let err = rt.tick(&mut Trace::new()).unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::Registry);
        assert_eq!(rt.tick_count(), 1);
        assert_eq!(rt.last_diagnostics().tick, 0);
        assert_eq!(rt.last_diagnostics().skipped, vec!["missing".to_owned()]);
        assert_eq!(rt.active_world(), Some("main"));
        assert!(rt.resolve_alias("clock").unwrap().is_some());
    }

    #[test]
    fn validation_can_be_deferred() {
        let mut reg = registry();
        reg.register_template("broken", TemplateDef::new(["nothing"]));
        assert!(Runtime::new(reg, RuntimeConfig::default()).is_err());

        let mut reg = registry();
        reg.register_template("broken", TemplateDef::new(["nothing"]));
        let config = RuntimeConfig {
            validate_registry: false,
            ..RuntimeConfig::default()
        };
        let mut rt = Runtime::new(reg, config).unwrap();
        rt.set_world("main").unwrap();
        let err = rt.create_entity("broken", None, &Overrides::new()).unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::Registry);
    }
}
