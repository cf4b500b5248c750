//! drecs engine -- registry, world manager, and tick scheduler on top of
//! [`drecs_ecs`].
//!
//! Definitions are registered by name into a [`Registry`](registry::Registry):
//! component kinds, entity templates, systems (a component filter plus a
//! behavior), and worlds (systems to activate and entities to create). The
//! registry is sealed into a [`Runtime`](runtime::Runtime), which switches
//! worlds and runs the active systems once per [`tick`](runtime::Runtime::tick).
//!
//! Everything is single-threaded and synchronous. Systems run one after the
//! other and see each other's changes within the same tick.
//!
//! # Quick Start
//!
//! ```
//! use drecs_engine::prelude::*;
//!
//! let mut registry: Registry<()> = Registry::new();
//! registry
//!     .register_component("position", attrs([("y", 0)]))
//!     .register_component("vel", attrs([("dy", 1)]))
//!     .register_template("faller", TemplateDef::new(["position", "vel"]))
//!     .register_system("fall", ["position", "vel"], |frame, entities, _| {
//!         for &e in entities {
//!             let y = frame.float(e, "position", "y").unwrap_or(0.0) as i64;
//!             frame.set(e, "position", "y", y - 1)?;
//!         }
//!         Ok(())
//!     })
//!     .register_world(
//!         "default",
//!         WorldDef::new()
//!             .with_systems(["fall"])
//!             .with_entity(EntitySpec::new("faller").alias("rock")),
//!     );
//!
//! let mut runtime = Runtime::new(registry, RuntimeConfig::default()).unwrap();
//! runtime.set_world("default").unwrap();
//! runtime.run_ticks(3, &mut ()).unwrap();
//!
//! let rock = runtime.resolve_alias("rock").unwrap().unwrap();
//! assert_eq!(runtime.get(rock, "position", "y").unwrap(), Some(&Value::Int(-3)));
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod frame;
pub mod registry;
pub mod runtime;
pub mod schedule;
pub mod world;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ECS crate for convenience.
pub use drecs_ecs;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use drecs_ecs::prelude::*;

    pub use crate::config::RuntimeConfig;
    pub use crate::error::{EngineError, ErrorCategory};
    pub use crate::frame::Frame;
    pub use crate::registry::{Behavior, EntitySpec, Registry, SystemDef, WorldDef};
    pub use crate::runtime::{Runtime, TickDiagnostics};
    pub use crate::schedule::Schedule;
    pub use crate::world::WorldContext;
}
