//! drecs ECS -- name-keyed components, entity templates, and the entity store.
//!
//! Component kinds are registered by name with a map of default attribute
//! values; the default types form the kind's schema. Entity templates list
//! the kinds an entity starts with plus per-kind overrides. The
//! [`EntityStore`](store::EntityStore) instantiates templates into a
//! generational arena and keeps an alias table for well-known entities.
//!
//! # Quick Start
//!
//! ```
//! use drecs_ecs::prelude::*;
//!
//! let mut catalog = Catalog::new();
//! catalog.register_component("health", attrs([("hp", 10)]));
//! catalog.register_template("unit", TemplateDef::new(["health"]));
//!
//! let mut store = EntityStore::new();
//! let unit = store
//!     .create_entity(&catalog, "unit", Some("hero"), &Overrides::new())
//!     .unwrap();
//!
//! store.set(unit, "health", "hp", 5).unwrap();
//! assert_eq!(store.get(unit, "health", "hp"), Some(&Value::Int(5)));
//! assert_eq!(store.resolve_alias("hero"), Some(unit));
//! ```

#![deny(unsafe_code)]

pub mod catalog;
pub mod component;
pub mod entity;
pub mod store;
pub mod template;
pub mod value;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by catalog and store operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EcsError {
    /// The entity does not exist (deleted, cleared by a world switch, or
    /// never allocated).
    #[error("entity {entity:?} does not exist (stale or never allocated)")]
    StaleEntity { entity: entity::EntityId },

    /// A component kind was referenced that has not been registered.
    #[error("component kind '{name}' not registered. Registered components: [{registered}]")]
    UnknownComponent { name: String, registered: String },

    /// An entity template was referenced that has not been registered.
    #[error("entity template '{name}' not registered. Registered templates: [{registered}]")]
    UnknownTemplate { name: String, registered: String },

    /// An attribute was written that the component kind does not declare.
    #[error("component '{component}' has no attribute '{attribute}'")]
    UnknownAttribute { component: String, attribute: String },

    /// An attribute was written with a value of the wrong type.
    #[error("attribute '{component}.{attribute}' expects {expected}, got {found}")]
    AttributeTypeMismatch {
        component: String,
        attribute: String,
        expected: value::ValueType,
        found: value::ValueType,
    },

    /// An attribute of a component the entity does not carry was written.
    #[error("entity {entity:?} has no '{component}' component")]
    MissingComponent {
        entity: entity::EntityId,
        component: String,
    },
}

impl EcsError {
    /// Whether the error comes from a name that was never registered.
    pub fn is_registry_error(&self) -> bool {
        matches!(
            self,
            EcsError::UnknownComponent { .. } | EcsError::UnknownTemplate { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::catalog::Catalog;
    pub use crate::component::{attrs, AttrMap, Attributes, ComponentKind, ComponentSchema};
    pub use crate::entity::{Entity, EntityId};
    pub use crate::store::EntityStore;
    pub use crate::template::{Overrides, TemplateDef};
    pub use crate::value::{Value, ValueType};
    pub use crate::EcsError;
}
