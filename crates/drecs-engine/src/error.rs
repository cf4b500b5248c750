//! Engine-level errors.

use drecs_ecs::EcsError;

/// Broad classification of an [`EngineError`], for drivers deciding whether
/// to abort a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A referenced component kind, template, system, or world was never
    /// registered.
    Registry,
    /// An operation needed an active world and none was set.
    State,
    /// An attribute write did not match the component schema.
    Attribute,
    /// A stale entity handle or a missing component on a live entity.
    Entity,
    /// A system behavior failed with its own error.
    System,
}

/// Errors produced by the runtime.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Ecs(#[from] EcsError),

    /// A system was referenced that has not been registered.
    #[error("system '{name}' not registered")]
    UnknownSystem { name: String },

    /// A world was referenced that has not been registered.
    #[error("world '{name}' not registered. Registered worlds: [{registered}]")]
    UnknownWorld { name: String, registered: String },

    /// An operation that needs an active world ran before `set_world`.
    #[error("no active world: call set_world before {operation}")]
    NoActiveWorld { operation: &'static str },

    /// A system behavior returned an error.
    #[error("system '{system}' failed: {source}")]
    SystemFailed {
        system: String,
        #[source]
        source: anyhow::Error,
    },
}

impl EngineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EngineError::Ecs(e) if e.is_registry_error() => ErrorCategory::Registry,
            EngineError::Ecs(
                EcsError::UnknownAttribute { .. } | EcsError::AttributeTypeMismatch { .. },
            ) => ErrorCategory::Attribute,
            EngineError::Ecs(_) => ErrorCategory::Entity,
            EngineError::UnknownSystem { .. } | EngineError::UnknownWorld { .. } => {
                ErrorCategory::Registry
            }
            EngineError::NoActiveWorld { .. } => ErrorCategory::State,
            EngineError::SystemFailed { .. } => ErrorCategory::System,
        }
    }

    /// The error a failing behavior returned, if it was itself an
    /// [`EngineError`] or [`EcsError`].
    ///
    /// Lets drivers see through [`EngineError::SystemFailed`] to, say, a
    /// registry error raised inside a behavior.
    pub fn root_category(&self) -> ErrorCategory {
        match self {
            EngineError::SystemFailed { source, .. } => {
                if let Some(inner) = source.downcast_ref::<EngineError>() {
                    inner.root_category()
                } else if let Some(inner) = source.downcast_ref::<EcsError>() {
                    EngineError::Ecs(inner.clone()).category()
                } else {
                    ErrorCategory::System
                }
            }
            other => other.category(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories() {
        let unknown = EngineError::from(EcsError::UnknownTemplate {
            name: "x".into(),
            registered: String::new(),
        });
        assert_eq!(unknown.category(), ErrorCategory::Registry);
        assert_eq!(
            EngineError::NoActiveWorld { operation: "tick" }.category(),
            ErrorCategory::State
        );
    }

    #[test]
    fn root_category_sees_through_behavior_failures() {
        let err = EngineError::SystemFailed {
            system: "spawner".into(),
            source: anyhow::Error::new(EcsError::UnknownComponent {
                name: "ghost".into(),
                registered: String::new(),
            }),
        };
        assert_eq!(err.category(), ErrorCategory::System);
        assert_eq!(err.root_category(), ErrorCategory::Registry);

        let plain = EngineError::SystemFailed {
            system: "s".into(),
            source: anyhow::anyhow!("boom"),
        };
        assert_eq!(plain.root_category(), ErrorCategory::System);
    }
}
