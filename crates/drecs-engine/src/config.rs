//! Runtime configuration.

use serde::{Deserialize, Serialize};

/// Suffix tried when a scheduled system name is not registered as-is.
pub const DEFAULT_FALLBACK_SUFFIX: &str = "_system";

/// Configuration for a [`Runtime`](crate::runtime::Runtime).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// When an active system name is not registered, also try
    /// `name + suffix`. `None` requires exact registration.
    pub fallback_suffix: Option<String>,
    /// Check every cross reference in the registry when the runtime is
    /// built, instead of failing on first use.
    pub validate_registry: bool,
    /// Record per-system timings in [`TickDiagnostics`](crate::runtime::TickDiagnostics).
    pub collect_diagnostics: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            fallback_suffix: Some(DEFAULT_FALLBACK_SUFFIX.to_owned()),
            validate_registry: true,
            collect_diagnostics: true,
        }
    }
}

impl RuntimeConfig {
    /// Exact-name system resolution only.
    pub fn strict() -> Self {
        Self {
            fallback_suffix: None,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_legacy_suffix() {
        let config = RuntimeConfig::default();
        assert_eq!(config.fallback_suffix.as_deref(), Some("_system"));
        assert!(config.validate_registry);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: RuntimeConfig =
            serde_json::from_value(serde_json::json!({ "fallback_suffix": null })).unwrap();
        assert_eq!(config, RuntimeConfig::strict());
    }
}
