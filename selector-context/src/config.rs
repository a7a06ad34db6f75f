//! Engine configuration.

use serde::Deserialize;

use crate::error::Result;

/// Tunables for a [`Renderer`](crate::host::Renderer).
///
/// # Example
///
/// ```rust,ignore
/// let config = EngineConfig::from_json(r#"{ "max_passes": 10 }"#)?;
/// let renderer = Renderer::with_config(config);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of render passes a single flush may run before it gives
    /// up with `HostError::UpdateDepthExceeded`. Guards against components
    /// that request an update on every render.
    pub max_passes: usize,

    /// Emit development warnings: hook-count changes between renders and
    /// handles passed to components that cannot accept one.
    pub dev_warnings: bool,
}

impl EngineConfig {
    /// Parse a configuration from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_passes: 50,
            dev_warnings: cfg!(debug_assertions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HostError;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "max_passes": 3 }"#).unwrap();
        assert_eq!(config.max_passes, 3);
        assert_eq!(config.dev_warnings, EngineConfig::default().dev_warnings);
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        let err = EngineConfig::from_json("{ max_passes: }").unwrap_err();
        assert!(matches!(err, HostError::Config(_)));
    }
}
