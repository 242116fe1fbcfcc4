//! Viewer settings

use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Tunables for every viewer spawned by a registry
///
/// Durations are given in milliseconds when deserialized.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Extra oversampling on top of the display's pixel ratio
    pub quality_multiplier: f64,
    /// Quiet period after the last resize before re-rendering
    #[serde(deserialize_with = "millis")]
    pub resize_debounce: Duration,
    /// Upper bound on one document load or one page render
    #[serde(deserialize_with = "millis")]
    pub operation_timeout: Duration,
    /// Container width used when the host cannot measure one
    pub fallback_container_width: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            quality_multiplier: 1.5,
            resize_debounce: Duration::from_millis(300),
            operation_timeout: Duration::from_secs(30),
            fallback_container_width: 800.0,
        }
    }
}

fn millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.quality_multiplier, 1.5);
        assert_eq!(config.resize_debounce, Duration::from_millis(300));
        assert_eq!(config.operation_timeout, Duration::from_secs(30));
        assert_eq!(config.fallback_container_width, 800.0);
    }

    #[test]
    fn test_partial_override_in_millis() {
        let config: ViewerConfig =
            toml::from_str("operation_timeout = 5000\nquality_multiplier = 2.0").unwrap();

        assert_eq!(config.operation_timeout, Duration::from_secs(5));
        assert_eq!(config.quality_multiplier, 2.0);
        assert_eq!(config.resize_debounce, Duration::from_millis(300));
    }
}
