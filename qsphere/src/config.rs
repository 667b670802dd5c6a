// src/config.rs
use crate::error::{QsphereError, Result};
use crate::state::UnitPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AnimationConfig {
    /// Frames generated for each elementary rotation.
    pub steps_per_rotation: usize,
    /// Delay between ticks in the interactive front end.
    pub tick_interval_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            steps_per_rotation: 50,
            tick_interval_ms: 10,
        }
    }
}

impl AnimationConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Top-level settings. Every field has a default, so `{}` is a valid file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct VisualizerConfig {
    pub animation: AnimationConfig,
    pub max_vectors: usize,
    pub trace_length: usize,
    pub random_seed: u64,
    pub unit_policy: UnitPolicy,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            animation: AnimationConfig::default(),
            max_vectors: 10,
            trace_length: 500,
            random_seed: 0,
            unit_policy: UnitPolicy::default(),
        }
    }
}

impl VisualizerConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: VisualizerConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.animation.steps_per_rotation == 0 {
            return Err(QsphereError::InvalidConfig(
                "stepsPerRotation must be at least 1".into(),
            ));
        }
        if self.animation.tick_interval_ms == 0 {
            return Err(QsphereError::InvalidConfig(
                "tickIntervalMs must be at least 1".into(),
            ));
        }
        if self.max_vectors == 0 {
            return Err(QsphereError::InvalidConfig(
                "maxVectors must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = VisualizerConfig::from_json_str("{}").unwrap();
        assert_eq!(config, VisualizerConfig::default());
        assert_eq!(config.animation.steps_per_rotation, 50);
        assert_eq!(config.animation.tick_interval(), Duration::from_millis(10));
        assert_eq!(config.max_vectors, 10);
        assert_eq!(config.trace_length, 500);
    }

    #[test]
    fn partial_override() {
        let config = VisualizerConfig::from_json_str(
            r#"{"animation": {"stepsPerRotation": 5}, "unitPolicy": "normalize"}"#,
        )
        .unwrap();
        assert_eq!(config.animation.steps_per_rotation, 5);
        assert_eq!(config.animation.tick_interval_ms, 10);
        assert_eq!(config.unit_policy, UnitPolicy::Normalize);
    }

    #[test]
    fn rejects_zero_steps() {
        let err = VisualizerConfig::from_json_str(r#"{"animation": {"stepsPerRotation": 0}}"#)
            .unwrap_err();
        assert!(matches!(err, QsphereError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_zero_tick() {
        let mut config = VisualizerConfig::default();
        config.animation.tick_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_json() {
        assert!(matches!(
            VisualizerConfig::from_json_str("{"),
            Err(QsphereError::Json(_))
        ));
    }
}
