use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_gravity() -> [f32; 2] {
    [0.0, -98.0]
}
const fn default_fixed_rate() -> u32 {
    0
}
const fn default_substeps() -> u32 {
    1
}
const fn default_speed() -> f32 {
    1.0
}
const fn default_update_rate() -> u32 {
    0
}

// ---------------------------------------------------------------------------
// PhysicsConfig
// ---------------------------------------------------------------------------

/// Physics world configuration.
///
/// `fixed_rate > 0` selects fixed-rate stepping (deterministic,
/// frame-rate independent); `fixed_rate == 0` selects substep mode,
/// where each engine advance divides the accumulated frame time into
/// `substeps` equal steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Gravity vector [x, y] in points/s^2 (default: [0, -98]).
    #[serde(default = "default_gravity")]
    pub gravity: [f32; 2],

    /// Fixed steps per second; 0 disables fixed-rate mode (default: 0).
    #[serde(default = "default_fixed_rate")]
    pub fixed_rate: u32,

    /// Substeps per engine advance in substep mode (default: 1).
    #[serde(default = "default_substeps")]
    pub substeps: u32,

    /// Simulation speed multiplier (default: 1.0).
    #[serde(default = "default_speed")]
    pub speed: f32,

    /// Update calls to skip between engine advances in substep mode;
    /// 0 advances on every call (default: 0).
    #[serde(default = "default_update_rate")]
    pub update_rate: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: default_gravity(),
            fixed_rate: default_fixed_rate(),
            substeps: default_substeps(),
            speed: default_speed(),
            update_rate: default_update_rate(),
        }
    }
}

impl PhysicsConfig {
    /// Parse a config from a TOML string and validate it.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.substeps == 0 {
            return Err(ConfigError::InvalidValue {
                field: "substeps",
                message: "must be >= 1".into(),
            });
        }
        if !(self.speed > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "speed",
                message: format!("must be > 0, got {}", self.speed),
            });
        }
        if !self.gravity.iter().all(|g| g.is_finite()) {
            return Err(ConfigError::InvalidValue {
                field: "gravity",
                message: format!("must be finite, got {:?}", self.gravity),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_substep_mode() {
        let config = PhysicsConfig::default();
        assert_eq!(config.fixed_rate, 0);
        assert_eq!(config.substeps, 1);
        assert!((config.speed - 1.0).abs() < f32::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config = PhysicsConfig::from_toml_str("").unwrap();
        assert_eq!(config, PhysicsConfig::default());
    }

    #[test]
    fn partial_toml_fills_remaining_fields() {
        let config = PhysicsConfig::from_toml_str("fixed_rate = 60\nspeed = 2.0").unwrap();
        assert_eq!(config.fixed_rate, 60);
        assert!((config.speed - 2.0).abs() < f32::EPSILON);
        assert_eq!(config.substeps, 1);
        assert_eq!(config.gravity, default_gravity());
    }

    #[test]
    fn zero_substeps_rejected() {
        let err = PhysicsConfig::from_toml_str("substeps = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { field: "substeps", .. }
        ));
    }

    #[test]
    fn non_positive_speed_rejected() {
        assert!(PhysicsConfig::from_toml_str("speed = 0.0").is_err());
        assert!(PhysicsConfig::from_toml_str("speed = -1.0").is_err());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = PhysicsConfig::from_toml_str("fixed_rate = ").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
