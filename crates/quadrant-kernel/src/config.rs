//! Configuration types for the kernel.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FieldError, Result};

/// Top-level field configuration.
///
/// Describes how the field is cut into quadrants and how long a run lasts.
/// Loaded from JSON at runtime or built in code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Number of quadrants in the ring (Q)
    pub quadrants: usize,

    /// Columns per quadrant (W)
    pub width: usize,

    /// Rows per quadrant, equal to the field height (H)
    pub height: usize,

    /// Markers seeded into each quadrant before the first turn
    #[serde(default)]
    pub markers_per_quadrant: usize,

    /// Turns per run; `None` means one full lap of the ring (W * Q)
    #[serde(default)]
    pub turns: Option<usize>,

    /// Seed for marker placement (None for entropy)
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            quadrants: 4,
            width: 50,
            height: 50,
            markers_per_quadrant: 50,
            turns: None,
            seed: None,
        }
    }
}

impl FieldConfig {
    /// Create a config for `quadrants` square quadrants of side `side`.
    pub fn square(quadrants: usize, side: usize) -> Self {
        Self {
            quadrants,
            width: side,
            height: side,
            ..Default::default()
        }
    }

    /// Set the number of markers seeded per quadrant.
    pub fn markers(mut self, count: usize) -> Self {
        self.markers_per_quadrant = count;
        self
    }

    /// Set an explicit turn count.
    pub fn turns(mut self, turns: usize) -> Self {
        self.turns = Some(turns);
        self
    }

    /// Set the placement seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Total circumference of the ring in columns.
    pub fn circumference(&self) -> usize {
        self.width * self.quadrants
    }

    /// Turns to run: the explicit count, or one lap so every marker returns home.
    pub fn effective_turns(&self) -> usize {
        self.turns.unwrap_or_else(|| self.circumference())
    }

    /// Reject zero-sized fields and empty runs.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("quadrants", self.quadrants),
            ("width", self.width),
            ("height", self.height),
            ("turns", self.effective_turns()),
        ];
        for (field, value) in checks {
            if value == 0 {
                return Err(FieldError::InvalidConfig { field, value });
            }
        }
        Ok(())
    }

    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let load_error = |reason: String| FieldError::ConfigLoad {
            path: path.display().to_string(),
            reason,
        };
        let json = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        let config: Self = serde_json::from_str(&json).map_err(|e| load_error(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_turns_is_one_lap() {
        let config = FieldConfig::square(4, 5);
        assert_eq!(config.effective_turns(), 20);
        assert_eq!(config.turns(7).effective_turns(), 7);
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        assert!(FieldConfig::default().validate().is_ok());

        let err = FieldConfig::square(0, 5).validate().unwrap_err();
        assert!(matches!(
            err,
            FieldError::InvalidConfig {
                field: "quadrants",
                ..
            }
        ));

        let mut config = FieldConfig::square(2, 5);
        config.height = 0;
        assert!(matches!(
            config.validate(),
            Err(FieldError::InvalidConfig { field: "height", .. })
        ));

        assert!(matches!(
            FieldConfig::square(2, 5).turns(0).validate(),
            Err(FieldError::InvalidConfig { field: "turns", .. })
        ));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: FieldConfig =
            serde_json::from_str(r#"{"quadrants": 3, "width": 4, "height": 2}"#).unwrap();
        assert_eq!(config.markers_per_quadrant, 0);
        assert_eq!(config.turns, None);
        assert_eq!(config.effective_turns(), 12);
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = FieldConfig::load("/nonexistent/field.json").unwrap_err();
        assert!(matches!(err, FieldError::ConfigLoad { .. }));
    }
}
