//! Field generator: builds seeded coordinators for experiments.
//!
//! Random markers come from the kernel's seeded placement; hand-written
//! markers are given as `quadrant:row:column:value` strings and applied on
//! top.

use std::str::FromStr;

use anyhow::{bail, Context, Result};
use quadrant_kernel::{Cell, Coordinator, FieldConfig, KernelBuilder};
use serde::{Deserialize, Serialize};

/// A single hand-placed marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub quadrant: usize,
    pub row: usize,
    pub column: usize,
    pub value: Cell,
}

impl FromStr for Placement {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        let [quadrant, row, column, value] = parts.as_slice() else {
            bail!(
                "Invalid placement '{}': expected quadrant:row:column:value",
                s
            );
        };
        let placement = Placement {
            quadrant: quadrant.parse().with_context(|| format!("bad quadrant in '{}'", s))?,
            row: row.parse().with_context(|| format!("bad row in '{}'", s))?,
            column: column.parse().with_context(|| format!("bad column in '{}'", s))?,
            value: value.parse().with_context(|| format!("bad value in '{}'", s))?,
        };
        if placement.value == 0 {
            bail!("Invalid placement '{}': value must be positive", s);
        }
        Ok(placement)
    }
}

/// Configuration for field generation.
#[derive(Debug, Clone, Default)]
pub struct GeneratorConfig {
    /// Field shape, marker count, and seed
    pub field: FieldConfig,
    /// Extra markers placed after random seeding
    pub placements: Vec<Placement>,
}

/// Builds coordinators from a generator config.
pub struct FieldGenerator {
    config: GeneratorConfig,
}

impl FieldGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Build a seeded coordinator with the configured placements applied.
    pub fn generate(&self) -> Result<Coordinator> {
        let mut coordinator = KernelBuilder::new(self.config.field.clone())
            .build()
            .context("Failed to build field")?;

        for placement in &self.config.placements {
            coordinator
                .place(
                    placement.quadrant,
                    placement.row,
                    placement.column,
                    placement.value,
                )
                .with_context(|| format!("Failed to apply {:?}", placement))?;
        }

        Ok(coordinator)
    }
}

/// Field size presets for experiments.
#[derive(Debug, Clone, Copy)]
pub enum FieldPreset {
    /// Tiny: 4 quadrants of 5x5, one marker each
    Tiny,
    /// Classic: 4 quadrants of 50x50, 50 markers each
    Classic,
    /// Wide: 8 quadrants of 100x50, 200 markers each
    Wide,
    /// Custom shape
    Custom {
        quadrants: usize,
        width: usize,
        height: usize,
        markers: usize,
    },
}

impl FieldPreset {
    /// Get the field config for this preset.
    pub fn config(self) -> FieldConfig {
        match self {
            FieldPreset::Tiny => FieldConfig::square(4, 5).markers(1),
            FieldPreset::Classic => FieldConfig::square(4, 50).markers(50),
            FieldPreset::Wide => FieldConfig {
                quadrants: 8,
                width: 100,
                height: 50,
                markers_per_quadrant: 200,
                turns: None,
                seed: None,
            },
            FieldPreset::Custom {
                quadrants,
                width,
                height,
                markers,
            } => FieldConfig {
                quadrants,
                width,
                height,
                markers_per_quadrant: markers,
                turns: None,
                seed: None,
            },
        }
    }
}

impl FromStr for FieldPreset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "tiny" => Ok(FieldPreset::Tiny),
            "classic" => Ok(FieldPreset::Classic),
            "wide" => Ok(FieldPreset::Wide),
            _ => bail!("Unknown preset: {}. Valid: tiny, classic, wide", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_placement() {
        let placement: Placement = "0:2:0:1".parse().unwrap();
        assert_eq!(
            placement,
            Placement {
                quadrant: 0,
                row: 2,
                column: 0,
                value: 1
            }
        );

        assert!("0:2:0".parse::<Placement>().is_err());
        assert!("0:2:x:1".parse::<Placement>().is_err());
        assert!("0:2:0:0".parse::<Placement>().is_err());
    }

    #[test]
    fn test_generate_applies_placements() {
        let config = GeneratorConfig {
            field: FieldConfig::square(2, 3).markers(0),
            placements: vec!["1:1:2:5".parse().unwrap()],
        };
        let coordinator = FieldGenerator::new(config).generate().unwrap();
        let field = coordinator.snapshot().unwrap();
        assert_eq!(field.get(1, 1, 2), Some(5));
        assert_eq!(field.total_weight(), 5);
    }

    #[test]
    fn test_generate_rejects_out_of_range_placement() {
        let config = GeneratorConfig {
            field: FieldConfig::square(2, 3).markers(0),
            placements: vec!["2:0:0:1".parse().unwrap()],
        };
        assert!(FieldGenerator::new(config).generate().is_err());
    }

    #[test]
    fn test_presets_are_valid() {
        for preset in [FieldPreset::Tiny, FieldPreset::Classic, FieldPreset::Wide] {
            assert!(preset.config().validate().is_ok());
        }
        assert_eq!(FieldPreset::Classic.config().effective_turns(), 200);
        assert!("huge".parse::<FieldPreset>().is_err());
    }
}
