//! The simulation kernel: run reports and the coordinator builder.
//!
//! ## Usage
//!
//! ```ignore
//! use quadrant_kernel::{FieldConfig, KernelBuilder};
//!
//! let config = FieldConfig::square(4, 50).markers(50).seed(7);
//! let mut coordinator = KernelBuilder::new(config.clone()).build()?;
//!
//! let before = coordinator.snapshot()?;
//! coordinator.run_turns(config.effective_turns()).await?;
//! assert_eq!(before, coordinator.snapshot()?);
//! ```

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::actors::Coordinator;
use crate::config::FieldConfig;
use crate::error::Result;
use crate::rule::LocalRule;

/// Result of a single turn.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReport {
    /// Zero-based turn number since the coordinator was built
    pub turn: usize,
    /// Placements sent across quadrant boundaries
    pub forwarded: usize,
    /// Placements received and applied
    pub applied: usize,
    /// Lowest job count observed during the turn
    pub counter_low_water: i64,
    /// Decrements the job counter received during the turn
    #[serde(default)]
    pub decrements: u64,
}

/// Result of a `run_turns` call.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Turns completed
    pub turns: usize,
    /// Total placements forwarded
    pub forwarded: usize,
    /// Total placements applied
    pub applied: usize,
    /// Lowest job count observed in any turn
    pub counter_low_water: i64,
    /// Wall time of the whole run
    pub elapsed_ms: u64,
    /// Per-turn results
    pub history: Vec<TurnReport>,
}

impl RunReport {
    pub(crate) fn record(&mut self, turn: TurnReport) {
        self.counter_low_water = if self.turns == 0 {
            turn.counter_low_water
        } else {
            self.counter_low_water.min(turn.counter_low_water)
        };
        self.turns += 1;
        self.forwarded += turn.forwarded;
        self.applied += turn.applied;
        self.history.push(turn);
    }

    /// True when every forwarded placement was applied.
    pub fn is_balanced(&self) -> bool {
        self.forwarded == self.applied
    }
}

/// Builder for a seeded coordinator.
pub struct KernelBuilder {
    config: FieldConfig,
    rule: Option<Arc<dyn LocalRule>>,
}

impl KernelBuilder {
    pub fn new(config: FieldConfig) -> Self {
        Self { config, rule: None }
    }

    /// Replace the default drift-left rule.
    pub fn rule(mut self, rule: Arc<dyn LocalRule>) -> Self {
        self.rule = Some(rule);
        self
    }

    /// Validate the config, build the field, and seed markers.
    ///
    /// Markers are placed with the configured seed, or from entropy when
    /// no seed is set.
    pub fn build(self) -> Result<Coordinator> {
        let mut coordinator = match self.rule {
            Some(rule) => Coordinator::with_rule(&self.config, rule)?,
            None => Coordinator::new(&self.config)?,
        };

        if self.config.markers_per_quadrant > 0 {
            let placed = match self.config.seed {
                Some(seed) => coordinator.seed_random(
                    self.config.markers_per_quadrant,
                    &mut StdRng::seed_from_u64(seed),
                )?,
                None => coordinator.seed_random(self.config.markers_per_quadrant, &mut rand::rng())?,
            };
            debug!(placed, seed = ?self.config.seed, "Seeded markers");
        }

        Ok(coordinator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accumulates() {
        let mut report = RunReport::default();
        report.record(TurnReport {
            turn: 0,
            forwarded: 2,
            applied: 2,
            counter_low_water: 1,
            decrements: 6,
        });
        report.record(TurnReport {
            turn: 1,
            forwarded: 1,
            applied: 1,
            counter_low_water: 0,
            decrements: 5,
        });

        assert_eq!(report.turns, 2);
        assert_eq!(report.forwarded, 3);
        assert!(report.is_balanced());
        assert_eq!(report.counter_low_water, 0);
        assert_eq!(report.history.len(), 2);
        assert_eq!(report.history[0].decrements, 6);
    }

    #[test]
    fn test_builder_seeds_reproducibly() {
        let config = FieldConfig::square(3, 6).markers(5).seed(11);
        let first = KernelBuilder::new(config.clone()).build().unwrap();
        let second = KernelBuilder::new(config).build().unwrap();

        let snapshot = first.snapshot().unwrap();
        assert_eq!(snapshot.marker_count(), 15);
        assert_eq!(snapshot, second.snapshot().unwrap());
    }
}
