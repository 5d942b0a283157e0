//! Results collection and output for drift experiments.
//!
//! Captures metrics like:
//! - Turns run and wall time
//! - Boundary traffic (forwarded vs applied placements)
//! - Whether the field returned to its starting state
//! - Per-quadrant-count timings for benchmark sweeps

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use quadrant_kernel::{FieldConfig, TurnReport};
use serde::{Deserialize, Serialize};

/// Results from a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentResult {
    /// Field configuration
    pub config: FieldConfig,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time
    pub ended_at: DateTime<Utc>,
    /// Total turns executed
    pub total_turns: usize,
    /// Total weight before the first turn
    pub initial_weight: u64,
    /// Total weight after the last turn
    pub final_weight: u64,
    /// Markers before the first turn
    pub initial_markers: usize,
    /// Placements forwarded across boundaries
    pub forwarded: usize,
    /// Placements applied by receivers
    pub applied: usize,
    /// Lowest job count observed in any turn
    pub counter_low_water: i64,
    /// Whether the run length was a whole number of laps
    pub full_laps: bool,
    /// Whether the final field equals the initial field
    pub returned_to_start: bool,
    /// Wall time in milliseconds
    pub elapsed_ms: u64,
    /// Per-turn metrics
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub turn_metrics: Vec<TurnReport>,
}

impl ExperimentResult {
    /// True when the run kept every invariant it can be held to.
    pub fn is_consistent(&self) -> bool {
        let conserved = self.initial_weight == self.final_weight;
        let balanced = self.forwarded == self.applied;
        let fixed_point = !self.full_laps || self.returned_to_start;
        conserved && balanced && fixed_point && self.counter_low_water >= 0
    }

    /// Save to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Timing for one quadrant count in a benchmark sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchEntry {
    /// Quadrants (worker tasks) in the field
    pub quadrants: usize,
    /// Turns per lap (W * Q)
    pub turns_per_lap: usize,
    /// Laps run, including warm-up laps
    pub laps: usize,
    /// Wall time of the last lap
    pub last_lap_ms: f64,
    /// Mean wall time over all laps
    pub mean_lap_ms: f64,
}

/// Results of a benchmark sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchResults {
    /// Start time
    pub started_at: DateTime<Utc>,
    /// Available parallelism on the machine
    pub cores: usize,
    /// Quadrant width and height
    pub side: usize,
    /// Markers per quadrant
    pub markers: usize,
    /// One entry per quadrant count
    pub entries: Vec<BenchEntry>,
}

impl BenchResults {
    pub fn new(side: usize, markers: usize) -> Self {
        Self {
            started_at: Utc::now(),
            cores: std::thread::available_parallelism().map_or(1, |n| n.get()),
            side,
            markers,
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, entry: BenchEntry) {
        self.entries.push(entry);
    }

    /// Save results to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load results from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let results = serde_json::from_str(&json)?;
        Ok(results)
    }
}

/// Format a duration in milliseconds for display.
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{:.1}m", ms as f64 / 60_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> ExperimentResult {
        ExperimentResult {
            config: FieldConfig::square(2, 3),
            started_at: Utc::now(),
            ended_at: Utc::now(),
            total_turns: 6,
            initial_weight: 4,
            final_weight: 4,
            initial_markers: 4,
            forwarded: 4,
            applied: 4,
            counter_low_water: 0,
            full_laps: true,
            returned_to_start: true,
            elapsed_ms: 3,
            turn_metrics: vec![],
        }
    }

    #[test]
    fn test_consistency_checks() {
        let result = sample_result();
        assert!(result.is_consistent());

        let mut lost = sample_result();
        lost.applied = 3;
        assert!(!lost.is_consistent());

        let mut drifted = sample_result();
        drifted.returned_to_start = false;
        assert!(!drifted.is_consistent());
        drifted.full_laps = false;
        assert!(drifted.is_consistent());
    }

    #[test]
    fn test_bench_results_round_trip_through_file() {
        let mut results = BenchResults::new(10, 5);
        results.add(BenchEntry {
            quadrants: 2,
            turns_per_lap: 20,
            laps: 3,
            last_lap_ms: 1.5,
            mean_lap_ms: 2.0,
        });

        let path = std::env::temp_dir().join(format!(
            "drift-bench-{}-{}.json",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        results.save(&path).unwrap();
        let loaded = BenchResults::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.entries.len(), 1);
        assert_eq!(loaded.entries[0].quadrants, 2);
        assert_eq!(loaded.side, 10);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(250), "250ms");
        assert_eq!(format_duration(1500), "1.5s");
        assert_eq!(format_duration(90_000), "1.5m");
    }
}
