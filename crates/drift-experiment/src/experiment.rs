//! Experiment runner for drift simulations.
//!
//! Orchestrates the experiment lifecycle:
//! 1. Generate a seeded field
//! 2. Snapshot it
//! 3. Run the turns
//! 4. Compare against the snapshot and collect metrics

use std::time::Instant;

use anyhow::{bail, Result};
use chrono::Utc;
use quadrant_kernel::{FieldConfig, MarkerPosition};
use tracing::{debug, info, warn};

use crate::generator::{FieldGenerator, GeneratorConfig, Placement};
use crate::results::{BenchEntry, BenchResults, ExperimentResult};

/// Configuration for the experiment runner.
#[derive(Debug, Clone, Default)]
pub struct ExperimentRunnerConfig {
    /// Field shape, markers, turns, and seed
    pub field: FieldConfig,
    /// Hand-placed markers applied after seeding
    pub placements: Vec<Placement>,
    /// Print the field before and after the run
    pub print_field: bool,
    /// Keep per-turn metrics in the result
    pub keep_turn_metrics: bool,
}

/// Runs single experiments and benchmark sweeps.
pub struct ExperimentRunner {
    config: ExperimentRunnerConfig,
}

impl ExperimentRunner {
    pub fn new(config: ExperimentRunnerConfig) -> Self {
        Self { config }
    }

    fn generator(&self) -> FieldGenerator {
        FieldGenerator::new(GeneratorConfig {
            field: self.config.field.clone(),
            placements: self.config.placements.clone(),
        })
    }

    /// Run the configured number of turns and check the invariants.
    pub async fn run(&self) -> Result<ExperimentResult> {
        let field = &self.config.field;
        let turns = field.effective_turns();
        let mut coordinator = self.generator().generate()?;

        let before = coordinator.snapshot()?;
        if self.config.print_field {
            println!("Initial field:\n{}", before);
        }

        let started_at = Utc::now();
        let report = coordinator.run_turns(turns).await?;
        let ended_at = Utc::now();

        let after = coordinator.snapshot()?;
        if self.config.print_field {
            println!("Final field:\n{}", after);
        }

        let full_laps = turns % field.circumference() == 0;
        let returned_to_start = before == after;
        if full_laps && !returned_to_start {
            warn!(turns, "Field did not return to its starting state");
        }

        let result = ExperimentResult {
            config: field.clone(),
            started_at,
            ended_at,
            total_turns: report.turns,
            initial_weight: before.total_weight(),
            final_weight: after.total_weight(),
            initial_markers: before.marker_count(),
            forwarded: report.forwarded,
            applied: report.applied,
            counter_low_water: report.counter_low_water,
            full_laps,
            returned_to_start,
            elapsed_ms: report.elapsed_ms,
            turn_metrics: if self.config.keep_turn_metrics {
                report.history
            } else {
                Vec::new()
            },
        };

        info!(
            turns = result.total_turns,
            markers = result.initial_markers,
            forwarded = result.forwarded,
            returned_to_start = result.returned_to_start,
            elapsed_ms = result.elapsed_ms,
            "Experiment complete"
        );
        Ok(result)
    }

    /// Follow every marker turn by turn for one lap.
    ///
    /// Returns the marker positions after each turn, starting with the
    /// initial field.
    pub async fn trace(&self) -> Result<Vec<Vec<MarkerPosition>>> {
        let turns = self.config.field.effective_turns();
        let mut coordinator = self.generator().generate()?;

        let mut positions = vec![coordinator.snapshot()?.markers()];
        for _ in 0..turns {
            coordinator.run_turns(1).await?;
            positions.push(coordinator.snapshot()?.markers());
        }
        Ok(positions)
    }

    /// Time full laps for every quadrant count from 1 to `max_quadrants`.
    ///
    /// Each lap must bring the field back to where it started; a lap that
    /// does not is an error.
    pub async fn bench(&self, max_quadrants: usize, laps: usize) -> Result<BenchResults> {
        if max_quadrants == 0 || laps == 0 {
            bail!("bench needs at least one quadrant count and one lap");
        }

        let base = &self.config.field;
        let mut results = BenchResults::new(base.width, base.markers_per_quadrant);

        for quadrants in 1..=max_quadrants {
            let field = FieldConfig {
                quadrants,
                turns: None,
                ..base.clone()
            };
            let turns_per_lap = field.effective_turns();
            let mut coordinator = FieldGenerator::new(GeneratorConfig {
                field,
                placements: Vec::new(),
            })
            .generate()?;

            let mut total_ms = 0.0;
            let mut last_lap_ms = 0.0;
            for lap in 0..laps {
                let before = coordinator.snapshot()?;
                let start = Instant::now();
                coordinator.run_turns(turns_per_lap).await?;
                last_lap_ms = start.elapsed().as_secs_f64() * 1000.0;
                total_ms += last_lap_ms;

                if before != coordinator.snapshot()? {
                    bail!(
                        "Field changed after a full lap (quadrants={}, lap={})",
                        quadrants,
                        lap
                    );
                }
                debug!(quadrants, lap, last_lap_ms, "Lap complete");
            }

            let entry = BenchEntry {
                quadrants,
                turns_per_lap,
                laps,
                last_lap_ms,
                mean_lap_ms: total_ms / laps as f64,
            };
            info!(
                quadrants,
                last_lap_ms = format!("{:.3}", entry.last_lap_ms),
                mean_lap_ms = format!("{:.3}", entry.mean_lap_ms),
                "Benchmark entry"
            );
            results.add(entry);
        }

        Ok(results)
    }
}
