//! Drift Experiment CLI.
//!
//! Commands:
//! - run: Run a single field for a number of turns
//! - bench: Time full laps for 1..=max quadrants
//! - trace: Follow hand-placed markers turn by turn

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use drift_experiment::experiment::{ExperimentRunner, ExperimentRunnerConfig};
use drift_experiment::generator::{FieldPreset, Placement};
use drift_experiment::results::format_duration;
use quadrant_kernel::FieldConfig;

/// Generate a timestamped output path from the given path.
/// e.g., "results.json" -> "results-20260108-010530.json"
fn timestamped_path(path: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("results");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("json");
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!("{}-{}.{}", stem, timestamp, ext))
}

#[derive(Parser)]
#[command(name = "drift-experiment")]
#[command(version)]
#[command(about = "Quadrant drift simulation experiments")]
struct Cli {
    /// JSON field configuration; flags override its values
    #[arg(long, env = "DRIFT_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Field shape flags shared by every command.
#[derive(Args, Debug)]
struct FieldArgs {
    /// Size preset (tiny, classic, wide)
    #[arg(long)]
    preset: Option<String>,

    /// Number of quadrants
    #[arg(short, long)]
    quadrants: Option<usize>,

    /// Quadrant width
    #[arg(long)]
    width: Option<usize>,

    /// Quadrant height
    #[arg(long)]
    height: Option<usize>,

    /// Random markers per quadrant
    #[arg(short, long)]
    markers: Option<usize>,

    /// Random seed
    #[arg(long, env = "DRIFT_SEED")]
    seed: Option<u64>,
}

impl FieldArgs {
    /// Resolve the field config: file or preset first, then flag overrides.
    fn resolve(&self, config_path: Option<&Path>) -> Result<FieldConfig> {
        let mut field = match (config_path, &self.preset) {
            (Some(path), _) => FieldConfig::load(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            (None, Some(preset)) => preset.parse::<FieldPreset>()?.config(),
            (None, None) => FieldConfig::default(),
        };
        if let Some(quadrants) = self.quadrants {
            field.quadrants = quadrants;
        }
        if let Some(width) = self.width {
            field.width = width;
        }
        if let Some(height) = self.height {
            field.height = height;
        }
        if let Some(markers) = self.markers {
            field.markers_per_quadrant = markers;
        }
        if self.seed.is_some() {
            field.seed = self.seed;
        }
        field.validate()?;
        Ok(field)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single field
    Run {
        #[command(flatten)]
        field: FieldArgs,

        /// Turns to run (default: one lap, width * quadrants)
        #[arg(short, long)]
        turns: Option<usize>,

        /// Extra marker as quadrant:row:column:value (repeatable)
        #[arg(long = "place")]
        placements: Vec<Placement>,

        /// Print the field before and after the run
        #[arg(long)]
        print: bool,

        /// Print per-turn metrics
        #[arg(long)]
        per_turn: bool,

        /// Output file for the result (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Time full laps for every quadrant count up to a maximum
    Bench {
        /// Largest quadrant count to run
        #[arg(long, default_value = "16")]
        max_quadrants: usize,

        /// Quadrant width and height
        #[arg(long, default_value = "50")]
        side: usize,

        /// Random markers per quadrant
        #[arg(short, long, default_value = "50")]
        markers: usize,

        /// Laps per quadrant count
        #[arg(long, default_value = "5")]
        laps: usize,

        /// Random seed
        #[arg(long, env = "DRIFT_SEED")]
        seed: Option<u64>,

        /// Output file for results (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Follow markers turn by turn for one lap
    Trace {
        #[command(flatten)]
        field: FieldArgs,

        /// Marker as quadrant:row:column:value (repeatable)
        #[arg(long = "place", default_value = "0:2:0:1")]
        placements: Vec<Placement>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Run {
            field,
            turns,
            placements,
            print,
            per_turn,
            output,
        } => {
            let mut field = field.resolve(config_path)?;
            if turns.is_some() {
                field.turns = turns;
            }
            field.validate()?;

            let runner = ExperimentRunner::new(ExperimentRunnerConfig {
                field,
                placements,
                print_field: print,
                keep_turn_metrics: per_turn || output.is_some(),
            });
            let result = runner.run().await?;

            println!("\n=== Run Result ===");
            println!(
                "Field: {} quadrants of {}x{}, {} markers",
                result.config.quadrants,
                result.config.width,
                result.config.height,
                result.initial_markers
            );
            println!("Turns: {}", result.total_turns);
            println!("Weight: {} -> {}", result.initial_weight, result.final_weight);
            println!("Forwarded/applied: {}/{}", result.forwarded, result.applied);
            println!("Counter low water: {}", result.counter_low_water);
            if result.full_laps {
                println!("Returned to start: {}", result.returned_to_start);
            }
            println!("Elapsed: {}", format_duration(result.elapsed_ms));

            if per_turn {
                println!("\nPer-Turn Metrics:");
                println!("  {:>6} {:>10} {:>8} {:>10}", "Turn", "Forwarded", "Applied", "Low water");
                for tm in &result.turn_metrics {
                    println!(
                        "  {:>6} {:>10} {:>8} {:>10}",
                        tm.turn, tm.forwarded, tm.applied, tm.counter_low_water
                    );
                }
            }

            if let Some(output) = output {
                let output_path = timestamped_path(&output);
                result.save(&output_path)?;
                info!(path = %output_path.display(), "Result saved");
            }

            if !result.is_consistent() {
                anyhow::bail!("Run broke an invariant; see the result above");
            }
        }

        Commands::Bench {
            max_quadrants,
            side,
            markers,
            laps,
            seed,
            output,
        } => {
            let mut field = FieldConfig::square(1, side).markers(markers);
            field.seed = seed;
            field.validate()?;

            info!(max_quadrants, side, markers, laps, "Starting benchmark sweep");
            let runner = ExperimentRunner::new(ExperimentRunnerConfig {
                field,
                ..Default::default()
            });
            let results = runner.bench(max_quadrants, laps).await?;

            println!("\n=== Benchmark ({} cores) ===", results.cores);
            println!("  {:>9} {:>6} {:>12} {:>12}", "Quadrants", "Turns", "Last lap ms", "Mean lap ms");
            for entry in &results.entries {
                println!(
                    "  {:>9} {:>6} {:>12.3} {:>12.3}",
                    entry.quadrants, entry.turns_per_lap, entry.last_lap_ms, entry.mean_lap_ms
                );
            }

            if let Some(output) = output {
                let output_path = timestamped_path(&output);
                results.save(&output_path)?;
                info!(path = %output_path.display(), "Results saved");
            }
        }

        Commands::Trace { field, placements } => {
            // Without a file or preset, trace the tiny field.
            let field = if field.preset.is_none() && config_path.is_none() {
                FieldArgs {
                    preset: Some("tiny".to_string()),
                    ..field
                }
            } else {
                field
            };
            let mut field = field.resolve(config_path)?;
            field.markers_per_quadrant = 0;
            field.turns = None;

            let runner = ExperimentRunner::new(ExperimentRunnerConfig {
                field,
                placements,
                ..Default::default()
            });
            let positions = runner.trace().await?;

            for (turn, markers) in positions.iter().enumerate() {
                let cells: Vec<String> = markers
                    .iter()
                    .map(|m| format!("q{} ({}, {})={}", m.quadrant, m.row, m.column, m.value))
                    .collect();
                println!("turn {:>4}: {}", turn, cells.join(", "));
            }

            if positions.first() != positions.last() {
                anyhow::bail!("Markers did not return to their starting cells");
            }
            println!("Markers returned to their starting cells after one lap");
        }
    }

    Ok(())
}
