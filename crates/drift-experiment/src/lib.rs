//! Drift Experiment: runs and benchmarks the quadrant drift simulation.
//!
//! This crate wraps `quadrant_kernel` with:
//! - Seeded field generation and hand-placed markers
//! - Single runs that check the fixed-point and conservation properties
//! - Benchmark sweeps over the number of quadrants

pub mod experiment;
pub mod generator;
pub mod results;
