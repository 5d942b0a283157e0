//! Quadrant Kernel: turn-based field simulation over exclusively owned quadrants.
//!
//! The field is cut into equal-width quadrants arranged in a ring. Every turn
//! each quadrant gets its own worker, workers hand boundary-crossing markers
//! to their left neighbour through mailboxes, and a job-counting barrier
//! tells the coordinator when nothing is left in flight.

pub mod actors;
pub mod config;
pub mod error;
pub mod field;
pub mod job_counter;
pub mod kernel;
pub mod messages;
pub mod quadrant;
pub mod rule;

pub use actors::Coordinator;
pub use config::FieldConfig;
pub use error::{FieldError, Result};
pub use field::{FieldSnapshot, MarkerPosition};
pub use job_counter::JobCounter;
pub use kernel::{KernelBuilder, RunReport, TurnReport};
pub use messages::{Cell, Delivery, PendingPlacement};
pub use quadrant::{Grid, Quadrant, QuadrantIndex};
pub use rule::{DriftLeft, LocalRule, Outbox};
