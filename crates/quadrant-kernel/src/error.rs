//! Error types for the quadrant kernel.
//!
//! Cancellation of a draining worker is not represented here: it is a normal
//! turn ending and shows up as [`crate::messages::Delivery::Cancelled`].

use thiserror::Error;

/// Convenience alias used throughout the kernel.
pub type Result<T> = std::result::Result<T, FieldError>;

/// Everything that can stop a simulation run.
#[derive(Error, Debug)]
pub enum FieldError {
    /// A configuration value is out of range; raised before any worker starts.
    #[error("invalid configuration: {field} must be at least 1 (got {value})")]
    InvalidConfig { field: &'static str, value: usize },

    /// A configuration file could not be read or parsed.
    #[error("failed to load configuration from {path}: {reason}")]
    ConfigLoad { path: String, reason: String },

    /// A cell coordinate fell outside the owning quadrant.
    #[error(
        "cell ({row}, {column}) is outside quadrant {quadrant} ({height} rows x {width} columns)"
    )]
    OutOfBounds {
        quadrant: usize,
        row: usize,
        column: usize,
        width: usize,
        height: usize,
    },

    /// A replacement grid does not match the quadrant's dimensions.
    #[error(
        "grid for quadrant {quadrant} must be {expected_rows}x{expected_columns}, got {rows}x{columns}"
    )]
    GridShape {
        quadrant: usize,
        expected_rows: usize,
        expected_columns: usize,
        rows: usize,
        columns: usize,
    },

    /// A quadrant index does not exist in the ring.
    #[error("no quadrant {index} in a ring of {len}")]
    UnknownQuadrant { index: usize, len: usize },

    /// The job counter went below zero: some decrement had no matching work.
    #[error("job counter reached {count} at the end of turn {turn}")]
    NegativeJobCount { turn: usize, count: i64 },

    /// A mailbox receiver was gone while its quadrant was still expected to drain.
    #[error("mailbox of quadrant {quadrant} is closed")]
    MailboxClosed { quadrant: usize },

    /// A worker panicked or stopped before the coordinator cancelled it.
    #[error("worker for quadrant {quadrant} failed during turn {turn}: {reason}")]
    WorkerFailed {
        quadrant: usize,
        turn: usize,
        reason: String,
    },

    /// A previous run aborted and the quadrant data is no longer trustworthy.
    #[error("coordinator aborted during turn {turn}; rebuild it before running again")]
    Aborted { turn: usize },
}

impl FieldError {
    /// True for errors that mean the turn accounting itself is broken.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, FieldError::NegativeJobCount { .. })
    }
}
