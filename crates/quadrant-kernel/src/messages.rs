//! Message types exchanged between quadrant workers.
//!
//! Cross-quadrant effects never touch another quadrant's cells directly; they
//! travel as [`PendingPlacement`] values through the receiver's mailbox.

use serde::{Deserialize, Serialize};

/// Cell value. Zero is empty, anything positive is a marker weight.
pub type Cell = u32;

/// A cell write to be applied by the receiving quadrant.
///
/// Sent by value: once it is in a mailbox the sender keeps nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPlacement {
    /// Row in the receiving quadrant
    pub row: usize,
    /// Column in the receiving quadrant
    pub column: usize,
    /// Value to write
    pub value: Cell,
}

impl PendingPlacement {
    pub fn new(row: usize, column: usize, value: Cell) -> Self {
        Self { row, column, value }
    }
}

/// Outcome of a blocking mailbox read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// A placement arrived and must be applied.
    Placement(PendingPlacement),
    /// The coordinator ended the turn; the worker should stop draining.
    Cancelled,
    /// Every sender is gone without a cancellation. Only a broken ring does this.
    Closed,
}
