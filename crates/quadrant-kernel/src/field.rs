//! FieldSnapshot: a deep copy of every quadrant, for printing and comparison.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::messages::Cell;
use crate::quadrant::{Grid, QuadrantIndex};

/// A marker's position in the whole field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerPosition {
    pub quadrant: QuadrantIndex,
    pub row: usize,
    pub column: usize,
    pub value: Cell,
}

/// Copy of the whole field, quadrant by quadrant in ring order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub quadrants: Vec<Grid>,
}

impl FieldSnapshot {
    pub fn new(quadrants: Vec<Grid>) -> Self {
        Self { quadrants }
    }

    /// Rows in the field: the height of the tallest quadrant.
    pub fn height(&self) -> usize {
        self.quadrants.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Cell value, or `None` when out of range.
    pub fn get(&self, quadrant: QuadrantIndex, row: usize, column: usize) -> Option<Cell> {
        self.quadrants.get(quadrant)?.get(row)?.get(column).copied()
    }

    /// Sum of every cell in the field.
    pub fn total_weight(&self) -> u64 {
        self.cells().map(u64::from).sum()
    }

    /// Number of occupied cells.
    pub fn marker_count(&self) -> usize {
        self.cells().filter(|&c| c > 0).count()
    }

    fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.quadrants.iter().flatten().flatten().copied()
    }

    /// Every occupied cell, in ring order then row-major.
    pub fn markers(&self) -> Vec<MarkerPosition> {
        let mut markers = Vec::new();
        for (quadrant, grid) in self.quadrants.iter().enumerate() {
            for (row, cells) in grid.iter().enumerate() {
                for (column, &value) in cells.iter().enumerate() {
                    if value > 0 {
                        markers.push(MarkerPosition {
                            quadrant,
                            row,
                            column,
                            value,
                        });
                    }
                }
            }
        }
        markers
    }
}

/// Prints the field row by row with quadrants side by side.
impl fmt::Display for FieldSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.height() {
            let line = self
                .quadrants
                .iter()
                .map(|grid| {
                    grid.get(row)
                        .map(|cells| {
                            cells
                                .iter()
                                .map(|cell| cell.to_string())
                                .collect::<Vec<_>>()
                                .join(" ")
                        })
                        .unwrap_or_default()
                })
                .collect::<Vec<_>>()
                .join("  ");
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
