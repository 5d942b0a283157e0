//! Quadrant: one rectangular slice of the field and its ring index.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{FieldError, Result};
use crate::messages::Cell;

/// Row-major copy of a quadrant's cells: `grid[row][column]`.
pub type Grid = Vec<Vec<Cell>>;

/// Position of a quadrant in the ring.
pub type QuadrantIndex = usize;

/// A quadrant's private sub-grid.
///
/// Exactly one worker holds a quadrant during a turn (it is moved into the
/// worker task and moved back out afterwards), so the cells need no lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quadrant {
    index: QuadrantIndex,
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Quadrant {
    /// Create an empty quadrant. Callers pass dimensions from a validated config.
    pub(crate) fn new(index: QuadrantIndex, width: usize, height: usize) -> Self {
        Self {
            index,
            width,
            height,
            cells: vec![0; width * height],
        }
    }

    pub fn index(&self) -> QuadrantIndex {
        self.index
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn offset(&self, row: usize, column: usize) -> Result<usize> {
        if row >= self.height || column >= self.width {
            return Err(FieldError::OutOfBounds {
                quadrant: self.index,
                row,
                column,
                width: self.width,
                height: self.height,
            });
        }
        Ok(row * self.width + column)
    }

    /// Read one cell.
    pub fn get(&self, row: usize, column: usize) -> Result<Cell> {
        let offset = self.offset(row, column)?;
        Ok(self.cells[offset])
    }

    /// Overwrite one cell. Last write wins.
    pub fn set(&mut self, row: usize, column: usize, value: Cell) -> Result<()> {
        let offset = self.offset(row, column)?;
        self.cells[offset] = value;
        Ok(())
    }

    /// Take a cell's value, leaving it empty.
    pub fn take(&mut self, row: usize, column: usize) -> Result<Cell> {
        let offset = self.offset(row, column)?;
        Ok(std::mem::take(&mut self.cells[offset]))
    }

    /// Snapshot of the cells. Later changes to the quadrant do not show through.
    pub fn read_grid(&self) -> Grid {
        self.cells
            .chunks(self.width)
            .map(|row| row.to_vec())
            .collect()
    }

    /// Replace every cell. The grid must have exactly this quadrant's shape.
    pub fn write_grid(&mut self, grid: &[Vec<Cell>]) -> Result<()> {
        let shape_error = |columns: usize| FieldError::GridShape {
            quadrant: self.index,
            expected_rows: self.height,
            expected_columns: self.width,
            rows: grid.len(),
            columns,
        };
        if grid.len() != self.height {
            return Err(shape_error(grid.first().map_or(0, Vec::len)));
        }
        if let Some(row) = grid.iter().find(|row| row.len() != self.width) {
            return Err(shape_error(row.len()));
        }

        for (target, source) in self.cells.chunks_mut(self.width).zip(grid) {
            target.copy_from_slice(source);
        }
        Ok(())
    }

    /// Place `count` markers of weight 1 on distinct random cells.
    ///
    /// `count` is capped at the number of cells. Returns how many were placed.
    pub fn seed_random(&mut self, count: usize, rng: &mut impl Rng) -> usize {
        let mut offsets: Vec<usize> = (0..self.cells.len()).collect();
        offsets.shuffle(rng);

        let placed = count.min(offsets.len());
        for offset in offsets.into_iter().take(placed) {
            self.cells[offset] = 1;
        }
        placed
    }

    /// Sum of all cell values.
    pub fn total_weight(&self) -> u64 {
        self.cells.iter().map(|&c| u64::from(c)).sum()
    }

    /// Number of occupied cells.
    pub fn marker_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c > 0).count()
    }

    /// Occupied cells as `(row, column, value)`.
    pub fn markers(&self) -> impl Iterator<Item = (usize, usize, Cell)> + '_ {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &value)| value > 0)
            .map(move |(offset, &value)| (offset / width, offset % width, value))
    }
}
