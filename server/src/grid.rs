use log::debug;
use shared::{GridCells, GRID_HEIGHT, GRID_WIDTH};

/// The shared block grid, indexed `cells[y][x]`.
///
/// Any session may write any cell; the last write wins.
#[derive(Debug, Clone)]
pub struct Grid {
    cells: [[Option<String>; GRID_WIDTH]; GRID_HEIGHT],
}

impl Grid {
    pub fn new() -> Self {
        Self {
            cells: std::array::from_fn(|_| std::array::from_fn(|_| None)),
        }
    }

    /// Maps wire coordinates to array indices, or `None` when out of range.
    fn index(x: i64, y: i64) -> Option<(usize, usize)> {
        let x = usize::try_from(x).ok().filter(|x| *x < GRID_WIDTH)?;
        let y = usize::try_from(y).ok().filter(|y| *y < GRID_HEIGHT)?;
        Some((x, y))
    }

    /// Stores a block at `(x, y)`. Returns false and leaves the grid untouched when out of range.
    pub fn place(&mut self, x: i64, y: i64, color: &str) -> bool {
        match Self::index(x, y) {
            Some((col, row)) => {
                self.cells[row][col] = Some(color.to_string());
                true
            }
            None => {
                debug!("Ignoring block placement outside grid at ({}, {})", x, y);
                false
            }
        }
    }

    /// Empties the cell at `(x, y)`. Returns false and leaves the grid untouched when out of range.
    pub fn clear(&mut self, x: i64, y: i64) -> bool {
        match Self::index(x, y) {
            Some((col, row)) => {
                self.cells[row][col] = None;
                true
            }
            None => {
                debug!("Ignoring block deletion outside grid at ({}, {})", x, y);
                false
            }
        }
    }

    pub fn get(&self, x: i64, y: i64) -> Option<&str> {
        let (col, row) = Self::index(x, y)?;
        self.cells[row][col].as_deref()
    }

    /// Copy of every cell, row-major, for bootstrapping a new player.
    pub fn full_snapshot(&self) -> GridCells {
        self.cells.iter().map(|row| row.to_vec()).collect()
    }

    /// Number of occupied cells
    pub fn block_count(&self) -> usize {
        self.cells.iter().flatten().filter(|cell| cell.is_some()).count()
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}
