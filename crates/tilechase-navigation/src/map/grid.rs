//! Walkability grid built from tile layer data.
//!
//! The grid is immutable once built. Planners borrow it read-only, so a single
//! grid can be shared by every agent pathing on the same layer.

#![warn(missing_docs)]

use core::fmt;

use tracing::{debug, warn};

use super::layer::{TileLayer, VertexRow};
use super::point_types::GridPoint;
use super::transform::{CoordinateTransformer, TileGeometry};
use crate::error::NavigationError;

/// Traversability of a single cell.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellState {
    /// The agent may enter this cell.
    Walkable,
    /// The agent may not enter this cell.
    #[default]
    Blocked,
}

impl CellState {
    /// Character used when printing a grid.
    pub fn as_char(self) -> char {
        match self {
            CellState::Walkable => '.',
            CellState::Blocked => '#',
        }
    }
}

/// Immutable 2D walkability grid indexed `[row][col]`.
#[derive(Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    /// Row-major cell states.
    cells: Vec<CellState>,
}

impl Grid {
    /// Gets the width of the grid in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Gets the height of the grid in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the row-major index of `p`, or `None` when out of bounds.
    fn index(&self, p: GridPoint) -> Option<usize> {
        let col = usize::try_from(p.x).ok()?;
        let row = usize::try_from(p.y).ok()?;
        (col < self.width && row < self.height).then(|| row * self.width + col)
    }

    /// Returns true if `p` lies inside the grid.
    pub fn contains(&self, p: GridPoint) -> bool {
        self.index(p).is_some()
    }

    /// Gets the state of the cell at `p`, or `None` when out of bounds.
    pub fn state(&self, p: GridPoint) -> Option<CellState> {
        self.index(p).map(|i| self.cells[i])
    }

    /// Returns true if `p` is inside the grid and walkable.
    pub fn is_walkable(&self, p: GridPoint) -> bool {
        self.state(p) == Some(CellState::Walkable)
    }

    /// Counts the walkable cells.
    pub fn walkable_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| **c == CellState::Walkable)
            .count()
    }

    /// Iterates the rows of the grid, lowest row index first.
    pub fn rows(&self) -> impl Iterator<Item = &[CellState]> {
        self.cells.chunks(self.width)
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("walkable", &self.walkable_count())
            .finish()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Grid ({}x{})", self.width, self.height)?;
        for row in self.rows() {
            for cell in row {
                write!(f, "{}", cell.as_char())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Builds [`Grid`]s from tile layer vertex data.
pub struct GridBuilder;

impl GridBuilder {
    /// Builds a grid of `width` x `height` cells.
    ///
    /// Every cell starts blocked. Each `(row, column key)` present in
    /// `vertices` marks that cell walkable. Column keys that are not
    /// non-negative integers, and entries outside the declared size, are
    /// skipped.
    ///
    /// # Errors
    /// * `NavigationError::InvalidDimensions` - if either dimension is not positive.
    pub fn build(
        vertices: &[Option<VertexRow>],
        width: i32,
        height: i32,
    ) -> Result<Grid, NavigationError> {
        if width <= 0 {
            return Err(NavigationError::InvalidDimensions(
                "Grid width must be positive",
            ));
        }
        if height <= 0 {
            return Err(NavigationError::InvalidDimensions(
                "Grid height must be positive",
            ));
        }

        let (width, height) = (width as usize, height as usize);
        let total_cells = width
            .checked_mul(height)
            .ok_or(NavigationError::InvalidDimensions(
                "Grid dimensions too large, would cause overflow",
            ))?;

        let mut cells = vec![CellState::Blocked; total_cells];
        let mut skipped = 0usize;

        for (row, entries) in vertices.iter().enumerate() {
            let Some(entries) = entries else {
                continue;
            };
            for key in entries.keys() {
                let Ok(col) = key.parse::<usize>() else {
                    skipped += 1;
                    continue;
                };
                if row >= height || col >= width {
                    warn!(row, col, width, height, "Ignoring tile outside the layer size");
                    skipped += 1;
                    continue;
                }
                cells[row * width + col] = CellState::Walkable;
            }
        }

        let grid = Grid {
            width,
            height,
            cells,
        };
        debug!(
            width,
            height,
            walkable = grid.walkable_count(),
            skipped,
            "Built walkability grid"
        );
        Ok(grid)
    }

    /// Builds the grid and its coordinate transform from a tile layer.
    ///
    /// # Errors
    /// * `NavigationError::InvalidDimensions` - if the layer size is not positive.
    /// * `NavigationError::InvalidGeometry` - if the tile size or origin is unusable.
    pub fn from_layer<L: TileLayer + ?Sized>(
        layer: &L,
    ) -> Result<(Grid, CoordinateTransformer), NavigationError> {
        let (tile_width, tile_height) = layer.tile_size();
        let geometry = TileGeometry::new(tile_width, tile_height, layer.bounding_box_origin())?;
        let (width, height) = layer.layer_size();
        let grid = Self::build(layer.vertices(), width, height)?;
        Ok((grid, CoordinateTransformer::new(geometry)))
    }
}
