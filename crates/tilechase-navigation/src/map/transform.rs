//! Conversion between world positions and grid cells.

use super::point_types::{GridPoint, WorldPoint};
use crate::error::NavigationError;

/// Tile size and layer placement in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGeometry {
    tile_width: f32,
    tile_height: f32,
    /// Lowest-x, lowest-y corner of the layer's bounding box.
    origin: WorldPoint,
}

impl TileGeometry {
    /// Creates a validated tile geometry.
    ///
    /// # Errors
    /// * `NavigationError::InvalidGeometry` - if a tile size is not positive
    ///   and finite, or the origin is not finite.
    pub fn new(tile_width: f32, tile_height: f32, origin: WorldPoint) -> Result<Self, NavigationError> {
        if !(tile_width.is_finite() && tile_width > 0.0) {
            return Err(NavigationError::InvalidGeometry(
                "Tile width must be positive and finite",
            ));
        }
        if !(tile_height.is_finite() && tile_height > 0.0) {
            return Err(NavigationError::InvalidGeometry(
                "Tile height must be positive and finite",
            ));
        }
        if !(origin.x.is_finite() && origin.y.is_finite()) {
            return Err(NavigationError::InvalidGeometry(
                "Layer origin must be finite",
            ));
        }
        Ok(Self {
            tile_width,
            tile_height,
            origin,
        })
    }

    /// Gets the tile width in world units.
    pub fn tile_width(&self) -> f32 {
        self.tile_width
    }

    /// Gets the tile height in world units.
    pub fn tile_height(&self) -> f32 {
        self.tile_height
    }

    /// Gets the layer origin.
    pub fn origin(&self) -> WorldPoint {
        self.origin
    }
}

/// Converts world positions to grid cells and back.
///
/// Layers are expected to sit at or below the world origin, i.e. the bounding
/// box's lowest corner is non-positive on both axes. `world_to_cell` offsets by
/// the magnitude of that corner, so a layer placed at a positive origin maps
/// positions as if it sat at the mirrored negative origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateTransformer {
    geometry: TileGeometry,
}

impl CoordinateTransformer {
    /// Creates a transformer for the given geometry.
    pub fn new(geometry: TileGeometry) -> Self {
        Self { geometry }
    }

    /// Gets the geometry this transformer was built with.
    pub fn geometry(&self) -> &TileGeometry {
        &self.geometry
    }

    /// Converts a world position to the cell containing it.
    ///
    /// Positions on a tile boundary belong to the tile with the higher index,
    /// and positions below the layer produce negative cells.
    pub fn world_to_cell(&self, position: &WorldPoint) -> GridPoint {
        let g = &self.geometry;
        let col = ((position.x + g.origin.x.abs()) / g.tile_width).floor();
        let row = ((position.y + g.origin.y.abs()) / g.tile_height).floor();
        // `as` saturates, so absurdly distant positions land far out of bounds.
        GridPoint::new(col as i32, row as i32)
    }

    /// Converts a cell to its world position.
    ///
    /// With `centered` the result is the tile's center, otherwise its lowest corner.
    pub fn cell_to_world(&self, cell: GridPoint, centered: bool) -> WorldPoint {
        let g = &self.geometry;
        let (dx, dy) = if centered {
            (g.tile_width / 2.0, g.tile_height / 2.0)
        } else {
            (0.0, 0.0)
        };
        WorldPoint::new(
            cell.x as f32 * g.tile_width + g.origin.x + dx,
            cell.y as f32 * g.tile_height + g.origin.y + dy,
        )
    }

    /// Converts every cell of a path to world positions.
    pub fn path_to_world(&self, path: &[GridPoint], centered: bool) -> Vec<WorldPoint> {
        path.iter()
            .map(|cell| self.cell_to_world(*cell, centered))
            .collect()
    }
}
