//! Tile layer input consumed by the grid builder.
//!
//! Tile editors export a walkable layer as sparse per-row vertex data: one
//! optional map per row whose keys are column indices (as strings, since the
//! export format is keyed by text) and whose values describe the tile quad.
//! The grid builder only cares about which keys exist.

use std::collections::BTreeMap;

use super::point_types::WorldPoint;

/// Layer-local corner of a tile quad.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TileVertex {
    /// Left edge of the tile in layer space.
    pub left: f32,
    /// Bottom edge of the tile in layer space.
    pub bottom: f32,
}

/// Column key to vertex marker for a single row.
pub type VertexRow = BTreeMap<String, TileVertex>;

/// A source of tile layer data, read once when the grid is built.
pub trait TileLayer {
    /// Sparse vertex rows. `None` rows hold no walkable tiles.
    fn vertices(&self) -> &[Option<VertexRow>];

    /// Layer size in cells as `(width, height)`.
    fn layer_size(&self) -> (i32, i32);

    /// Tile size in world units as `(width, height)`.
    fn tile_size(&self) -> (f32, f32);

    /// Lowest-x, lowest-y corner of the layer's world bounding box.
    fn bounding_box_origin(&self) -> WorldPoint;
}

/// Owned tile layer data.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayerData {
    /// Sparse vertex rows, indexed by row.
    pub vertices: Vec<Option<VertexRow>>,
    /// Layer width in cells.
    pub width: i32,
    /// Layer height in cells.
    pub height: i32,
    /// Tile width in world units.
    pub tile_width: f32,
    /// Tile height in world units.
    pub tile_height: f32,
    /// Lowest corner of the layer's bounding box in world units.
    pub origin: WorldPoint,
}

impl TileLayerData {
    /// Builds layer data from text rows.
    ///
    /// Row 0 is the first string. Every character contained in `walkable`
    /// produces a vertex entry; anything else is left out of the row. The
    /// layer is as wide as the longest row.
    pub fn from_text_rows<S: AsRef<str>>(
        rows: &[S],
        walkable: &str,
        tile_width: f32,
        tile_height: f32,
        origin: WorldPoint,
    ) -> Self {
        let mut width = 0;
        let vertices = rows
            .iter()
            .enumerate()
            .map(|(row, line)| {
                let line = line.as_ref();
                width = width.max(line.chars().count());
                let entries: VertexRow = line
                    .chars()
                    .enumerate()
                    .filter(|(_, c)| walkable.contains(*c))
                    .map(|(col, _)| {
                        let vertex = TileVertex {
                            left: col as f32 * tile_width,
                            bottom: row as f32 * tile_height,
                        };
                        (col.to_string(), vertex)
                    })
                    .collect();
                (!entries.is_empty()).then_some(entries)
            })
            .collect();

        Self {
            vertices,
            width: i32::try_from(width).unwrap_or(i32::MAX),
            height: i32::try_from(rows.len()).unwrap_or(i32::MAX),
            tile_width,
            tile_height,
            origin,
        }
    }
}

impl TileLayer for TileLayerData {
    fn vertices(&self) -> &[Option<VertexRow>] {
        &self.vertices
    }

    fn layer_size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn tile_size(&self) -> (f32, f32) {
        (self.tile_width, self.tile_height)
    }

    fn bounding_box_origin(&self) -> WorldPoint {
        self.origin
    }
}
