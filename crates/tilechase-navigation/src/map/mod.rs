//! Map-related functionality for navigation.
//!
//! This module provides the walkability grid, the tile layer input it is built
//! from, and the transform between world positions and grid cells.

pub mod grid;
pub mod layer;
pub mod point_types;
pub mod transform;

pub use grid::{CellState, Grid, GridBuilder};
pub use layer::{TileLayer, TileLayerData, VertexRow};
pub use point_types::{GridPoint, WorldPoint};
pub use transform::{CoordinateTransformer, TileGeometry};
