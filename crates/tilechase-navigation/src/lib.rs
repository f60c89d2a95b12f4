#![warn(missing_docs)]
#![doc = "Tile-grid pathfinding and path-following movement for 2D top-down agents."]
#![doc = ""]
#![doc = "This crate turns a tile layer's walkability data into an immutable grid, converts"]
#![doc = "between world positions and grid cells, plans paths with A*, and steps an agent"]
#![doc = "along the planned path while deriving a facing direction for animation."]

pub mod astar;
pub mod error;
pub mod map;
pub mod movement;

pub use astar::{DiagonalMovement, Heuristic, Path, PathPlanner, PathResult, PlannerOptions};
pub use error::NavigationError;
pub use map::{
    CellState, CoordinateTransformer, Grid, GridBuilder, GridPoint, TileGeometry, TileLayer,
    TileLayerData, WorldPoint,
};
pub use movement::{
    AnimationSink, GoalProvider, MovementController, MovementPhase, MovementSettings,
    MovementState, NoAnimation, StepCommand, StepOutcome, StepTicket,
};
