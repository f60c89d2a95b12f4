//! Grid cell and world position types.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Represents a cell in grid coordinates.
///
/// Coordinates are signed so that positions left of or below the layer map to
/// representable (out-of-bounds) cells instead of wrapping.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPoint {
    /// The x-coordinate (column index) in the grid.
    pub x: i32,
    /// The y-coordinate (row index) in the grid.
    pub y: i32,
}

impl GridPoint {
    /// Creates a new `GridPoint` from a column and a row.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the point shifted by `(dx, dy)`.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl fmt::Display for GridPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Represents a point in world coordinates.
///
/// `z` is carried along for callers that place agents in a 3D scene; it never
/// takes part in grid conversions.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd)]
pub struct WorldPoint {
    /// The x-coordinate in world units.
    pub x: f32,
    /// The y-coordinate in world units.
    pub y: f32,
    /// The z-coordinate in world units.
    #[cfg_attr(feature = "serde", serde(default))]
    pub z: f32,
}

impl WorldPoint {
    /// Creates a new `WorldPoint` on the `z = 0` plane.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Creates a new `WorldPoint` with an explicit `z`.
    #[must_use]
    pub const fn with_z(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Returns true if every component is finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Linear interpolation towards `other`; `t` is clamped to `[0, 1]`.
    #[must_use]
    pub fn lerp(self, other: WorldPoint, t: f32) -> WorldPoint {
        let t = t.clamp(0.0, 1.0);
        WorldPoint {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }
}

impl fmt::Display for WorldPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}
