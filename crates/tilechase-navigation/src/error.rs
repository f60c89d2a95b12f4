//! This module defines the error types used by the `tilechase-navigation` crate.

use thiserror::Error;

/// Error type for navigation setup.
///
/// Only setup-time problems are errors. An unreachable goal is an ordinary
/// outcome and is reported as `None` by the planner and as an idle step by the
/// movement controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    /// Error for invalid grid dimensions.
    /// This variant is returned when grid width or height is not positive.
    #[error("Invalid grid dimensions: {0}")]
    InvalidDimensions(&'static str),
    /// Error for invalid tile geometry.
    /// This variant is returned when a tile size is not positive or a layer origin is not finite.
    #[error("Invalid tile geometry: {0}")]
    InvalidGeometry(&'static str),
    /// Error for an unusable world position handed to the movement controller.
    #[error("Invalid world position: {0}")]
    InvalidPosition(&'static str),
}
