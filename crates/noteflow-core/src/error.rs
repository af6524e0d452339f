//! Error types shared by the canvas core.

use crate::shapes::ShapeId;
use thiserror::Error;

/// Errors produced by the canvas core.
///
/// Only malformed core inputs are fatal to the calling operation. Per-shape
/// and per-handler failures are logged by the caller and skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CanvasError {
    /// A transform input contained NaN or infinity.
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),
    /// The viewport itself is malformed (zero size, inverted zoom limits).
    #[error("Invalid viewport: {0}")]
    InvalidViewport(String),
    /// No renderer or hit-test routine exists for a shape variant.
    #[error("Unknown shape type for shape {0}")]
    UnknownShapeType(ShapeId),
    /// A handler with the same id is already registered.
    #[error("Handler {0} is already registered")]
    HandlerRegistrationConflict(u64),
    /// A drag or gesture update referenced a pointer or timer that is no longer tracked.
    #[error("Stale reference: {0}")]
    StaleReference(String),
    /// Configuration could not be parsed.
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type for canvas core operations.
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Reject non-finite scalars with [`CanvasError::InvalidCoordinate`].
pub(crate) fn ensure_finite(what: &str, values: &[f64]) -> CanvasResult<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(CanvasError::InvalidCoordinate(format!(
            "{what} must be finite, got {values:?}"
        )))
    }
}
