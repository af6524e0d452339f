//! Render error types.

use noteflow_core::ShapeId;
use thiserror::Error;

/// Errors raised while drawing a frame.
///
/// Per-shape errors are logged by the engine and the shape is skipped; only
/// [`RenderError::InvalidViewport`] aborts a frame.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("No renderer for shape {0}")]
    UnknownShapeType(ShapeId),
    #[error("Connector {0} references a missing endpoint")]
    MissingEndpoint(ShapeId),
    #[error("Surface error: {0}")]
    Surface(String),
    #[error("Invalid viewport: {0}")]
    InvalidViewport(String),
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;
