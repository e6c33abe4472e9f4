//! Renderer error types.

use streak_core::SceneError;
use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur during rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A pixel surface could not be allocated.
    #[error("Surface error: {0}")]
    Surface(String),

    /// Encoding the rendered pixels failed.
    #[error("Export failed: {0}")]
    Export(String),

    /// The scene graph rejected an operation.
    #[error(transparent)]
    Scene(#[from] SceneError),
}
