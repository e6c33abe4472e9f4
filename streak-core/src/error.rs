//! Error types for scene graph operations.

use thiserror::Error;

use crate::NodeId;

/// Result type for scene graph operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Errors that can occur in scene graph operations.
#[derive(Debug, Error)]
pub enum SceneError {
    /// Node not found in the stage arena.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// The requested parent/child relation is not allowed.
    #[error("Invalid hierarchy: {0}")]
    InvalidHierarchy(String),

    /// Every representable pick color is held by a live shape.
    #[error("Color key space exhausted: {0} live shapes")]
    ColorKeySpaceExhausted(u32),

    /// A document named a class the factory does not know.
    #[error("Unknown node class: {0}")]
    UnknownClass(String),

    /// A document was well-formed JSON but not a valid scene.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Scene serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
