use thiserror::Error;

use crate::tracker::ObjectKind;

/// Errors produced by the tracking core and its integration layer.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid bounding box ({x}, {y}, {width}, {height}): {reason}")]
    InvalidBoundingBox {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        reason: &'static str,
    },

    /// A detection of one kind was passed to a step for another kind.
    /// This is a bug in the caller's partitioning, not a data problem.
    #[error("Detection kind mismatch: step for {expected}, got {found}")]
    KindMismatch {
        expected: ObjectKind,
        found: ObjectKind,
    },

    #[error("Frame source error: {0}")]
    FrameSource(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
