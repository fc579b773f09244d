//! Error types for the drop width pipeline

use thiserror::Error;

/// Errors raised by the library
#[derive(Error, Debug)]
pub enum DropWidthError {
    #[error("No data found for Video ID {0}")]
    UnknownVideo(i64),

    #[error("Column '{0}' not found in both tables")]
    MissingColumn(String),

    #[error("Window size must be at least 1, got {0}")]
    InvalidWindow(usize),

    #[error("Video {video_id} has {frames} frames, at least {required} are needed for window size {window_size}")]
    InsufficientFrames {
        video_id: i64,
        frames: usize,
        required: usize,
        window_size: usize,
    },

    #[error("No windowed training examples: every training video is shorter than the window")]
    EmptyTrainingSet,

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Model artifact does not match the request: {0}")]
    ArtifactMismatch(String),

    #[error("Unsupported model artifact version {found} (expected {expected})")]
    UnsupportedArtifact { found: u32, expected: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Plot rendering failed: {0}")]
    Plot(String),
}

/// Result type alias for library operations
pub type Result<T> = std::result::Result<T, DropWidthError>;
