//! Error types for the head pose streaming library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The PnP solver could not produce a usable pose for this frame.
    /// Callers skip the frame; nothing is published.
    #[error("Pose unsolvable: {0}")]
    PoseUnsolvable(String),

    /// A received payload had the wrong length and was discarded
    #[error("Malformed message: expected {expected} bytes, got {actual}")]
    MalformedMessage {
        /// Expected payload length in bytes
        expected: usize,
        /// Actual payload length in bytes
        actual: usize,
    },

    /// Socket operation failed
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Camera calibration is unusable (e.g. singular intrinsic matrix)
    #[error("Calibration error: {0}")]
    Calibration(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
