//! Error types for the image codec library.

use thiserror::Error;

/// Result type for image codec operations.
pub type Result<T> = std::result::Result<T, ImageError>;

/// Errors that can occur in image codec operations.
#[derive(Debug, Error)]
pub enum ImageError {
    /// A pixel format violated a construction-time invariant.
    #[error("Invalid pixel format: {0}")]
    InvalidFormat(String),

    /// An operation was attempted between images of different depths.
    #[error("Depth mismatch: source depth {src} vs destination depth {dst}")]
    DepthMismatch {
        /// Depth of the source image.
        src: u8,
        /// Depth of the destination image.
        dst: u8,
    },

    /// A reply payload was shorter than the format requires.
    #[error("Truncated reply: expected {expected} bytes, got {actual}")]
    TruncatedReply {
        /// Byte count the format descriptor requires.
        expected: usize,
        /// Byte count actually received.
        actual: usize,
    },

    /// A reply payload was longer than the format requires.
    #[error("Oversized reply: expected {expected} bytes, got {actual}")]
    OversizedReply {
        /// Byte count the format descriptor requires.
        expected: usize,
        /// Byte count actually received.
        actual: usize,
    },

    /// A pixel buffer could not be allocated.
    #[error("Allocation failure: {0} bytes requested")]
    AllocationFailure(usize),
}
