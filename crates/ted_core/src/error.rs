//! Error types for tiling, normalization and stitching.
//!
//! Every failure here is a configuration or invariant violation detected
//! synchronously; callers abort the current volume rather than retry.

use thiserror::Error;

/// Main error type for the patch tiling and stitching engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TedError {
    /// Patch size / interval malformed or incompatible with the volume.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A coordinate does not fit the volume it is applied to.
    #[error("Index out of range: {0}")]
    IndexOutOfRange(String),

    /// Array shapes that must agree do not.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Standard deviation is zero (or not finite), normalization is undefined.
    #[error("Degenerate statistics: {0}")]
    DegenerateStatistics(String),

    /// A second write landed on an already written output pixel.
    #[error("Overlapping write at frame {frame}, row {row}, col {col}")]
    OverlappingWrite { frame: usize, row: usize, col: usize },

    /// The inference collaborator broke its batch contract.
    #[error("Inference error: {0}")]
    Inference(String),
}

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, TedError>;

impl TedError {
    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create an index out of range error.
    pub fn index_out_of_range(msg: impl Into<String>) -> Self {
        Self::IndexOutOfRange(msg.into())
    }

    /// Create a shape mismatch error from any two shapes.
    pub fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    /// Create a degenerate statistics error.
    pub fn degenerate_statistics(msg: impl Into<String>) -> Self {
        Self::DegenerateStatistics(msg.into())
    }

    /// Create an inference error.
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }
}
