//! Error types for det-postprocess crate.

use det_types::DetTypesError;
use thiserror::Error;

/// Errors that can occur while configuring or running post-processing.
#[derive(Debug, Error)]
pub enum PostprocessError {
    /// Invalid class, attribute or keypoint-mode setup.
    #[error(transparent)]
    Types(#[from] DetTypesError),

    /// Invalid post-processing configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Parallel detector outputs disagree in length.
    #[error("data size mismatch in {field}: expected {expected}, got {actual}")]
    DataSizeMismatch {
        /// Name of the offending sequence.
        field: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),
}

impl PostprocessError {
    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Creates a data size mismatch error.
    #[must_use]
    pub const fn data_size_mismatch(field: &'static str, expected: usize, actual: usize) -> Self {
        Self::DataSizeMismatch {
            field,
            expected,
            actual,
        }
    }
}

impl From<std::io::Error> for PostprocessError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PostprocessError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            Self::Io(err.to_string())
        } else {
            Self::Deserialization(err.to_string())
        }
    }
}

/// Result type for det-postprocess operations.
pub type Result<T> = std::result::Result<T, PostprocessError>;
