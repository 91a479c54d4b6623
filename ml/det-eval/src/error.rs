//! Error types for det-eval crate.

use thiserror::Error;

/// Errors that can occur while building score matrices or solving
/// assignments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Score buffer does not fit the requested shape.
    #[error("score matrix shape mismatch: {rows}x{cols} needs {expected} values, got {actual}")]
    ShapeMismatch {
        /// Ground-truth rows.
        rows: usize,
        /// Detection columns.
        cols: usize,
        /// Values required by the shape.
        expected: usize,
        /// Values supplied.
        actual: usize,
    },

    /// The assignment solver rejected its input.
    #[error("assignment solver error: {0}")]
    Solver(String),
}

impl EvalError {
    /// Creates a shape mismatch error.
    #[must_use]
    pub const fn shape_mismatch(rows: usize, cols: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            rows,
            cols,
            expected: rows * cols,
            actual,
        }
    }

    /// Creates a solver error.
    #[must_use]
    pub fn solver(reason: impl Into<String>) -> Self {
        Self::Solver(reason.into())
    }
}

/// Result type for det-eval operations.
pub type Result<T> = std::result::Result<T, EvalError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn error_shape_mismatch() {
        let err = EvalError::shape_mismatch(2, 3, 5);
        assert_eq!(
            err,
            EvalError::ShapeMismatch {
                rows: 2,
                cols: 3,
                expected: 6,
                actual: 5
            }
        );
        assert!(err.to_string().contains("2x3"));
    }

    #[test]
    fn error_solver() {
        let err = EvalError::solver("bad matrix");
        assert!(err.to_string().contains("bad matrix"));
    }
}
