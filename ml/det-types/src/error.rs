//! Error types for det-types crate.

use thiserror::Error;

/// Errors that can occur when building detection tables and keypoint modes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetTypesError {
    /// Requested keypoint layouts cannot be combined.
    #[error("invalid keypoint mode: face={face} pose={pose} facepose={facepose}")]
    InvalidKeypointMode {
        /// Face layout requested.
        face: bool,
        /// Pose layout requested.
        pose: bool,
        /// Combined facepose layout requested.
        facepose: bool,
    },

    /// A class name referenced by an attribute is not in the class table.
    #[error("unknown class: {0}")]
    UnknownClass(String),

    /// Attribute name is not of the form `base:attr`.
    #[error("malformed attribute name: {0}")]
    MalformedAttribute(String),

    /// Two attributes resolve to the same detector class.
    #[error("ambiguous attribute class: {0}")]
    AmbiguousAttribute(String),

    /// Invalid entry in a class remap table.
    #[error("invalid class remap entry {value} at index {index}")]
    InvalidRemap {
        /// Position in the remap table.
        index: usize,
        /// The rejected value.
        value: i64,
    },
}

impl DetTypesError {
    /// Creates an invalid keypoint mode error.
    #[must_use]
    pub const fn invalid_keypoint_mode(face: bool, pose: bool, facepose: bool) -> Self {
        Self::InvalidKeypointMode {
            face,
            pose,
            facepose,
        }
    }

    /// Creates an unknown class error.
    #[must_use]
    pub fn unknown_class(name: impl Into<String>) -> Self {
        Self::UnknownClass(name.into())
    }

    /// Creates a malformed attribute error.
    #[must_use]
    pub fn malformed_attribute(name: impl Into<String>) -> Self {
        Self::MalformedAttribute(name.into())
    }

    /// Creates an ambiguous attribute error.
    #[must_use]
    pub fn ambiguous_attribute(name: impl Into<String>) -> Self {
        Self::AmbiguousAttribute(name.into())
    }
}

/// Result type for det-types operations.
pub type Result<T> = std::result::Result<T, DetTypesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_invalid_keypoint_mode() {
        let err = DetTypesError::invalid_keypoint_mode(true, false, true);
        let msg = err.to_string();
        assert!(msg.contains("face=true"));
        assert!(msg.contains("facepose=true"));
    }

    #[test]
    fn error_unknown_class() {
        let err = DetTypesError::unknown_class("person_hat");
        assert!(err.to_string().contains("person_hat"));
    }

    #[test]
    fn error_malformed_attribute() {
        let err = DetTypesError::malformed_attribute("hat");
        assert!(err.to_string().contains("malformed"));
    }

    #[test]
    fn error_ambiguous_attribute() {
        let err = DetTypesError::ambiguous_attribute("person_male");
        assert!(err.to_string().contains("ambiguous"));
    }

    #[test]
    fn error_invalid_remap() {
        let err = DetTypesError::InvalidRemap { index: 3, value: -7 };
        assert!(err.to_string().contains("-7"));
        assert!(err.to_string().contains('3'));
    }
}
