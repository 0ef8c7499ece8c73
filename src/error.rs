//! Unified error handling for the track-repeat library.
//!
//! This module provides a consistent error type for all track-repeat operations,
//! replacing mixed error handling patterns (Option, panic, silent failures).
//!
//! Finding zero repeated segments, or zero paths, is NOT an error: callers that
//! turn up nothing still get `Ok` with an empty `Vec`. The variants here cover
//! malformed input and genuine failures to complete the requested computation.

use std::fmt;

/// Unified error type for track-repeat operations.
#[derive(Debug, Clone)]
pub enum RouteMatchError {
    /// Input data was structurally invalid: empty tracks, NaN/out-of-range
    /// coordinates, a reference index out of bounds, and similar.
    InvalidInput { message: String },
    /// A path between the requested start and end segments does not exist in
    /// the segment graph.
    PathNotFound,
    /// A segment or path's polyline could not be reconstructed from the
    /// underlying track store (e.g. a stored index range no longer resolves
    /// to valid points).
    ReconstructionFailure,
    /// A discovered path exists but falls below the configured minimum
    /// length.
    PathTooShort,
    /// The computation was aborted because it exceeded a configured resource
    /// bound (e.g. too many candidate windows to examine).
    ResourceExhaustion { message: String },
}

impl fmt::Display for RouteMatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteMatchError::InvalidInput { message } => {
                write!(f, "invalid input: {}", message)
            }
            RouteMatchError::PathNotFound => {
                write!(f, "no path exists between the requested segments")
            }
            RouteMatchError::ReconstructionFailure => {
                write!(f, "failed to reconstruct a polyline from the track store")
            }
            RouteMatchError::PathTooShort => {
                write!(f, "path is shorter than the configured minimum length")
            }
            RouteMatchError::ResourceExhaustion { message } => {
                write!(f, "resource exhausted: {}", message)
            }
        }
    }
}

impl std::error::Error for RouteMatchError {}

/// Result type alias for track-repeat operations.
pub type Result<T> = std::result::Result<T, RouteMatchError>;

/// Extension trait for converting `Option` to a [`RouteMatchError`].
pub trait OptionExt<T> {
    /// Convert `None` to `RouteMatchError::ReconstructionFailure`.
    fn ok_or_reconstruction_failure(self) -> Result<T>;

    /// Convert `None` to a `RouteMatchError::InvalidInput` with `message`.
    fn ok_or_invalid_input(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_reconstruction_failure(self) -> Result<T> {
        self.ok_or(RouteMatchError::ReconstructionFailure)
    }

    fn ok_or_invalid_input(self, message: &str) -> Result<T> {
        self.ok_or_else(|| RouteMatchError::InvalidInput {
            message: message.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_display() {
        let err = RouteMatchError::InvalidInput {
            message: "reference track index 7 out of bounds".to_string(),
        };
        assert!(err.to_string().contains("reference track index 7"));
    }

    #[test]
    fn test_path_not_found_display() {
        let err = RouteMatchError::PathNotFound;
        assert!(err.to_string().contains("no path"));
    }

    #[test]
    fn test_option_ext_reconstruction_failure() {
        let none: Option<i32> = None;
        let result = none.ok_or_reconstruction_failure();
        assert!(matches!(result, Err(RouteMatchError::ReconstructionFailure)));
    }

    #[test]
    fn test_option_ext_invalid_input() {
        let none: Option<i32> = None;
        let result = none.ok_or_invalid_input("bad track");
        assert!(matches!(result, Err(RouteMatchError::InvalidInput { .. })));
    }
}
