//! Error types and exit codes for phpshift.
//!
//! `ShiftError` is the single error type the CLI renders. Subsystems keep
//! their own `thiserror` enums and are bridged in with `From` impls; the
//! bridges for PHP-specific errors live in `phpshift-php`, next to the
//! error types they convert.
//!
//! ## Exit Codes
//!
//! - `2`: invalid arguments or configuration (edit mode unset, bad config file)
//! - `3`: resolution errors (input path not found)
//! - `4`: apply errors (conflicting edits, write failures)
//! - `10`: internal errors (store failures, unexpected state)

use std::fmt;

use thiserror::Error;

use crate::apply::ApplyError;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Stable error codes used as process exit status and in JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments or configuration.
    InvalidArguments = 2,
    /// A named input could not be found.
    ResolutionError = 3,
    /// Changes could not be applied.
    ApplyError = 4,
    /// Bugs and unexpected state.
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
#[derive(Debug, Error)]
pub enum ShiftError {
    /// Invalid arguments from the caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// The run is misconfigured and cannot start.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A named input does not exist.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// Changes could not be applied.
    #[error("apply error: {message}")]
    ApplyError {
        message: String,
        file: Option<String>,
    },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

impl From<&ShiftError> for OutputErrorCode {
    fn from(err: &ShiftError) -> Self {
        match err {
            ShiftError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            ShiftError::Configuration { .. } => OutputErrorCode::InvalidArguments,
            ShiftError::FileNotFound { .. } => OutputErrorCode::ResolutionError,
            ShiftError::ApplyError { .. } => OutputErrorCode::ApplyError,
            ShiftError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<ShiftError> for OutputErrorCode {
    fn from(err: ShiftError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Bridge: ApplyError -> ShiftError
// ============================================================================

impl From<ApplyError> for ShiftError {
    fn from(err: ApplyError) -> Self {
        ShiftError::ApplyError {
            message: err.to_string(),
            file: Some(err.path().to_string_lossy().into_owned()),
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl ShiftError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        ShiftError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        ShiftError::Configuration {
            message: message.into(),
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        ShiftError::FileNotFound { path: path.into() }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ShiftError::InternalError {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    mod error_code_mapping {
        use super::*;

        #[test]
        fn configuration_maps_to_invalid_arguments() {
            let err = ShiftError::configuration("edit mode not set");
            assert_eq!(err.error_code(), OutputErrorCode::InvalidArguments);
            assert_eq!(err.error_code().code(), 2);
        }

        #[test]
        fn file_not_found_maps_to_resolution_error() {
            let err = ShiftError::file_not_found("missing.php");
            assert_eq!(err.error_code().code(), 3);
        }

        #[test]
        fn internal_maps_to_ten() {
            assert_eq!(ShiftError::internal("boom").error_code().code(), 10);
        }

        #[test]
        fn apply_error_bridges_with_file() {
            let err: ShiftError = ApplyError::Conflict {
                path: PathBuf::from("/p/a.php"),
                line: 3,
                column: 7,
            }
            .into();
            assert_eq!(err.error_code(), OutputErrorCode::ApplyError);
            match err {
                ShiftError::ApplyError { file, message } => {
                    assert_eq!(file.as_deref(), Some("/p/a.php"));
                    assert!(message.contains("line 3"));
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    mod error_display {
        use super::*;

        #[test]
        fn invalid_arguments_display() {
            let err = ShiftError::invalid_args("new name is empty");
            assert_eq!(err.to_string(), "invalid arguments: new name is empty");
        }

        #[test]
        fn display_shows_code() {
            assert_eq!(format!("{}", OutputErrorCode::ApplyError), "4");
        }
    }
}
