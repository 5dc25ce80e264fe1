//! Error bridge implementations for PHP-specific errors.
//!
//! This module provides `impl From<X> for ShiftError` conversions from the
//! error types of this crate to the unified `ShiftError` type.

use phpshift_core::error::ShiftError;

use crate::scanner::ScanError;
use crate::store::StoreError;
use crate::validation::ValidationError;

// ============================================================================
// Bridge: StoreError -> ShiftError
// ============================================================================

impl From<StoreError> for ShiftError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Uninitialized => ShiftError::configuration(err.to_string()),
            StoreError::Sqlite(_) => ShiftError::internal(err.to_string()),
        }
    }
}

// ============================================================================
// Bridge: ScanError -> ShiftError
// ============================================================================

impl From<ScanError> for ShiftError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::Io { ref path, ref source } if source.kind() == std::io::ErrorKind::NotFound => {
                ShiftError::file_not_found(path.to_string_lossy())
            }
            ScanError::Io { .. } => ShiftError::internal(err.to_string()),
            ScanError::Store(store) => ShiftError::from(store),
            ScanError::Pattern(_) => ShiftError::invalid_args(err.to_string()),
        }
    }
}

// ============================================================================
// Bridge: ValidationError -> ShiftError
// ============================================================================

impl From<ValidationError> for ShiftError {
    fn from(err: ValidationError) -> Self {
        ShiftError::invalid_args(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phpshift_core::error::OutputErrorCode;
    use std::path::PathBuf;

    #[test]
    fn uninitialized_store_is_a_configuration_error() {
        let err = ShiftError::from(StoreError::Uninitialized);
        assert_eq!(err.error_code(), OutputErrorCode::InvalidArguments);
    }

    #[test]
    fn missing_file_is_a_resolution_error() {
        let err = ShiftError::from(ScanError::Io {
            path: PathBuf::from("/p/gone.php"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
        assert!(matches!(err, ShiftError::FileNotFound { ref path } if path == "/p/gone.php"));
        assert_eq!(err.error_code(), OutputErrorCode::ResolutionError);
    }

    #[test]
    fn invalid_name_is_an_argument_error() {
        let err = ShiftError::from(crate::validation::validate_class_name("class").unwrap_err());
        assert_eq!(err.error_code(), OutputErrorCode::InvalidArguments);
    }
}
