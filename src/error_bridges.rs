//! Error bridge implementations for root-crate errors.
//!
//! Bridges for PHP-specific errors live in `phpshift-php`; this module
//! covers the errors defined by the CLI crate itself.

use phpshift_core::error::ShiftError;

use crate::config::ConfigError;

// ============================================================================
// Bridge: ConfigError -> ShiftError
// ============================================================================

impl From<ConfigError> for ShiftError {
    fn from(err: ConfigError) -> Self {
        ShiftError::configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phpshift_core::error::OutputErrorCode;
    use std::path::PathBuf;

    #[test]
    fn config_errors_exit_with_code_2() {
        let err = ShiftError::from(ConfigError::Read {
            path: PathBuf::from("phpshift.toml"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        });
        assert!(matches!(err, ShiftError::Configuration { .. }));
        assert_eq!(err.error_code(), OutputErrorCode::InvalidArguments);
    }
}
