//! Configuration handling for phpshift.
//!
//! Settings come from an optional `phpshift.toml`:
//!
//! ```toml
//! [phpshift]
//! mode = "aggressive"
//! extensions = ["php", "inc"]
//! exclude = ["vendor/**"]
//! ```
//!
//! Command-line flags override the file; the file overrides the defaults.

use std::fs;
use std::path::{Path, PathBuf};

use phpshift_core::edit::EditMode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "phpshift.toml";

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// phpshift configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub phpshift: ShiftConfig,
}

/// Core settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftConfig {
    /// Default edit mode when `--mode` is not given
    #[serde(default)]
    pub mode: Option<EditMode>,

    /// File extensions treated as PHP source while walking directories
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Glob patterns for paths skipped while walking directories
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    vec!["php".to_string()]
}

impl Default for ShiftConfig {
    fn default() -> Self {
        Self {
            mode: None,
            extensions: default_extensions(),
            exclude: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Load `phpshift.toml` from `dir` if present, otherwise the defaults
    pub fn load_from_dir(dir: &Path) -> ConfigResult<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.phpshift.mode, None);
        assert_eq!(config.phpshift.extensions, vec!["php"]);
        assert!(config.phpshift.exclude.is_empty());
    }

    #[test]
    fn reads_all_settings() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[phpshift]\nmode = \"aggressive\"\nextensions = [\"php\", \"inc\"]\nexclude = [\"vendor/**\"]\n",
        )
        .unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.phpshift.mode, Some(EditMode::Aggressive));
        assert_eq!(config.phpshift.extensions, vec!["php", "inc"]);
        assert_eq!(config.phpshift.exclude, vec!["vendor/**"]);
    }

    #[test]
    fn partial_section_keeps_defaults() {
        let config: Config = toml::from_str("[phpshift]\nmode = \"timid\"\n").unwrap();
        assert_eq!(config.phpshift.mode, Some(EditMode::Timid));
        assert_eq!(config.phpshift.extensions, vec!["php"]);
    }

    #[test]
    fn unknown_mode_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[phpshift]\nmode = \"reckless\"\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_explicit_file_is_a_read_error() {
        let err = Config::load(Path::new("/nonexistent/phpshift.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
