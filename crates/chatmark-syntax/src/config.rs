//! Parser configuration.
//!
//! All fields have defaults, so a TOML file only needs the keys it changes:
//!
//! ```toml
//! max_nesting_depth = 20
//! max_parsing_time = 2.5
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Deepest allowed chain of nested constructs. `0` disables the limit.
    pub max_nesting_depth: usize,
    /// Attach token positions to tree nodes.
    pub track_source_locations: bool,
    /// Wall-clock limit per parsing loop, in seconds. `0` disables the limit.
    pub max_parsing_time: f64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: 100,
            track_source_locations: false,
            max_parsing_time: 30.0,
        }
    }
}

impl ParserConfig {
    pub fn parsing_time_limit(&self) -> Option<Duration> {
        if self.max_parsing_time > 0.0 {
            Duration::try_from_secs_f64(self.max_parsing_time).ok()
        } else {
            None
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let config = Self::from_toml_str(&content).map_err(|source| {
            ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        log::debug!("loaded parser config from {}", config_path.display());
        Ok(Some(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ParserConfig::default();
        assert_eq!(config.max_nesting_depth, 100);
        assert!(!config.track_source_locations);
        assert_eq!(config.parsing_time_limit(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_zero_time_disables_limit() {
        let config = ParserConfig {
            max_parsing_time: 0.0,
            ..ParserConfig::default()
        };
        assert_eq!(config.parsing_time_limit(), None);

        let config = ParserConfig {
            max_parsing_time: f64::NAN,
            ..ParserConfig::default()
        };
        assert_eq!(config.parsing_time_limit(), None);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ParserConfig::from_toml_str("max_nesting_depth = 5\n").unwrap();
        assert_eq!(
            config,
            ParserConfig {
                max_nesting_depth: 5,
                ..ParserConfig::default()
            }
        );
    }

    #[test]
    fn test_serialization_roundtrip() {
        let original = ParserConfig {
            max_nesting_depth: 8,
            track_source_locations: true,
            max_parsing_time: 1.5,
        };
        let toml_str = toml::to_string(&original).unwrap();
        assert_eq!(ParserConfig::from_toml_str(&toml_str).unwrap(), original);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.toml");

        assert!(ParserConfig::load_from_path(&missing).unwrap().is_none());
    }

    #[test]
    fn test_load_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("parser.toml");
        std::fs::write(&config_file, "track_source_locations = true\n").unwrap();

        let config = ParserConfig::load_from_path(&config_file).unwrap().unwrap();

        assert!(config.track_source_locations);
        assert_eq!(config.max_nesting_depth, 100);
    }

    #[test]
    fn test_load_invalid_config_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("parser.toml");
        std::fs::write(&config_file, "max_nesting_depth = \"deep\"\n").unwrap();

        let err = ParserConfig::load_from_path(&config_file).unwrap_err();

        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
        assert!(err.to_string().contains("parser.toml"));
    }
}
