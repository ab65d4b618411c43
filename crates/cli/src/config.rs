//! Configuration loading from scuttlebutt.toml.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Database location.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    /// Default tracing filter, overridable with RUST_LOG.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { filter: default_filter() }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("scuttlebutt.db")
}

fn default_filter() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from the given file if it exists, defaults otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_sections_missing() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.database.path, PathBuf::from("scuttlebutt.db"));
        assert_eq!(config.log.filter, "info");
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::parse(
            r#"
[database]
path = "/var/lib/scuttlebutt/data.db"

[log]
filter = "debug,rusqlite=warn"
"#,
        )
        .unwrap();
        assert_eq!(config.database.path, PathBuf::from("/var/lib/scuttlebutt/data.db"));
        assert_eq!(config.log.filter, "debug,rusqlite=warn");
    }
}
