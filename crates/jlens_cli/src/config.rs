use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use jlens_cache::CacheConfig;
use jlens_index::DEFAULT_MAX_CONCURRENT_ARCHIVES;
use jlens_maven::{MavenConfig, MavenConfigLayer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::{LoggingConfig, LoggingConfigError, LoggingConfigLayer, LogLevel};

pub const DEFAULT_CONFIG_FILE: &str = "jlens.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid value '{value}' for {name}: {reason}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error(transparent)]
    Logging(#[from] LoggingConfigError),
}

/// `[index]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub max_concurrent_archives: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_concurrent_archives: DEFAULT_MAX_CONCURRENT_ARCHIVES,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JlensConfig {
    pub maven: MavenConfig,
    pub cache: CacheConfig,
    pub index: IndexConfig,
    pub logging: LoggingConfig,
}

impl JlensConfig {
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads `explicit`, else `jlens.toml` in `working_dir` when present,
    /// else defaults.
    pub fn load(explicit: Option<&Path>, working_dir: &Path) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = working_dir.join(DEFAULT_CONFIG_FILE);
                if !candidate.is_file() {
                    return Ok(Self::default());
                }
                candidate
            }
        };
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration file");
        Self::from_toml(&text, &path)
    }

    pub fn with_layers(mut self, layers: &[ConfigLayer]) -> Self {
        for layer in layers {
            if !layer.maven.is_empty() {
                self.maven = self.maven.with_layers(std::slice::from_ref(&layer.maven));
            }
            if !layer.logging.is_empty() {
                self.logging = self.logging.with_layers(std::slice::from_ref(&layer.logging));
            }
            if let Some(limit) = layer.max_concurrent_archives {
                self.index.max_concurrent_archives = limit;
            }
        }
        self
    }
}

/// Overrides from one source (environment or command line).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub maven: MavenConfigLayer,
    pub logging: LoggingConfigLayer,
    pub max_concurrent_archives: Option<usize>,
}

impl ConfigLayer {
    /// Reads `JLENS_*` variables through `lookup`.
    pub fn from_env<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut layer = ConfigLayer::default();

        if let Some(value) = lookup("JLENS_MAVEN_EXECUTABLE") {
            layer.maven.executable = Some(non_empty_path(&value));
        }
        if let Some(value) = lookup("JLENS_MAVEN_SETTINGS") {
            layer.maven.settings_file = Some(non_empty_path(&value));
        }
        if let Some(value) = lookup("JLENS_LOCAL_REPOSITORY") {
            layer.maven.local_repository = Some(non_empty_path(&value));
        }
        if let Some(value) = lookup("JLENS_OFFLINE") {
            layer.maven.offline = Some(parse_flag("JLENS_OFFLINE", &value)?);
        }
        if let Some(value) = lookup("JLENS_MAVEN_TIMEOUT") {
            layer.maven.timeout_seconds = Some(parse_number("JLENS_MAVEN_TIMEOUT", &value)?);
        }
        if let Some(value) = lookup("JLENS_MAX_CONCURRENT_ARCHIVES") {
            layer.max_concurrent_archives =
                Some(parse_number("JLENS_MAX_CONCURRENT_ARCHIVES", &value)?);
        }
        if let Some(value) = lookup("JLENS_LOG_LEVEL") {
            layer.logging.level = Some(LogLevel::from_str(&value)?);
        }
        if let Some(value) = lookup("JLENS_LOG_JSON") {
            layer.logging.json = Some(parse_flag("JLENS_LOG_JSON", &value)?);
        }

        Ok(layer)
    }
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            name,
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

fn parse_number<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|error: T::Err| ConfigError::InvalidEnv {
            name,
            value: value.to_string(),
            reason: error.to_string(),
        })
}
