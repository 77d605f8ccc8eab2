use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoggingConfigError {
    #[error(
        "Unknown log level: {invalid}. Available: {choices}",
        choices = .available.join(", ")
    )]
    UnknownLogLevel {
        invalid: String,
        available: &'static [&'static str],
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// Lower-case form accepted by `EnvFilter` directives.
    pub const fn directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    pub const fn variants() -> &'static [&'static str] {
        &["TRACE", "DEBUG", "INFO", "WARN", "ERROR"]
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = LoggingConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_ascii_lowercase();
        match normalised.as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(LoggingConfigError::UnknownLogLevel {
                invalid: other.to_string(),
                available: LogLevel::variants(),
            }),
        }
    }
}

impl Serialize for LogLevel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        LogLevel::from_str(&value).map_err(serde::de::Error::custom)
    }
}

/// `[logging]` section. Output goes to stderr; `json` switches the format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Applies override layers in priority order.
    pub fn with_layers(mut self, layers: &[LoggingConfigLayer]) -> Self {
        for layer in layers {
            self.apply_layer(layer);
        }
        self
    }

    fn apply_layer(&mut self, layer: &LoggingConfigLayer) {
        if let Some(level) = layer.level {
            self.level = level;
        }
        if let Some(json) = layer.json {
            self.json = json;
        }
    }
}

/// Environment or command line overrides.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoggingConfigLayer {
    pub level: Option<LogLevel>,
    pub json: Option<bool>,
}

impl LoggingConfigLayer {
    pub fn is_empty(&self) -> bool {
        self.level.is_none() && self.json.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_from_str_is_case_insensitive() {
        assert_eq!(LogLevel::from_str("TRACE").expect("trace"), LogLevel::Trace);
        assert_eq!(LogLevel::from_str("Info").expect("info"), LogLevel::Info);
        assert_eq!(LogLevel::from_str("warning").expect("warning"), LogLevel::Warn);
        assert_eq!(LogLevel::from_str(" error ").expect("error"), LogLevel::Error);
    }

    #[test]
    fn unknown_level_lists_choices() {
        let error = LogLevel::from_str("loud").expect_err("unknown level");
        assert_eq!(
            error.to_string(),
            "Unknown log level: loud. Available: TRACE, DEBUG, INFO, WARN, ERROR"
        );
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: LoggingConfig = toml::from_str("level = \"debug\"").expect("toml parse");
        assert_eq!(config.level, LogLevel::Debug);
        assert!(!config.json);
    }

    #[test]
    fn later_layers_win() {
        let env = LoggingConfigLayer {
            level: Some(LogLevel::Info),
            json: Some(true),
        };
        let cli = LoggingConfigLayer {
            level: Some(LogLevel::Trace),
            ..LoggingConfigLayer::default()
        };
        let merged = LoggingConfig::default().with_layers(&[env, cli]);
        assert_eq!(merged.level, LogLevel::Trace);
        assert!(merged.json);
        assert!(LoggingConfigLayer::default().is_empty());
    }
}
