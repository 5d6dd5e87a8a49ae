//! Logging configuration types.

use super::defaults::{
    default_enable_file_logging, default_log_dir, default_log_filename, default_log_format,
    default_rotation,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logging configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir_owned")]
    pub dir: String,
    #[serde(default = "default_log_filename_owned")]
    pub filename: String,
    /// Rotation policy: "daily" (default), "hourly", or "never".
    #[serde(default = "default_rotation_owned")]
    pub rotation: String,
    /// Explicit level; falls back to `RUST_LOG`, then "info".
    #[serde(default)]
    pub level: Option<LogLevel>,
    #[serde(default = "default_enable_file_logging")]
    pub enable_file_logging: bool,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

fn default_log_dir_owned() -> String {
    default_log_dir().to_string()
}
fn default_log_filename_owned() -> String {
    default_log_filename().to_string()
}
fn default_rotation_owned() -> String {
    default_rotation().to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir_owned(),
            filename: default_log_filename_owned(),
            rotation: default_rotation_owned(),
            level: None,
            enable_file_logging: default_enable_file_logging(),
            format: default_log_format(),
        }
    }
}

/// Mirrors `tracing::Level`, plus a `Fatal` alias mapped onto `Error` (spec.md §6's
/// `LOG_LEVEL` enumerates `fatal`, which `tracing` has no variant for).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error | LogLevel::Fatal => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "fatal" => Ok(LogLevel::Fatal),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// Output format for rendered logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_roundtrips_through_str() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            let parsed: LogLevel = level.parse().unwrap();
            assert_eq!(parsed.as_str(), level);
        }
    }

    #[test]
    fn fatal_maps_onto_error() {
        let parsed: LogLevel = "fatal".parse().unwrap();
        assert_eq!(parsed.as_str(), "error");
    }
}
