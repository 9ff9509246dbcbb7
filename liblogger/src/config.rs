/*
 * Configuration for liblogger
 *
 * This module handles:
 * - Parsing configuration from TOML (a [logging] section or a flat table)
 * - Building configuration from broker plugin options (log_type, log_level, ...)
 * - The LogType enum for output destinations (Console, File, Broker)
 * - The LogLevel enum for severity levels (Debug, Info, Warn, Error)
 */

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Log severity levels, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// Case-insensitive parse, accepting "warning" and "err" as aliases
    pub fn parse(s: &str) -> Option<LogLevel> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" | "err" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        LogLevel::parse(&s).ok_or_else(|| {
            serde::de::Error::unknown_variant(&s, &["debug", "info", "warn", "warning", "error"])
        })
    }
}

/// Supported output destinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogType {
    Console,
    File,
    /// Lines are handed to the sink installed with `Logger::set_broker_sink`
    Broker,
}

impl LogType {
    pub fn parse(s: &str) -> Option<LogType> {
        match s.trim().to_lowercase().as_str() {
            "console" | "stdout" => Some(LogType::Console),
            "file" => Some(LogType::File),
            "broker" | "host" => Some(LogType::Broker),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for LogType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        LogType::parse(&s)
            .ok_or_else(|| serde::de::Error::unknown_variant(&s, &["console", "file", "broker"]))
    }
}

/// Configuration for the logger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(rename = "type")]
    pub log_type: LogType,

    /// Minimum level written
    pub threshold: LogLevel,

    #[serde(default)]
    pub file_path: Option<String>,

    #[serde(default)]
    pub log_folder: Option<String>,

    /// Hand records to a background task instead of writing inline
    #[serde(default)]
    pub async_logging: bool,

    /// Flush the file after every record
    #[serde(default)]
    pub force_flush: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            log_type: LogType::Broker,
            threshold: LogLevel::Info,
            file_path: None,
            log_folder: None,
            async_logging: false,
            force_flush: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigWrapper {
    logging: LogConfig,
}

fn parse_flag(key: &str, value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(format!("Invalid boolean for {}: '{}'", key, value)),
    }
}

impl LogConfig {
    /// Parses TOML text, with or without a `[logging]` section
    pub fn from_toml_str(text: &str) -> Result<Self, String> {
        match toml::from_str::<ConfigWrapper>(text) {
            Ok(wrapper) => Ok(wrapper.logging),
            Err(e) => toml::from_str::<LogConfig>(text)
                .map_err(|_| format!("Failed to parse logging config: {}", e)),
        }
    }

    /// Reads a TOML file. A missing file yields the default configuration.
    pub fn from_file(file_path: &str) -> Result<Self, String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(_) => Ok(LogConfig::default()),
        }
    }

    /// Builds a configuration from `plugin_opt_*` key/value pairs.
    ///
    /// Recognised keys are `log_type`, `log_level`, `log_file`, `log_folder`,
    /// `log_async` and `log_force_flush`; anything else is ignored.
    pub fn from_options<'a, I>(options: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut config = LogConfig::default();
        for (key, value) in options {
            match key {
                "log_type" => {
                    config.log_type = LogType::parse(value)
                        .ok_or_else(|| format!("Unknown log_type '{}'", value))?;
                }
                "log_level" => {
                    config.threshold = LogLevel::parse(value)
                        .ok_or_else(|| format!("Unknown log_level '{}'", value))?;
                }
                "log_file" => config.file_path = Some(value.trim().to_string()),
                "log_folder" => config.log_folder = Some(value.trim().to_string()),
                "log_async" => config.async_logging = parse_flag(key, value)?,
                "log_force_flush" => config.force_flush = parse_flag(key, value)?,
                _ => {}
            }
        }

        if config.log_type == LogType::File && config.file_path.is_none() {
            return Err("log_type=file requires log_file".to_string());
        }
        Ok(config)
    }

    /// Full path of the log file, joined with `log_folder` when set
    pub fn resolved_file_path(&self) -> Option<PathBuf> {
        let file = self.file_path.as_ref()?;
        Some(match &self.log_folder {
            Some(folder) => PathBuf::from(folder).join(file),
            None => PathBuf::from(file),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_logging_section() {
        let config = LogConfig::from_toml_str(
            r#"
            [logging]
            type = "File"
            threshold = "warning"
            file_path = "plugin.log"
            log_folder = "/var/log/mosquitto"
            "#,
        )
        .unwrap();

        assert_eq!(config.log_type, LogType::File);
        assert_eq!(config.threshold, LogLevel::Warn);
        assert_eq!(
            config.resolved_file_path(),
            Some(PathBuf::from("/var/log/mosquitto").join("plugin.log"))
        );
        assert!(!config.async_logging);
    }

    #[test]
    fn parses_flat_table() {
        let config = LogConfig::from_toml_str("type = \"broker\"\nthreshold = \"debug\"\n").unwrap();
        assert_eq!(config.log_type, LogType::Broker);
        assert_eq!(config.threshold, LogLevel::Debug);
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(LogConfig::from_toml_str("type = \"http\"\nthreshold = \"info\"\n").is_err());
    }

    #[test]
    fn builds_from_plugin_options() {
        let config = LogConfig::from_options(vec![
            ("log_type", "file"),
            ("log_file", " gate.log "),
            ("log_level", "ERROR"),
            ("log_async", "yes"),
            ("auth_policy", "deny"),
        ])
        .unwrap();

        assert_eq!(config.log_type, LogType::File);
        assert_eq!(config.file_path.as_deref(), Some("gate.log"));
        assert_eq!(config.threshold, LogLevel::Error);
        assert!(config.async_logging);
    }

    #[test]
    fn options_default_to_broker_output() {
        let config = LogConfig::from_options(Vec::new()).unwrap();
        assert_eq!(config.log_type, LogType::Broker);
        assert_eq!(config.threshold, LogLevel::Info);
    }

    #[test]
    fn file_output_needs_a_path() {
        let err = LogConfig::from_options(vec![("log_type", "file")]).unwrap_err();
        assert!(err.contains("log_file"));
    }

    #[test]
    fn bad_flag_is_reported() {
        let err = LogConfig::from_options(vec![("log_async", "maybe")]).unwrap_err();
        assert!(err.contains("log_async"));
    }

    #[test]
    fn levels_are_ordered() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warn < LogLevel::Error);
    }
}
