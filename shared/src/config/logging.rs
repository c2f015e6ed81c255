//! Logging configuration consumed by the telemetry setup

use serde::{Deserialize, Serialize};

use super::environment::Environment;

/// Output encoding for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
    Compact,
}

/// Subscriber settings
///
/// `level` accepts anything an env-filter directive does, so
/// `"info,smsflow_core=debug"` is valid.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    /// ANSI colours; only meaningful on a terminal
    pub ansi: bool,
    pub show_target: bool,
    /// File and line of each event
    pub show_source: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::for_environment(Environment::default())
    }
}

impl LoggingConfig {
    /// Preset for an environment: verbose human output in development,
    /// JSON elsewhere
    pub fn for_environment(env: Environment) -> Self {
        let (level, format) = match env {
            Environment::Development => ("debug", LogFormat::Pretty),
            Environment::Staging => ("info", LogFormat::Json),
            Environment::Production => ("warn", LogFormat::Json),
        };
        Self {
            level: level.to_string(),
            format,
            ansi: env.is_development(),
            show_target: !env.is_production(),
            show_source: env.is_development(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let dev = LoggingConfig::for_environment(Environment::Development);
        assert_eq!(dev.level, "debug");
        assert_eq!(dev.format, LogFormat::Pretty);
        assert!(dev.ansi && dev.show_source);

        let prod = LoggingConfig::for_environment(Environment::Production);
        assert_eq!(prod.level, "warn");
        assert_eq!(prod.format, LogFormat::Json);
        assert!(!prod.ansi && !prod.show_target);
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: LoggingConfig = serde_json::from_str(r#"{"format":"compact"}"#).unwrap();
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.level, "debug");
    }
}
