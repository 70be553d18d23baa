//! Configuration for tracing and instrumentation

use serde::{Deserialize, Serialize};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Main instrumentation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentationConfig {
    /// Service name attached to log output
    pub service_name: String,
    /// Log level filter (e.g., "info", "debug", "pitstop_http=trace")
    pub log_level: String,
    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            service_name: "pitstop-admin".to_string(),
            log_level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl InstrumentationConfig {
    /// Create configuration from environment variables
    ///
    /// Supports the following environment variables:
    /// - `SERVICE_NAME`: Service name
    /// - `RUST_LOG`: Log level filter
    /// - `LOG_FORMAT`: `pretty` or `json`
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let service_name = std::env::var("SERVICE_NAME").unwrap_or(defaults.service_name);
        let log_level = std::env::var("RUST_LOG").unwrap_or(defaults.log_level);
        let format = match std::env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Self {
            service_name,
            log_level,
            format,
        }
    }

    /// Create a development configuration with verbose client logging
    pub fn dev() -> Self {
        Self {
            service_name: "pitstop-admin-dev".to_string(),
            log_level: "debug,pitstop_http=trace".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InstrumentationConfig::default();
        assert_eq!(config.service_name, "pitstop-admin");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn test_dev_config() {
        let config = InstrumentationConfig::dev();
        assert_eq!(config.service_name, "pitstop-admin-dev");
        assert!(config.log_level.contains("pitstop_http=trace"));
    }

    #[test]
    fn test_format_deserializes_lowercase() {
        let config: InstrumentationConfig = serde_json::from_str(
            r#"{"service_name":"admin","log_level":"warn","format":"json"}"#,
        )
        .unwrap();
        assert_eq!(config.format, LogFormat::Json);

        let config: InstrumentationConfig =
            serde_json::from_str(r#"{"service_name":"admin","log_level":"warn"}"#).unwrap();
        assert_eq!(config.format, LogFormat::Pretty);
    }
}
