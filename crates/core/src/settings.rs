//! Client settings
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! TOML/YAML file, then `PITSTOP__*` environment variables
//! (`PITSTOP__TIMEOUTS__REQUEST_MS=5000`).

use crate::{CoreResult, StorageKeys};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix for settings overrides
pub const ENV_PREFIX: &str = "PITSTOP";

/// Trait for validating configuration values
pub trait ValidateConfig: Serialize + for<'de> Deserialize<'de> {
    /// Returns Ok(()) if valid, or an error describing what's wrong
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Settings for the authenticated API client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Origin of the admin API, e.g. `https://api.pitstop.example`
    pub base_url: String,

    /// Versioned prefix prepended to every request path
    pub api_prefix: String,

    /// UI route of the login view
    pub login_route: String,

    /// Sent as `User-Agent`
    pub user_agent: String,

    pub endpoints: EndpointSettings,
    pub timeouts: TimeoutSettings,
    pub refresh: RefreshSettings,
    pub storage: StorageKeys,
}

/// API paths, relative to `base_url + api_prefix`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    /// Accepts `{ email, password }` and answers `{ auth_token }`
    pub authenticate: String,

    /// Liveness probe
    pub health: String,

    /// Further paths whose 401 must never trigger a refresh
    pub extra_auth: Vec<String>,
}

/// Per-call timeouts in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub request_ms: u64,
    pub health_ms: u64,
    pub refresh_ms: u64,
}

/// Token refresh behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    /// Refresh transparently on 401; when off, callers see `AuthExpired`
    pub enabled: bool,

    /// Refreshes allowed per request chain before giving up
    pub max_attempts: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_prefix: "/api/v1".to_string(),
            login_route: "/login".to_string(),
            user_agent: concat!("pitstop-admin/", env!("CARGO_PKG_VERSION")).to_string(),
            endpoints: EndpointSettings::default(),
            timeouts: TimeoutSettings::default(),
            refresh: RefreshSettings::default(),
            storage: StorageKeys::default(),
        }
    }
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            authenticate: "/auth/login".to_string(),
            health: "/health".to_string(),
            extra_auth: Vec::new(),
        }
    }
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            request_ms: 10_000,
            health_ms: 3_000,
            refresh_ms: 10_000,
        }
    }
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 1,
        }
    }
}

impl TimeoutSettings {
    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }

    pub fn health(&self) -> Duration {
        Duration::from_millis(self.health_ms)
    }

    pub fn refresh(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }
}

impl ClientSettings {
    /// Defaults pointed at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Load settings from defaults, an optional file and the environment
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Full URL for an API path
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}{}{}",
            self.base_url.trim_end_matches('/'),
            self.api_prefix.trim_end_matches('/'),
            path
        )
    }

    /// Whether `path` addresses an authentication endpoint
    pub fn is_auth_endpoint(&self, path: &str) -> bool {
        let path = path.split('?').next().unwrap_or_default();
        std::iter::once(&self.endpoints.authenticate)
            .chain(&self.endpoints.extra_auth)
            .any(|endpoint| path.trim_end_matches('/') == endpoint.trim_end_matches('/'))
    }
}

impl ValidateConfig for ClientSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Message("base_url is required".into()));
        }
        if !self.login_route.starts_with('/') {
            return Err(ConfigError::Message(format!(
                "login_route must start with '/': {}",
                self.login_route
            )));
        }
        for endpoint in std::iter::once(&self.endpoints.authenticate)
            .chain(&self.endpoints.extra_auth)
            .chain(std::iter::once(&self.endpoints.health))
        {
            if !endpoint.starts_with('/') {
                return Err(ConfigError::Message(format!(
                    "endpoint path must start with '/': {endpoint}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreError;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = ClientSettings::default();
        assert_eq!(settings.api_prefix, "/api/v1");
        assert_eq!(settings.login_route, "/login");
        assert_eq!(settings.endpoints.authenticate, "/auth/login");
        assert_eq!(settings.timeouts.request(), Duration::from_secs(10));
        assert_eq!(settings.timeouts.health(), Duration::from_secs(3));
        assert_eq!(settings.refresh.max_attempts, 1);
        assert!(settings.refresh.enabled);
    }

    #[test]
    fn test_default_requires_base_url() {
        let err = ClientSettings::default().validate().unwrap_err();
        assert!(err.to_string().contains("base_url is required"));
    }

    #[test]
    fn test_api_url_joins_segments() {
        let settings = ClientSettings::new("https://api.pitstop.test/");
        assert_eq!(
            settings.api_url("/bookings"),
            "https://api.pitstop.test/api/v1/bookings"
        );
    }

    #[test]
    fn test_is_auth_endpoint() {
        let mut settings = ClientSettings::new("http://localhost");
        settings.endpoints.extra_auth = vec!["/auth/refresh".to_string()];

        assert!(settings.is_auth_endpoint("/auth/login"));
        assert!(settings.is_auth_endpoint("/auth/login/"));
        assert!(settings.is_auth_endpoint("/auth/refresh?x=1"));
        assert!(!settings.is_auth_endpoint("/users/me"));
    }

    #[test]
    fn test_rejects_relative_login_route() {
        let mut settings = ClientSettings::new("http://localhost");
        settings.login_route = "login".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
base_url = "https://admin-api.pitstop.test"
login_route = "/auth"

[timeouts]
request_ms = 2500

[refresh]
max_attempts = 2

[storage]
token = "tvoya_shina_token"
"#
        )
        .unwrap();

        let settings = ClientSettings::load(Some(file.path())).unwrap();
        assert_eq!(settings.base_url, "https://admin-api.pitstop.test");
        assert_eq!(settings.login_route, "/auth");
        assert_eq!(settings.timeouts.request_ms, 2500);
        // untouched fields keep their defaults
        assert_eq!(settings.timeouts.health_ms, 3000);
        assert_eq!(settings.refresh.max_attempts, 2);
        assert_eq!(settings.storage.token, "tvoya_shina_token");
        assert_eq!(settings.storage.email, "saved_email");
    }

    #[test]
    fn test_load_without_base_url_fails() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "api_prefix = \"/api/v2\"").unwrap();

        let err = ClientSettings::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { .. }));
    }
}
