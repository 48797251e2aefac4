//! Configuration structures for Crowd clients.
//!
//! [`CrowdConfig`] can be deserialized from any serde format the caller loads it from.
//! All checks run before a client touches the network.

use crate::client::{
    ClientConfig, ServiceClientBuilder, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_POOL_IDLE_TIMEOUT, DEFAULT_REQUEST_TIMEOUT,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use validator::Validate;

/// Configuration for a Crowd client instance.
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct CrowdConfig {
    /// Crowd base URL (e.g., "https://crowd.example.com/crowd/")
    #[validate(url)]
    pub url: String,

    /// Application name used as the Basic-Auth principal
    pub app_name: String,

    /// Application password
    #[serde(skip_serializing)]
    pub app_password: String,

    /// Calling application's name for the user agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent_app: Option<String>,

    /// Calling application's version for the user agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent_version: Option<String>,

    /// HTTP transport settings
    #[validate(nested)]
    #[serde(default)]
    pub http: HttpSettings,
}

impl fmt::Debug for CrowdConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrowdConfig")
            .field("url", &self.url)
            .field("app_name", &self.app_name)
            .field("app_password", &"[REDACTED]")
            .field("user_agent_app", &self.user_agent_app)
            .field("user_agent_version", &self.user_agent_version)
            .field("http", &self.http)
            .finish()
    }
}

impl CrowdConfig {
    /// Create a configuration from the three required inputs.
    ///
    /// # Errors
    ///
    /// Returns the distinct empty-input error for the first missing value, or
    /// [`Error::ConfigError`] if the URL is malformed.
    pub fn new(
        url: impl Into<String>,
        app_name: impl Into<String>,
        app_password: impl Into<String>,
    ) -> Result<Self> {
        let config = Self {
            url: url.into(),
            app_name: app_name.into(),
            app_password: app_password.into(),
            user_agent_app: None,
            user_agent_version: None,
            http: HttpSettings::default(),
        };

        config.check()?;
        Ok(config)
    }

    /// Set the calling application's identity for the user agent.
    #[must_use]
    pub fn with_application(mut self, app: impl Into<String>, version: impl Into<String>) -> Self {
        self.user_agent_app = Some(app.into());
        self.user_agent_version = Some(version.into());
        self
    }

    /// Set HTTP transport settings.
    #[must_use]
    pub fn with_http(mut self, http: HttpSettings) -> Self {
        self.http = http;
        self
    }

    /// Run every check in order: empty URL, empty application, empty password, field rules.
    ///
    /// # Errors
    ///
    /// Returns the first failing check.
    pub fn check(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(Error::EmptyUrl);
        }
        if self.app_name.is_empty() {
            return Err(Error::EmptyApplication);
        }
        if self.app_password.is_empty() {
            return Err(Error::EmptyPassword);
        }

        self.validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))
    }

    /// Turn the configuration into a pipeline builder.
    ///
    /// # Errors
    ///
    /// Returns the first failing check from [`CrowdConfig::check`].
    pub fn builder(&self) -> Result<ServiceClientBuilder> {
        self.check()?;

        let mut builder =
            ServiceClientBuilder::new(&self.url, &self.app_name, &self.app_password)
                .with_http_config(self.http.client_config());

        if let (Some(app), Some(version)) = (&self.user_agent_app, &self.user_agent_version) {
            builder = builder.with_application(app, version);
        }

        Ok(builder)
    }
}

/// Serializable HTTP transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct HttpSettings {
    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Connect timeout in seconds
    #[validate(range(min = 1, max = 60))]
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Idle connection expiry in seconds
    #[serde(default = "default_pool_idle_timeout_secs")]
    pub pool_idle_timeout_secs: u64,

    /// Maximum simultaneous connections
    #[validate(range(min = 1))]
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Whether to verify TLS certificates
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT
}

const fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT
}

const fn default_pool_idle_timeout_secs() -> u64 {
    DEFAULT_POOL_IDLE_TIMEOUT
}

const fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}

const fn default_tls_verify() -> bool {
    true
}

impl HttpSettings {
    /// Convert into the runtime [`ClientConfig`].
    #[must_use]
    pub const fn client_config(&self) -> ClientConfig {
        ClientConfig::new()
            .with_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .with_pool_idle_timeout(Duration::from_secs(self.pool_idle_timeout_secs))
            .with_max_connections(self.max_connections)
            .with_tls_verify(self.tls_verify)
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            pool_idle_timeout_secs: default_pool_idle_timeout_secs(),
            max_connections: default_max_connections(),
            tls_verify: default_tls_verify(),
        }
    }
}
