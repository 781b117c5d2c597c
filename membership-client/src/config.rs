//! Client configuration.
//!
//! This module defines the TOML-deserializable configuration for the backend
//! client. Every field has a default, so an empty document is a valid configuration.
//!
//! # Examples
//!
//! ```toml
//! api_base_url = "https://api.example.com"
//! mobile_app_scheme = "sorceri://"
//!
//! [http]
//! timeout_secs = 30
//! connect_timeout_secs = 10
//! pool_max_idle_per_host = 10
//! ```

use std::{path::Path, time::Duration};

use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::error::{ClientError, Result};

/// Environment variable that overrides [`ClientConfig::api_base_url`].
pub const API_URL_ENV: &str = "MEMBERSHIP_API_URL";

/// Root client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the membership backend (without the `/v1` prefix).
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// URL scheme used to hand control back to the mobile app.
    #[serde(default = "default_mobile_app_scheme")]
    pub mobile_app_scheme: String,

    /// HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            mobile_app_scheme: default_mobile_app_scheme(),
            http: HttpConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parses configuration from a TOML string and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the TOML is malformed or validation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use membership_client::ClientConfig;
    ///
    /// let config = ClientConfig::from_toml("api_base_url = \"https://api.example.com\"")?;
    /// assert_eq!(config.http.timeout_secs, 30);
    /// # Ok::<(), membership_client::ClientError>(())
    /// ```
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| ClientError::Config(format!("failed to parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or its content is invalid.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Applies the [`API_URL_ENV`] override, if set and non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the overridden URL fails validation.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(url) = std::env::var(API_URL_ENV)
            && !url.trim().is_empty()
        {
            self.api_base_url = url.trim().to_owned();
            self.validate()?;
        }
        Ok(self)
    }

    /// Validates the configuration.
    ///
    /// Checks that:
    /// - `api_base_url` parses and uses `http` or `https`
    /// - HTTP timeouts are within range
    ///
    /// A plain-`http` base URL is accepted for local development but logged.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] on the first failed check.
    pub fn validate(&self) -> Result<()> {
        let url = self.base_url()?;
        if url.scheme() == "http" {
            warn!(api_base_url = %self.api_base_url, "backend base URL is not using HTTPS");
        }
        if self.mobile_app_scheme.is_empty() || !self.mobile_app_scheme.ends_with("://") {
            return Err(ClientError::Config(format!(
                "mobile_app_scheme must end with \"://\", got: {:?}",
                self.mobile_app_scheme
            )));
        }
        self.http.validate()
    }

    /// Returns the parsed base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the URL is malformed or not http(s).
    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.api_base_url).map_err(|e| {
            ClientError::Config(format!("invalid api_base_url '{}': {e}", self.api_base_url))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ClientError::Config(format!(
                "api_base_url must use http or https, got: {other}"
            ))),
        }
    }

    /// Returns true if the backend is reached over HTTPS.
    #[must_use]
    pub fn uses_https(&self) -> bool {
        self.api_base_url.starts_with("https://")
    }

    /// Builds the deep link that returns the user to the mobile app after a plan change.
    ///
    /// # Examples
    ///
    /// ```
    /// use membership_client::ClientConfig;
    ///
    /// let config = ClientConfig::default();
    /// assert_eq!(config.success_deep_link("elevate"), "sorceri://membership/success?plan=elevate");
    /// ```
    #[must_use]
    pub fn success_deep_link(&self, plan: &str) -> String {
        let plan = if plan.is_empty() { "unknown" } else { plan };
        format!("{}membership/success?plan={plan}", self.mobile_app_scheme)
    }
}

/// HTTP client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Maximum idle connections per host.
    #[serde(default = "default_pool_max_idle")]
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            pool_max_idle_per_host: default_pool_max_idle(),
        }
    }
}

impl HttpConfig {
    /// Validates configuration values are within acceptable bounds.
    ///
    /// # Errors
    ///
    /// Returns error if timeout values are outside valid ranges:
    /// - `timeout_secs`: must be 1-300 seconds
    /// - `connect_timeout_secs`: must be 1-60 seconds
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err(ClientError::Config("timeout_secs must be between 1 and 300".to_owned()));
        }
        if self.connect_timeout_secs == 0 || self.connect_timeout_secs > 60 {
            return Err(ClientError::Config(
                "connect_timeout_secs must be between 1 and 60".to_owned(),
            ));
        }
        Ok(())
    }

    /// Returns timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns connect timeout as Duration.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:8080".to_owned()
}

fn default_mobile_app_scheme() -> String {
    "sorceri://".to_owned()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_pool_max_idle() -> usize {
    10
}
