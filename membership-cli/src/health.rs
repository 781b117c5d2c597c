//! Local health report for the `health` command.
//!
//! Checks what can be verified without contacting the backend: configuration,
//! transport security of the base URL, and the saved session.

use membership_client::{ClientConfig, ClientError, Session};
use serde::Serialize;

/// Overall health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every check passed.
    Healthy,
    /// At least one check warned.
    Degraded,
    /// At least one check failed.
    Unhealthy,
}

/// Outcome of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthCheckStatus {
    /// Check passed.
    Pass,
    /// Usable, but worth attention.
    Warn,
    /// Check failed.
    Fail,
}

/// Individual health check result.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    /// Check name.
    pub name: &'static str,
    /// Check status.
    pub status: HealthCheckStatus,
    /// Details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthCheck {
    fn new(name: &'static str, status: HealthCheckStatus, message: impl Into<String>) -> Self {
        Self { name, status, message: Some(message.into()) }
    }

    /// Creates a passing check.
    #[must_use]
    pub fn pass(name: &'static str, message: impl Into<String>) -> Self {
        Self::new(name, HealthCheckStatus::Pass, message)
    }

    /// Creates a warning check.
    #[must_use]
    pub fn warn(name: &'static str, message: impl Into<String>) -> Self {
        Self::new(name, HealthCheckStatus::Warn, message)
    }

    /// Creates a failing check.
    #[must_use]
    pub fn fail(name: &'static str, message: impl Into<String>) -> Self {
        Self::new(name, HealthCheckStatus::Fail, message)
    }
}

/// Health report printed as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Overall status.
    pub status: HealthStatus,
    /// CLI version.
    pub version: &'static str,
    /// Backend base URL, when the configuration loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    /// Individual checks.
    pub checks: Vec<HealthCheck>,
}

impl HealthReport {
    /// Builds a report from the outcome of loading the configuration and the session.
    #[must_use]
    pub fn collect(
        config: &Result<ClientConfig, ClientError>,
        session: &Result<Option<Session>, ClientError>,
    ) -> Self {
        let mut checks = Vec::with_capacity(3);

        let api_base_url = match config {
            Ok(config) => {
                checks.push(HealthCheck::pass("config", "configuration is valid"));
                checks.push(if config.uses_https() {
                    HealthCheck::pass("transport", "backend is reached over HTTPS")
                } else {
                    HealthCheck::warn("transport", "backend base URL is not using HTTPS")
                });
                Some(config.api_base_url.clone())
            }
            Err(e) => {
                checks.push(HealthCheck::fail("config", e.to_string()));
                None
            }
        };

        checks.push(match session {
            Ok(Some(session)) => {
                HealthCheck::pass("session", format!("logged in as {}", session.uid()))
            }
            Ok(None) => HealthCheck::warn("session", "no saved session, run `membership login`"),
            Err(e) => HealthCheck::fail("session", e.to_string()),
        });

        Self {
            status: Self::compute_status(&checks),
            version: env!("CARGO_PKG_VERSION"),
            api_base_url,
            checks,
        }
    }

    /// Determines overall health status from individual checks.
    #[must_use]
    pub fn compute_status(checks: &[HealthCheck]) -> HealthStatus {
        if checks.iter().any(|c| c.status == HealthCheckStatus::Fail) {
            HealthStatus::Unhealthy
        } else if checks.iter().any(|c| c.status == HealthCheckStatus::Warn) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    /// Serializes the report to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns error if JSON serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
