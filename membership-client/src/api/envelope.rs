//! Response envelope decoding.
//!
//! Mutating subscription endpoints answer with a loosely-typed envelope:
//!
//! ```json
//! {
//!   "status": "ok" | "warning" | "...",
//!   "message": "...",
//!   "data": { },
//!   "subscription": { },
//!   "requires_confirmation": true,
//!   "existing_scheduled_plan": "elevate",
//!   "scheduled_date": "2025-01-31T00:00:00Z"
//! }
//! ```
//!
//! [`ApiOutcome::decode`] turns it into a closed set of variants once, at the boundary,
//! so the view-model never inspects raw JSON.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ClientError, Result};

/// Decoded result of a mutating backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome {
    /// `status == "ok"`.
    Ok {
        /// Informational message from the backend.
        message: Option<String>,
        /// Subscription payload: `data`, falling back to `subscription` when `data`
        /// is null or an empty object.
        data: Option<Value>,
    },
    /// `status == "warning"` with `requires_confirmation` set.
    Warning(WarningPayload),
    /// Anything else, including a warning that does not ask for confirmation.
    Error {
        /// Error message from the backend, if any.
        message: Option<String>,
    },
}

/// Details of a change that needs explicit confirmation before it proceeds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WarningPayload {
    /// Human-readable warning.
    #[serde(default)]
    pub message: Option<String>,
    /// Plan already scheduled to take effect.
    #[serde(default)]
    pub existing_scheduled_plan: Option<String>,
    /// Date the scheduled plan takes effect.
    #[serde(default)]
    pub scheduled_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    subscription: Option<Value>,
    #[serde(default)]
    requires_confirmation: Option<bool>,
    #[serde(default)]
    existing_scheduled_plan: Option<String>,
    #[serde(default)]
    scheduled_date: Option<String>,
}

fn has_payload(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

impl ApiOutcome {
    /// Decodes a normalised response body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidResponse`] if the body is not a JSON object
    /// or a known field has the wrong type.
    ///
    /// # Examples
    ///
    /// ```
    /// use membership_client::api::ApiOutcome;
    /// use serde_json::json;
    ///
    /// let outcome = ApiOutcome::decode(json!({"status": "warning", "message": "sure?"}))?;
    /// assert!(matches!(outcome, ApiOutcome::Error { .. }));
    /// # Ok::<(), membership_client::ClientError>(())
    /// ```
    pub fn decode(body: Value) -> Result<Self> {
        let raw: RawEnvelope = serde_json::from_value(body)
            .map_err(|e| ClientError::InvalidResponse(format!("Unexpected response shape: {e}")))?;

        let outcome = match raw.status.as_deref() {
            Some("ok") => Self::Ok {
                message: raw.message,
                data: raw.data.filter(has_payload).or(raw.subscription.filter(has_payload)),
            },
            Some("warning") if raw.requires_confirmation.unwrap_or(false) => {
                Self::Warning(WarningPayload {
                    message: raw.message,
                    existing_scheduled_plan: raw.existing_scheduled_plan,
                    scheduled_date: raw.scheduled_date,
                })
            }
            _ => Self::Error { message: raw.message },
        };
        Ok(outcome)
    }

    /// Returns true for [`ApiOutcome::Ok`].
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// Returns the backend message carried by any variant.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Ok { message, .. } | Self::Error { message } => message.as_deref(),
            Self::Warning(payload) => payload.message.as_deref(),
        }
    }
}
