//! Error types for the membership client.
//!
//! This module defines every error that can escape a client operation.
//! All errors implement the standard [`std::error::Error`] trait via [`thiserror::Error`].
//!
//! # Error Categories
//!
//! - **Network Errors** ([`ClientError::Http`]): the request never produced a response
//! - **Protocol Errors** ([`ClientError::Status`], [`ClientError::InvalidResponse`]): the
//!   backend answered with a non-2xx status or a body that could not be decoded
//! - **Application Errors** ([`ClientError::Rejected`]): the backend answered but refused
//! - **Local Errors** ([`ClientError::InvalidInput`], [`ClientError::Session`],
//!   [`ClientError::RequestInFlight`], [`ClientError::Config`]): rejected before any request
//!
//! Application-level failures of subscription mutations are not returned as errors by the
//! view-model; they are surfaced through its error message instead. See
//! [`crate::subscription::SubscriptionViewModel`].
//!
//! # Examples
//!
//! ```
//! use membership_client::error::{ClientError, Result};
//!
//! fn require_plan(name: &str) -> Result<&str> {
//!     if name.is_empty() {
//!         return Err(ClientError::InvalidInput("plan name cannot be empty".to_owned()));
//!     }
//!     Ok(name)
//! }
//! ```

use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur in the membership client.
///
/// # Error Recovery
///
/// Nothing is retried automatically. Every error is terminal for the operation that
/// produced it but never for the session: the caller may resubmit.
///
/// - **Transient errors** ([`Http`](Self::Http)): resubmit once connectivity is back
/// - **Status errors** ([`Status`](Self::Status)): the message carries the backend's
///   `detail` or `message` field and is safe to show to the user
/// - **Local errors**: fix the input and resubmit
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed before a response was received.
    ///
    /// Wraps [`reqwest::Error`]. Common causes are timeouts (default 30 seconds),
    /// refused connections, DNS failures and TLS errors.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    ///
    /// `message` is the best human-readable description found in the body:
    /// the JSON `detail` field, else `message`, else the raw text.
    #[error("Request failed with status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Extracted error message.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("{0}")]
    InvalidResponse(String),

    /// The backend processed the request but refused it (`status != "ok"`).
    #[error("{0}")]
    Rejected(String),

    /// Configuration could not be loaded or is out of range.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// No usable session is available for an authenticated call.
    #[error("Session error: {0}")]
    Session(String),

    /// Local validation rejected the input before any request was sent.
    #[error("{0}")]
    InvalidInput(String),

    /// A mutating operation is already in flight.
    ///
    /// The view-model gates duplicate submission while its loading flag is set.
    #[error("another request is already in flight")]
    RequestInFlight,

    /// Local I/O failed (configuration or session file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Returns true if this error was produced by the transport rather than the backend.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}
