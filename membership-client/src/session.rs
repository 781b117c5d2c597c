//! Explicit authenticated session.
//!
//! A [`Session`] is issued by the backend at login (or by verifying a deep-link token
//! handed over by the mobile app) and is passed explicitly to every authenticated call.
//! [`SessionManager`] owns at most one session at a time and can optionally persist it
//! to a JSON file chosen by the caller.
//!
//! # Security
//!
//! - Tokens are never logged; the [`Debug`] output redacts them
//! - Tokens are zeroized when the session is dropped
//! - The session file is written with the caller's permissions and should be treated
//!   as a credential

use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use zeroize::Zeroize;

use crate::{
    api::{ApiClient, auth::login_error_message, endpoints::validate_id},
    error::{ClientError, Result},
};

/// Authenticated user session.
///
/// The bearer credential sent to subscription and payment endpoints is the Firebase
/// token when present, else the session token.
///
/// # Examples
///
/// ```
/// use membership_client::Session;
///
/// let session = Session::new("user_123", "session-token")?.with_firebase_token("firebase-token");
/// assert_eq!(session.uid(), "user_123");
/// assert_eq!(session.bearer(), "firebase-token");
/// # Ok::<(), membership_client::ClientError>(())
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    uid: String,
    session_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    firebase_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

impl Session {
    /// Creates a session for `uid` authenticated by `session_token`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Session`] if the uid is malformed or the token is empty.
    pub fn new(uid: impl Into<String>, session_token: impl Into<String>) -> Result<Self> {
        let uid = uid.into();
        let session_token = session_token.into();

        validate_id("uid", &uid).map_err(|e| ClientError::Session(e.to_string()))?;
        if session_token.trim().is_empty() {
            return Err(ClientError::Session("session token cannot be empty".to_owned()));
        }

        Ok(Self { uid, session_token, firebase_token: None, email: None })
    }

    /// Attaches a Firebase token, which then takes precedence as bearer credential.
    ///
    /// Empty tokens are ignored.
    #[must_use]
    pub fn with_firebase_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        if !token.is_empty() {
            self.firebase_token = Some(token);
        }
        self
    }

    /// Attaches the user's email for display.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Returns the user id.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Returns the user's email, if known.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns true if a Firebase token is attached.
    #[must_use]
    pub fn has_firebase_token(&self) -> bool {
        self.firebase_token.is_some()
    }

    /// Returns the credential for the `Authorization: Bearer` header.
    #[must_use]
    pub fn bearer(&self) -> &str {
        self.firebase_token.as_deref().unwrap_or(&self.session_token)
    }

    fn validate(&self) -> Result<()> {
        validate_id("uid", &self.uid).map_err(|e| ClientError::Session(e.to_string()))?;
        if self.session_token.trim().is_empty() {
            return Err(ClientError::Session("session token cannot be empty".to_owned()));
        }
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("uid", &self.uid)
            .field("session_token", &"<redacted>")
            .field("firebase_token", &self.firebase_token.as_ref().map(|_| "<redacted>"))
            .field("email", &self.email)
            .finish()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.session_token.zeroize();
        if let Some(token) = self.firebase_token.as_mut() {
            token.zeroize();
        }
    }
}

/// Owns the current session.
///
/// Without a store path the session lives only in memory. With one, [`save`](Self::save),
/// [`load`](Self::load) and [`clear`](Self::clear) read and write a JSON file.
#[derive(Debug, Default)]
pub struct SessionManager {
    current: Option<Session>,
    store: Option<PathBuf>,
}

impl SessionManager {
    /// Creates an in-memory manager with no session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a manager that persists to `path`.
    #[must_use]
    pub fn with_store(path: impl Into<PathBuf>) -> Self {
        Self { current: None, store: Some(path.into()) }
    }

    /// Returns the store path, if any.
    #[must_use]
    pub fn store_path(&self) -> Option<&Path> {
        self.store.as_deref()
    }

    /// Logs in with email and password and adopts the issued session.
    ///
    /// Failures are mapped to a user-facing message carried by
    /// [`ClientError::Rejected`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Rejected`] with the mapped message on any failure.
    #[instrument(skip(self, api, password))]
    pub async fn login(
        &mut self,
        api: &ApiClient,
        email: &str,
        password: &str,
    ) -> Result<&Session> {
        info!("logging in");
        let session = match api.login(email, password).await {
            Ok(session) => session,
            Err(ClientError::Rejected(message)) => return Err(ClientError::Rejected(message)),
            Err(e) => {
                warn!(error = %e, "login failed");
                return Err(ClientError::Rejected(login_error_message(&e)));
            }
        };
        Ok(self.adopt(session))
    }

    /// Verifies a deep-link token and adopts the resulting session.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Session`] if the token belongs to a different user, or any
    /// error from the verification request.
    #[instrument(skip(self, api, token))]
    pub async fn adopt_verified(
        &mut self,
        api: &ApiClient,
        token: &str,
        expected_uid: &str,
    ) -> Result<&Session> {
        info!("verifying deep-link token");
        let session = api.verify_token(token, expected_uid).await?;
        Ok(self.adopt(session))
    }

    /// Replaces the current session.
    pub fn adopt(&mut self, session: Session) -> &Session {
        self.current.insert(session)
    }

    /// Returns the current session, if any.
    #[must_use]
    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// Returns the current session or a [`ClientError::Session`] error.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Session`] when logged out.
    pub fn require(&self) -> Result<&Session> {
        self.current.as_ref().ok_or_else(|| ClientError::Session("not logged in".to_owned()))
    }

    /// Drops the current session.
    pub fn logout(&mut self) {
        if self.current.take().is_some() {
            info!("session cleared");
        }
    }

    /// Writes the current session to the store.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Session`] if there is no session or no store, or
    /// [`ClientError::Io`] if the write fails.
    pub fn save(&self) -> Result<()> {
        let path = self.require_store()?;
        let session = self.require()?;
        let json = serde_json::to_string_pretty(session)
            .map_err(|e| ClientError::Session(format!("failed to serialize session: {e}")))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Loads a session from the store, if the file exists.
    ///
    /// Returns `Ok(None)` when there is no file.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Session`] if the file is malformed, or
    /// [`ClientError::Io`] if it cannot be read.
    pub fn load(&mut self) -> Result<Option<&Session>> {
        let path = self.require_store()?;
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        let session: Session = serde_json::from_str(&content)
            .map_err(|e| ClientError::Session(format!("malformed session file: {e}")))?;
        session.validate()?;
        Ok(Some(self.adopt(session)))
    }

    /// Clears the in-memory session and deletes the store file.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] if the file exists but cannot be removed.
    pub fn clear(&mut self) -> Result<()> {
        self.logout();
        if let Some(path) = self.store.as_deref()
            && path.exists()
        {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    fn require_store(&self) -> Result<&Path> {
        self.store
            .as_deref()
            .ok_or_else(|| ClientError::Session("no session file configured".to_owned()))
    }
}
