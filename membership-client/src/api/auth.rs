//! Authentication and password reset endpoints.
//!
//! None of these calls carry a bearer credential.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::{
    endpoints,
    http::{ApiClient, INVALID_JSON_MESSAGE, normalize_response},
};
use crate::{
    error::{ClientError, Result},
    session::Session,
};

/// Message used when a successful login response has no body.
pub const EMPTY_LOGIN_RESPONSE: &str = "Empty response received from server";

/// Message used when the backend accepts a login but sends no user id.
pub const MISSING_UID_MESSAGE: &str = "Login response did not include a user id";

const LOGIN_FAILED_MESSAGE: &str = "Login failed. Please try again.";

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    token: &'a str,
}

#[derive(Serialize)]
struct EmailRequest<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct ResetPasswordRequest<'a> {
    token: &'a str,
    new_password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    uid: Option<String>,
    #[serde(default)]
    firebase_token: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct VerifiedUser {
    uid: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    firebase_token: Option<String>,
}

#[derive(Deserialize)]
struct VerifyTokenResponse {
    #[serde(default)]
    user: Option<VerifiedUser>,
}

#[derive(Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl StatusResponse {
    fn into_result(self, fallback: &str) -> Result<()> {
        if self.status.as_deref() == Some("ok") {
            Ok(())
        } else {
            Err(ClientError::Rejected(self.message.unwrap_or_else(|| fallback.to_owned())))
        }
    }
}

/// Result of checking a password reset token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResetTokenStatus {
    /// Whether the token can still be used.
    #[serde(default)]
    pub valid: bool,
    /// Email address the token was issued for.
    #[serde(default)]
    pub email: Option<String>,
    /// Explanation when the token is not valid.
    #[serde(default)]
    pub message: Option<String>,
}

fn decode<T: for<'de> Deserialize<'de>>(value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| ClientError::InvalidResponse(format!("Unexpected response shape: {e}")))
}

impl ApiClient {
    /// Logs in with email and password.
    ///
    /// Succeeds when the backend answers `status == "ok"` with a token. The session
    /// is keyed by uid, so an accepted login that carries no uid is reported as a
    /// malformed response rather than a refusal.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Rejected`] with the backend message (or a generic one) when the
    ///   login is refused
    /// - [`ClientError::InvalidResponse`] when a 2xx body is empty, not JSON, or has no uid
    /// - [`ClientError::Status`] or [`ClientError::Http`] on transport failure
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        info!("requesting login");
        let raw = self
            .send(Method::POST, endpoints::LOGIN, None, Some(&LoginRequest { email, password }))
            .await?;

        if !raw.is_success() {
            normalize_response(&raw)?;
        }
        if raw.text.trim().is_empty() {
            warn!("login response body was empty");
            return Err(ClientError::InvalidResponse(EMPTY_LOGIN_RESPONSE.to_owned()));
        }

        let response: LoginResponse = serde_json::from_str(&raw.text)
            .map_err(|_| ClientError::InvalidResponse(INVALID_JSON_MESSAGE.to_owned()))?;

        let (Some("ok"), Some(token)) = (response.status.as_deref(), response.token.as_deref())
        else {
            return Err(ClientError::Rejected(
                response.message.unwrap_or_else(|| LOGIN_FAILED_MESSAGE.to_owned()),
            ));
        };
        if token.is_empty() {
            return Err(ClientError::Rejected(LOGIN_FAILED_MESSAGE.to_owned()));
        }
        let Some(uid) = response.uid.as_deref().filter(|uid| !uid.is_empty()) else {
            warn!("login succeeded without a user id");
            return Err(ClientError::InvalidResponse(MISSING_UID_MESSAGE.to_owned()));
        };

        let mut session = Session::new(uid, token)?;
        if let Some(firebase_token) = response.firebase_token.as_deref() {
            session = session.with_firebase_token(firebase_token);
        }
        let email = response.email.as_deref().unwrap_or(email);
        Ok(session.with_email(email))
    }

    /// Verifies a deep-link token and builds a session for the verified user.
    ///
    /// The deep-link token is a Firebase token; it is used as bearer credential unless
    /// the backend returns a fresher one.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Session`] if no user is returned or the user's uid does not
    /// match `expected_uid`.
    #[instrument(skip(self, token))]
    pub async fn verify_token(&self, token: &str, expected_uid: &str) -> Result<Session> {
        info!("verifying token");
        let value = self
            .request_json(
                Method::POST,
                endpoints::VERIFY_TOKEN,
                None,
                Some(&TokenRequest { token }),
            )
            .await?;
        let response: VerifyTokenResponse = decode(value)?;

        let user = response
            .user
            .ok_or_else(|| ClientError::Session("token verification returned no user".to_owned()))?;
        if user.uid != expected_uid {
            warn!(verified_uid = %user.uid, "verified token belongs to a different user");
            return Err(ClientError::Session(
                "verified token belongs to a different user".to_owned(),
            ));
        }

        let session_token = user.token.as_deref().unwrap_or(token);
        let firebase_token = user.firebase_token.as_deref().unwrap_or(token);
        let mut session = Session::new(user.uid.as_str(), session_token)?
            .with_firebase_token(firebase_token);
        if let Some(email) = user.email.as_deref() {
            session = session.with_email(email);
        }
        Ok(session)
    }

    /// Requests a password reset email.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Rejected`] if the backend does not answer `status == "ok"`.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        info!("requesting password reset email");
        let value = self
            .request_json(
                Method::POST,
                endpoints::FORGOT_PASSWORD,
                None,
                Some(&EmailRequest { email }),
            )
            .await?;
        decode::<StatusResponse>(value)?
            .into_result("Failed to send reset email. Please try again.")
    }

    /// Checks whether a password reset token is still valid.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a malformed body. An invalid token is
    /// reported through [`ResetTokenStatus::valid`], not as an error.
    #[instrument(skip(self, token))]
    pub async fn verify_reset_token(&self, token: &str) -> Result<ResetTokenStatus> {
        let value = self
            .request_json(
                Method::POST,
                endpoints::VERIFY_RESET_TOKEN,
                None,
                Some(&TokenRequest { token }),
            )
            .await?;
        decode(value)
    }

    /// Sets a new password using a reset token.
    ///
    /// The password pair is validated locally first; no request is sent if it fails.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidInput`] if local validation fails, or
    /// [`ClientError::Rejected`] if the backend refuses the reset.
    #[instrument(skip(self, token, new_password, confirm_password))]
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<()> {
        validate_new_password(new_password, confirm_password)?;
        info!("resetting password");
        let value = self
            .request_json(
                Method::POST,
                endpoints::RESET_PASSWORD,
                None,
                Some(&ResetPasswordRequest { token, new_password }),
            )
            .await?;
        decode::<StatusResponse>(value)?.into_result("Failed to reset password. Please try again.")
    }
}

/// Validates a new password and its confirmation.
///
/// # Errors
///
/// Returns [`ClientError::InvalidInput`] with a user-facing message.
///
/// # Examples
///
/// ```
/// use membership_client::api::auth::validate_new_password;
///
/// assert!(validate_new_password("secret1", "secret1").is_ok());
/// assert_eq!(
///     validate_new_password("secret1", "secret2").unwrap_err().to_string(),
///     "Passwords do not match"
/// );
/// ```
pub fn validate_new_password(password: &str, confirm: &str) -> Result<()> {
    if password != confirm {
        return Err(ClientError::InvalidInput("Passwords do not match".to_owned()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ClientError::InvalidInput(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

/// Maps a login failure to the message shown to the user.
#[must_use]
pub fn login_error_message(error: &ClientError) -> String {
    match error {
        ClientError::Rejected(message) => return message.clone(),
        ClientError::InvalidResponse(message) if message == MISSING_UID_MESSAGE => {
            return message.clone();
        }
        _ => {}
    }

    let text = error.to_string();
    if text.contains("Invalid credentials") {
        "Invalid email or password. Please try again.".to_owned()
    } else if error.is_network() || text.contains("network") || text.contains("connection") {
        "Network error. Please check your internet connection.".to_owned()
    } else {
        "Authentication failed. Please check your credentials and try again.".to_owned()
    }
}
