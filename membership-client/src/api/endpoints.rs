//! Backend endpoint paths.
//!
//! Every path is relative to [`ClientConfig::api_base_url`](crate::ClientConfig) and
//! carries the `/v1` prefix. Identifiers interpolated into a path are validated first so
//! that a malformed uid can never address a different resource.

use crate::error::{ClientError, Result};

/// Verifies a deep-link token issued by the mobile app.
pub const VERIFY_TOKEN: &str = "/v1/auth/verify-token";
/// Email and password login.
pub const LOGIN: &str = "/v1/auth/login";
/// Requests a password reset email.
pub const FORGOT_PASSWORD: &str = "/v1/auth/forgot-password";
/// Checks a password reset token.
pub const VERIFY_RESET_TOKEN: &str = "/v1/auth/verify-reset-token";
/// Sets a new password with a reset token.
pub const RESET_PASSWORD: &str = "/v1/auth/reset-password";
/// Validates a promotional code.
pub const VALIDATE_COUPON: &str = "/v1/users/validate-coupon";
/// Creates a Stripe setup intent.
pub const CREATE_SETUP_INTENT: &str = "/v1/payment/create-setup-intent";

const MAX_ID_LEN: usize = 128;

/// Validates an identifier before it is placed into a path segment.
///
/// # Errors
///
/// Returns [`ClientError::InvalidInput`] if the identifier is empty, too long,
/// or contains anything other than ASCII alphanumerics, `-` and `_`.
pub(crate) fn validate_id(kind: &str, id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(ClientError::InvalidInput(format!("{kind} cannot be empty")));
    }

    if id.len() > MAX_ID_LEN {
        return Err(ClientError::InvalidInput(format!(
            "{kind} must be {MAX_ID_LEN} characters or less"
        )));
    }

    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(ClientError::InvalidInput(format!(
            "{kind} must contain only alphanumeric characters, hyphens, and underscores"
        )));
    }

    Ok(())
}

/// `GET /v1/users/{uid}/subscriptions/current`
pub(crate) fn current_subscription(uid: &str) -> Result<String> {
    validate_id("uid", uid)?;
    Ok(format!("/v1/users/{uid}/subscriptions/current"))
}

/// `POST /v1/users/{uid}/subscriptions`
pub(crate) fn create_subscription(uid: &str) -> Result<String> {
    validate_id("uid", uid)?;
    Ok(format!("/v1/users/{uid}/subscriptions"))
}

/// `POST /v1/users/{uid}/subscriptions/upgrade-subscription`
pub(crate) fn upgrade_subscription(uid: &str) -> Result<String> {
    validate_id("uid", uid)?;
    Ok(format!("/v1/users/{uid}/subscriptions/upgrade-subscription"))
}

/// `POST /v1/users/{uid}/subscriptions/cancel-subscription`
pub(crate) fn cancel_subscription(uid: &str) -> Result<String> {
    validate_id("uid", uid)?;
    Ok(format!("/v1/users/{uid}/subscriptions/cancel-subscription"))
}

/// `POST /v1/users/{uid}/subscriptions/reactivate`
pub(crate) fn reactivate_subscription(uid: &str) -> Result<String> {
    validate_id("uid", uid)?;
    Ok(format!("/v1/users/{uid}/subscriptions/reactivate"))
}

/// `GET /v1/payment/users/{uid}/payment-methods`
pub(crate) fn payment_methods(uid: &str) -> Result<String> {
    validate_id("uid", uid)?;
    Ok(format!("/v1/payment/users/{uid}/payment-methods"))
}

/// `DELETE /v1/payment/users/{uid}/payment-methods/{id}`
pub(crate) fn payment_method(uid: &str, payment_method_id: &str) -> Result<String> {
    validate_id("uid", uid)?;
    validate_id("payment_method_id", payment_method_id)?;
    Ok(format!("/v1/payment/users/{uid}/payment-methods/{payment_method_id}"))
}

/// `POST /v1/payment/users/{uid}/payment-methods/{id}/set-default`
pub(crate) fn set_default_payment_method(uid: &str, payment_method_id: &str) -> Result<String> {
    Ok(format!("{}/set-default", payment_method(uid, payment_method_id)?))
}
