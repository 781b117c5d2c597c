//! Saved payment methods and Stripe setup intents.
//!
//! Card details never pass through this crate. The backend hands out a setup-intent
//! client secret, Stripe tokenizes the card, and only the resulting opaque
//! payment-method reference comes back to [`SubscriptionRequest`](super::SubscriptionRequest).

use std::fmt;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use zeroize::Zeroize;

use super::{
    endpoints,
    http::{ApiClient, normalize_response},
};
use crate::{
    error::{ClientError, Result},
    session::Session,
};

/// Card saved on the user's Stripe customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    /// Stripe payment-method reference.
    pub id: String,
    /// Card brand (`visa`, `mastercard`, ...).
    #[serde(default)]
    pub brand: String,
    /// Last four digits of the card number.
    #[serde(default)]
    pub last4: String,
    /// Expiry month.
    #[serde(default)]
    pub exp_month: Option<u32>,
    /// Expiry year.
    #[serde(default)]
    pub exp_year: Option<u32>,
    /// Whether this is the customer's default method.
    #[serde(default)]
    pub is_default: bool,
}

impl PaymentMethod {
    /// Returns a one-line description such as `VISA •••• 4242 (12/2030)`.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut summary = format!("{} •••• {}", self.brand.to_uppercase(), self.last4);
        if let (Some(month), Some(year)) = (self.exp_month, self.exp_year) {
            summary.push_str(&format!(" ({month}/{year})"));
        }
        summary
    }
}

/// Returns the default method from a list, if any.
#[must_use]
pub fn default_method(methods: &[PaymentMethod]) -> Option<&PaymentMethod> {
    methods.iter().find(|m| m.is_default)
}

/// Client secret of a Stripe setup intent.
///
/// The secret is redacted from [`Debug`] output and zeroized on drop.
#[derive(Clone, Deserialize)]
pub struct SetupIntent {
    #[serde(default)]
    client_secret: String,
}

impl SetupIntent {
    /// Returns the client secret to hand to Stripe.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl fmt::Debug for SetupIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetupIntent").field("client_secret", &"<redacted>").finish()
    }
}

impl Drop for SetupIntent {
    fn drop(&mut self) {
        self.client_secret.zeroize();
    }
}

#[derive(Serialize)]
struct EmptyBody {}

impl ApiClient {
    /// Lists the user's saved payment methods.
    ///
    /// A failed request yields an empty list; the checkout falls back to entering a
    /// new card. This includes a successful response whose body is not a list of
    /// payment methods.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidInput`] if the session uid cannot be used in a path.
    #[instrument(skip(self, session), fields(uid = session.uid()))]
    pub async fn payment_methods(&self, session: &Session) -> Result<Vec<PaymentMethod>> {
        let path = endpoints::payment_methods(session.uid())?;
        let raw = match self.send::<()>(Method::GET, &path, Some(session.bearer()), None).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "failed to fetch payment methods");
                return Ok(Vec::new());
            }
        };

        if !raw.is_success() {
            warn!(status = raw.status, "payment methods request failed");
            return Ok(Vec::new());
        }

        let value = match normalize_response(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "unreadable payment methods response");
                return Ok(Vec::new());
            }
        };
        if value.as_object().is_some_and(serde_json::Map::is_empty) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(error = %e, "unexpected payment methods shape");
            Vec::new()
        }))
    }

    /// Removes a saved payment method.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-2xx status.
    #[instrument(skip(self, session, payment_method_id), fields(uid = session.uid()))]
    pub async fn remove_payment_method(
        &self,
        session: &Session,
        payment_method_id: &str,
    ) -> Result<()> {
        info!("removing payment method");
        let path = endpoints::payment_method(session.uid(), payment_method_id)?;
        self.request_json::<()>(Method::DELETE, &path, Some(session.bearer()), None).await?;
        Ok(())
    }

    /// Makes a saved payment method the default.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-2xx status.
    #[instrument(skip(self, session, payment_method_id), fields(uid = session.uid()))]
    pub async fn set_default_payment_method(
        &self,
        session: &Session,
        payment_method_id: &str,
    ) -> Result<()> {
        info!("setting default payment method");
        let path = endpoints::set_default_payment_method(session.uid(), payment_method_id)?;
        self.request_json::<()>(Method::POST, &path, Some(session.bearer()), None).await?;
        Ok(())
    }

    /// Creates a Stripe setup intent for collecting a new card.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidResponse`] if the response has no client secret.
    #[instrument(skip(self))]
    pub async fn create_setup_intent(&self) -> Result<SetupIntent> {
        let value = self
            .request_json(Method::POST, endpoints::CREATE_SETUP_INTENT, None, Some(&EmptyBody {}))
            .await?;
        let intent: SetupIntent = serde_json::from_value(value)
            .map_err(|e| ClientError::InvalidResponse(format!("Unexpected setup intent: {e}")))?;
        if intent.client_secret.is_empty() {
            return Err(ClientError::InvalidResponse(
                "setup intent response missing client_secret".to_owned(),
            ));
        }
        Ok(intent)
    }
}
