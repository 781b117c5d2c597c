//! Subscription endpoints.
//!
//! Every call here is authenticated with the session's bearer credential. Mutating
//! calls return the decoded [`ApiOutcome`]; deciding what an outcome means for the UI
//! is left to the view-model.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use super::{endpoints, envelope::ApiOutcome, http::ApiClient};
use crate::{
    error::Result,
    session::Session,
    subscription::{PlanId, SubscriptionRecord},
};

/// Body of a create or upgrade request.
///
/// # Examples
///
/// ```
/// use membership_client::{api::SubscriptionRequest, subscription::PlanId};
///
/// let request = SubscriptionRequest::new(PlanId::Elevate)
///     .with_payment_method("pm_123")
///     .with_promo_code("SAVE10");
/// let json = serde_json::to_value(&request)?;
/// assert_eq!(json["plan_name"], "elevate");
/// assert!(json.get("force_downgrade").is_none());
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionRequest {
    /// Target plan.
    pub plan_name: PlanId,
    /// Opaque Stripe payment-method reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<String>,
    /// Validated promotional code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
    /// Overrides an existing scheduled change. Only sent on the upgrade endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_downgrade: Option<bool>,
}

impl SubscriptionRequest {
    /// Creates a request for `plan` with no payment details.
    #[must_use]
    pub fn new(plan: PlanId) -> Self {
        Self { plan_name: plan, payment_method_id: None, promo_code: None, force_downgrade: None }
    }

    /// Attaches a payment-method reference.
    #[must_use]
    pub fn with_payment_method(mut self, payment_method_id: impl Into<String>) -> Self {
        self.payment_method_id = Some(payment_method_id.into());
        self
    }

    /// Attaches a promotional code.
    #[must_use]
    pub fn with_promo_code(mut self, code: impl Into<String>) -> Self {
        self.promo_code = Some(code.into());
        self
    }

    /// Sets the `force_downgrade` flag.
    #[must_use]
    pub fn with_force_downgrade(mut self, force: bool) -> Self {
        self.force_downgrade = Some(force);
        self
    }
}

impl std::fmt::Debug for SubscriptionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRequest")
            .field("plan_name", &self.plan_name)
            .field("payment_method_id", &self.payment_method_id.as_ref().map(|_| "<redacted>"))
            .field("promo_code", &self.promo_code)
            .field("force_downgrade", &self.force_downgrade)
            .finish()
    }
}

#[derive(Serialize)]
struct ReactivateRequest {
    plan_name: PlanId,
}

#[derive(Deserialize)]
struct CurrentResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    subscription: Option<Value>,
}

impl ApiClient {
    /// Fetches the current subscription.
    ///
    /// Returns `Ok(None)` unless the backend answers `status == "ok"` with a
    /// non-null subscription.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or if the subscription cannot be decoded.
    #[instrument(skip(self, session), fields(uid = session.uid()))]
    pub async fn current_subscription(
        &self,
        session: &Session,
    ) -> Result<Option<SubscriptionRecord>> {
        let path = endpoints::current_subscription(session.uid())?;
        let value =
            self.request_json::<()>(Method::GET, &path, Some(session.bearer()), None).await?;

        let response: CurrentResponse = serde_json::from_value(value).unwrap_or(CurrentResponse {
            status: None,
            subscription: None,
        });
        match (response.status.as_deref(), response.subscription) {
            (Some("ok"), Some(subscription)) if !subscription.is_null() => {
                SubscriptionRecord::from_value(subscription).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Creates a subscription.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a malformed envelope.
    #[instrument(skip(self, session, request), fields(uid = session.uid(), plan_name = %request.plan_name))]
    pub async fn create_subscription(
        &self,
        session: &Session,
        request: &SubscriptionRequest,
    ) -> Result<ApiOutcome> {
        info!("creating subscription");
        let path = endpoints::create_subscription(session.uid())?;
        let value =
            self.request_json(Method::POST, &path, Some(session.bearer()), Some(request)).await?;
        ApiOutcome::decode(value)
    }

    /// Upgrades or downgrades an existing subscription.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a malformed envelope.
    #[instrument(skip(self, session, request), fields(uid = session.uid(), plan_name = %request.plan_name))]
    pub async fn upgrade_subscription(
        &self,
        session: &Session,
        request: &SubscriptionRequest,
    ) -> Result<ApiOutcome> {
        info!(force_downgrade = ?request.force_downgrade, "changing subscription plan");
        let path = endpoints::upgrade_subscription(session.uid())?;
        let value =
            self.request_json(Method::POST, &path, Some(session.bearer()), Some(request)).await?;
        ApiOutcome::decode(value)
    }

    /// Cancels the subscription at the end of the paid period.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a malformed envelope.
    #[instrument(skip(self, session), fields(uid = session.uid()))]
    pub async fn cancel_subscription(&self, session: &Session) -> Result<ApiOutcome> {
        info!("cancelling subscription");
        let path = endpoints::cancel_subscription(session.uid())?;
        let value =
            self.request_json::<()>(Method::POST, &path, Some(session.bearer()), None).await?;
        ApiOutcome::decode(value)
    }

    /// Reactivates a cancelled subscription on `plan`.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a malformed envelope.
    #[instrument(skip(self, session), fields(uid = session.uid()))]
    pub async fn reactivate_subscription(
        &self,
        session: &Session,
        plan: PlanId,
    ) -> Result<ApiOutcome> {
        info!("reactivating subscription");
        let path = endpoints::reactivate_subscription(session.uid())?;
        let body = ReactivateRequest { plan_name: plan };
        let value =
            self.request_json(Method::POST, &path, Some(session.bearer()), Some(&body)).await?;
        ApiOutcome::decode(value)
    }
}
