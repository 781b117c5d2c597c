//! Backend seam for the subscription view-model.
//!
//! [`SubscriptionBackend`] abstracts the subscription endpoints so the view-model can
//! be driven by [`ApiClient`] in production and by an in-memory double in tests.

use std::future::Future;

use super::models::{PlanId, SubscriptionRecord};
use crate::{
    api::{ApiClient, ApiOutcome, CouponValidation, SubscriptionRequest},
    error::Result,
    session::Session,
};

/// Subscription operations the view-model depends on.
///
/// Every authenticated call takes the session explicitly. Implementations must not
/// retry on their own.
pub trait SubscriptionBackend: Send + Sync {
    /// Fetches the current subscription, `None` if there is none.
    fn current<'a>(
        &'a self,
        session: &'a Session,
    ) -> impl Future<Output = Result<Option<SubscriptionRecord>>> + Send + 'a;

    /// Creates a subscription.
    fn create<'a>(
        &'a self,
        session: &'a Session,
        request: &'a SubscriptionRequest,
    ) -> impl Future<Output = Result<ApiOutcome>> + Send + 'a;

    /// Upgrades or downgrades an existing subscription.
    fn upgrade<'a>(
        &'a self,
        session: &'a Session,
        request: &'a SubscriptionRequest,
    ) -> impl Future<Output = Result<ApiOutcome>> + Send + 'a;

    /// Cancels at the end of the paid period.
    fn cancel<'a>(
        &'a self,
        session: &'a Session,
    ) -> impl Future<Output = Result<ApiOutcome>> + Send + 'a;

    /// Reactivates a cancelled subscription.
    fn reactivate<'a>(
        &'a self,
        session: &'a Session,
        plan: PlanId,
    ) -> impl Future<Output = Result<ApiOutcome>> + Send + 'a;

    /// Validates a promotional code.
    fn validate_coupon<'a>(
        &'a self,
        promo_code: &'a str,
    ) -> impl Future<Output = Result<CouponValidation>> + Send + 'a;
}

impl SubscriptionBackend for ApiClient {
    async fn current<'a>(&'a self, session: &'a Session) -> Result<Option<SubscriptionRecord>> {
        self.current_subscription(session).await
    }

    async fn create<'a>(
        &'a self,
        session: &'a Session,
        request: &'a SubscriptionRequest,
    ) -> Result<ApiOutcome> {
        self.create_subscription(session, request).await
    }

    async fn upgrade<'a>(
        &'a self,
        session: &'a Session,
        request: &'a SubscriptionRequest,
    ) -> Result<ApiOutcome> {
        self.upgrade_subscription(session, request).await
    }

    async fn cancel<'a>(&'a self, session: &'a Session) -> Result<ApiOutcome> {
        self.cancel_subscription(session).await
    }

    async fn reactivate<'a>(&'a self, session: &'a Session, plan: PlanId) -> Result<ApiOutcome> {
        self.reactivate_subscription(session, plan).await
    }

    async fn validate_coupon<'a>(&'a self, promo_code: &'a str) -> Result<CouponValidation> {
        ApiClient::validate_coupon(self, promo_code).await
    }
}
