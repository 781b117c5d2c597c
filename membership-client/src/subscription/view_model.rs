//! Subscription lifecycle view-model.
//!
//! [`SubscriptionViewModel`] turns user plan choices and backend responses into the
//! step to render, the actions to offer and the messages to show. It performs no
//! billing computation: every state change except the optimistic cancel/reactivate
//! overwrite comes from a confirmed server response.
//!
//! # State Machine
//!
//! ```text
//! Selecting ──paid plan──▶ Paying ──payment ok──▶ Viewing
//!     ▲                      │                       │
//!     └────────back──────────┘                       │
//!     └──────────────request_plan_change─────────────┘
//! ```
//!
//! Any step renders as [`Screen::Error`] while an error message is set.
//!
//! # Request Tickets
//!
//! Every backend call is bracketed by a [`RequestTicket`]. A second call is rejected
//! with [`ClientError::RequestInFlight`] while one is outstanding, and a response is
//! applied only if its ticket is still the latest issued for that operation. The
//! async methods manage tickets themselves; UIs that run requests on their own tasks
//! can use [`begin_request`](SubscriptionViewModel::begin_request) and the
//! `complete_*` methods directly.

use std::collections::HashMap;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::{
    backend::SubscriptionBackend,
    models::{Plan, PlanId, SubscriptionRecord, SubscriptionStatus, catalog, format_display_date},
    promo::PromoState,
};
use crate::{
    api::{ApiOutcome, CouponValidation, SubscriptionRequest},
    error::{ClientError, Result},
    session::Session,
};

/// Fallback error when a subscription change is refused without a message.
pub const PROCESS_FAILED_MESSAGE: &str = "Failed to process membership";
/// Fallback error when cancellation is refused without a message.
pub const CANCEL_FAILED_MESSAGE: &str = "Failed to cancel membership";
/// Fallback error when reactivation is refused without a message.
pub const REACTIVATE_FAILED_MESSAGE: &str = "Failed to reactivate subscription";
/// Info message after a successful reactivation.
pub const REACTIVATED_MESSAGE: &str =
    "Subscription reactivated successfully! Your plan will continue to renew automatically.";

const ALREADY_SUBSCRIBED_MARKER: &str = "already has an active subscription";

/// Flow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Choosing a plan.
    Selecting = 1,
    /// Entering payment for a paid plan.
    Paying = 2,
    /// Viewing the current subscription.
    Viewing = 3,
}

impl Step {
    /// Returns the 1-based step number.
    #[must_use]
    pub const fn number(self) -> u8 {
        self as u8
    }
}

/// Screen to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    /// Plan cards.
    PlanSelection,
    /// Checkout form.
    Payment,
    /// Current membership details.
    Membership,
    /// Error message with a retry affordance.
    Error,
}

/// Action offered on the membership screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Pick a different plan.
    ChangePlan,
    /// Cancel at period end.
    CancelMembership,
    /// Return to the mobile app.
    OpenApp,
    /// Reactivate the cancelled plan.
    Reactivate,
    /// Pick a different plan after cancelling.
    SwitchPlan,
    /// Replace an already-scheduled plan change.
    ChangeScheduledPlan,
}

/// Logical backend operation a ticket belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Initial fetch.
    Load,
    /// Re-fetch of authoritative state.
    Refresh,
    /// Create or downgrade to the free plan.
    SubmitFreePlan,
    /// Create or upgrade with a payment method.
    SubmitPayment,
    /// Cancel.
    Cancel,
    /// Reactivate.
    Reactivate,
}

/// Proof that a backend call was issued, used to match its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    op: Operation,
    generation: u64,
}

impl RequestTicket {
    /// Returns the operation.
    #[must_use]
    pub fn op(&self) -> Operation {
        self.op
    }

    /// Returns the generation number.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Conflicting scheduled change awaiting explicit confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingWarning {
    /// Plan the user asked for.
    pub plan: PlanId,
    /// Plan already scheduled.
    pub existing_plan: Option<String>,
    /// Date the scheduled plan takes effect.
    pub scheduled_date: Option<String>,
    /// Backend explanation.
    pub message: Option<String>,
}

/// Request to leave the flow for the success view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Navigation {
    /// Plan that was subscribed to.
    pub plan: PlanId,
    /// Subscription payload returned by the backend.
    pub subscription_data: Option<Value>,
}

/// One plan card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanOption {
    /// Catalog entry.
    pub plan: &'static Plan,
    /// The user's active plan.
    pub is_current: bool,
    /// Target of the scheduled plan change.
    pub is_scheduled: bool,
}

impl PlanOption {
    /// Returns true if the card can be picked.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        !self.is_current
    }
}

/// Client-side subscription lifecycle state.
#[derive(Debug)]
pub struct SubscriptionViewModel<B> {
    backend: B,
    session: Session,
    step: Step,
    selected_plan: Option<PlanId>,
    current: Option<SubscriptionRecord>,
    error: Option<String>,
    info: Option<String>,
    pending_warning: Option<PendingWarning>,
    navigation: Option<Navigation>,
    promo: PromoState,
    generation: u64,
    latest: HashMap<Operation, u64>,
    in_flight: Option<RequestTicket>,
}

impl<B: SubscriptionBackend> SubscriptionViewModel<B> {
    /// Creates a view-model on the plan selection step with no cached subscription.
    #[must_use]
    pub fn new(backend: B, session: Session) -> Self {
        Self {
            backend,
            session,
            step: Step::Selecting,
            selected_plan: None,
            current: None,
            error: None,
            info: None,
            pending_warning: None,
            navigation: None,
            promo: PromoState::new(),
            generation: 0,
            latest: HashMap::new(),
            in_flight: None,
        }
    }

    /// Creates a view-model seeded with a known subscription.
    #[must_use]
    pub fn with_subscription(backend: B, session: Session, record: SubscriptionRecord) -> Self {
        let mut vm = Self::new(backend, session);
        vm.current = Some(record);
        vm.step = Step::Viewing;
        vm
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Returns the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the current step.
    pub fn step(&self) -> Step {
        self.step
    }

    /// Returns the screen to render.
    pub fn screen(&self) -> Screen {
        if self.error.is_some() {
            return Screen::Error;
        }
        match self.step {
            Step::Selecting => Screen::PlanSelection,
            Step::Paying => Screen::Payment,
            Step::Viewing => Screen::Membership,
        }
    }

    /// Returns the plan chosen on the selection step.
    pub fn selected_plan(&self) -> Option<PlanId> {
        self.selected_plan
    }

    /// Returns the cached subscription.
    pub fn current_subscription(&self) -> Option<&SubscriptionRecord> {
        self.current.as_ref()
    }

    /// Returns the error message.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the informational message.
    pub fn info(&self) -> Option<&str> {
        self.info.as_deref()
    }

    /// Returns the warning awaiting confirmation.
    pub fn pending_warning(&self) -> Option<&PendingWarning> {
        self.pending_warning.as_ref()
    }

    /// Returns the pending navigation to the success view.
    pub fn navigation(&self) -> Option<&Navigation> {
        self.navigation.as_ref()
    }

    /// Takes the pending navigation, leaving none.
    pub fn take_navigation(&mut self) -> Option<Navigation> {
        self.navigation.take()
    }

    /// Returns the promotional code state.
    pub fn promo(&self) -> &PromoState {
        &self.promo
    }

    /// Returns true while a backend call is outstanding.
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Returns the actions offered for the cached subscription.
    pub fn available_actions(&self) -> Vec<Action> {
        let Some(record) = self.current.as_ref() else {
            return Vec::new();
        };

        match &record.status {
            SubscriptionStatus::Active if record.is_paid() => {
                vec![Action::ChangePlan, Action::CancelMembership]
            }
            SubscriptionStatus::Active => vec![Action::ChangePlan, Action::OpenApp],
            SubscriptionStatus::Cancelled if record.scheduled_plan_change.is_some() => {
                vec![Action::ChangeScheduledPlan]
            }
            SubscriptionStatus::Cancelled => vec![Action::Reactivate, Action::SwitchPlan],
            SubscriptionStatus::Pending | SubscriptionStatus::Other(_) => Vec::new(),
        }
    }

    /// Returns the plan cards with current and scheduled flags.
    ///
    /// Flags are only set while the subscription is active.
    pub fn plan_selection_view(&self) -> Vec<PlanOption> {
        let active = self.active_subscription();
        let current = active.and_then(SubscriptionRecord::plan_id);
        let scheduled = active.and_then(SubscriptionRecord::scheduled_plan);

        catalog()
            .iter()
            .map(|plan| PlanOption {
                plan,
                is_current: current == Some(plan.id),
                is_scheduled: scheduled == Some(plan.id),
            })
            .collect()
    }

    fn active_subscription(&self) -> Option<&SubscriptionRecord> {
        self.current.as_ref().filter(|r| r.is_active())
    }

    // ------------------------------------------------------------------------
    // Local transitions
    // ------------------------------------------------------------------------

    /// Returns to plan selection without contacting the backend.
    pub fn request_plan_change(&mut self) {
        self.step = Step::Selecting;
    }

    /// Leaves the payment step for plan selection.
    pub fn back_to_plans(&mut self) {
        if self.step == Step::Paying {
            self.step = Step::Selecting;
        }
    }

    /// Clears the error message.
    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Clears the informational message.
    pub fn dismiss_info(&mut self) {
        self.info = None;
    }

    /// Drops the pending warning without contacting the backend.
    pub fn dismiss_warning(&mut self) {
        self.pending_warning = None;
    }

    /// Replaces the promotional code being edited.
    pub fn edit_promo_code(&mut self, code: impl Into<String>) {
        self.promo.edit(code);
    }

    // ------------------------------------------------------------------------
    // Tickets
    // ------------------------------------------------------------------------

    /// Issues a ticket for `op`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::RequestInFlight`] while another ticket is outstanding.
    pub fn begin_request(&mut self, op: Operation) -> Result<RequestTicket> {
        if let Some(outstanding) = self.in_flight {
            debug!(?op, outstanding = ?outstanding.op, "rejecting duplicate submission");
            return Err(ClientError::RequestInFlight);
        }
        self.generation += 1;
        let ticket = RequestTicket { op, generation: self.generation };
        self.latest.insert(op, self.generation);
        self.in_flight = Some(ticket);
        Ok(ticket)
    }

    /// Gives up on a ticket whose response will never be applied.
    pub fn abandon_request(&mut self, ticket: RequestTicket) {
        if self.in_flight == Some(ticket) {
            self.in_flight = None;
        }
    }

    /// Settles a ticket and reports whether its response may be applied.
    fn accept(&mut self, ticket: RequestTicket) -> bool {
        if self.in_flight == Some(ticket) {
            self.in_flight = None;
        }
        let is_latest = self.latest.get(&ticket.op) == Some(&ticket.generation);
        if !is_latest {
            debug!(op = ?ticket.op, generation = ticket.generation, "discarding stale response");
        }
        is_latest
    }

    // ------------------------------------------------------------------------
    // Load / refresh
    // ------------------------------------------------------------------------

    /// Fetches the current subscription and picks the initial step.
    ///
    /// A failed fetch is treated as "no subscription".
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::RequestInFlight`] while another call is outstanding.
    #[instrument(skip(self), fields(uid = self.session.uid()))]
    pub async fn load(&mut self) -> Result<()> {
        let ticket = self.begin_request(Operation::Load)?;
        let result = self.backend.current(&self.session).await;
        self.complete_load(ticket, result);
        Ok(())
    }

    /// Applies the response of a [`Operation::Load`] call.
    pub fn complete_load(
        &mut self,
        ticket: RequestTicket,
        result: Result<Option<SubscriptionRecord>>,
    ) {
        if !self.accept(ticket) {
            return;
        }
        let record = result.unwrap_or_else(|e| {
            warn!(error = %e, "failed to fetch current subscription, assuming none");
            None
        });
        self.step = if record.is_some() { Step::Viewing } else { Step::Selecting };
        info!(has_subscription = record.is_some(), "subscription loaded");
        self.current = record;
    }

    /// Re-fetches authoritative state, overwriting any optimistic local changes.
    ///
    /// On failure the cached subscription is kept.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::RequestInFlight`] while another call is outstanding.
    #[instrument(skip(self), fields(uid = self.session.uid()))]
    pub async fn refresh(&mut self) -> Result<()> {
        let ticket = self.begin_request(Operation::Refresh)?;
        let result = self.backend.current(&self.session).await;
        self.complete_refresh(ticket, result);
        Ok(())
    }

    /// Applies the response of a [`Operation::Refresh`] call.
    pub fn complete_refresh(
        &mut self,
        ticket: RequestTicket,
        result: Result<Option<SubscriptionRecord>>,
    ) {
        if !self.accept(ticket) {
            return;
        }
        match result {
            Ok(record) => {
                if self.step != Step::Paying {
                    self.step = if record.is_some() { Step::Viewing } else { Step::Selecting };
                }
                self.current = record;
            }
            Err(e) => warn!(error = %e, "refresh failed, keeping cached subscription"),
        }
    }

    // ------------------------------------------------------------------------
    // Plan selection
    // ------------------------------------------------------------------------

    /// Handles a plan card being picked.
    ///
    /// - the active plan is ignored
    /// - the plan already scheduled is refused with an informational message
    /// - the free plan is submitted immediately
    /// - a paid plan moves to the payment step without contacting the backend
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::RequestInFlight`] if the free plan is picked while another
    /// call is outstanding.
    #[instrument(skip(self), fields(uid = self.session.uid()))]
    pub async fn select_plan(&mut self, plan: PlanId) -> Result<()> {
        if let Some(active) = self.active_subscription() {
            if active.plan_id() == Some(plan) {
                debug!(%plan, "ignoring selection of the current plan");
                return Ok(());
            }
            if active.scheduled_plan() == Some(plan) {
                let date = active
                    .scheduled_change_date
                    .as_deref()
                    .map(format_display_date)
                    .unwrap_or_default();
                self.info = Some(format!(
                    "You already have a scheduled downgrade to {} plan on {date}.",
                    plan.display_name()
                ));
                return Ok(());
            }
        }

        self.selected_plan = Some(plan);
        if plan.is_paid() {
            info!(%plan, "paid plan selected, moving to payment");
            self.promo = PromoState::new();
            self.step = Step::Paying;
            Ok(())
        } else {
            self.submit_free_plan(plan, false).await
        }
    }

    /// Subscribes to the free plan.
    ///
    /// Uses the upgrade/downgrade endpoint with `force_downgrade` when an active paid
    /// plan exists, and the create endpoint otherwise.
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidInput`] if `plan` is not the free plan
    /// - [`ClientError::RequestInFlight`] while another call is outstanding
    #[instrument(skip(self), fields(uid = self.session.uid()))]
    pub async fn submit_free_plan(&mut self, plan: PlanId, force_downgrade: bool) -> Result<()> {
        if plan.is_paid() {
            return Err(ClientError::InvalidInput(format!("{plan} is not a free plan")));
        }

        let ticket = self.begin_request(Operation::SubmitFreePlan)?;
        let downgrade = self.current.as_ref().is_some_and(SubscriptionRecord::is_active_paid);

        let result = if downgrade {
            let request = SubscriptionRequest::new(plan).with_force_downgrade(force_downgrade);
            self.backend.upgrade(&self.session, &request).await
        } else {
            let request = SubscriptionRequest::new(plan);
            self.backend.create(&self.session, &request).await
        };

        self.complete_free_plan(ticket, plan, result);
        Ok(())
    }

    /// Applies the response of a [`Operation::SubmitFreePlan`] call.
    pub fn complete_free_plan(
        &mut self,
        ticket: RequestTicket,
        plan: PlanId,
        result: Result<ApiOutcome>,
    ) {
        if !self.accept(ticket) {
            return;
        }

        match result {
            Ok(ApiOutcome::Warning(payload)) => {
                info!(
                    existing_plan = ?payload.existing_scheduled_plan,
                    "plan change needs confirmation"
                );
                self.pending_warning = Some(PendingWarning {
                    plan,
                    existing_plan: payload.existing_scheduled_plan,
                    scheduled_date: payload.scheduled_date,
                    message: payload.message,
                });
            }
            Ok(ApiOutcome::Ok { message, data })
                if message.as_deref().is_some_and(|m| m.contains(ALREADY_SUBSCRIBED_MARKER)) =>
            {
                let active_plan = data
                    .as_ref()
                    .and_then(|d| d.get("plan_name"))
                    .and_then(Value::as_str)
                    .or_else(|| self.current.as_ref().map(|r| r.plan_name.as_str()))
                    .unwrap_or("paid")
                    .to_owned();
                self.error = Some(format!(
                    "You currently have an active {active_plan} plan. Please cancel your current \
                     membership first before switching to the free plan."
                ));
            }
            Ok(ApiOutcome::Ok { data, .. }) => {
                info!(%plan, "free plan confirmed");
                self.apply_confirmed(plan, data);
            }
            Ok(ApiOutcome::Error { message }) => {
                self.error = Some(message.unwrap_or_else(|| PROCESS_FAILED_MESSAGE.to_owned()));
            }
            Err(e) => {
                self.error = Some(format!("Error processing membership: {e}"));
            }
        }
    }

    /// Repeats the warned free-plan change with `force_downgrade` set.
    ///
    /// The pending warning is cleared whatever the outcome. Does nothing without a
    /// pending warning.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::RequestInFlight`] while another call is outstanding.
    pub async fn confirm_warning(&mut self) -> Result<()> {
        let Some(warning) = self.pending_warning.take() else {
            return Ok(());
        };
        self.submit_free_plan(warning.plan, true).await
    }

    // ------------------------------------------------------------------------
    // Payment
    // ------------------------------------------------------------------------

    /// Checks the typed promotional code with the backend.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidInput`] for a blank code, or
    /// [`ClientError::RequestInFlight`] while a validation is running.
    #[instrument(skip(self))]
    pub async fn validate_promo_code(&mut self) -> Result<()> {
        let code = self.promo.begin_validation()?;
        let result: Result<CouponValidation> = self.backend.validate_coupon(&code).await;
        self.promo.apply_result(result);
        Ok(())
    }

    /// Subscribes to the selected paid plan with an opaque payment-method reference.
    ///
    /// When `promo_code` is `None` the validated code from [`promo`](Self::promo), if
    /// any, is sent. Uses the upgrade endpoint when the cached subscription is active or
    /// cancelled, and the create endpoint otherwise.
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidInput`] without a selected paid plan or with an empty
    ///   payment-method reference
    /// - [`ClientError::RequestInFlight`] while another call is outstanding
    #[instrument(skip(self, payment_method_ref, promo_code), fields(uid = self.session.uid()))]
    pub async fn submit_payment(
        &mut self,
        payment_method_ref: &str,
        promo_code: Option<&str>,
    ) -> Result<()> {
        let plan = self
            .selected_plan
            .filter(|p| p.is_paid())
            .ok_or_else(|| ClientError::InvalidInput("no paid plan selected".to_owned()))?;
        if payment_method_ref.trim().is_empty() {
            return Err(ClientError::InvalidInput(
                "payment method reference is required".to_owned(),
            ));
        }

        let mut request = SubscriptionRequest::new(plan).with_payment_method(payment_method_ref);
        if let Some(code) = promo_code.or_else(|| self.promo.code_for_submission()) {
            request = request.with_promo_code(code);
        }

        let ticket = self.begin_request(Operation::SubmitPayment)?;
        let upgrade = self.current.as_ref().is_some_and(|r| r.is_active() || r.is_cancelled());
        info!(%plan, upgrade, "submitting payment");

        let result = if upgrade {
            self.backend.upgrade(&self.session, &request).await
        } else {
            self.backend.create(&self.session, &request).await
        };

        self.complete_payment(ticket, plan, result);
        Ok(())
    }

    /// Applies the response of a [`Operation::SubmitPayment`] call.
    pub fn complete_payment(
        &mut self,
        ticket: RequestTicket,
        plan: PlanId,
        result: Result<ApiOutcome>,
    ) {
        if !self.accept(ticket) {
            return;
        }

        match result {
            Ok(ApiOutcome::Ok { data, .. }) => {
                info!(%plan, "payment confirmed");
                self.apply_confirmed(plan, data);
                self.step = Step::Viewing;
            }
            Ok(outcome) => {
                self.error = Some(
                    outcome
                        .message()
                        .map_or_else(|| PROCESS_FAILED_MESSAGE.to_owned(), str::to_owned),
                );
            }
            Err(e) => {
                self.error = Some(format!("Error processing payment: {e}"));
            }
        }
    }

    fn apply_confirmed(&mut self, plan: PlanId, data: Option<Value>) {
        self.current = match data.clone().map(SubscriptionRecord::from_value) {
            Some(Ok(record)) => Some(record),
            Some(Err(e)) => {
                warn!(error = %e, "confirmed subscription payload could not be decoded");
                None
            }
            None => None,
        };
        self.navigation = Some(Navigation { plan, subscription_data: data });
    }

    // ------------------------------------------------------------------------
    // Cancel / reactivate
    // ------------------------------------------------------------------------

    /// Cancels the subscription at the end of the paid period.
    ///
    /// On success the cached record is marked cancelled locally until the next
    /// [`refresh`](Self::refresh).
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidInput`] without a cached subscription
    /// - [`ClientError::RequestInFlight`] while another call is outstanding
    #[instrument(skip(self), fields(uid = self.session.uid()))]
    pub async fn cancel(&mut self) -> Result<()> {
        if self.current.is_none() {
            return Err(ClientError::InvalidInput("no subscription to cancel".to_owned()));
        }
        let ticket = self.begin_request(Operation::Cancel)?;
        let result = self.backend.cancel(&self.session).await;
        self.complete_cancel(ticket, result);
        Ok(())
    }

    /// Applies the response of a [`Operation::Cancel`] call.
    pub fn complete_cancel(&mut self, ticket: RequestTicket, result: Result<ApiOutcome>) {
        if !self.accept(ticket) {
            return;
        }

        match result {
            Ok(ApiOutcome::Ok { .. }) => {
                info!("cancellation confirmed");
                if let Some(record) = self.current.as_mut() {
                    record.status = SubscriptionStatus::Cancelled;
                    record.cancelled_at = Some(now_iso8601());
                }
            }
            Ok(outcome) => {
                self.error = Some(
                    outcome
                        .message()
                        .map_or_else(|| CANCEL_FAILED_MESSAGE.to_owned(), str::to_owned),
                );
            }
            Err(e) => {
                self.error = Some(format!("Error cancelling membership: {e}"));
            }
        }
    }

    /// Reactivates a cancelled subscription on `plan`.
    ///
    /// Clears any previous error first. On success the cached record is marked active
    /// locally and an informational message is set.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::RequestInFlight`] while another call is outstanding.
    #[instrument(skip(self), fields(uid = self.session.uid()))]
    pub async fn reactivate(&mut self, plan: PlanId) -> Result<()> {
        let ticket = self.begin_request(Operation::Reactivate)?;
        self.error = None;
        let result = self.backend.reactivate(&self.session, plan).await;
        self.complete_reactivate(ticket, result);
        Ok(())
    }

    /// Applies the response of a [`Operation::Reactivate`] call.
    pub fn complete_reactivate(&mut self, ticket: RequestTicket, result: Result<ApiOutcome>) {
        if !self.accept(ticket) {
            return;
        }

        match result {
            Ok(ApiOutcome::Ok { .. }) => {
                info!("reactivation confirmed");
                if let Some(record) = self.current.as_mut() {
                    record.status = SubscriptionStatus::Active;
                    record.cancelled_at = None;
                    record.reactivated_at = Some(now_iso8601());
                }
                self.info = Some(REACTIVATED_MESSAGE.to_owned());
            }
            Ok(outcome) => {
                self.error = Some(
                    outcome
                        .message()
                        .map_or_else(|| REACTIVATE_FAILED_MESSAGE.to_owned(), str::to_owned),
                );
            }
            Err(e) => {
                self.error = Some(format!("Error reactivating subscription: {e}"));
            }
        }
    }
}

fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, sync::Mutex};

    use serde_json::json;

    use super::*;
    use crate::api::WarningPayload;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Current,
        Create(Value),
        Upgrade(Value),
        Cancel,
        Reactivate(PlanId),
        Coupon(String),
    }

    /// Scripted backend that records every call.
    #[derive(Debug, Default)]
    struct FakeBackend {
        current: Mutex<VecDeque<Result<Option<SubscriptionRecord>>>>,
        outcomes: Mutex<VecDeque<Result<ApiOutcome>>>,
        coupons: Mutex<VecDeque<Result<CouponValidation>>>,
        calls: Mutex<Vec<Call>>,
    }

    impl FakeBackend {
        fn with_current(self, result: Result<Option<SubscriptionRecord>>) -> Self {
            self.current.lock().unwrap().push_back(result);
            self
        }

        fn with_outcome(self, result: Result<ApiOutcome>) -> Self {
            self.outcomes.lock().unwrap().push_back(result);
            self
        }

        fn with_coupon(self, result: Result<CouponValidation>) -> Self {
            self.coupons.lock().unwrap().push_back(result);
            self
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn next_outcome(&self) -> Result<ApiOutcome> {
            self.outcomes.lock().unwrap().pop_front().unwrap_or_else(|| Ok(ok(None)))
        }
    }

    impl SubscriptionBackend for FakeBackend {
        async fn current<'a>(
            &'a self,
            _session: &'a Session,
        ) -> Result<Option<SubscriptionRecord>> {
            self.record(Call::Current);
            self.current.lock().unwrap().pop_front().unwrap_or(Ok(None))
        }

        async fn create<'a>(
            &'a self,
            _session: &'a Session,
            request: &'a SubscriptionRequest,
        ) -> Result<ApiOutcome> {
            self.record(Call::Create(serde_json::to_value(request).unwrap()));
            self.next_outcome()
        }

        async fn upgrade<'a>(
            &'a self,
            _session: &'a Session,
            request: &'a SubscriptionRequest,
        ) -> Result<ApiOutcome> {
            self.record(Call::Upgrade(serde_json::to_value(request).unwrap()));
            self.next_outcome()
        }

        async fn cancel<'a>(&'a self, _session: &'a Session) -> Result<ApiOutcome> {
            self.record(Call::Cancel);
            self.next_outcome()
        }

        async fn reactivate<'a>(
            &'a self,
            _session: &'a Session,
            plan: PlanId,
        ) -> Result<ApiOutcome> {
            self.record(Call::Reactivate(plan));
            self.next_outcome()
        }

        async fn validate_coupon<'a>(&'a self, promo_code: &'a str) -> Result<CouponValidation> {
            self.record(Call::Coupon(promo_code.to_owned()));
            self.coupons.lock().unwrap().pop_front().unwrap_or_else(|| {
                Err(ClientError::InvalidResponse("no coupon scripted".to_owned()))
            })
        }
    }

    fn ok(data: Option<Value>) -> ApiOutcome {
        ApiOutcome::Ok { message: None, data }
    }

    fn session() -> Session {
        Session::new("user_123", "token").unwrap()
    }

    fn record(plan: PlanId, status: SubscriptionStatus) -> SubscriptionRecord {
        SubscriptionRecord::new(plan, status)
    }

    fn vm(backend: FakeBackend) -> SubscriptionViewModel<FakeBackend> {
        SubscriptionViewModel::new(backend, session())
    }

    fn vm_with(
        backend: FakeBackend,
        subscription: SubscriptionRecord,
    ) -> SubscriptionViewModel<FakeBackend> {
        SubscriptionViewModel::with_subscription(backend, session(), subscription)
    }

    // ========================================================================
    // Load Tests
    // ========================================================================

    #[tokio::test]
    async fn test_load_without_subscription_selects_plan() {
        let mut vm = vm(FakeBackend::default().with_current(Ok(None)));
        vm.load().await.unwrap();

        assert_eq!(vm.step(), Step::Selecting);
        assert_eq!(vm.screen(), Screen::PlanSelection);
        assert!(vm.current_subscription().is_none());
        assert!(!vm.is_loading());
    }

    #[tokio::test]
    async fn test_load_with_subscription_views_it() {
        let backend = FakeBackend::default()
            .with_current(Ok(Some(record(PlanId::Elevate, SubscriptionStatus::Active))));
        let mut vm = vm(backend);
        vm.load().await.unwrap();

        assert_eq!(vm.step(), Step::Viewing);
        assert_eq!(vm.screen(), Screen::Membership);
        assert_eq!(vm.available_actions(), vec![Action::ChangePlan, Action::CancelMembership]);
    }

    #[tokio::test]
    async fn test_load_failure_treated_as_no_subscription() {
        let backend = FakeBackend::default()
            .with_current(Err(ClientError::Status { status: 500, message: "boom".to_owned() }));
        let mut vm = vm(backend);
        vm.load().await.unwrap();

        assert_eq!(vm.step(), Step::Selecting);
        assert!(vm.error().is_none());
    }

    // ========================================================================
    // Plan Selection Tests
    // ========================================================================

    #[tokio::test]
    async fn test_select_paid_plan_moves_to_payment_without_request() {
        let mut vm = vm(FakeBackend::default());
        vm.select_plan(PlanId::Unlimited).await.unwrap();

        assert_eq!(vm.step(), Step::Paying);
        assert_eq!(vm.selected_plan(), Some(PlanId::Unlimited));
        assert!(vm.backend().calls().is_empty());
    }

    #[tokio::test]
    async fn test_select_current_plan_is_ignored() {
        let mut vm =
            vm_with(FakeBackend::default(), record(PlanId::Elevate, SubscriptionStatus::Active));
        vm.request_plan_change();
        vm.select_plan(PlanId::Elevate).await.unwrap();

        assert_eq!(vm.step(), Step::Selecting);
        assert!(vm.selected_plan().is_none());
        assert!(vm.backend().calls().is_empty());
    }

    #[tokio::test]
    async fn test_select_scheduled_plan_shows_info() {
        let mut subscription = record(PlanId::Unlimited, SubscriptionStatus::Active);
        subscription.scheduled_plan_change = Some("elevate".to_owned());
        subscription.scheduled_change_date = Some("2025-03-01T00:00:00Z".to_owned());
        let mut vm = vm_with(FakeBackend::default(), subscription);
        vm.request_plan_change();

        vm.select_plan(PlanId::Elevate).await.unwrap();

        assert_eq!(
            vm.info(),
            Some("You already have a scheduled downgrade to Elevate plan on March 1, 2025.")
        );
        assert_eq!(vm.step(), Step::Selecting);
        assert!(vm.backend().calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_plan_can_be_selected_again() {
        let mut vm =
            vm_with(FakeBackend::default(), record(PlanId::Elevate, SubscriptionStatus::Cancelled));
        vm.request_plan_change();
        vm.select_plan(PlanId::Elevate).await.unwrap();
        assert_eq!(vm.step(), Step::Paying);
    }

    #[test]
    fn test_plan_selection_view_flags() {
        let mut subscription = record(PlanId::Unlimited, SubscriptionStatus::Active);
        subscription.scheduled_plan_change = Some("free".to_owned());
        let vm = vm_with(FakeBackend::default(), subscription);

        let view = vm.plan_selection_view();
        assert_eq!(view.len(), 3);
        assert!(view[0].is_scheduled && !view[0].is_current);
        assert!(!view[1].is_current && !view[1].is_scheduled);
        assert!(view[2].is_current);
        assert!(!view[2].is_selectable());
    }

    #[test]
    fn test_plan_selection_view_ignores_cancelled_subscription() {
        let subscription = record(PlanId::Unlimited, SubscriptionStatus::Cancelled);
        let vm = vm_with(FakeBackend::default(), subscription);
        assert!(vm.plan_selection_view().iter().all(PlanOption::is_selectable));
    }

    #[tokio::test]
    async fn test_back_to_plans() {
        let mut vm = vm(FakeBackend::default());
        vm.select_plan(PlanId::Elevate).await.unwrap();
        vm.back_to_plans();
        assert_eq!(vm.step(), Step::Selecting);
    }

    // ========================================================================
    // Free Plan Tests
    // ========================================================================

    #[tokio::test]
    async fn test_free_plan_without_subscription_uses_create() {
        let data = json!({"plan_name": "free", "status": "active", "price": 0});
        let backend = FakeBackend::default().with_outcome(Ok(ok(Some(data.clone()))));
        let mut vm = vm(backend);

        vm.select_plan(PlanId::Free).await.unwrap();

        assert_eq!(vm.backend().calls(), vec![Call::Create(json!({"plan_name": "free"}))]);
        let nav = vm.navigation().unwrap();
        assert_eq!(nav.plan, PlanId::Free);
        assert_eq!(nav.subscription_data, Some(data));
        assert_eq!(vm.current_subscription().unwrap().plan_id(), Some(PlanId::Free));
        assert!(vm.error().is_none());
    }

    #[tokio::test]
    async fn test_free_plan_from_active_paid_uses_downgrade() {
        let mut vm =
            vm_with(FakeBackend::default(), record(PlanId::Unlimited, SubscriptionStatus::Active));
        vm.request_plan_change();
        vm.select_plan(PlanId::Free).await.unwrap();

        assert_eq!(
            vm.backend().calls(),
            vec![Call::Upgrade(json!({"plan_name": "free", "force_downgrade": false}))]
        );
    }

    #[tokio::test]
    async fn test_free_plan_from_cancelled_paid_uses_create() {
        let mut vm =
            vm_with(FakeBackend::default(), record(PlanId::Elevate, SubscriptionStatus::Cancelled));
        vm.submit_free_plan(PlanId::Free, false).await.unwrap();
        assert_eq!(vm.backend().calls(), vec![Call::Create(json!({"plan_name": "free"}))]);
    }

    #[tokio::test]
    async fn test_free_plan_warning_then_confirm() {
        let warning = ApiOutcome::Warning(WarningPayload {
            message: Some("You have a scheduled change".to_owned()),
            existing_scheduled_plan: Some("elevate".to_owned()),
            scheduled_date: Some("2025-01-31".to_owned()),
        });
        let backend = FakeBackend::default().with_outcome(Ok(warning)).with_outcome(Ok(ok(None)));
        let mut vm = vm_with(backend, record(PlanId::Unlimited, SubscriptionStatus::Active));

        vm.submit_free_plan(PlanId::Free, false).await.unwrap();
        let pending = vm.pending_warning().unwrap();
        assert_eq!(pending.plan, PlanId::Free);
        assert_eq!(pending.existing_plan.as_deref(), Some("elevate"));
        assert!(vm.navigation().is_none());

        vm.confirm_warning().await.unwrap();
        assert!(vm.pending_warning().is_none());
        assert_eq!(
            vm.backend().calls(),
            vec![
                Call::Upgrade(json!({"plan_name": "free", "force_downgrade": false})),
                Call::Upgrade(json!({"plan_name": "free", "force_downgrade": true})),
            ]
        );
        assert_eq!(vm.navigation().unwrap().plan, PlanId::Free);
    }

    #[tokio::test]
    async fn test_confirm_without_warning_is_noop() {
        let mut vm = vm(FakeBackend::default());
        vm.confirm_warning().await.unwrap();
        assert!(vm.backend().calls().is_empty());
    }

    #[tokio::test]
    async fn test_dismiss_warning_sends_nothing() {
        let warning = ApiOutcome::Warning(WarningPayload::default());
        let backend = FakeBackend::default().with_outcome(Ok(warning));
        let mut vm = vm_with(backend, record(PlanId::Unlimited, SubscriptionStatus::Active));

        vm.submit_free_plan(PlanId::Free, false).await.unwrap();
        vm.dismiss_warning();

        assert!(vm.pending_warning().is_none());
        assert_eq!(vm.backend().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_free_plan_already_subscribed_message() {
        let outcome = ApiOutcome::Ok {
            message: Some("User already has an active subscription".to_owned()),
            data: Some(json!({"plan_name": "unlimited", "status": "active"})),
        };
        let mut vm = vm(FakeBackend::default().with_outcome(Ok(outcome)));

        vm.select_plan(PlanId::Free).await.unwrap();

        assert_eq!(
            vm.error(),
            Some(
                "You currently have an active unlimited plan. Please cancel your current \
                 membership first before switching to the free plan."
            )
        );
        assert_eq!(vm.screen(), Screen::Error);
        assert!(vm.navigation().is_none());
    }

    #[tokio::test]
    async fn test_already_subscribed_reads_subscription_plan_over_cache() {
        let outcome = ApiOutcome::decode(json!({
            "status": "ok",
            "message": "User already has an active subscription",
            "data": {},
            "subscription": {"plan_name": "unlimited", "status": "active"}
        }))
        .unwrap();
        let backend = FakeBackend::default().with_outcome(Ok(outcome));
        let mut vm = vm_with(backend, record(PlanId::Elevate, SubscriptionStatus::Active));

        vm.submit_free_plan(PlanId::Free, false).await.unwrap();

        assert!(vm.error().is_some_and(|e| e.contains("active unlimited plan")));
        assert_eq!(
            vm.current_subscription().and_then(SubscriptionRecord::plan_id),
            Some(PlanId::Elevate)
        );
    }

    #[tokio::test]
    async fn test_free_plan_error_outcome() {
        let backend = FakeBackend::default()
            .with_outcome(Ok(ApiOutcome::Error { message: None }))
            .with_outcome(Err(ClientError::Status {
                status: 502,
                message: "bad gateway".to_owned(),
            }));
        let mut vm = vm(backend);

        vm.submit_free_plan(PlanId::Free, false).await.unwrap();
        assert_eq!(vm.error(), Some(PROCESS_FAILED_MESSAGE));

        vm.dismiss_error();
        vm.submit_free_plan(PlanId::Free, false).await.unwrap();
        assert_eq!(
            vm.error(),
            Some("Error processing membership: Request failed with status 502: bad gateway")
        );
    }

    #[tokio::test]
    async fn test_submit_free_plan_rejects_paid_plan() {
        let mut vm = vm(FakeBackend::default());
        let err = vm.submit_free_plan(PlanId::Elevate, false).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput(_)));
    }

    // ========================================================================
    // Payment Tests
    // ========================================================================

    #[tokio::test]
    async fn test_payment_requires_selected_plan() {
        let mut vm = vm(FakeBackend::default());
        let err = vm.submit_payment("pm_123", None).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput(_)));
        assert!(vm.backend().calls().is_empty());
    }

    #[tokio::test]
    async fn test_payment_requires_method_reference() {
        let mut vm = vm(FakeBackend::default());
        vm.select_plan(PlanId::Elevate).await.unwrap();
        let err = vm.submit_payment("  ", None).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_new_payment_uses_create_and_views_subscription() {
        let data = json!({"plan_name": "elevate", "status": "active", "price": 9});
        let mut vm = vm(FakeBackend::default().with_outcome(Ok(ok(Some(data)))));

        vm.select_plan(PlanId::Elevate).await.unwrap();
        vm.submit_payment("pm_123", Some("SAVE10")).await.unwrap();

        assert_eq!(
            vm.backend().calls(),
            vec![Call::Create(json!({
                "plan_name": "elevate",
                "payment_method_id": "pm_123",
                "promo_code": "SAVE10"
            }))]
        );
        assert_eq!(vm.step(), Step::Viewing);
        assert_eq!(vm.navigation().unwrap().plan, PlanId::Elevate);
        assert!(vm.current_subscription().unwrap().is_active_paid());
    }

    #[tokio::test]
    async fn test_payment_with_existing_subscription_uses_upgrade() {
        let mut vm =
            vm_with(FakeBackend::default(), record(PlanId::Elevate, SubscriptionStatus::Cancelled));
        vm.request_plan_change();
        vm.select_plan(PlanId::Unlimited).await.unwrap();
        vm.submit_payment("pm_123", None).await.unwrap();

        assert_eq!(
            vm.backend().calls(),
            vec![Call::Upgrade(json!({"plan_name": "unlimited", "payment_method_id": "pm_123"}))]
        );
    }

    #[tokio::test]
    async fn test_payment_sends_validated_promo_code() {
        let coupon = CouponValidation {
            valid: true,
            discount_type: Some(crate::api::DiscountType::Percent),
            discount_value: Some(rust_decimal::Decimal::from(20)),
            display_text: Some("20% off".to_owned()),
            message: None,
        };
        let mut vm = vm(FakeBackend::default().with_coupon(Ok(coupon)));

        vm.select_plan(PlanId::Unlimited).await.unwrap();
        vm.edit_promo_code("SAVE20");
        vm.validate_promo_code().await.unwrap();
        vm.submit_payment("pm_123", None).await.unwrap();

        let calls = vm.backend().calls();
        assert_eq!(calls[0], Call::Coupon("SAVE20".to_owned()));
        assert_eq!(
            calls[1],
            Call::Create(json!({
                "plan_name": "unlimited",
                "payment_method_id": "pm_123",
                "promo_code": "SAVE20"
            }))
        );
    }

    #[tokio::test]
    async fn test_payment_failure_stays_on_payment() {
        let backend = FakeBackend::default()
            .with_outcome(Ok(ApiOutcome::Error { message: Some("Card declined".to_owned()) }));
        let mut vm = vm(backend);
        vm.select_plan(PlanId::Elevate).await.unwrap();
        vm.submit_payment("pm_123", None).await.unwrap();

        assert_eq!(vm.error(), Some("Card declined"));
        assert_eq!(vm.step(), Step::Paying);
        assert!(vm.navigation().is_none());

        vm.dismiss_error();
        assert_eq!(vm.screen(), Screen::Payment);
    }

    #[tokio::test]
    async fn test_payment_transport_error() {
        let backend = FakeBackend::default()
            .with_outcome(Err(ClientError::InvalidResponse("Invalid JSON response".to_owned())));
        let mut vm = vm(backend);
        vm.select_plan(PlanId::Elevate).await.unwrap();
        vm.submit_payment("pm_123", None).await.unwrap();

        assert_eq!(vm.error(), Some("Error processing payment: Invalid JSON response"));
    }

    // ========================================================================
    // Cancel / Reactivate Tests
    // ========================================================================

    #[tokio::test]
    async fn test_cancel_marks_cancelled_locally() {
        let mut vm =
            vm_with(FakeBackend::default(), record(PlanId::Elevate, SubscriptionStatus::Active));
        vm.cancel().await.unwrap();

        let current = vm.current_subscription().unwrap();
        assert!(current.is_cancelled());
        assert!(current.cancelled_at.is_some());
        assert_eq!(vm.available_actions(), vec![Action::Reactivate, Action::SwitchPlan]);
    }

    #[tokio::test]
    async fn test_cancel_failure_keeps_state() {
        let backend = FakeBackend::default().with_outcome(Ok(ApiOutcome::Error { message: None }));
        let mut vm = vm_with(backend, record(PlanId::Elevate, SubscriptionStatus::Active));
        vm.cancel().await.unwrap();

        assert_eq!(vm.error(), Some(CANCEL_FAILED_MESSAGE));
        assert!(vm.current_subscription().unwrap().is_active());
    }

    #[tokio::test]
    async fn test_cancel_without_subscription_rejected() {
        let mut vm = vm(FakeBackend::default());
        assert!(matches!(vm.cancel().await, Err(ClientError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_reactivate_marks_active_locally() {
        let mut cancelled = record(PlanId::Elevate, SubscriptionStatus::Cancelled);
        cancelled.cancelled_at = Some("2025-01-01T00:00:00.000Z".to_owned());
        let mut vm = vm_with(FakeBackend::default(), cancelled);
        let ticket = vm.begin_request(Operation::Cancel).unwrap();
        vm.complete_cancel(ticket, Ok(ApiOutcome::Error { message: Some("stale".to_owned()) }));
        assert!(vm.error().is_some());

        vm.reactivate(PlanId::Elevate).await.unwrap();

        let current = vm.current_subscription().unwrap();
        assert!(current.is_active());
        assert!(current.cancelled_at.is_none());
        assert!(current.reactivated_at.is_some());
        assert!(vm.error().is_none());
        assert_eq!(vm.info(), Some(REACTIVATED_MESSAGE));
        assert_eq!(vm.backend().calls(), vec![Call::Reactivate(PlanId::Elevate)]);
    }

    #[tokio::test]
    async fn test_reactivate_failure() {
        let backend = FakeBackend::default()
            .with_outcome(Err(ClientError::Status {
                status: 404,
                message: "Not found".to_owned(),
            }));
        let mut vm = vm_with(backend, record(PlanId::Elevate, SubscriptionStatus::Cancelled));
        vm.reactivate(PlanId::Elevate).await.unwrap();

        assert_eq!(
            vm.error(),
            Some("Error reactivating subscription: Request failed with status 404: Not found")
        );
        assert!(vm.current_subscription().unwrap().is_cancelled());
    }

    #[tokio::test]
    async fn test_refresh_overwrites_optimistic_state() {
        let server = record(PlanId::Free, SubscriptionStatus::Active);
        let backend = FakeBackend::default().with_current(Ok(Some(server.clone())));
        let mut vm = vm_with(backend, record(PlanId::Elevate, SubscriptionStatus::Active));
        vm.cancel().await.unwrap();

        vm.refresh().await.unwrap();
        assert_eq!(vm.current_subscription(), Some(&server));
    }

    // ========================================================================
    // Available Actions Tests
    // ========================================================================

    #[test]
    fn test_actions_active_free() {
        let vm = vm_with(FakeBackend::default(), record(PlanId::Free, SubscriptionStatus::Active));
        assert_eq!(vm.available_actions(), vec![Action::ChangePlan, Action::OpenApp]);
    }

    #[test]
    fn test_actions_cancelled_with_scheduled_change() {
        let mut subscription = record(PlanId::Unlimited, SubscriptionStatus::Cancelled);
        subscription.scheduled_plan_change = Some("elevate".to_owned());
        let vm = vm_with(FakeBackend::default(), subscription);
        assert_eq!(vm.available_actions(), vec![Action::ChangeScheduledPlan]);
    }

    #[test]
    fn test_actions_paid_judged_by_price() {
        let mut subscription = record(PlanId::Free, SubscriptionStatus::Active);
        subscription.price = Some(rust_decimal::Decimal::from(5));
        let vm = vm_with(FakeBackend::default(), subscription);
        assert_eq!(vm.available_actions(), vec![Action::ChangePlan, Action::CancelMembership]);
    }

    #[test]
    fn test_actions_unknown_status() {
        let vm = vm_with(
            FakeBackend::default(),
            record(PlanId::Elevate, SubscriptionStatus::Other("past_due".to_owned())),
        );
        assert!(vm.available_actions().is_empty());
    }

    // ========================================================================
    // Ticket Tests
    // ========================================================================

    #[test]
    fn test_duplicate_submission_rejected() {
        let mut vm = vm(FakeBackend::default());
        let ticket = vm.begin_request(Operation::SubmitPayment).unwrap();
        assert!(vm.is_loading());
        assert!(matches!(vm.begin_request(Operation::Cancel), Err(ClientError::RequestInFlight)));

        vm.complete_payment(ticket, PlanId::Elevate, Ok(ok(None)));
        assert!(!vm.is_loading());
    }

    #[tokio::test]
    async fn test_async_call_rejected_while_in_flight() {
        let mut vm =
            vm_with(FakeBackend::default(), record(PlanId::Elevate, SubscriptionStatus::Active));
        let _ticket = vm.begin_request(Operation::Load).unwrap();

        assert!(matches!(vm.cancel().await, Err(ClientError::RequestInFlight)));
        assert!(vm.backend().calls().is_empty());
    }

    #[test]
    fn test_stale_response_discarded() {
        let mut vm = vm(FakeBackend::default());
        let first = vm.begin_request(Operation::Load).unwrap();
        vm.abandon_request(first);
        let second = vm.begin_request(Operation::Load).unwrap();

        let fresh = record(PlanId::Unlimited, SubscriptionStatus::Active);
        vm.complete_load(second, Ok(Some(fresh.clone())));
        vm.complete_load(first, Ok(None));

        assert_eq!(vm.current_subscription(), Some(&fresh));
        assert_eq!(vm.step(), Step::Viewing);
        assert!(!vm.is_loading());
    }

    #[test]
    fn test_abandon_other_ticket_keeps_loading() {
        let mut vm = vm(FakeBackend::default());
        let first = vm.begin_request(Operation::Refresh).unwrap();
        vm.abandon_request(first);
        let second = vm.begin_request(Operation::Refresh).unwrap();
        vm.abandon_request(first);

        assert!(vm.is_loading());
        assert_eq!(second.generation(), first.generation() + 1);
    }
}
