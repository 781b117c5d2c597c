//! Membership plans and the subscription lifecycle.
//!
//! - [`models`]: plan catalog and the subscription record mirror
//! - [`promo`]: checkout promotional code state and discount arithmetic
//! - [`backend`]: the [`SubscriptionBackend`] seam over the subscription endpoints
//! - [`view_model`]: the [`SubscriptionViewModel`] state machine

pub mod backend;
pub mod models;
pub mod promo;
pub mod view_model;

pub use backend::SubscriptionBackend;
pub use models::{
    Plan, PlanId, SubscriptionRecord, SubscriptionStatus, catalog, format_display_date,
};
pub use promo::{PromoState, PromoStatus, apply_discount};
pub use view_model::{
    Action, Navigation, Operation, PendingWarning, PlanOption, RequestTicket, Screen, Step,
    SubscriptionViewModel,
};
