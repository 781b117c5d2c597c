//! Typed client for the membership backend.
//!
//! The backend speaks JSON over HTTP(S) under a `/v1` prefix. [`ApiClient`] wraps a
//! pooled [`reqwest::Client`]; endpoint groups add methods to it from their own modules:
//!
//! - [`auth`]: login, deep-link token verification, password reset
//! - [`subscriptions`]: current, create, upgrade/downgrade, cancel, reactivate
//! - [`payment`]: saved payment methods and setup intents
//! - [`coupons`]: promotional code validation
//!
//! Responses of mutating subscription calls are decoded once into [`ApiOutcome`].

pub mod auth;
pub mod coupons;
pub mod endpoints;
pub mod envelope;
pub mod http;
pub mod payment;
pub mod subscriptions;

pub use auth::ResetTokenStatus;
pub use coupons::{CouponValidation, DiscountType};
pub use envelope::{ApiOutcome, WarningPayload};
pub use http::ApiClient;
pub use payment::{PaymentMethod, SetupIntent};
pub use subscriptions::SubscriptionRequest;
