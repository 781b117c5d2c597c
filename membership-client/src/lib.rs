//! Membership Client: typed access to the membership backend
//!
//! A Rust library for the membership subscription backend: authenticate a user,
//! inspect and change their plan (free, elevate, unlimited), manage saved payment
//! methods and validate promotional codes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │  UI / CLI                │  renders Step, Screen and Actions
//! └────────────┬─────────────┘
//!              │ select_plan, submit_payment, cancel, ...
//! ┌────────────▼─────────────┐
//! │  SubscriptionViewModel   │  lifecycle state machine (this crate)
//! └────────────┬─────────────┘
//!              │ SubscriptionBackend
//! ┌────────────▼─────────────┐
//! │  ApiClient               │  JSON over HTTPS, bearer credential
//! └────────────┬─────────────┘
//!              │
//! ┌────────────▼─────────────┐
//! │  Membership backend      │  owns billing and the subscription record
//! └──────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ## 1. Log In And Load The Subscription
//!
//! ```rust,no_run
//! use membership_client::{
//!     ApiClient, ClientConfig, SessionManager,
//!     subscription::{Step, SubscriptionViewModel},
//! };
//!
//! # async fn example() -> membership_client::Result<()> {
//! let config = ClientConfig::default().with_env_overrides()?;
//! let api = ApiClient::new(&config)?;
//!
//! let mut sessions = SessionManager::new();
//! let session = sessions.login(&api, "user@example.com", "hunter22").await?.clone();
//!
//! let mut vm = SubscriptionViewModel::new(api, session);
//! vm.load().await?;
//! if vm.step() == Step::Viewing {
//!     println!("actions: {:?}", vm.available_actions());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## 2. Subscribe To A Paid Plan
//!
//! ```rust,no_run
//! use membership_client::{
//!     ApiClient, Session,
//!     subscription::{PlanId, SubscriptionViewModel},
//! };
//!
//! # async fn example(api: ApiClient, session: Session) -> membership_client::Result<()> {
//! let mut vm = SubscriptionViewModel::new(api, session);
//! vm.load().await?;
//! vm.select_plan(PlanId::Elevate).await?;
//!
//! vm.edit_promo_code("SAVE20");
//! vm.validate_promo_code().await?;
//!
//! vm.submit_payment("pm_1Nv0", None).await?;
//! match vm.error() {
//!     Some(message) => eprintln!("{message}"),
//!     None => println!("subscribed: {:?}", vm.navigation()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`api`]: HTTP client and endpoint groups
//! - [`subscription`]: plan catalog, promo codes and the lifecycle view-model
//! - [`session`]: authenticated session and its persistence
//! - [`config`]: TOML and environment configuration
//! - [`error`]: Error types with recovery guidance
//!
//! # Error Handling
//!
//! Client operations return [`Result<T, ClientError>`](error::Result). The view-model
//! is different: application-level failures of a subscription change are reported
//! through [`SubscriptionViewModel::error`](subscription::SubscriptionViewModel::error)
//! and its async methods only fail for local reasons.
//!
//! ```rust
//! use membership_client::ClientError;
//!
//! fn describe(err: &ClientError) -> &'static str {
//!     match err {
//!         ClientError::Http(_) => "check your connection and try again",
//!         ClientError::Status { .. } | ClientError::Rejected(_) => "the server refused",
//!         ClientError::RequestInFlight => "please wait",
//!         _ => "something went wrong",
//!     }
//! }
//! # assert_eq!(describe(&ClientError::RequestInFlight), "please wait");
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![allow(
    clippy::multiple_crate_versions,
    reason = "transitive dependencies from reqwest and wiremock"
)]

pub mod api;
pub mod config;
pub mod error;
pub mod session;
pub mod subscription;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use session::{Session, SessionManager};
