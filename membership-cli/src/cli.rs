//! Command-line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use membership_client::subscription::PlanId;

/// Default location of the persisted session.
pub const DEFAULT_SESSION_FILE: &str = "membership-session.json";

/// Manage a membership subscription from the terminal.
#[derive(Debug, Parser)]
#[command(name = "membership", version, about)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true, env = "MEMBERSHIP_CONFIG")]
    pub config: Option<PathBuf>,

    /// File the session is persisted to between invocations.
    #[arg(long, global = true, default_value = DEFAULT_SESSION_FILE)]
    pub session_file: PathBuf,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in with email and password and save the session.
    Login(LoginArgs),
    /// Forget the saved session.
    Logout,
    /// Adopt a session from a mobile-app deep-link token.
    VerifyToken {
        /// Deep-link token.
        #[arg(long, env = "MEMBERSHIP_TOKEN", hide_env_values = true)]
        token: String,
        /// User id the token was issued for.
        #[arg(long)]
        uid: String,
    },
    /// List the plans, marking the current and scheduled ones.
    Plans,
    /// Show the current subscription and the available actions.
    Status,
    /// Pick a plan; the free plan is applied immediately.
    Select {
        /// Plan name (free, elevate, unlimited).
        plan: PlanId,
    },
    /// Subscribe to a paid plan with a saved payment method.
    Pay {
        /// Plan name (elevate, unlimited).
        plan: PlanId,
        /// Stripe payment-method reference.
        #[arg(long)]
        payment_method: String,
        /// Promotional code, validated before paying.
        #[arg(long)]
        promo: Option<String>,
    },
    /// Switch to the free plan, replacing an already-scheduled change.
    ConfirmDowngrade {
        /// Plan name; only the free plan can be forced.
        #[arg(default_value = "free")]
        plan: PlanId,
    },
    /// Cancel at the end of the paid period.
    Cancel,
    /// Reactivate a cancelled subscription.
    Reactivate {
        /// Plan to keep.
        plan: PlanId,
    },
    /// Check a promotional code.
    Coupon {
        /// Promotional code.
        code: String,
        /// Show the discounted price of this plan.
        #[arg(long)]
        plan: Option<PlanId>,
    },
    /// List, remove or set the default saved payment method.
    PaymentMethods {
        /// Payment method to remove.
        #[arg(long, conflicts_with = "set_default")]
        remove: Option<String>,
        /// Payment method to make the default.
        #[arg(long)]
        set_default: Option<String>,
    },
    /// Create a setup intent and print its client secret.
    SetupIntent,
    /// Send a password reset email.
    ForgotPassword {
        /// Account email.
        #[arg(long)]
        email: String,
    },
    /// Set a new password with a reset token.
    ResetPassword(ResetPasswordArgs),
    /// Print a JSON health report.
    Health,
}

/// Arguments of `login`.
#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Account email.
    #[arg(long)]
    pub email: String,
    /// Account password.
    #[arg(long, env = "MEMBERSHIP_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Arguments of `reset-password`.
#[derive(Debug, Args)]
pub struct ResetPasswordArgs {
    /// Token from the reset email.
    #[arg(long)]
    pub token: String,
    /// New password.
    #[arg(long, env = "MEMBERSHIP_NEW_PASSWORD", hide_env_values = true)]
    pub password: String,
    /// New password again.
    #[arg(long, env = "MEMBERSHIP_CONFIRM_PASSWORD", hide_env_values = true)]
    pub confirm: String,
}
