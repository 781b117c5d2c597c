//! Command handlers.
//!
//! Each subcommand loads what it needs, drives the client or the view-model, and
//! prints a human-readable result to stdout. A refusal reported by the view-model
//! becomes a [`CliError::Refused`] so the process exits non-zero.

use std::path::{Path, PathBuf};

use membership_client::{
    ApiClient, ClientConfig, ClientError, Session, SessionManager,
    api::payment::default_method,
    subscription::{
        Action, PlanId, PlanOption, Step, SubscriptionRecord, SubscriptionViewModel,
        apply_discount, catalog, format_display_date,
        promo::{EMPTY_CODE_MESSAGE, INVALID_CODE_MESSAGE},
    },
};
use thiserror::Error;
use tracing::info;

use crate::{
    cli::{Cli, Command, LoginArgs, ResetPasswordArgs},
    health::{HealthReport, HealthStatus},
};

/// Errors that end a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Client or backend failure.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The backend or local rules refused the request.
    #[error("{0}")]
    Refused(String),

    /// Output could not be encoded.
    #[error("failed to encode output: {0}")]
    Output(#[from] serde_json::Error),

    /// At least one health check failed.
    #[error("health check failed")]
    Unhealthy,
}

/// Result type for command handlers.
pub type Result<T> = std::result::Result<T, CliError>;

/// Runs the parsed command line.
///
/// # Errors
///
/// Returns the first error that ends the command.
pub async fn run(cli: Cli) -> Result<()> {
    if matches!(cli.command, Command::Health) {
        return health(cli.config.as_deref(), &cli.session_file);
    }

    let config = load_config(cli.config.as_deref())?;
    let mut app = App::new(config, cli.session_file)?;
    app.dispatch(cli.command).await
}

fn load_config(path: Option<&Path>) -> std::result::Result<ClientConfig, ClientError> {
    let config = match path {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };
    let config = config.with_env_overrides()?;
    config.validate()?;
    Ok(config)
}

fn health(config_path: Option<&Path>, session_file: &Path) -> Result<()> {
    let config = load_config(config_path);
    let mut sessions = SessionManager::with_store(session_file);
    let session = sessions.load().map(|s| s.cloned());

    let report = HealthReport::collect(&config, &session);
    println!("{}", report.to_json()?);

    if report.status == HealthStatus::Unhealthy {
        return Err(CliError::Unhealthy);
    }
    Ok(())
}

struct App {
    config: ClientConfig,
    api: ApiClient,
    sessions: SessionManager,
}

impl App {
    fn new(config: ClientConfig, session_file: PathBuf) -> Result<Self> {
        let api = ApiClient::new(&config)?;
        Ok(Self { config, api, sessions: SessionManager::with_store(session_file) })
    }

    async fn dispatch(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Login(args) => self.login(args).await,
            Command::Logout => self.logout(),
            Command::VerifyToken { token, uid } => self.verify_token(&token, &uid).await,
            Command::Plans => self.plans().await,
            Command::Status => self.status().await,
            Command::Select { plan } => self.select(plan).await,
            Command::Pay { plan, payment_method, promo } => {
                self.pay(plan, &payment_method, promo.as_deref()).await
            }
            Command::ConfirmDowngrade { plan } => self.confirm_downgrade(plan).await,
            Command::Cancel => self.cancel().await,
            Command::Reactivate { plan } => self.reactivate(plan).await,
            Command::Coupon { code, plan } => self.coupon(&code, plan).await,
            Command::PaymentMethods { remove, set_default } => {
                self.payment_methods(remove.as_deref(), set_default.as_deref()).await
            }
            Command::SetupIntent => self.setup_intent().await,
            Command::ForgotPassword { email } => self.forgot_password(&email).await,
            Command::ResetPassword(args) => self.reset_password(args).await,
            Command::Health => Ok(()),
        }
    }

    // ------------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------------

    async fn login(&mut self, args: LoginArgs) -> Result<()> {
        let session = self.sessions.login(&self.api, &args.email, &args.password).await?;
        let uid = session.uid().to_owned();
        self.sessions.save()?;
        info!(%uid, "session saved");
        println!("Logged in as {} ({uid}).", args.email);
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        self.sessions.clear()?;
        println!("Logged out.");
        Ok(())
    }

    async fn verify_token(&mut self, token: &str, uid: &str) -> Result<()> {
        self.sessions.adopt_verified(&self.api, token, uid).await?;
        self.sessions.save()?;
        println!("Session verified for {uid}.");
        Ok(())
    }

    fn session(&mut self) -> Result<Session> {
        if self.sessions.current().is_none() {
            self.sessions.load()?;
        }
        Ok(self.sessions.require()?.clone())
    }

    async fn view_model(&mut self) -> Result<SubscriptionViewModel<ApiClient>> {
        let session = self.session()?;
        let mut vm = SubscriptionViewModel::new(self.api.clone(), session);
        vm.load().await?;
        Ok(vm)
    }

    // ------------------------------------------------------------------------
    // Subscription
    // ------------------------------------------------------------------------

    async fn plans(&mut self) -> Result<()> {
        if self.sessions.load()?.is_none() {
            for plan in catalog() {
                print_plan(&PlanOption { plan, is_current: false, is_scheduled: false });
            }
            return Ok(());
        }

        let vm = self.view_model().await?;
        for option in vm.plan_selection_view() {
            print_plan(&option);
        }
        Ok(())
    }

    async fn status(&mut self) -> Result<()> {
        let vm = self.view_model().await?;
        match vm.current_subscription() {
            Some(record) => {
                print_record(record);
                print_actions(&vm.available_actions(), record, &self.config);
            }
            None => println!("No membership yet. Run `membership plans` to choose one."),
        }
        Ok(())
    }

    async fn select(&mut self, plan: PlanId) -> Result<()> {
        let mut vm = self.view_model().await?;
        vm.request_plan_change();
        vm.select_plan(plan).await?;

        if let Some(info) = vm.info() {
            println!("{info}");
            return Ok(());
        }
        if vm.selected_plan().is_none() {
            println!("{} is already your current plan.", plan.display_name());
            return Ok(());
        }
        if let Some(warning) = vm.pending_warning() {
            println!("{}", warning.message.as_deref().unwrap_or("This change needs confirmation."));
            println!("Run `membership confirm-downgrade {plan}` to switch anyway.");
            return Ok(());
        }
        if vm.step() == Step::Paying {
            println!(
                "{} costs ${}/{}. Run `membership pay {plan} --payment-method <id>` to subscribe.",
                plan.display_name(),
                plan.plan().price,
                plan.plan().billing_period
            );
            return Ok(());
        }
        self.finish(&mut vm)
    }

    async fn pay(&mut self, plan: PlanId, payment_method: &str, promo: Option<&str>) -> Result<()> {
        if !plan.is_paid() {
            return Err(CliError::Refused(
                "The free plan needs no payment. Run `membership select free`.".to_owned(),
            ));
        }

        let mut vm = self.view_model().await?;
        vm.request_plan_change();
        vm.select_plan(plan).await?;
        if vm.step() != Step::Paying {
            let reason = vm.info().map_or_else(
                || format!("{} is already your current plan.", plan.display_name()),
                str::to_owned,
            );
            return Err(CliError::Refused(reason));
        }

        if let Some(code) = promo {
            vm.edit_promo_code(code);
            vm.validate_promo_code().await?;
            if let Some(error) = vm.promo().error() {
                return Err(CliError::Refused(error.to_owned()));
            }
            let price = plan.plan().price;
            println!(
                "Promotional code applied: ${} → ${}",
                price,
                vm.promo().discounted_price(price).round_dp(2)
            );
        }

        vm.submit_payment(payment_method, None).await?;
        self.finish(&mut vm)
    }

    async fn confirm_downgrade(&mut self, plan: PlanId) -> Result<()> {
        let mut vm = self.view_model().await?;
        vm.submit_free_plan(plan, true).await?;
        self.finish(&mut vm)
    }

    async fn cancel(&mut self) -> Result<()> {
        let mut vm = self.view_model().await?;
        vm.cancel().await?;
        self.finish(&mut vm)?;

        let expires = vm
            .current_subscription()
            .and_then(|r| r.expiration_date.as_deref())
            .map(format_display_date);
        match expires {
            Some(date) => println!("Membership cancelled. You keep access until {date}."),
            None => println!("Membership cancelled."),
        }
        Ok(())
    }

    async fn reactivate(&mut self, plan: PlanId) -> Result<()> {
        let mut vm = self.view_model().await?;
        vm.reactivate(plan).await?;
        self.finish(&mut vm)
    }

    fn finish(&self, vm: &mut SubscriptionViewModel<ApiClient>) -> Result<()> {
        if let Some(error) = vm.error() {
            return Err(CliError::Refused(error.to_owned()));
        }
        if let Some(info) = vm.info() {
            println!("{info}");
        }
        if let Some(navigation) = vm.take_navigation() {
            println!("Welcome to the {} plan!", navigation.plan.display_name());
            let link = self.config.success_deep_link(navigation.plan.as_str());
            println!("Return to the app: {link}");
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Coupons and payment
    // ------------------------------------------------------------------------

    async fn coupon(&self, code: &str, plan: Option<PlanId>) -> Result<()> {
        if code.trim().is_empty() {
            return Err(CliError::Refused(EMPTY_CODE_MESSAGE.to_owned()));
        }
        let coupon = self.api.validate_coupon(code).await?;
        if !coupon.valid {
            return Err(CliError::Refused(
                coupon.message.unwrap_or_else(|| INVALID_CODE_MESSAGE.to_owned()),
            ));
        }

        println!("{}", coupon.display_text.as_deref().unwrap_or("Promotional code is valid."));
        if let Some(plan) = plan {
            let price = plan.plan().price;
            println!(
                "{}: ${} → ${}",
                plan.display_name(),
                price,
                apply_discount(price, &coupon).round_dp(2)
            );
        }
        Ok(())
    }

    async fn payment_methods(
        &mut self,
        remove: Option<&str>,
        set_default: Option<&str>,
    ) -> Result<()> {
        let session = self.session()?;
        if let Some(id) = remove {
            self.api.remove_payment_method(&session, id).await?;
            println!("Removed {id}.");
        }
        if let Some(id) = set_default {
            self.api.set_default_payment_method(&session, id).await?;
            println!("{id} is now the default payment method.");
        }

        let methods = self.api.payment_methods(&session).await?;
        if methods.is_empty() {
            println!("No saved payment methods.");
            return Ok(());
        }
        let default_id = default_method(&methods).map(|m| m.id.as_str());
        for method in &methods {
            let marker = if Some(method.id.as_str()) == default_id { " (default)" } else { "" };
            println!("{}  {}{marker}", method.id, method.summary());
        }
        Ok(())
    }

    async fn setup_intent(&self) -> Result<()> {
        let intent = self.api.create_setup_intent().await?;
        println!("{}", intent.client_secret());
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Password reset
    // ------------------------------------------------------------------------

    async fn forgot_password(&self, email: &str) -> Result<()> {
        self.api.forgot_password(email).await?;
        println!("Password reset email sent to {email}.");
        Ok(())
    }

    async fn reset_password(&self, args: ResetPasswordArgs) -> Result<()> {
        let status = self.api.verify_reset_token(&args.token).await?;
        if !status.valid {
            return Err(CliError::Refused(
                status.message.unwrap_or_else(|| "Invalid or expired reset link".to_owned()),
            ));
        }
        self.api.reset_password(&args.token, &args.password, &args.confirm).await?;
        println!("Password updated. You can now log in.");
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Rendering
// ----------------------------------------------------------------------------

fn print_plan(option: &PlanOption) {
    let plan = option.plan;
    let marker = match (option.is_current, option.is_scheduled) {
        (true, _) => "  [current]",
        (false, true) => "  [scheduled]",
        (false, false) => "",
    };
    println!(
        "{:<10} ${}/{}  {}{marker}",
        plan.id.as_str(),
        plan.price,
        plan.billing_period,
        plan.hours
    );
    println!("           {}", plan.subtitle);
}

fn print_record(record: &SubscriptionRecord) {
    let plan = record.plan_id().map_or(record.plan_name.as_str(), |p| p.display_name());
    println!("Plan:    {plan}");
    println!("Status:  {}", record.status);
    if let Some(price) = record.price {
        println!("Price:   ${}/mo", price.normalize());
    }
    if let Some(date) = record.expiration_date.as_deref() {
        let label = if record.is_cancelled() { "Ends:" } else { "Renews:" };
        println!("{label:<8} {}", format_display_date(date));
    }
    if let Some(notice) = record.scheduled_change_notice() {
        println!("{notice}");
    }
}

fn print_actions(actions: &[Action], record: &SubscriptionRecord, config: &ClientConfig) {
    let plan = record.plan_name.as_str();
    for action in actions {
        let hint = match action {
            Action::ChangePlan | Action::SwitchPlan | Action::ChangeScheduledPlan => {
                "membership select <plan>".to_owned()
            }
            Action::CancelMembership => "membership cancel".to_owned(),
            Action::Reactivate => format!("membership reactivate {plan}"),
            Action::OpenApp => config.success_deep_link(plan),
        };
        println!("  {:<22} {hint}", action_label(*action));
    }
}

fn action_label(action: Action) -> &'static str {
    match action {
        Action::ChangePlan => "Change Plan",
        Action::CancelMembership => "Cancel Membership",
        Action::OpenApp => "Open App",
        Action::Reactivate => "Reactivate Membership",
        Action::SwitchPlan => "Switch to Different Plan",
        Action::ChangeScheduledPlan => "Change Scheduled Plan",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refused_display_is_verbatim() {
        let error = CliError::Refused("Card declined".to_owned());
        assert_eq!(error.to_string(), "Card declined");
    }

    #[test]
    fn test_client_error_is_transparent() {
        let error = CliError::from(ClientError::Session("not logged in".to_owned()));
        assert_eq!(error.to_string(), "Session error: not logged in");
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config(Some(Path::new("/nonexistent/membership.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_action_labels_distinct() {
        let labels = [
            Action::ChangePlan,
            Action::CancelMembership,
            Action::OpenApp,
            Action::Reactivate,
            Action::SwitchPlan,
            Action::ChangeScheduledPlan,
        ]
        .map(action_label);
        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), labels.len());
    }

    #[tokio::test]
    async fn test_status_requires_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut app =
            App::new(ClientConfig::default(), dir.path().join("membership-session.json")).unwrap();
        let err = app.dispatch(Command::Status).await.unwrap_err();
        assert!(matches!(err, CliError::Client(ClientError::Session(_))));
    }

    #[test]
    fn test_health_with_missing_session_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = health(None, &dir.path().join("membership-session.json"));
        assert!(result.is_ok());
    }
}
