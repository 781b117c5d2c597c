//! Membership CLI - manage a membership subscription from the terminal
//!
//! Logs in against the membership backend, shows the current plan and drives plan
//! changes, cancellation and reactivation through the subscription view-model.
//!
//! The session is persisted to `membership-session.json` (see `--session-file`) so
//! that subsequent invocations stay logged in. Logs go to stderr; `RUST_LOG` and
//! `LOG_FORMAT` control them.

#![allow(
    clippy::multiple_crate_versions,
    reason = "transitive dependencies from reqwest, clap and tracing-subscriber"
)]

mod cli;
mod commands;
mod health;
mod observability;

use std::process::ExitCode;

use clap::Parser;

use crate::{
    cli::Cli,
    observability::{LogFormat, init_logging},
};

#[tokio::main]
async fn main() -> ExitCode {
    init_logging(LogFormat::from_env());
    let cli = Cli::parse();

    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
