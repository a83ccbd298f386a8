//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the appropriate
//! action, such as starting the portal server with its full configuration
//! state.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{mail, model};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let users_file = matches
        .get_one::<String>("users-file")
        .map(PathBuf::from)
        .context("missing required argument: --users-file")?;
    let secure_cookies = matches.get_flag("secure-cookies");

    let mail_opts = mail::Options::parse(matches)?;
    let model_opts = model::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        users_file,
        secure_cookies,
        mail_relay_url: mail_opts.relay_url,
        mail_relay_user: mail_opts.relay_user,
        mail_relay_password: mail_opts.relay_password,
        mail_from: mail_opts.from,
        mail_timeout_seconds: mail_opts.timeout_seconds,
        model_url: model_opts.url,
        model_input_width: model_opts.input_width,
        model_input_height: model_opts.input_height,
        model_threshold: model_opts.threshold,
        model_timeout_seconds: model_opts.timeout_seconds,
    }))
}
