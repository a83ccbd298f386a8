use anyhow::{Context, Result};
use clap::{Arg, Command};
use secrecy::SecretString;

pub const ARG_MAIL_RELAY_URL: &str = "mail-relay-url";
pub const ARG_MAIL_RELAY_USER: &str = "mail-relay-user";
pub const ARG_MAIL_RELAY_PASSWORD: &str = "mail-relay-password";
pub const ARG_MAIL_FROM: &str = "mail-from";
pub const ARG_MAIL_TIMEOUT_SECONDS: &str = "mail-timeout-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_MAIL_RELAY_URL)
                .long("mail-relay-url")
                .help("HTTP mail relay endpoint; OTP codes are logged when unset")
                .env("FOLIO_MAIL_RELAY_URL"),
        )
        .arg(
            Arg::new(ARG_MAIL_RELAY_USER)
                .long("mail-relay-user")
                .help("Mail relay basic auth user")
                .env("FOLIO_MAIL_RELAY_USER")
                .requires(ARG_MAIL_RELAY_URL),
        )
        .arg(
            Arg::new(ARG_MAIL_RELAY_PASSWORD)
                .long("mail-relay-password")
                .help("Mail relay basic auth password")
                .env("FOLIO_MAIL_RELAY_PASSWORD")
                .hide_env_values(true)
                .requires(ARG_MAIL_RELAY_USER),
        )
        .arg(
            Arg::new(ARG_MAIL_FROM)
                .long("mail-from")
                .help("From address on outgoing mail")
                .env("FOLIO_MAIL_FROM")
                .default_value("no-reply@folio.dev"),
        )
        .arg(
            Arg::new(ARG_MAIL_TIMEOUT_SECONDS)
                .long("mail-timeout-seconds")
                .help("Mail relay request timeout in seconds")
                .env("FOLIO_MAIL_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64)),
        )
}

pub struct Options {
    pub relay_url: Option<String>,
    pub relay_user: Option<String>,
    pub relay_password: Option<SecretString>,
    pub from: String,
    pub timeout_seconds: u64,
}

impl Options {
    /// # Errors
    /// Returns an error when defaulted arguments are missing from the matches.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        Ok(Self {
            relay_url: matches.get_one::<String>(ARG_MAIL_RELAY_URL).cloned(),
            relay_user: matches.get_one::<String>(ARG_MAIL_RELAY_USER).cloned(),
            relay_password: matches
                .get_one::<String>(ARG_MAIL_RELAY_PASSWORD)
                .cloned()
                .map(SecretString::from),
            from: matches
                .get_one::<String>(ARG_MAIL_FROM)
                .cloned()
                .context("missing required argument: --mail-from")?,
            timeout_seconds: matches
                .get_one::<u64>(ARG_MAIL_TIMEOUT_SECONDS)
                .copied()
                .context("missing required argument: --mail-timeout-seconds")?,
        })
    }
}
