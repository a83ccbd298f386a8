use crate::{
    api,
    classify::{Classifier, InputShape, remote::RemoteScorer},
    mail::{LogMailer, OtpMailer, relay::RelayMailer},
    session::SessionStore,
    store::file::FileStore,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub users_file: PathBuf,
    pub secure_cookies: bool,
    pub mail_relay_url: Option<String>,
    pub mail_relay_user: Option<String>,
    pub mail_relay_password: Option<SecretString>,
    pub mail_from: String,
    pub mail_timeout_seconds: u64,
    pub model_url: String,
    pub model_input_width: u32,
    pub model_input_height: u32,
    pub model_threshold: f32,
    pub model_timeout_seconds: u64,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the scoring endpoint cannot be reached or the server
/// fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let store = Arc::new(FileStore::new(args.users_file.clone()));

    let mailer: Arc<dyn OtpMailer> = if let Some(relay_url) = &args.mail_relay_url {
        let endpoint = Url::parse(relay_url).context("invalid FOLIO_MAIL_RELAY_URL")?;
        Arc::new(RelayMailer::new(
            endpoint,
            args.mail_from.clone(),
            args.mail_relay_user.clone(),
            args.mail_relay_password.clone(),
            Duration::from_secs(args.mail_timeout_seconds),
        )?)
    } else {
        warn!("mail relay not configured, OTP codes will be logged instead of emailed");
        Arc::new(LogMailer)
    };

    let model_url = Url::parse(&args.model_url).context("invalid FOLIO_MODEL_URL")?;

    // The model is a startup dependency: refuse to run without it.
    let scorer = RemoteScorer::connect(
        model_url,
        Duration::from_secs(args.model_timeout_seconds),
    )
    .await
    .context("Could not reach the scoring endpoint")?;

    let classifier = Classifier::new(
        Arc::new(scorer),
        InputShape {
            width: args.model_input_width,
            height: args.model_input_height,
        },
        args.model_threshold,
    );

    let sessions = Arc::new(SessionStore::new(args.secure_cookies));

    api::new(args.port, store, mailer, classifier, sessions).await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("users_file", args.users_file.display().to_string()),
        (
            "mail_relay_url",
            args.mail_relay_url
                .clone()
                .unwrap_or_else(|| "none (codes are logged)".to_string()),
        ),
        ("mail_from", args.mail_from.clone()),
        (
            "mail_relay_password_set",
            args.mail_relay_password.is_some().to_string(),
        ),
        ("model_url", args.model_url.clone()),
        (
            "model_input",
            format!("{}x{}", args.model_input_width, args.model_input_height),
        ),
        ("model_threshold", args.model_threshold.to_string()),
        ("secure_cookies", args.secure_cookies.to_string()),
    ];
    log_entries("Startup configuration", &entries);
}

fn log_entries(title: &str, entries: &[(&str, String)]) {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!("{}\n\n{title}:", folio_banner());
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn folio_banner() -> String {
    let short_hash = short_commit(crate::GIT_COMMIT_HASH);
    FOLIO_BANNER.replace(
        "{VERSION}",
        &format!(" - {} - {}", env!("CARGO_PKG_VERSION"), short_hash),
    )
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}

const FOLIO_BANNER: &str = r"
      _
    _/ \_
   \     /
   /_' '_\   F O L I O {VERSION}
     \|/
      |";
