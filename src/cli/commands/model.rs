use anyhow::{Context, Result, bail};
use clap::{Arg, Command};

pub const ARG_MODEL_URL: &str = "model-url";
pub const ARG_MODEL_INPUT_WIDTH: &str = "model-input-width";
pub const ARG_MODEL_INPUT_HEIGHT: &str = "model-input-height";
pub const ARG_MODEL_THRESHOLD: &str = "model-threshold";
pub const ARG_MODEL_TIMEOUT_SECONDS: &str = "model-timeout-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_MODEL_URL)
                .long("model-url")
                .help("Scoring endpoint URL; startup fails when it is unreachable")
                .env("FOLIO_MODEL_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_MODEL_INPUT_WIDTH)
                .long("model-input-width")
                .help("Model input width in pixels")
                .env("FOLIO_MODEL_INPUT_WIDTH")
                .default_value("256")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_MODEL_INPUT_HEIGHT)
                .long("model-input-height")
                .help("Model input height in pixels")
                .env("FOLIO_MODEL_INPUT_HEIGHT")
                .default_value("256")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_MODEL_THRESHOLD)
                .long("model-threshold")
                .help("Scores below this are reported as Defective")
                .env("FOLIO_MODEL_THRESHOLD")
                .default_value("0.5")
                .value_parser(clap::value_parser!(f32)),
        )
        .arg(
            Arg::new(ARG_MODEL_TIMEOUT_SECONDS)
                .long("model-timeout-seconds")
                .help("Scoring request timeout in seconds")
                .env("FOLIO_MODEL_TIMEOUT_SECONDS")
                .default_value("30")
                .value_parser(clap::value_parser!(u64)),
        )
}

pub struct Options {
    pub url: String,
    pub input_width: u32,
    pub input_height: u32,
    pub threshold: f32,
    pub timeout_seconds: u64,
}

impl Options {
    /// # Errors
    /// Returns an error when required arguments are missing or the threshold
    /// falls outside `0.0..=1.0`.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let threshold = matches
            .get_one::<f32>(ARG_MODEL_THRESHOLD)
            .copied()
            .context("missing required argument: --model-threshold")?;

        if !(0.0..=1.0).contains(&threshold) {
            bail!("--model-threshold must be within 0.0..=1.0, got {threshold}");
        }

        Ok(Self {
            url: matches
                .get_one::<String>(ARG_MODEL_URL)
                .cloned()
                .context("missing required argument: --model-url")?,
            input_width: matches
                .get_one::<u32>(ARG_MODEL_INPUT_WIDTH)
                .copied()
                .context("missing required argument: --model-input-width")?,
            input_height: matches
                .get_one::<u32>(ARG_MODEL_INPUT_HEIGHT)
                .copied()
                .context("missing required argument: --model-input-height")?,
            threshold,
            timeout_seconds: matches
                .get_one::<u64>(ARG_MODEL_TIMEOUT_SECONDS)
                .copied()
                .context("missing required argument: --model-timeout-seconds")?,
        })
    }
}
