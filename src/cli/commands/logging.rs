use clap::{Arg, Command, builder::ValueParser};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Accepts level names or a bare count so `FOLIO_LOG_LEVEL=info` and
/// `FOLIO_LOG_LEVEL=2` mean the same thing.
fn parse_log_level(level: &str) -> Result<u8, String> {
    match level.to_lowercase().as_str() {
        "error" => Ok(0),
        "warn" => Ok(1),
        "info" => Ok(2),
        "debug" => Ok(3),
        "trace" => Ok(4),
        other => match other.parse::<u8>() {
            Ok(count) if count <= 5 => Ok(count),
            _ => Err(format!("invalid log level: {level}")),
        },
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("FOLIO_LOG_LEVEL")
            .global(true)
            .action(clap::ArgAction::Count)
            .value_parser(ValueParser::from(
                |level: &str| -> std::result::Result<u8, String> { parse_log_level(level) },
            )),
    )
}
