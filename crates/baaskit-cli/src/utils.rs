//! Utility functions for the CLI

use crate::error::{CliError, CliResult};
use colored::{ColoredString, Colorize};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Set to `true` to emit logs as JSON lines
pub const ENV_JSON_LOGS: &str = "BAASKIT_JSON_LOGS";

/// Initialize tracing; `RUST_LOG` overrides the default `info` filter
///
/// Logs go to stderr so command output on stdout stays machine readable.
pub fn init_tracing() -> CliResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(ENV_JSON_LOGS).is_ok_and(|v| v.eq_ignore_ascii_case("true"));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let result = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.map_err(|e| CliError::General(format!("Failed to set tracing subscriber: {}", e)))
}

/// Utility for colored console output
pub struct ColoredOutput;

impl ColoredOutput {
    pub fn success(msg: &str) -> ColoredString {
        msg.green().bold()
    }

    pub fn error(msg: &str) -> ColoredString {
        msg.red().bold()
    }
}

/// Parse a JSON object given on the command line
pub fn parse_json_object(input: &str) -> CliResult<serde_json::Map<String, serde_json::Value>> {
    match serde_json::from_str(input) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(other) => Err(CliError::InvalidArgument(format!(
            "expected a JSON object, got {}",
            other
        ))),
        Err(e) => Err(CliError::InvalidArgument(format!("Invalid JSON input: {}", e))),
    }
}
