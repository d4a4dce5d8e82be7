//! CLI module for catalogql
//!
//! Provides command-line interface for:
//! - query: evaluate one query against a catalog snapshot
//! - validate: build-time checks only

mod args;
mod commands;
mod errors;
mod io;

use std::io::Write;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use args::{Cli, Command, Inputs};
pub use commands::{query, run_command, validate, Config};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{error_envelope, ok_envelope, read_json, write_json};

/// Installs the stderr log subscriber; `RUST_LOG` overrides the level
pub fn init_logging(level: &str) -> CliResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| CliError::config_error(format!("invalid log level `{}`: {}", level, e)))?;
    // A subscriber installed earlier in the process wins.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
    Ok(())
}

/// Parse arguments, run the command and print its envelope.
///
/// Failures are printed as an error envelope on stdout and returned.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    init_logging(&cli.log_level)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match run_command(cli.command, &mut out) {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::warn!(code = e.code_str(), "command failed");
            write_json(&mut out, &error_envelope(&e), false)?;
            out.flush()?;
            Err(e)
        }
    }
}
