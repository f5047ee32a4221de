//! CLI module for localdb
//!
//! Inspects and edits a file-backed store through the same registry
//! protocol an application uses:
//! - get: hydrate and print a value
//! - set: validate, repair and persist a value
//! - rm: remove a value
//! - list: list stored keys

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{run_command, Config, Session};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};

use tracing_subscriber::EnvFilter;

/// Main CLI entry point
///
/// Diagnostics go to stderr, filtered by `RUST_LOG` (default `warn`).
pub fn run() -> CliResult<()> {
    init_tracing();
    let cli = Cli::parse_args();
    match run_command(cli) {
        Ok(()) => Ok(()),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A subscriber installed by an embedding process wins.
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .try_init();
}
