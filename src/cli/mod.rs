//! CLI module for recordcheck
//!
//! Provides command-line interface for:
//! - validate: Validate a document, print the coerced record
//! - parse: Validate a document, print its canonical text
//! - schemas: List loaded schemas

mod args;
mod commands;
mod errors;
mod io;
mod logging;

pub use args::{Cli, Command};
pub use commands::{parse, run_command, schemas, validate, Config, LogFormat};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_input, write_invalid, write_line, write_response};

/// Main CLI entry point
///
/// Parses arguments, loads configuration, initialises logging and dispatches
/// to the command. This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let config = Config::load(cli.command.config_path())?;
    logging::init(&config, cli.verbose);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_command(&cli.command, &config, &mut out).map_err(|e| {
        tracing::debug!(code = e.code_str(), "command failed");
        e
    })
}
