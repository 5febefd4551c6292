//! CLI argument definitions using clap
//!
//! Commands:
//! - recordcheck validate --config <path> --schema <name> [--input <path>]
//! - recordcheck parse --config <path> --schema <name> [--input <path>]
//! - recordcheck schemas --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// recordcheck - schema validation for JSON records
#[derive(Parser, Debug)]
#[command(name = "recordcheck")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a JSON document and print the coerced record
    Validate {
        /// Path to configuration file
        #[arg(long, default_value = "./recordcheck.json")]
        config: PathBuf,

        /// Schema to validate against
        #[arg(long)]
        schema: String,

        /// Input document (stdin when omitted)
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Validate a JSON document and print its canonical serialization
    Parse {
        /// Path to configuration file
        #[arg(long, default_value = "./recordcheck.json")]
        config: PathBuf,

        /// Schema to validate against
        #[arg(long)]
        schema: String,

        /// Input document (stdin when omitted)
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// List loaded schemas and their fields
    Schemas {
        /// Path to configuration file
        #[arg(long, default_value = "./recordcheck.json")]
        config: PathBuf,
    },
}

impl Command {
    /// Configuration file every command reads.
    pub fn config_path(&self) -> &PathBuf {
        match self {
            Command::Validate { config, .. }
            | Command::Parse { config, .. }
            | Command::Schemas { config } => config,
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_validate() {
        let cli = Cli::try_parse_from([
            "recordcheck",
            "-vv",
            "validate",
            "--schema",
            "User",
            "--input",
            "doc.json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Validate { config, schema, input } => {
                assert_eq!(config, PathBuf::from("./recordcheck.json"));
                assert_eq!(schema, "User");
                assert_eq!(input, Some(PathBuf::from("doc.json")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_schema_required() {
        assert!(Cli::try_parse_from(["recordcheck", "parse"]).is_err());
    }

    #[test]
    fn test_config_path() {
        let cli = Cli::try_parse_from(["recordcheck", "schemas", "--config", "/etc/rc.json"]).unwrap();
        assert_eq!(cli.command.config_path(), &PathBuf::from("/etc/rc.json"));
    }
}
