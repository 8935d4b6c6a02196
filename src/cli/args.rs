//! CLI argument definitions using clap
//!
//! Commands:
//! - palimpsest init --config <path>
//! - palimpsest serve [--config <path>]
//! - palimpsest exec [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Palimpsest - documents as append-only logs of JSON patches
#[derive(Parser, Debug)]
#[command(name = "palimpsest")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the data directory named by the configuration
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./palimpsest.json")]
        config: PathBuf,
    },

    /// Replay the journals and serve JSON requests from stdin, one per line
    Serve {
        /// Path to configuration file; defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Execute a single request from stdin and exit
    Exec {
        /// Path to configuration file; defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,
    },
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
    fn test_parse_serve_without_config() {
        let cli = Cli::try_parse_from(["palimpsest", "serve"]).unwrap();
        assert!(matches!(cli.command, Command::Serve { config: None }));
    }

    #[test]
    fn test_init_defaults_config_path() {
        let cli = Cli::try_parse_from(["palimpsest", "init"]).unwrap();
        match cli.command {
            Command::Init { config } => assert_eq!(config, PathBuf::from("./palimpsest.json")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
