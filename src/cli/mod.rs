//! Command-line interface
//!
//! - init: create the data directory
//! - serve: boot and answer JSON requests line by line
//! - exec: boot and answer one request

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{exec, init, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
