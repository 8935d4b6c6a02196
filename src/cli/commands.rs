//! CLI command implementations
//!
//! Boot order for `serve` and `exec`:
//! 1. Configuration load and validation
//! 2. Log level
//! 3. Journal replay (patches, then branches)
//! 4. Request handling

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use crate::api::ApiHandler;
use crate::branch::BRANCH_JOURNAL_FILE;
use crate::clock::SystemClock;
use crate::config::Config;
use crate::observability::{log_event, log_event_with_fields, Event, Logger};
use crate::service::DocumentService;
use crate::store::PATCH_JOURNAL_FILE;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_request, read_requests, write_error, write_json, write_response};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init { config } => init(&config),
        Command::Serve { config } => serve(config.as_deref()),
        Command::Exec { config } => exec(config.as_deref()),
    }
}

/// Creates the data directory. Writes no journal records.
pub fn init(config_path: &Path) -> CliResult<()> {
    let config = load_config(Some(config_path))?;
    let data_dir = config
        .data_path()
        .ok_or_else(|| CliError::config_error("init requires data_dir in the configuration"))?;

    if is_initialized(data_dir) {
        return Err(CliError::already_initialized(data_dir));
    }

    fs::create_dir_all(data_dir).map_err(|e| {
        CliError::config_error(format!("Failed to create directory {:?}: {}", data_dir, e))
    })?;

    write_response(json!({"initialized": true, "dataDir": data_dir.display().to_string()}))
}

/// Boots and answers stdin requests until EOF.
pub fn serve(config_path: Option<&Path>) -> CliResult<()> {
    let handler = boot(config_path)?;
    log_event(Event::Serving);

    let mut served = 0u64;
    for line in read_requests() {
        match line {
            Ok(request) => {
                write_json(&handler.handle(&request).to_json())?;
                served += 1;
            }
            Err(e) => {
                write_error(e.code_str(), e.message())?;
                break;
            }
        }
    }

    log_event_with_fields(Event::ShutdownComplete, &[("requests", &served.to_string())]);
    Ok(())
}

/// Boots, answers exactly one stdin request, and exits.
pub fn exec(config_path: Option<&Path>) -> CliResult<()> {
    let handler = boot(config_path)?;
    let request = read_request()?;
    write_json(&handler.handle(&request).to_json())
}

fn boot(config_path: Option<&Path>) -> CliResult<ApiHandler> {
    log_event(Event::BootStart);
    let config = load_config(config_path)?;
    Logger::set_min_severity(config.severity()?);
    log_event_with_fields(
        Event::ConfigLoaded,
        &[
            ("data_dir", config.data_dir.as_deref().unwrap_or("")),
            ("lock_timeout_ms", &config.lock_timeout_ms.to_string()),
        ],
    );

    let service = DocumentService::open(&config, Arc::new(SystemClock))?;
    Ok(ApiHandler::new(service, config.default_page_size))
}

fn load_config(path: Option<&Path>) -> CliResult<Config> {
    match path {
        Some(path) => Ok(Config::load(path)?),
        None => Ok(Config::default()),
    }
}

fn is_initialized(data_dir: &Path) -> bool {
    data_dir.join(PATCH_JOURNAL_FILE).exists() || data_dir.join(BRANCH_JOURNAL_FILE).exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_defaults_without_path() {
        let config = load_config(None).unwrap();
        assert!(config.data_path().is_none());
    }

    #[test]
    fn test_init_creates_directory_then_refuses_existing_journals() {
        let temp = tempfile::tempdir().unwrap();
        let data_dir = temp.path().join("data");
        let config_path = temp.path().join("palimpsest.json");
        fs::write(
            &config_path,
            json!({"data_dir": data_dir.to_string_lossy()}).to_string(),
        )
        .unwrap();

        init(&config_path).unwrap();
        assert!(data_dir.is_dir());

        fs::write(data_dir.join(PATCH_JOURNAL_FILE), b"").unwrap();
        let err = init(&config_path).unwrap_err();
        assert_eq!(err.code_str(), "PALIMPSEST_CLI_ALREADY_INITIALIZED");
    }

    #[test]
    fn test_init_requires_data_dir() {
        let temp = tempfile::tempdir().unwrap();
        let config_path = temp.path().join("palimpsest.json");
        fs::write(&config_path, "{}").unwrap();
        assert_eq!(init(&config_path).unwrap_err().code_str(), "PALIMPSEST_CLI_CONFIG_ERROR");
    }
}
