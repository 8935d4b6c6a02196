//! Line-oriented JSON I/O
//!
//! One request per stdin line, one response per stdout line, UTF-8 only.

use std::io::{self, BufRead, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Reads a single request line from stdin.
pub fn read_request() -> CliResult<String> {
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;

    if line.trim().is_empty() {
        return Err(CliError::io_error("Empty input"));
    }
    Ok(line)
}

/// Request lines from stdin until EOF. Blank lines are skipped.
pub fn read_requests() -> impl Iterator<Item = CliResult<String>> {
    io::stdin()
        .lock()
        .lines()
        .map(|line| line.map_err(CliError::from))
        .filter(|line| !matches!(line, Ok(text) if text.trim().is_empty()))
}

/// Writes a success response to stdout.
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });
    write_json(&serde_json::to_string(&response)?)
}

/// Writes an error response to stdout.
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });
    write_json(&serde_json::to_string(&response)?)
}

/// Writes an already-encoded JSON line to stdout.
pub fn write_json(json_str: &str) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", json_str)?;
    stdout.flush()?;
    Ok(())
}
