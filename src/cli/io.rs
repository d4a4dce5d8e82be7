//! JSON I/O handling for CLI
//!
//! - Input: query JSON from a file or stdin (`-`)
//! - Output: single JSON object on stdout, `{"status": "ok", "data": ...}`
//!   or `{"status": "error", "code": ..., "message": ...}`
//! - Logs go to stderr so stdout stays pure JSON

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::errors::{CliError, CliResult};

/// Reads and parses a JSON document; `-` reads stdin
pub fn read_json<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let content = if path == Path::new("-") {
        let mut buffer = String::new();
        io::stdin().lock().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(path)
            .map_err(|e| CliError::io_error(format!("cannot read {}: {}", path.display(), e)))?
    };
    if content.trim().is_empty() {
        return Err(CliError::input_error(format!("{} is empty", path.display())));
    }
    serde_json::from_str(&content)
        .map_err(|e| CliError::input_error(format!("{}: {}", path.display(), e)))
}

/// Success envelope
pub fn ok_envelope(data: impl Serialize) -> CliResult<serde_json::Value> {
    let data = serde_json::to_value(data)
        .map_err(|e| CliError::io_error(format!("cannot encode response: {}", e)))?;
    Ok(serde_json::json!({
        "status": "ok",
        "data": data
    }))
}

/// Error envelope
pub fn error_envelope(error: &CliError) -> serde_json::Value {
    serde_json::json!({
        "status": "error",
        "code": error.code_str(),
        "message": error.message()
    })
}

/// Writes one JSON document followed by a newline
pub fn write_json(out: &mut impl Write, value: &serde_json::Value, pretty: bool) -> CliResult<()> {
    let encoded = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| CliError::io_error(format!("cannot encode response: {}", e)))?;
    writeln!(out, "{}", encoded)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelopes() {
        let ok = ok_envelope(vec![1, 2]).unwrap();
        assert_eq!(ok["status"], "ok");
        assert_eq!(ok["data"][1], 2);

        let err = error_envelope(&CliError::input_error("bad"));
        assert_eq!(err["status"], "error");
        assert_eq!(err["code"], "CQL_CLI_INPUT_ERROR");
        assert_eq!(err["message"], "bad");
    }

    #[test]
    fn test_write_json_single_line() {
        let mut out = Vec::new();
        write_json(&mut out, &serde_json::json!({"a": 1}), false).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"a\":1}\n");
    }

    #[test]
    fn test_read_json_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        fs::write(&path, "  \n").unwrap();
        let err = read_json::<serde_json::Value>(&path).unwrap_err();
        assert_eq!(err.code_str(), "CQL_CLI_INPUT_ERROR");
    }
}
