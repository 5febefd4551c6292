//! JSON I/O handling for CLI
//!
//! - Input: one JSON document from a file or stdin
//! - Output: one JSON object per line on stdout
//! - UTF-8 only

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use serde_json::{json, Value};

use crate::schema::ValidationErrors;

use super::errors::{CliError, CliResult};

/// Read the input document text from `path`, or stdin when absent.
pub fn read_input(path: Option<&Path>) -> CliResult<String> {
    let text = match path {
        Some(path) => fs::read_to_string(path).map_err(|e| {
            CliError::io_error(format!("Failed to read {}: {}", path.display(), e))
        })?,
        None => {
            let mut text = String::new();
            io::stdin().lock().read_to_string(&mut text)?;
            text
        }
    };

    if text.trim().is_empty() {
        return Err(CliError::io_error("Empty input"));
    }
    Ok(text)
}

/// Write a success response
pub fn write_response<W: Write>(out: &mut W, data: Value) -> CliResult<()> {
    let response = json!({
        "status": "ok",
        "data": data
    });
    write_value(out, &response)
}

/// Write a validation failure response
pub fn write_invalid<W: Write>(out: &mut W, errors: &ValidationErrors) -> CliResult<()> {
    let response = json!({
        "status": "invalid",
        "message": errors.to_string(),
        "errors": errors.to_json()
    });
    write_value(out, &response)
}

/// Write a raw line
pub fn write_line<W: Write>(out: &mut W, line: &str) -> CliResult<()> {
    writeln!(out, "{}", line)?;
    out.flush()?;
    Ok(())
}

fn write_value<W: Write>(out: &mut W, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ValidationError;
    use tempfile::TempDir;

    #[test]
    fn test_read_input_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, r#"{"id": 1}"#).unwrap();
        assert_eq!(read_input(Some(&path)).unwrap(), r#"{"id": 1}"#);
    }

    #[test]
    fn test_read_input_rejects_blank() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, "  \n").unwrap();
        assert_eq!(read_input(Some(&path)).unwrap_err().code_str(), "RC_CLI_IO_ERROR");
    }

    #[test]
    fn test_write_response_shape() {
        let mut out = Vec::new();
        write_response(&mut out, json!({"id": 1})).unwrap();
        let line: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(line, json!({"status": "ok", "data": {"id": 1}}));
    }

    #[test]
    fn test_write_invalid_shape() {
        let errors = ValidationErrors::new("User", vec![ValidationError::missing("id")]);
        let mut out = Vec::new();
        write_invalid(&mut out, &errors).unwrap();
        let line: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(line["status"], "invalid");
        assert_eq!(line["errors"][0]["loc"], json!(["id"]));
        assert!(line["message"]
            .as_str()
            .unwrap()
            .starts_with("1 validation error for User"));
    }
}
