//! CLI command implementations
//!
//! Each command loads the configuration, loads every schema definition from
//! the configured directory and then works on a single input document.
//! Responses go to the given writer, one JSON line per command.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::schema::{serialize, Schema, SchemaLoader};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_input, write_invalid, write_line, write_response};

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory of schema definition files (required)
    pub schema_dir: String,

    /// Log level (optional, default "warn")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (optional, default "text")
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.schema_dir.trim().is_empty() {
            return Err(CliError::config_error("schema_dir must not be empty"));
        }

        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(CliError::config_error(format!(
                "Invalid log_level: '{}'. Expected one of: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }

    /// Schema directory; relative paths resolve against the config file.
    pub fn schema_path(&self, config_path: &Path) -> PathBuf {
        let dir = Path::new(&self.schema_dir);
        match config_path.parent() {
            Some(base) if dir.is_relative() => base.join(dir),
            _ => dir.to_path_buf(),
        }
    }
}

/// Run the appropriate command based on CLI args
pub fn run_command<W: Write>(cmd: &Command, config: &Config, out: &mut W) -> CliResult<()> {
    let config_path = cmd.config_path();
    let mut loader = SchemaLoader::new(config.schema_path(config_path));
    loader.load_all()?;

    match cmd {
        Command::Validate { schema, input, .. } => {
            let schema = lookup(&loader, schema)?;
            validate(&schema, input.as_deref(), out)
        }
        Command::Parse { schema, input, .. } => {
            let schema = lookup(&loader, schema)?;
            parse(&schema, input.as_deref(), out)
        }
        Command::Schemas { .. } => schemas(&loader, out),
    }
}

fn lookup(loader: &SchemaLoader, name: &str) -> CliResult<std::sync::Arc<Schema>> {
    loader.get(name).ok_or_else(|| CliError::unknown_schema(name))
}

/// Validate one document and print the coerced record as JSON.
pub fn validate<W: Write>(schema: &Schema, input: Option<&Path>, out: &mut W) -> CliResult<()> {
    let text = read_input(input)?;
    match schema.parse(&text) {
        Ok(record) => {
            tracing::info!(schema = %schema.name(), "document valid");
            write_response(out, record.to_json())
        }
        Err(errors) => {
            write_invalid(out, &errors)?;
            Err(CliError::validation_failed(errors.to_string()))
        }
    }
}

/// Validate one document and print its canonical serialization.
pub fn parse<W: Write>(schema: &Schema, input: Option<&Path>, out: &mut W) -> CliResult<()> {
    let text = read_input(input)?;
    match schema.parse(&text) {
        Ok(record) => write_line(out, &serialize(&record)),
        Err(errors) => {
            write_invalid(out, &errors)?;
            Err(CliError::validation_failed(errors.to_string()))
        }
    }
}

/// List every loaded schema with its fields.
pub fn schemas<W: Write>(loader: &SchemaLoader, out: &mut W) -> CliResult<()> {
    let listing: Vec<Value> = loader
        .names()
        .into_iter()
        .filter_map(|name| loader.get(name))
        .map(|schema| {
            let fields: Vec<Value> = schema
                .fields()
                .iter()
                .map(|f| {
                    json!({
                        "name": f.name(),
                        "type": f.field_type().to_string(),
                        "required": f.is_required(),
                    })
                })
                .collect();
            json!({
                "name": schema.name(),
                "extra": schema.extra(),
                "fields": fields,
            })
        })
        .collect();

    write_response(out, Value::Array(listing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("recordcheck.json");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_config_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(dir.path(), r#"{"schema_dir": "schemas"}"#);
        let config = Config::load(&path).unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.schema_path(&path), dir.path().join("schemas"));
    }

    #[test]
    fn test_config_rejects_bad_level() {
        let dir = TempDir::new().unwrap();
        let path = write_config(dir.path(), r#"{"schema_dir": "s", "log_level": "loud"}"#);
        assert_eq!(Config::load(&path).unwrap_err().code_str(), "RC_CLI_CONFIG_ERROR");
    }

    #[test]
    fn test_config_requires_schema_dir() {
        let dir = TempDir::new().unwrap();
        let path = write_config(dir.path(), r#"{"log_format": "json"}"#);
        assert!(Config::load(&path).is_err());

        let path = write_config(dir.path(), r#"{"schema_dir": " "}"#);
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.message().starts_with("Failed to read config"));
    }

    #[test]
    fn test_absolute_schema_dir_kept() {
        let config = Config {
            schema_dir: "/srv/schemas".into(),
            log_level: default_log_level(),
            log_format: LogFormat::Json,
        };
        assert_eq!(
            config.schema_path(Path::new("/etc/recordcheck.json")),
            PathBuf::from("/srv/schemas")
        );
    }
}
