//! CLI command implementations
//!
//! Both commands load the catalog snapshot, build its indexes and parse
//! the query. `validate` stops after the build-time checks, `query` runs
//! the full evaluation.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::catalog::MemoryCatalog;
use crate::evaluator::{EvaluatorConfig, QueryEvaluator};
use crate::query::Query;

use super::args::{Command, Inputs};
use super::errors::{CliError, CliResult};
use super::io::{ok_envelope, read_json, write_json};

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Evaluator settings (optional, all defaulted)
    #[serde(default)]
    pub evaluator: EvaluatorConfig,

    /// Indent the JSON written to stdout (optional, default false)
    #[serde(default)]
    pub pretty: bool,
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

    /// Configuration from an optional path, defaults when absent
    pub fn load_or_default(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> CliResult<()> {
        self.evaluator
            .validate()
            .map_err(|e| CliError::config_error(e.to_string()))
    }
}

/// Run a parsed command, writing its JSON result to `out`
pub fn run_command(command: Command, out: &mut impl Write) -> CliResult<()> {
    match command {
        Command::Query(inputs) => query(&inputs, out),
        Command::Validate(inputs) => validate(&inputs, out),
    }
}

struct Loaded {
    config: Config,
    catalog: MemoryCatalog,
    query: Query,
}

fn load(inputs: &Inputs) -> CliResult<Loaded> {
    let config = Config::load_or_default(inputs.config.as_deref())?;
    let catalog = MemoryCatalog::load(&inputs.catalog)?;
    let query: Query = read_json(&inputs.query)?;
    Ok(Loaded {
        config,
        catalog,
        query,
    })
}

/// Evaluate one query and print the response
pub fn query(inputs: &Inputs, out: &mut impl Write) -> CliResult<()> {
    let loaded = load(inputs)?;
    let evaluator = QueryEvaluator::new(&loaded.catalog, loaded.config.evaluator.clone());
    let response = evaluator.evaluate(&loaded.query)?;
    info!(
        evaluation_id = %response.evaluation_id,
        total = response.records.total_record_count(),
        "query command finished"
    );
    write_json(out, &ok_envelope(&response)?, loaded.config.pretty)
}

/// Validate one query and print the selected locale
pub fn validate(inputs: &Inputs, out: &mut impl Write) -> CliResult<()> {
    let loaded = load(inputs)?;
    let evaluator = QueryEvaluator::new(&loaded.catalog, loaded.config.evaluator.clone());
    let locale = evaluator.validate(&loaded.query)?;
    let data = json!({
        "valid": true,
        "collection": loaded.query.collection,
        "locale": locale,
    });
    write_json(out, &ok_envelope(data)?, loaded.config.pretty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_config_defaults_when_absent() {
        let config = Config::load_or_default(None).unwrap();
        assert_eq!(config.evaluator.default_page_size, 20);
        assert!(!config.pretty);
    }

    #[test]
    fn test_config_load_partial() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.json", r#"{"evaluator": {"maxPageSize": 50}, "pretty": true}"#);
        let config = Config::load(&path).unwrap();
        assert_eq!(config.evaluator.max_page_size, Some(50));
        assert_eq!(config.evaluator.default_page_size, 20);
        assert!(config.pretty);
    }

    #[test]
    fn test_config_rejects_invalid_values() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.json", r#"{"evaluator": {"defaultPageSize": 0}}"#);
        let err = Config::load(&path).unwrap_err();
        assert_eq!(err.code_str(), "CQL_CLI_CONFIG_ERROR");
    }

    #[test]
    fn test_config_rejects_malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.json", "{evaluator");
        assert_eq!(Config::load(&path).unwrap_err().code_str(), "CQL_CLI_CONFIG_ERROR");
    }
}
