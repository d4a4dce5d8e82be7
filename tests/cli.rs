//! CLI Tests
//!
//! Runs the `query` and `validate` commands against files written to a
//! temporary directory and checks the JSON envelopes they print.

mod common;

use std::fs;
use std::path::PathBuf;

use catalogql::cli::{self, CliError, Command, Inputs};
use catalogql::query::{FilterConstraint, Query, RequireConstraint};
use serde_json::Value;
use tempfile::TempDir;

use common::snapshot;

// =============================================================================
// Helper Functions
// =============================================================================

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn inputs(dir: &TempDir, query: &Query, config: Option<&str>) -> Inputs {
    let catalog = serde_json::to_string(&snapshot()).unwrap();
    Inputs {
        catalog: write(dir, "catalog.json", &catalog),
        query: write(dir, "query.json", &serde_json::to_string(query).unwrap()),
        config: config.map(|c| write(dir, "config.json", c)),
    }
}

fn output(buffer: Vec<u8>) -> Value {
    serde_json::from_slice(&buffer).unwrap()
}

// =============================================================================
// Command Tests
// =============================================================================

#[test]
fn test_query_command_prints_ok_envelope() {
    let dir = TempDir::new().unwrap();
    let query = Query::new("Product")
        .filter(vec![FilterConstraint::primary_keys([1, 2, 3])])
        .require(vec![RequireConstraint::Page { number: 1, size: 2 }]);
    let mut out = Vec::new();
    cli::query(&inputs(&dir, &query, None), &mut out).unwrap();

    let json = output(out);
    assert_eq!(json["status"], "ok");
    let records = &json["data"]["records"];
    assert_eq!(records["type"], "page");
    assert_eq!(records["totalRecordCount"], 3);
    assert_eq!(records["lastPageNumber"], 2);
    assert_eq!(records["data"][0]["primaryKey"], 1);
    assert!(json["data"]["evaluationId"].is_string());
}

#[test]
fn test_validate_command_reports_locale() {
    let dir = TempDir::new().unwrap();
    let query = Query::new("Product").filter(vec![FilterConstraint::locale("de")]);
    let mut out = Vec::new();
    cli::run_command(Command::Validate(inputs(&dir, &query, None)), &mut out).unwrap();

    let json = output(out);
    assert_eq!(json["data"]["valid"], true);
    assert_eq!(json["data"]["collection"], "Product");
    assert_eq!(json["data"]["locale"], "de");
}

#[test]
fn test_config_page_size_applies() {
    let dir = TempDir::new().unwrap();
    let config = r#"{"evaluator": {"defaultPageSize": 4}, "pretty": true}"#;
    let mut out = Vec::new();
    cli::query(&inputs(&dir, &Query::new("Product"), Some(config)), &mut out).unwrap();

    let text = String::from_utf8(out.clone()).unwrap();
    assert!(text.contains('\n'));
    let json = output(out);
    assert_eq!(json["data"]["records"]["pageSize"], 4);
    assert_eq!(json["data"]["records"]["data"].as_array().unwrap().len(), 4);
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_invalid_query_keeps_query_code() {
    let dir = TempDir::new().unwrap();
    let query = Query::new("Product").filter(vec![FilterConstraint::attribute_equals("missing", 1i64)]);
    let mut out = Vec::new();
    let err = cli::query(&inputs(&dir, &query, None), &mut out).unwrap_err();
    assert!(matches!(err, CliError::Evaluation(_)));
    assert_eq!(err.code_str(), "CQL_QUERY_UNKNOWN_ATTRIBUTE");

    let envelope = cli::error_envelope(&err);
    assert_eq!(envelope["status"], "error");
    assert_eq!(envelope["code"], "CQL_QUERY_UNKNOWN_ATTRIBUTE");
    assert!(out.is_empty());
}

#[test]
fn test_malformed_query_is_input_error() {
    let dir = TempDir::new().unwrap();
    let mut inputs = inputs(&dir, &Query::new("Product"), None);
    inputs.query = write(&dir, "broken.json", "{\"collection\": ");
    let err = cli::query(&inputs, &mut Vec::new()).unwrap_err();
    assert_eq!(err.code_str(), "CQL_CLI_INPUT_ERROR");
}

#[test]
fn test_missing_catalog_file() {
    let dir = TempDir::new().unwrap();
    let mut inputs = inputs(&dir, &Query::new("Product"), None);
    inputs.catalog = dir.path().join("absent.json");
    let err = cli::query(&inputs, &mut Vec::new()).unwrap_err();
    assert!(matches!(err, CliError::Catalog(_)));
}

#[test]
fn test_invalid_config_rejected() {
    let dir = TempDir::new().unwrap();
    let config = r#"{"evaluator": {"defaultPageSize": 0}}"#;
    let err = cli::query(&inputs(&dir, &Query::new("Product"), Some(config)), &mut Vec::new())
        .unwrap_err();
    assert_eq!(err.code_str(), "CQL_CLI_CONFIG_ERROR");
}
