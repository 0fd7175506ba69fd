//! Integration tests for `depscope config` command.
//!
//! Tests config validation and display functionality with real TOML files.

use std::fs;
use std::path::Path;

use serial_test::serial;
use tempfile::TempDir;

use depscope_cli::commands::config::{build_config_report, validate_file};
use depscope_cli::commands::load_config;

#[tokio::test]
#[serial]
async fn test_config_validate_valid_toml() {
    // Given: A valid config file
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("depscope.toml");

    let valid_config = r#"
[general]
log_level = "info"
log_format = "json"

[analysis]
update_batch_size = 8
vuln_chunk_size = 500
"#;
    fs::write(&config_path, valid_config).expect("should write config");

    // When: Validating the file
    let report = validate_file(&config_path).await;

    // Then: Should be valid
    assert!(report.valid, "errors: {:?}", report.errors);
    assert!(report.errors.is_empty());
}

#[tokio::test]
#[serial]
async fn test_config_validate_malformed_toml() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("bad.toml");
    fs::write(&config_path, "[general\nlog_level = \"info\"\n").expect("should write bad config");

    let report = validate_file(&config_path).await;

    assert!(!report.valid, "malformed TOML should be invalid");
    assert_eq!(report.errors.len(), 1);
}

#[tokio::test]
#[serial]
async fn test_config_validate_missing_file() {
    let report = validate_file(Path::new("/nonexistent/depscope.toml")).await;

    assert!(!report.valid, "validate is strict about missing files");
    assert!(report.errors[0].contains("not found"));
}

#[tokio::test]
#[serial]
async fn test_config_validate_chunk_over_api_limit() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("depscope.toml");
    fs::write(&config_path, "[analysis]\nvuln_chunk_size = 1500\n").expect("should write config");

    let report = validate_file(&config_path).await;

    assert!(!report.valid);
    assert!(report.errors[0].contains("vuln_chunk_size"));
}

#[tokio::test]
#[serial]
async fn test_config_validate_runs_analyzer_checks() {
    // Given: A URL that passes the core non-empty check but is not http(s)
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("depscope.toml");
    fs::write(
        &config_path,
        "[analysis]\nregistry_url = \"ftp://mirror.example/npm/\"\n",
    )
    .expect("should write config");

    let report = validate_file(&config_path).await;

    assert!(!report.valid, "analyzer should reject non-http registry URL");
    assert!(report.errors[0].contains("registry_url"));
}

#[tokio::test]
#[serial]
async fn test_load_config_falls_back_to_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = load_config(&temp_dir.path().join("absent.toml"))
        .await
        .expect("missing file should fall back to defaults");

    assert_eq!(config.general.log_level, "warn");
    assert_eq!(config.analysis.vuln_chunk_size, 1000);
}

#[tokio::test]
#[serial]
async fn test_load_config_applies_env_override() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("depscope.toml");
    fs::write(&config_path, "[analysis]\nmax_search_paths = 50\n").expect("should write config");

    // SAFETY: serialized test, no other thread touches this variable
    unsafe { std::env::set_var("DEPSCOPE_ANALYSIS_MAX_SEARCH_PATHS", "75") };
    let result = load_config(&config_path).await;
    unsafe { std::env::remove_var("DEPSCOPE_ANALYSIS_MAX_SEARCH_PATHS") };

    let config = result.expect("config should load");
    assert_eq!(config.analysis.max_search_paths, 75);
}

#[tokio::test]
#[serial]
async fn test_config_show_general_section() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("depscope.toml");
    fs::write(&config_path, "[general]\nlog_level = \"debug\"\n").expect("should write config");

    let config = load_config(&config_path).await.expect("config should load");
    let report = build_config_report(&config_path, &config, Some("general".to_owned()))
        .expect("general is a known section");

    assert!(report.config_toml.contains("log_level = \"debug\""));
    assert!(!report.config_toml.contains("registry_url"));
    assert_eq!(report.config["log_format"].as_str(), Some("pretty"));
}
