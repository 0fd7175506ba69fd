//! depscope.toml 통합 설정 테스트
//!
//! - depscope.toml.example 파싱 테스트
//! - 파일 로딩 / 환경변수 우선순위 테스트

use std::fs;

use depscope_core::config::DepscopeConfig;
use depscope_core::error::{ConfigError, DepscopeError};
use serial_test::serial;
use tempfile::TempDir;

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../depscope.toml.example");
    let config = DepscopeConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "warn");
    assert_eq!(config.analysis.vuln_chunk_size, 1000);
    assert_eq!(config.analysis.update_batch_size, 5);
    assert_eq!(config.analysis.max_file_size, 10 * 1024 * 1024);
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../depscope.toml.example");
    let config = DepscopeConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[tokio::test]
#[serial]
async fn load_applies_env_override_over_file() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = dir.path().join("depscope.toml");
    fs::write(&path, "[analysis]\nvuln_chunk_size = 200\n").expect("should write config");

    // SAFETY: serial 테스트로 환경변수 동시 접근을 막습니다.
    unsafe { std::env::set_var("DEPSCOPE_ANALYSIS_VULN_CHUNK_SIZE", "300") };
    let config = DepscopeConfig::load(&path).await;
    unsafe { std::env::remove_var("DEPSCOPE_ANALYSIS_VULN_CHUNK_SIZE") };

    let config = config.expect("config should load");
    assert_eq!(config.analysis.vuln_chunk_size, 300);
}

#[tokio::test]
#[serial]
async fn load_rejects_env_value_violating_bounds() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = dir.path().join("depscope.toml");
    fs::write(&path, "").expect("should write config");

    // SAFETY: serial 테스트로 환경변수 동시 접근을 막습니다.
    unsafe { std::env::set_var("DEPSCOPE_ANALYSIS_VULN_CHUNK_SIZE", "5000") };
    let result = DepscopeConfig::load(&path).await;
    unsafe { std::env::remove_var("DEPSCOPE_ANALYSIS_VULN_CHUNK_SIZE") };

    assert!(matches!(
        result,
        Err(DepscopeError::Config(ConfigError::InvalidValue { .. }))
    ));
}

#[tokio::test]
async fn load_malformed_file_fails() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[general\nlog_level = \"info\"\n").expect("should write config");

    let result = DepscopeConfig::load(&path).await;
    assert!(matches!(
        result,
        Err(DepscopeError::Config(ConfigError::ParseFailed { .. }))
    ));
}

#[tokio::test]
async fn load_or_default_propagates_parse_errors() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = dir.path().join("depscope.toml");
    fs::write(&path, "general = 3").expect("should write config");

    assert!(DepscopeConfig::load_or_default(&path).await.is_err());
}
