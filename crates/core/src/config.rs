//! 설정 관리 -- depscope.toml 파싱 및 런타임 설정
//!
//! [`DepscopeConfig`]는 모든 섹션의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`DEPSCOPE_ANALYSIS_VULN_CHUNK_SIZE=500` 형식)
//! 3. 설정 파일 (`depscope.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), depscope_core::error::DepscopeError> {
//! use depscope_core::config::DepscopeConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = DepscopeConfig::load("depscope.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = DepscopeConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigError, DepscopeError};

/// 취약점 배치 API가 한 번에 받는 최대 질의 수
pub const VULN_BATCH_API_LIMIT: usize = 1000;

/// depscope 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepscopeConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 분석기 설정
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl DepscopeConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DepscopeError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일이 없으면 기본값에 환경변수 오버라이드만 적용합니다.
    ///
    /// 파일이 존재하지만 잘못된 경우에는 에러를 그대로 반환합니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, DepscopeError> {
        let path = path.as_ref();
        match Self::load(path).await {
            Err(DepscopeError::Config(ConfigError::FileNotFound { .. })) => {
                debug!(path = %path.display(), "config file not found, using defaults");
                let mut config = Self::default();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
            other => other,
        }
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, DepscopeError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DepscopeError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                DepscopeError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, DepscopeError> {
        toml::from_str(toml_str).map_err(|e| {
            DepscopeError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `DEPSCOPE_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "DEPSCOPE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "DEPSCOPE_GENERAL_LOG_FORMAT");

        // Analysis
        override_string(
            &mut self.analysis.registry_url,
            "DEPSCOPE_ANALYSIS_REGISTRY_URL",
        );
        override_string(
            &mut self.analysis.downloads_url,
            "DEPSCOPE_ANALYSIS_DOWNLOADS_URL",
        );
        override_string(
            &mut self.analysis.vuln_api_url,
            "DEPSCOPE_ANALYSIS_VULN_API_URL",
        );
        override_string(&mut self.analysis.ecosystem, "DEPSCOPE_ANALYSIS_ECOSYSTEM");
        override_usize(
            &mut self.analysis.update_batch_size,
            "DEPSCOPE_ANALYSIS_UPDATE_BATCH_SIZE",
        );
        override_usize(
            &mut self.analysis.vuln_chunk_size,
            "DEPSCOPE_ANALYSIS_VULN_CHUNK_SIZE",
        );
        override_u64(
            &mut self.analysis.request_timeout_secs,
            "DEPSCOPE_ANALYSIS_REQUEST_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.analysis.connect_timeout_secs,
            "DEPSCOPE_ANALYSIS_CONNECT_TIMEOUT_SECS",
        );
        override_usize(
            &mut self.analysis.max_search_paths,
            "DEPSCOPE_ANALYSIS_MAX_SEARCH_PATHS",
        );
        override_usize(
            &mut self.analysis.max_file_size,
            "DEPSCOPE_ANALYSIS_MAX_FILE_SIZE",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), DepscopeError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        for (field, value) in [
            ("analysis.registry_url", &self.analysis.registry_url),
            ("analysis.downloads_url", &self.analysis.downloads_url),
            ("analysis.vuln_api_url", &self.analysis.vuln_api_url),
            ("analysis.ecosystem", &self.analysis.ecosystem),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_owned(),
                    reason: "must not be empty".to_owned(),
                }
                .into());
            }
        }

        if self.analysis.update_batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "analysis.update_batch_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.analysis.vuln_chunk_size == 0
            || self.analysis.vuln_chunk_size > VULN_BATCH_API_LIMIT
        {
            return Err(ConfigError::InvalidValue {
                field: "analysis.vuln_chunk_size".to_owned(),
                reason: format!("must be 1-{VULN_BATCH_API_LIMIT}"),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 분석기 설정 (`[analysis]` 섹션)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// 레지스트리 base URL (패키지명을 join하여 `/latest` 조회)
    pub registry_url: String,
    /// 주간 다운로드 수 API base URL
    pub downloads_url: String,
    /// 취약점 API base URL (`query`, `querybatch` 엔드포인트)
    pub vuln_api_url: String,
    /// 취약점 질의에 사용하는 생태계 이름
    pub ecosystem: String,
    /// 업데이트 확인 배치 크기
    pub update_batch_size: usize,
    /// 취약점 배치 질의 청크 크기 (최대 1000)
    pub vuln_chunk_size: usize,
    /// 요청 전체 타임아웃 (초)
    pub request_timeout_secs: u64,
    /// 연결 타임아웃 (초)
    pub connect_timeout_secs: u64,
    /// 그래프 검색이 보고하는 최대 경로 수
    pub max_search_paths: usize,
    /// 입력 파일 최대 크기 (바이트)
    pub max_file_size: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            registry_url: "https://registry.npmjs.org/".to_owned(),
            downloads_url: "https://api.npmjs.org/downloads/point/last-week/".to_owned(),
            vuln_api_url: "https://api.osv.dev/v1/".to_owned(),
            ecosystem: "npm".to_owned(),
            update_batch_size: 5,
            vuln_chunk_size: VULN_BATCH_API_LIMIT,
            request_timeout_secs: 15,
            connect_timeout_secs: 5,
            max_search_paths: 1000,
            max_file_size: 10 * 1024 * 1024, // 10 MB
        }
    }
}

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
