//! 분석기 설정
//!
//! [`AnalyzerConfig`]는 core의 [`AnalysisConfig`](depscope_core::config::AnalysisConfig)에서
//! 파생되며, 값의 상한 검증과 빌더를 제공합니다.
//!
//! # 사용 예시
//!
//! ```
//! use depscope_analyzer::{AnalyzerConfig, AnalyzerConfigBuilder};
//!
//! let config = AnalyzerConfig::default();
//! config.validate().unwrap();
//!
//! let config = AnalyzerConfigBuilder::new()
//!     .vuln_chunk_size(500)
//!     .update_batch_size(8)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.vuln_chunk_size, 500);
//! ```

use serde::{Deserialize, Serialize};

use depscope_core::config::{AnalysisConfig, VULN_BATCH_API_LIMIT};

use crate::error::AnalyzerError;

/// 분석기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// 레지스트리 base URL
    pub registry_url: String,
    /// 주간 다운로드 수 API base URL
    pub downloads_url: String,
    /// 취약점 API base URL
    pub vuln_api_url: String,
    /// 취약점 질의 생태계 이름
    pub ecosystem: String,
    /// 업데이트 확인 배치 크기 (배치 내부만 동시 실행)
    pub update_batch_size: usize,
    /// 취약점 배치 질의 청크 크기
    pub vuln_chunk_size: usize,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
    /// 연결 타임아웃 (초)
    pub connect_timeout_secs: u64,
    /// 검색 결과 최대 경로 수
    pub max_search_paths: usize,
    /// 입력 파일 최대 크기 (바이트)
    pub max_file_size: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self::from_core(&AnalysisConfig::default())
    }
}

/// 설정 상한값 상수
const MAX_UPDATE_BATCH_SIZE: usize = 64;
const MAX_TIMEOUT_SECS: u64 = 300;
const MAX_SEARCH_PATHS_LIMIT: usize = 100_000;
const MAX_FILE_SIZE: usize = 100 * 1024 * 1024; // 100 MB

impl AnalyzerConfig {
    /// core의 `AnalysisConfig`에서 분석기 설정을 생성합니다.
    pub fn from_core(core: &AnalysisConfig) -> Self {
        Self {
            registry_url: core.registry_url.clone(),
            downloads_url: core.downloads_url.clone(),
            vuln_api_url: core.vuln_api_url.clone(),
            ecosystem: core.ecosystem.clone(),
            update_batch_size: core.update_batch_size,
            vuln_chunk_size: core.vuln_chunk_size,
            request_timeout_secs: core.request_timeout_secs,
            connect_timeout_secs: core.connect_timeout_secs,
            max_search_paths: core.max_search_paths,
            max_file_size: core.max_file_size,
        }
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `update_batch_size`: 1-64
    /// - `vuln_chunk_size`: 1-1000 (배치 API 한도)
    /// - `request_timeout_secs`, `connect_timeout_secs`: 1-300
    /// - `max_search_paths`: 1-100000
    /// - `max_file_size`: 1-104857600 (100MB)
    /// - URL 필드: http(s) 절대 URL
    pub fn validate(&self) -> Result<(), AnalyzerError> {
        if self.update_batch_size == 0 || self.update_batch_size > MAX_UPDATE_BATCH_SIZE {
            return Err(config_err(
                "update_batch_size",
                format!("must be 1-{MAX_UPDATE_BATCH_SIZE}"),
            ));
        }

        if self.vuln_chunk_size == 0 || self.vuln_chunk_size > VULN_BATCH_API_LIMIT {
            return Err(config_err(
                "vuln_chunk_size",
                format!("must be 1-{VULN_BATCH_API_LIMIT}"),
            ));
        }

        for (field, secs) in [
            ("request_timeout_secs", self.request_timeout_secs),
            ("connect_timeout_secs", self.connect_timeout_secs),
        ] {
            if secs == 0 || secs > MAX_TIMEOUT_SECS {
                return Err(config_err(field, format!("must be 1-{MAX_TIMEOUT_SECS}")));
            }
        }

        if self.max_search_paths == 0 || self.max_search_paths > MAX_SEARCH_PATHS_LIMIT {
            return Err(config_err(
                "max_search_paths",
                format!("must be 1-{MAX_SEARCH_PATHS_LIMIT}"),
            ));
        }

        if self.max_file_size == 0 || self.max_file_size > MAX_FILE_SIZE {
            return Err(config_err("max_file_size", format!("must be 1-{MAX_FILE_SIZE}")));
        }

        if self.ecosystem.trim().is_empty() {
            return Err(config_err("ecosystem", "must not be empty".to_owned()));
        }

        for (field, raw) in [
            ("registry_url", &self.registry_url),
            ("downloads_url", &self.downloads_url),
            ("vuln_api_url", &self.vuln_api_url),
        ] {
            let parsed = url::Url::parse(raw)
                .map_err(|e| config_err(field, format!("invalid url '{raw}': {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(config_err(field, "scheme must be http or https".to_owned()));
            }
        }

        Ok(())
    }
}

fn config_err(field: &str, reason: String) -> AnalyzerError {
    AnalyzerError::Config {
        field: field.to_owned(),
        reason,
    }
}

/// [`AnalyzerConfig`] 빌더
///
/// 빌드 시 유효성 검증을 수행합니다.
#[derive(Default)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 레지스트리 URL을 설정합니다.
    pub fn registry_url(mut self, url: impl Into<String>) -> Self {
        self.config.registry_url = url.into();
        self
    }

    /// 다운로드 수 API URL을 설정합니다.
    pub fn downloads_url(mut self, url: impl Into<String>) -> Self {
        self.config.downloads_url = url.into();
        self
    }

    /// 취약점 API URL을 설정합니다.
    pub fn vuln_api_url(mut self, url: impl Into<String>) -> Self {
        self.config.vuln_api_url = url.into();
        self
    }

    /// 업데이트 확인 배치 크기를 설정합니다.
    pub fn update_batch_size(mut self, size: usize) -> Self {
        self.config.update_batch_size = size;
        self
    }

    /// 취약점 청크 크기를 설정합니다.
    pub fn vuln_chunk_size(mut self, size: usize) -> Self {
        self.config.vuln_chunk_size = size;
        self
    }

    /// 요청 타임아웃(초)을 설정합니다.
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    /// 최대 검색 경로 수를 설정합니다.
    pub fn max_search_paths(mut self, max: usize) -> Self {
        self.config.max_search_paths = max;
        self
    }

    /// 최대 파일 크기(바이트)를 설정합니다.
    pub fn max_file_size(mut self, size: usize) -> Self {
        self.config.max_file_size = size;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `AnalyzerError::Config` 반환
    pub fn build(self) -> Result<AnalyzerConfig, AnalyzerError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        AnalyzerConfig::default().validate().unwrap();
    }

    #[test]
    fn from_core_preserves_values() {
        let core = AnalysisConfig {
            update_batch_size: 10,
            vuln_chunk_size: 200,
            vuln_api_url: "http://localhost:8080/v1/".to_owned(),
            ..AnalysisConfig::default()
        };
        let config = AnalyzerConfig::from_core(&core);
        assert_eq!(config.update_batch_size, 10);
        assert_eq!(config.vuln_chunk_size, 200);
        assert_eq!(config.vuln_api_url, "http://localhost:8080/v1/");
        assert_eq!(config.ecosystem, "npm");
    }

    #[test]
    fn validate_rejects_chunk_over_limit() {
        let config = AnalyzerConfig {
            vuln_chunk_size: 1500,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("vuln_chunk_size"));
    }

    #[test]
    fn validate_rejects_zero_batch() {
        let config = AnalyzerConfig {
            update_batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let config = AnalyzerConfig {
            connect_timeout_secs: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("connect_timeout_secs"));
    }

    #[test]
    fn validate_rejects_non_http_url() {
        let config = AnalyzerConfig {
            registry_url: "ftp://registry.example/".to_owned(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("registry_url"));
    }

    #[test]
    fn validate_rejects_unparsable_url() {
        let config = AnalyzerConfig {
            downloads_url: "not a url".to_owned(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn builder_validates_on_build() {
        let result = AnalyzerConfigBuilder::new().max_search_paths(0).build();
        assert!(result.is_err());

        let config = AnalyzerConfigBuilder::new()
            .registry_url("http://127.0.0.1:4873/")
            .max_file_size(1024)
            .build()
            .unwrap();
        assert_eq!(config.registry_url, "http://127.0.0.1:4873/");
        assert_eq!(config.max_file_size, 1024);
    }
}
