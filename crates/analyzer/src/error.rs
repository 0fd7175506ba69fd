//! 분석기 에러 타입
//!
//! [`AnalyzerError`]는 분석기 모듈 내에서 발생할 수 있는 모든 에러를 나타냅니다.
//! `From<AnalyzerError> for DepscopeError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 전파됩니다.
//!
//! # 에러 카테고리
//!
//! - **로딩 (치명적)**: `Format`, `Parse`
//! - **upstream (비치명적)**: `Network`, `PartialResponse`
//! - **설정**: `Config`
//! - **파일 I/O**: `Io`, `FileTooBig`
//!
//! upstream 에러는 오케스트레이터 호출 지점에서 잡혀 `warn!`으로 기록되고
//! 해당 필드를 "unknown"으로 둔 채 처리를 계속합니다.

use depscope_core::error::{ConfigError, DepscopeError, ManifestError, UpstreamError};

/// 분석기 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    /// 인식할 수 없는 매니페스트 / lockfile 형태
    #[error("format error: {0}")]
    Format(String),

    /// JSON 문법 오류
    #[error("parse error: {source_name}: {reason}")]
    Parse {
        /// 입력 이름 (파일 경로 등)
        source_name: String,
        /// 파싱 실패 사유
        reason: String,
    },

    /// 전송 계층 실패
    #[error("network error: {target}: {reason}")]
    Network {
        /// 요청 대상 (패키지명 또는 엔드포인트)
        target: String,
        /// 실패 사유
        reason: String,
    },

    /// 응답은 성공했지만 본문을 해석할 수 없음
    #[error("partial response: {target}: {reason}")]
    PartialResponse {
        /// 요청 대상
        target: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 파일 I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        /// 관련 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },

    /// 파일 크기 초과
    #[error("file too large: {path}: {size} bytes (max: {max})")]
    FileTooBig {
        /// 파일 경로
        path: String,
        /// 실제 파일 크기 (바이트)
        size: usize,
        /// 최대 허용 크기 (바이트)
        max: usize,
    },
}

impl AnalyzerError {
    /// 로딩 작업을 중단시켜야 하는 에러인지 반환합니다.
    ///
    /// `Network` / `PartialResponse`는 필드 단위로 강등되므로 `false`입니다.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Network { .. } | Self::PartialResponse { .. })
    }
}

impl From<reqwest::Error> for AnalyzerError {
    fn from(err: reqwest::Error) -> Self {
        let target = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "unknown".to_owned());
        if err.is_decode() {
            Self::PartialResponse {
                target,
                reason: err.to_string(),
            }
        } else {
            Self::Network {
                target,
                reason: err.to_string(),
            }
        }
    }
}

impl From<AnalyzerError> for DepscopeError {
    fn from(err: AnalyzerError) -> Self {
        match err {
            AnalyzerError::Format(msg) => {
                DepscopeError::Manifest(ManifestError::UnrecognizedFormat(msg))
            }
            AnalyzerError::Parse {
                source_name,
                reason,
            } => DepscopeError::Manifest(ManifestError::Malformed {
                source_name,
                reason,
            }),
            AnalyzerError::Network { target, reason } => {
                DepscopeError::Upstream(UpstreamError::Network(format!("{target}: {reason}")))
            }
            AnalyzerError::PartialResponse { target, reason } => DepscopeError::Upstream(
                UpstreamError::PartialResponse(format!("{target}: {reason}")),
            ),
            AnalyzerError::Config { field, reason } => {
                DepscopeError::Config(ConfigError::InvalidValue { field, reason })
            }
            AnalyzerError::Io { source, .. } => DepscopeError::Io(source),
            AnalyzerError::FileTooBig { path, size, max } => {
                DepscopeError::Manifest(ManifestError::Malformed {
                    source_name: path,
                    reason: format!("file too large: {size} bytes (max: {max})"),
                })
            }
        }
    }
}
