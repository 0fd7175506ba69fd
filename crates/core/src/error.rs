//! 에러 타입 -- 도메인별 에러 정의

/// depscope 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum DepscopeError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 매니페스트 / lockfile 로딩 에러
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// 레지스트리 / 취약점 API 통신 에러
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 매니페스트 로딩 에러
///
/// 두 variant 모두 로딩 자체를 중단시키는 치명적 에러입니다.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// 알 수 없는 매니페스트 / lockfile 형태
    #[error("unrecognized manifest format: {0}")]
    UnrecognizedFormat(String),

    /// JSON 문법 오류
    #[error("malformed json in {source_name}: {reason}")]
    Malformed { source_name: String, reason: String },
}

/// upstream 통신 에러
///
/// 호출 지점에서 잡혀 로그로만 남고, 상위 배치 작업을 중단시키지 않습니다.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// 전송 계층 실패 (연결, 타임아웃, non-2xx)
    #[error("network failure: {0}")]
    Network(String),

    /// HTTP 200이지만 본문을 해석할 수 없음
    #[error("partial response: {0}")]
    PartialResponse(String),
}
