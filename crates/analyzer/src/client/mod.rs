//! upstream 서비스 추상화
//!
//! [`UpstreamClient`] trait은 레지스트리, 다운로드 통계, 취약점 API 세 가지 외부
//! 서비스를 감쌉니다. 운영 코드는 [`HttpUpstreamClient`]를, 테스트는 모의 구현을 사용합니다.
//!
//! ```text
//! ┌──────────────────────────┐
//! │  BatchQueryOrchestrator  │
//! └────────────┬─────────────┘
//!              │
//!              ▼
//!      ┌───────────────┐
//!      │UpstreamClient │ (trait)
//!      └───────────────┘
//!         │         │
//!         ▼         ▼
//!   ┌──────────┐ ┌──────┐
//!   │   Http   │ │ Mock │
//!   └────┬─────┘ └──────┘
//!        │
//!        ▼
//!  registry / downloads / vuln API
//! ```
//!
//! 모든 실패는 [`AnalyzerError::Network`] 또는 [`AnalyzerError::PartialResponse`]로
//! 반환되며, 호출 측(오케스트레이터)에서 필드 단위로 강등됩니다.

pub mod http;

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AnalyzerError;
use crate::manifest::{author_field, str_field};
use crate::vuln::Advisory;

pub use http::HttpUpstreamClient;

/// 레지스트리 "latest" 메타데이터
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryMeta {
    pub version: String,
    pub description: Option<String>,
    pub license: Option<String>,
    pub homepage: Option<String>,
    pub author: Option<String>,
    /// `dist.unpackedSize` (바이트)
    pub unpacked_size: Option<u64>,
}

impl RegistryMeta {
    /// 레지스트리 응답 본문을 해석합니다. `version`이 없으면 `None`입니다.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let version = str_field(obj, "version")?;
        let license = match obj.get("license") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Object(o)) => str_field(o, "type"),
            _ => None,
        };
        Some(Self {
            version,
            description: str_field(obj, "description"),
            license,
            homepage: str_field(obj, "homepage"),
            author: author_field(obj.get("author")),
            unpacked_size: obj
                .get("dist")
                .and_then(|d| d.get("unpackedSize"))
                .and_then(Value::as_u64),
        })
    }
}

/// 취약점 질의 한 건
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VulnQuery {
    pub name: String,
    pub version: String,
}

impl VulnQuery {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// upstream 서비스 trait
///
/// `Send + Sync + 'static`이므로 `Arc`로 감싸 비동기 작업 간에 공유할 수 있습니다.
/// 재시도는 어느 구현에서도 수행하지 않습니다.
pub trait UpstreamClient: Send + Sync + 'static {
    /// 최신 릴리스 메타데이터를 조회합니다.
    fn fetch_latest(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<RegistryMeta, AnalyzerError>> + Send;

    /// 지난 주 다운로드 수를 조회합니다.
    fn fetch_weekly_downloads(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<u64, AnalyzerError>> + Send;

    /// 단일 패키지 버전의 취약점을 조회합니다.
    fn query_vulnerabilities(
        &self,
        name: &str,
        version: &str,
    ) -> impl Future<Output = Result<Vec<Advisory>, AnalyzerError>> + Send;

    /// 여러 패키지를 한 번에 조회합니다.
    ///
    /// 결과는 `queries`와 위치가 일치해야 하며, 길이가 다르면
    /// [`AnalyzerError::PartialResponse`]입니다.
    fn query_vulnerabilities_batch(
        &self,
        queries: &[VulnQuery],
    ) -> impl Future<Output = Result<Vec<Vec<Advisory>>, AnalyzerError>> + Send;
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registry_meta_reads_nested_fields() {
        let value = json!({
            "version": "4.17.21",
            "description": "Lodash modular utilities.",
            "license": "MIT",
            "homepage": "https://lodash.com/",
            "author": {"name": "John-David Dalton", "email": "john@example.com"},
            "dist": {"unpackedSize": 1412415}
        });
        let meta = RegistryMeta::from_value(&value).unwrap();
        assert_eq!(meta.version, "4.17.21");
        assert_eq!(meta.license.as_deref(), Some("MIT"));
        assert_eq!(meta.author.as_deref(), Some("John-David Dalton <john@example.com>"));
        assert_eq!(meta.unpacked_size, Some(1_412_415));
    }

    #[test]
    fn registry_meta_accepts_license_object() {
        let value = json!({"version": "1.0.0", "license": {"type": "ISC"}});
        let meta = RegistryMeta::from_value(&value).unwrap();
        assert_eq!(meta.license.as_deref(), Some("ISC"));
        assert!(meta.unpacked_size.is_none());
    }

    #[test]
    fn registry_meta_requires_version() {
        assert!(RegistryMeta::from_value(&json!({"name": "x"})).is_none());
        assert!(RegistryMeta::from_value(&json!("1.0.0")).is_none());
    }
}
