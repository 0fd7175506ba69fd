//! 취약점 advisory 모델
//!
//! 취약점 API가 반환하는 advisory JSON 형태를 그대로 역직렬화합니다.
//!
//! ```json
//! {
//!   "id": "GHSA-xxxx-xxxx-xxxx",
//!   "aliases": ["CVE-2021-23337"],
//!   "summary": "Command injection in lodash",
//!   "details": "...",
//!   "published": "2021-02-15T11:18:00Z",
//!   "modified": "2023-01-01T00:00:00Z",
//!   "database_specific": { "severity": "HIGH" },
//!   "affected": [
//!     { "ranges": [ { "type": "SEMVER", "events": [ {"introduced": "0"}, {"fixed": "4.17.21"} ] } ] }
//!   ],
//!   "references": [ { "url": "https://github.com/advisories/GHSA-xxxx-xxxx-xxxx" } ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use depscope_core::types::Severity;

/// 취약점 advisory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    /// advisory ID (GHSA-*, OSV ID 등)
    pub id: String,
    /// 별칭 (CVE ID 등)
    #[serde(default)]
    pub aliases: Vec<String>,
    /// 한 줄 요약
    #[serde(default)]
    pub summary: Option<String>,
    /// 상세 설명 (markdown)
    #[serde(default)]
    pub details: Option<String>,
    /// 공개 시각 (RFC 3339)
    #[serde(default)]
    pub published: Option<String>,
    /// 수정 시각 (RFC 3339)
    #[serde(default)]
    pub modified: Option<String>,
    /// 데이터베이스 고유 필드
    #[serde(default)]
    pub database_specific: Option<DatabaseSpecific>,
    /// 영향 범위
    #[serde(default)]
    pub affected: Vec<Affected>,
    /// 참고 링크
    #[serde(default)]
    pub references: Vec<Reference>,
}

/// `database_specific` 필드 중 사용하는 부분
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSpecific {
    /// 심각도 문자열 (`CRITICAL`, `HIGH`, `MODERATE`, `LOW`)
    #[serde(default)]
    pub severity: Option<String>,
}

/// 영향받는 패키지 항목
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Affected {
    #[serde(default)]
    pub ranges: Vec<AffectedRange>,
}

/// 영향 범위: 순서가 있는 이벤트 목록
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AffectedRange {
    /// 범위 종류 (`SEMVER`, `ECOSYSTEM`, `GIT`)
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub range_type: Option<String>,
    #[serde(default)]
    pub events: Vec<RangeEvent>,
}

/// 범위 이벤트
///
/// 한 이벤트에는 보통 `introduced`나 `fixed` 중 하나만 존재합니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introduced: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed: Option<String>,
}

impl RangeEvent {
    pub fn introduced(version: impl Into<String>) -> Self {
        Self {
            introduced: Some(version.into()),
            fixed: None,
        }
    }

    pub fn fixed(version: impl Into<String>) -> Self {
        Self {
            introduced: None,
            fixed: Some(version.into()),
        }
    }
}

/// 참고 링크
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub url: String,
}

impl Advisory {
    /// 모든 `affected[].ranges[]`를 선언 순서대로 순회합니다.
    pub fn ranges(&self) -> impl Iterator<Item = &AffectedRange> {
        self.affected.iter().flat_map(|a| a.ranges.iter())
    }

    /// `summary`와 `details`가 모두 비어 있으면 불완전한 레코드입니다.
    ///
    /// 단건 조회로 다시 받아야 하는 배치 응답 항목이 여기에 해당합니다.
    pub fn is_incomplete(&self) -> bool {
        is_blank(&self.summary) && is_blank(&self.details)
    }

    /// `database_specific.severity`를 해석합니다.
    pub fn severity(&self) -> Option<Severity> {
        self.database_specific
            .as_ref()
            .and_then(|d| d.severity.as_deref())
            .and_then(Severity::from_str_loose)
    }

    /// 표시용 ID: CVE 별칭이 있으면 그것을, 없으면 advisory ID를 반환합니다.
    pub fn display_id(&self) -> &str {
        self.aliases
            .iter()
            .find(|a| a.starts_with("CVE-"))
            .map(String::as_str)
            .unwrap_or(&self.id)
    }
}

fn is_blank(field: &Option<String>) -> bool {
    field.as_deref().is_none_or(|s| s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "id": "GHSA-35jh-r3h4-6jhm",
        "aliases": ["CVE-2021-23337"],
        "summary": "Command Injection in lodash",
        "details": "`template` is vulnerable to command injection.",
        "published": "2021-02-15T11:18:00Z",
        "modified": "2023-11-01T00:00:00Z",
        "database_specific": { "severity": "HIGH", "cwe_ids": ["CWE-77"] },
        "affected": [
            {
                "package": { "name": "lodash", "ecosystem": "npm" },
                "ranges": [
                    { "type": "SEMVER", "events": [ {"introduced": "0"}, {"fixed": "4.17.21"} ] }
                ]
            }
        ],
        "references": [ { "type": "WEB", "url": "https://github.com/lodash/lodash/issues/5085" } ]
    }"#;

    #[test]
    fn deserializes_full_advisory() {
        let adv: Advisory = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(adv.id, "GHSA-35jh-r3h4-6jhm");
        assert_eq!(adv.severity(), Some(Severity::High));
        assert_eq!(adv.display_id(), "CVE-2021-23337");
        assert_eq!(adv.ranges().count(), 1);
        assert_eq!(adv.references.len(), 1);
        assert!(!adv.is_incomplete());
    }

    #[test]
    fn batch_style_record_is_incomplete() {
        let adv: Advisory =
            serde_json::from_str(r#"{"id": "GHSA-aaaa", "modified": "2024-01-01T00:00:00Z"}"#)
                .unwrap();
        assert!(adv.is_incomplete());
        assert_eq!(adv.severity(), None);
        assert_eq!(adv.display_id(), "GHSA-aaaa");
    }

    #[test]
    fn whitespace_summary_counts_as_blank() {
        let adv: Advisory =
            serde_json::from_str(r#"{"id": "X", "summary": "  ", "details": ""}"#).unwrap();
        assert!(adv.is_incomplete());
    }

    #[test]
    fn details_alone_is_complete() {
        let adv: Advisory = serde_json::from_str(r#"{"id": "X", "details": "text"}"#).unwrap();
        assert!(!adv.is_incomplete());
    }

    #[test]
    fn moderate_severity_maps_to_medium() {
        let adv: Advisory = serde_json::from_str(
            r#"{"id": "X", "database_specific": {"severity": "MODERATE"}}"#,
        )
        .unwrap();
        assert_eq!(adv.severity(), Some(Severity::Medium));
    }
}
