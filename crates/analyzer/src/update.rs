//! 업데이트 상태 평가

use serde::{Deserialize, Serialize};

use crate::version;

/// 선언된 버전 대비 최신 릴리스 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpdateStatus {
    /// 최신 버전 정보 없음 (미조회 또는 조회 실패)
    Unknown,
    UpToDate,
    Outdated {
        latest: String,
        /// 최신 릴리스가 이미 선언 범위를 만족하는지
        within_range: bool,
    },
}

impl UpdateStatus {
    pub fn is_outdated(&self) -> bool {
        matches!(self, Self::Outdated { .. })
    }
}

/// 선언 버전(또는 범위)과 레지스트리 최신 버전을 비교합니다.
///
/// 순서 비교는 [`version::compare`]를, 범위 만족 여부는 `semver::VersionReq`를
/// 사용합니다. 범위를 해석할 수 없으면 `within_range`는 `false`입니다.
pub fn assess_update(declared: &str, latest: Option<&str>) -> UpdateStatus {
    let Some(latest) = latest else {
        return UpdateStatus::Unknown;
    };
    if version::clean(declared).is_none() {
        return UpdateStatus::Unknown;
    }

    if version::compare(declared, latest).is_ge() {
        return UpdateStatus::UpToDate;
    }

    let within_range = match (
        semver::VersionReq::parse(declared.trim()),
        semver::Version::parse(latest.trim()),
    ) {
        (Ok(req), Ok(v)) => req.matches(&v),
        _ => false,
    };

    UpdateStatus::Outdated {
        latest: latest.to_owned(),
        within_range,
    }
}
