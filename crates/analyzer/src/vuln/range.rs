//! 영향 범위 매칭 -- advisory 적용 여부와 수정 버전 탐색
//!
//! [`version`](crate::version) 비교 규칙으로 이벤트 목록을 평가합니다.

use serde::{Deserialize, Serialize};

use crate::version::{parse, VersionTriple};

use super::advisory::{Advisory, AffectedRange};

/// 주어진 버전이 영향 범위에 포함되는지 확인합니다.
///
/// # 매칭 규칙
///
/// - 마지막으로 등장한 `introduced` (없으면 `0.0.0`)부터
/// - 마지막으로 등장한 `fixed` (없으면 상한 없음) 직전까지
/// - `introduced <= version < fixed`이면 영향받음
pub fn is_affected(version: &str, range: &AffectedRange) -> bool {
    let mut introduced: Option<&str> = None;
    let mut fixed: Option<&str> = None;
    for event in &range.events {
        if let Some(v) = event.introduced.as_deref() {
            introduced = Some(v);
        }
        if let Some(v) = event.fixed.as_deref() {
            fixed = Some(v);
        }
    }

    let current = parse(version);
    let lower = introduced.map(parse).unwrap_or(VersionTriple::ZERO);
    if current < lower {
        return false;
    }

    match fixed {
        Some(upper) => current < parse(upper),
        None => true,
    }
}

/// 수정 버전 평가 결과
///
/// "수정 버전 모름"과 "영향 없음"을 구분합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "version", rename_all = "snake_case")]
pub enum FixAssessment {
    /// 어떤 범위에도 해당하지 않음
    NotAffected,
    /// 매칭된 범위에 `fixed` 이벤트가 있음
    FixAvailable(String),
    /// 매칭된 범위에 `fixed` 이벤트가 없음
    FixUnknown,
}

impl FixAssessment {
    /// 영향받는 상태인지 반환합니다 (수정 버전 유무와 무관).
    pub fn is_affected(&self) -> bool {
        !matches!(self, Self::NotAffected)
    }
}

/// advisory 목록에서 적용 가능한 수정 버전을 평가합니다.
///
/// advisory 순서, 그 안의 범위 순서대로 검사하여 처음 매칭된 범위에서 멈춥니다.
/// 그 범위의 이벤트 중 처음 등장하는 `fixed` 값을 수정 버전으로 봅니다.
pub fn assess_fix(version: &str, advisories: &[Advisory]) -> FixAssessment {
    for advisory in advisories {
        for range in advisory.ranges() {
            if !is_affected(version, range) {
                continue;
            }
            return match range.events.iter().find_map(|e| e.fixed.clone()) {
                Some(fixed) => FixAssessment::FixAvailable(fixed),
                None => FixAssessment::FixUnknown,
            };
        }
    }
    FixAssessment::NotAffected
}

/// [`assess_fix`]의 `Option` 형태입니다.
///
/// `None`은 "영향 없음"과 "수정 버전 모름" 두 경우를 모두 포함하므로,
/// 표시 계층은 [`assess_fix`]를 사용해야 합니다.
pub fn find_applicable_fix(version: &str, advisories: &[Advisory]) -> Option<String> {
    match assess_fix(version, advisories) {
        FixAssessment::FixAvailable(v) => Some(v),
        FixAssessment::NotAffected | FixAssessment::FixUnknown => None,
    }
}
