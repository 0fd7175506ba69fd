//! 취약점 advisory 모델과 범위 매칭
//!
//! - [`advisory`]: 취약점 API 응답 형태
//! - [`range`]: 영향 범위 평가, 수정 버전 탐색

pub mod advisory;
pub mod range;

use serde::Serialize;

use depscope_core::types::Severity;

pub use advisory::{Advisory, AffectedRange, RangeEvent};
pub use range::{FixAssessment, assess_fix, find_applicable_fix, is_affected};

/// 패키지의 취약점 상태
///
/// 배치 스캔 결과가 없는 것과 스캔되지 않은 것을 구분합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "count", rename_all = "snake_case")]
pub enum VulnerabilityStatus {
    /// 아직 질의하지 않음
    NotScanned,
    /// 질의했고 advisory 없음
    Clean,
    /// advisory 수
    Vulnerable(usize),
}

impl VulnerabilityStatus {
    pub fn is_vulnerable(&self) -> bool {
        matches!(self, Self::Vulnerable(_))
    }
}

/// advisory 목록 중 가장 높은 심각도
pub fn max_severity(advisories: &[Advisory]) -> Option<Severity> {
    advisories.iter().filter_map(Advisory::severity).max()
}
