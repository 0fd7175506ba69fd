//! 버전 비교 -- 잘린 `major.minor.patch` 삼중 비교
//!
//! 레지스트리 버전, 선언 범위 문자열, advisory 이벤트 값을 모두 같은 규칙으로
//! 숫자 삼중으로 환원하여 전순서로 비교합니다.
//!
//! # 파싱 규칙
//!
//! 1. 앞쪽의 숫자가 아닌 문자(`v`, `^`, `~`, `>=` 등)를 제거
//! 2. 첫 `-` 이후(prerelease / build 메타데이터)를 버림
//! 3. `.`으로 나누어 최대 세 세그먼트를 앞자리 숫자 기준으로 해석
//! 4. 해석할 수 없거나 없는 세그먼트는 0
//!
//! prerelease 순서는 지원하지 않습니다. `1.0.0-beta`와 `1.0.0`은 같은 버전으로
//! 취급됩니다.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 파싱된 버전 삼중
///
/// 필드 선언 순서대로 사전식 비교가 이루어집니다.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct VersionTriple {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl VersionTriple {
    pub const ZERO: Self = Self {
        major: 0,
        minor: 0,
        patch: 0,
    };

    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for VersionTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// 버전 문자열을 삼중으로 파싱합니다. 실패하지 않습니다.
pub fn parse(version: &str) -> VersionTriple {
    let trimmed = version.trim_start_matches(|c: char| !c.is_ascii_digit());
    let core = match trimmed.find('-') {
        Some(pos) => &trimmed[..pos],
        None => trimmed,
    };

    let mut segments = core.split('.').map(leading_number);
    VersionTriple {
        major: segments.next().unwrap_or(0),
        minor: segments.next().unwrap_or(0),
        patch: segments.next().unwrap_or(0),
    }
}

/// 두 버전 문자열을 비교합니다.
pub fn compare(a: &str, b: &str) -> Ordering {
    parse(a).cmp(&parse(b))
}

/// 선언 범위 문자열에서 질의용 버전을 추출합니다.
///
/// 앞쪽의 `^ ~ < > =`와 공백을 제거하고 첫 토큰만 남깁니다. 결과가 숫자로
/// 시작하지 않으면(태그, URL, `*`) `None`입니다.
pub fn clean(spec: &str) -> Option<String> {
    let stripped = spec.trim_start_matches(|c: char| {
        matches!(c, '^' | '~' | '<' | '>' | '=') || c.is_whitespace()
    });
    let token = stripped.split_whitespace().next()?;
    token
        .starts_with(|c: char| c.is_ascii_digit())
        .then(|| token.to_owned())
}

/// 세그먼트의 앞자리 숫자만 읽습니다 (`"3+build"` → 3, `"x"` → 0).
fn leading_number(segment: &str) -> u64 {
    let end = segment
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(segment.len());
    segment[..end].parse().unwrap_or(0)
}
