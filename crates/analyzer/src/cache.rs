//! 패키지 상세 캐시
//!
//! 이름을 키로 registry 메타데이터, 다운로드 수, 취약점 목록을 필드 단위로 보관합니다.
//! 각 필드는 [`Lookup`]으로 "미조회 / 준비됨 / 실패"를 구분합니다.
//!
//! # 병합 규칙
//!
//! 모든 upstream 요청은 발행 시점에 단조 증가하는 ticket을 받습니다. 필드마다 마지막으로
//! 반영된 ticket을 기억하고, 그보다 오래된 ticket의 결과는 버립니다. 같은 키에 대한
//! 경쟁은 완료 순서가 아니라 가장 나중에 *발행된* 요청으로 결정됩니다.
//!
//! 실패 결과는 이미 준비된 값을 덮어쓰지 않습니다.
//!
//! # 버전별 취약점 상태
//!
//! 항목은 이름 단위이지만 취약점 판정은 버전 단위입니다. advisory 목록은 질의한 버전과
//! 함께 저장되고, 일괄 스캔의 clean ledger는 `(이름, 버전)`으로 기록됩니다.
//! 다른 버전으로 질의된 advisory는 영향 범위로 다시 평가합니다 ([`assess_version`]).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::client::RegistryMeta;
use crate::version;
use crate::vuln::{Advisory, VulnerabilityStatus, is_affected};

/// 필드 단위 조회 상태
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Lookup<T> {
    NotFetched,
    Ready(T),
    /// 실패 사유 (표시 계층은 "N/A"로 렌더링)
    Failed(String),
}

impl<T> Default for Lookup<T> {
    fn default() -> Self {
        Self::NotFetched
    }
}

impl<T> Lookup<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::NotFetched | Self::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for Lookup<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(e) => Self::Failed(e.to_string()),
        }
    }
}

/// 캐시 필드 식별자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailField {
    Registry,
    Downloads,
    Vulnerabilities,
}

/// 패키지 하나의 상세 정보
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageDetails {
    pub registry: Lookup<RegistryMeta>,
    pub downloads: Lookup<u64>,
    pub vulnerabilities: Lookup<Vec<Advisory>>,
    /// `vulnerabilities`를 질의한 버전 (정규화된 값)
    #[serde(default)]
    pub vulnerabilities_version: Option<String>,
    /// 단건 조회가 완료된 버전
    pub version_checked: Option<String>,
}

impl PackageDetails {
    /// 기록된 advisory 중 요약과 상세가 모두 빈 것이 있는지
    pub fn has_incomplete_advisories(&self) -> bool {
        self.vulnerabilities
            .ready()
            .is_some_and(|list| list.iter().any(Advisory::is_incomplete))
    }

    pub fn latest_version(&self) -> Option<&str> {
        self.registry.ready().map(|m| m.version.as_str())
    }
}

/// 한 버전에 대한 취약점 판정
#[derive(Debug, Clone, PartialEq)]
pub struct VersionAssessment {
    pub status: VulnerabilityStatus,
    /// 이 버전에 적용되는 advisory
    pub advisories: Vec<Advisory>,
    /// advisory가 이 버전으로 직접 질의된 결과인지
    pub queried: bool,
}

impl VersionAssessment {
    fn without_advisories(status: VulnerabilityStatus) -> Self {
        Self {
            status,
            advisories: Vec::new(),
            queried: false,
        }
    }
}

/// 이름 단위 상세 정보와 clean ledger로부터 특정 버전의 취약점 상태를 계산합니다.
///
/// - 같은 버전으로 질의된 advisory가 있으면 `Vulnerable`
/// - 다른 버전으로 질의된 advisory는 영향 범위에 이 버전이 포함될 때만 `Vulnerable`,
///   범위 밖이면 `Clean`, 범위 정보가 없으면 `NotScanned`
/// - 같은 버전의 단건 조회 결과가 비었거나 clean ledger에 있으면 `Clean`
/// - 그 외에는 `NotScanned`
pub fn assess_version(
    details: Option<&PackageDetails>,
    version: &str,
    clean: &BTreeSet<(String, String)>,
    name: &str,
) -> VersionAssessment {
    let Some(key) = version::clean(version) else {
        return VersionAssessment::without_advisories(VulnerabilityStatus::NotScanned);
    };
    let ledger_clean = clean.contains(&(name.to_owned(), key.clone()));

    let stored = details.and_then(|d| {
        d.vulnerabilities
            .ready()
            .map(|list| (list, d.vulnerabilities_version.as_deref()))
    });
    let Some((list, queried_version)) = stored else {
        return VersionAssessment::without_advisories(if ledger_clean {
            VulnerabilityStatus::Clean
        } else {
            VulnerabilityStatus::NotScanned
        });
    };

    let queried = queried_version.is_none_or(|v| v == key);
    if queried {
        if list.is_empty() {
            return VersionAssessment::without_advisories(VulnerabilityStatus::Clean);
        }
        return VersionAssessment {
            status: VulnerabilityStatus::Vulnerable(list.len()),
            advisories: list.clone(),
            queried: true,
        };
    }

    if ledger_clean {
        return VersionAssessment::without_advisories(VulnerabilityStatus::Clean);
    }
    if list.is_empty() || list.iter().any(|a| a.ranges().next().is_none()) {
        return VersionAssessment::without_advisories(VulnerabilityStatus::NotScanned);
    }

    let applicable: Vec<Advisory> = list
        .iter()
        .filter(|a| a.ranges().any(|r| is_affected(&key, r)))
        .cloned()
        .collect();
    let status = if applicable.is_empty() {
        VulnerabilityStatus::Clean
    } else {
        VulnerabilityStatus::Vulnerable(applicable.len())
    };
    VersionAssessment {
        status,
        advisories: applicable,
        queried: false,
    }
}

#[derive(Debug, Default)]
struct Stamps {
    registry: u64,
    downloads: u64,
    vulnerabilities: u64,
}

#[derive(Debug, Default)]
struct Slot {
    details: PackageDetails,
    stamps: Stamps,
}

/// 패키지 상세 캐시
///
/// 동기 자료구조이며, 공유는 소유자([`BatchQueryOrchestrator`](crate::BatchQueryOrchestrator))가
/// 잠금으로 감쌉니다.
#[derive(Debug, Default)]
pub struct PackageDetailsCache {
    entries: HashMap<String, Slot>,
    clean: BTreeSet<(String, String)>,
}

impl PackageDetailsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&PackageDetails> {
        self.entries.get(name).map(|slot| &slot.details)
    }

    /// 단건 조회를 다시 해야 하는지 판단합니다.
    ///
    /// 같은 버전으로 이미 조회했고 불완전한 advisory가 없으면 `false`입니다.
    pub fn needs_fetch(&self, name: &str, version: &str) -> bool {
        match self.get(name) {
            Some(details) => {
                details.version_checked.as_deref() != Some(version)
                    || details.has_incomplete_advisories()
            }
            None => true,
        }
    }

    pub fn merge_registry(&mut self, name: &str, ticket: u64, value: Lookup<RegistryMeta>) -> bool {
        let slot = self.entries.entry(name.to_owned()).or_default();
        apply(
            &mut slot.details.registry,
            &mut slot.stamps.registry,
            ticket,
            value,
        )
    }

    pub fn merge_downloads(&mut self, name: &str, ticket: u64, value: Lookup<u64>) -> bool {
        let slot = self.entries.entry(name.to_owned()).or_default();
        apply(
            &mut slot.details.downloads,
            &mut slot.stamps.downloads,
            ticket,
            value,
        )
    }

    /// `version`으로 질의한 advisory 목록을 병합합니다.
    pub fn merge_vulnerabilities(
        &mut self,
        name: &str,
        version: &str,
        ticket: u64,
        value: Lookup<Vec<Advisory>>,
    ) -> bool {
        let slot = self.entries.entry(name.to_owned()).or_default();
        let applied = apply(
            &mut slot.details.vulnerabilities,
            &mut slot.stamps.vulnerabilities,
            ticket,
            value,
        );
        if applied {
            slot.details.vulnerabilities_version = Some(version.to_owned());
        }
        applied
    }

    /// 단건 조회 완료 버전을 기록합니다.
    pub fn mark_checked(&mut self, name: &str, version: &str) {
        let slot = self.entries.entry(name.to_owned()).or_default();
        slot.details.version_checked = Some(version.to_owned());
    }

    /// 다음 단건 조회가 반드시 upstream을 호출하도록 합니다.
    pub fn invalidate(&mut self, name: &str) {
        if let Some(slot) = self.entries.get_mut(name) {
            slot.details.version_checked = None;
        }
        self.clean.retain(|(n, _)| n != name);
    }

    /// 일괄 스캔에서 advisory가 없던 `name@version`을 기록합니다. 캐시 항목은 건드리지 않습니다.
    pub fn mark_clean(&mut self, name: &str, version: &str) {
        self.clean.insert((name.to_owned(), version.to_owned()));
    }

    pub fn is_clean(&self, name: &str, version: &str) -> bool {
        self.clean.contains(&(name.to_owned(), version.to_owned()))
    }

    pub fn status(&self, name: &str, version: &str) -> VulnerabilityStatus {
        assess_version(self.get(name), version, &self.clean, name).status
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.clean.clear();
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            entries: self
                .entries
                .iter()
                .map(|(name, slot)| (name.clone(), slot.details.clone()))
                .collect(),
            clean: self.clean.clone(),
        }
    }
}

/// 캐시의 시점 복사본
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheSnapshot {
    pub entries: BTreeMap<String, PackageDetails>,
    /// 일괄 스캔에서 advisory가 없던 `(이름, 버전)`
    pub clean: BTreeSet<(String, String)>,
}

impl CacheSnapshot {
    pub fn get(&self, name: &str) -> Option<&PackageDetails> {
        self.entries.get(name)
    }

    pub fn assess(&self, name: &str, version: &str) -> VersionAssessment {
        assess_version(self.get(name), version, &self.clean, name)
    }

    pub fn status(&self, name: &str, version: &str) -> VulnerabilityStatus {
        self.assess(name, version).status
    }
}

fn apply<T>(slot: &mut Lookup<T>, stamp: &mut u64, ticket: u64, incoming: Lookup<T>) -> bool {
    if ticket < *stamp {
        return false;
    }
    if incoming.is_failed() && slot.is_ready() {
        return false;
    }
    *slot = incoming;
    *stamp = ticket;
    true
}
