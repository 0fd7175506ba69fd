//! 표시 계층에 넘기는 집계 뷰 모델
//!
//! [`AnalysisView::build`]는 로드된 매니페스트와 캐시 스냅샷을 합쳐 패키지별 행과
//! 요약 수치를 만듭니다. `Serialize`이므로 CLI가 그대로 JSON으로 출력할 수 있습니다.

use std::collections::BTreeSet;

use serde::Serialize;

use depscope_core::types::Severity;

use crate::cache::{CacheSnapshot, Lookup};
use crate::types::{DepType, LoadedManifest, ManifestKind, PackageRecord};
use crate::update::{UpdateStatus, assess_update};
use crate::version;
use crate::vuln::{FixAssessment, VulnerabilityStatus, assess_fix, max_severity};

/// 패키지 한 행
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageRow {
    pub name: String,
    pub version: String,
    pub kind: DepType,
    /// 루트가 직접 선언한 의존성인지
    pub direct: bool,
    pub latest: Lookup<String>,
    pub update: UpdateStatus,
    pub downloads: Lookup<u64>,
    pub vulnerability: VulnerabilityStatus,
    pub max_severity: Option<Severity>,
    /// advisory가 있을 때만 채워지며 `NotAffected`는 나오지 않음
    pub fix: Option<FixAssessment>,
}

/// 요약 수치
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewSummary {
    pub total: usize,
    pub prod: usize,
    pub dev: usize,
    pub direct: usize,
    pub vulnerable: usize,
    pub clean: usize,
    pub not_scanned: usize,
    pub outdated: usize,
    pub fix_available: usize,
    /// 영향받지만 수정 버전을 모르는 패키지
    pub fix_unknown: usize,
    pub max_severity: Option<Severity>,
}

/// 분석 결과 뷰
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisView {
    pub source: String,
    pub kind: ManifestKind,
    pub root: String,
    pub rows: Vec<PackageRow>,
    pub summary: ViewSummary,
}

impl AnalysisView {
    pub fn build(manifest: &LoadedManifest, snapshot: &CacheSnapshot) -> Self {
        let direct: BTreeSet<&str> = manifest.info.direct_dependency_names().collect();
        let rows: Vec<PackageRow> = manifest
            .packages
            .iter()
            .map(|record| build_row(record, direct.contains(record.name.as_str()), snapshot))
            .collect();
        let summary = summarize(&rows);

        Self {
            source: manifest.source.clone(),
            kind: manifest.kind,
            root: manifest.info.display_name(),
            rows,
            summary,
        }
    }

    /// 취약한 패키지가 하나라도 있는지
    pub fn has_vulnerabilities(&self) -> bool {
        self.summary.vulnerable > 0
    }

    pub fn vulnerable_rows(&self) -> impl Iterator<Item = &PackageRow> {
        self.rows.iter().filter(|r| r.vulnerability.is_vulnerable())
    }
}

fn build_row(record: &PackageRecord, direct: bool, snapshot: &CacheSnapshot) -> PackageRow {
    let details = snapshot.get(&record.name);

    let latest = match details.map(|d| &d.registry) {
        Some(Lookup::Ready(meta)) => Lookup::Ready(meta.version.clone()),
        Some(Lookup::Failed(reason)) => Lookup::Failed(reason.clone()),
        Some(Lookup::NotFetched) | None => Lookup::NotFetched,
    };
    let update = assess_update(&record.version, latest.ready().map(String::as_str));
    let downloads = details.map(|d| d.downloads.clone()).unwrap_or_default();

    let assessment = snapshot.assess(&record.name, &record.version);
    let (max_sev, fix) = if assessment.advisories.is_empty() {
        (None, None)
    } else {
        let evaluated = version::clean(&record.version).unwrap_or_else(|| record.version.clone());
        let fix = match assess_fix(&evaluated, &assessment.advisories) {
            // 이 버전으로 질의해 보고된 advisory인데 범위가 맞지 않으면 수정 버전을 알 수 없음
            FixAssessment::NotAffected if assessment.queried => FixAssessment::FixUnknown,
            assessed => assessed,
        };
        (max_severity(&assessment.advisories), Some(fix))
    };

    PackageRow {
        name: record.name.clone(),
        version: record.version.clone(),
        kind: record.dep_type,
        direct,
        latest,
        update,
        downloads,
        vulnerability: assessment.status,
        max_severity: max_sev,
        fix,
    }
}

fn summarize(rows: &[PackageRow]) -> ViewSummary {
    let mut summary = ViewSummary {
        total: rows.len(),
        ..Default::default()
    };
    for row in rows {
        match row.kind {
            DepType::Prod => summary.prod += 1,
            DepType::Dev => summary.dev += 1,
        }
        if row.direct {
            summary.direct += 1;
        }
        match row.vulnerability {
            VulnerabilityStatus::Vulnerable(_) => summary.vulnerable += 1,
            VulnerabilityStatus::Clean => summary.clean += 1,
            VulnerabilityStatus::NotScanned => summary.not_scanned += 1,
        }
        if row.update.is_outdated() {
            summary.outdated += 1;
        }
        match row.fix {
            Some(FixAssessment::FixAvailable(_)) => summary.fix_available += 1,
            Some(FixAssessment::FixUnknown) => summary.fix_unknown += 1,
            Some(FixAssessment::NotAffected) | None => {}
        }
        summary.max_severity = summary.max_severity.max(row.max_severity);
    }
    summary
}
