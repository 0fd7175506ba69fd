//! 패키지 그래프 -- 평탄한 레코드 목록 위의 읽기 전용 인덱스
//!
//! 그래프는 한 번에 한 단계씩 호출자가 펼칩니다. 전체를 미리 순회하지 않습니다.
//!
//! # 이름 조회와 간선 해석
//!
//! 같은 이름의 버전이 여럿 설치될 수 있으므로 두 가지 조회를 제공합니다.
//!
//! - [`PackageGraph::lookup`]: 이름으로 첫 레코드 (모호할 수 있음)
//! - [`PackageGraph::resolve_edge`]: 부모 간선으로 특정 레코드를 결정
//!
//! `resolve_edge`의 결정 순서:
//!
//! 1. 부모 설치 경로에서 루트 방향으로 `node_modules/<name>` 탐색.
//!    버전이 간선 범위를 만족하는 설치본만 채택합니다 (중복 제거로 사라진
//!    중첩 설치본 대신 다른 버전의 상위 설치본이 걸리는 경우를 건너뜀)
//! 2. 간선 문자열과 버전이 정확히 같은 레코드
//! 3. 간선 범위(`semver::VersionReq`)를 만족하는 첫 레코드
//! 4. 이름으로 첫 레코드

use std::collections::{BTreeMap, HashMap};

use crate::types::{LoadedManifest, ManifestInfo, PackageRecord};

/// 부모에서 자식으로 가는 간선
#[derive(Debug, Clone, Copy)]
pub struct Edge<'g> {
    /// 요구하는 패키지명
    pub name: &'g str,
    /// 요구 범위 (또는 고정 버전)
    pub range: &'g str,
    /// 해석된 레코드. 목록에 없으면 `None`
    pub target: Option<&'g PackageRecord>,
}

/// 패키지 그래프
#[derive(Debug, Clone, Default)]
pub struct PackageGraph {
    root: ManifestInfo,
    records: Vec<PackageRecord>,
    by_name: HashMap<String, Vec<usize>>,
    by_path: HashMap<String, usize>,
}

impl PackageGraph {
    /// 루트 디스크립터와 레코드 목록으로 그래프를 생성합니다.
    pub fn new(root: ManifestInfo, records: Vec<PackageRecord>) -> Self {
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_path = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            by_name.entry(record.name.clone()).or_default().push(idx);
            if let Some(ref path) = record.path {
                by_path.entry(path.clone()).or_insert(idx);
            }
        }
        Self {
            root,
            records,
            by_name,
            by_path,
        }
    }

    /// 로드 결과로부터 그래프를 생성합니다.
    pub fn from_manifest(manifest: &LoadedManifest) -> Self {
        Self::new(manifest.info.clone(), manifest.packages.clone())
    }

    pub fn root(&self) -> &ManifestInfo {
        &self.root
    }

    pub fn records(&self) -> &[PackageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 이름이 같은 첫 레코드를 반환합니다.
    ///
    /// 여러 버전이 있으면 어떤 부모의 간선인지 구분하지 않습니다.
    /// 간선 단위 해석은 [`resolve_edge`](Self::resolve_edge)를 사용합니다.
    pub fn lookup(&self, name: &str) -> Option<&PackageRecord> {
        self.by_name
            .get(name)
            .and_then(|idxs| idxs.first())
            .map(|&i| &self.records[i])
    }

    /// 이름이 같은 모든 레코드 (목록 순서)
    pub fn lookup_all(&self, name: &str) -> Vec<&PackageRecord> {
        self.by_name
            .get(name)
            .map(|idxs| idxs.iter().map(|&i| &self.records[i]).collect())
            .unwrap_or_default()
    }

    /// 설치 경로로 레코드를 찾습니다.
    pub fn by_path(&self, path: &str) -> Option<&PackageRecord> {
        self.by_path.get(path).map(|&i| &self.records[i])
    }

    /// 레코드의 하위 의존성 (없으면 빈 맵)
    pub fn child_requires<'a>(&self, record: &'a PackageRecord) -> &'a BTreeMap<String, String> {
        &record.requires
    }

    /// 부모 간선 하나를 특정 레코드로 해석합니다.
    ///
    /// `parent`가 `None`이면 루트에서 나가는 간선입니다.
    pub fn resolve_edge(
        &self,
        parent: Option<&PackageRecord>,
        name: &str,
        range: &str,
    ) -> Option<&PackageRecord> {
        let candidates = self.by_name.get(name)?;
        if candidates.len() == 1 {
            return Some(&self.records[candidates[0]]);
        }

        let parent_path = parent.and_then(|p| p.path.as_deref()).unwrap_or("");
        if let Some(found) = self.resolve_by_path(parent_path, name, range) {
            return Some(found);
        }

        let mut matching = candidates.iter().map(|&i| &self.records[i]);
        if let Some(exact) = matching.clone().find(|r| r.version == range) {
            return Some(exact);
        }

        if let Ok(req) = semver::VersionReq::parse(range.trim())
            && let Some(satisfying) = matching.clone().find(|r| {
                semver::Version::parse(&r.version).is_ok_and(|v| req.matches(&v))
            })
        {
            return Some(satisfying);
        }

        matching.next()
    }

    /// 레코드의 하위 간선을 한 단계 펼칩니다.
    pub fn expand<'g>(&'g self, record: &'g PackageRecord) -> Vec<Edge<'g>> {
        self.edges_from(Some(record), self.child_requires(record))
    }

    /// 루트의 운영 / 개발 간선
    pub fn root_edges(&self) -> (Vec<Edge<'_>>, Vec<Edge<'_>>) {
        (
            self.edges_from(None, &self.root.dependencies),
            self.edges_from(None, &self.root.dev_dependencies),
        )
    }

    fn edges_from<'g>(
        &'g self,
        parent: Option<&'g PackageRecord>,
        requires: &'g BTreeMap<String, String>,
    ) -> Vec<Edge<'g>> {
        requires
            .iter()
            .map(|(name, range)| Edge {
                name,
                range,
                target: self.resolve_edge(parent, name, range),
            })
            .collect()
    }

    /// npm 방식으로 부모 경로에서 루트까지 `node_modules/<name>`을 찾습니다.
    ///
    /// 간선 범위를 만족하지 않는 설치본은 건너뛰고 계속 올라갑니다.
    fn resolve_by_path(&self, parent_path: &str, name: &str, range: &str) -> Option<&PackageRecord> {
        let mut dir = parent_path;
        loop {
            let candidate = if dir.is_empty() {
                format!("node_modules/{name}")
            } else {
                format!("{dir}/node_modules/{name}")
            };
            if let Some(found) = self.by_path(&candidate)
                && satisfies_edge(found, range)
            {
                return Some(found);
            }
            if dir.is_empty() {
                return None;
            }
            dir = match dir.rfind("/node_modules/") {
                Some(pos) => &dir[..pos],
                None => "",
            };
        }
    }
}

/// 설치본이 간선을 충족하는지 판단합니다.
///
/// semver 범위로 해석되지 않는 간선(git URL, 태그, `npm:` 별칭)이나
/// 해석되지 않는 버전은 설치 경로를 그대로 신뢰합니다.
fn satisfies_edge(record: &PackageRecord, range: &str) -> bool {
    if record.version == range {
        return true;
    }
    let Ok(req) = semver::VersionReq::parse(range.trim()) else {
        return true;
    };
    match semver::Version::parse(&record.version) {
        Ok(version) => req.matches(&version),
        Err(_) => true,
    }
}
