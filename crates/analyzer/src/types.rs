//! 분석기 도메인 타입 -- 패키지 레코드, 루트 디스크립터, 매니페스트 형태

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 의존성 종류
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepType {
    /// 운영 의존성
    #[default]
    Prod,
    /// 개발 의존성
    Dev,
}

impl fmt::Display for DepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prod => write!(f, "prod"),
            Self::Dev => write!(f, "dev"),
        }
    }
}

/// 평탄화된 패키지 레코드
///
/// 한 목록 안에서 `name@version` 조합은 유일합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// 패키지명 (비어 있지 않음, scoped 이름 포함)
    pub name: String,
    /// 버전. 매니페스트에서 온 경우 선언 범위 문자열
    pub version: String,
    /// 의존성 종류
    #[serde(rename = "type")]
    pub dep_type: DepType,
    /// 하위 의존성: 이름 → 범위 문자열
    #[serde(default)]
    pub requires: BTreeMap<String, String>,
    /// lockfile 내 설치 경로 (`node_modules/a/node_modules/b`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// 개발 전용 여부
    #[serde(default)]
    pub dev: bool,
    /// tarball 위치
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<String>,
    /// 무결성 해시
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
}

impl PackageRecord {
    /// 하위 의존성 정보가 없는 레코드를 생성합니다.
    pub fn new(name: impl Into<String>, version: impl Into<String>, dep_type: DepType) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            dep_type,
            requires: BTreeMap::new(),
            path: None,
            dev: dep_type == DepType::Dev,
            resolved: None,
            integrity: None,
        }
    }

    /// 중복 제거 키 `name@version`
    pub fn key(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

/// 루트 pseudo-package
///
/// `dependencies` / `dev_dependencies`에는 직접 선언만 들어갑니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestInfo {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    /// 문자열 또는 `{name, email, url}` 객체를 `Name <email> (url)`로 정규화
    pub author: Option<String>,
    pub license: Option<String>,
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
    #[serde(default)]
    pub engines: BTreeMap<String, String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: BTreeMap<String, String>,
}

impl ManifestInfo {
    /// 직접 의존성 이름 (운영 + 개발)
    pub fn direct_dependency_names(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .keys()
            .chain(self.dev_dependencies.keys())
            .map(String::as_str)
    }

    /// 표시용 이름 (`name@version`, 없으면 `(root)`)
    pub fn display_name(&self) -> String {
        match (&self.name, &self.version) {
            (Some(n), Some(v)) => format!("{n}@{v}"),
            (Some(n), None) => n.clone(),
            _ => "(root)".to_owned(),
        }
    }
}

/// 입력 JSON의 형태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestKind {
    /// `package.json` 형태의 선언 매니페스트
    PackageManifest,
    /// 중첩 `dependencies` 트리를 가진 lockfile v1
    LockfileV1,
    /// `packages` 맵을 가진 lockfile v2 / v3
    LockfileV2Plus,
    /// 알 수 없는 형태
    Unrecognized,
}

impl ManifestKind {
    /// 메트릭 레이블 값
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::PackageManifest => "manifest",
            Self::LockfileV1 => "lockfile_v1",
            Self::LockfileV2Plus => "lockfile_v2",
            Self::Unrecognized => "unrecognized",
        }
    }

    /// lockfile 여부
    pub fn is_lockfile(&self) -> bool {
        matches!(self, Self::LockfileV1 | Self::LockfileV2Plus)
    }
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PackageManifest => write!(f, "package manifest"),
            Self::LockfileV1 => write!(f, "lockfile v1"),
            Self::LockfileV2Plus => write!(f, "lockfile v2+"),
            Self::Unrecognized => write!(f, "unrecognized"),
        }
    }
}

/// 한 번의 로드 결과
///
/// 다음 로드 시 통째로 교체됩니다.
#[derive(Debug, Clone, Serialize)]
pub struct LoadedManifest {
    pub kind: ManifestKind,
    /// 입력 이름 (파일 경로 등)
    pub source: String,
    pub info: ManifestInfo,
    pub packages: Vec<PackageRecord>,
    /// `false`이면 하위 그래프가 없음 (선언 매니페스트)
    pub has_transitive: bool,
}

impl LoadedManifest {
    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    /// 운영 / 개발 레코드 수
    pub fn type_counts(&self) -> (usize, usize) {
        let dev = self
            .packages
            .iter()
            .filter(|p| p.dep_type == DepType::Dev)
            .count();
        (self.packages.len() - dev, dev)
    }
}
