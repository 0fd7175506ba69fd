//! 매니페스트 / lockfile 수집 -- 형태 탐지와 평탄화
//!
//! [`ManifestParser`] trait은 각 입력 형태의 정규화기가 구현해야 하는 인터페이스입니다.
//! [`ManifestIngester`]는 JSON 파싱, 형태 탐지, 정규화, 중복 제거를 한 번에 수행합니다.
//!
//! # 지원 형태
//!
//! - `package.json` -- [`PackageJsonParser`]
//! - `package-lock.json` v1 (중첩 `dependencies`) -- [`LockfileV1Parser`]
//! - `package-lock.json` v2/v3 (`packages` 맵) -- [`LockfileV2Parser`]
//!
//! # 탐지 순서
//!
//! ```text
//! packages 객체 + ("" 키 또는 lockfileVersion) ──> LockfileV2Plus
//! dependencies 항목에 version 객체, 또는 lockfileVersion ──> LockfileV1
//! dependencies / devDependencies 값이 모두 문자열 ──> PackageManifest
//! name 또는 scripts 존재 ──> PackageManifest (빈 의존성)
//! 그 외 ──> Unrecognized (FormatError)
//! ```

pub mod lockfile_v1;
pub mod lockfile_v2;
pub mod package_json;

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, info};

use depscope_core::metrics as m;

use crate::error::AnalyzerError;
use crate::types::{LoadedManifest, ManifestInfo, ManifestKind, PackageRecord};

pub use lockfile_v1::LockfileV1Parser;
pub use lockfile_v2::LockfileV2Parser;
pub use package_json::PackageJsonParser;

/// 매니페스트 정규화 trait
///
/// 탐지된 형태의 원시 JSON을 루트 디스크립터와 평탄한 레코드 목록으로 변환합니다.
/// 중복 제거는 [`ManifestIngester`]가 공통으로 수행합니다.
pub trait ManifestParser: Send + Sync {
    /// 이 파서가 담당하는 형태
    fn kind(&self) -> ManifestKind;

    /// 원시 JSON을 정규화합니다.
    ///
    /// # Arguments
    ///
    /// - `raw`: 파싱된 JSON 문서
    /// - `source`: 입력 이름 (에러 메시지용)
    fn normalize(
        &self,
        raw: &Value,
        source: &str,
    ) -> Result<(ManifestInfo, Vec<PackageRecord>), AnalyzerError>;
}

/// 입력 형태를 판별합니다.
pub fn detect(raw: &Value) -> ManifestKind {
    let Some(obj) = raw.as_object() else {
        return ManifestKind::Unrecognized;
    };

    let has_lockfile_version = obj.contains_key("lockfileVersion");

    if let Some(packages) = obj.get("packages").and_then(Value::as_object)
        && (packages.contains_key("") || has_lockfile_version)
    {
        return ManifestKind::LockfileV2Plus;
    }

    let nested_versions = obj
        .get("dependencies")
        .and_then(Value::as_object)
        .is_some_and(|deps| {
            deps.values()
                .any(|entry| entry.get("version").is_some_and(Value::is_string))
        });
    if nested_versions || has_lockfile_version {
        return ManifestKind::LockfileV1;
    }

    let dep_maps: Vec<&Map<String, Value>> = ["dependencies", "devDependencies"]
        .iter()
        .filter_map(|key| obj.get(*key).and_then(Value::as_object))
        .collect();
    if !dep_maps.is_empty()
        && dep_maps
            .iter()
            .all(|map| map.values().all(Value::is_string))
    {
        return ManifestKind::PackageManifest;
    }

    if obj.contains_key("name") || obj.contains_key("scripts") {
        return ManifestKind::PackageManifest;
    }

    ManifestKind::Unrecognized
}

/// 매니페스트 수집기
///
/// 형태별 파서를 보유하고, 로드 한 번에 [`LoadedManifest`] 하나를 만듭니다.
pub struct ManifestIngester {
    parsers: Vec<Box<dyn ManifestParser>>,
}

impl ManifestIngester {
    /// 기본 파서 세 개를 등록합니다.
    pub fn new() -> Self {
        Self {
            parsers: vec![
                Box::new(PackageJsonParser),
                Box::new(LockfileV1Parser),
                Box::new(LockfileV2Parser),
            ],
        }
    }

    /// JSON 텍스트를 파싱하고 정규화합니다.
    ///
    /// # Errors
    ///
    /// - `AnalyzerError::Parse`: JSON 문법 오류
    /// - `AnalyzerError::Format`: 알 수 없는 형태
    pub fn ingest(&self, content: &str, source: &str) -> Result<LoadedManifest, AnalyzerError> {
        let raw: Value = serde_json::from_str(content).map_err(|e| AnalyzerError::Parse {
            source_name: source.to_owned(),
            reason: e.to_string(),
        })?;
        self.ingest_value(&raw, source)
    }

    /// 파일 또는 디렉토리에서 매니페스트를 읽어 정규화합니다.
    ///
    /// 디렉토리가 주어지면 [`ManifestDetector`]의 우선순위로 파일을 고릅니다.
    ///
    /// # Errors
    ///
    /// - `AnalyzerError::Io`: 파일을 읽을 수 없음
    /// - `AnalyzerError::FileTooBig`: `max_file_size` 초과
    /// - `AnalyzerError::Format`: 디렉토리에 알려진 파일이 없음
    pub fn ingest_path(
        &self,
        path: &Path,
        max_file_size: usize,
    ) -> Result<LoadedManifest, AnalyzerError> {
        let file = if path.is_dir() {
            let detector = ManifestDetector::new();
            detector.find_in_dir(path).ok_or_else(|| {
                AnalyzerError::Format(format!(
                    "{}: no manifest found (looked for {})",
                    path.display(),
                    detector.known_filenames().join(", ")
                ))
            })?
        } else {
            path.to_path_buf()
        };
        let display = file.display().to_string();

        let metadata = std::fs::metadata(&file).map_err(|e| AnalyzerError::Io {
            path: display.clone(),
            source: e,
        })?;
        let size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if size > max_file_size {
            return Err(AnalyzerError::FileTooBig {
                path: display,
                size,
                max: max_file_size,
            });
        }

        let content = std::fs::read_to_string(&file).map_err(|e| AnalyzerError::Io {
            path: display.clone(),
            source: e,
        })?;
        self.ingest(&content, &display)
    }

    /// 이미 파싱된 JSON을 정규화합니다.
    pub fn ingest_value(&self, raw: &Value, source: &str) -> Result<LoadedManifest, AnalyzerError> {
        let kind = detect(raw);
        let (info, packages) = self.normalize(kind, raw, source)?;

        metrics::counter!(m::MANIFESTS_LOADED_TOTAL, m::LABEL_MANIFEST_KIND => kind.as_label())
            .increment(1);
        info!(
            source,
            kind = %kind,
            packages = packages.len(),
            "manifest ingested"
        );

        Ok(LoadedManifest {
            kind,
            source: source.to_owned(),
            info,
            packages,
            has_transitive: kind.is_lockfile(),
        })
    }

    /// 형태에 맞는 파서로 정규화하고 `name@version` 중복을 제거합니다.
    pub fn normalize(
        &self,
        kind: ManifestKind,
        raw: &Value,
        source: &str,
    ) -> Result<(ManifestInfo, Vec<PackageRecord>), AnalyzerError> {
        let parser = self
            .parsers
            .iter()
            .find(|p| p.kind() == kind)
            .ok_or_else(|| {
                AnalyzerError::Format(format!(
                    "{source}: expected a package manifest or lockfile \
                     (dependencies, packages, name or scripts)"
                ))
            })?;

        let (info, records) = parser.normalize(raw, source)?;
        let before = records.len();
        let records = dedup_first(records);
        if records.len() != before {
            debug!(source, dropped = before - records.len(), "duplicate name@version dropped");
        }
        Ok((info, records))
    }
}

impl Default for ManifestIngester {
    fn default() -> Self {
        Self::new()
    }
}

/// 파일 이름 기반 입력 탐지기
///
/// 디렉토리가 주어졌을 때 어떤 파일을 읽을지 결정합니다.
/// lockfile이 선언 매니페스트보다 우선합니다.
pub struct ManifestDetector {
    known_filenames: Vec<&'static str>,
}

impl ManifestDetector {
    pub fn new() -> Self {
        Self {
            known_filenames: vec!["npm-shrinkwrap.json", "package-lock.json", "package.json"],
        }
    }

    /// 우선순위 순서의 알려진 파일명
    pub fn known_filenames(&self) -> &[&'static str] {
        &self.known_filenames
    }

    /// 알려진 파일명인지 확인합니다.
    pub fn is_known(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.known_filenames.contains(&name))
    }

    /// 디렉토리 안에서 가장 우선순위가 높은 파일을 찾습니다.
    pub fn find_in_dir(&self, dir: &Path) -> Option<std::path::PathBuf> {
        self.known_filenames
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    }
}

impl Default for ManifestDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// 첫 등장만 남기고 `name@version` 중복을 제거합니다.
pub(crate) fn dedup_first(records: Vec<PackageRecord>) -> Vec<PackageRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|r| seen.insert((r.name.clone(), r.version.clone())))
        .collect()
}

/// 문자열 필드만 읽습니다.
pub(crate) fn str_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// 문자열 값만 남긴 이름 → 문자열 맵
pub(crate) fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_owned())))
                .collect()
        })
        .unwrap_or_default()
}

/// `author`를 `Name <email> (url)` 형태로 정규화합니다.
pub(crate) fn author_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => {
            let mut out = str_field(obj, "name").unwrap_or_default();
            if let Some(email) = str_field(obj, "email") {
                out.push_str(&format!(" <{email}>"));
            }
            if let Some(url) = str_field(obj, "url") {
                out.push_str(&format!(" ({url})"));
            }
            let out = out.trim().to_owned();
            (!out.is_empty()).then_some(out)
        }
        _ => None,
    }
}

/// 루트 객체에서 [`ManifestInfo`]를 추출합니다.
pub(crate) fn info_from_object(obj: &Map<String, Value>) -> ManifestInfo {
    ManifestInfo {
        name: str_field(obj, "name"),
        version: str_field(obj, "version"),
        description: str_field(obj, "description"),
        author: author_field(obj.get("author")),
        license: str_field(obj, "license"),
        scripts: string_map(obj.get("scripts")),
        engines: string_map(obj.get("engines")),
        dependencies: string_map(obj.get("dependencies")),
        dev_dependencies: string_map(obj.get("devDependencies")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DepType;
    use serde_json::json;

    #[test]
    fn detects_v2_by_root_key() {
        let raw = json!({"packages": {"": {"name": "app"}}});
        assert_eq!(detect(&raw), ManifestKind::LockfileV2Plus);
    }

    #[test]
    fn detects_v3_without_root_entry() {
        let raw = json!({"lockfileVersion": 3, "packages": {"node_modules/a": {"version": "1.0.0"}}});
        assert_eq!(detect(&raw), ManifestKind::LockfileV2Plus);
    }

    #[test]
    fn detects_v1_nested_dependencies() {
        let raw = json!({"dependencies": {"a": {"version": "1.0.0"}}});
        assert_eq!(detect(&raw), ManifestKind::LockfileV1);
    }

    #[test]
    fn lockfile_version_alone_is_v1() {
        let raw = json!({"name": "app", "lockfileVersion": 1, "dependencies": {}});
        assert_eq!(detect(&raw), ManifestKind::LockfileV1);
    }

    #[test]
    fn detects_plain_manifest() {
        let raw = json!({"dependencies": {"left-pad": "1.0.0"}});
        assert_eq!(detect(&raw), ManifestKind::PackageManifest);
    }

    #[test]
    fn name_only_is_manifest() {
        assert_eq!(detect(&json!({"name": "x"})), ManifestKind::PackageManifest);
        assert_eq!(
            detect(&json!({"scripts": {"test": "jest"}})),
            ManifestKind::PackageManifest
        );
    }

    #[test]
    fn unrelated_json_is_unrecognized() {
        assert_eq!(detect(&json!({"foo": 1})), ManifestKind::Unrecognized);
        assert_eq!(detect(&json!([1, 2, 3])), ManifestKind::Unrecognized);
        assert_eq!(detect(&json!("text")), ManifestKind::Unrecognized);
    }

    #[test]
    fn ingest_rejects_malformed_json() {
        let err = ManifestIngester::new()
            .ingest("{not json", "broken.json")
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::Parse { .. }));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn ingest_rejects_unrecognized_shape() {
        let err = ManifestIngester::new()
            .ingest(r#"{"foo": "bar"}"#, "weird.json")
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::Format(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn ingest_plain_manifest_scenario() {
        let loaded = ManifestIngester::new()
            .ingest(r#"{"dependencies":{"left-pad":"1.0.0"}}"#, "package.json")
            .unwrap();
        assert_eq!(loaded.kind, ManifestKind::PackageManifest);
        assert!(!loaded.has_transitive);
        assert_eq!(loaded.packages.len(), 1);
        let rec = &loaded.packages[0];
        assert_eq!(rec.name, "left-pad");
        assert_eq!(rec.version, "1.0.0");
        assert!(rec.requires.is_empty());
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mut first = PackageRecord::new("a", "1.0.0", DepType::Prod);
        first.path = Some("node_modules/a".to_owned());
        let mut dup = PackageRecord::new("a", "1.0.0", DepType::Dev);
        dup.path = Some("node_modules/b/node_modules/a".to_owned());
        let other = PackageRecord::new("a", "2.0.0", DepType::Prod);

        let out = dedup_first(vec![first, dup, other]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].path.as_deref(), Some("node_modules/a"));
        assert_eq!(out[1].version, "2.0.0");
    }

    #[test]
    fn author_object_is_rendered() {
        let v = json!({"name": "Jane", "email": "jane@example.com", "url": "https://jane.dev"});
        assert_eq!(
            author_field(Some(&v)).as_deref(),
            Some("Jane <jane@example.com> (https://jane.dev)")
        );
        assert_eq!(author_field(Some(&json!(42))), None);
        assert_eq!(author_field(Some(&json!({}))), None);
    }

    #[test]
    fn string_map_drops_non_string_values() {
        let v = json!({"a": "1.0.0", "b": {"version": "2"}, "c": 3});
        let map = string_map(Some(&v));
        assert_eq!(map.len(), 1);
        assert_eq!(map["a"], "1.0.0");
    }

    #[test]
    fn ingest_path_resolves_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("package.json"), r#"{"name":"app"}"#).unwrap();
        std::fs::write(
            dir.path().join("package-lock.json"),
            r#"{"lockfileVersion":3,"packages":{"":{"name":"app"},"node_modules/a":{"version":"1.0.0"}}}"#,
        )
        .unwrap();

        let loaded = ManifestIngester::new()
            .ingest_path(dir.path(), 1024 * 1024)
            .unwrap();
        assert_eq!(loaded.kind, ManifestKind::LockfileV2Plus);
        assert!(loaded.source.ends_with("package-lock.json"));
    }

    #[test]
    fn ingest_path_enforces_size_limit() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("package.json");
        std::fs::write(&file, r#"{"name":"app","dependencies":{"a":"1.0.0"}}"#).unwrap();

        let err = ManifestIngester::new().ingest_path(&file, 8).unwrap_err();
        assert!(matches!(err, AnalyzerError::FileTooBig { max: 8, .. }));
    }

    #[test]
    fn ingest_path_reports_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let ingester = ManifestIngester::new();

        let err = ingester.ingest_path(&dir.path().join("nope.json"), 1024).unwrap_err();
        assert!(matches!(err, AnalyzerError::Io { .. }));

        let err = ingester.ingest_path(dir.path(), 1024).unwrap_err();
        assert!(matches!(err, AnalyzerError::Format(_)));
    }

    #[test]
    fn detector_prefers_lockfile() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        std::fs::write(dir.path().join("package-lock.json"), "{}").unwrap();
        let detector = ManifestDetector::new();
        let picked = detector.find_in_dir(dir.path()).unwrap();
        assert!(picked.ends_with("package-lock.json"));
        assert!(detector.is_known(&picked));
        assert!(!detector.is_known(Path::new("/tmp/yarn.lock")));
    }
}
