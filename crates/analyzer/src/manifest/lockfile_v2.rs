//! package-lock.json v2/v3 정규화
//!
//! [`LockfileV2Parser`]는 `packages` 맵을 순회하여 설치 경로마다 레코드 하나를 만듭니다.
//!
//! # package-lock.json v3 형식 예시
//!
//! ```json
//! {
//!   "name": "my-app",
//!   "lockfileVersion": 3,
//!   "packages": {
//!     "": { "name": "my-app", "version": "1.0.0", "dependencies": { "lodash": "^4.17.0" } },
//!     "node_modules/lodash": { "version": "4.17.21", "resolved": "...", "integrity": "sha512-..." }
//!   }
//! }
//! ```

use serde_json::Value;
use tracing::debug;

use crate::error::AnalyzerError;
use crate::manifest::{ManifestParser, info_from_object, str_field, string_map};
use crate::types::{DepType, ManifestInfo, ManifestKind, PackageRecord};

const NODE_MODULES: &str = "node_modules/";

/// lockfile v2/v3 파서
pub struct LockfileV2Parser;

impl ManifestParser for LockfileV2Parser {
    fn kind(&self) -> ManifestKind {
        ManifestKind::LockfileV2Plus
    }

    fn normalize(
        &self,
        raw: &Value,
        source: &str,
    ) -> Result<(ManifestInfo, Vec<PackageRecord>), AnalyzerError> {
        let obj = raw
            .as_object()
            .ok_or_else(|| AnalyzerError::Format(format!("{source}: root must be an object")))?;
        let packages = obj
            .get("packages")
            .and_then(Value::as_object)
            .ok_or_else(|| AnalyzerError::Format(format!("{source}: missing packages map")))?;

        // 루트 패키지는 키가 빈 문자열
        let mut info = match packages.get("").and_then(Value::as_object) {
            Some(root) => info_from_object(root),
            None => ManifestInfo::default(),
        };
        if info.name.is_none() {
            info.name = str_field(obj, "name");
        }
        if info.version.is_none() {
            info.version = str_field(obj, "version");
        }
        let derive_direct = info.dependencies.is_empty() && info.dev_dependencies.is_empty();

        let mut records = Vec::with_capacity(packages.len());
        for (key, entry) in packages {
            if key.is_empty() {
                continue;
            }
            let Some(node) = entry.as_object() else {
                continue;
            };

            let name = extract_package_name(key);
            let Some(version) = str_field(node, "version") else {
                // link 항목 등 버전 없는 항목은 건너뜀
                debug!(path = %key, "lockfile entry without version, skipping");
                continue;
            };
            if name.is_empty() {
                continue;
            }

            let dev = node.get("dev").and_then(Value::as_bool).unwrap_or(false);

            // 루트가 직접 의존성을 기록하지 않았다면 최상위 설치 항목으로 대신함
            if derive_direct && is_top_level(key) {
                let target = if dev {
                    &mut info.dev_dependencies
                } else {
                    &mut info.dependencies
                };
                target.insert(name.clone(), version.clone());
            }

            records.push(PackageRecord {
                name,
                version,
                dep_type: if dev { DepType::Dev } else { DepType::Prod },
                requires: string_map(node.get("dependencies")),
                path: Some(key.clone()),
                dev,
                resolved: str_field(node, "resolved"),
                integrity: str_field(node, "integrity"),
            });
        }

        Ok((info, records))
    }
}

/// "node_modules/@scope/name" 또는 "node_modules/a/node_modules/name" 에서 패키지명 추출
pub(crate) fn extract_package_name(key: &str) -> String {
    match key.rfind(NODE_MODULES) {
        Some(pos) => key[pos + NODE_MODULES.len()..].to_owned(),
        None => key.to_owned(),
    }
}

/// `node_modules/<name>` 한 단계짜리 경로인지 확인합니다.
fn is_top_level(key: &str) -> bool {
    key.strip_prefix(NODE_MODULES)
        .is_some_and(|rest| !rest.contains(NODE_MODULES))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PACKAGE_LOCK: &str = r#"{
  "name": "my-app",
  "version": "1.0.0",
  "lockfileVersion": 3,
  "requires": true,
  "packages": {
    "": {
      "name": "my-app",
      "version": "1.0.0",
      "license": "MIT",
      "dependencies": { "express": "^4.18.0", "@babel/core": "^7.0.0" },
      "devDependencies": { "jest": "^29.0.0" }
    },
    "node_modules/express": {
      "version": "4.18.2",
      "resolved": "https://registry.npmjs.org/express/-/express-4.18.2.tgz",
      "integrity": "sha512-abc",
      "dependencies": { "debug": "2.6.9" }
    },
    "node_modules/express/node_modules/debug": {
      "version": "2.6.9",
      "dependencies": { "ms": "2.0.0" }
    },
    "node_modules/@babel/core": { "version": "7.23.0" },
    "node_modules/jest": { "version": "29.7.0", "dev": true },
    "node_modules/ms": { "version": "2.0.0" },
    "node_modules/local-link": { "resolved": "packages/local", "link": true }
  }
}"#;

    fn parse_sample() -> (ManifestInfo, Vec<PackageRecord>) {
        let raw: Value = serde_json::from_str(SAMPLE_PACKAGE_LOCK).unwrap();
        LockfileV2Parser.normalize(&raw, "package-lock.json").unwrap()
    }

    #[test]
    fn parses_all_versioned_entries() {
        let (_, records) = parse_sample();
        // 루트와 link 항목 제외
        assert_eq!(records.len(), 5);
    }

    #[test]
    fn nested_name_from_last_node_modules_segment() {
        let (_, records) = parse_sample();
        let debug = records.iter().find(|r| r.name == "debug").unwrap();
        assert_eq!(
            debug.path.as_deref(),
            Some("node_modules/express/node_modules/debug")
        );
        assert_eq!(debug.requires["ms"], "2.0.0");
    }

    #[test]
    fn scoped_package_name() {
        assert_eq!(extract_package_name("node_modules/@babel/core"), "@babel/core");
        assert_eq!(
            extract_package_name("node_modules/a/node_modules/@x/y"),
            "@x/y"
        );
        assert_eq!(extract_package_name("packages/local"), "packages/local");
    }

    #[test]
    fn copies_lock_metadata() {
        let (_, records) = parse_sample();
        let express = records.iter().find(|r| r.name == "express").unwrap();
        assert_eq!(express.integrity.as_deref(), Some("sha512-abc"));
        assert!(express.resolved.as_deref().unwrap().ends_with(".tgz"));
        let jest = records.iter().find(|r| r.name == "jest").unwrap();
        assert!(jest.dev);
        assert_eq!(jest.dep_type, DepType::Dev);
    }

    #[test]
    fn root_entry_provides_manifest_info() {
        let (info, _) = parse_sample();
        assert_eq!(info.name.as_deref(), Some("my-app"));
        assert_eq!(info.license.as_deref(), Some("MIT"));
        assert_eq!(info.dependencies["express"], "^4.18.0");
        assert_eq!(info.dev_dependencies["jest"], "^29.0.0");
    }

    #[test]
    fn direct_dependencies_derived_without_root_declarations() {
        let raw: Value = serde_json::from_str(
            r#"{
              "name": "bare",
              "lockfileVersion": 2,
              "packages": {
                "node_modules/a": { "version": "1.0.0" },
                "node_modules/a/node_modules/b": { "version": "2.0.0" },
                "node_modules/t": { "version": "0.1.0", "dev": true }
              }
            }"#,
        )
        .unwrap();
        let (info, records) = LockfileV2Parser.normalize(&raw, "lock").unwrap();
        assert_eq!(info.name.as_deref(), Some("bare"));
        assert_eq!(info.dependencies.keys().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(info.dev_dependencies["t"], "0.1.0");
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn top_level_detection() {
        assert!(is_top_level("node_modules/a"));
        assert!(is_top_level("node_modules/@s/a"));
        assert!(!is_top_level("node_modules/a/node_modules/b"));
        assert!(!is_top_level("packages/a"));
    }
}
