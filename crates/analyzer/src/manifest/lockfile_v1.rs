//! package-lock.json v1 정규화
//!
//! v1 lockfile은 `dependencies` 아래에 설치 트리를 중첩으로 기록합니다.
//! 트리를 깊이 우선으로 평탄화하며, 모든 노드가 레코드 하나가 됩니다.
//!
//! ```json
//! {
//!   "name": "my-app",
//!   "lockfileVersion": 1,
//!   "dependencies": {
//!     "express": {
//!       "version": "4.18.2",
//!       "requires": { "debug": "2.6.9" },
//!       "dependencies": { "debug": { "version": "2.6.9" } }
//!     }
//!   }
//! }
//! ```

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::AnalyzerError;
use crate::manifest::{ManifestParser, info_from_object, str_field, string_map};
use crate::types::{DepType, ManifestInfo, ManifestKind, PackageRecord};

/// lockfile v1 파서
pub struct LockfileV1Parser;

impl ManifestParser for LockfileV1Parser {
    fn kind(&self) -> ManifestKind {
        ManifestKind::LockfileV1
    }

    fn normalize(
        &self,
        raw: &Value,
        source: &str,
    ) -> Result<(ManifestInfo, Vec<PackageRecord>), AnalyzerError> {
        let obj = raw
            .as_object()
            .ok_or_else(|| AnalyzerError::Format(format!("{source}: root must be an object")))?;

        let mut info = info_from_object(obj);
        let mut records = Vec::new();

        if let Some(tree) = obj.get("dependencies").and_then(Value::as_object) {
            // 최상위 항목이 곧 직접 의존성
            for (name, entry) in tree {
                let Some(version) = entry.get("version").and_then(Value::as_str) else {
                    continue;
                };
                let target = if is_dev(entry) {
                    &mut info.dev_dependencies
                } else {
                    &mut info.dependencies
                };
                target.insert(name.clone(), version.to_owned());
            }

            flatten(tree, "", &mut records);
        }

        Ok((info, records))
    }
}

/// 중첩 트리를 전위 순회로 평탄화합니다.
fn flatten(tree: &Map<String, Value>, parent_path: &str, out: &mut Vec<PackageRecord>) {
    for (name, entry) in tree {
        let Some(node) = entry.as_object() else {
            continue;
        };
        let path = format!("{parent_path}node_modules/{name}");

        match str_field(node, "version") {
            Some(version) if !name.is_empty() => {
                let dev = is_dev(entry);
                out.push(PackageRecord {
                    name: name.clone(),
                    version,
                    dep_type: if dev { DepType::Dev } else { DepType::Prod },
                    requires: string_map(node.get("requires")),
                    path: Some(path.clone()),
                    dev,
                    resolved: str_field(node, "resolved"),
                    integrity: str_field(node, "integrity"),
                });
            }
            _ => debug!(path = %path, "lockfile v1 entry without version, skipping"),
        }

        if let Some(children) = node.get("dependencies").and_then(Value::as_object) {
            flatten(children, &format!("{path}/"), out);
        }
    }
}

fn is_dev(entry: &Value) -> bool {
    entry.get("dev").and_then(Value::as_bool).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestIngester;
    use std::collections::BTreeSet;

    const SAMPLE_V1: &str = r#"{
  "name": "legacy-app",
  "version": "2.0.0",
  "lockfileVersion": 1,
  "requires": true,
  "dependencies": {
    "express": {
      "version": "4.18.2",
      "resolved": "https://registry.npmjs.org/express/-/express-4.18.2.tgz",
      "integrity": "sha512-express",
      "requires": { "debug": "2.6.9", "ms": "^2.0.0" },
      "dependencies": {
        "debug": {
          "version": "2.6.9",
          "requires": { "ms": "2.0.0" },
          "dependencies": {
            "ms": { "version": "2.0.0" }
          }
        }
      }
    },
    "ms": { "version": "2.1.3" },
    "mocha": {
      "version": "10.2.0",
      "dev": true,
      "requires": { "ms": "2.1.3" }
    }
  }
}"#;

    fn parse_sample() -> (ManifestInfo, Vec<PackageRecord>) {
        let raw: Value = serde_json::from_str(SAMPLE_V1).unwrap();
        LockfileV1Parser.normalize(&raw, "package-lock.json").unwrap()
    }

    #[test]
    fn flattens_every_nested_node() {
        let (_, records) = parse_sample();
        let keys: BTreeSet<String> = records.iter().map(PackageRecord::key).collect();
        let expected: BTreeSet<String> = [
            "express@4.18.2",
            "debug@2.6.9",
            "ms@2.0.0",
            "ms@2.1.3",
            "mocha@10.2.0",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(keys, expected);
        assert_eq!(records.len(), 5);
    }

    #[test]
    fn records_keep_requires_and_paths() {
        let (_, records) = parse_sample();
        let express = records.iter().find(|r| r.name == "express").unwrap();
        assert_eq!(express.requires["debug"], "2.6.9");
        assert_eq!(express.path.as_deref(), Some("node_modules/express"));
        assert_eq!(express.integrity.as_deref(), Some("sha512-express"));

        let nested_ms = records.iter().find(|r| r.key() == "ms@2.0.0").unwrap();
        assert_eq!(
            nested_ms.path.as_deref(),
            Some("node_modules/express/node_modules/debug/node_modules/ms")
        );
    }

    #[test]
    fn direct_dependencies_split_by_dev_flag() {
        let (info, records) = parse_sample();
        assert_eq!(info.name.as_deref(), Some("legacy-app"));
        assert_eq!(info.dependencies.len(), 2);
        assert_eq!(info.dependencies["ms"], "2.1.3");
        assert_eq!(info.dev_dependencies["mocha"], "10.2.0");

        let mocha = records.iter().find(|r| r.name == "mocha").unwrap();
        assert_eq!(mocha.dep_type, DepType::Dev);
    }

    #[test]
    fn repeated_pair_is_deduplicated_by_ingester() {
        let raw = r#"{
          "lockfileVersion": 1,
          "dependencies": {
            "a": { "version": "1.0.0", "dependencies": { "c": { "version": "3.0.0" } } },
            "b": { "version": "1.0.0", "dependencies": { "c": { "version": "3.0.0" } } }
          }
        }"#;
        let loaded = ManifestIngester::new().ingest(raw, "package-lock.json").unwrap();
        let c_records: Vec<_> = loaded.packages.iter().filter(|r| r.name == "c").collect();
        assert_eq!(c_records.len(), 1);
        assert_eq!(
            c_records[0].path.as_deref(),
            Some("node_modules/a/node_modules/c")
        );
        assert_eq!(loaded.packages.len(), 3);
    }

    #[test]
    fn entries_without_version_are_skipped_but_children_kept() {
        let raw: Value = serde_json::from_str(
            r#"{"lockfileVersion": 1, "dependencies": {
                "linked": { "dependencies": { "inner": { "version": "1.0.0" } } }
            }}"#,
        )
        .unwrap();
        let (_, records) = LockfileV1Parser.normalize(&raw, "lock").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "inner");
    }
}
