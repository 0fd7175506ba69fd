//! package.json 정규화
//!
//! 직접 선언된 의존성마다 레코드 하나를 만듭니다. `version`은 해석된 버전이 아닌
//! 선언 범위 문자열이며, 하위 의존성 정보는 없습니다.

use serde_json::Value;

use crate::error::AnalyzerError;
use crate::manifest::{ManifestParser, info_from_object};
use crate::types::{DepType, ManifestInfo, ManifestKind, PackageRecord};

/// package.json 파서
pub struct PackageJsonParser;

impl ManifestParser for PackageJsonParser {
    fn kind(&self) -> ManifestKind {
        ManifestKind::PackageManifest
    }

    fn normalize(
        &self,
        raw: &Value,
        source: &str,
    ) -> Result<(ManifestInfo, Vec<PackageRecord>), AnalyzerError> {
        let obj = raw
            .as_object()
            .ok_or_else(|| AnalyzerError::Format(format!("{source}: root must be an object")))?;

        let info = info_from_object(obj);

        let prod = info
            .dependencies
            .iter()
            .map(|(name, range)| PackageRecord::new(name, range, DepType::Prod));
        let dev = info
            .dev_dependencies
            .iter()
            .map(|(name, range)| PackageRecord::new(name, range, DepType::Dev));
        let records = prod.chain(dev).filter(|r| !r.name.is_empty()).collect();

        Ok((info, records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn one_record_per_declaration() {
        let raw = json!({
            "name": "my-app",
            "version": "0.1.0",
            "description": "demo",
            "license": "MIT",
            "author": "Jane Doe <jane@example.com>",
            "scripts": {"build": "tsc", "test": "jest"},
            "engines": {"node": ">=18"},
            "dependencies": {"react": "^18.2.0", "react-dom": "^18.2.0"},
            "devDependencies": {"jest": "~29.7.0"}
        });
        let (info, records) = PackageJsonParser.normalize(&raw, "package.json").unwrap();

        assert_eq!(info.name.as_deref(), Some("my-app"));
        assert_eq!(info.license.as_deref(), Some("MIT"));
        assert_eq!(info.scripts.len(), 2);
        assert_eq!(info.engines["node"], ">=18");

        assert_eq!(records.len(), 3);
        let jest = records.iter().find(|r| r.name == "jest").unwrap();
        assert_eq!(jest.version, "~29.7.0");
        assert_eq!(jest.dep_type, DepType::Dev);
        assert!(jest.dev);
        assert!(records.iter().all(|r| r.requires.is_empty() && r.path.is_none()));
    }

    #[test]
    fn same_name_in_both_maps_keeps_prod_first() {
        let raw = json!({
            "dependencies": {"lodash": "4.17.21"},
            "devDependencies": {"lodash": "4.17.21"}
        });
        let (_, records) = PackageJsonParser.normalize(&raw, "package.json").unwrap();
        // 중복 제거 전에는 두 개, 순서는 운영 의존성 먼저
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].dep_type, DepType::Prod);
    }

    #[test]
    fn name_only_manifest_has_no_records() {
        let raw = json!({"name": "empty", "scripts": {"start": "node ."}});
        let (info, records) = PackageJsonParser.normalize(&raw, "package.json").unwrap();
        assert!(records.is_empty());
        assert_eq!(info.name.as_deref(), Some("empty"));
    }
}
