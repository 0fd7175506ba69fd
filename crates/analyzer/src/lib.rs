#![doc = include_str!("../README.md")]
//!
//! # 모듈 구조
//!
//! - [`error`]: 도메인 에러 (`AnalyzerError`)
//! - [`config`]: 분석기 설정 (`AnalyzerConfig`, 빌더)
//! - [`types`]: `PackageRecord`, `ManifestInfo`, `ManifestKind`, `LoadedManifest`
//! - [`manifest`]: 형태 탐지와 정규화 (`ManifestParser` trait, `ManifestIngester`)
//! - [`version`]: 잘린 `major.minor.patch` 비교
//! - [`vuln`]: advisory 모델, 영향 범위 평가, 수정 버전 탐색
//! - [`graph`]: 다중 버전 인덱스와 간선 해석 (`PackageGraph`)
//! - [`search`]: 질의 기반 경로 탐색 (`GraphSearch`)
//! - [`client`]: upstream 서비스 추상화 (`UpstreamClient`, `HttpUpstreamClient`)
//! - [`cache`]: 패키지 상세 캐시 (`PackageDetailsCache`, `Lookup`)
//! - [`orchestrator`]: 일괄 조회 (`BatchQueryOrchestrator`)
//! - [`update`]: 업데이트 상태 평가
//! - [`view`]: 표시용 집계 (`AnalysisView`)

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod graph;
pub mod manifest;
pub mod orchestrator;
pub mod search;
pub mod types;
pub mod update;
pub mod version;
pub mod view;
pub mod vuln;

// --- Public API Re-exports ---

// Orchestrator
pub use orchestrator::{
    BatchQueryOrchestrator, BatchQueryOrchestratorBuilder, BulkOperation, BulkOutcome,
    BulkReport, CacheEvent, FetchOutcome, OrchestratorRequest, OrchestratorResponse,
};

// Configuration
pub use config::{AnalyzerConfig, AnalyzerConfigBuilder};

// Error
pub use error::AnalyzerError;

// Types
pub use types::{DepType, LoadedManifest, ManifestInfo, ManifestKind, PackageRecord};

// Ingestion
pub use manifest::{
    LockfileV1Parser, LockfileV2Parser, ManifestDetector, ManifestIngester, ManifestParser,
    PackageJsonParser, detect,
};

// Graph & search
pub use graph::{Edge, PackageGraph};
pub use search::{GraphSearch, PathNode, Query, SearchPath, SearchResult};

// Upstream
pub use client::{HttpUpstreamClient, RegistryMeta, UpstreamClient, VulnQuery};

// Cache & view
pub use cache::{
    CacheSnapshot, DetailField, Lookup, PackageDetails, PackageDetailsCache, VersionAssessment,
    assess_version,
};
pub use update::{UpdateStatus, assess_update};
pub use view::{AnalysisView, PackageRow, ViewSummary};

// Vulnerability
pub use vuln::{
    Advisory, AffectedRange, FixAssessment, RangeEvent, VulnerabilityStatus, assess_fix,
    find_applicable_fix, is_affected, max_severity,
};
