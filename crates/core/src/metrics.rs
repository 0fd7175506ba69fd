//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 분석기 모듈은 이 상수를 사용하여 `metrics::counter!()` 매크로를 호출합니다.
//! 레코더가 설치되지 않은 경우 기록은 no-op입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `depscope_`
//! - 접미어: `_total` (counter), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(depscope_core::metrics::PACKAGES_ENRICHED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 요청 종류 레이블 키 (registry, downloads, vulnerabilities, vulnerabilities_batch)
pub const LABEL_KIND: &str = "kind";

/// 결과 레이블 키 (ok, error)
pub const LABEL_RESULT: &str = "result";

/// 매니페스트 형태 레이블 키 (manifest, lockfile_v1, lockfile_v2)
pub const LABEL_MANIFEST_KIND: &str = "manifest_kind";

// ─── 레이블 값 상수 ────────────────────────────────────────────────

/// `kind`: registry 최신 버전 조회
pub const KIND_REGISTRY: &str = "registry";
/// `kind`: 주간 다운로드 수 조회
pub const KIND_DOWNLOADS: &str = "downloads";
/// `kind`: 단건 취약점 질의
pub const KIND_VULNERABILITIES: &str = "vulnerabilities";
/// `kind`: 배치 취약점 질의
pub const KIND_VULNERABILITIES_BATCH: &str = "vulnerabilities_batch";

pub const RESULT_OK: &str = "ok";
pub const RESULT_ERROR: &str = "error";

// ─── Analyzer 메트릭 ────────────────────────────────────────────

/// 로드된 매니페스트 수 (counter, label: manifest_kind)
pub const MANIFESTS_LOADED_TOTAL: &str = "depscope_manifests_loaded_total";

/// upstream 요청 수 (counter, label: kind, result)
pub const UPSTREAM_REQUESTS_TOTAL: &str = "depscope_upstream_requests_total";

/// 전송된 취약점 배치 청크 수 (counter, label: result)
pub const VULN_CHUNKS_TOTAL: &str = "depscope_vuln_chunks_total";

/// 캐시에 병합된 패키지 갱신 수 (counter)
pub const PACKAGES_ENRICHED_TOTAL: &str = "depscope_packages_enriched_total";

/// 그래프 검색 실행 수 (counter)
pub const SEARCHES_TOTAL: &str = "depscope_searches_total";

/// 현재 상세 캐시 엔트리 수 (gauge)
pub const CACHE_ENTRIES: &str = "depscope_cache_entries";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(
        MANIFESTS_LOADED_TOTAL,
        "Total number of manifests and lockfiles ingested"
    );
    describe_counter!(
        UPSTREAM_REQUESTS_TOTAL,
        "Upstream registry and vulnerability requests by kind and result"
    );
    describe_counter!(
        VULN_CHUNKS_TOTAL,
        "Vulnerability batch chunks submitted by result"
    );
    describe_counter!(
        PACKAGES_ENRICHED_TOTAL,
        "Total number of package detail merges into the cache"
    );
    describe_counter!(SEARCHES_TOTAL, "Total number of dependency graph searches");
    describe_gauge!(CACHE_ENTRIES, "Current number of package detail cache entries");
}
