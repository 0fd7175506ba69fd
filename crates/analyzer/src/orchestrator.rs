//! 일괄 조회 오케스트레이터 -- upstream 조회, 캐시 병합, 진행 이벤트
//!
//! [`BatchQueryOrchestrator`]는 [`PackageDetailsCache`]를 소유하며, 호출자는
//! `details()` / `snapshot()`으로 읽거나 `subscribe()`로 변경 이벤트를 받습니다.
//!
//! # 내부 흐름
//! ```text
//! OrchestratorRequest ──dispatch()──> fetch_one / check_updates_for_all / check_vulnerabilities_for_all
//!                                          |
//!                                     UpstreamClient (ticket 발행)
//!                                          |
//!                                     PackageDetailsCache (ticket 비교 후 병합)
//!                                          |
//!                                     CacheEvent ──broadcast──> subscribers
//! ```
//!
//! # 실패 처리
//!
//! upstream 실패는 모두 이 계층에서 잡혀 `warn!`으로 기록되고, 해당 필드는
//! `Lookup::Failed`가 됩니다. 호출자에게 에러로 전파되지 않으며 재시도도 하지 않습니다.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

use depscope_core::config::VULN_BATCH_API_LIMIT;
use depscope_core::metrics as m;

use crate::cache::{CacheSnapshot, DetailField, Lookup, PackageDetails, PackageDetailsCache};
use crate::client::{UpstreamClient, VulnQuery};
use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::types::PackageRecord;
use crate::version;
use crate::vuln::{Advisory, VulnerabilityStatus};

/// 기본 이벤트 채널 용량
const DEFAULT_EVENT_CAPACITY: usize = 256;

/// 일괄 작업 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkOperation {
    Updates,
    Vulnerabilities,
}

/// 캐시 변경 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CacheEvent {
    /// 한 필드가 병합됨
    Updated { name: String, field: DetailField },
    /// 배치 / 청크 하나가 모두 완료됨
    BatchSettled {
        operation: BulkOperation,
        batch: usize,
        total_batches: usize,
    },
    /// 캐시가 비워짐
    Cleared,
}

/// 단건 조회 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchOutcome {
    /// 같은 버전을 이미 조회함
    Skipped,
    /// 세 요청을 보냄, `failures`는 실패한 요청 수
    Fetched { failures: usize },
}

/// 일괄 작업 집계
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    /// 질의 대상 수
    pub total: usize,
    /// 대상에서 제외된 수 (전이 의존성, 질의할 수 없는 버전)
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// advisory가 하나 이상 반환된 패키지 수
    pub flagged: usize,
    /// 실행된 배치 / 청크 수
    pub batches: usize,
}

/// 일괄 작업 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BulkOutcome {
    Completed(BulkReport),
    /// 같은 작업이 이미 진행 중
    AlreadyRunning,
}

/// 오케스트레이터 요청 메시지
#[derive(Debug, Clone)]
pub enum OrchestratorRequest {
    FetchOne {
        name: String,
        version: String,
    },
    CheckUpdates {
        packages: Vec<PackageRecord>,
        direct: BTreeSet<String>,
    },
    CheckVulnerabilities {
        packages: Vec<PackageRecord>,
    },
}

/// 오케스트레이터 응답 메시지
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OrchestratorResponse {
    Fetched(FetchOutcome),
    Bulk(BulkOutcome),
}

/// 재진입 방지 플래그 guard, drop 시 해제됩니다.
struct BulkGuard<'a>(&'a AtomicBool);

impl<'a> BulkGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BulkGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// 일괄 조회 오케스트레이터
///
/// # 사용 예시
/// ```ignore
/// use std::sync::Arc;
/// use depscope_analyzer::{BatchQueryOrchestratorBuilder, HttpUpstreamClient};
///
/// let client = Arc::new(HttpUpstreamClient::new(&config)?);
/// let orchestrator = BatchQueryOrchestratorBuilder::new()
///     .config(config)
///     .client(client)
///     .build()?;
///
/// orchestrator.check_vulnerabilities_for_all(&manifest.packages).await;
/// let snapshot = orchestrator.snapshot().await;
/// ```
pub struct BatchQueryOrchestrator<C: UpstreamClient> {
    client: Arc<C>,
    config: AnalyzerConfig,
    cache: RwLock<PackageDetailsCache>,
    /// 마지막으로 발행된 ticket
    tickets: AtomicU64,
    events: broadcast::Sender<CacheEvent>,
    updates_running: AtomicBool,
    vulns_running: AtomicBool,
    requests_issued: AtomicU64,
    requests_failed: AtomicU64,
}

impl<C: UpstreamClient> BatchQueryOrchestrator<C> {
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// 캐시 변경 이벤트를 구독합니다.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    pub async fn details(&self, name: &str) -> Option<PackageDetails> {
        self.cache.read().await.get(name).cloned()
    }

    pub async fn snapshot(&self) -> CacheSnapshot {
        self.cache.read().await.snapshot()
    }

    /// `name@version`의 취약점 상태
    pub async fn status(&self, name: &str, version: &str) -> VulnerabilityStatus {
        self.cache.read().await.status(name, version)
    }

    /// 다음 `fetch_one`이 upstream을 다시 호출하도록 합니다.
    pub async fn invalidate(&self, name: &str) {
        self.cache.write().await.invalidate(name);
    }

    /// 새 매니페스트를 로드할 때 캐시를 비웁니다.
    pub async fn clear(&self) {
        self.cache.write().await.clear();
        metrics::gauge!(m::CACHE_ENTRIES).set(0.0);
        self.events.send(CacheEvent::Cleared).ok();
    }

    pub fn is_running(&self, operation: BulkOperation) -> bool {
        match operation {
            BulkOperation::Updates => self.updates_running.load(Ordering::Acquire),
            BulkOperation::Vulnerabilities => self.vulns_running.load(Ordering::Acquire),
        }
    }

    /// 발행된 upstream 요청 수
    pub fn requests_issued(&self) -> u64 {
        self.requests_issued.load(Ordering::Relaxed)
    }

    /// 실패한 upstream 요청 수
    pub fn requests_failed(&self) -> u64 {
        self.requests_failed.load(Ordering::Relaxed)
    }

    /// 요청 메시지를 처리합니다.
    pub async fn dispatch(&self, request: OrchestratorRequest) -> OrchestratorResponse {
        match request {
            OrchestratorRequest::FetchOne { name, version } => {
                OrchestratorResponse::Fetched(self.fetch_one(&name, &version).await)
            }
            OrchestratorRequest::CheckUpdates { packages, direct } => {
                OrchestratorResponse::Bulk(self.check_updates_for_all(&packages, &direct).await)
            }
            OrchestratorRequest::CheckVulnerabilities { packages } => {
                OrchestratorResponse::Bulk(self.check_vulnerabilities_for_all(&packages).await)
            }
        }
    }

    /// 패키지 하나의 registry 메타데이터, 다운로드 수, 취약점을 동시에 조회합니다.
    ///
    /// 세 요청은 독립적으로 완료되는 대로 캐시에 병합됩니다. 같은 버전을 이미
    /// 조회했고 불완전한 advisory가 없으면 아무 요청도 보내지 않습니다.
    pub async fn fetch_one(&self, name: &str, version: &str) -> FetchOutcome {
        if !self.cache.read().await.needs_fetch(name, version) {
            debug!(name, version, "details already checked, skipping fetch");
            return FetchOutcome::Skipped;
        }

        let ticket = self.issue_ticket();

        let registry = async {
            let result = self.client.fetch_latest(name).await;
            self.record_request(m::KIND_REGISTRY, name, &result);
            let ok = result.is_ok();
            self.store(
                name,
                DetailField::Registry,
                ticket,
                Lookup::from(result),
                |cache, ticket, value| cache.merge_registry(name, ticket, value),
            )
            .await;
            ok
        };

        let downloads = async {
            let result = self.client.fetch_weekly_downloads(name).await;
            self.record_request(m::KIND_DOWNLOADS, name, &result);
            let ok = result.is_ok();
            self.store(
                name,
                DetailField::Downloads,
                ticket,
                Lookup::from(result),
                |cache, ticket, value| cache.merge_downloads(name, ticket, value),
            )
            .await;
            ok
        };

        let vulnerabilities = async {
            let Some(query_version) = version::clean(version) else {
                debug!(name, version, "version spec is not queryable");
                self.store(
                    name,
                    DetailField::Vulnerabilities,
                    ticket,
                    Lookup::Failed(format!("version spec '{version}' is not queryable")),
                    |cache, ticket, value| cache.merge_vulnerabilities(name, version, ticket, value),
                )
                .await;
                return false;
            };
            let result = self.client.query_vulnerabilities(name, &query_version).await;
            self.record_request(m::KIND_VULNERABILITIES, name, &result);
            let ok = result.is_ok();
            self.store(
                name,
                DetailField::Vulnerabilities,
                ticket,
                Lookup::from(result),
                |cache, ticket, value| {
                    cache.merge_vulnerabilities(name, &query_version, ticket, value)
                },
            )
            .await;
            ok
        };

        let (registry_ok, downloads_ok, vulns_ok) =
            tokio::join!(registry, downloads, vulnerabilities);
        let failures = [registry_ok, downloads_ok, vulns_ok]
            .iter()
            .filter(|ok| !**ok)
            .count();

        if failures == 0 {
            self.cache.write().await.mark_checked(name, version);
        }
        metrics::counter!(m::PACKAGES_ENRICHED_TOTAL).increment(1);
        debug!(name, version, failures, "package details fetched");

        FetchOutcome::Fetched { failures }
    }

    /// 직접 의존성의 최신 버전을 고정 크기 배치로 조회합니다.
    ///
    /// 배치 안의 요청은 동시에 실행되고, 배치 전체가 끝나야 다음 배치가 시작됩니다.
    /// 전이 의존성만으로 등장하는 패키지는 건너뜁니다.
    pub async fn check_updates_for_all(
        &self,
        packages: &[PackageRecord],
        direct: &BTreeSet<String>,
    ) -> BulkOutcome {
        let Some(_guard) = BulkGuard::acquire(&self.updates_running) else {
            info!("update check already running");
            return BulkOutcome::AlreadyRunning;
        };

        let mut seen = HashSet::new();
        let targets: Vec<&str> = packages
            .iter()
            .filter(|r| direct.contains(&r.name))
            .filter(|r| seen.insert(r.name.as_str()))
            .map(|r| r.name.as_str())
            .collect();

        let batch_size = self.config.update_batch_size.max(1);
        let total_batches = targets.len().div_ceil(batch_size);
        let mut report = BulkReport {
            total: targets.len(),
            skipped: packages.len() - targets.len(),
            ..Default::default()
        };

        for (index, batch) in targets.chunks(batch_size).enumerate() {
            let settled = join_all(batch.iter().map(|name| self.refresh_latest(name))).await;
            for ok in settled {
                if ok {
                    report.succeeded += 1;
                } else {
                    report.failed += 1;
                }
            }
            report.batches += 1;
            self.events
                .send(CacheEvent::BatchSettled {
                    operation: BulkOperation::Updates,
                    batch: index + 1,
                    total_batches,
                })
                .ok();
        }

        info!(
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            batches = report.batches,
            "update check finished"
        );
        BulkOutcome::Completed(report)
    }

    /// 모든 패키지의 취약점을 청크 단위 배치 질의로 조회합니다.
    ///
    /// 청크당 요청 하나를 순차적으로 보냅니다. advisory가 하나 이상인 패키지만
    /// 캐시에 병합하고, 없는 패키지는 clean ledger에만 기록합니다.
    pub async fn check_vulnerabilities_for_all(&self, packages: &[PackageRecord]) -> BulkOutcome {
        let Some(_guard) = BulkGuard::acquire(&self.vulns_running) else {
            info!("vulnerability check already running");
            return BulkOutcome::AlreadyRunning;
        };

        let mut report = BulkReport::default();
        let mut queries = Vec::with_capacity(packages.len());
        for record in packages {
            match version::clean(&record.version) {
                Some(cleaned) => queries.push(VulnQuery::new(&record.name, cleaned)),
                None => {
                    debug!(
                        name = %record.name,
                        version = %record.version,
                        "version spec is not queryable, skipping"
                    );
                    report.skipped += 1;
                }
            }
        }
        report.total = queries.len();

        let chunk_size = self.config.vuln_chunk_size.clamp(1, VULN_BATCH_API_LIMIT);
        let total_batches = queries.len().div_ceil(chunk_size);

        for (index, chunk) in queries.chunks(chunk_size).enumerate() {
            let ticket = self.issue_ticket();
            let result = self
                .client
                .query_vulnerabilities_batch(chunk)
                .await
                .and_then(|results| aligned(results, chunk.len()));
            self.record_request(m::KIND_VULNERABILITIES_BATCH, "querybatch", &result);
            let chunk_result = if result.is_ok() { m::RESULT_OK } else { m::RESULT_ERROR };
            metrics::counter!(m::VULN_CHUNKS_TOTAL, m::LABEL_RESULT => chunk_result).increment(1);

            match result {
                Ok(results) => {
                    for (query, advisories) in chunk.iter().zip(results) {
                        self.merge_scan_result(query, ticket, advisories, &mut report)
                            .await;
                    }
                }
                Err(_) => report.failed += chunk.len(),
            }

            report.batches += 1;
            self.events
                .send(CacheEvent::BatchSettled {
                    operation: BulkOperation::Vulnerabilities,
                    batch: index + 1,
                    total_batches,
                })
                .ok();
        }

        info!(
            total = report.total,
            flagged = report.flagged,
            failed = report.failed,
            chunks = report.batches,
            "vulnerability check finished"
        );
        BulkOutcome::Completed(report)
    }

    async fn merge_scan_result(
        &self,
        query: &VulnQuery,
        ticket: u64,
        advisories: Vec<Advisory>,
        report: &mut BulkReport,
    ) {
        let (name, version) = (query.name.as_str(), query.version.as_str());
        report.succeeded += 1;
        if advisories.is_empty() {
            self.cache.write().await.mark_clean(name, version);
            return;
        }
        report.flagged += 1;
        self.store(
            name,
            DetailField::Vulnerabilities,
            ticket,
            Lookup::Ready(advisories),
            |cache, ticket, value| cache.merge_vulnerabilities(name, version, ticket, value),
        )
        .await;
    }

    async fn refresh_latest(&self, name: &str) -> bool {
        let ticket = self.issue_ticket();
        let result = self.client.fetch_latest(name).await;
        self.record_request(m::KIND_REGISTRY, name, &result);
        let ok = result.is_ok();
        self.store(
            name,
            DetailField::Registry,
            ticket,
            Lookup::from(result),
            |cache, ticket, value| cache.merge_registry(name, ticket, value),
        )
        .await;
        ok
    }

    fn issue_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn record_request<T>(
        &self,
        kind: &'static str,
        target: &str,
        result: &Result<T, AnalyzerError>,
    ) {
        self.requests_issued.fetch_add(1, Ordering::Relaxed);
        let outcome = match result {
            Ok(_) => m::RESULT_OK,
            Err(e) => {
                self.requests_failed.fetch_add(1, Ordering::Relaxed);
                warn!(kind, target, error = %e, "upstream request failed");
                m::RESULT_ERROR
            }
        };
        metrics::counter!(
            m::UPSTREAM_REQUESTS_TOTAL,
            m::LABEL_KIND => kind,
            m::LABEL_RESULT => outcome
        )
        .increment(1);
    }

    async fn store<T>(
        &self,
        name: &str,
        field: DetailField,
        ticket: u64,
        value: Lookup<T>,
        merge: impl FnOnce(&mut PackageDetailsCache, u64, Lookup<T>) -> bool,
    ) -> bool {
        let applied = {
            let mut cache = self.cache.write().await;
            let applied = merge(&mut cache, ticket, value);
            metrics::gauge!(m::CACHE_ENTRIES).set(cache.len() as f64);
            applied
        };

        if applied {
            self.events
                .send(CacheEvent::Updated {
                    name: name.to_owned(),
                    field,
                })
                .ok();
        } else {
            debug!(name, ?field, ticket, "stale or failed result not merged");
        }
        applied
    }
}

fn aligned(
    results: Vec<Vec<Advisory>>,
    expected: usize,
) -> Result<Vec<Vec<Advisory>>, AnalyzerError> {
    if results.len() == expected {
        Ok(results)
    } else {
        Err(AnalyzerError::PartialResponse {
            target: "querybatch".to_owned(),
            reason: format!("expected {expected} results, got {}", results.len()),
        })
    }
}

/// [`BatchQueryOrchestrator`] 빌더
pub struct BatchQueryOrchestratorBuilder<C: UpstreamClient> {
    config: AnalyzerConfig,
    client: Option<Arc<C>>,
    event_capacity: usize,
}

impl<C: UpstreamClient> BatchQueryOrchestratorBuilder<C> {
    pub fn new() -> Self {
        Self {
            config: AnalyzerConfig::default(),
            client: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    pub fn config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }

    /// upstream 클라이언트를 설정합니다 (필수).
    pub fn client(mut self, client: Arc<C>) -> Self {
        self.client = Some(client);
        self
    }

    /// 이벤트 채널 용량을 설정합니다. 느린 구독자는 오래된 이벤트를 잃습니다.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn build(self) -> Result<BatchQueryOrchestrator<C>, AnalyzerError> {
        self.config.validate()?;

        let client = self.client.ok_or_else(|| AnalyzerError::Config {
            field: "client".to_owned(),
            reason: "upstream client must be provided".to_owned(),
        })?;

        let (events, _) = broadcast::channel(self.event_capacity.max(1));

        Ok(BatchQueryOrchestrator {
            client,
            config: self.config,
            cache: RwLock::new(PackageDetailsCache::new()),
            tickets: AtomicU64::new(0),
            events,
            updates_running: AtomicBool::new(false),
            vulns_running: AtomicBool::new(false),
            requests_issued: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
        })
    }
}

impl<C: UpstreamClient> Default for BatchQueryOrchestratorBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}
