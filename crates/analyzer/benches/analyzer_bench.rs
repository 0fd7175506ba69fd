//! 분석기 벤치마크
//!
//! lockfile 정규화, 그래프 검색, 버전 비교 / 범위 매칭 성능을 측정합니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use depscope_analyzer::{
    Advisory, GraphSearch, ManifestIngester, PackageGraph, find_applicable_fix, version,
};

/// v3 lockfile 생성 (count개 패키지, 각 패키지는 앞의 두 패키지를 요구)
fn generate_lockfile(count: usize) -> String {
    let mut packages = Vec::with_capacity(count + 1);
    packages.push(format!(
        r#""": {{"name": "bench-app", "version": "1.0.0", "dependencies": {{"package-{}": "^1.0.0"}}}}"#,
        count - 1
    ));

    for i in 0..count {
        let mut requires = Vec::new();
        for j in [i.wrapping_sub(1), i.wrapping_sub(2)] {
            if j < i {
                requires.push(format!(r#""package-{j}": "^1.0.0""#));
            }
        }
        packages.push(format!(
            r#""node_modules/package-{i}": {{"version": "1.{}.0", "dependencies": {{{}}}}}"#,
            i % 100,
            requires.join(", ")
        ));
    }

    format!(
        r#"{{"name": "bench-app", "lockfileVersion": 3, "packages": {{{}}}}}"#,
        packages.join(",\n")
    )
}

fn bench_lockfile_ingest(c: &mut Criterion) {
    let ingester = ManifestIngester::new();
    let mut group = c.benchmark_group("lockfile_ingest");

    for size in [10usize, 100, 1000] {
        let lockfile = generate_lockfile(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &lockfile, |b, input| {
            b.iter(|| ingester.ingest(black_box(input), "package-lock.json").unwrap())
        });
    }

    group.finish();
}

fn bench_graph_search(c: &mut Criterion) {
    let ingester = ManifestIngester::new();
    let mut group = c.benchmark_group("graph_search");

    for size in [20usize, 200] {
        let manifest = ingester
            .ingest(&generate_lockfile(size), "package-lock.json")
            .unwrap();
        let graph = PackageGraph::from_manifest(&manifest);
        let search = GraphSearch::new(&graph, 1000);

        // 팬인이 큰 DAG: 일치 없는 부분 트리 재방문 비용
        group.bench_function(BenchmarkId::new("miss", size), |b| {
            b.iter(|| search.search(black_box("\"does-not-exist\"")))
        });
        group.bench_function(BenchmarkId::new("leaf_hit", size), |b| {
            b.iter(|| search.search(black_box("\"package-0\"")))
        });
    }

    group.finish();
}

fn bench_version_matching(c: &mut Criterion) {
    let advisories: Vec<Advisory> = (0..50)
        .map(|i| {
            serde_json::from_value(serde_json::json!({
                "id": format!("GHSA-bench-{i}"),
                "affected": [{"ranges": [{"events": [
                    {"introduced": format!("{i}.0.0")},
                    {"fixed": format!("{i}.5.0")}
                ]}]}]
            }))
            .unwrap()
        })
        .collect();

    let mut group = c.benchmark_group("version_matching");

    group.bench_function("compare", |b| {
        b.iter(|| version::compare(black_box("^4.17.21"), black_box("4.17.3-beta.1")))
    });

    group.throughput(Throughput::Elements(50));
    group.bench_function("find_fix_last_advisory", |b| {
        b.iter(|| find_applicable_fix(black_box("49.2.0"), black_box(&advisories)))
    });
    group.bench_function("find_fix_gap", |b| {
        b.iter(|| find_applicable_fix(black_box("49.7.0"), black_box(&advisories)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_lockfile_ingest,
    bench_graph_search,
    bench_version_matching
);
criterion_main!(benches);
