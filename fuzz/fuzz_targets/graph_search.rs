#![no_main]

use std::collections::BTreeMap;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use depscope_analyzer::{DepType, GraphSearch, ManifestInfo, PackageGraph, PackageRecord};

/// 퍼저용 구조적 그래프 입력, 순환을 자유롭게 만든다
#[derive(Arbitrary, Debug)]
struct FuzzGraph {
    roots: Vec<u8>,
    nodes: Vec<FuzzNode>,
    query: String,
    max_paths: u8,
}

#[derive(Arbitrary, Debug)]
struct FuzzNode {
    version: u8,
    requires: Vec<u8>,
}

fn node_name(index: u8) -> String {
    format!("pkg-{}", index % 32)
}

fuzz_target!(|input: FuzzGraph| {
    let records: Vec<PackageRecord> = input
        .nodes
        .iter()
        .take(64)
        .enumerate()
        .map(|(i, node)| {
            let mut record = PackageRecord::new(
                node_name(i as u8),
                format!("1.{}.0", node.version % 4),
                DepType::Prod,
            );
            record.requires = node
                .requires
                .iter()
                .take(8)
                .map(|target| (node_name(*target), "^1.0.0".to_owned()))
                .collect::<BTreeMap<_, _>>();
            record
        })
        .collect();

    let root = ManifestInfo {
        name: Some("fuzz-root".to_owned()),
        dependencies: input
            .roots
            .iter()
            .take(8)
            .map(|target| (node_name(*target), "^1.0.0".to_owned()))
            .collect(),
        ..Default::default()
    };

    let graph = PackageGraph::new(root, records);
    let max_paths = usize::from(input.max_paths).max(1);
    let result = GraphSearch::new(&graph, max_paths).search(&input.query);

    assert!(result.paths.len() <= max_paths);
    for path in &result.paths {
        // 한 경로 안에서 같은 노드는 반복되지 않는다
        for (i, node) in path.iter().enumerate() {
            assert!(!path[..i].contains(node));
        }
    }
});
