#![no_main]

use libfuzzer_sys::fuzz_target;
use depscope_analyzer::{GraphSearch, ManifestIngester, PackageGraph};

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        let ingester = ManifestIngester::new();
        if let Ok(manifest) = ingester.ingest(content, "fuzz/package-lock.json") {
            // 로딩에 성공한 입력은 검색도 종료되어야 한다
            let graph = PackageGraph::from_manifest(&manifest);
            let _ = GraphSearch::new(&graph, 64).search("es");
        }
    }
});
