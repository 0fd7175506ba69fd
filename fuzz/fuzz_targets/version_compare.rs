#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use depscope_analyzer::version;
use depscope_analyzer::vuln::{AffectedRange, RangeEvent, is_affected};

#[derive(Arbitrary, Debug)]
struct FuzzVersions {
    a: String,
    b: String,
    introduced: Option<String>,
    fixed: Option<String>,
}

fuzz_target!(|input: FuzzVersions| {
    // 비교는 반대칭이어야 한다
    let forward = version::compare(&input.a, &input.b);
    let backward = version::compare(&input.b, &input.a);
    assert_eq!(forward, backward.reverse());

    if let Some(cleaned) = version::clean(&input.a) {
        assert!(cleaned.starts_with(|c: char| c.is_ascii_digit()));
    }

    let mut events = Vec::new();
    if let Some(v) = input.introduced {
        events.push(RangeEvent::introduced(v));
    }
    if let Some(v) = input.fixed {
        events.push(RangeEvent::fixed(v));
    }
    let range = AffectedRange {
        range_type: Some("SEMVER".to_owned()),
        events,
    };
    let _ = is_affected(&input.a, &range);
});
