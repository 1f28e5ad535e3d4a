#![no_main]
use libfuzzer_sys::fuzz_target;
use weighline_core::{WeightStatus, parse_photocell, parse_weight};

fuzz_target!(|data: &str| {
    let p = parse_weight(data);
    // Parser never reports transport-level disconnection, and errors carry 0.
    assert_ne!(p.status, WeightStatus::Disconnected);
    if p.status == WeightStatus::Error {
        assert_eq!(p.value, 0.0);
    } else {
        assert!(p.value.is_finite());
    }
    let _ = parse_photocell(data);
});
