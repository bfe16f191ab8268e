//! Fuzz target for the full validation pipeline.
//!
//! Any input must produce a well-formed report: either a fatal report
//! with a single counted error, or a summary that matches its checks.

#![no_main]

use chargecheck::{Engine, EngineConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Only process reasonable-sized inputs to avoid OOM
    if data.len() > 100_000 {
        return;
    }

    let Ok(engine) = Engine::with_builtin_rules(EngineConfig::default()) else {
        return;
    };
    let report = engine.validate_bytes("fuzz.csv", data);

    if report.is_fatal() {
        assert!(report.checks.is_empty());
        assert_eq!(report.summary.errors, 1);
    } else {
        assert_eq!(report.summary.total_checks, report.checks.len());
    }
});
