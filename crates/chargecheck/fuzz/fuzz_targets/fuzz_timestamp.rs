//! Fuzz target for timestamp parsing and column type inference.

#![no_main]

use chargecheck::schema::{infer_column_type, parse_timestamp};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = parse_timestamp(s);
        let _ = infer_column_type(s.split('\n'));
    }
});
