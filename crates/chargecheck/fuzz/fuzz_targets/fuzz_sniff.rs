//! Fuzz target for structure sniffing.
//!
//! The sniffer must never panic and must always return a header row that
//! indexes into the scanned lines.

#![no_main]

use chargecheck::{sniff, RawPrefix, SniffConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let prefix = RawPrefix::from_bytes(data, 64 * 1024);
    let lines = prefix.lines();

    for delimiter in [b',', b'\t', b';', b'|'] {
        let result = sniff(&lines, &SniffConfig::default(), delimiter);
        assert!(lines.is_empty() || result.header_row < lines.len());
    }
});
