#![no_main]

use alog_imaging::engine::{DimensionProbe, DimensionSource};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Some(probed) = DimensionProbe::new().probe(data) {
        // Whatever the sniffer accepts must be reported as sniffed.
        if alog_imaging::sniff(data).is_some() {
            assert!(matches!(probed.source, DimensionSource::Sniffed(_)));
        }
    }
});
