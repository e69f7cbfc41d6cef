#![no_main]

use alog_imaging::engine::sniff_with_format;
use alog_imaging::sniff;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let dims = sniff(data);
    assert_eq!(sniff_with_format(data).map(|(_, d)| d), dims);
});
