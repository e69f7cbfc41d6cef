#![no_main]

use alog_imaging::engine::ThumbnailGenerator;
use alog_imaging::ImagingConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(dir) = tempfile::tempdir() else {
        return;
    };
    let generator = ThumbnailGenerator::new(&ImagingConfig {
        thumbnail_edges: vec![16],
        ..ImagingConfig::default()
    });
    let _ = generator.generate(data, "fuzz.png", dir.path());
});
