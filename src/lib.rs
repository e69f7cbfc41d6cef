// lib.rs
//
// alog-imaging: the native image layer of the observation log
//
// - Dimensions of PNG, JPEG and lossy WebP uploads straight from the header
// - Decoder fallback for everything else
// - 500/1000 px thumbnails next to the upload
// - Non-blocking async API for Node.js (feature "napi")

#[cfg(feature = "napi")]
#[macro_use]
extern crate napi_derive;

// Memory allocator optimization - jemalloc for the Node.js addon
// Note: jemalloc is not supported on Windows/MSVC, so we exclude it on that platform
#[cfg(all(feature = "jemalloc", not(target_env = "msvc")))]
#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

pub mod config;
pub mod engine;
pub mod error;

pub use config::ImagingConfig;
pub use engine::{sniff, Dimensions};
pub use error::{ImagingError, Result};

#[cfg(feature = "napi")]
use engine::{DimensionProbe, ImageDimensions, ProbeTask, Source, ThumbnailGenerator, ThumbnailTask};
#[cfg(feature = "napi")]
use napi::bindgen_prelude::*;
#[cfg(feature = "napi")]
use std::path::PathBuf;
#[cfg(feature = "napi")]
use std::sync::{Arc, OnceLock};

/// Configuration read once from the environment on first use by the addon.
#[cfg(feature = "napi")]
fn addon_config() -> &'static ImagingConfig {
    static CONFIG: OnceLock<ImagingConfig> = OnceLock::new();
    CONFIG.get_or_init(ImagingConfig::from_env)
}

#[cfg(feature = "napi")]
/// Read width and height from a PNG, JPEG or lossy WebP header.
/// Synchronous; returns null for anything else.
#[napi(js_name = "sniff")]
pub fn sniff_dimensions(buffer: Buffer) -> Option<ImageDimensions> {
    engine::sniff_with_format(buffer.as_ref()).map(|(format, dimensions)| {
        engine::ProbedDimensions {
            dimensions,
            source: engine::DimensionSource::Sniffed(format),
        }
        .into()
    })
}

#[cfg(feature = "napi")]
/// Image dimensions from a buffer: header first, decoder second.
/// Resolves to null when neither recognises the data.
#[napi(ts_return_type = "Promise<ImageDimensions | null>")]
pub fn get_image_dimensions(buffer: Buffer) -> AsyncTask<ProbeTask> {
    AsyncTask::new(ProbeTask {
        source: Source::Memory(Arc::new(buffer.to_vec())),
        probe: DimensionProbe::from_config(addon_config()),
    })
}

#[cfg(feature = "napi")]
/// Image dimensions from a file path without loading it into the V8 heap.
#[napi(
    js_name = "getImageDimensionsFromFile",
    ts_return_type = "Promise<ImageDimensions | null>"
)]
pub fn get_image_dimensions_from_file(path: String) -> AsyncTask<ProbeTask> {
    AsyncTask::new(ProbeTask {
        source: Source::Path(PathBuf::from(path)),
        probe: DimensionProbe::from_config(addon_config()),
    })
}

#[cfg(feature = "napi")]
/// Write `<base>_thumb500.<ext>` / `<base>_thumb1000.<ext>` into `outputDir`.
/// Never rejects; failures resolve to an object without paths.
#[napi(ts_return_type = "Promise<ThumbnailPaths>")]
pub fn generate_thumbnails(
    buffer: Buffer,
    filename: String,
    output_dir: String,
) -> AsyncTask<ThumbnailTask> {
    AsyncTask::new(ThumbnailTask {
        data: buffer.to_vec(),
        filename,
        output_dir: PathBuf::from(output_dir),
        generator: ThumbnailGenerator::new(addon_config()),
    })
}

#[cfg(feature = "napi")]
/// Get library version
#[napi]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
