// src/engine.rs
//
// The image layer of the observation log:
// 1. Header sniffing for dimensions (no decoder, no allocation)
// 2. A probe that falls back to a real decoder when sniffing fails
// 3. Thumbnail generation and backfill passes over existing records
//
// This file is a facade over the modules in engine/

// =============================================================================
// SECURITY LIMITS
// =============================================================================

/// Maximum allowed image dimension (width or height).
/// Images larger than 32768x32768 are rejected to prevent decompression bombs.
/// This is the same limit used by libvips/sharp.
pub const MAX_DIMENSION: u32 = 32768;

/// Maximum allowed total pixels (width * height).
/// 100 megapixels = 400MB uncompressed RGBA. Beyond this is likely malicious.
pub const MAX_PIXELS: u64 = 100_000_000;

// =============================================================================
// MODULE DECOMPOSITION
// =============================================================================

pub(crate) mod backfill;
pub(crate) mod common;
pub(crate) mod decoder;
pub(crate) mod encoder;
pub(crate) mod io;
pub(crate) mod limits;
pub(crate) mod pool;
pub(crate) mod probe;
pub(crate) mod resize;
pub(crate) mod sniff;
#[cfg(feature = "napi")]
pub(crate) mod tasks;
pub(crate) mod thumbnail;

pub use backfill::{
    backfill_dimensions, backfill_thumbnails, BackfillSummary, ImageMetadata, ImageRecord,
};
pub use common::{run_with_panic_policy, EngineResult};
pub use decoder::{
    check_dimensions, decode_image, detect_format, ensure_dimensions_safe, DeepDecoder,
    ImageCrateDecoder,
};
pub use encoder::{encode, EncodeSettings, ThumbnailFormat};
pub use io::{write_atomic, Source};
pub use limits::{InputLimits, LimitPolicy};
pub use pool::get_pool;
pub use probe::{probe_dimensions, DimensionProbe, DimensionSource, ProbedDimensions};
pub use resize::{calc_fit_inside, fast_resize, ResizeError};
pub use sniff::{sniff, sniff_with_format, Dimensions, SniffedFormat};
#[cfg(feature = "napi")]
pub use tasks::{ImageDimensions, ProbeTask, ThumbnailPaths, ThumbnailTask};
pub use thumbnail::{
    generate_thumbnails, thumbnail_name_parts, Thumbnail, ThumbnailGenerator, Thumbnails,
};
