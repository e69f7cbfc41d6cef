// src/engine/encoder.rs
//
// Thumbnail encoders: JPEG (mozjpeg), PNG (image crate), WebP (libwebp).
// Thumbnails keep the container format of the upload they were cut from.

use crate::engine::common::{run_with_panic_policy, EngineResult};
use crate::engine::MAX_DIMENSION;
use crate::error::ImagingError;
use image::{DynamicImage, ImageFormat, RgbImage};
use mozjpeg::{ColorSpace, Compress};
use std::borrow::Cow;
use std::io::Cursor;

pub const DEFAULT_JPEG_QUALITY: u8 = 80;
pub const DEFAULT_WEBP_QUALITY: u8 = 80;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThumbnailFormat {
    Jpeg,
    Png,
    WebP,
}

impl ThumbnailFormat {
    /// Pick the format from an upload's (lowercased) extension.
    pub fn from_extension(ext: &str) -> EngineResult<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::WebP),
            other => Err(ImagingError::unsupported_format(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodeSettings {
    pub jpeg_quality: u8,
    pub webp_quality: u8,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            webp_quality: DEFAULT_WEBP_QUALITY,
        }
    }
}

pub fn encode(
    img: &DynamicImage,
    format: ThumbnailFormat,
    settings: &EncodeSettings,
) -> EngineResult<Vec<u8>> {
    match format {
        ThumbnailFormat::Jpeg => encode_jpeg(img, settings.jpeg_quality),
        ThumbnailFormat::Png => encode_png(img),
        ThumbnailFormat::WebP => encode_webp(img, settings.webp_quality),
    }
}

fn rgb_view(img: &DynamicImage) -> Cow<'_, RgbImage> {
    match img {
        DynamicImage::ImageRgb8(rgb) => Cow::Borrowed(rgb),
        _ => Cow::Owned(img.to_rgb8()),
    }
}

/// Encode to progressive 4:2:0 JPEG using mozjpeg.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> EngineResult<Vec<u8>> {
    run_with_panic_policy("encode:jpeg", || {
        let rgb = rgb_view(img);
        let (w, h) = rgb.dimensions();
        if w == 0 || h == 0 {
            return Err(ImagingError::encode_failed("jpeg", "image has a zero side"));
        }
        if w > MAX_DIMENSION || h > MAX_DIMENSION {
            return Err(ImagingError::dimension_exceeds_limit(w.max(h), MAX_DIMENSION));
        }

        let mut comp = Compress::new(ColorSpace::JCS_RGB);
        comp.set_size(w as usize, h as usize);
        comp.set_color_space(ColorSpace::JCS_YCbCr);
        comp.set_quality(quality.min(100) as f32);
        comp.set_chroma_sampling_pixel_sizes((2, 2), (2, 2));
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);

        let mut output = Vec::with_capacity((w as usize * h as usize / 4).max(4096));
        {
            let mut writer = comp.start_compress(&mut output).map_err(|e| {
                ImagingError::encode_failed("jpeg", format!("mozjpeg: failed to start compress: {e:?}"))
            })?;
            let stride = w as usize * 3;
            for row in rgb.as_raw().chunks(stride) {
                writer.write_scanlines(row).map_err(|e| {
                    ImagingError::encode_failed(
                        "jpeg",
                        format!("mozjpeg: failed to write scanlines: {e:?}"),
                    )
                })?;
            }
            writer.finish().map_err(|e| {
                ImagingError::encode_failed("jpeg", format!("mozjpeg: failed to finish: {e:?}"))
            })?;
        }
        Ok(output)
    })
}

/// Encode to PNG using the image crate.
pub fn encode_png(img: &DynamicImage) -> EngineResult<Vec<u8>> {
    run_with_panic_policy("encode:png", || {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| ImagingError::encode_failed("png", format!("PNG encode failed: {e}")))?;
        Ok(buf)
    })
}

/// Encode to lossy WebP with libwebp. Alpha is kept only when present.
pub fn encode_webp(img: &DynamicImage, quality: u8) -> EngineResult<Vec<u8>> {
    run_with_panic_policy("encode:webp", || {
        let quality = quality.min(100) as f32;
        let mem = if img.color().has_alpha() {
            let rgba = img.to_rgba8();
            let (w, h) = rgba.dimensions();
            webp::Encoder::from_rgba(&rgba, w, h).encode(quality)
        } else {
            let rgb = rgb_view(img);
            let (w, h) = rgb.dimensions();
            webp::Encoder::from_rgb(&rgb, w, h).encode(quality)
        };
        if mem.is_empty() {
            return Err(ImagingError::encode_failed("webp", "libwebp returned no data"));
        }
        Ok(mem.to_vec())
    })
}
