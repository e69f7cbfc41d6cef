// src/engine/decoder.rs
//
// Decoder side of the engine:
// - DeepDecoder: the optional dimension reader consulted when sniffing fails
// - full decodes for thumbnail generation: JPEG (mozjpeg), WebP (libwebp),
//   everything else through the image crate

use crate::engine::common::{run_with_panic_policy, EngineResult};
use crate::engine::sniff::{sniff, Dimensions};
use crate::engine::{MAX_DIMENSION, MAX_PIXELS};
use crate::error::ImagingError;
use image::{DynamicImage, ImageFormat, ImageReader, RgbImage};
use mozjpeg::Decompress;
use std::io::Cursor;
use webp::{BitstreamFeatures, Decoder as WebPDecoder};

/// A decoder-backed way to learn image dimensions when the header sniffer
/// does not recognise the buffer.
///
/// Implementations may be arbitrarily expensive; the probe only calls them
/// after `sniff` returned `None`.
pub trait DeepDecoder: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn decode_dimensions(&self, data: &[u8]) -> EngineResult<Dimensions>;
}

/// Deep decoder backed by the `image` crate's header readers. Covers what the
/// sniffer leaves out: lossless and extended WebP, GIF, BMP, exotic JPEG
/// frame types.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageCrateDecoder;

impl DeepDecoder for ImageCrateDecoder {
    fn name(&self) -> &'static str {
        "image"
    }

    fn decode_dimensions(&self, data: &[u8]) -> EngineResult<Dimensions> {
        run_with_panic_policy("probe:image", || {
            let reader = ImageReader::new(Cursor::new(data))
                .with_guessed_format()
                .map_err(|e| {
                    ImagingError::decode_failed(format!("failed to read image header: {e}"))
                })?;
            if reader.format().is_none() {
                return Err(ImagingError::unsupported_format("unknown"));
            }
            let (width, height) = reader.into_dimensions().map_err(|e| {
                ImagingError::decode_failed(format!("failed to read dimensions: {e}"))
            })?;
            Ok(Dimensions::new(width, height))
        })
    }
}

/// Decode JPEG using mozjpeg (backed by libjpeg-turbo)
pub fn decode_jpeg_mozjpeg(data: &[u8]) -> EngineResult<DynamicImage> {
    run_with_panic_policy("decode:mozjpeg", || {
        let decompress = Decompress::new_mem(data).map_err(|e| {
            ImagingError::decode_failed(format!("mozjpeg decompress init failed: {e:?}"))
        })?;

        let mut decompress = decompress.rgb().map_err(|e| {
            ImagingError::decode_failed(format!("mozjpeg rgb conversion failed: {e:?}"))
        })?;

        let width = decompress.width();
        let height = decompress.height();
        if width > MAX_DIMENSION as usize || height > MAX_DIMENSION as usize {
            return Err(ImagingError::dimension_exceeds_limit(
                width.max(height).min(u32::MAX as usize) as u32,
                MAX_DIMENSION,
            ));
        }
        let (width, height) = (width as u32, height as u32);
        check_dimensions(width, height)?;

        let pixels: Vec<[u8; 3]> = decompress.read_scanlines().map_err(|e| {
            ImagingError::decode_failed(format!("mozjpeg: failed to read scanlines: {e:?}"))
        })?;
        let flat: Vec<u8> = pixels.into_iter().flatten().collect();

        RgbImage::from_raw(width, height, flat)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| ImagingError::decode_failed("mozjpeg: scanline buffer too short"))
    })
}

/// Decode WebP using libwebp. Animated WebP goes through the image crate.
pub fn decode_webp_libwebp(data: &[u8]) -> EngineResult<DynamicImage> {
    run_with_panic_policy("decode:webp", || {
        // Parse features first to avoid allocating for malformed files
        let features = BitstreamFeatures::new(data)
            .ok_or_else(|| ImagingError::decode_failed("webp: failed to read bitstream features"))?;

        if features.has_animation() {
            return image::load_from_memory(data).map_err(|e| {
                ImagingError::decode_failed(format!("webp (animated) decode failed: {e}"))
            });
        }

        check_dimensions(features.width(), features.height())?;

        let decoded = WebPDecoder::new(data)
            .decode()
            .ok_or_else(|| ImagingError::decode_failed("webp: decode failed"))?;
        check_dimensions(decoded.width(), decoded.height())?;

        Ok(decoded.to_image())
    })
}

/// Decode any other format the image crate was built with.
pub fn decode_with_image_crate(data: &[u8]) -> EngineResult<DynamicImage> {
    run_with_panic_policy("decode:image", || {
        image::load_from_memory(data)
            .map_err(|e| ImagingError::decode_failed(format!("decode failed: {e}")))
    })
}

/// Detect input format using magic bytes. Returns None if unknown.
pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Unified decode entrypoint: detect once, route by format.
pub fn decode_image(bytes: &[u8]) -> EngineResult<(DynamicImage, Option<ImageFormat>)> {
    let detected = detect_format(bytes);
    let img = match detected {
        Some(ImageFormat::Jpeg) => decode_jpeg_mozjpeg(bytes)?,
        Some(ImageFormat::WebP) => decode_webp_libwebp(bytes)?,
        _ => decode_with_image_crate(bytes)?,
    };
    Ok((img, detected))
}

/// Check image dimensions against the global caps (decompression bombs).
pub fn check_dimensions(width: u32, height: u32) -> EngineResult<()> {
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(ImagingError::dimension_exceeds_limit(
            width.max(height),
            MAX_DIMENSION,
        ));
    }
    let pixels = width as u64 * height as u64;
    if pixels > MAX_PIXELS {
        return Err(ImagingError::pixel_count_exceeds_limit(pixels, MAX_PIXELS));
    }
    Ok(())
}

/// Header-level size check before a full decode. Uses the sniffer first and
/// the image crate's header reader second; unknown sizes pass, the decoder
/// checks again once it knows.
pub fn ensure_dimensions_safe(bytes: &[u8]) -> EngineResult<Option<Dimensions>> {
    let dims = sniff(bytes).or_else(|| {
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .ok()
            .and_then(|reader| reader.into_dimensions().ok())
            .map(Dimensions::from)
    });
    if let Some(dims) = dims {
        check_dimensions(dims.width, dims.height)?;
    }
    Ok(dims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Limit;
    use image::{GenericImageView, Rgb};

    fn encode_with_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 40]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), format)
            .unwrap();
        buf
    }

    fn encode_webp_lossless(width: u32, height: u32) -> Vec<u8> {
        let rgb: Vec<u8> = std::iter::repeat([10u8, 20u8, 30u8])
            .take((width * height) as usize)
            .flatten()
            .collect();
        webp::Encoder::from_rgb(&rgb, width, height)
            .encode_lossless()
            .to_vec()
    }

    #[test]
    fn image_crate_decoder_reads_lossless_webp() {
        let data = encode_webp_lossless(7, 5);
        // VP8L is outside the sniffer's reach
        assert_eq!(sniff(&data), None);
        let dims = ImageCrateDecoder.decode_dimensions(&data).unwrap();
        assert_eq!(dims, Dimensions::new(7, 5));
    }

    #[test]
    fn image_crate_decoder_reads_bmp() {
        let data = encode_with_image(3, 9, ImageFormat::Bmp);
        assert_eq!(
            ImageCrateDecoder.decode_dimensions(&data).unwrap(),
            Dimensions::new(3, 9)
        );
    }

    #[test]
    fn image_crate_decoder_rejects_garbage() {
        let err = ImageCrateDecoder
            .decode_dimensions(b"definitely not an image")
            .unwrap_err();
        assert!(matches!(err, ImagingError::UnsupportedFormat { .. }));
    }

    #[test]
    fn decode_image_routes_by_format() {
        let png = encode_with_image(4, 3, ImageFormat::Png);
        let (img, fmt) = decode_image(&png).unwrap();
        assert_eq!(fmt, Some(ImageFormat::Png));
        assert_eq!(img.dimensions(), (4, 3));

        let jpeg = encode_with_image(6, 2, ImageFormat::Jpeg);
        let (img, fmt) = decode_image(&jpeg).unwrap();
        assert_eq!(fmt, Some(ImageFormat::Jpeg));
        assert_eq!(img.dimensions(), (6, 2));

        let webp = encode_webp_lossless(3, 2);
        let (img, fmt) = decode_image(&webp).unwrap();
        assert_eq!(fmt, Some(ImageFormat::WebP));
        assert_eq!(img.to_rgb8().get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn decode_image_rejects_garbage() {
        assert!(decode_image(&[0u8; 64]).is_err());
    }

    #[test]
    fn check_dimensions_caps() {
        assert!(check_dimensions(MAX_DIMENSION, 1).is_ok());
        assert_eq!(
            check_dimensions(MAX_DIMENSION + 1, 1).unwrap_err().limit(),
            Some(Limit::Dimension)
        );
        assert_eq!(
            check_dimensions(20_000, 20_000).unwrap_err().limit(),
            Some(Limit::PixelCount)
        );
    }

    #[test]
    fn ensure_dimensions_safe_uses_sniffed_header() {
        // A bare PNG header claiming a huge image is rejected before decode.
        let mut header = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        header.extend_from_slice(&13u32.to_be_bytes());
        header.extend_from_slice(b"IHDR");
        header.extend_from_slice(&(MAX_DIMENSION + 1).to_be_bytes());
        header.extend_from_slice(&1u32.to_be_bytes());
        assert!(ensure_dimensions_safe(&header).is_err());

        let png = encode_with_image(8, 8, ImageFormat::Png);
        assert_eq!(
            ensure_dimensions_safe(&png).unwrap(),
            Some(Dimensions::new(8, 8))
        );
        assert_eq!(ensure_dimensions_safe(b"???").unwrap(), None);
    }
}
