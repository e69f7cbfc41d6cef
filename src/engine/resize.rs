// src/engine/resize.rs
//
// Thumbnail geometry and resampling.

use crate::error::ImagingError;
use fast_image_resize::{self as fir, PixelType, ResizeOptions};
use image::{imageops::FilterType, DynamicImage, RgbImage, RgbaImage};

#[derive(Debug, Clone)]
pub struct ResizeError {
    pub source_dims: (u32, u32),
    pub target_dims: (u32, u32),
    pub reason: String,
}

impl ResizeError {
    pub fn new(
        source_dims: (u32, u32),
        target_dims: (u32, u32),
        reason: impl Into<String>,
    ) -> Self {
        Self {
            source_dims,
            target_dims,
            reason: reason.into(),
        }
    }
}

impl From<ResizeError> for ImagingError {
    fn from(err: ResizeError) -> Self {
        ImagingError::resize_failed(err.source_dims, err.target_dims, err.reason)
    }
}

/// Fit `orig` inside a `box_w` x `box_h` box, keeping the aspect ratio and
/// never enlarging. Non-empty input never yields a zero side.
pub fn calc_fit_inside(orig_w: u32, orig_h: u32, box_w: u32, box_h: u32) -> (u32, u32) {
    if orig_w == 0 || orig_h == 0 || (orig_w <= box_w && orig_h <= box_h) {
        return (orig_w, orig_h);
    }

    let scale = f64::min(
        box_w as f64 / orig_w as f64,
        box_h as f64 / orig_h as f64,
    );
    let width = ((orig_w as f64 * scale).round() as u32).clamp(1, box_w.max(1));
    let height = ((orig_h as f64 * scale).round() as u32).clamp(1, box_h.max(1));
    (width, height)
}

/// Lanczos3 resize through fast_image_resize, falling back to the image
/// crate when the SIMD path refuses the buffer.
pub fn fast_resize(
    img: DynamicImage,
    dst_width: u32,
    dst_height: u32,
) -> Result<DynamicImage, ResizeError> {
    let src_dims = (img.width(), img.height());
    let dst_dims = (dst_width, dst_height);
    if src_dims.0 == 0 || src_dims.1 == 0 || dst_width == 0 || dst_height == 0 {
        return Err(ResizeError::new(src_dims, dst_dims, "invalid dimensions for resize"));
    }

    // Only RGB8 and RGBA8 go through fir; other layouts are widened to RGBA8.
    let (pixel_type, src_pixels) = match img {
        DynamicImage::ImageRgb8(rgb) => (PixelType::U8x3, rgb.into_raw()),
        DynamicImage::ImageRgba8(rgba) => (PixelType::U8x4, rgba.into_raw()),
        other => (PixelType::U8x4, other.to_rgba8().into_raw()),
    };

    match resize_with_fir(src_dims, &src_pixels, pixel_type, dst_dims) {
        Ok(img) => Ok(img),
        Err(primary) => {
            tracing::debug!(
                target: "alog_imaging::resize",
                error = %primary,
                "fir resize failed, using image crate"
            );
            resize_with_image_crate(src_dims, src_pixels, pixel_type, dst_dims)
                .map_err(|fallback| {
                    ResizeError::new(
                        src_dims,
                        dst_dims,
                        format!("{primary}; image crate fallback failed: {fallback}"),
                    )
                })
        }
    }
}

fn resize_with_fir(
    (src_width, src_height): (u32, u32),
    src_pixels: &[u8],
    pixel_type: PixelType,
    (dst_width, dst_height): (u32, u32),
) -> Result<DynamicImage, String> {
    let src_image =
        fir::images::Image::from_vec_u8(src_width, src_height, src_pixels.to_vec(), pixel_type)
            .map_err(|e| format!("fir source image error: {e:?}"))?;
    let mut dst_image = fir::images::Image::new(dst_width, dst_height, pixel_type);

    let options = ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Lanczos3));
    fir::Resizer::new()
        .resize(&src_image, &mut dst_image, &options)
        .map_err(|e| format!("fir resize error: {e:?}"))?;

    pixels_to_image(dst_width, dst_height, dst_image.into_vec(), pixel_type)
}

fn resize_with_image_crate(
    (src_width, src_height): (u32, u32),
    src_pixels: Vec<u8>,
    pixel_type: PixelType,
    (dst_width, dst_height): (u32, u32),
) -> Result<DynamicImage, String> {
    let src = pixels_to_image(src_width, src_height, src_pixels, pixel_type)?;
    Ok(src.resize_exact(dst_width, dst_height, FilterType::Lanczos3))
}

fn pixels_to_image(
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    pixel_type: PixelType,
) -> Result<DynamicImage, String> {
    match pixel_type {
        PixelType::U8x3 => RgbImage::from_raw(width, height, pixels)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| "rgb buffer does not match dimensions".to_string()),
        PixelType::U8x4 => RgbaImage::from_raw(width, height, pixels)
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(|| "rgba buffer does not match dimensions".to_string()),
        other => Err(format!("unsupported pixel type {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, LumaA, Rgb};

    #[test]
    fn fit_inside_landscape_and_portrait() {
        assert_eq!(calc_fit_inside(4000, 3000, 500, 500), (500, 375));
        assert_eq!(calc_fit_inside(3000, 4000, 1000, 1000), (750, 1000));
        assert_eq!(calc_fit_inside(1200, 1200, 500, 500), (500, 500));
    }

    #[test]
    fn fit_inside_never_enlarges() {
        assert_eq!(calc_fit_inside(320, 200, 500, 500), (320, 200));
        assert_eq!(calc_fit_inside(500, 500, 500, 500), (500, 500));
    }

    #[test]
    fn fit_inside_extreme_aspect_keeps_one_pixel() {
        assert_eq!(calc_fit_inside(100_000, 10, 500, 500), (500, 1));
        assert_eq!(calc_fit_inside(0, 10, 500, 500), (0, 10));
    }

    #[test]
    fn fast_resize_rgb() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 20, Rgb([200, 10, 10])));
        let out = fast_resize(img, 10, 5).unwrap();
        assert_eq!(out.dimensions(), (10, 5));
        let px = out.to_rgb8().get_pixel(5, 2).0;
        assert!(px[0] > 190 && px[1] < 20);
    }

    #[test]
    fn fast_resize_widens_other_layouts() {
        let img = DynamicImage::ImageLumaA8(image::ImageBuffer::from_pixel(8, 8, LumaA([90, 255])));
        let out = fast_resize(img, 4, 4).unwrap();
        assert_eq!(out.dimensions(), (4, 4));
        assert!(matches!(out, DynamicImage::ImageRgba8(_)));
    }

    #[test]
    fn fast_resize_rejects_zero_target() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
        let err = fast_resize(img, 0, 1).unwrap_err();
        assert_eq!(err.source_dims, (2, 2));
        assert_eq!(err.target_dims, (0, 1));
        let err: ImagingError = err.into();
        assert!(matches!(err, ImagingError::Resize { .. }));
    }
}
