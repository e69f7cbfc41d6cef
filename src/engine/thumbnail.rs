// src/engine/thumbnail.rs
//
// Thumbnail generation for uploaded observation images.
//
// For every configured edge N the upload gets a `<base>_thumbN.<ext>` file next
// to it, resized to fit an N x N box, but only when the image is larger than N
// on at least one side. Thumbnails keep the upload's extension and format.

use crate::config::ImagingConfig;
use crate::engine::decoder::{decode_image, ensure_dimensions_safe};
use crate::engine::encoder::{encode, EncodeSettings, ThumbnailFormat};
use crate::engine::io::write_atomic;
use crate::engine::limits::InputLimits;
use crate::engine::resize::{calc_fit_inside, fast_resize};
use crate::engine::sniff::Dimensions;
use crate::error::{ImagingError, Result};
use std::path::{Path, PathBuf};

const DEFAULT_EXTENSION: &str = "jpg";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Thumbnail {
    /// Bounding-box edge this thumbnail was generated for.
    pub edge: u32,
    pub path: PathBuf,
    pub dimensions: Dimensions,
}

/// Thumbnails written for one upload, smallest edge first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Thumbnails {
    entries: Vec<Thumbnail>,
}

impl Thumbnails {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Thumbnail> {
        self.entries.iter()
    }

    pub fn get(&self, edge: u32) -> Option<&Path> {
        self.iter()
            .find(|t| t.edge == edge)
            .map(|t| t.path.as_path())
    }

    pub fn thumb500(&self) -> Option<&Path> {
        self.get(500)
    }

    pub fn thumb1000(&self) -> Option<&Path> {
        self.get(1000)
    }
}

/// Split an upload file name into (stem, lowercased extension) at the last
/// dot. A name without extension gets `jpg`; `.png` is an empty stem with
/// extension `png`.
pub fn thumbnail_name_parts(filename: &str) -> Result<(String, String)> {
    let name = Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            ImagingError::invalid_config(
                "filename",
                filename.to_string(),
                "Expected a file name",
            )
        })?;
    let parts = match name.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => (stem.to_string(), ext.to_ascii_lowercase()),
        _ => (name, DEFAULT_EXTENSION.to_string()),
    };
    Ok(parts)
}

#[derive(Clone, Debug)]
pub struct ThumbnailGenerator {
    edges: Vec<u32>,
    encode: EncodeSettings,
    limits: InputLimits,
}

impl Default for ThumbnailGenerator {
    fn default() -> Self {
        Self::new(&ImagingConfig::default())
    }
}

impl ThumbnailGenerator {
    pub fn new(config: &ImagingConfig) -> Self {
        let mut edges: Vec<u32> = config
            .thumbnail_edges
            .iter()
            .copied()
            .filter(|&e| e > 0)
            .collect();
        edges.sort_unstable();
        edges.dedup();
        Self {
            edges,
            encode: config.encode,
            limits: config.limits.clone(),
        }
    }

    pub fn edges(&self) -> &[u32] {
        &self.edges
    }

    /// Write thumbnails for `data` (the upload named `filename`) into
    /// `output_dir`, creating the directory if needed.
    pub fn generate(
        &self,
        data: &[u8],
        filename: &str,
        output_dir: impl AsRef<Path>,
    ) -> Result<Thumbnails> {
        let output_dir = output_dir.as_ref();
        let (stem, ext) = thumbnail_name_parts(filename)?;
        let format = ThumbnailFormat::from_extension(&ext)?;

        self.limits.enforce_source_len(data.len())?;
        if let Some(dims) = ensure_dimensions_safe(data)? {
            self.limits.enforce_pixels(dims.width, dims.height)?;
            if !self.edges.iter().any(|&e| needs_thumbnail(dims, e)) {
                tracing::debug!(
                    target: "alog_imaging::thumbnail",
                    filename,
                    width = dims.width,
                    height = dims.height,
                    "image already fits every thumbnail size"
                );
                return Ok(Thumbnails::default());
            }
        }

        let (img, _) = decode_image(data)?;
        let dims = Dimensions::new(img.width(), img.height());
        self.limits.enforce_pixels(dims.width, dims.height)?;

        let mut thumbnails = Thumbnails::default();
        for &edge in &self.edges {
            if !needs_thumbnail(dims, edge) {
                continue;
            }
            if thumbnails.is_empty() {
                std::fs::create_dir_all(output_dir).map_err(|e| {
                    ImagingError::write_failed(output_dir.to_string_lossy().to_string(), e)
                })?;
            }

            let (width, height) = calc_fit_inside(dims.width, dims.height, edge, edge);
            let resized = fast_resize(img.clone(), width, height)?;
            let bytes = encode(&resized, format, &self.encode)?;

            let path = output_dir.join(format!("{stem}_thumb{edge}.{ext}"));
            let written = write_atomic(&path, &bytes)?;
            tracing::info!(
                target: "alog_imaging::thumbnail",
                path = %path.display(),
                edge,
                format = format.as_str(),
                width,
                height,
                bytes = written,
                "thumbnail written"
            );
            thumbnails.entries.push(Thumbnail {
                edge,
                path,
                dimensions: Dimensions::new(width, height),
            });
        }
        Ok(thumbnails)
    }

    /// Like [`generate`](Self::generate), but a failure is logged and yields
    /// no thumbnails. Uploads must not fail because a thumbnail could not be
    /// made.
    pub fn generate_or_empty(
        &self,
        data: &[u8],
        filename: &str,
        output_dir: impl AsRef<Path>,
    ) -> Thumbnails {
        let output_dir = output_dir.as_ref();
        self.generate(data, filename, output_dir)
            .unwrap_or_else(|e| {
                tracing::warn!(
                    target: "alog_imaging::thumbnail",
                    filename,
                    output_dir = %output_dir.display(),
                    code = e.category().code(),
                    error = %e,
                    "thumbnail generation failed"
                );
                Thumbnails::default()
            })
    }
}

fn needs_thumbnail(dims: Dimensions, edge: u32) -> bool {
    dims.width > edge || dims.height > edge
}

/// Generate the default 500/1000 thumbnails, never failing.
pub fn generate_thumbnails(
    data: &[u8],
    filename: &str,
    output_dir: impl AsRef<Path>,
) -> Thumbnails {
    ThumbnailGenerator::default().generate_or_empty(data, filename, output_dir)
}
