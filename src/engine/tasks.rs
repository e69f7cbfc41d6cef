// src/engine/tasks.rs
//
// Async task implementations for NAPI.
// These tasks run on the libuv pool and don't block the Node.js main thread.

use crate::engine::io::Source;
use crate::engine::probe::{DimensionProbe, DimensionSource, ProbedDimensions};
use crate::engine::thumbnail::{ThumbnailGenerator, Thumbnails};
use napi::bindgen_prelude::*;
use napi::{Env, Task};
use std::path::PathBuf;

/// Dimensions returned to JavaScript.
#[napi(object)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
    /// "png", "jpeg" or "webp" when read from the header, None when a decoder
    /// had to be used.
    pub format: Option<String>,
    /// "sniffed" or "decoded"
    pub source: String,
}

impl From<ProbedDimensions> for ImageDimensions {
    fn from(value: ProbedDimensions) -> Self {
        let (format, source) = match value.source {
            DimensionSource::Sniffed(format) => (Some(format.as_str().to_string()), "sniffed"),
            DimensionSource::Decoded => (None, "decoded"),
        };
        Self {
            width: value.dimensions.width,
            height: value.dimensions.height,
            format,
            source: source.to_string(),
        }
    }
}

/// Thumbnail paths returned to JavaScript, matching the keys the application
/// stores in image metadata.
#[napi(object)]
pub struct ThumbnailPaths {
    pub thumb500: Option<String>,
    pub thumb1000: Option<String>,
}

impl From<Thumbnails> for ThumbnailPaths {
    fn from(value: Thumbnails) -> Self {
        let to_string = |p: &std::path::Path| p.to_string_lossy().into_owned();
        Self {
            thumb500: value.thumb500().map(to_string),
            thumb1000: value.thumb1000().map(to_string),
        }
    }
}

pub struct ProbeTask {
    pub(crate) source: Source,
    pub(crate) probe: DimensionProbe,
}

#[napi]
impl Task for ProbeTask {
    type Output = Option<ProbedDimensions>;
    type JsValue = Option<ImageDimensions>;

    fn compute(&mut self) -> Result<Self::Output> {
        if let Some(path) = self.source.as_path() {
            return self.probe.probe_file(path).map_err(napi::Error::from);
        }
        let data = self.source.load().map_err(napi::Error::from)?;
        Ok(self.probe.probe(&data))
    }

    fn resolve(&mut self, _env: Env, output: Self::Output) -> Result<Self::JsValue> {
        Ok(output.map(ImageDimensions::from))
    }
}

pub struct ThumbnailTask {
    pub(crate) data: Vec<u8>,
    pub(crate) filename: String,
    pub(crate) output_dir: PathBuf,
    pub(crate) generator: ThumbnailGenerator,
}

#[napi]
impl Task for ThumbnailTask {
    type Output = Thumbnails;
    type JsValue = ThumbnailPaths;

    // Never rejects: a failed thumbnail must not fail the upload.
    fn compute(&mut self) -> Result<Self::Output> {
        Ok(self
            .generator
            .generate_or_empty(&self.data, &self.filename, &self.output_dir))
    }

    fn resolve(&mut self, _env: Env, output: Self::Output) -> Result<Self::JsValue> {
        Ok(output.into())
    }
}
