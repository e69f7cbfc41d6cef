// src/engine/probe.rs
//
// Two-step dimension lookup: the header sniffer first, then (optionally) a
// deep decoder for whatever the sniffer does not recognise.

use crate::config::ImagingConfig;
use crate::engine::decoder::{DeepDecoder, ImageCrateDecoder};
use crate::engine::io::Source;
use crate::engine::pool;
use crate::engine::sniff::{sniff_with_format, Dimensions, SniffedFormat};
use crate::error::Result;
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Which step produced the dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "format")]
pub enum DimensionSource {
    Sniffed(SniffedFormat),
    Decoded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ProbedDimensions {
    #[serde(flatten)]
    pub dimensions: Dimensions,
    pub source: DimensionSource,
}

#[derive(Clone)]
pub struct DimensionProbe {
    deep_decoder: Option<Arc<dyn DeepDecoder>>,
}

impl fmt::Debug for DimensionProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DimensionProbe")
            .field("deep_decoder", &self.deep_decoder.as_ref().map(|d| d.name()))
            .finish()
    }
}

impl Default for DimensionProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl DimensionProbe {
    /// Sniffer plus the `image` crate as deep decoder.
    pub fn new() -> Self {
        Self::with_decoder(Arc::new(ImageCrateDecoder))
    }

    /// Sniffer only. Buffers it does not recognise are `None`.
    pub fn sniff_only() -> Self {
        Self { deep_decoder: None }
    }

    pub fn with_decoder(decoder: Arc<dyn DeepDecoder>) -> Self {
        Self {
            deep_decoder: Some(decoder),
        }
    }

    pub fn from_config(config: &ImagingConfig) -> Self {
        if config.deep_decode {
            Self::new()
        } else {
            Self::sniff_only()
        }
    }

    pub fn has_deep_decoder(&self) -> bool {
        self.deep_decoder.is_some()
    }

    pub fn probe(&self, data: &[u8]) -> Option<ProbedDimensions> {
        if let Some((format, dimensions)) = sniff_with_format(data) {
            return Some(ProbedDimensions {
                dimensions,
                source: DimensionSource::Sniffed(format),
            });
        }

        let decoder = self.deep_decoder.as_ref()?;
        match decoder.decode_dimensions(data) {
            Ok(dimensions) => {
                tracing::debug!(
                    target: "alog_imaging::probe",
                    decoder = decoder.name(),
                    width = dimensions.width,
                    height = dimensions.height,
                    "dimensions from deep decoder"
                );
                Some(ProbedDimensions {
                    dimensions,
                    source: DimensionSource::Decoded,
                })
            }
            Err(e) => {
                tracing::warn!(
                    target: "alog_imaging::probe",
                    decoder = decoder.name(),
                    len = data.len(),
                    error = %e,
                    "could not determine image dimensions"
                );
                None
            }
        }
    }

    /// Probe an upload on disk. I/O failures are errors; an unrecognised
    /// image is `Ok(None)`.
    pub fn probe_file(&self, path: impl AsRef<Path>) -> Result<Option<ProbedDimensions>> {
        let source = Source::open(path.as_ref())?;
        let probed = match source.as_bytes() {
            Some(bytes) => self.probe(bytes),
            None => self.probe(&source.load()?),
        };
        Ok(probed)
    }

    /// Probe many buffers on the global pool. Output order matches input.
    pub fn probe_batch(&self, inputs: &[&[u8]]) -> Vec<Option<ProbedDimensions>> {
        pool::install(|| inputs.par_iter().map(|data| self.probe(data)).collect())
    }
}

/// Dimensions of `data` using the default probe (sniffer, then `image`).
pub fn probe_dimensions(data: &[u8]) -> Option<Dimensions> {
    DimensionProbe::new().probe(data).map(|p| p.dimensions)
}
