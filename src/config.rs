// src/config.rs
//
// Runtime configuration. Defaults match what the web application expects;
// the environment can override them at startup.

use crate::engine::encoder::EncodeSettings;
use crate::engine::limits::{InputLimits, LimitPolicy};
use crate::error::ImagingError;
use std::str::FromStr;

pub const DEFAULT_THUMBNAIL_EDGES: [u32; 2] = [500, 1000];

pub const ENV_DEEP_DECODE: &str = "ALOG_IMAGE_DEEP_DECODE";
pub const ENV_THUMBNAIL_EDGES: &str = "ALOG_IMAGE_THUMBNAIL_EDGES";
pub const ENV_JPEG_QUALITY: &str = "ALOG_IMAGE_JPEG_QUALITY";
pub const ENV_WEBP_QUALITY: &str = "ALOG_IMAGE_WEBP_QUALITY";
pub const ENV_LIMITS: &str = "ALOG_IMAGE_LIMITS";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImagingConfig {
    /// Fall back to a decoder when the header sniffer does not recognise a
    /// buffer.
    pub deep_decode: bool,
    /// Bounding-box edges of the generated thumbnails.
    pub thumbnail_edges: Vec<u32>,
    pub encode: EncodeSettings,
    pub limits: InputLimits,
}

impl Default for ImagingConfig {
    fn default() -> Self {
        Self {
            deep_decode: true,
            thumbnail_edges: DEFAULT_THUMBNAIL_EDGES.to_vec(),
            encode: EncodeSettings::default(),
            limits: InputLimits::default(),
        }
    }
}

impl ImagingConfig {
    /// Defaults overlaid with `ALOG_IMAGE_*` variables from the process
    /// environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit lookup, so tests
    /// don't have to mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        overlay(&lookup, ENV_DEEP_DECODE, parse_bool, |v| config.deep_decode = v);
        overlay(&lookup, ENV_THUMBNAIL_EDGES, parse_edges, |v| {
            config.thumbnail_edges = v
        });
        overlay(&lookup, ENV_JPEG_QUALITY, |raw| parse_quality("jpeg_quality", raw), |v| {
            config.encode.jpeg_quality = v
        });
        overlay(&lookup, ENV_WEBP_QUALITY, |raw| parse_quality("webp_quality", raw), |v| {
            config.encode.webp_quality = v
        });
        overlay(&lookup, ENV_LIMITS, LimitPolicy::from_str, |v| {
            config.limits = InputLimits::apply_policy(v)
        });

        config
    }
}

fn overlay<T, L, P, S>(lookup: &L, key: &str, parse: P, mut set: S)
where
    L: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Result<T, ImagingError>,
    S: FnMut(T),
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match parse(&raw) {
        Ok(value) => set(value),
        Err(e) => tracing::warn!(
            target: "alog_imaging::config",
            key,
            value = %raw,
            error = %e,
            "ignoring invalid configuration value"
        ),
    }
}

pub fn parse_bool(raw: &str) -> Result<bool, ImagingError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ImagingError::invalid_config(
            "deep_decode",
            raw.to_string(),
            "Expected true or false",
        )),
    }
}

/// Comma-separated list of positive edges, e.g. `500,1000`. Duplicates are
/// dropped and the result is sorted.
pub fn parse_edges(raw: &str) -> Result<Vec<u32>, ImagingError> {
    let invalid = || {
        ImagingError::invalid_config(
            "thumbnail_edges",
            raw.to_string(),
            "Expected a comma-separated list of positive integers",
        )
    };
    let mut edges = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part.parse::<u32>() {
            Ok(edge) if edge > 0 => Ok(edge),
            _ => Err(invalid()),
        })
        .collect::<Result<Vec<_>, _>>()?;
    if edges.is_empty() {
        return Err(invalid());
    }
    edges.sort_unstable();
    edges.dedup();
    Ok(edges)
}

pub fn parse_quality(name: &'static str, raw: &str) -> Result<u8, ImagingError> {
    match raw.trim().parse::<u8>() {
        Ok(q) if (1..=100).contains(&q) => Ok(q),
        _ => Err(ImagingError::invalid_config(
            name,
            raw.to_string(),
            "Expected an integer between 1 and 100",
        )),
    }
}
