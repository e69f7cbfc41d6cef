// src/engine/sniff.rs
//
// Header sniffer: pixel dimensions of PNG, JPEG and lossy WebP straight from
// the container bytes, without touching a decoder.
//
// Every read goes through `be_u16` / `be_u32` / `le_u16`, which return None
// past the end of the buffer, so a truncated upload falls through to the next
// candidate format instead of panicking.

use serde::{Deserialize, Serialize};

const PNG_MIN_LEN: usize = 24;
const JPEG_MIN_LEN: usize = 2;
const WEBP_MIN_LEN: usize = 30;

/// Margin kept at the end of the buffer while scanning JPEG markers. The
/// furthest read from a marker position is the width field at +7..+9.
const JPEG_SCAN_MARGIN: usize = 8;

/// Start-Of-Frame markers that carry frame dimensions
/// (baseline, extended sequential, progressive, lossless).
const JPEG_SOF_MARKERS: std::ops::RangeInclusive<u8> = 0xC0..=0xC3;

/// VP8 stores 14-bit dimensions; the top two bits are the scaling code.
const VP8_DIMENSION_MASK: u16 = 0x3FFF;

/// Pixel dimensions read from an image header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// Which header layout produced a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SniffedFormat {
    Png,
    Jpeg,
    WebP,
}

impl SniffedFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SniffedFormat::Png => "png",
            SniffedFormat::Jpeg => "jpeg",
            SniffedFormat::WebP => "webp",
        }
    }
}

/// Read width and height from the header of a PNG, JPEG or lossy WebP buffer.
///
/// Returns `None` for anything else: unknown magic, truncated headers, JPEG
/// streams without a frame header, lossless (`VP8L`) and extended (`VP8X`)
/// WebP. Never panics, whatever the input.
pub fn sniff(buffer: &[u8]) -> Option<Dimensions> {
    sniff_with_format(buffer).map(|(_, dims)| dims)
}

/// Same as [`sniff`], also reporting which format matched.
pub fn sniff_with_format(buffer: &[u8]) -> Option<(SniffedFormat, Dimensions)> {
    sniff_png(buffer)
        .map(|dims| (SniffedFormat::Png, dims))
        .or_else(|| sniff_jpeg(buffer).map(|dims| (SniffedFormat::Jpeg, dims)))
        .or_else(|| sniff_webp(buffer).map(|dims| (SniffedFormat::WebP, dims)))
}

/// PNG: "PNG" at offset 1, IHDR width/height at 16 and 20.
fn sniff_png(buffer: &[u8]) -> Option<Dimensions> {
    if buffer.len() < PNG_MIN_LEN || buffer.get(1..4)? != b"PNG" {
        return None;
    }
    let width = be_u32(buffer, 16)?;
    let height = be_u32(buffer, 20)?;
    Some(Dimensions::new(width, height))
}

/// JPEG: walk marker segments after SOI until a SOF0..SOF3 frame header.
fn sniff_jpeg(buffer: &[u8]) -> Option<Dimensions> {
    if buffer.len() < JPEG_MIN_LEN || buffer[..2] != [0xFF, 0xD8] {
        return None;
    }

    let mut offset = 2usize;
    while offset + JPEG_SCAN_MARGIN < buffer.len() {
        if buffer[offset] != 0xFF {
            offset += 1;
            continue;
        }

        let marker = buffer[offset + 1];
        if JPEG_SOF_MARKERS.contains(&marker) {
            let height = be_u16(buffer, offset + 5)?;
            let width = be_u16(buffer, offset + 7)?;
            return Some(Dimensions::new(u32::from(width), u32::from(height)));
        }

        // The length field counts itself, so anything below 2 is corrupt.
        let segment_len = be_u16(buffer, offset + 2)?;
        if segment_len < 2 {
            return None;
        }
        offset = offset.checked_add(2 + usize::from(segment_len))?;
    }
    None
}

/// WebP: RIFF/WEBP container with a simple-profile "VP8 " chunk.
fn sniff_webp(buffer: &[u8]) -> Option<Dimensions> {
    if buffer.len() < WEBP_MIN_LEN
        || buffer.get(0..4)? != b"RIFF"
        || buffer.get(8..12)? != b"WEBP"
        || buffer.get(12..16)? != b"VP8 "
    {
        return None;
    }
    let width = le_u16(buffer, 26)? & VP8_DIMENSION_MASK;
    let height = le_u16(buffer, 28)? & VP8_DIMENSION_MASK;
    Some(Dimensions::new(u32::from(width), u32::from(height)))
}

#[inline]
fn be_u16(buffer: &[u8], offset: usize) -> Option<u16> {
    let bytes = buffer.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

#[inline]
fn le_u16(buffer: &[u8], offset: usize) -> Option<u16> {
    let bytes = buffer.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

#[inline]
fn be_u32(buffer: &[u8], offset: usize) -> Option<u32> {
    let bytes = buffer.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
