// src/error.rs
//
// Errors of the imaging layer.
//
// Header sniffing never produces one: an unrecognised buffer is `None`. Errors
// come from reading uploads, decoding them for thumbnails, writing thumbnails
// back, and from configuration values.
//
// Each error falls in one ErrorCategory, and the category code is what the
// JavaScript side branches on.

#[cfg(feature = "napi")]
use napi::bindgen_prelude::*;
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCategory {
    /// Bad input or configuration from the caller
    UserError,
    /// The bytes are not an image we can decode or encode
    CodecError,
    /// Size limits, missing permissions, full disks
    ResourceLimit,
    /// A codec panicked
    InternalBug,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserError => "UserError",
            Self::CodecError => "CodecError",
            Self::ResourceLimit => "ResourceLimit",
            Self::InternalBug => "InternalBug",
        }
    }

    /// `error.code` value exposed to JavaScript callers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UserError => "ALOG_IMAGE_USER_ERROR",
            Self::CodecError => "ALOG_IMAGE_CODEC_ERROR",
            Self::ResourceLimit => "ALOG_IMAGE_RESOURCE_LIMIT",
            Self::InternalBug => "ALOG_IMAGE_INTERNAL_BUG",
        }
    }
}

/// Which limit an upload ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// Width or height in pixels
    Dimension,
    /// width * height
    PixelCount,
    /// Encoded size in bytes
    InputBytes,
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Limit::Dimension => "image dimension",
            Limit::PixelCount => "pixel count",
            Limit::InputBytes => "input size in bytes",
        })
    }
}

#[derive(Debug, Error)]
pub enum ImagingError {
    #[error("No such file: {path}")]
    NotFound { path: Cow<'static, str> },

    #[error("Could not read '{path}': {source}")]
    Read {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not memory-map '{path}': {source}")]
    Map {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not write '{path}': {source}")]
    Write {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported image format: {format}")]
    UnsupportedFormat { format: Cow<'static, str> },

    #[error("Decode failed: {message}")]
    Decode { message: Cow<'static, str> },

    #[error("{limit} {actual} exceeds the maximum of {max}")]
    LimitExceeded { limit: Limit, actual: u64, max: u64 },

    #[error("Resize {}x{} -> {}x{} failed: {message}", .from.0, .from.1, .to.0, .to.1)]
    Resize {
        from: (u32, u32),
        to: (u32, u32),
        message: Cow<'static, str>,
    },

    #[error("{format} encode failed: {message}")]
    Encode {
        format: &'static str,
        message: Cow<'static, str>,
    },

    #[error("Invalid value for {key}: {value:?}. {reason}")]
    InvalidConfig {
        key: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("Codec panicked during {stage}: {message}")]
    CodecPanic { stage: &'static str, message: String },
}

impl ImagingError {
    pub fn not_found(path: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn read_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub fn map_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::Map {
            path: path.into(),
            source,
        }
    }

    pub fn write_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    pub fn unsupported_format(format: impl Into<Cow<'static, str>>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn decode_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn dimension_exceeds_limit(dimension: u32, max: u32) -> Self {
        Self::LimitExceeded {
            limit: Limit::Dimension,
            actual: dimension.into(),
            max: max.into(),
        }
    }

    pub fn pixel_count_exceeds_limit(pixels: u64, max: u64) -> Self {
        Self::LimitExceeded {
            limit: Limit::PixelCount,
            actual: pixels,
            max,
        }
    }

    pub fn input_too_large(bytes: u64, max: u64) -> Self {
        Self::LimitExceeded {
            limit: Limit::InputBytes,
            actual: bytes,
            max,
        }
    }

    pub fn resize_failed(
        from: (u32, u32),
        to: (u32, u32),
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::Resize {
            from,
            to,
            message: message.into(),
        }
    }

    pub fn encode_failed(format: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self::Encode {
            format,
            message: message.into(),
        }
    }

    pub fn invalid_config(key: &'static str, value: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidConfig {
            key,
            value: value.into(),
            reason,
        }
    }

    pub fn codec_panic(stage: &'static str, message: impl Into<String>) -> Self {
        Self::CodecPanic {
            stage,
            message: message.into(),
        }
    }

    /// The limit this error reports, if it is a limit error.
    pub fn limit(&self) -> Option<Limit> {
        match self {
            Self::LimitExceeded { limit, .. } => Some(*limit),
            _ => None,
        }
    }

    /// UserError and ResourceLimit can be fixed by the caller or operator.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::UserError | ErrorCategory::ResourceLimit
        )
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } | Self::InvalidConfig { .. } => ErrorCategory::UserError,
            Self::UnsupportedFormat { .. }
            | Self::Decode { .. }
            | Self::Resize { .. }
            | Self::Encode { .. } => ErrorCategory::CodecError,
            Self::LimitExceeded { .. } | Self::Read { .. } | Self::Map { .. } | Self::Write { .. } => {
                ErrorCategory::ResourceLimit
            }
            Self::CodecPanic { .. } => ErrorCategory::InternalBug,
        }
    }
}

#[cfg(feature = "napi")]
impl From<ImagingError> for napi::Error {
    fn from(err: ImagingError) -> Self {
        let category = err.category();
        let status = match category {
            ErrorCategory::UserError | ErrorCategory::CodecError => Status::InvalidArg,
            ErrorCategory::ResourceLimit | ErrorCategory::InternalBug => Status::GenericFailure,
        };
        // The code leads the message so JS callers can branch on it.
        napi::Error::new(status, format!("[{}] {}", category.code(), err))
    }
}

pub type Result<T> = std::result::Result<T, ImagingError>;
