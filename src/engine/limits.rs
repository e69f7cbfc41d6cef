// src/engine/limits.rs
//
// Input limits applied before an upload is fully decoded (thumbnails).
// Sniffing and header-level probing are never limited: they only read a
// bounded prefix.

use crate::error::ImagingError;
use std::str::FromStr;

const STRICT_MAX_PIXELS: u64 = 40_000_000; // ~8K x 5K
const LENIENT_MAX_PIXELS: u64 = 75_000_000; // below the global MAX_PIXELS
const STRICT_MAX_BYTES: u64 = 32 * 1024 * 1024;
const LENIENT_MAX_BYTES: u64 = 48 * 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LimitPolicy {
    Unbounded,
    Strict,
    Lenient,
}

impl FromStr for LimitPolicy {
    type Err = ImagingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "unbounded" => Ok(Self::Unbounded),
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            _ => Err(ImagingError::invalid_config(
                "limits",
                value.to_string(),
                "Expected strict, lenient or none",
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputLimits {
    pub policy: LimitPolicy,
    pub max_bytes: Option<u64>,
    pub max_pixels: Option<u64>,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self::lenient()
    }
}

impl InputLimits {
    pub fn unbounded() -> Self {
        Self {
            policy: LimitPolicy::Unbounded,
            max_bytes: None,
            max_pixels: None,
        }
    }

    pub fn strict() -> Self {
        Self {
            policy: LimitPolicy::Strict,
            max_bytes: Some(STRICT_MAX_BYTES),
            max_pixels: Some(STRICT_MAX_PIXELS),
        }
    }

    pub fn lenient() -> Self {
        Self {
            policy: LimitPolicy::Lenient,
            max_bytes: Some(LENIENT_MAX_BYTES),
            max_pixels: Some(LENIENT_MAX_PIXELS),
        }
    }

    pub fn apply_policy(policy: LimitPolicy) -> Self {
        match policy {
            LimitPolicy::Unbounded => Self::unbounded(),
            LimitPolicy::Strict => Self::strict(),
            LimitPolicy::Lenient => Self::lenient(),
        }
    }

    pub fn enforce_source_len(&self, len: usize) -> Result<(), ImagingError> {
        if let Some(limit) = self.max_bytes {
            let len_u64 = len as u64;
            if len_u64 > limit {
                return Err(ImagingError::input_too_large(len_u64, limit));
            }
        }
        Ok(())
    }

    pub fn enforce_pixels(&self, width: u32, height: u32) -> Result<(), ImagingError> {
        if let Some(limit) = self.max_pixels {
            let pixels = width as u64 * height as u64;
            if pixels > limit {
                return Err(ImagingError::pixel_count_exceeds_limit(pixels, limit));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Limit;

    #[test]
    fn strict_policy_enforces_pixels_and_bytes() {
        let limits = InputLimits::strict();
        assert!(limits.enforce_pixels(4000, 4000).is_ok());
        assert!(limits.enforce_pixels(7000, 7000).is_err());
        assert!(limits.enforce_source_len(1024).is_ok());
        let err = limits
            .enforce_source_len(STRICT_MAX_BYTES as usize + 1)
            .unwrap_err();
        assert!(err.limit() == Some(Limit::InputBytes));
    }

    #[test]
    fn lenient_is_default_and_wider_than_strict() {
        let limits = InputLimits::default();
        assert_eq!(limits.policy, LimitPolicy::Lenient);
        assert!(limits.enforce_pixels(7000, 7000).is_ok());
        assert!(limits.enforce_pixels(10_000, 10_000).is_err());
    }

    #[test]
    fn unbounded_accepts_everything() {
        let limits = InputLimits::unbounded();
        assert!(limits.enforce_pixels(u32::MAX, u32::MAX).is_ok());
        assert!(limits.enforce_source_len(usize::MAX).is_ok());
    }

    #[test]
    fn policy_parsing() {
        assert_eq!("Strict".parse::<LimitPolicy>().unwrap(), LimitPolicy::Strict);
        assert_eq!(" none ".parse::<LimitPolicy>().unwrap(), LimitPolicy::Unbounded);
        assert!("paranoid".parse::<LimitPolicy>().is_err());
        assert_eq!(
            InputLimits::apply_policy(LimitPolicy::Strict),
            InputLimits::strict()
        );
    }
}
