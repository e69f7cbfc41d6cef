// src/engine/common.rs
//
// Common utilities shared across engine modules.

use crate::error::ImagingError;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::error;

/// Engine-internal result type. Always carries `ImagingError` so the error
/// taxonomy survives until the NAPI boundary.
pub type EngineResult<T> = std::result::Result<T, ImagingError>;

/// Run a codec call, turning a panic inside third-party code into
/// `ImagingError::CodecPanic` instead of unwinding into the host.
pub fn run_with_panic_policy<T, F>(stage: &'static str, f: F) -> EngineResult<T>
where
    F: FnOnce() -> EngineResult<T>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            error!(target: "alog_imaging::engine", %stage, %message, "codec panicked");
            Err(ImagingError::codec_panic(stage, message))
        }
    }
}
