//! Common error types for pipette-platform.

use pipette_core::PickerError;
use thiserror::Error;

/// Platform-level errors.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("no displays found")]
    NoDisplays,
    #[error("screen capture failed: {0}")]
    Capture(String),
    #[error("captured image has no pixel data")]
    NoPixelData,
    #[error("overlay window failed: {0}")]
    Window(String),
    #[error("keyboard listener failed: {0}")]
    Keyboard(String),
    #[error("pointer unavailable: {0}")]
    Pointer(String),
}

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

impl From<PlatformError> for PickerError {
    fn from(e: PlatformError) -> Self {
        match e {
            PlatformError::NoDisplays => PickerError::ScreenNotFound,
            PlatformError::NoPixelData => PickerError::DecodeFailed,
            PlatformError::Capture(_) => PickerError::CaptureFailed,
            PlatformError::Window(msg) => PickerError::Overlay(msg),
            other => PickerError::Overlay(other.to_string()),
        }
    }
}
