//! Error types shared by the sampling engine and its boundary.

use thiserror::Error;

/// Engine-level errors.
///
/// Per-tick sampling failures never leave the session loop; everything else
/// is reported to the caller of the boundary operation that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PickerError {
    /// The sampled point lies outside every known monitor.
    #[error("no monitor under the sampled point")]
    NotFound,
    /// The magnifier target lies outside every known monitor.
    #[error("no monitor under the requested point")]
    ScreenNotFound,
    #[error("screen capture returned no image")]
    CaptureFailed,
    #[error("captured image has no readable pixel data")]
    DecodeFailed,
    #[error("png encoding failed: {0}")]
    EncodeFailed(String),
    /// The overlay surface could not be created.
    #[error("overlay unavailable: {0}")]
    Overlay(String),
    #[error("invalid hotkey chord: {0}")]
    InvalidChord(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// The engine thread is gone; requests can no longer be served.
    #[error("engine is not running")]
    EngineUnavailable,
    #[error("configuration error: {0}")]
    Config(String),
}

impl PickerError {
    /// Stable code reported across the command boundary.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::ScreenNotFound => "SCREEN_NOT_FOUND",
            Self::CaptureFailed => "CAPTURE_FAILED",
            Self::DecodeFailed => "DECODE_FAILED",
            Self::EncodeFailed(_) => "ENCODE_FAILED",
            Self::Overlay(_) => "OVERLAY_FAILED",
            Self::InvalidChord(_) => "INVALID_CHORD",
            Self::InvalidArguments(_) => "INVALID_ARGUMENTS",
            Self::EngineUnavailable => "ENGINE_UNAVAILABLE",
            Self::Config(_) => "CONFIG",
        }
    }
}

/// Result type for engine operations.
pub type PickerResult<T> = Result<T, PickerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(PickerError::ScreenNotFound.code(), "SCREEN_NOT_FOUND");
        assert_eq!(PickerError::InvalidChord("x".into()).code(), "INVALID_CHORD");
        assert_eq!(PickerError::EncodeFailed("io".into()).code(), "ENCODE_FAILED");
    }

    #[test]
    fn test_display_includes_detail() {
        let err = PickerError::InvalidArguments("missing x".into());
        assert_eq!(err.to_string(), "invalid arguments: missing x");
    }
}
