/*
[INPUT]:  Rejected submissions (bad input, coordinator already busy)
[OUTPUT]: Synchronous errors returned from coordinator `submit` calls
[POS]:    Error layer - everything the caller must fix before work can start
[UPDATE]: When adding validation rules or new rejection reasons
*/

use thiserror::Error;

/// Client-side input problems, detected before any network I/O
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unsupported image type {mime_type:?}: only JPEG, PNG and GIF are accepted")]
    UnsupportedMimeType { mime_type: String },

    #[error("file too large: {size} bytes exceeds the {max} byte limit")]
    FileTooLarge { size: u64, max: u64 },

    #[error("no uploaded image to process")]
    MissingHandle,

    #[error("quality must be between 1 and 100, got {quality}")]
    InvalidQuality { quality: u8 },

    #[error("width and height must be positive, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("height {actual} does not follow the locked aspect ratio (expected {expected})")]
    AspectRatioMismatch { expected: u32, actual: u32 },

    #[error("height is derived from width while the aspect ratio is locked")]
    HeightLocked,

    #[error("original image has no usable dimensions ({width}x{height})")]
    DegenerateImage { width: u32, height: u32 },
}

/// Reasons a coordinator refuses to start work
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("coordinator is busy ({state}); reset before submitting again")]
    Busy { state: &'static str },
}

impl CoordinatorError {
    pub fn is_validation(&self) -> bool {
        matches!(self, CoordinatorError::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        let err = CoordinatorError::from(ValidationError::FileTooLarge {
            size: 10 * 1024 * 1024 + 1,
            max: 10 * 1024 * 1024,
        });
        assert!(err.is_validation());
        assert_eq!(
            err.to_string(),
            "validation failed: file too large: 10485761 bytes exceeds the 10485760 byte limit"
        );
    }

    #[test]
    fn test_busy_is_not_validation() {
        let err = CoordinatorError::Busy { state: "polling" };
        assert!(!err.is_validation());
        assert_eq!(
            err.to_string(),
            "coordinator is busy (polling); reset before submitting again"
        );
    }
}
