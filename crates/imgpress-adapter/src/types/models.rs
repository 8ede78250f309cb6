/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust model structs with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use serde::{Deserialize, Serialize};

/// Handle returned by `POST /images`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub id: String,
    pub original_name: String,
    pub file_size: u64,
    pub width: u32,
    pub height: u32,
    pub format: String,
}

impl UploadedImage {
    /// Width over height of the original image.
    ///
    /// Returns `None` for a degenerate zero-height image.
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.height == 0 || self.width == 0 {
            return None;
        }
        Some(f64::from(self.width) / f64::from(self.height))
    }
}

/// Terminal result of a processing job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedImage {
    pub processed_id: String,
    pub processed_size: u64,
    pub processed_width: u32,
    pub processed_height: u32,
    pub compression_ratio: f64,
}
