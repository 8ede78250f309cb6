/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust response structs with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use serde::{Deserialize, Serialize};

use super::enums::ProcessingStatus;
use super::models::ProcessedImage;

/// Body of `GET /images/{id}/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStatusResponse {
    pub status: ProcessingStatus,
    #[serde(default)]
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ProcessedImage>,
}

impl ProcessingStatusResponse {
    /// Progress clamped into `0..=100`; NaN reads as 0.
    pub fn progress_percent(&self) -> u8 {
        if self.progress.is_nan() {
            return 0;
        }
        self.progress.clamp(0.0, 100.0).round() as u8
    }
}

/// How the service answered a processing submission
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessSubmission {
    /// The result is already available
    Immediate(ProcessedImage),
    /// The job runs in the background and must be polled
    Deferred,
}

/// Either body a `200` from `POST /images/{id}/process` may carry
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProcessResponseBody {
    Result(ProcessedImage),
    Status(ProcessingStatusResponse),
}
