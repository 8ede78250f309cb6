/*
[INPUT]:  Public API exports for imgpress-orchestrator crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod config;
pub mod error;
pub mod options;
pub mod process;
pub mod session;
pub mod status;
pub mod upload;

mod guard;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use config::AppConfig;
pub use error::{CoordinatorError, ValidationError};
pub use options::{OptionsForm, ProcessingOptions};
pub use process::{ProcessCoordinator, ProcessSettings, ProcessState};
pub use session::Session;
pub use status::{FailureKind, StateView, TaskFailure};
pub use upload::{MAX_UPLOAD_BYTES, UploadCoordinator, UploadSettings, UploadState};
