/*
[INPUT]:  Shared ImageService + coordinator settings
[OUTPUT]: Upload-then-process workflow over one image at a time
[POS]:    Orchestration layer - ties the two coordinators to a single handle
[UPDATE]: When the workflow between upload and processing changes
*/

use std::sync::Arc;

use imgpress_adapter::{ImageService, ImageUpload, ProcessedImage, UploadedImage, Url};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::{CoordinatorError, ValidationError};
use crate::options::{DEFAULT_QUALITY, OptionsForm, ProcessingOptions};
use crate::process::{ProcessCoordinator, ProcessSettings, ProcessState};
use crate::upload::{UploadCoordinator, UploadSettings, UploadState};

/// One upload coordinator and one process coordinator over a shared service.
///
/// Processing always targets the handle of the most recent successful upload.
pub struct Session<S: ImageService + ?Sized + 'static> {
    service: Arc<S>,
    upload: UploadCoordinator<S>,
    process: ProcessCoordinator<S>,
    default_quality: u8,
}

impl<S: ImageService + ?Sized + 'static> Session<S> {
    pub fn new(
        service: Arc<S>,
        upload_settings: UploadSettings,
        process_settings: ProcessSettings,
    ) -> Self {
        Self {
            upload: UploadCoordinator::new(service.clone(), upload_settings),
            process: ProcessCoordinator::new(service.clone(), process_settings),
            service,
            default_quality: DEFAULT_QUALITY,
        }
    }

    pub fn from_config(service: Arc<S>, config: &AppConfig) -> Self {
        let mut session = Self::new(service, config.upload_settings(), config.process_settings());
        session.default_quality = config.processing.default_quality;
        session
    }

    pub fn upload(&self) -> &UploadCoordinator<S> {
        &self.upload
    }

    pub fn process(&self) -> &ProcessCoordinator<S> {
        &self.process
    }

    /// Start uploading a new file.
    ///
    /// Once the upload is accepted, any processing of the previous handle is
    /// reset; a rejected file leaves the session untouched.
    pub fn start_upload(&self, upload: ImageUpload) -> Result<(), CoordinatorError> {
        self.upload.submit(upload)?;
        self.process.reset();
        Ok(())
    }

    /// Handle of the current upload, if it succeeded.
    pub fn uploaded_image(&self) -> Option<UploadedImage> {
        self.upload.state().image().cloned()
    }

    /// Options form seeded from the current handle.
    pub fn options_form(&self) -> Result<OptionsForm, ValidationError> {
        let image = self.uploaded_image().ok_or(ValidationError::MissingHandle)?;
        OptionsForm::with_default_quality(&image, self.default_quality)
    }

    pub fn start_processing(&self, options: &ProcessingOptions) -> Result<(), CoordinatorError> {
        let image = self.uploaded_image().ok_or(ValidationError::MissingHandle)?;
        self.process.submit(&image, options)
    }

    pub async fn wait_for_upload(&self) -> UploadState {
        self.upload.wait_until_settled().await
    }

    pub async fn wait_for_processing(&self) -> ProcessState {
        self.process.wait_until_settled().await
    }

    pub fn processed_image(&self) -> Option<ProcessedImage> {
        self.process.state().result().cloned()
    }

    /// Where the processed file can be fetched; never downloaded here.
    pub fn download_url(&self) -> imgpress_adapter::Result<Option<Url>> {
        match self.processed_image() {
            Some(result) => {
                let url = self.service.download_url(&result.processed_id)?;
                debug!(processed_id = %result.processed_id, %url, "download url resolved");
                Ok(Some(url))
            }
            None => Ok(None),
        }
    }

    /// Reset both coordinators to `Idle`.
    pub fn reset(&self) {
        self.process.reset();
        self.upload.reset();
        info!("session reset");
    }
}
