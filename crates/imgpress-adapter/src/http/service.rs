/*
[INPUT]:  Image payloads, image ids, processing requests
[OUTPUT]: Object-safe async seam over the processing service
[POS]:    HTTP layer - abstraction used by orchestration code and test doubles
[UPDATE]: When an endpoint is added that orchestration code needs
*/

use async_trait::async_trait;
use reqwest::Url;

use crate::http::{ImageClient, Result};
use crate::types::{
    ImageUpload, ProcessSubmission, ProcessingRequest, ProcessingStatusResponse, UploadedImage,
};

/// Operations the orchestration layer needs from the processing service.
#[async_trait]
pub trait ImageService: Send + Sync {
    async fn upload_image(&self, upload: ImageUpload) -> Result<UploadedImage>;

    async fn process_image(
        &self,
        image_id: &str,
        request: &ProcessingRequest,
    ) -> Result<ProcessSubmission>;

    async fn processing_status(&self, image_id: &str) -> Result<ProcessingStatusResponse>;

    fn download_url(&self, processed_id: &str) -> Result<Url>;
}

#[async_trait]
impl ImageService for ImageClient {
    async fn upload_image(&self, upload: ImageUpload) -> Result<UploadedImage> {
        ImageClient::upload_image(self, upload).await
    }

    async fn process_image(
        &self,
        image_id: &str,
        request: &ProcessingRequest,
    ) -> Result<ProcessSubmission> {
        ImageClient::process_image(self, image_id, request).await
    }

    async fn processing_status(&self, image_id: &str) -> Result<ProcessingStatusResponse> {
        ImageClient::processing_status(self, image_id).await
    }

    fn download_url(&self, processed_id: &str) -> Result<Url> {
        ImageClient::download_url(self, processed_id)
    }
}
