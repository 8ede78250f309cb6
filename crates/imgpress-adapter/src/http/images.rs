/*
[INPUT]:  Image payloads, image ids, and processing requests
[OUTPUT]: Upload handles, processing submissions, job status, download URLs
[POS]:    HTTP layer - image upload and processing endpoints
[UPDATE]: When adding new image endpoints or changing the completion protocol
*/

use crate::http::{ImageClient, ImgpressError, Result};
use crate::types::{
    ImageUpload, ProcessSubmission, ProcessingRequest, ProcessingStatus, ProcessingStatusResponse,
    UploadedImage,
};
use crate::types::responses::ProcessResponseBody;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode, Url};
use tracing::{debug, info};

/// Multipart field carrying the image bytes
const UPLOAD_FIELD: &str = "image";

impl ImageClient {
    /// Upload an image
    ///
    /// POST /images (multipart)
    pub async fn upload_image(&self, upload: ImageUpload) -> Result<UploadedImage> {
        info!(file_name = %upload.file_name, size = upload.size(), "uploading image");

        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.mime_type)?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let builder = self.request(Method::POST, "images")?.multipart(form);
        self.send_json(builder).await
    }

    /// Submit a processing job for an uploaded image
    ///
    /// POST /images/{id}/process
    ///
    /// `202 Accepted` or a `processing` status body means the job is deferred.
    pub async fn process_image(
        &self,
        image_id: &str,
        request: &ProcessingRequest,
    ) -> Result<ProcessSubmission> {
        let endpoint = format!("images/{}/process", image_id);
        let builder = self.request(Method::POST, &endpoint)?.json(request);
        let (status, body) = self.send_raw(builder).await?;

        if status == StatusCode::ACCEPTED {
            debug!(image_id, "processing deferred by 202");
            return Ok(ProcessSubmission::Deferred);
        }
        if !status.is_success() {
            return Err(ImgpressError::from_response(status, &body));
        }

        match serde_json::from_str::<ProcessResponseBody>(&body) {
            Ok(ProcessResponseBody::Result(result)) => Ok(ProcessSubmission::Immediate(result)),
            Ok(ProcessResponseBody::Status(status_body)) => submission_from_status(status_body),
            Err(err) => Err(ImgpressError::InvalidResponse(format!(
                "unrecognised processing response: {err}"
            ))),
        }
    }

    /// Query the status of a processing job
    ///
    /// GET /images/{id}/status
    pub async fn processing_status(&self, image_id: &str) -> Result<ProcessingStatusResponse> {
        let endpoint = format!("images/{}/status", image_id);
        let builder = self.request(Method::GET, &endpoint)?;
        self.send_json(builder).await
    }

    /// URL of the processed file; the client never downloads it itself
    ///
    /// GET /images/{processed_id}/download
    pub fn download_url(&self, processed_id: &str) -> Result<Url> {
        self.endpoint_url(&format!("images/{}/download", processed_id))
    }
}

fn submission_from_status(body: ProcessingStatusResponse) -> Result<ProcessSubmission> {
    match (body.status, body.result) {
        (ProcessingStatus::Processing, _) => Ok(ProcessSubmission::Deferred),
        (ProcessingStatus::Completed, Some(result)) => Ok(ProcessSubmission::Immediate(result)),
        (ProcessingStatus::Completed, None) => Err(ImgpressError::InvalidResponse(
            "completed status without a result".to_string(),
        )),
        (ProcessingStatus::Failed, _) => Err(ImgpressError::Processing {
            message: body.message.unwrap_or_else(|| "Processing failed".to_string()),
        }),
    }
}
