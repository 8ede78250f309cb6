/*
[INPUT]:  Scripted replies queued by unit tests
[OUTPUT]: In-memory ImageService with call counters and held (late) replies
[POS]:    Test infrastructure - shared by coordinator and session unit tests
[UPDATE]: When ImageService gains methods
*/

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use imgpress_adapter::{
    ImageService, ImageUpload, ImgpressError, ProcessSubmission, ProcessedImage,
    ProcessingRequest, ProcessingStatus, ProcessingStatusResponse, Result, UploadedImage, Url,
};
use tokio::sync::oneshot;

enum Reply<T> {
    Ready(Result<T>),
    Held(oneshot::Receiver<Result<T>>),
}

type Queue<T> = Mutex<VecDeque<Reply<T>>>;

/// Replies are consumed in FIFO order; an empty queue answers with an error.
#[derive(Default)]
pub(crate) struct ScriptedService {
    uploads: Queue<UploadedImage>,
    submissions: Queue<ProcessSubmission>,
    statuses: Queue<ProcessingStatusResponse>,
    status_fallback: Mutex<Option<ProcessingStatusResponse>>,
    upload_calls: AtomicUsize,
    process_calls: AtomicUsize,
    status_calls: AtomicUsize,
}

impl ScriptedService {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_upload(&self, reply: Result<UploadedImage>) {
        push(&self.uploads, Reply::Ready(reply));
    }

    pub(crate) fn hold_upload(&self) -> oneshot::Sender<Result<UploadedImage>> {
        hold(&self.uploads)
    }

    pub(crate) fn push_submission(&self, reply: Result<ProcessSubmission>) {
        push(&self.submissions, Reply::Ready(reply));
    }

    pub(crate) fn hold_submission(&self) -> oneshot::Sender<Result<ProcessSubmission>> {
        hold(&self.submissions)
    }

    pub(crate) fn push_status(&self, reply: Result<ProcessingStatusResponse>) {
        push(&self.statuses, Reply::Ready(reply));
    }

    pub(crate) fn hold_status(&self) -> oneshot::Sender<Result<ProcessingStatusResponse>> {
        hold(&self.statuses)
    }

    /// Answer every unscripted status check with `response`.
    pub(crate) fn always_status(&self, response: ProcessingStatusResponse) {
        *self.status_fallback.lock().expect("fallback lock") = Some(response);
    }

    pub(crate) fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn process_calls(&self) -> usize {
        self.process_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

fn push<T>(queue: &Queue<T>, reply: Reply<T>) {
    queue.lock().expect("queue lock").push_back(reply);
}

fn hold<T>(queue: &Queue<T>) -> oneshot::Sender<Result<T>> {
    let (tx, rx) = oneshot::channel();
    push(queue, Reply::Held(rx));
    tx
}

async fn next<T>(queue: &Queue<T>, what: &str) -> Result<T> {
    let reply = queue.lock().expect("queue lock").pop_front();
    match reply {
        Some(Reply::Ready(reply)) => reply,
        Some(Reply::Held(rx)) => rx.await.unwrap_or_else(|_| {
            Err(ImgpressError::InvalidResponse(format!("held {what} reply dropped")))
        }),
        None => Err(ImgpressError::InvalidResponse(format!("no scripted {what} reply"))),
    }
}

#[async_trait]
impl ImageService for ScriptedService {
    async fn upload_image(&self, _upload: ImageUpload) -> Result<UploadedImage> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        next(&self.uploads, "upload").await
    }

    async fn process_image(
        &self,
        _image_id: &str,
        _request: &ProcessingRequest,
    ) -> Result<ProcessSubmission> {
        self.process_calls.fetch_add(1, Ordering::SeqCst);
        next(&self.submissions, "process").await
    }

    async fn processing_status(&self, _image_id: &str) -> Result<ProcessingStatusResponse> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = !self.statuses.lock().expect("queue lock").is_empty();
        let fallback = if scripted {
            None
        } else {
            self.status_fallback.lock().expect("fallback lock").clone()
        };
        if let Some(fallback) = fallback {
            return Ok(fallback);
        }
        next(&self.statuses, "status").await
    }

    fn download_url(&self, processed_id: &str) -> Result<Url> {
        Ok(Url::parse(&format!(
            "http://images.test/api/images/{processed_id}/download"
        ))?)
    }
}

/// 2 MiB 1920x1080 JPEG handle.
pub(crate) fn photo() -> UploadedImage {
    UploadedImage {
        id: "img_1".to_string(),
        original_name: "photo.jpg".to_string(),
        file_size: 2 * 1024 * 1024,
        width: 1920,
        height: 1080,
        format: "jpeg".to_string(),
    }
}

pub(crate) fn photo_upload() -> ImageUpload {
    ImageUpload::new("photo.jpg", "image/jpeg", vec![0xFF; 2 * 1024 * 1024])
}

pub(crate) fn processed() -> ProcessedImage {
    ProcessedImage {
        processed_id: "proc_1".to_string(),
        processed_size: 800_000,
        processed_width: 960,
        processed_height: 540,
        compression_ratio: 58.3,
    }
}

pub(crate) fn status(status: ProcessingStatus, progress: f64) -> ProcessingStatusResponse {
    ProcessingStatusResponse {
        status,
        progress,
        message: None,
        result: None,
    }
}

pub(crate) fn completed() -> ProcessingStatusResponse {
    ProcessingStatusResponse {
        result: Some(processed()),
        ..status(ProcessingStatus::Completed, 100.0)
    }
}

pub(crate) fn failed(message: &str) -> ProcessingStatusResponse {
    ProcessingStatusResponse {
        message: Some(message.to_string()),
        ..status(ProcessingStatus::Failed, 0.0)
    }
}
