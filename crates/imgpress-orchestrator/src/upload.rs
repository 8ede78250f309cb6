/*
[INPUT]:  Image file payload + ImageService
[OUTPUT]: UploadState published on a watch channel (Idle/Uploading/Succeeded/Failed)
[POS]:    Orchestration layer - single-file upload lifecycle
[UPDATE]: When changing validation rules, progress feedback, or staleness handling
*/

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use imgpress_adapter::{ImageMimeType, ImageService, ImageUpload, UploadedImage};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{CoordinatorError, ValidationError};
use crate::guard::TaskGuard;
use crate::status::{StateView, TaskFailure};

/// Largest file accepted for upload (10 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Synthetic progress feedback while the transfer is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSettings {
    pub progress_tick: Duration,
    pub progress_step: u8,
    /// Upper bound of the synthetic ramp; must stay below 100.
    pub progress_ceiling: u8,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            progress_tick: Duration::from_millis(100),
            progress_step: 10,
            progress_ceiling: 90,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadState {
    Idle,
    Uploading { progress: u8 },
    Succeeded(UploadedImage),
    Failed(TaskFailure),
}

impl UploadState {
    pub fn image(&self) -> Option<&UploadedImage> {
        match self {
            UploadState::Succeeded(image) => Some(image),
            _ => None,
        }
    }
}

impl StateView for UploadState {
    fn name(&self) -> &'static str {
        match self {
            UploadState::Idle => "idle",
            UploadState::Uploading { .. } => "uploading",
            UploadState::Succeeded(_) => "succeeded",
            UploadState::Failed(_) => "failed",
        }
    }

    fn progress(&self) -> u8 {
        match self {
            UploadState::Uploading { progress } => *progress,
            UploadState::Succeeded(_) => 100,
            UploadState::Idle | UploadState::Failed(_) => 0,
        }
    }

    fn is_active(&self) -> bool {
        matches!(self, UploadState::Uploading { .. })
    }

    fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Succeeded(_) | UploadState::Failed(_))
    }

    fn failure(&self) -> Option<&TaskFailure> {
        match self {
            UploadState::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Client-side checks run before any network I/O.
pub fn validate_upload(upload: &ImageUpload) -> Result<ImageMimeType, ValidationError> {
    let mime = ImageMimeType::from_mime(&upload.mime_type).ok_or_else(|| {
        ValidationError::UnsupportedMimeType {
            mime_type: upload.mime_type.clone(),
        }
    })?;

    if upload.size() > MAX_UPLOAD_BYTES {
        return Err(ValidationError::FileTooLarge {
            size: upload.size(),
            max: MAX_UPLOAD_BYTES,
        });
    }

    Ok(mime)
}

/// Read a file from disk, taking the MIME type from its extension.
pub async fn read_upload(path: &Path) -> std::io::Result<ImageUpload> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let mime_type = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(ImageMimeType::from_extension)
        .map_or("application/octet-stream", ImageMimeType::as_str);

    Ok(ImageUpload::new(file_name, mime_type, bytes))
}

#[derive(Debug, Default)]
struct UploadInner {
    generation: u64,
    ramp: Option<TaskGuard>,
}

#[derive(Debug)]
struct UploadShared {
    inner: Mutex<UploadInner>,
    state: watch::Sender<UploadState>,
}

impl UploadShared {
    fn lock(&self) -> MutexGuard<'_, UploadInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drives one file at a time through validation, upload, and result.
///
/// Every state change is applied under the coordinator lock together with a
/// generation check, so a response belonging to a reset or superseded upload
/// is dropped instead of applied.
pub struct UploadCoordinator<S: ImageService + ?Sized + 'static> {
    service: Arc<S>,
    settings: UploadSettings,
    shared: Arc<UploadShared>,
}

impl<S: ImageService + ?Sized + 'static> UploadCoordinator<S> {
    pub fn new(service: Arc<S>, settings: UploadSettings) -> Self {
        let (state, _rx) = watch::channel(UploadState::Idle);
        Self {
            service,
            settings,
            shared: Arc::new(UploadShared {
                inner: Mutex::new(UploadInner::default()),
                state,
            }),
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> UploadState {
        self.shared.state.borrow().clone()
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.shared.state.subscribe()
    }

    /// Validate and start uploading `upload`.
    ///
    /// Rejected files never reach the network and leave the state untouched.
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, upload: ImageUpload) -> Result<(), CoordinatorError> {
        let mime = validate_upload(&upload)?;

        let mut inner = self.shared.lock();
        let busy = self.shared.state.borrow().is_active();
        if busy {
            return Err(CoordinatorError::Busy { state: "uploading" });
        }

        inner.generation += 1;
        let generation = inner.generation;
        self.shared
            .state
            .send_replace(UploadState::Uploading { progress: 0 });

        let ramp_shared = self.shared.clone();
        let settings = self.settings.clone();
        inner.ramp = Some(TaskGuard::spawn(move |shutdown| {
            progress_ramp(ramp_shared, settings, generation, shutdown)
        }));

        info!(
            generation,
            file_name = %upload.file_name,
            size = upload.size(),
            mime = %mime,
            "upload started"
        );
        tokio::spawn(run_upload(
            self.service.clone(),
            self.shared.clone(),
            generation,
            upload,
        ));
        Ok(())
    }

    /// Return to `Idle`, stop the progress ramp, and ignore any in-flight response.
    pub fn reset(&self) {
        let mut inner = self.shared.lock();
        inner.generation += 1;
        let ramp = inner.ramp.take();
        self.shared.state.send_replace(UploadState::Idle);
        drop(ramp);
        debug!(generation = inner.generation, "upload reset");
    }

    /// Wait until no upload is in flight and return the resulting state.
    pub async fn wait_until_settled(&self) -> UploadState {
        let mut rx = self.subscribe();
        match rx.wait_for(|state| !state.is_active()).await {
            Ok(state) => UploadState::clone(&state),
            Err(_) => self.state(),
        }
    }

    #[cfg(test)]
    fn has_active_ramp(&self) -> bool {
        self.shared
            .lock()
            .ramp
            .as_ref()
            .is_some_and(|ramp| !ramp.is_finished())
    }
}

impl<S: ImageService + ?Sized + 'static> Drop for UploadCoordinator<S> {
    fn drop(&mut self) {
        self.reset();
    }
}

async fn progress_ramp(
    shared: Arc<UploadShared>,
    settings: UploadSettings,
    generation: u64,
    shutdown: CancellationToken,
) {
    let ceiling = settings.progress_ceiling.min(99);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(settings.progress_tick) => {}
        }

        let inner = shared.lock();
        if inner.generation != generation {
            return;
        }

        let mut capped = false;
        shared.state.send_if_modified(|state| match state {
            UploadState::Uploading { progress } => {
                let next = progress
                    .saturating_add(settings.progress_step)
                    .min(ceiling)
                    .max(*progress);
                capped = next >= ceiling;
                let changed = next != *progress;
                *progress = next;
                changed
            }
            _ => {
                capped = true;
                false
            }
        });
        drop(inner);

        if capped {
            debug!(generation, ceiling, "upload progress ramp reached ceiling");
            return;
        }
    }
}

async fn run_upload<S: ImageService + ?Sized>(
    service: Arc<S>,
    shared: Arc<UploadShared>,
    generation: u64,
    upload: ImageUpload,
) {
    let outcome = service.upload_image(upload).await;

    let mut inner = shared.lock();
    if inner.generation != generation {
        debug!(
            generation,
            current = inner.generation,
            "discarding stale upload response"
        );
        return;
    }

    let ramp = inner.ramp.take();
    let next = match outcome {
        Ok(image) => {
            info!(
                generation,
                image_id = %image.id,
                width = image.width,
                height = image.height,
                "upload succeeded"
            );
            UploadState::Succeeded(image)
        }
        Err(err) => {
            warn!(generation, error = %err, "upload failed");
            UploadState::Failed(TaskFailure::from_service_error(&err))
        }
    };
    shared.state.send_replace(next);
    drop(ramp);
}
