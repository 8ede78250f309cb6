/*
[INPUT]:  Uploaded image handle + ProcessingOptions + ImageService
[OUTPUT]: ProcessState published on a watch channel (Idle/Submitting/Polling/Succeeded/Failed)
[POS]:    Orchestration layer - processing lifecycle, immediate and polled completion
[UPDATE]: When changing the completion protocol, polling cadence, or deadline handling
*/

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use imgpress_adapter::{
    ImageService, ProcessSubmission, ProcessedImage, ProcessingRequest, ProcessingStatus,
    ProcessingStatusResponse, UploadedImage,
};
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{CoordinatorError, ValidationError};
use crate::guard::TaskGuard;
use crate::options::ProcessingOptions;
use crate::status::{StateView, TaskFailure};

/// Cadence and deadline of status polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSettings {
    pub poll_interval: Duration,
    /// Total time allowed in `Polling` before the job is failed with a timeout.
    pub max_poll_duration: Duration,
}

impl Default for ProcessSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_poll_duration: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessState {
    Idle,
    Submitting,
    Polling { progress: u8 },
    Succeeded(ProcessedImage),
    Failed(TaskFailure),
}

impl ProcessState {
    pub fn result(&self) -> Option<&ProcessedImage> {
        match self {
            ProcessState::Succeeded(result) => Some(result),
            _ => None,
        }
    }
}

impl StateView for ProcessState {
    fn name(&self) -> &'static str {
        match self {
            ProcessState::Idle => "idle",
            ProcessState::Submitting => "submitting",
            ProcessState::Polling { .. } => "polling",
            ProcessState::Succeeded(_) => "succeeded",
            ProcessState::Failed(_) => "failed",
        }
    }

    fn progress(&self) -> u8 {
        match self {
            ProcessState::Polling { progress } => *progress,
            ProcessState::Succeeded(_) => 100,
            ProcessState::Idle | ProcessState::Submitting | ProcessState::Failed(_) => 0,
        }
    }

    fn is_active(&self) -> bool {
        matches!(self, ProcessState::Submitting | ProcessState::Polling { .. })
    }

    fn is_terminal(&self) -> bool {
        matches!(self, ProcessState::Succeeded(_) | ProcessState::Failed(_))
    }

    fn failure(&self) -> Option<&TaskFailure> {
        match self {
            ProcessState::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct ProcessInner {
    generation: u64,
    image_id: Option<String>,
    poller: Option<TaskGuard>,
}

#[derive(Debug)]
struct ProcessShared {
    inner: Mutex<ProcessInner>,
    state: watch::Sender<ProcessState>,
}

impl ProcessShared {
    fn lock(&self) -> MutexGuard<'_, ProcessInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a terminal state if `generation` is still current, releasing the poller.
    fn finish(&self, generation: u64, next: ProcessState) {
        let mut inner = self.lock();
        if inner.generation != generation {
            debug!(
                generation,
                current = inner.generation,
                "discarding stale processing outcome"
            );
            return;
        }
        let poller = inner.poller.take();
        match &next {
            ProcessState::Succeeded(result) => info!(
                generation,
                processed_id = %result.processed_id,
                processed_size = result.processed_size,
                compression_ratio = result.compression_ratio,
                "processing succeeded"
            ),
            ProcessState::Failed(failure) => warn!(
                generation,
                kind = failure.kind.as_str(),
                message = %failure.message,
                "processing failed"
            ),
            _ => {}
        }
        self.state.send_replace(next);
        drop(poller);
    }
}

/// Runs one processing job per reset cycle against an uploaded image.
///
/// The service may answer a submission immediately or defer it; deferred
/// jobs are polled until they complete, fail, or exceed the deadline. Both
/// paths end in the same `Succeeded`/`Failed` states.
pub struct ProcessCoordinator<S: ImageService + ?Sized + 'static> {
    service: Arc<S>,
    settings: ProcessSettings,
    shared: Arc<ProcessShared>,
}

impl<S: ImageService + ?Sized + 'static> ProcessCoordinator<S> {
    pub fn new(service: Arc<S>, settings: ProcessSettings) -> Self {
        let (state, _rx) = watch::channel(ProcessState::Idle);
        Self {
            service,
            settings,
            shared: Arc::new(ProcessShared {
                inner: Mutex::new(ProcessInner::default()),
                state,
            }),
        }
    }

    pub fn state(&self) -> ProcessState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProcessState> {
        self.shared.state.subscribe()
    }

    /// Id of the image the current job targets, if any.
    pub fn image_id(&self) -> Option<String> {
        self.shared.lock().image_id.clone()
    }

    /// True while a status poller is scheduled.
    pub fn is_polling(&self) -> bool {
        self.shared.lock().poller.is_some()
    }

    /// Start processing `image` with `options`.
    ///
    /// Only accepted from `Idle`; a running or finished job must be reset
    /// first. Must be called from within a Tokio runtime.
    pub fn submit(
        &self,
        image: &UploadedImage,
        options: &ProcessingOptions,
    ) -> Result<(), CoordinatorError> {
        if image.id.trim().is_empty() {
            return Err(ValidationError::MissingHandle.into());
        }
        options.validate_for(image)?;

        let mut inner = self.shared.lock();
        {
            let current = self.shared.state.borrow();
            if !matches!(*current, ProcessState::Idle) {
                return Err(CoordinatorError::Busy {
                    state: current.name(),
                });
            }
        }

        inner.generation += 1;
        inner.image_id = Some(image.id.clone());
        let generation = inner.generation;
        self.shared.state.send_replace(ProcessState::Submitting);

        info!(
            generation,
            image_id = %image.id,
            quality = options.quality,
            width = options.width,
            height = options.height,
            keep_aspect_ratio = options.keep_aspect_ratio,
            "processing submitted"
        );
        tokio::spawn(run_submission(
            self.service.clone(),
            self.shared.clone(),
            self.settings.clone(),
            generation,
            image.id.clone(),
            options.to_request(),
        ));
        Ok(())
    }

    /// Cancel any scheduled polling and return to `Idle`.
    ///
    /// Safe from any state; nothing from the superseded job is applied afterwards.
    pub fn reset(&self) {
        let mut inner = self.shared.lock();
        inner.generation += 1;
        inner.image_id = None;
        let poller = inner.poller.take();
        self.shared.state.send_replace(ProcessState::Idle);
        drop(poller);
        debug!(generation = inner.generation, "processing reset");
    }

    /// Wait until no job is in flight and return the resulting state.
    pub async fn wait_until_settled(&self) -> ProcessState {
        let mut rx = self.subscribe();
        match rx.wait_for(|state| !state.is_active()).await {
            Ok(state) => ProcessState::clone(&state),
            Err(_) => self.state(),
        }
    }
}

impl<S: ImageService + ?Sized + 'static> Drop for ProcessCoordinator<S> {
    fn drop(&mut self) {
        self.reset();
    }
}

async fn run_submission<S: ImageService + ?Sized + 'static>(
    service: Arc<S>,
    shared: Arc<ProcessShared>,
    settings: ProcessSettings,
    generation: u64,
    image_id: String,
    request: ProcessingRequest,
) {
    let outcome = service.process_image(&image_id, &request).await;

    match outcome {
        Ok(ProcessSubmission::Immediate(result)) => {
            shared.finish(generation, ProcessState::Succeeded(result));
        }
        Ok(ProcessSubmission::Deferred) => {
            let mut inner = shared.lock();
            if inner.generation != generation {
                debug!(generation, "discarding stale deferred signal");
                return;
            }
            info!(
                generation,
                image_id = %image_id,
                interval_ms = settings.poll_interval.as_millis() as u64,
                "processing deferred, polling status"
            );
            shared.state.send_replace(ProcessState::Polling { progress: 0 });

            let poller_shared = shared.clone();
            inner.poller = Some(TaskGuard::spawn(move |shutdown| {
                poll_status(service, poller_shared, settings, generation, image_id, shutdown)
            }));
        }
        Err(err) => {
            shared.finish(
                generation,
                ProcessState::Failed(TaskFailure::from_service_error(&err)),
            );
        }
    }
}

enum PollStep {
    Progress(u8),
    Finish(ProcessState),
}

fn interpret_status(response: ProcessingStatusResponse) -> PollStep {
    match response.status {
        ProcessingStatus::Processing => PollStep::Progress(response.progress_percent()),
        ProcessingStatus::Completed => match response.result {
            Some(result) => PollStep::Finish(ProcessState::Succeeded(result)),
            None => PollStep::Finish(ProcessState::Failed(TaskFailure::processing(Some(
                "processing completed without a result".to_string(),
            )))),
        },
        ProcessingStatus::Failed => {
            PollStep::Finish(ProcessState::Failed(TaskFailure::processing(response.message)))
        }
    }
}

async fn poll_status<S: ImageService + ?Sized + 'static>(
    service: Arc<S>,
    shared: Arc<ProcessShared>,
    settings: ProcessSettings,
    generation: u64,
    image_id: String,
    shutdown: CancellationToken,
) {
    let started = Instant::now();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(settings.poll_interval) => {}
        }

        if started.elapsed() >= settings.max_poll_duration {
            shared.finish(
                generation,
                ProcessState::Failed(TaskFailure::timeout(settings.max_poll_duration)),
            );
            return;
        }

        let response = tokio::select! {
            _ = shutdown.cancelled() => return,
            response = service.processing_status(&image_id) => response,
        };

        let step = match response {
            Ok(response) => interpret_status(response),
            Err(err) => PollStep::Finish(ProcessState::Failed(TaskFailure::from_service_error(&err))),
        };

        match step {
            PollStep::Progress(progress) => {
                let inner = shared.lock();
                if inner.generation != generation {
                    return;
                }
                debug!(generation, progress, "processing in progress");
                shared.state.send_if_modified(|state| match state {
                    ProcessState::Polling { progress: current } if *current != progress => {
                        *current = progress;
                        true
                    }
                    _ => false,
                });
                drop(inner);
            }
            PollStep::Finish(next) => {
                shared.finish(generation, next);
                return;
            }
        }
    }
}
