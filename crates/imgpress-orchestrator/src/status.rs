/*
[INPUT]:  Adapter errors and backend-reported job failures
[OUTPUT]: Failure vocabulary stored in terminal coordinator states
[POS]:    State layer - shared status/error vocabulary for both coordinators
[UPDATE]: When a new failure category becomes user visible
*/

use std::fmt;
use std::time::Duration;

use imgpress_adapter::ImgpressError;

/// Category of a terminal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network unreachable, non-2xx, or unreadable response.
    Transport,
    /// The service accepted the job and reported it as failed.
    Processing,
    /// Polling exceeded its deadline.
    Timeout,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Transport => "transport",
            FailureKind::Processing => "processing",
            FailureKind::Timeout => "timeout",
        }
    }
}

/// Failure payload of a `Failed` state: a kind plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TaskFailure {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transport,
            message: message.into(),
        }
    }

    /// Backend-reported failure; falls back to a generic message when the
    /// backend sent none.
    pub fn processing(message: Option<String>) -> Self {
        let message = message
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| "Processing failed".to_string());
        Self {
            kind: FailureKind::Processing,
            message,
        }
    }

    pub fn timeout(limit: Duration) -> Self {
        Self {
            kind: FailureKind::Timeout,
            message: format!("processing did not finish within {}s", limit.as_secs()),
        }
    }

    /// Classify an adapter error.
    pub fn from_service_error(err: &ImgpressError) -> Self {
        match err {
            ImgpressError::Processing { message } => Self::processing(Some(message.clone())),
            // The API message is what the user needs, not our wrapper text.
            ImgpressError::Api { message, .. } => Self::transport(message.clone()),
            other => Self::transport(other.to_string()),
        }
    }
}

/// Read-only view shared by both coordinator state types.
pub trait StateView {
    /// Short lowercase state name, used in logs and `Busy` errors.
    fn name(&self) -> &'static str;

    /// Progress in `0..=100`.
    fn progress(&self) -> u8;

    /// True while work is in flight.
    fn is_active(&self) -> bool;

    /// True for `Succeeded` and `Failed`.
    fn is_terminal(&self) -> bool;

    fn failure(&self) -> Option<&TaskFailure>;
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
