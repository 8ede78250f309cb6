/*
[INPUT]:  Background timer loops (progress ramp, status poller)
[OUTPUT]: Owned handle that stops the loop when dropped
[POS]:    Execution layer - scoped lifetime for spawned background work
[UPDATE]: When changing how background loops are cancelled
*/

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A spawned loop bound to this value's lifetime.
///
/// Dropping the guard cancels the loop's token and aborts its task, so a
/// timer can never outlive the operation that owns it.
#[derive(Debug)]
pub(crate) struct TaskGuard {
    shutdown: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl TaskGuard {
    /// Spawn `task` with a fresh cancellation token.
    pub(crate) fn spawn<F, Fut>(task: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(task(shutdown.clone()));
        Self {
            shutdown,
            handle: Some(handle),
        }
    }

    #[cfg(test)]
    pub(crate) fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
