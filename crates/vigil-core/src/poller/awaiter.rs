use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::domain::{CancelReason, Operation, OperationId, OperationStatus, PollerError};
use crate::registry::RegistryHandle;

pub(crate) type Completion = Option<Result<Operation, PollerError>>;

struct Shared {
    id: OperationId,
    progress: watch::Receiver<Operation>,
    completion: watch::Receiver<Completion>,
    terminator: CancellationToken,
    registry: RegistryHandle,
}

/// Client-side handle over one polled operation.
///
/// Clones share the same operation, completion and terminator:
/// - `wait()` may be called any number of times, from any task
/// - `abort()` from any clone stops the polling loop
#[derive(Clone)]
pub struct Awaiter {
    shared: Arc<Shared>,
}

impl Awaiter {
    pub(crate) fn new(
        id: OperationId,
        progress: watch::Receiver<Operation>,
        completion: watch::Receiver<Completion>,
        terminator: CancellationToken,
        registry: RegistryHandle,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                id,
                progress,
                completion,
                terminator,
                registry,
            }),
        }
    }

    pub fn id(&self) -> &OperationId {
        &self.shared.id
    }

    /// Resolve once the operation completes.
    ///
    /// Either outcome restarts the grace-period eviction for this id.
    pub async fn wait(&self) -> Result<Operation, PollerError> {
        let result = self.completion().await;
        self.shared.registry.schedule_eviction(&self.shared.id);
        result
    }

    /// Like [`wait`](Self::wait), but gives up when `abort` fires.
    ///
    /// Giving up also fires the terminator, so polling stops for every clone.
    pub async fn wait_with_abort(
        &self,
        abort: &CancellationToken,
    ) -> Result<Operation, PollerError> {
        let result = tokio::select! {
            biased;
            result = self.completion() => result,
            _ = abort.cancelled() => {
                self.shared.terminator.cancel();
                Err(PollerError::canceled(CancelReason::WaitAborted))
            }
        };
        self.shared.registry.schedule_eviction(&self.shared.id);
        result
    }

    /// Fire the terminator. Takes effect before the next poll.
    pub fn abort(&self) {
        self.shared.terminator.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.shared.terminator.is_cancelled()
    }

    /// Has the polling loop reported an outcome?
    pub fn is_finished(&self) -> bool {
        self.shared.completion.borrow().is_some()
    }

    /// Current status; `canceled` once the terminator fired on an unfinished operation.
    pub fn status(&self) -> OperationStatus {
        match &*self.shared.completion.borrow() {
            Some(Err(err)) if err.is_canceled() => return OperationStatus::Canceled,
            Some(_) => {}
            None if self.is_aborted() => return OperationStatus::Canceled,
            None => {}
        }
        self.shared.progress.borrow().status
    }

    /// Latest known snapshot of the operation.
    pub fn progress(&self) -> Operation {
        self.shared.progress.borrow().clone()
    }

    async fn completion(&self) -> Result<Operation, PollerError> {
        let mut completion = self.shared.completion.clone();
        match completion.wait_for(Option::is_some).await {
            Ok(done) => match &*done {
                Some(result) => result.clone(),
                None => Err(PollerError::canceled(CancelReason::Aborted)),
            },
            // polling task went away without reporting
            Err(_) => Err(PollerError::canceled(CancelReason::Aborted)),
        }
    }

    /// Handle with no polling task behind it, for registry tests.
    #[cfg(test)]
    pub(crate) fn detached(id: &str) -> Self {
        use chrono::Utc;

        let id = OperationId::new(id);
        let (_progress_tx, progress) = watch::channel(Operation::submitted(id.clone(), Utc::now()));
        let (_completion_tx, completion) = watch::channel(None);
        Self::new(
            id,
            progress,
            completion,
            CancellationToken::new(),
            RegistryHandle::default(),
        )
    }
}

impl fmt::Debug for Awaiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Awaiter")
            .field("id", &self.shared.id)
            .field("status", &self.status())
            .field("finished", &self.is_finished())
            .finish()
    }
}
