//! Long-running-operation driver: submit, then poll with backoff until the
//! remote operation reaches a terminal state.

mod awaiter;
mod backoff;

pub use awaiter::Awaiter;
pub use backoff::BackoffPolicy;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{
    CancelReason, Operation, OperationId, OperationStatus, Payload, PollerError,
};
use crate::ports::{Clock, OperationApi};
use crate::registry::AwaiterRegistry;

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Caller-owned abort signal. Firing it stops the polling loop.
    pub abort: Option<CancellationToken>,
}

impl RunOptions {
    pub fn with_abort(abort: CancellationToken) -> Self {
        Self { abort: Some(abort) }
    }
}

/// Drives one kind of remote operation.
///
/// Cheap to clone: every field is shared. Each `run` spawns one polling task
/// that owns its own backoff state and cancellation token, so runs never
/// coordinate with each other.
#[derive(Clone)]
pub struct Poller {
    api: Arc<dyn OperationApi>,
    clock: Arc<dyn Clock>,
    policy: BackoffPolicy,
    registry: AwaiterRegistry,
}

impl Poller {
    pub fn new(
        api: Arc<dyn OperationApi>,
        clock: Arc<dyn Clock>,
        policy: BackoffPolicy,
        registry: AwaiterRegistry,
    ) -> Self {
        Self {
            api,
            clock,
            policy,
            registry,
        }
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    pub fn registry(&self) -> &AwaiterRegistry {
        &self.registry
    }

    /// Perform the initiating call and build the `notStarted` operation.
    pub async fn submit(&self, payload: &Payload) -> Result<Operation, PollerError> {
        let response = self.api.submit(payload).await?;
        let id = response
            .operation_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| PollerError::Submission {
                message: "response carried no operation id".to_string(),
            })?;

        let operation = Operation::submitted(OperationId::new(id), self.clock.now());
        info!(
            operation_id = %operation.id,
            content_type = payload.content_type(),
            bytes = payload.len(),
            "operation submitted"
        );
        Ok(operation)
    }

    /// Fetch the current remote state and merge it into `cached`.
    pub async fn poll(&self, cached: &Operation) -> Result<Operation, PollerError> {
        let payload = self.api.poll(&cached.id).await?;
        cached.merge(payload, self.clock.now())
    }

    /// Submit, register the awaiter, and start polling in the background.
    pub async fn run(&self, payload: &Payload, options: RunOptions) -> Result<Awaiter, PollerError> {
        let operation = self.submit(payload).await?;
        let id = operation.id.clone();

        // one token for both signals: the caller's abort cancels the terminator
        let terminator = match options.abort {
            Some(abort) => abort.child_token(),
            None => CancellationToken::new(),
        };

        let (progress_tx, progress_rx) = watch::channel(operation);
        let (completion_tx, completion_rx) = watch::channel(None);

        let awaiter = Awaiter::new(
            id.clone(),
            progress_rx,
            completion_rx,
            terminator.clone(),
            self.registry.handle(),
        );
        self.registry.register(awaiter.clone());

        let poller = self.clone();
        let registry = self.registry.handle();
        tokio::spawn(async move {
            let result = poller.drive(&progress_tx, &terminator).await;
            match &result {
                Ok(operation) => {
                    info!(operation_id = %id, status = %operation.status, "operation completed");
                }
                Err(err) if err.is_canceled() => {
                    warn!(operation_id = %id, "polling canceled");
                }
                Err(err) => {
                    info!(operation_id = %id, error = %err, "operation finished with error");
                }
            }
            completion_tx.send_replace(Some(result));
            // bound the entry's lifetime even if nobody ever waits
            registry.schedule_eviction(&id);
        });

        Ok(awaiter)
    }

    /// Look up a handle registered by an earlier `run`.
    pub fn resume(&self, id: &OperationId) -> Option<Awaiter> {
        self.registry.lookup(id)
    }

    async fn drive(
        &self,
        progress: &watch::Sender<Operation>,
        cancel: &CancellationToken,
    ) -> Result<Operation, PollerError> {
        self.pause(self.policy.initial_delay(), cancel).await;

        let mut polls: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(PollerError::canceled(CancelReason::Aborted));
            }
            if !self.policy.allows(polls) {
                return Err(PollerError::AttemptsExhausted { attempts: polls });
            }

            let cached = progress.borrow().clone();
            let current = self.poll(&cached).await?;
            polls += 1;
            progress.send_replace(current.clone());

            if let Some(error) = &current.error {
                return Err(PollerError::Operation(error.clone()));
            }
            if current.result.is_some() || current.status == OperationStatus::Succeeded {
                return Ok(current);
            }

            let delay = self.policy.next_delay(polls);
            debug!(
                operation_id = %current.id,
                attempt = polls,
                status = %current.status,
                delay = ?delay,
                "operation still running"
            );
            self.pause(delay, cancel).await;
        }
    }

    /// Sleep on the injected clock; wakes early if `cancel` fires.
    async fn pause(&self, delay: Duration, cancel: &CancellationToken) {
        tokio::select! {
            _ = self.clock.sleep(delay) => {}
            _ = cancel.cancelled() => {}
        }
    }
}
