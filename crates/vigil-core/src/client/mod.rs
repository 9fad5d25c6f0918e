//! Document-analysis client.
//!
//! Wires the poller to the document-analysis service: one `Poller` per model,
//! a shared awaiter registry, and callback delivery for callers that do not
//! want to block on completion.

mod builder;

pub use builder::{BuildError, ClientBuilder};

use std::fmt;
use std::sync::Arc;

use reqwest::Url;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::domain::{Operation, OperationId, Payload, PollerError};
use crate::poller::{Awaiter, BackoffPolicy, Poller, RunOptions};
use crate::ports::{Clock, Credential, DeliveryNotifier, OperationSource};
use crate::registry::AwaiterRegistry;

/// General document model used by the `*_document` helpers.
pub const PREBUILT_DOCUMENT_MODEL: &str = "prebuilt-document";

/// Per-call options for `analyze` / `begin_analyze`.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    /// Deliver the terminal operation here instead of blocking the caller.
    pub callback_url: Option<Url>,

    /// Caller-owned abort signal for the polling loop.
    pub abort: Option<CancellationToken>,
}

impl AnalyzeOptions {
    pub fn deliver_to(callback_url: Url) -> Self {
        Self {
            callback_url: Some(callback_url),
            abort: None,
        }
    }
}

pub struct DocumentAnalysisClient {
    endpoint: Url,
    source: Arc<dyn OperationSource>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn DeliveryNotifier>,
    registry: AwaiterRegistry,
    backoff: BackoffPolicy,
    deliveries: TaskTracker,
}

impl DocumentAnalysisClient {
    pub fn builder(endpoint: impl Into<String>, credential: Arc<dyn Credential>) -> ClientBuilder {
        ClientBuilder::new(endpoint, credential)
    }

    fn from_parts(
        endpoint: Url,
        source: Arc<dyn OperationSource>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn DeliveryNotifier>,
        registry: AwaiterRegistry,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            endpoint,
            source,
            clock,
            notifier,
            registry,
            backoff,
            deliveries: TaskTracker::new(),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn registry(&self) -> &AwaiterRegistry {
        &self.registry
    }

    /// Poller bound to `model`, sharing this client's registry and clock.
    pub fn poller(&self, model: &str) -> Poller {
        Poller::new(
            self.source.operations(model),
            self.clock.clone(),
            self.backoff.clone(),
            self.registry.clone(),
        )
    }

    /// Submit and return the in-flight handle without waiting.
    pub async fn begin_analyze(
        &self,
        model: &str,
        payload: &Payload,
        options: &AnalyzeOptions,
    ) -> Result<Awaiter, PollerError> {
        let run = RunOptions {
            abort: options.abort.clone(),
        };
        self.poller(model).run(payload, run).await
    }

    pub async fn begin_analyze_document(&self, payload: &Payload) -> Result<Awaiter, PollerError> {
        self.begin_analyze(PREBUILT_DOCUMENT_MODEL, payload, &AnalyzeOptions::default())
            .await
    }

    /// Let the service fetch the document from `url`.
    pub async fn begin_analyze_document_from_url(&self, url: &str) -> Result<Awaiter, PollerError> {
        self.begin_analyze_document(&Payload::url_source(url)).await
    }

    /// Run an analysis to completion.
    ///
    /// Without a callback URL this waits and returns the terminal operation.
    /// With one it returns the current snapshot right away; the terminal
    /// operation (or the failure, as an error payload) is posted to the
    /// callback once. Delivery failures are logged and dropped.
    pub async fn analyze(
        &self,
        model: &str,
        payload: &Payload,
        options: AnalyzeOptions,
    ) -> Result<Operation, PollerError> {
        let awaiter = self.begin_analyze(model, payload, &options).await?;

        let Some(callback_url) = options.callback_url else {
            return awaiter.wait().await;
        };

        let snapshot = awaiter.progress();
        let notifier = self.notifier.clone();
        self.deliveries.spawn(async move {
            let operation = match awaiter.wait().await {
                Ok(operation) => operation,
                Err(err) => awaiter.progress().with_failure(&err),
            };
            match notifier.notify(&callback_url, &operation).await {
                Ok(()) => debug!(
                    operation_id = %operation.id,
                    callback_url = %callback_url,
                    "delivered operation"
                ),
                Err(err) => warn!(
                    operation_id = %operation.id,
                    callback_url = %callback_url,
                    error = %err,
                    "operation delivery failed"
                ),
            }
        });

        Ok(snapshot)
    }

    pub async fn analyze_document(
        &self,
        payload: &Payload,
        options: AnalyzeOptions,
    ) -> Result<Operation, PollerError> {
        self.analyze(PREBUILT_DOCUMENT_MODEL, payload, options).await
    }

    pub async fn analyze_document_from_url(
        &self,
        url: &str,
        options: AnalyzeOptions,
    ) -> Result<Operation, PollerError> {
        self.analyze_document(&Payload::url_source(url), options)
            .await
    }

    /// Resume an operation started earlier through this client's registry.
    pub fn awaiter(&self, id: &OperationId) -> Option<Awaiter> {
        self.registry.lookup(id)
    }

    /// Wait until every pending callback delivery has been attempted.
    pub async fn flush_deliveries(&self) {
        self.deliveries.close();
        self.deliveries.wait().await;
        self.deliveries.reopen();
    }
}

impl fmt::Debug for DocumentAnalysisClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentAnalysisClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("backoff", &self.backoff)
            .field("registry", &self.registry)
            .field("pending_deliveries", &self.deliveries.len())
            .finish()
    }
}
