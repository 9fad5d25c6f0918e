//! ScriptedOperationApi / RecordingNotifier - 開発・テスト用の実装
//!
//! # 学習ポイント
//! - ネットワークなしでポーリングループ全体を動かす
//! - 応答は「台本」（VecDeque）から順に取り出す
//! - 呼び出し回数を記録して、テストから検証できるようにする

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use reqwest::Url;

use crate::domain::{ApiError, Operation, OperationId, Payload, PollPayload};
use crate::ports::{DeliveryNotifier, OperationApi, SubmitResponse};

/// OperationApi that replays a fixed script of poll responses.
///
/// Once the script runs out every further poll reports `running`, so an
/// unscripted operation never finishes on its own.
///
/// ```ignore
/// let api = ScriptedOperationApi::new("abc123")
///     .then(PollPayload::running())
///     .then(PollPayload::succeeded(json!({"pages": 1})));
/// ```
pub struct ScriptedOperationApi {
    operation_id: Option<String>,
    script: Mutex<VecDeque<Result<PollPayload, ApiError>>>,
    submitted: Mutex<Vec<Payload>>,
    submits: AtomicUsize,
    polls: AtomicUsize,
}

impl ScriptedOperationApi {
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self::with_submit_response(SubmitResponse::accepted(operation_id))
    }

    /// Accepts the submission but returns no id.
    pub fn without_id() -> Self {
        Self::with_submit_response(SubmitResponse::without_id())
    }

    fn with_submit_response(response: SubmitResponse) -> Self {
        Self {
            operation_id: response.operation_id,
            script: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            submits: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
        }
    }

    /// Queue the next poll response.
    pub fn then(self, payload: PollPayload) -> Self {
        self.push(Ok(payload));
        self
    }

    /// Queue a failing poll call.
    pub fn then_error(self, err: ApiError) -> Self {
        self.push(Err(err));
        self
    }

    pub fn submit_count(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    /// Payloads seen by `submit`, in call order.
    pub fn submitted(&self) -> Vec<Payload> {
        self.submitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, step: Result<PollPayload, ApiError>) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(step);
    }
}

#[async_trait]
impl OperationApi for ScriptedOperationApi {
    async fn submit(&self, payload: &Payload) -> Result<SubmitResponse, ApiError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        self.submitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(payload.clone());
        Ok(SubmitResponse {
            operation_id: self.operation_id.clone(),
        })
    }

    async fn poll(&self, _id: &OperationId) -> Result<PollPayload, ApiError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        next.unwrap_or_else(|| Ok(PollPayload::running()))
    }
}

/// DeliveryNotifier that records every delivery instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    deliveries: Mutex<Vec<(Url, Operation)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the attempt, then reports a failure.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn deliveries(&self) -> Vec<(Url, Operation)> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl DeliveryNotifier for RecordingNotifier {
    async fn notify(&self, url: &Url, operation: &Operation) -> Result<(), ApiError> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((url.clone(), operation.clone()));
        if self.fail {
            return Err(ApiError::Status {
                status: 503,
                message: "callback endpoint unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OperationStatus;
    use serde_json::json;

    #[tokio::test]
    async fn replays_script_then_reports_running() {
        let api = ScriptedOperationApi::new("abc123")
            .then(PollPayload::succeeded(json!({"pages": 1})));
        let id = OperationId::new("abc123");

        let first = api.poll(&id).await.unwrap();
        assert_eq!(first.status, Some(OperationStatus::Succeeded));

        let second = api.poll(&id).await.unwrap();
        assert_eq!(second.status, Some(OperationStatus::Running));
        assert_eq!(api.poll_count(), 2);
    }

    #[tokio::test]
    async fn submit_records_payload_and_returns_id() {
        let api = ScriptedOperationApi::new("abc123");
        let response = api
            .submit(&Payload::url_source("https://example.com/a.pdf"))
            .await
            .unwrap();

        assert_eq!(response.operation_id.as_deref(), Some("abc123"));
        assert_eq!(api.submit_count(), 1);
        assert_eq!(api.submitted().len(), 1);
    }

    #[tokio::test]
    async fn scripted_error_is_returned_once() {
        let api = ScriptedOperationApi::new("abc123").then_error(ApiError::Other("down".into()));
        let id = OperationId::new("abc123");

        assert!(api.poll(&id).await.is_err());
        assert!(api.poll(&id).await.is_ok());
    }

    #[tokio::test]
    async fn failing_notifier_still_records_attempt() {
        let notifier = RecordingNotifier::failing();
        let url = Url::parse("https://hooks.example.com/done").unwrap();
        let op = Operation::submitted(OperationId::new("abc123"), chrono::Utc::now());

        assert!(notifier.notify(&url, &op).await.is_err());
        assert_eq!(notifier.deliveries().len(), 1);
    }
}
