//! Operation model: the server-side long-running job as seen by the client.
//!
//! Results and remote errors are opaque: the poller carries them but never
//! looks inside. The only interpretation happens in [`Operation::merge`],
//! which checks that a poll payload is well-formed before it replaces the
//! cached state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::PollerError;
use super::ids::OperationId;
use super::state::OperationStatus;

/// Error reported by the remote service for a failed operation.
///
/// Only `message` is required; everything else is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ErrorModel>,

    #[serde(default, rename = "innererror", skip_serializing_if = "Option::is_none")]
    pub inner_error: Option<serde_json::Value>,
}

impl ErrorModel {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            target: None,
            details: Vec::new(),
            inner_error: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Cached state of one remote operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: OperationId,
    pub status: OperationStatus,
    pub created_on: DateTime<Utc>,
    pub last_updated_on: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorModel>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

impl Operation {
    /// State right after the submission call returned an id.
    pub fn submitted(id: OperationId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            status: OperationStatus::NotStarted,
            created_on: now,
            last_updated_on: now,
            error: None,
            result: None,
        }
    }

    /// Merge a poll payload into this operation, returning the new state.
    ///
    /// Rules:
    /// - a payload carrying both `error` and `result` is rejected
    /// - a missing `status` is inferred from `error` (failed) or `result` (succeeded);
    ///   a payload with none of the three is rejected
    /// - `failed`/`canceled` without error details gets a synthesized error
    /// - `id` and `created_on` never change
    pub fn merge(&self, payload: PollPayload, now: DateTime<Utc>) -> Result<Self, PollerError> {
        if payload.error.is_some() && payload.result.is_some() {
            return Err(PollerError::MalformedPayload {
                message: format!("operation {} reported both error and result", self.id),
            });
        }

        let status = match (payload.status, &payload.error, &payload.result) {
            (_, Some(_), _) => match payload.status {
                Some(OperationStatus::Canceled) => OperationStatus::Canceled,
                _ => OperationStatus::Failed,
            },
            (_, None, Some(_)) => OperationStatus::Succeeded,
            (Some(status), None, None) => status,
            (None, None, None) => {
                return Err(PollerError::MalformedPayload {
                    message: format!("operation {} reported no status, error or result", self.id),
                });
            }
        };

        let error = match (payload.error, status) {
            (Some(error), _) => Some(error),
            (None, OperationStatus::Failed) => Some(
                ErrorModel::new("operation failed without error details").with_code("OperationFailed"),
            ),
            (None, OperationStatus::Canceled) => Some(
                ErrorModel::new("operation was canceled by the service")
                    .with_code("OperationCanceled"),
            ),
            (None, _) => None,
        };

        Ok(Self {
            id: self.id.clone(),
            status,
            created_on: self.created_on,
            last_updated_on: payload.last_updated_on.unwrap_or(now),
            error,
            result: payload.result,
        })
    }

    /// Terminal snapshot carrying a local failure, used for delivery.
    pub fn with_failure(&self, err: &PollerError) -> Self {
        let status = if err.is_canceled() {
            OperationStatus::Canceled
        } else {
            OperationStatus::Failed
        };
        Self {
            status,
            error: Some(err.to_error_model()),
            result: None,
            ..self.clone()
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// What a single poll call returns.
///
/// Accepts the document-analysis wire names (`lastUpdatedDateTime`,
/// `analyzeResult`) as aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OperationStatus>,

    #[serde(
        default,
        alias = "lastUpdatedDateTime",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_updated_on: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorModel>,

    #[serde(default, alias = "analyzeResult", skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

impl PollPayload {
    pub fn with_status(status: OperationStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn running() -> Self {
        Self::with_status(OperationStatus::Running)
    }

    pub fn succeeded(result: serde_json::Value) -> Self {
        Self {
            status: Some(OperationStatus::Succeeded),
            result: Some(result),
            ..Self::default()
        }
    }

    pub fn failed(error: ErrorModel) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }
}

/// Opaque submission body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A JSON document sent as `application/json`.
    Json(String),

    /// Raw bytes sent as `application/octet-stream`.
    Binary(Vec<u8>),
}

impl Payload {
    pub fn json(value: &serde_json::Value) -> Self {
        Payload::Json(value.to_string())
    }

    /// Body that asks the service to fetch the document itself.
    pub fn url_source(url: &str) -> Self {
        Self::json(&serde_json::json!({ "urlSource": url }))
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Payload::Json(_) => "application/json",
            Payload::Binary(_) => "application/octet-stream",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::Json(s) => s.len(),
            Payload::Binary(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_body(self) -> Vec<u8> {
        match self {
            Payload::Json(s) => s.into_bytes(),
            Payload::Binary(b) => b,
        }
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Json(s)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Binary(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn submitted() -> Operation {
        Operation::submitted(OperationId::new("abc123"), t0())
    }

    #[test]
    fn submitted_operation_is_not_started() {
        let op = submitted();
        assert_eq!(op.status, OperationStatus::NotStarted);
        assert_eq!(op.created_on, op.last_updated_on);
        assert!(op.error.is_none());
        assert!(op.result.is_none());
    }

    #[test]
    fn merge_running_keeps_identity_and_bumps_timestamp() {
        let later = t0() + Duration::seconds(3);
        let op = submitted().merge(PollPayload::running(), later).unwrap();

        assert_eq!(op.id.as_str(), "abc123");
        assert_eq!(op.status, OperationStatus::Running);
        assert_eq!(op.created_on, t0());
        assert_eq!(op.last_updated_on, later);
    }

    #[test]
    fn merge_prefers_remote_timestamp() {
        let remote = t0() + Duration::seconds(1);
        let payload = PollPayload {
            last_updated_on: Some(remote),
            ..PollPayload::running()
        };
        let op = submitted()
            .merge(payload, t0() + Duration::seconds(9))
            .unwrap();
        assert_eq!(op.last_updated_on, remote);
    }

    #[test]
    fn merge_rejects_both_error_and_result() {
        let payload = PollPayload {
            error: Some(ErrorModel::new("bad file")),
            result: Some(json!({"pages": 1})),
            ..PollPayload::default()
        };
        let err = submitted().merge(payload, t0()).unwrap_err();
        assert!(matches!(err, PollerError::MalformedPayload { .. }));
    }

    #[test]
    fn merge_rejects_empty_payload() {
        let err = submitted().merge(PollPayload::default(), t0()).unwrap_err();
        assert!(matches!(err, PollerError::MalformedPayload { .. }));
    }

    #[test]
    fn merge_infers_failed_from_error() {
        let op = submitted()
            .merge(PollPayload::failed(ErrorModel::new("bad file")), t0())
            .unwrap();
        assert_eq!(op.status, OperationStatus::Failed);
        assert_eq!(op.error.unwrap().message, "bad file");
        assert!(op.result.is_none());
    }

    #[test]
    fn merge_synthesizes_error_for_bare_failed_status() {
        let op = submitted()
            .merge(PollPayload::with_status(OperationStatus::Failed), t0())
            .unwrap();
        assert_eq!(
            op.error.unwrap().code.as_deref(),
            Some("OperationFailed")
        );
    }

    #[test]
    fn merge_decodes_service_wire_names() {
        let payload: PollPayload = serde_json::from_value(json!({
            "status": "succeeded",
            "createdDateTime": "2024-01-01T12:00:00Z",
            "lastUpdatedDateTime": "2024-01-01T12:00:05Z",
            "analyzeResult": {"pages": 1}
        }))
        .unwrap();

        let op = submitted().merge(payload, t0()).unwrap();
        assert_eq!(op.status, OperationStatus::Succeeded);
        assert_eq!(op.result, Some(json!({"pages": 1})));
        assert_eq!(op.last_updated_on, t0() + Duration::seconds(5));
    }

    #[test]
    fn operation_serializes_camel_case_and_omits_absent_fields() {
        let v = serde_json::to_value(submitted()).unwrap();
        assert_eq!(v["id"], "abc123");
        assert_eq!(v["status"], "notStarted");
        assert!(v.get("createdOn").is_some());
        assert!(v.get("lastUpdatedOn").is_some());
        assert!(v.get("error").is_none());
        assert!(v.get("result").is_none());
    }

    #[test]
    fn with_failure_marks_canceled_or_failed() {
        use crate::domain::CancelReason;

        let canceled = submitted().with_failure(&PollerError::canceled(CancelReason::Aborted));
        assert_eq!(canceled.status, OperationStatus::Canceled);
        assert!(canceled.error.is_some());

        let failed = submitted().with_failure(&PollerError::Operation(ErrorModel::new("bad file")));
        assert_eq!(failed.status, OperationStatus::Failed);
        assert_eq!(failed.error.unwrap().message, "bad file");
    }

    #[test]
    fn payload_content_type_follows_variant() {
        assert_eq!(Payload::url_source("https://x/doc.pdf").content_type(), "application/json");
        assert_eq!(Payload::from(vec![1u8, 2, 3]).content_type(), "application/octet-stream");

        let body = Payload::url_source("https://x/doc.pdf").into_body();
        let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["urlSource"], "https://x/doc.pdf");
    }
}
