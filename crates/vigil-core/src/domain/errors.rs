//! Errors - エラー型と分類
//!
//! # 分類
//! - **ApiError**: 注入されたコラボレータ（HTTP など）の失敗
//! - **PollerError**: 待ち手（waiter）に返す終端エラー
//!
//! PollerError は `Clone` です。ひとつの完了結果を複数の `wait()` が
//! 同時に観測できるように、watch チャネルに載せて配るためです。

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::operation::ErrorModel;

/// Failure of an injected collaborator (submit / poll / notify call).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Status { status: u16, message: String },

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Which signal canceled the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The terminator fired (`Awaiter::abort`, or the caller's abort signal).
    Aborted,

    /// A per-call signal passed to `wait_with_abort` fired.
    WaitAborted,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Aborted => f.write_str("operation has been aborted"),
            CancelReason::WaitAborted => f.write_str("wait aborted"),
        }
    }
}

/// Terminal error observed by a waiter.
#[derive(Debug, Clone, Error)]
pub enum PollerError {
    /// Transport succeeded but no operation id came back. Not retried.
    #[error("submission failed: {message}")]
    Submission { message: String },

    /// The remote service reported a terminal error. Not retried.
    #[error("operation failed: {}", .0.message)]
    Operation(ErrorModel),

    #[error("{reason}")]
    Canceled { reason: CancelReason },

    /// A submit or poll call failed; propagated without retry.
    #[error("transport error: {0}")]
    Transport(#[source] Arc<ApiError>),

    #[error("malformed poll payload: {message}")]
    MalformedPayload { message: String },

    /// Only produced when the backoff policy carries an attempt budget.
    #[error("gave up after {attempts} poll attempts")]
    AttemptsExhausted { attempts: u32 },
}

impl From<ApiError> for PollerError {
    fn from(err: ApiError) -> Self {
        PollerError::Transport(Arc::new(err))
    }
}

impl PollerError {
    pub fn canceled(reason: CancelReason) -> Self {
        PollerError::Canceled { reason }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, PollerError::Canceled { .. })
    }

    /// Render this failure as a remote-style error payload, for delivery.
    pub fn to_error_model(&self) -> ErrorModel {
        match self {
            PollerError::Operation(model) => model.clone(),
            PollerError::Submission { .. } => {
                ErrorModel::new(self.to_string()).with_code("SubmissionFailed")
            }
            PollerError::Canceled { .. } => {
                ErrorModel::new(self.to_string()).with_code("OperationCanceled")
            }
            PollerError::Transport(_) => {
                ErrorModel::new(self.to_string()).with_code("TransportError")
            }
            PollerError::MalformedPayload { .. } => {
                ErrorModel::new(self.to_string()).with_code("MalformedPayload")
            }
            PollerError::AttemptsExhausted { .. } => {
                ErrorModel::new(self.to_string()).with_code("AttemptsExhausted")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_error_keeps_remote_message() {
        let err = PollerError::Operation(ErrorModel::new("bad file"));
        assert_eq!(err.to_string(), "operation failed: bad file");
        assert_eq!(err.to_error_model().message, "bad file");
        assert_eq!(err.to_error_model().code, None);
    }

    #[test]
    fn cancel_reasons_are_distinguishable() {
        let aborted = PollerError::canceled(CancelReason::Aborted);
        let wait = PollerError::canceled(CancelReason::WaitAborted);

        assert!(aborted.is_canceled());
        assert!(wait.is_canceled());
        assert_ne!(aborted.to_string(), wait.to_string());
        assert!(!PollerError::Operation(ErrorModel::new("x")).is_canceled());
    }

    #[test]
    fn transport_error_exposes_source() {
        use std::error::Error as _;

        let err: PollerError = ApiError::Status {
            status: 503,
            message: "busy".to_string(),
        }
        .into();

        assert!(err.source().is_some());
        let model = err.to_error_model();
        assert_eq!(model.code.as_deref(), Some("TransportError"));
        assert!(model.message.contains("503"));
    }
}
