//! Operation state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a remote long-running operation.
///
/// State transitions:
/// - NotStarted -> Running -> Succeeded
/// - NotStarted -> Running -> Failed
/// - NotStarted -> Running -> Canceled
///
/// The remote service may skip `Running` entirely, so any non-terminal state
/// can move straight to a terminal one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationStatus {
    /// Accepted by the service, not yet picked up.
    #[default]
    NotStarted,

    /// Being processed remotely.
    Running,

    /// Finished with a result.
    Succeeded,

    /// Finished with an error.
    Failed,

    /// Canceled, either remotely or by the local terminator.
    Canceled,
}

impl OperationStatus {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OperationStatus::Succeeded | OperationStatus::Failed | OperationStatus::Canceled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationStatus::NotStarted => "notStarted",
            OperationStatus::Running => "running",
            OperationStatus::Succeeded => "succeeded",
            OperationStatus::Failed => "failed",
            OperationStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::not_started(OperationStatus::NotStarted, "\"notStarted\"")]
    #[case::running(OperationStatus::Running, "\"running\"")]
    #[case::succeeded(OperationStatus::Succeeded, "\"succeeded\"")]
    #[case::failed(OperationStatus::Failed, "\"failed\"")]
    #[case::canceled(OperationStatus::Canceled, "\"canceled\"")]
    fn status_uses_service_wire_names(#[case] status: OperationStatus, #[case] wire: &str) {
        assert_eq!(serde_json::to_string(&status).unwrap(), wire);
        assert_eq!(format!("\"{status}\""), wire);
    }

    #[test]
    fn only_finished_states_are_terminal() {
        assert!(!OperationStatus::NotStarted.is_terminal());
        assert!(!OperationStatus::Running.is_terminal());
        assert!(OperationStatus::Succeeded.is_terminal());
        assert!(OperationStatus::Failed.is_terminal());
        assert!(OperationStatus::Canceled.is_terminal());
    }
}
