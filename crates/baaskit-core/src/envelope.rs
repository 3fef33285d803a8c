//! Terminal results of task execution

use crate::transport::TransportError;
use thiserror::Error;

/// HTTP status the server uses for an expired or missing session
pub const UNAUTHENTICATED_STATUS: u16 = 401;

/// Why a task did not produce a value. Once assigned it never changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("request cancelled")]
    Cancelled,

    #[error("request skipped: {0}")]
    PreconditionSkipped(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("client error {status}: {}", .reason.as_deref().unwrap_or("no reason given"))]
    ClientError { status: u16, reason: Option<String> },

    #[error("server error {status}")]
    ServerError { status: u16 },

    #[error("could not parse response: {0}")]
    Parse(String),

    /// Task code panicked; the worker survives and reports it here
    #[error("task panicked: {0}")]
    Panicked(String),
}

impl FailureReason {
    pub fn skipped(reason: impl Into<String>) -> Self {
        FailureReason::PreconditionSkipped(reason.into())
    }

    pub fn parse(reason: impl Into<String>) -> Self {
        FailureReason::Parse(reason.into())
    }

    /// HTTP status carried by the failure, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            FailureReason::ClientError { status, .. } | FailureReason::ServerError { status } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// A client error the server uses to signal an invalid session
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            FailureReason::ClientError { status, .. } if *status == UNAUTHENTICATED_STATUS
        )
    }

    /// Wrap a panic payload caught while running task code
    pub fn panicked(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        FailureReason::Panicked(message)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FailureReason::Cancelled)
    }
}

/// A 2xx body that could not be turned into the task's value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ParseError(pub String);

impl ParseError {
    pub fn new(reason: impl Into<String>) -> Self {
        ParseError(reason.into())
    }
}

impl From<ParseError> for FailureReason {
    fn from(err: ParseError) -> Self {
        FailureReason::Parse(err.0)
    }
}

/// Exactly one of a value or a failure, delivered once per submission
pub type Envelope<T> = Result<T, FailureReason>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_display() {
        let with_reason = FailureReason::ClientError {
            status: 404,
            reason: Some("user not found".to_string()),
        };
        assert_eq!(with_reason.to_string(), "client error 404: user not found");

        let without_reason = FailureReason::ClientError { status: 400, reason: None };
        assert_eq!(without_reason.to_string(), "client error 400: no reason given");
    }

    #[test]
    fn test_unauthenticated_detection() {
        assert!(FailureReason::ClientError { status: 401, reason: None }.is_unauthenticated());
        assert!(!FailureReason::ClientError { status: 403, reason: None }.is_unauthenticated());
        assert!(!FailureReason::ServerError { status: 401 }.is_unauthenticated());
        assert!(!FailureReason::Cancelled.is_unauthenticated());
    }

    #[test]
    fn test_parse_error_conversion() {
        let reason: FailureReason = ParseError::new("missing field '/user/name'").into();
        assert_eq!(reason, FailureReason::Parse("missing field '/user/name'".to_string()));
    }

    #[test]
    fn test_panic_payload_message() {
        let payload = std::panic::catch_unwind(|| panic!("boom {}", 7)).unwrap_err();
        assert_eq!(FailureReason::panicked(&*payload), FailureReason::Panicked("boom 7".into()));

        let payload = std::panic::catch_unwind(|| std::panic::panic_any(42u8)).unwrap_err();
        assert_eq!(
            FailureReason::panicked(&*payload).to_string(),
            "task panicked: unknown panic payload"
        );
    }

    #[test]
    fn test_status_extraction() {
        assert_eq!(FailureReason::ServerError { status: 503 }.status(), Some(503));
        assert_eq!(FailureReason::parse("bad json").status(), None);
        assert_eq!(
            FailureReason::from(TransportError::Timeout("30s".into())).status(),
            None
        );
    }
}
