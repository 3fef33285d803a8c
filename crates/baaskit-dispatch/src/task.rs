//! The unit of work accepted by the dispatcher

use baaskit_core::json::error_message;
use baaskit_core::{Envelope, FailureReason, ParseError, Request, RequestContext, Response, Session};

/// Session change prescribed by a classified response
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionEffect {
    #[default]
    Keep,
    Replace(Session),
    Clear,
}

/// Value produced by a 2xx response together with its session change
#[derive(Debug, Clone, PartialEq)]
pub struct Success<T> {
    pub value: T,
    pub effect: SessionEffect,
}

impl<T> Success<T> {
    pub fn keep(value: T) -> Self {
        Self { value, effect: SessionEffect::Keep }
    }

    pub fn replace(value: T, session: Session) -> Self {
        Self { value, effect: SessionEffect::Replace(session) }
    }

    pub fn clear(value: T) -> Self {
        Self { value, effect: SessionEffect::Clear }
    }
}

/// Classification of a response that arrived
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(Success<T>),
    ClientError {
        status: u16,
        reason: Option<String>,
        effect: SessionEffect,
    },
    ServerError {
        status: u16,
    },
    ParseError(String),
}

impl<T> Outcome<T> {
    /// Split into the envelope for the caller and the change for the credential store
    pub fn into_parts(self) -> (Envelope<T>, SessionEffect) {
        match self {
            Outcome::Success(Success { value, effect }) => (Ok(value), effect),
            Outcome::ClientError { status, reason, effect } => {
                (Err(FailureReason::ClientError { status, reason }), effect)
            }
            Outcome::ServerError { status } => {
                (Err(FailureReason::ServerError { status }), SessionEffect::Keep)
            }
            Outcome::ParseError(reason) => (Err(FailureReason::Parse(reason)), SessionEffect::Keep),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

impl<T> From<Result<Success<T>, ParseError>> for Outcome<T> {
    fn from(result: Result<Success<T>, ParseError>) -> Self {
        match result {
            Ok(success) => Outcome::Success(success),
            Err(ParseError(reason)) => Outcome::ParseError(reason),
        }
    }
}

/// A remote operation: builds one request and interprets its response
///
/// Implementations hold immutable parameters and never perform I/O. Every method runs on a
/// dispatcher worker and must return promptly.
pub trait Task: Send + Sync + 'static {
    type Output: Send + 'static;

    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Build the request from the session snapshot, or `None` if a precondition fails
    fn build_request(&self, ctx: &RequestContext<'_>) -> Option<Request>;

    /// Parse a 2xx response
    fn on_ok(&self, response: &Response, session: &Session) -> Result<Success<Self::Output>, ParseError>;

    /// Session change for a 4xx response. A 401 clears the session regardless.
    fn on_client_error(&self, _status: u16, _session: &Session) -> SessionEffect {
        SessionEffect::Keep
    }

    /// Failure delivered when `build_request` returned `None`
    fn on_precondition_skip(&self) -> FailureReason {
        FailureReason::skipped("precondition not met")
    }

    /// Map a response to an outcome. `session` is the snapshot the request was built from.
    ///
    /// Statuses outside the 2xx and 4xx ranges are server errors.
    fn classify(&self, status: u16, response: &Response, session: &Session) -> Outcome<Self::Output> {
        match status {
            200..=299 => self.on_ok(response, session).into(),
            400..=499 => Outcome::ClientError {
                status,
                reason: error_message(&response.body),
                effect: self.on_client_error(status, session),
            },
            _ => Outcome::ServerError { status },
        }
    }
}
