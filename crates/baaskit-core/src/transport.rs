//! Transport abstraction used by dispatcher workers
//!
//! A transport performs exactly one HTTP exchange. It never interprets the status code:
//! any response that arrives, including 4xx and 5xx, is returned as `Ok(Response)`.

use crate::request::{Request, Response};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Failure to complete an exchange at all
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("request could not be sent: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Whether resubmitting the same request could plausibly succeed
    pub fn is_transient(&self) -> bool {
        !matches!(self, TransportError::InvalidRequest(_))
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a request and return the raw response
    async fn execute(&self, request: Request) -> Result<Response, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        (**self).execute(request).await
    }
}
