//! Timeout handling for HTTP exchanges

use baaskit_core::{CoreError, CoreResult, TransportError};
use reqwest::ClientBuilder;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Connect, read and total budgets in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    pub connect_ms: u64,
    /// 0 means "use the total budget"
    #[serde(default)]
    pub read_ms: u64,
    pub total_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { connect_ms: 10_000, read_ms: 30_000, total_ms: 60_000 }
    }
}

#[derive(Debug, Clone)]
pub struct TimeoutManager {
    config: TimeoutConfig,
}

impl TimeoutManager {
    pub fn new(config: TimeoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TimeoutConfig {
        &self.config
    }

    /// Connection timeout belongs to the client; the rest is applied per request
    pub fn apply_to_client_builder(&self, builder: ClientBuilder) -> ClientBuilder {
        builder.connect_timeout(Duration::from_millis(self.config.connect_ms))
    }

    /// Read timeout when it is set and fits inside the total budget, otherwise the total
    pub fn request_timeout(&self) -> Duration {
        if self.config.read_ms > 0 && self.config.read_ms <= self.config.total_ms {
            Duration::from_millis(self.config.read_ms)
        } else {
            Duration::from_millis(self.config.total_ms)
        }
    }

    pub fn total_timeout(&self) -> Duration {
        Duration::from_millis(self.config.total_ms)
    }

    /// Run `operation` under the total budget, mapping reqwest failures to transport errors
    pub async fn execute_with_timeout<F, T>(&self, operation: F) -> Result<T, TransportError>
    where
        F: Future<Output = Result<T, reqwest::Error>>,
    {
        let total = self.total_timeout();
        match timeout(total, operation).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(error)) => Err(self.map_error(error)),
            Err(_) => Err(TransportError::Timeout(format!(
                "request timed out after {}ms (total timeout)",
                total.as_millis()
            ))),
        }
    }

    pub fn map_error(&self, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout(format!(
                "request timed out after {}ms (read timeout)",
                self.request_timeout().as_millis()
            ))
        } else if error.is_connect() {
            TransportError::Connect(error.to_string())
        } else if error.is_builder() {
            TransportError::InvalidRequest(error.to_string())
        } else {
            TransportError::Io(error.to_string())
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.config.connect_ms == 0 {
            return Err(CoreError::Invalid(
                "connect timeout must be greater than 0".to_string(),
            ));
        }
        if self.config.total_ms == 0 {
            return Err(CoreError::Invalid("total timeout must be greater than 0".to_string()));
        }
        if self.config.connect_ms > self.config.total_ms {
            return Err(CoreError::Invalid(
                "connect timeout cannot be greater than total timeout".to_string(),
            ));
        }
        if self.config.read_ms > self.config.total_ms {
            return Err(CoreError::Invalid(
                "read timeout cannot be greater than total timeout".to_string(),
            ));
        }
        Ok(())
    }
}
