//! Caller-level retry with exponential backoff and jitter
//!
//! The dispatcher never retries on its own. [`submit_with_retry`] resubmits a freshly built
//! task while the failure looks transient, sleeping between attempts.

use crate::dispatcher::Dispatcher;
use crate::error::DispatchResult;
use crate::priority::Priority;
use crate::task::Task;
use baaskit_core::{Envelope, FailureReason};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Whether a failure is worth another attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    Retryable,
    NonRetryable,
    /// Retry, but wait twice as long
    RateLimited,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_jitter() -> bool {
    true
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self { max_retries: 0, ..Self::default() }
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retry number `attempt + 1`
    pub fn delay_for(&self, attempt: u32, class: RetryClass) -> Duration {
        let base = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let adjusted = match class {
            RetryClass::RateLimited => base * 2.0,
            _ => base,
        };
        let capped = adjusted.min(self.max_delay_ms as f64);

        let delay = if self.jitter {
            // Full jitter: uniform in [0, capped]
            rand::thread_rng().gen::<f64>() * capped
        } else {
            capped
        };
        Duration::from_millis(delay as u64)
    }
}

/// Classify a status code the server answered with
pub fn classify_status(status: u16) -> RetryClass {
    match status {
        408 => RetryClass::Retryable,
        429 => RetryClass::RateLimited,
        501 | 505 => RetryClass::NonRetryable,
        500..=599 => RetryClass::Retryable,
        _ => RetryClass::NonRetryable,
    }
}

pub fn classify_failure(reason: &FailureReason) -> RetryClass {
    match reason {
        FailureReason::Transport(error) if error.is_transient() => RetryClass::Retryable,
        FailureReason::ClientError { status, .. } | FailureReason::ServerError { status } => {
            classify_status(*status)
        }
        _ => RetryClass::NonRetryable,
    }
}

/// Submit `make_task()` and resubmit a new instance while the failure is retryable
///
/// The last envelope is returned once it succeeds, fails permanently, or retries run out.
pub async fn submit_with_retry<T, M>(
    dispatcher: &Dispatcher,
    mut make_task: M,
    priority: Priority,
    policy: &RetryPolicy,
) -> DispatchResult<Envelope<T::Output>>
where
    T: Task,
    M: FnMut() -> T,
{
    let mut attempt = 0;
    loop {
        let task = make_task();
        let name = task.name();
        let envelope = dispatcher.submit_sync(task, priority).await?;

        let reason = match envelope {
            Ok(value) => return Ok(Ok(value)),
            Err(reason) => reason,
        };
        let class = classify_failure(&reason);
        if class == RetryClass::NonRetryable {
            debug!(task = name, %reason, "failure is not retryable");
            return Ok(Err(reason));
        }
        if attempt >= policy.max_retries {
            warn!(task = name, attempts = attempt + 1, %reason, "giving up after retries");
            return Ok(Err(reason));
        }

        let delay = policy.delay_for(attempt, class);
        warn!(
            task = name,
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            %reason,
            "retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
