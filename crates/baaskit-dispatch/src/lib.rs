//! Prioritized, cancellable execution of network tasks
//!
//! A [`Dispatcher`] owns a fixed pool of worker tasks that pull [`Task`]s from one priority
//! queue, run the HTTP exchange through a [`baaskit_core::Transport`], apply the session change
//! the outcome prescribes, and deliver exactly one envelope per submission.

pub mod dispatcher;
pub mod error;
pub mod handle;
mod job;
pub mod priority;
mod queue;
pub mod retry;
pub mod task;

pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use error::{DispatchError, DispatchResult};
pub use handle::RequestHandle;
pub use priority::Priority;
pub use retry::{submit_with_retry, RetryClass, RetryPolicy};
pub use task::{Outcome, SessionEffect, Success, Task};
