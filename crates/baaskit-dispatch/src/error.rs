use thiserror::Error;

pub type DispatchResult<T> = Result<T, DispatchError>;

/// Failures of the dispatcher itself. Task failures travel inside the envelope instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("dispatcher is shut down")]
    ShutDown,

    #[error("invalid dispatcher configuration: {0}")]
    InvalidConfig(String),

    #[error("dispatcher must be started inside a tokio runtime")]
    NoRuntime,

    #[error("worker stopped before delivering a result")]
    WorkerLost,
}
