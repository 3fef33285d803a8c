use baaskit_core::CoreError;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Unsupported credentials file version {0}")]
    UnsupportedVersion(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credentials writer has stopped")]
    WriterStopped,
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Serialization(e) => CoreError::Serde(e.to_string()),
            StoreError::Core(e) => e,
            StoreError::UnsupportedVersion(v) => {
                CoreError::Serde(format!("unsupported credentials file version {}", v))
            }
            StoreError::Io(e) => CoreError::Io(e.to_string()),
            StoreError::WriterStopped => CoreError::Io("credentials writer has stopped".to_string()),
        }
    }
}
