//! Credential stores that outlive the process

pub mod error;
pub mod file;

pub use error::{StoreError, StoreResult};
pub use file::FileCredentialStore;
