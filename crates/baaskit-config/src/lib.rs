//! Client configuration: defaults, YAML/JSON files, environment placeholders and overrides

pub mod client;
pub mod env_resolver;
pub mod error;
pub mod loader;

pub use client::ClientConfig;
pub use env_resolver::{EnvResolver, EnvResolverError};
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, FileFormat};
