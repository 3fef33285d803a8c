//! reqwest-backed [`baaskit_core::Transport`]

pub mod timeout;
pub mod transport;

pub use timeout::{TimeoutConfig, TimeoutManager};
pub use transport::HttpTransport;
