pub mod envelope;
pub mod error;
pub mod json;
pub mod request;
pub mod sanitization;
pub mod session;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Re-export commonly used types
pub use envelope::{Envelope, FailureReason, ParseError, UNAUTHENTICATED_STATUS};
pub use error::{CoreError, CoreResult};
pub use request::{Request, RequestBody, RequestContext, RequestFactory, Response};
pub use sanitization::{is_sensitive_field, sanitize_json_value};
pub use session::{CredentialStore, MemoryCredentialStore, Session};
pub use transport::{Transport, TransportError};

pub use http::Method;
pub use serde_json::Value as JsonValue;
