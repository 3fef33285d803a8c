//! Current identity and the store that owns it
//!
//! A [`Session`] is either empty or fully populated: it can only be built through
//! [`Session::authenticated`], which refuses an identity without a token and vice versa.
//! Stores replace the whole value on every write, so readers never see a half-updated
//! session.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, PoisonError};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Credentials {
    username: String,
    #[serde(default)]
    password: String,
    token: String,
}

/// Snapshot of who is logged in
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session {
    credentials: Option<Credentials>,
}

impl Session {
    /// No authenticated identity
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a populated session. The password may be empty (social accounts have none).
    pub fn authenticated(
        username: impl Into<String>,
        password: impl Into<String>,
        token: impl Into<String>,
    ) -> CoreResult<Self> {
        let credentials = Credentials {
            username: username.into(),
            password: password.into(),
            token: token.into(),
        };
        let session = Self { credentials: Some(credentials) };
        session.validate()?;
        Ok(session)
    }

    /// Check the identity/token invariant. Needed for sessions that came from disk.
    pub fn validate(&self) -> CoreResult<()> {
        match &self.credentials {
            None => Ok(()),
            Some(c) if c.username.is_empty() => {
                Err(CoreError::Invalid("session identity cannot be empty".to_string()))
            }
            Some(c) if c.token.is_empty() => Err(CoreError::Invalid(format!(
                "session for '{}' has no token",
                c.username
            ))),
            Some(_) => Ok(()),
        }
    }

    /// Same identity and token, new secret
    pub fn with_secret(&self, password: impl Into<String>) -> CoreResult<Self> {
        match &self.credentials {
            Some(c) => Self::authenticated(c.username.clone(), password, c.token.clone()),
            None => Err(CoreError::Invalid(
                "cannot change the secret of an empty session".to_string(),
            )),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn identity(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.username.as_str())
    }

    pub fn secret(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.password.as_str())
    }

    pub fn token(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.token.as_str())
    }

    /// Whether `username` is the authenticated identity of this session
    pub fn is_current(&self, username: &str) -> bool {
        self.identity() == Some(username)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.credentials {
            None => f.write_str("Session(empty)"),
            Some(c) => f
                .debug_struct("Session")
                .field("identity", &c.username)
                .field("secret", &"***REDACTED***")
                .field("token", &"***REDACTED***")
                .finish(),
        }
    }
}

/// Single source of truth for the current identity
///
/// Implementations serialize `get`/`set`/`clear` behind one exclusion mechanism and must
/// not block for unbounded time: dispatcher workers call them between network exchanges.
pub trait CredentialStore: Send + Sync {
    /// Copy of the current session
    fn get(&self) -> Session;

    /// Replace the current session; `Session::empty()` clears it
    fn set(&self, session: Session) -> CoreResult<()>;

    fn clear(&self) -> CoreResult<()> {
        self.set(Session::empty())
    }
}

/// Process-local store, lost on exit
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    session: Mutex<Session>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self { session: Mutex::new(session) }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Session {
        self.session.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set(&self, session: Session) -> CoreResult<()> {
        session.validate()?;
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = session;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticated_requires_identity_and_token() {
        assert!(Session::authenticated("alice", "pw", "tok-1").is_ok());
        assert!(Session::authenticated("", "pw", "tok-1").is_err());
        assert!(Session::authenticated("alice", "pw", "").is_err());
        // social accounts carry no password
        assert!(Session::authenticated("alice", "", "tok-1").is_ok());
    }

    #[test]
    fn test_accessors() {
        let session = Session::authenticated("alice", "pw", "tok-1").unwrap();
        assert_eq!(session.identity(), Some("alice"));
        assert_eq!(session.secret(), Some("pw"));
        assert_eq!(session.token(), Some("tok-1"));
        assert!(session.is_current("alice"));
        assert!(!session.is_current("bob"));

        let empty = Session::empty();
        assert!(!empty.is_authenticated());
        assert_eq!(empty.token(), None);
        assert!(!empty.is_current("alice"));
    }

    #[test]
    fn test_with_secret_keeps_identity_and_token() {
        let session = Session::authenticated("alice", "pw", "tok-1").unwrap();
        let changed = session.with_secret("pw2").unwrap();
        assert_eq!(changed.identity(), Some("alice"));
        assert_eq!(changed.secret(), Some("pw2"));
        assert_eq!(changed.token(), Some("tok-1"));

        assert!(Session::empty().with_secret("pw").is_err());
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let session = Session::authenticated("alice", "hunter2", "tok-secret").unwrap();
        let printed = format!("{:?}", session);
        assert!(printed.contains("alice"));
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("tok-secret"));
    }

    #[test]
    fn test_serde_shape() {
        let empty = serde_json::to_string(&Session::empty()).unwrap();
        assert_eq!(empty, "null");

        let session = Session::authenticated("alice", "pw", "tok-1").unwrap();
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["username"], "alice");
        assert_eq!(json["token"], "tok-1");

        let back: Session = serde_json::from_value(json).unwrap();
        assert_eq!(back, session);

        let broken: Session =
            serde_json::from_str(r#"{"username":"alice","token":""}"#).unwrap();
        assert!(broken.validate().is_err());
    }

    #[test]
    fn test_memory_store_replaces_and_clears() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.get(), Session::empty());

        let session = Session::authenticated("alice", "pw", "tok-1").unwrap();
        store.set(session.clone()).unwrap();
        assert_eq!(store.get(), session);

        store.clear().unwrap();
        assert!(!store.get().is_authenticated());
    }
}
