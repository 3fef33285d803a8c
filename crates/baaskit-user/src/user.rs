//! The user entity as exchanged with the server

use baaskit_core::json::{require_string, string_at};
use baaskit_core::{CoreError, ParseError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Who may read a block of profile data
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Scope {
    #[serde(rename = "visibleByTheUser")]
    Private,
    #[serde(rename = "visibleByFriends")]
    Friend,
    #[serde(rename = "visibleByRegisteredUsers")]
    Registered,
    #[serde(rename = "visibleByAnonymousUsers")]
    Public,
}

impl Scope {
    pub const ALL: [Scope; 4] = [Scope::Private, Scope::Friend, Scope::Registered, Scope::Public];

    /// Member name in server payloads
    pub fn key(self) -> &'static str {
        match self {
            Scope::Private => "visibleByTheUser",
            Scope::Friend => "visibleByFriends",
            Scope::Registered => "visibleByRegisteredUsers",
            Scope::Public => "visibleByAnonymousUsers",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scope::Private => "private",
            Scope::Friend => "friend",
            Scope::Registered => "registered",
            Scope::Public => "public",
        };
        f.write_str(name)
    }
}

impl FromStr for Scope {
    type Err = CoreError;

    /// Accepts the short names (`private`, `friend`, `registered`, `public`) or payload keys
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scope::ALL
            .into_iter()
            .find(|scope| scope.to_string().eq_ignore_ascii_case(s) || scope.key() == s)
            .ok_or_else(|| CoreError::Invalid(format!("unknown scope '{}'", s)))
    }
}

/// A user account
///
/// Credentials are only known for the account this client signed up or logged in; they are
/// never serialized.
#[derive(Clone, Default, PartialEq, Serialize)]
pub struct User {
    pub username: String,
    #[serde(skip)]
    pub password: Option<String>,
    #[serde(skip)]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signup_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    /// Provider the account was created with, for social accounts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social: Option<String>,
    pub scopes: BTreeMap<Scope, Map<String, JsonValue>>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self { username: username.into(), ..Self::default() }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Data stored under `scope`, if the server sent that scope
    pub fn scope(&self, scope: Scope) -> Option<&Map<String, JsonValue>> {
        self.scopes.get(&scope)
    }

    /// Data stored under `scope`, created empty on first access
    pub fn scope_mut(&mut self, scope: Scope) -> &mut Map<String, JsonValue> {
        self.scopes.entry(scope).or_default()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Read the `data` object of a user payload
    ///
    /// A scope that is missing or `null` stays unset; a scope that is not an object is
    /// treated as empty.
    pub fn from_json(data: &JsonValue) -> Result<Self, ParseError> {
        let mut user = User::new(require_string(data, "/user/name")?);
        user.status = string_at(data, "/user/status");
        user.signup_date = string_at(data, "/signUpDate");
        if let Some(roles) = data.pointer("/user/roles").and_then(JsonValue::as_array) {
            user.roles = roles
                .iter()
                .filter_map(|role| role.get("name").and_then(JsonValue::as_str))
                .map(str::to_string)
                .collect();
        }
        for scope in Scope::ALL {
            match data.get(scope.key()) {
                None | Some(JsonValue::Null) => {}
                Some(JsonValue::Object(values)) => {
                    user.scopes.insert(scope, values.clone());
                }
                Some(_) => {
                    user.scopes.insert(scope, Map::new());
                }
            }
        }
        Ok(user)
    }

    /// Request body carrying the scopes, and the credentials when `with_credentials` is set
    pub fn to_json_body(&self, with_credentials: bool) -> JsonValue {
        let mut body = Map::new();
        if with_credentials {
            body.insert("username".to_string(), JsonValue::String(self.username.clone()));
            body.insert(
                "password".to_string(),
                JsonValue::String(self.password.clone().unwrap_or_default()),
            );
        }
        for (scope, values) in &self.scopes {
            body.insert(scope.key().to_string(), JsonValue::Object(values.clone()));
        }
        JsonValue::Object(body)
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("username", &self.username)
            .field("status", &self.status)
            .field("roles", &self.roles)
            .field("social", &self.social)
            .field("scopes", &self.scopes.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
