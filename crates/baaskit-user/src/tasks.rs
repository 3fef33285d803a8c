//! Account operations as dispatcher tasks
//!
//! Every task is a plain value holding its parameters. Requests are built from the session
//! snapshot the worker hands in, and responses are turned into a value plus the session change
//! they imply. Tasks never touch the credential store themselves.

use crate::filter::Filter;
use crate::user::User;
use baaskit_core::json::{decode_data, require_string};
use baaskit_core::{FailureReason, ParseError, Request, RequestContext, Response, Session};
use baaskit_dispatch::{SessionEffect, Success, Task};
use serde_json::{json, Value as JsonValue};

pub const NOT_CURRENT_USER: &str = "not the current user";
pub const CANNOT_FOLLOW_YOURSELF: &str = "cannot follow yourself";
pub const NO_PASSWORD: &str = "password cannot be empty";
pub const NO_USERNAME: &str = "username cannot be empty";

const TOKEN_POINTER: &str = "/X-BB-SESSION";

fn authenticated(username: &str, password: &str, token: &str) -> Result<Session, ParseError> {
    Session::authenticated(username, password, token).map_err(|e| ParseError::new(e.to_string()))
}

fn data_array(response: &Response) -> Result<Vec<JsonValue>, ParseError> {
    match decode_data(&response.body)? {
        JsonValue::Array(items) => Ok(items),
        other => Err(ParseError::new(format!("expected a list, got {}", other))),
    }
}

fn credential_skip(username: &str) -> FailureReason {
    if username.is_empty() {
        FailureReason::skipped(NO_USERNAME)
    } else {
        FailureReason::skipped(NO_PASSWORD)
    }
}

/// Create an account and become its session
#[derive(Debug, Clone)]
pub struct Signup {
    pub user: User,
}

impl Signup {
    /// `user` must carry a password
    pub fn new(user: User) -> Self {
        Self { user }
    }
}

impl Task for Signup {
    type Output = User;

    fn name(&self) -> &'static str {
        "signup"
    }

    fn build_request(&self, ctx: &RequestContext<'_>) -> Option<Request> {
        let password = self.user.password.as_deref().unwrap_or_default();
        if self.user.username.is_empty() || password.is_empty() {
            return None;
        }
        Some(ctx.post("user", &[]).with_json(self.user.to_json_body(true)))
    }

    fn on_ok(&self, response: &Response, _session: &Session) -> Result<Success<User>, ParseError> {
        let data = decode_data(&response.body)?;
        let token = require_string(&data, TOKEN_POINTER)?;
        let password = self.user.password.clone().unwrap_or_default();
        let session = authenticated(&self.user.username, &password, &token)?;

        let mut user = match User::from_json(&data) {
            Ok(profile) => profile,
            Err(_) => self.user.clone(),
        };
        user.password = Some(password);
        user.token = Some(token);
        Ok(Success::replace(user, session))
    }

    fn on_precondition_skip(&self) -> FailureReason {
        credential_skip(&self.user.username)
    }
}

/// Push-notification registration sent along with a login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub os: String,
    pub device_id: String,
}

/// Authenticate with username and password
#[derive(Debug, Clone)]
pub struct Login {
    pub username: String,
    pub password: String,
    pub registration: Option<Registration>,
}

impl Login {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into(), registration: None }
    }

    pub fn with_registration(mut self, registration: Registration) -> Self {
        self.registration = Some(registration);
        self
    }
}

impl Task for Login {
    type Output = User;

    fn name(&self) -> &'static str {
        "login"
    }

    fn build_request(&self, ctx: &RequestContext<'_>) -> Option<Request> {
        if self.username.is_empty() || self.password.is_empty() {
            return None;
        }
        let mut form = vec![
            ("username".to_string(), self.username.clone()),
            ("password".to_string(), self.password.clone()),
            ("appcode".to_string(), ctx.factory().app_code().to_string()),
        ];
        if let Some(reg) = &self.registration {
            let login_data = json!({"os": reg.os, "deviceId": reg.device_id});
            form.push(("login_data".to_string(), login_data.to_string()));
        }
        Some(ctx.post("login", &[]).with_form(form))
    }

    fn on_ok(&self, response: &Response, _session: &Session) -> Result<Success<User>, ParseError> {
        let data = decode_data(&response.body)?;
        let token = require_string(&data, TOKEN_POINTER)?;
        let session = authenticated(&self.username, &self.password, &token)?;

        // Older servers answer with the token only
        let mut user = User::from_json(&data).unwrap_or_else(|_| User::new(self.username.clone()));
        user.password = Some(self.password.clone());
        user.token = Some(token);
        Ok(Success::replace(user, session))
    }

    fn on_precondition_skip(&self) -> FailureReason {
        credential_skip(&self.username)
    }
}

/// Sign up or log in through a social provider's OAuth credentials
#[derive(Debug, Clone)]
pub struct SocialSignup {
    pub provider: String,
    pub oauth_token: String,
    pub oauth_secret: String,
}

impl SocialSignup {
    pub fn new(
        provider: impl Into<String>,
        oauth_token: impl Into<String>,
        oauth_secret: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            oauth_token: oauth_token.into(),
            oauth_secret: oauth_secret.into(),
        }
    }
}

impl Task for SocialSignup {
    type Output = User;

    fn name(&self) -> &'static str {
        "social_signup"
    }

    fn build_request(&self, ctx: &RequestContext<'_>) -> Option<Request> {
        let body = json!({"oauth_token": self.oauth_token, "oauth_secret": self.oauth_secret});
        Some(ctx.post("social/{}", &[self.provider.as_str()]).with_json(body))
    }

    fn on_ok(&self, response: &Response, _session: &Session) -> Result<Success<User>, ParseError> {
        let data = decode_data(&response.body)?;
        let token = require_string(&data, TOKEN_POINTER)?;
        let mut user = User::from_json(&data)?;
        // Social accounts have no password
        let session = authenticated(&user.username, "", &token)?;

        user.token = Some(token);
        user.social = Some(self.provider.clone());
        Ok(Success::replace(user, session))
    }
}

/// End the current session, optionally unregistering a device from push notifications
#[derive(Debug, Clone)]
pub struct Logout {
    pub username: String,
    pub registration: Option<String>,
}

impl Logout {
    pub fn new(username: impl Into<String>) -> Self {
        Self { username: username.into(), registration: None }
    }

    pub fn with_registration(mut self, registration: impl Into<String>) -> Self {
        self.registration = Some(registration.into());
        self
    }
}

impl Task for Logout {
    type Output = ();

    fn name(&self) -> &'static str {
        "logout"
    }

    fn build_request(&self, ctx: &RequestContext<'_>) -> Option<Request> {
        if !ctx.is_current(&self.username) {
            return None;
        }
        Some(match &self.registration {
            Some(registration) => ctx.post("logout/{}", &[registration.as_str()]),
            None => ctx.post("logout", &[]),
        })
    }

    fn on_ok(&self, _response: &Response, _session: &Session) -> Result<Success<()>, ParseError> {
        Ok(Success::clear(()))
    }

    /// The server rejected the token, so it is useless either way
    fn on_client_error(&self, _status: u16, _session: &Session) -> SessionEffect {
        SessionEffect::Clear
    }

    fn on_precondition_skip(&self) -> FailureReason {
        FailureReason::skipped(NOT_CURRENT_USER)
    }
}

/// Store the profile scopes of the current user
#[derive(Debug, Clone)]
pub struct SaveUser {
    pub user: User,
}

impl SaveUser {
    pub fn new(user: User) -> Self {
        Self { user }
    }
}

impl Task for SaveUser {
    type Output = User;

    fn name(&self) -> &'static str {
        "save_user"
    }

    fn build_request(&self, ctx: &RequestContext<'_>) -> Option<Request> {
        if !ctx.is_current(&self.user.username) {
            return None;
        }
        Some(ctx.put("me", &[]).with_json(self.user.to_json_body(false)))
    }

    fn on_ok(&self, response: &Response, _session: &Session) -> Result<Success<User>, ParseError> {
        let data = decode_data(&response.body)?;
        Ok(Success::keep(User::from_json(&data)?))
    }

    fn on_precondition_skip(&self) -> FailureReason {
        FailureReason::skipped(NOT_CURRENT_USER)
    }
}

/// Change the password of the current user; the old one is taken from the session
#[derive(Debug, Clone)]
pub struct ChangePassword {
    pub username: String,
    pub new_password: String,
}

impl ChangePassword {
    pub fn new(username: impl Into<String>, new_password: impl Into<String>) -> Self {
        Self { username: username.into(), new_password: new_password.into() }
    }
}

impl Task for ChangePassword {
    type Output = ();

    fn name(&self) -> &'static str {
        "change_password"
    }

    fn build_request(&self, ctx: &RequestContext<'_>) -> Option<Request> {
        if !ctx.is_current(&self.username) || self.new_password.is_empty() {
            return None;
        }
        let old = ctx.session().secret().filter(|s| !s.is_empty())?;
        let body = json!({"old": old, "new": self.new_password});
        Some(ctx.put("me/password", &[]).with_json(body))
    }

    fn on_ok(&self, _response: &Response, session: &Session) -> Result<Success<()>, ParseError> {
        let updated = session
            .with_secret(self.new_password.clone())
            .map_err(|e| ParseError::new(e.to_string()))?;
        Ok(Success::replace((), updated))
    }

    fn on_precondition_skip(&self) -> FailureReason {
        if self.new_password.is_empty() {
            FailureReason::skipped(NO_PASSWORD)
        } else {
            FailureReason::skipped(NOT_CURRENT_USER)
        }
    }
}

/// Fetch a profile; the current user's own profile comes from `me`
#[derive(Debug, Clone)]
pub struct FetchUser {
    pub username: String,
}

impl FetchUser {
    pub fn new(username: impl Into<String>) -> Self {
        Self { username: username.into() }
    }
}

impl Task for FetchUser {
    type Output = User;

    fn name(&self) -> &'static str {
        "fetch_user"
    }

    fn build_request(&self, ctx: &RequestContext<'_>) -> Option<Request> {
        if self.username.is_empty() {
            return None;
        }
        if ctx.is_current(&self.username) {
            Some(ctx.get("me", &[]))
        } else {
            Some(ctx.get("user/{}", &[self.username.as_str()]))
        }
    }

    fn on_ok(&self, response: &Response, _session: &Session) -> Result<Success<User>, ParseError> {
        let data = decode_data(&response.body)?;
        Ok(Success::keep(User::from_json(&data)?))
    }

    fn on_precondition_skip(&self) -> FailureReason {
        FailureReason::skipped(NO_USERNAME)
    }
}

/// Which list of users to fetch; `None` means the current user's followers or followings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserList {
    All,
    Followers(Option<String>),
    Following(Option<String>),
}

#[derive(Debug, Clone)]
pub struct FetchUsers {
    pub list: UserList,
    pub filter: Filter,
}

impl FetchUsers {
    pub fn new(list: UserList) -> Self {
        Self { list, filter: Filter::default() }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }
}

impl Task for FetchUsers {
    type Output = Vec<User>;

    fn name(&self) -> &'static str {
        "fetch_users"
    }

    fn build_request(&self, ctx: &RequestContext<'_>) -> Option<Request> {
        let request = match &self.list {
            UserList::All => ctx.get("users", &[]),
            UserList::Followers(Some(name)) => ctx.get("followers/{}", &[name.as_str()]),
            UserList::Followers(None) => ctx.get("followers", &[]),
            UserList::Following(Some(name)) => ctx.get("following/{}", &[name.as_str()]),
            UserList::Following(None) => ctx.get("following", &[]),
        };
        Some(request.with_query(self.filter.to_query()))
    }

    fn on_ok(&self, response: &Response, _session: &Session) -> Result<Success<Vec<User>>, ParseError> {
        let users = data_array(response)?
            .iter()
            .map(User::from_json)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Success::keep(users))
    }
}

/// Follow another user; the answer is the followed user's profile
#[derive(Debug, Clone)]
pub struct Follow {
    pub username: String,
}

impl Follow {
    pub fn new(username: impl Into<String>) -> Self {
        Self { username: username.into() }
    }
}

impl Task for Follow {
    type Output = User;

    fn name(&self) -> &'static str {
        "follow"
    }

    fn build_request(&self, ctx: &RequestContext<'_>) -> Option<Request> {
        if ctx.is_current(&self.username) {
            return None;
        }
        Some(ctx.post("follow/{}", &[self.username.as_str()]))
    }

    fn on_ok(&self, response: &Response, _session: &Session) -> Result<Success<User>, ParseError> {
        let data = decode_data(&response.body)?;
        Ok(Success::keep(User::from_json(&data)?))
    }

    fn on_precondition_skip(&self) -> FailureReason {
        FailureReason::skipped(CANNOT_FOLLOW_YOURSELF)
    }
}

#[derive(Debug, Clone)]
pub struct Unfollow {
    pub username: String,
}

impl Unfollow {
    pub fn new(username: impl Into<String>) -> Self {
        Self { username: username.into() }
    }
}

impl Task for Unfollow {
    type Output = ();

    fn name(&self) -> &'static str {
        "unfollow"
    }

    fn build_request(&self, ctx: &RequestContext<'_>) -> Option<Request> {
        if ctx.is_current(&self.username) {
            return None;
        }
        Some(ctx.delete("follow/{}", &[self.username.as_str()]))
    }

    fn on_ok(&self, _response: &Response, _session: &Session) -> Result<Success<()>, ParseError> {
        Ok(Success::keep(()))
    }

    fn on_precondition_skip(&self) -> FailureReason {
        FailureReason::skipped(CANNOT_FOLLOW_YOURSELF)
    }
}

/// Ask the server to mail a password reset link
#[derive(Debug, Clone)]
pub struct PasswordReset {
    pub username: String,
}

impl PasswordReset {
    pub fn new(username: impl Into<String>) -> Self {
        Self { username: username.into() }
    }
}

impl Task for PasswordReset {
    type Output = ();

    fn name(&self) -> &'static str {
        "password_reset"
    }

    fn build_request(&self, ctx: &RequestContext<'_>) -> Option<Request> {
        if self.username.is_empty() {
            return None;
        }
        Some(ctx.get("user/{}/password/reset", &[self.username.as_str()]))
    }

    fn on_ok(&self, _response: &Response, _session: &Session) -> Result<Success<()>, ParseError> {
        Ok(Success::keep(()))
    }

    fn on_precondition_skip(&self) -> FailureReason {
        FailureReason::skipped(NO_USERNAME)
    }
}

/// Attach a social provider to the current account
#[derive(Debug, Clone)]
pub struct LinkProvider {
    pub username: String,
    pub provider: String,
    pub oauth_token: String,
    pub oauth_secret: String,
}

impl Task for LinkProvider {
    type Output = ();

    fn name(&self) -> &'static str {
        "link_provider"
    }

    fn build_request(&self, ctx: &RequestContext<'_>) -> Option<Request> {
        if !ctx.is_current(&self.username) {
            return None;
        }
        let body = json!({"oauth_token": self.oauth_token, "oauth_secret": self.oauth_secret});
        Some(ctx.put("social/{}", &[self.provider.as_str()]).with_json(body))
    }

    fn on_ok(&self, _response: &Response, _session: &Session) -> Result<Success<()>, ParseError> {
        Ok(Success::keep(()))
    }

    fn on_precondition_skip(&self) -> FailureReason {
        FailureReason::skipped(NOT_CURRENT_USER)
    }
}

#[derive(Debug, Clone)]
pub struct UnlinkProvider {
    pub username: String,
    pub provider: String,
}

impl Task for UnlinkProvider {
    type Output = ();

    fn name(&self) -> &'static str {
        "unlink_provider"
    }

    fn build_request(&self, ctx: &RequestContext<'_>) -> Option<Request> {
        if !ctx.is_current(&self.username) {
            return None;
        }
        Some(ctx.delete("social/{}", &[self.provider.as_str()]))
    }

    fn on_ok(&self, _response: &Response, _session: &Session) -> Result<Success<()>, ParseError> {
        Ok(Success::keep(()))
    }

    fn on_precondition_skip(&self) -> FailureReason {
        FailureReason::skipped(NOT_CURRENT_USER)
    }
}

/// Social providers linked to the current account, as the server describes them
#[derive(Debug, Clone)]
pub struct FetchLinkedProviders {
    pub username: String,
}

impl Task for FetchLinkedProviders {
    type Output = Vec<JsonValue>;

    fn name(&self) -> &'static str {
        "fetch_linked_providers"
    }

    fn build_request(&self, ctx: &RequestContext<'_>) -> Option<Request> {
        if !ctx.is_current(&self.username) {
            return None;
        }
        Some(ctx.get("social", &[]))
    }

    fn on_ok(&self, response: &Response, _session: &Session) -> Result<Success<Vec<JsonValue>>, ParseError> {
        Ok(Success::keep(data_array(response)?))
    }

    fn on_precondition_skip(&self) -> FailureReason {
        FailureReason::skipped(NOT_CURRENT_USER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baaskit_core::{Method, RequestBody, RequestFactory};
    use baaskit_dispatch::Outcome;

    fn factory() -> RequestFactory {
        RequestFactory::new("http://localhost:9000", "1234567890").unwrap()
    }

    fn alice() -> Session {
        Session::authenticated("alice", "pw", "tok-1").unwrap()
    }

    fn form_value<'a>(request: &'a Request, key: &str) -> Option<&'a str> {
        match &request.body {
            Some(RequestBody::Form(pairs)) => {
                pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
            }
            _ => None,
        }
    }

    #[test]
    fn test_login_request_and_result() {
        let f = factory();
        let anonymous = Session::empty();
        let ctx = RequestContext::new(&anonymous, &f);
        let task = Login::new("alice", "pw").with_registration(Registration {
            os: "android".into(),
            device_id: "dev-1".into(),
        });

        let request = task.build_request(&ctx).unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path(), "/login");
        assert_eq!(form_value(&request, "appcode"), Some("1234567890"));
        let login_data: JsonValue =
            serde_json::from_str(form_value(&request, "login_data").unwrap()).unwrap();
        assert_eq!(login_data, json!({"os": "android", "deviceId": "dev-1"}));

        let response = Response::json(200, &json!({"data": {"X-BB-SESSION": "tok-1"}}));
        let (envelope, effect) = task.classify(200, &response, &anonymous).into_parts();
        let user = envelope.unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.token.as_deref(), Some("tok-1"));
        assert_eq!(effect, SessionEffect::Replace(alice()));
    }

    #[test]
    fn test_login_without_token_is_parse_error() {
        let response = Response::json(200, &json!({"data": {"user": {"name": "alice"}}}));
        let outcome = Login::new("alice", "pw").classify(200, &response, &Session::empty());
        assert!(matches!(outcome, Outcome::ParseError(_)));
    }

    #[test]
    fn test_signup_body_and_skip() {
        let f = factory();
        let anonymous = Session::empty();
        let ctx = RequestContext::new(&anonymous, &f);

        let no_password = Signup::new(User::new("bob"));
        assert!(no_password.build_request(&ctx).is_none());
        assert_eq!(no_password.on_precondition_skip(), FailureReason::skipped(NO_PASSWORD));

        let request = Signup::new(User::new("bob").with_password("pw")).build_request(&ctx).unwrap();
        assert_eq!(request.path(), "/user");
        assert_eq!(
            request.body,
            Some(RequestBody::Json(json!({"username": "bob", "password": "pw"})))
        );
    }

    #[test]
    fn test_social_signup_has_empty_secret() {
        let response = Response::json(
            200,
            &json!({"data": {"user": {"name": "fb_123"}, "X-BB-SESSION": "tok-s"}}),
        );
        let task = SocialSignup::new("facebook", "oauth-t", "oauth-s");
        let (envelope, effect) = task.classify(200, &response, &Session::empty()).into_parts();

        assert_eq!(envelope.unwrap().social.as_deref(), Some("facebook"));
        assert_eq!(
            effect,
            SessionEffect::Replace(Session::authenticated("fb_123", "", "tok-s").unwrap())
        );
    }

    #[test]
    fn test_logout_clears_on_client_error() {
        let f = factory();
        let session = alice();
        let ctx = RequestContext::new(&session, &f);

        let task = Logout::new("alice").with_registration("reg-1");
        assert_eq!(task.build_request(&ctx).unwrap().path(), "/logout/reg-1");
        assert!(Logout::new("bob").build_request(&ctx).is_none());

        let outcome = task.classify(400, &Response::new(400, ""), &session);
        assert_eq!(outcome.into_parts().1, SessionEffect::Clear);
    }

    #[test]
    fn test_change_password() {
        let f = factory();
        let session = alice();
        let ctx = RequestContext::new(&session, &f);

        let task = ChangePassword::new("alice", "pw2");
        let request = task.build_request(&ctx).unwrap();
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.body, Some(RequestBody::Json(json!({"old": "pw", "new": "pw2"}))));

        let (_, effect) = task.classify(200, &Response::new(200, "{}"), &session).into_parts();
        assert_eq!(
            effect,
            SessionEffect::Replace(Session::authenticated("alice", "pw2", "tok-1").unwrap())
        );

        // a social session has no password to send as the old one
        let social = Session::authenticated("alice", "", "tok-1").unwrap();
        assert!(task.build_request(&RequestContext::new(&social, &f)).is_none());
        assert_eq!(task.on_precondition_skip(), FailureReason::skipped(NOT_CURRENT_USER));
    }

    #[test]
    fn test_change_password_skip_reasons() {
        let f = factory();
        let session = alice();
        let ctx = RequestContext::new(&session, &f);

        let empty = ChangePassword::new("alice", "");
        assert!(empty.build_request(&ctx).is_none());
        assert_eq!(empty.on_precondition_skip(), FailureReason::skipped(NO_PASSWORD));

        let foreign = ChangePassword::new("bob", "pw2");
        assert!(foreign.build_request(&ctx).is_none());
        assert_eq!(foreign.on_precondition_skip(), FailureReason::skipped(NOT_CURRENT_USER));
    }

    #[test]
    fn test_fetch_user_endpoint_depends_on_session() {
        let f = factory();
        let session = alice();
        let ctx = RequestContext::new(&session, &f);

        assert_eq!(FetchUser::new("alice").build_request(&ctx).unwrap().path(), "/me");
        assert_eq!(FetchUser::new("bob").build_request(&ctx).unwrap().path(), "/user/bob");
    }

    #[test]
    fn test_fetch_users_lists() {
        let f = factory();
        let session = alice();
        let ctx = RequestContext::new(&session, &f);

        let request = FetchUsers::new(UserList::Followers(Some("bob".into())))
            .with_filter(Filter::new().page(0, 10))
            .build_request(&ctx)
            .unwrap();
        assert_eq!(request.url, "http://localhost:9000/followers/bob?page=0&recordsPerPage=10");
        assert_eq!(
            FetchUsers::new(UserList::Following(None)).build_request(&ctx).unwrap().path(),
            "/following"
        );

        let response = Response::json(
            200,
            &json!({"data": [{"user": {"name": "bob"}}, {"user": {"name": "carol"}}]}),
        );
        let users = FetchUsers::new(UserList::All)
            .classify(200, &response, &session)
            .into_parts()
            .0
            .unwrap();
        let names: Vec<&str> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["bob", "carol"]);

        let not_a_list = Response::json(200, &json!({"data": {}}));
        assert!(matches!(
            FetchUsers::new(UserList::All).classify(200, &not_a_list, &session),
            Outcome::ParseError(_)
        ));
    }

    #[test]
    fn test_cannot_follow_yourself() {
        let f = factory();
        let session = alice();
        let ctx = RequestContext::new(&session, &f);

        assert!(Follow::new("alice").build_request(&ctx).is_none());
        assert_eq!(
            Unfollow::new("alice").on_precondition_skip(),
            FailureReason::skipped(CANNOT_FOLLOW_YOURSELF)
        );
        assert_eq!(Unfollow::new("bob").build_request(&ctx).unwrap().method, Method::DELETE);
    }

    #[test]
    fn test_provider_tasks_require_current_user() {
        let f = factory();
        let session = alice();
        let ctx = RequestContext::new(&session, &f);

        let link = LinkProvider {
            username: "alice".into(),
            provider: "google".into(),
            oauth_token: "t".into(),
            oauth_secret: "s".into(),
        };
        let request = link.build_request(&ctx).unwrap();
        assert_eq!((request.method.clone(), request.path()), (Method::PUT, "/social/google".to_string()));

        let unlink = UnlinkProvider { username: "bob".into(), provider: "google".into() };
        assert!(unlink.build_request(&ctx).is_none());

        let list = FetchLinkedProviders { username: "alice".into() };
        let response = Response::json(200, &json!({"data": [{"from": "google", "id": "g-1"}]}));
        let providers = list.classify(200, &response, &session).into_parts().0.unwrap();
        assert_eq!(providers[0]["from"], "google");
    }
}
