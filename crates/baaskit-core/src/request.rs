//! Request/response model and the factory tasks use to build requests

use crate::error::{CoreError, CoreResult};
use crate::sanitization::sanitize_json_value;
use crate::session::Session;
use http::Method;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use url::form_urlencoded;
use url::Url;

/// Header carrying the application code on every request
pub const DEFAULT_APP_CODE_HEADER: &str = "X-BAASBOX-APPCODE";
/// Header carrying the session token for authenticated requests
pub const DEFAULT_SESSION_HEADER: &str = "X-BB-SESSION";

/// Request payload
#[derive(Clone, PartialEq)]
pub enum RequestBody {
    Json(JsonValue),
    Form(Vec<(String, String)>),
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Json(value) => {
                f.debug_tuple("Json").field(&sanitize_json_value(value)).finish()
            }
            RequestBody::Form(pairs) => {
                let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
                f.debug_struct("Form").field("fields", &keys).finish()
            }
        }
    }
}

/// A fully built request, ready for a transport
#[derive(Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self { method, url: url.into(), headers: Vec::new(), body: None }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_json(mut self, body: JsonValue) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn with_form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let pairs = fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self.body = Some(RequestBody::Form(pairs));
        self
    }

    /// Append query parameters, percent-encoded
    pub fn with_query<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        let mut any = false;
        for (key, value) in params {
            serializer.append_pair(key.as_ref(), value.as_ref());
            any = true;
        }
        if any {
            let separator = if self.url.contains('?') { '&' } else { '?' };
            self.url.push(separator);
            self.url.push_str(&serializer.finish());
        }
        self
    }

    /// First header value with a case-insensitive name match
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// URL path without query string
    pub fn path(&self) -> String {
        Url::parse(&self.url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| self.url.split('?').next().unwrap_or_default().to_string())
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header_names: Vec<&str> = self.headers.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &header_names)
            .field("body", &self.body)
            .finish()
    }
}

/// Response as received, body fully read
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Response {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, headers: HashMap::new(), body: body.into() }
    }

    pub fn json(status: u16, body: &JsonValue) -> Self {
        Self::new(status, body.to_string()).with_header("content-type", "application/json")
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Builds URLs and common headers for one backend
#[derive(Debug, Clone)]
pub struct RequestFactory {
    base_url: String,
    app_code: String,
    app_code_header: String,
    session_header: String,
}

impl RequestFactory {
    /// Create a factory for `base_url`, which must be an absolute http(s) URL
    pub fn new(base_url: &str, app_code: impl Into<String>) -> CoreResult<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| CoreError::Invalid(format!("Invalid base URL '{}': {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CoreError::Invalid(format!(
                "Unsupported scheme '{}' in base URL '{}'",
                parsed.scheme(),
                base_url
            )));
        }

        // Relative endpoints append to the base path, so it has to end with '/'
        let mut base = parsed.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(Self {
            base_url: base,
            app_code: app_code.into(),
            app_code_header: DEFAULT_APP_CODE_HEADER.to_string(),
            session_header: DEFAULT_SESSION_HEADER.to_string(),
        })
    }

    /// Assemble the base URL from its parts, e.g. `http://10.0.2.2:9000/`
    pub fn from_parts(
        https: bool,
        domain: &str,
        port: u16,
        base_path: &str,
        app_code: impl Into<String>,
    ) -> CoreResult<Self> {
        let scheme = if https { "https" } else { "http" };
        let path = base_path.trim_matches('/');
        let url = if path.is_empty() {
            format!("{}://{}:{}/", scheme, domain, port)
        } else {
            format!("{}://{}:{}/{}/", scheme, domain, port, path)
        };
        Self::new(&url, app_code)
    }

    pub fn with_header_names(
        mut self,
        app_code_header: impl Into<String>,
        session_header: impl Into<String>,
    ) -> Self {
        self.app_code_header = app_code_header.into();
        self.session_header = session_header.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn app_code(&self) -> &str {
        &self.app_code
    }

    pub fn session_header(&self) -> &str {
        &self.session_header
    }

    /// Resolve an endpoint template against the base URL
    ///
    /// Each `{}` is replaced, in order, by the next percent-encoded parameter. Placeholders
    /// without a matching parameter are left untouched.
    pub fn endpoint(&self, template: &str, params: &[&str]) -> String {
        let mut path = String::with_capacity(template.len());
        let mut params = params.iter();
        let mut rest = template.trim_start_matches('/');
        while let Some(idx) = rest.find("{}") {
            path.push_str(&rest[..idx]);
            match params.next() {
                Some(param) => path.push_str(&urlencoding::encode(param)),
                None => path.push_str("{}"),
            }
            rest = &rest[idx + 2..];
        }
        path.push_str(rest);
        format!("{}{}", self.base_url, path)
    }

    /// Request with the app code header and, when `session` is populated, its token
    pub fn request(&self, method: Method, url: String, session: &Session) -> Request {
        let mut request =
            Request::new(method, url).with_header(&self.app_code_header, &self.app_code);
        if let Some(token) = session.token() {
            request = request.with_header(&self.session_header, token);
        }
        request
    }
}

/// What a task sees while building its request: the session snapshot taken by the worker
/// and the factory. The snapshot is not re-read later in the same attempt.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    session: &'a Session,
    factory: &'a RequestFactory,
}

impl<'a> RequestContext<'a> {
    pub fn new(session: &'a Session, factory: &'a RequestFactory) -> Self {
        Self { session, factory }
    }

    pub fn session(&self) -> &'a Session {
        self.session
    }

    pub fn factory(&self) -> &'a RequestFactory {
        self.factory
    }

    pub fn is_current(&self, username: &str) -> bool {
        self.session.is_current(username)
    }

    pub fn request(&self, method: Method, template: &str, params: &[&str]) -> Request {
        let url = self.factory.endpoint(template, params);
        self.factory.request(method, url, self.session)
    }

    pub fn get(&self, template: &str, params: &[&str]) -> Request {
        self.request(Method::GET, template, params)
    }

    pub fn post(&self, template: &str, params: &[&str]) -> Request {
        self.request(Method::POST, template, params)
    }

    pub fn put(&self, template: &str, params: &[&str]) -> Request {
        self.request(Method::PUT, template, params)
    }

    pub fn delete(&self, template: &str, params: &[&str]) -> Request {
        self.request(Method::DELETE, template, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn factory() -> RequestFactory {
        RequestFactory::new("http://localhost:9000", "1234567890").unwrap()
    }

    #[test]
    fn test_factory_rejects_bad_base_urls() {
        assert!(RequestFactory::new("not-a-url", "code").is_err());
        assert!(RequestFactory::new("", "code").is_err());
        assert!(RequestFactory::new("ftp://example.com", "code").is_err());
    }

    #[test]
    fn test_from_parts() {
        let f = RequestFactory::from_parts(false, "10.0.2.2", 9000, "/", "code").unwrap();
        assert_eq!(f.base_url(), "http://10.0.2.2:9000/");

        let f = RequestFactory::from_parts(true, "api.example.com", 8443, "/v1", "code").unwrap();
        assert_eq!(f.base_url(), "https://api.example.com:8443/v1/");
        assert_eq!(f.endpoint("me", &[]), "https://api.example.com:8443/v1/me");
    }

    #[test]
    fn test_endpoint_templating() {
        let f = factory();
        assert_eq!(f.endpoint("user", &[]), "http://localhost:9000/user");
        assert_eq!(f.endpoint("/me", &[]), "http://localhost:9000/me");
        assert_eq!(f.endpoint("user/{}", &["alice"]), "http://localhost:9000/user/alice");
        assert_eq!(
            f.endpoint("user/{}/password/reset", &["bob smith"]),
            "http://localhost:9000/user/bob%20smith/password/reset"
        );
        assert_eq!(
            f.endpoint("follow/{}", &["a/b"]),
            "http://localhost:9000/follow/a%2Fb"
        );
        assert_eq!(f.endpoint("social/{}", &[]), "http://localhost:9000/social/{}");
    }

    #[test]
    fn test_context_headers() {
        let f = factory();
        let anonymous = Session::empty();
        let ctx = RequestContext::new(&anonymous, &f);
        let request = ctx.get("users", &[]);
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.header("x-baasbox-appcode"), Some("1234567890"));
        assert_eq!(request.header(DEFAULT_SESSION_HEADER), None);

        let session = Session::authenticated("alice", "pw", "tok-1").unwrap();
        let ctx = RequestContext::new(&session, &f);
        let request = ctx.put("me", &[]).with_json(json!({"visibleByTheUser": {}}));
        assert_eq!(request.header("X-BB-SESSION"), Some("tok-1"));
        assert!(matches!(request.body, Some(RequestBody::Json(_))));
    }

    #[test]
    fn test_query_parameters() {
        let request = Request::new(Method::GET, "http://localhost:9000/users")
            .with_query([("page", "0"), ("where", "name = 'a b'")]);
        assert_eq!(
            request.url,
            "http://localhost:9000/users?page=0&where=name+%3D+%27a+b%27"
        );
        assert_eq!(request.path(), "/users");

        let unchanged =
            Request::new(Method::GET, "http://localhost:9000/users").with_query(Vec::<(String, String)>::new());
        assert_eq!(unchanged.url, "http://localhost:9000/users");
    }

    #[test]
    fn test_debug_hides_secrets() {
        let request = Request::new(Method::POST, "http://localhost:9000/login")
            .with_header("X-BB-SESSION", "tok-secret")
            .with_form([("username", "alice"), ("password", "hunter2")]);
        let printed = format!("{:?}", request);
        assert!(printed.contains("username"));
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("tok-secret"));

        let json_request = Request::new(Method::PUT, "http://localhost:9000/me/password")
            .with_json(json!({"password": "hunter2"}));
        assert!(!format!("{:?}", json_request).contains("hunter2"));
    }

    #[test]
    fn test_response_helpers() {
        let response = Response::json(200, &json!({"result": "ok"}));
        assert!(response.is_success());
        assert_eq!(response.headers.get("content-type").map(String::as_str), Some("application/json"));
        assert!(response.text().contains("ok"));
        assert!(!Response::new(404, "").is_success());
    }
}
