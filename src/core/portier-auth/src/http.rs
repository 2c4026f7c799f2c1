//! Transport-agnostic request, response and cookie types.
//!
//! Hosts translate their HTTP messages into these types before running the
//! pipeline, and apply the resulting [`Response`] and [`CookieJar`] afterwards.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parsed request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// URL-encoded or multipart form fields.
    Form(HashMap<String, String>),
    /// JSON document.
    Json(Value),
}

/// Inbound request as seen by authenticators.
///
/// `path` is expected to be percent-decoded already. Header names are
/// matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct Request {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    cookies: HashMap<String, String>,
    server: HashMap<String, String>,
    attributes: HashMap<String, String>,
    body: Body,
}

impl Request {
    /// Creates a request.
    pub fn new(method: impl AsRef<str>, path: impl Into<String>) -> Self {
        Self {
            method: method.as_ref().to_ascii_uppercase(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Creates a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    /// Creates a POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new("POST", path)
    }

    /// Adds a header.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Adds a cookie sent by the client.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Adds a server parameter (e.g. `REMOTE_USER` set by a fronting proxy).
    pub fn with_server_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.server.insert(name.into(), value.into());
        self
    }

    /// Adds a request attribute set by earlier processing.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Sets a form body.
    pub fn with_form<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.body = Body::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Sets a JSON body and the matching content type.
    pub fn with_json(self, body: Value) -> Self {
        let mut request = self.with_header("content-type", "application/json");
        request.body = Body::Json(body);
        request
    }

    /// HTTP method, upper case.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Decoded request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Cookie value sent by the client.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Server parameter.
    pub fn server_param(&self, name: &str) -> Option<&str> {
        self.server.get(name).map(String::as_str)
    }

    /// Request attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Parsed body.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Form field.
    pub fn form_value(&self, name: &str) -> Option<&str> {
        match &self.body {
            Body::Form(fields) => fields.get(name).map(String::as_str),
            _ => None,
        }
    }

    /// Scalar body parameter from a form or a top-level JSON field.
    pub fn body_param(&self, name: &str) -> Option<String> {
        match &self.body {
            Body::Form(fields) => fields.get(name).cloned(),
            Body::Json(Value::Object(map)) => match map.get(name)? {
                Value::String(s) => Some(s.clone()),
                Value::Bool(b) => Some(b.to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Outbound response produced by an authenticator or listener.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Option<String>,
}

impl Response {
    /// Creates an empty response.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: None,
        }
    }

    /// 302 redirect to `location`.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::new(302).with_header("Location", location)
    }

    /// JSON response.
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body(body.to_string())
    }

    /// Adds a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// First header value for `name`, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All headers.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Body.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    /// `SameSite=Lax`.
    Lax,
    /// `SameSite=Strict`.
    Strict,
    /// `SameSite=None`.
    None,
}

/// Cookie set or cleared on the outgoing response.
#[derive(Debug, Clone, PartialEq)]
pub struct Cookie {
    /// Name.
    pub name: String,
    /// Value; `None` clears the cookie on the client.
    pub value: Option<String>,
    /// Expiry as a Unix timestamp; 0 means a session cookie.
    pub expires: u64,
    /// Path.
    pub path: String,
    /// Domain.
    pub domain: Option<String>,
    /// Only sent over HTTPS.
    pub secure: bool,
    /// Hidden from scripts.
    pub http_only: bool,
    /// Cross-site policy.
    pub same_site: Option<SameSite>,
}

impl Cookie {
    /// Creates a session cookie on `/`.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            expires: 0,
            path: "/".into(),
            domain: None,
            secure: false,
            http_only: true,
            same_site: None,
        }
    }

    /// Whether this cookie instructs the client to delete it.
    pub fn is_cleared(&self) -> bool {
        self.value.is_none()
    }
}

/// Cookies accumulated for the outgoing response.
///
/// Keyed by name, path and domain; adding a cookie with the same key
/// replaces the previous one.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
}

impl CookieJar {
    /// Creates an empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a cookie.
    pub fn add(&mut self, cookie: Cookie) {
        self.remove(&cookie.name, &cookie.path, cookie.domain.as_deref());
        self.cookies.push(cookie);
    }

    /// Instructs the client to delete a cookie.
    pub fn forget(&mut self, name: &str, path: &str, domain: Option<&str>) {
        self.add(Cookie {
            name: name.to_string(),
            value: None,
            expires: 1,
            path: path.to_string(),
            domain: domain.map(str::to_string),
            secure: false,
            http_only: true,
            same_site: None,
        });
    }

    /// Looks a cookie up.
    pub fn get(&self, name: &str, path: &str, domain: Option<&str>) -> Option<&Cookie> {
        self.cookies
            .iter()
            .find(|c| c.name == name && c.path == path && c.domain.as_deref() == domain)
    }

    /// Drops a cookie from the jar without clearing it on the client.
    pub fn remove(&mut self, name: &str, path: &str, domain: Option<&str>) {
        self.cookies
            .retain(|c| !(c.name == name && c.path == path && c.domain.as_deref() == domain));
    }

    /// All cookies, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Cookie> {
        self.cookies.iter()
    }

    /// Number of cookies.
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Whether the jar is empty.
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}
