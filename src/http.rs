use std::fmt;

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::errors::{Error, ProviderError, Result};

/// Static description of a provider's REST surface.
#[derive(Clone, Copy, Debug)]
pub struct ApiProfile {
    /// Label used in error messages, e.g. `Jira Cloud` or `Stripe`.
    pub label: &'static str,
    /// Production base URL. Providers with per-tenant hosts build theirs at runtime.
    pub base_url: &'static str,
    /// JSON pointers tried, in order, to pull a message out of an error body.
    pub error_pointers: &'static [&'static str],
}

/// Error body pointers shared by most providers.
pub const DEFAULT_ERROR_POINTERS: &[&str] = &[
    "/error/message",
    "/message",
    "/error_description",
    "/error",
];

/// Credentials applied to every outgoing request.
#[derive(Clone, Default)]
pub enum Auth {
    #[default]
    None,
    Bearer(String),
    Basic {
        username: String,
        password: String,
    },
    Header {
        name: &'static str,
        value: String,
    },
    Query {
        name: &'static str,
        value: String,
    },
}

impl Auth {
    /// Bearer token, tolerating callers that already prefixed `Bearer `.
    pub fn bearer(token: impl AsRef<str>) -> Self {
        let token = token.as_ref().trim();
        let token = token
            .strip_prefix("Bearer ")
            .or_else(|| token.strip_prefix("bearer "))
            .unwrap_or(token);
        Auth::Bearer(token.to_string())
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Auth::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn header(name: &'static str, value: impl Into<String>) -> Self {
        Auth::Header {
            name,
            value: value.into(),
        }
    }

    /// Credential sent as a query parameter (API-key style providers).
    pub fn query(name: &'static str, value: impl Into<String>) -> Self {
        Auth::Query {
            name,
            value: value.into(),
        }
    }

    pub(crate) fn apply(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Auth::None => builder,
            Auth::Bearer(token) => builder.bearer_auth(token),
            Auth::Basic { username, password } => builder.basic_auth(username, Some(password)),
            Auth::Header { name, value } => builder.header(*name, value),
            Auth::Query { name, value } => builder.query(&[(*name, value)]),
        }
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::None => write!(f, "None"),
            Auth::Bearer(_) => write!(f, "Bearer(<redacted>)"),
            Auth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Auth::Header { name, .. } => f
                .debug_struct("Header")
                .field("name", name)
                .field("value", &"<redacted>")
                .finish(),
            Auth::Query { name, .. } => f
                .debug_struct("Query")
                .field("name", name)
                .field("value", &"<redacted>")
                .finish(),
        }
    }
}

/// A single multipart form part.
#[derive(Clone, Debug)]
pub struct MultipartPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Request payload variants used across providers.
#[derive(Clone, Debug, Default)]
pub enum Body {
    #[default]
    Empty,
    Json(Value),
    /// `application/x-www-form-urlencoded` pairs, already flattened.
    Form(Vec<(String, String)>),
    Text {
        content_type: String,
        text: String,
    },
    Bytes {
        content_type: String,
        data: Vec<u8>,
    },
    Multipart(Vec<MultipartPart>),
}

/// Fully-templated request description handed to [`crate::RestClient`].
#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderList,
    pub body: Body,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderList::new(),
            body: Body::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Adds the pair only when a value is present.
    pub fn query_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Adds a header; blank keys or values are skipped.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let entry = HeaderEntry::new(key.into(), value.into());
        if entry.is_valid() {
            self.headers.push(entry);
        }
        self
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Body::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn json_value(mut self, body: Value) -> Self {
        self.body = Body::Json(body);
        self
    }

    pub fn form(mut self, pairs: Vec<(String, String)>) -> Self {
        self.body = Body::Form(pairs);
        self
    }

    pub fn text(mut self, content_type: impl Into<String>, text: impl Into<String>) -> Self {
        self.body = Body::Text {
            content_type: content_type.into(),
            text: text.into(),
        };
        self
    }

    pub fn bytes(mut self, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        self.body = Body::Bytes {
            content_type: content_type.into(),
            data,
        };
        self
    }

    pub fn multipart(mut self, parts: Vec<MultipartPart>) -> Self {
        self.body = Body::Multipart(parts);
        self
    }
}

/// Structured header list with validation.
#[derive(Clone, Debug, Default)]
pub struct HeaderList(Vec<HeaderEntry>);

impl HeaderList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Add a header entry. Panics if key or value is empty/whitespace-only.
    ///
    /// # Panics
    /// Panics if the header key or value is empty or contains only whitespace.
    pub fn push(&mut self, entry: HeaderEntry) {
        assert!(
            entry.is_valid(),
            "Invalid header: key and value must be non-empty (got key={:?}, value={:?})",
            entry.key,
            entry.value
        );
        self.0.push(entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeaderEntry> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct HeaderEntry {
    pub key: String,
    pub value: String,
}

impl HeaderEntry {
    pub fn new(key: String, value: String) -> Self {
        Self { key, value }
    }

    pub fn is_valid(&self) -> bool {
        !(self.key.trim().is_empty() || self.value.trim().is_empty())
    }
}

/// Turn a non-success response into a provider-labelled [`Error::Api`].
pub(crate) fn parse_provider_error(profile: &ApiProfile, status: StatusCode, body: String) -> Error {
    let status_text = status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string();

    if body.trim().is_empty() {
        return ProviderError::new(profile.label, status.as_u16(), status_text).into();
    }

    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| message_from_body(&value, profile.error_pointers))
        .unwrap_or_else(|| body.clone());

    ProviderError {
        provider: profile.label.to_string(),
        status: status.as_u16(),
        message,
        raw_body: Some(body),
    }
    .into()
}

fn message_from_body(value: &Value, pointers: &[&str]) -> Option<String> {
    for pointer in pointers {
        match value.pointer(pointer) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
            Some(Value::Array(items)) if !items.is_empty() => {
                let joined = items
                    .iter()
                    .filter_map(|item| item.as_str())
                    .collect::<Vec<_>>()
                    .join("; ");
                if !joined.is_empty() {
                    return Some(joined);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const PROFILE: ApiProfile = ApiProfile {
        label: "Jira Cloud",
        base_url: "https://example.atlassian.net/rest/api/3",
        error_pointers: &["/errorMessages", "/message"],
    };

    #[test]
    fn provider_error_prefers_configured_pointers() {
        let body = json!({"errorMessages": ["Issue does not exist"], "errors": {}}).to_string();
        let err = parse_provider_error(&PROFILE, StatusCode::NOT_FOUND, body);
        assert_eq!(err.to_string(), "Jira Cloud API error: Issue does not exist");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn provider_error_falls_back_to_raw_body_then_status_text() {
        let err = parse_provider_error(&PROFILE, StatusCode::BAD_GATEWAY, "upstream down".into());
        assert_eq!(err.to_string(), "Jira Cloud API error: upstream down");

        let err = parse_provider_error(&PROFILE, StatusCode::SERVICE_UNAVAILABLE, String::new());
        assert_eq!(err.to_string(), "Jira Cloud API error: Service Unavailable");
    }

    #[test]
    fn bearer_strips_existing_prefix() {
        match Auth::bearer("Bearer abc123") {
            Auth::Bearer(token) => assert_eq!(token, "abc123"),
            other => panic!("unexpected auth {other:?}"),
        }
    }

    #[test]
    fn auth_debug_never_prints_secrets() {
        let rendered = format!("{:?}", Auth::basic("me@example.com", "secret-token"));
        assert!(rendered.contains("me@example.com"));
        assert!(!rendered.contains("secret-token"));
    }

    #[test]
    fn query_auth_is_appended_to_the_url() {
        let builder = reqwest::Client::new().get("https://api.example.com/v1/items?limit=5");
        let request = Auth::query("api_key", "k-123").apply(builder).build().unwrap();
        assert_eq!(request.url().query(), Some("limit=5&api_key=k-123"));
        assert!(request.headers().get(reqwest::header::AUTHORIZATION).is_none());
    }

    #[test]
    fn blank_headers_are_skipped() {
        let req = ApiRequest::get("/x").header("X-Empty", " ").header("X-Kept", "1");
        let keys: Vec<_> = req.headers.iter().map(|h| h.key.as_str()).collect();
        assert_eq!(keys, vec!["X-Kept"]);
    }

    #[test]
    fn query_opt_skips_none() {
        let req = ApiRequest::get("/x")
            .query_opt("a", Some(1))
            .query_opt::<String>("b", None);
        assert_eq!(req.query, vec![("a".to_string(), "1".to_string())]);
    }
}
