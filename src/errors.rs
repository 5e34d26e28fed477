use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Required parameters that were absent from an action invocation.
///
/// Every missing name is collected before the error is raised, in the order
/// the action declares them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MissingParameters {
    pub names: Vec<String>,
}

impl MissingParameters {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for MissingParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.names.len() == 1 {
            write!(f, "Missing required parameter: {}", self.names[0])
        } else {
            write!(f, "Missing required parameters: {}", self.names.join(", "))
        }
    }
}

impl std::error::Error for MissingParameters {}

/// Structured validation error for malformed (present but unusable) input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(field) = &self.field {
            write!(f, "{}: {}", field, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<String> for ValidationError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ValidationError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Non-success response returned by a third-party API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderError {
    /// Human-readable provider label, e.g. `Stripe` or `Jira Cloud`.
    pub provider: String,
    pub status: u16,
    pub message: String,
    /// Raw response body for debugging (when available).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_body: Option<String>,
}

impl ProviderError {
    pub fn new(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            status,
            message: message.into(),
            raw_body: None,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} API error: {}", self.provider, self.message)
    }
}

impl std::error::Error for ProviderError {}

/// Transport-level error (timeouts, DNS/TLS/connectivity).
#[derive(Debug, Error)]
#[error("{provider} API error: {message}")]
pub struct TransportError {
    pub provider: String,
    pub kind: TransportErrorKind,
    pub message: String,
    #[source]
    pub source: Option<reqwest::Error>,
}

/// Broad transport error kinds for classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Request,
    Body,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Request => "request",
            TransportErrorKind::Body => "body",
            TransportErrorKind::Other => "transport",
        };
        write!(f, "{label}")
    }
}

/// Convenience alias for fallible results.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Unified error type surfaced by every adapter and dispatcher.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    MissingParameters(#[from] MissingParameters),

    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    #[error("Invalid {provider} authentication")]
    InvalidAuthentication { provider: String },

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Api(#[from] ProviderError),

    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },

    #[error("unknown plugin: {0}")]
    UnknownPlugin(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn missing<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Error::MissingParameters(MissingParameters::new(names))
    }

    pub fn invalid_auth(provider: impl Into<String>) -> Self {
        Error::InvalidAuthentication {
            provider: provider.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(ValidationError::new(message))
    }

    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// HTTP status of the upstream failure, looking through context wrappers.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(err) => Some(err.status),
            Error::Context { source, .. } => source.status(),
            _ => None,
        }
    }

    /// The innermost error beneath any context wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Error normalizer: attach an operation context to any failure.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|err| Into::<Error>::into(err).with_context(context))
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|err| Into::<Error>::into(err).with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_parameters_singular_and_plural() {
        let one = MissingParameters::new(["summary"]);
        assert_eq!(one.to_string(), "Missing required parameter: summary");

        let many = MissingParameters::new(["projectId", "issueTypeId", "summary"]);
        assert_eq!(
            many.to_string(),
            "Missing required parameters: projectId, issueTypeId, summary"
        );
    }

    #[test]
    fn validation_error_formats_with_field() {
        let err = ValidationError::new("must be an array").with_field("ids");
        assert_eq!(err.to_string(), "ids: must be an array");
    }

    #[test]
    fn provider_error_display_uses_label() {
        let err = Error::from(ProviderError::new("Stripe", 402, "Your card was declined."));
        assert_eq!(err.to_string(), "Stripe API error: Your card was declined.");
        assert_eq!(err.status(), Some(402));
    }

    #[test]
    fn context_wraps_and_keeps_source() {
        let inner: Result<()> = Err(ProviderError::new("Basecamp", 404, "Not Found").into());
        let err = inner.context("Error creating Basecamp webhook").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error creating Basecamp webhook: Basecamp API error: Not Found"
        );
        assert_eq!(err.status(), Some(404));
        assert!(matches!(err.root(), Error::Api(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn unsupported_and_invalid_auth_messages() {
        assert_eq!(
            Error::UnsupportedAction("fly".into()).to_string(),
            "Unsupported action: fly"
        );
        assert_eq!(
            Error::invalid_auth("Jira Cloud").to_string(),
            "Invalid Jira Cloud authentication"
        );
    }
}
