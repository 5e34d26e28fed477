use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    errors::{Error, Result, TransportError, TransportErrorKind},
    http::{parse_provider_error, ApiProfile, ApiRequest, Auth, Body, HeaderList},
    telemetry::{HttpRequestMetrics, MetricsCallbacks, RequestContext, Telemetry},
    DEFAULT_CLIENT_HEADER, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT,
};

/// Invocation context shared by every adapter.
///
/// All fields are optional; `Config::default()` targets the production APIs.
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Replace the provider base URL (sandboxes, mock servers).
    pub base_url: Option<String>,
    pub http_client: Option<reqwest::Client>,
    /// Override the connect timeout (defaults to 5s).
    pub connect_timeout: Option<Duration>,
    /// Override the request timeout (defaults to 60s).
    pub timeout: Option<Duration>,
    /// User-Agent sent when a provider does not demand its own.
    pub user_agent: Option<String>,
    /// Default extra headers applied to all requests.
    pub default_headers: Option<HeaderList>,
    /// Optional metrics callbacks (HTTP latency and outcome).
    pub metrics: Option<MetricsCallbacks>,
}

impl Config {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// One provider's HTTP surface: base URL, credentials and transport.
///
/// Every call performs exactly one network request; there is no retry.
#[derive(Clone)]
pub struct RestClient {
    inner: Arc<ClientInner>,
    action: Option<String>,
}

struct ClientInner {
    profile: ApiProfile,
    base_url: String,
    auth: Auth,
    http: reqwest::Client,
    request_timeout: Duration,
    user_agent: String,
    default_headers: Option<HeaderList>,
    telemetry: Telemetry,
}

/// Decoded body together with the response headers.
#[derive(Debug)]
pub struct WithHeaders<T> {
    pub body: T,
    pub headers: HeaderMap,
}

impl RestClient {
    /// Client for the profile's production base URL (or the configured override).
    pub fn new(profile: ApiProfile, auth: Auth, cfg: &Config) -> Result<Self> {
        Self::with_base(profile, profile.base_url, auth, cfg)
    }

    /// Client for a per-tenant base URL (Jira instance, Salesforce org, Shopify shop).
    pub fn with_base(
        profile: ApiProfile,
        tenant_base: &str,
        auth: Auth,
        cfg: &Config,
    ) -> Result<Self> {
        let base_source = cfg
            .base_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(tenant_base);
        let base_url = base_source.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url)
            .map_err(|err| Error::Config(format!("invalid base url {base_url:?}: {err}")))?;

        let connect_timeout = cfg.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        let request_timeout = cfg.timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let http = match &cfg.http_client {
            Some(client) => client.clone(),
            None => reqwest::Client::builder()
                .connect_timeout(connect_timeout)
                .build()
                .map_err(|err| TransportError {
                    provider: profile.label.to_string(),
                    kind: TransportErrorKind::Connect,
                    message: "failed to build http client".to_string(),
                    source: Some(err),
                })?,
        };

        let user_agent = cfg
            .user_agent
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CLIENT_HEADER.to_string());

        Ok(Self {
            inner: Arc::new(ClientInner {
                profile,
                base_url,
                auth,
                http,
                request_timeout,
                user_agent,
                default_headers: cfg.default_headers.clone(),
                telemetry: Telemetry::new(cfg.metrics.clone()),
            }),
            action: None,
        })
    }

    /// Tag subsequent requests with the action being executed (telemetry only).
    pub fn for_action(&self, action: &str) -> Self {
        Self {
            inner: self.inner.clone(),
            action: Some(action.to_string()),
        }
    }

    pub fn profile(&self) -> &ApiProfile {
        &self.inner.profile
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Send and decode a JSON response.
    pub async fn send_json<T: DeserializeOwned>(&self, req: ApiRequest) -> Result<T> {
        Ok(self.send_json_with_headers(req).await?.body)
    }

    /// Send and decode a JSON response, keeping headers (pagination links).
    pub async fn send_json_with_headers<T: DeserializeOwned>(
        &self,
        req: ApiRequest,
    ) -> Result<WithHeaders<T>> {
        let resp = self.send(req).await?;
        let headers = resp.headers().clone();
        let bytes = resp
            .bytes()
            .await
            .map_err(|err| self.to_transport_error(err))?;
        let body = serde_json::from_slice::<T>(&bytes)?;
        Ok(WithHeaders { body, headers })
    }

    /// Send and decode JSON, mapping an empty 2xx body (204) to `null`.
    pub async fn send_value(&self, req: ApiRequest) -> Result<Value> {
        let resp = self.send(req).await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|err| self.to_transport_error(err))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Send and discard the response body.
    pub async fn send_empty(&self, req: ApiRequest) -> Result<()> {
        self.send(req).await.map(|_| ())
    }

    /// Send and return the body as text (file downloads, exports).
    pub async fn send_text(&self, req: ApiRequest) -> Result<String> {
        let resp = self.send(req).await?;
        resp.text().await.map_err(|err| self.to_transport_error(err))
    }

    /// Send the request and return the successful response.
    pub async fn send(&self, req: ApiRequest) -> Result<reqwest::Response> {
        let ctx = RequestContext::new(self.inner.profile.label, req.method.as_str(), &req.path)
            .with_action(self.action.clone());
        let builder = self.inner.build(req)?;
        self.inner.execute(builder, ctx).await
    }

    fn to_transport_error(&self, err: reqwest::Error) -> Error {
        self.inner.to_transport_error(err)
    }
}

impl ClientInner {
    fn url(&self, path: &str) -> Result<reqwest::Url> {
        let raw = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.is_empty() || path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        reqwest::Url::parse(&raw).map_err(|err| Error::Config(format!("invalid path: {err}")))
    }

    fn build(&self, req: ApiRequest) -> Result<reqwest::RequestBuilder> {
        let ApiRequest {
            method,
            path,
            query,
            headers,
            body,
        } = req;
        let mut builder = self
            .http
            .request(method, self.url(&path)?)
            .timeout(self.request_timeout)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, &self.user_agent);
        builder = self.auth.apply(builder);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if let Some(defaults) = &self.default_headers {
            builder = apply_header_list(builder, defaults);
        }
        builder = apply_header_list(builder, &headers);

        builder = match body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(&value),
            Body::Form(pairs) => builder.form(&pairs),
            Body::Text { content_type, text } => {
                builder.header(CONTENT_TYPE, content_type).body(text)
            }
            Body::Bytes { content_type, data } => {
                builder.header(CONTENT_TYPE, content_type).body(data)
            }
            Body::Multipart(parts) => {
                let mut form = reqwest::multipart::Form::new();
                for part in parts {
                    let mut p = reqwest::multipart::Part::bytes(part.data);
                    if let Some(file_name) = part.file_name {
                        p = p.file_name(file_name);
                    }
                    if let Some(content_type) = part.content_type {
                        p = p.mime_str(&content_type).map_err(|err| {
                            Error::validation(format!("invalid content type {content_type:?}: {err}"))
                        })?;
                    }
                    form = form.part(part.name, p);
                }
                builder.multipart(form)
            }
        };
        Ok(builder)
    }

    async fn execute(
        &self,
        builder: reqwest::RequestBuilder,
        ctx: RequestContext,
    ) -> Result<reqwest::Response> {
        let start = Instant::now();
        #[cfg(feature = "tracing")]
        let span = tracing::debug_span!(
            "actionkit.http",
            provider = %ctx.provider,
            method = %ctx.method,
            path = %ctx.path,
        );
        let pending = builder.send();
        #[cfg(feature = "tracing")]
        let pending = tracing::Instrument::instrument(pending, span);

        match pending.await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    if self.telemetry.http_enabled() {
                        self.telemetry.record_http(HttpRequestMetrics {
                            latency: start.elapsed(),
                            status: Some(status.as_u16()),
                            error: None,
                            context: ctx,
                        });
                    }
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        status = %status,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "request completed"
                    );
                    return Ok(resp);
                }

                if self.telemetry.http_enabled() {
                    self.telemetry.record_http(HttpRequestMetrics {
                        latency: start.elapsed(),
                        status: Some(status.as_u16()),
                        error: Some(format!("http {}", status.as_u16())),
                        context: ctx,
                    });
                }
                #[cfg(feature = "tracing")]
                tracing::warn!(status = %status, "request failed; returning error");
                let body = resp.text().await.unwrap_or_default();
                Err(parse_provider_error(&self.profile, status, body))
            }
            Err(err) => {
                if self.telemetry.http_enabled() {
                    self.telemetry.record_http(HttpRequestMetrics {
                        latency: start.elapsed(),
                        status: None,
                        error: Some(err.to_string()),
                        context: ctx,
                    });
                }
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %err, "transport error");
                Err(self.to_transport_error(err))
            }
        }
    }

    fn to_transport_error(&self, err: reqwest::Error) -> Error {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_request() {
            TransportErrorKind::Request
        } else if err.is_body() || err.is_decode() {
            TransportErrorKind::Body
        } else {
            TransportErrorKind::Other
        };

        TransportError {
            provider: self.profile.label.to_string(),
            kind,
            message: err.to_string(),
            source: Some(err),
        }
        .into()
    }
}

fn apply_header_list(
    mut builder: reqwest::RequestBuilder,
    headers: &HeaderList,
) -> reqwest::RequestBuilder {
    for entry in headers.iter() {
        if entry.is_valid() {
            builder = builder.header(entry.key.as_str(), entry.value.as_str());
        }
    }
    builder
}

/// Pull one field out of a response envelope (`{"product": {...}}` → `{...}`).
pub fn unwrap_field(mut value: Value, field: &str) -> Result<Value> {
    match value.get_mut(field) {
        Some(inner) => Ok(inner.take()),
        None => Err(Error::validation(format!(
            "response is missing the `{field}` field"
        ))),
    }
}
