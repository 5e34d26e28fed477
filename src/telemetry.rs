use std::{fmt, sync::Arc, time::Duration};

/// User-provided callbacks for emitting metrics without taking on a tracing dependency.
#[derive(Clone, Default)]
pub struct MetricsCallbacks {
    pub http_request: Option<Arc<dyn Fn(HttpRequestMetrics) + Send + Sync>>,
}

impl fmt::Debug for MetricsCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsCallbacks")
            .field(
                "http_request",
                &self.http_request.as_ref().map(|_| "callback"),
            )
            .finish()
    }
}

/// Common request metadata shared by all telemetry events.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    pub provider: String,
    pub method: String,
    pub path: String,
    pub action: Option<String>,
}

impl RequestContext {
    pub fn new(
        provider: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_action(mut self, action: Option<String>) -> Self {
        if let Some(action) = action {
            if !action.trim().is_empty() {
                self.action = Some(action);
            }
        }
        self
    }
}

/// HTTP request latency and outcome.
#[derive(Clone, Debug)]
pub struct HttpRequestMetrics {
    pub latency: Duration,
    pub status: Option<u16>,
    pub error: Option<String>,
    pub context: RequestContext,
}

#[derive(Clone, Default)]
pub(crate) struct Telemetry {
    callbacks: MetricsCallbacks,
}

impl Telemetry {
    pub(crate) fn new(callbacks: Option<MetricsCallbacks>) -> Self {
        Self {
            callbacks: callbacks.unwrap_or_default(),
        }
    }

    pub(crate) fn http_enabled(&self) -> bool {
        self.callbacks.http_request.is_some()
    }

    pub(crate) fn record_http(&self, metrics: HttpRequestMetrics) {
        if let Some(cb) = &self.callbacks.http_request {
            cb(metrics);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn records_only_when_callback_installed() {
        let silent = Telemetry::new(None);
        assert!(!silent.http_enabled());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let telemetry = Telemetry::new(Some(MetricsCallbacks {
            http_request: Some(Arc::new(move |m: HttpRequestMetrics| {
                sink.lock().unwrap().push(m.status);
            })),
        }));
        assert!(telemetry.http_enabled());
        telemetry.record_http(HttpRequestMetrics {
            latency: Duration::from_millis(3),
            status: Some(204),
            error: None,
            context: RequestContext::new("Stripe", "GET", "/customers"),
        });
        assert_eq!(*seen.lock().unwrap(), vec![Some(204)]);
    }

    #[test]
    fn blank_action_is_ignored() {
        let ctx = RequestContext::new("Figma", "GET", "/v1/files/abc").with_action(Some(" ".into()));
        assert!(ctx.action.is_none());
    }
}
