use std::sync::{Arc, Mutex};

use crate::{Config, HttpRequestMetrics, MetricsCallbacks};

/// Create a test config pointing every adapter at a wiremock server.
pub fn test_config(base_url: &str) -> Config {
    Config {
        base_url: Some(base_url.to_string()),
        ..Default::default()
    }
}

/// Test config that also records every HTTP metrics event.
pub fn recording_config(base_url: &str) -> (Config, Arc<Mutex<Vec<HttpRequestMetrics>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let cfg = Config {
        metrics: Some(MetricsCallbacks {
            http_request: Some(Arc::new(move |m: HttpRequestMetrics| {
                if let Ok(mut guard) = sink.lock() {
                    guard.push(m);
                }
            })),
        }),
        ..test_config(base_url)
    };
    (cfg, seen)
}
