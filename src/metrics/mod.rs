pub mod exposition;
pub mod registry;

use std::time::Duration;

pub use registry::{Registry, DEFAULT_BUCKETS};

/// Prefix applied to every exposed family name.
pub const NAMESPACE: &str = "cloud_ready_api";

pub const REQUEST_COUNT: &str = "request_count";
pub const REQUEST_LATENCY: &str = "request_latency_seconds";

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("metric `{0}` is already registered")]
    AlreadyRegistered(String),

    #[error("metric `{0}` is not registered")]
    UnknownMetric(String),

    #[error("metric `{name}` is not a {expected}")]
    WrongKind { name: String, expected: &'static str },

    #[error("metric `{name}` expects labels {expected:?}, got {got:?}")]
    LabelMismatch {
        name: String,
        expected: Vec<String>,
        got: Vec<String>,
    },

    #[error("metric `{0}` declares invalid label names")]
    InvalidLabelNames(String),

    #[error("failed to register metric `{name}`")]
    Registration {
        name: String,
        source: prometheus::Error,
    },

    #[error("failed to encode metrics")]
    Encode(#[source] prometheus::Error),

    #[error("histogram `{0}` buckets must be finite and strictly increasing")]
    InvalidBuckets(String),

    #[error("histogram `{name}` cannot observe {value}")]
    InvalidObservation { name: String, value: f64 },
}

/// Registry with the HTTP request families declared.
pub fn http_registry() -> Result<Registry, MetricsError> {
    let registry = Registry::with_namespace(NAMESPACE)?;
    registry.register_counter(
        REQUEST_COUNT,
        "Total HTTP requests",
        &["method", "endpoint", "http_status"],
    )?;
    registry.register_histogram(
        REQUEST_LATENCY,
        "HTTP request latency",
        &["endpoint"],
        DEFAULT_BUCKETS,
    )?;
    Ok(registry)
}

/// One completed request, produced by the timing middleware and
/// discarded once applied to the registry.
#[derive(Debug, Clone)]
pub struct RequestObservation {
    /// e.g. "GET"
    pub method: String,
    /// Raw request path, e.g. "/items"
    pub endpoint: String,
    pub status: u16,
    pub elapsed: Duration,
}

impl RequestObservation {
    /// Latency first, then the count. The two writes touch disjoint
    /// series and are not atomic with respect to each other.
    pub fn record(&self, registry: &Registry) -> Result<(), MetricsError> {
        registry.observe_histogram(
            REQUEST_LATENCY,
            &[("endpoint", self.endpoint.as_str())],
            self.elapsed.as_secs_f64(),
        )?;

        let status = self.status.to_string();
        registry.increment_counter(
            REQUEST_COUNT,
            &[
                ("method", self.method.as_str()),
                ("endpoint", self.endpoint.as_str()),
                ("http_status", status.as_str()),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observation_updates_both_families() {
        let registry = http_registry().unwrap();
        let obs = RequestObservation {
            method: "GET".into(),
            endpoint: "/items".into(),
            status: 200,
            elapsed: Duration::from_millis(30),
        };
        obs.record(&registry).unwrap();
        obs.record(&registry).unwrap();

        let body = registry.encode().unwrap();
        assert!(body.contains(
            r#"cloud_ready_api_request_count_total{endpoint="/items",http_status="200",method="GET"} 2"#
        ));
        assert!(body.contains(
            r#"cloud_ready_api_request_latency_seconds_bucket{endpoint="/items",le="0.025"} 0"#
        ));
        assert!(body.contains(
            r#"cloud_ready_api_request_latency_seconds_bucket{endpoint="/items",le="0.05"} 2"#
        ));
        assert!(body.contains(r#"cloud_ready_api_request_latency_seconds_count{endpoint="/items"} 2"#));
    }

    #[test]
    fn http_registry_exposes_both_families() {
        let registry = http_registry().unwrap();
        RequestObservation {
            method: "GET".into(),
            endpoint: "/health".into(),
            status: 200,
            elapsed: Duration::from_millis(1),
        }
        .record(&registry)
        .unwrap();

        let lines: Vec<String> = registry.render().unwrap().collect();
        assert!(lines.contains(&"# TYPE cloud_ready_api_request_count_total counter".to_owned()));
        assert!(lines.contains(
            &"# TYPE cloud_ready_api_request_latency_seconds histogram".to_owned()
        ));
    }

    #[test]
    fn latency_bounds_use_shortest_float_form() {
        let registry = http_registry().unwrap();
        registry
            .observe_histogram(REQUEST_LATENCY, &[("endpoint", "/items")], 0.8)
            .unwrap();

        let body = registry.encode().unwrap();
        assert!(body.contains(
            r#"cloud_ready_api_request_latency_seconds_bucket{endpoint="/items",le="0.75"} 0"#
        ));
        assert!(body.contains(
            r#"cloud_ready_api_request_latency_seconds_bucket{endpoint="/items",le="1"} 1"#
        ));
        assert!(body.contains(
            r#"cloud_ready_api_request_latency_seconds_bucket{endpoint="/items",le="10"} 1"#
        ));
    }

    #[test]
    fn http_registry_rejects_wrong_labels() {
        let registry = http_registry().unwrap();
        let result = registry.increment_counter(REQUEST_COUNT, &[("endpoint", "/items")]);
        assert!(matches!(result, Err(MetricsError::LabelMismatch { .. })));
    }
}
