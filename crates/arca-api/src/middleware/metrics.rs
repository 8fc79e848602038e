//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware. Push and freeze counters are incremented by their handlers.
//! Catalog gauges (artifacts, package names, versions) are refreshed on each
//! `/metrics` scrape (pull model), see the metrics handler in `lib.rs`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use prometheus::core::Collector;
use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    // -- HTTP middleware metrics (push model) --
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    // -- Domain counters (incremented by handlers) --
    pushes_total: IntCounterVec,
    freezes_total: IntCounter,

    // -- Catalog gauges (pull model, updated on /metrics scrape) --
    artifacts_total: IntGauge,
    package_names_total: IntGauge,
    versions_total: IntGauge,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("arca_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let http_request_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "arca_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
            ]),
            &["method", "path"],
        )
        .expect("metric can be created");

        let http_errors_total = IntCounterVec::new(
            Opts::new("arca_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let pushes_total = IntCounterVec::new(
            Opts::new("arca_pushes_total", "Package pushes by outcome"),
            &["outcome"],
        )
        .expect("metric can be created");

        let freezes_total = IntCounter::new("arca_freezes_total", "Completed version freezes")
            .expect("metric can be created");

        let artifacts_total = IntGauge::new("arca_artifacts_total", "Catalogued artifacts")
            .expect("metric can be created");

        let package_names_total =
            IntGauge::new("arca_package_names_total", "Distinct package names")
                .expect("metric can be created");

        let versions_total = IntGauge::new("arca_versions_total", "Frozen versions")
            .expect("metric can be created");

        let collectors: Vec<Box<dyn Collector>> = vec![
            Box::new(http_requests_total.clone()),
            Box::new(http_request_duration_seconds.clone()),
            Box::new(http_errors_total.clone()),
            Box::new(pushes_total.clone()),
            Box::new(freezes_total.clone()),
            Box::new(artifacts_total.clone()),
            Box::new(package_names_total.clone()),
            Box::new(versions_total.clone()),
        ];
        for collector in collectors {
            registry
                .register(collector)
                .expect("metric can be registered");
        }

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                pushes_total,
                freezes_total,
                artifacts_total,
                package_names_total,
                versions_total,
            }),
        }
    }

    /// Total request count (sum across all labels).
    pub fn requests(&self) -> u64 {
        sum_counter(&self.inner.http_requests_total)
    }

    /// Total error count (sum across all labels).
    pub fn errors(&self) -> u64 {
        sum_counter(&self.inner.http_errors_total)
    }

    /// Record an HTTP request (called by the middleware).
    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();

        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);

        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    /// Count a push by outcome: `created`, `duplicate` or `rejected`.
    pub fn record_push(&self, outcome: &str) {
        self.inner.pushes_total.with_label_values(&[outcome]).inc();
    }

    pub fn pushes(&self, outcome: &str) -> u64 {
        self.inner.pushes_total.with_label_values(&[outcome]).get()
    }

    pub fn record_freeze(&self) {
        self.inner.freezes_total.inc();
    }

    pub fn freezes(&self) -> u64 {
        self.inner.freezes_total.get()
    }

    /// Update the catalog gauges.
    pub fn set_catalog_counts(&self, artifacts: i64, package_names: i64, versions: i64) {
        self.inner.artifacts_total.set(artifacts);
        self.inner.package_names_total.set(package_names);
        self.inner.versions_total.set(versions);
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer).map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn sum_counter(counter: &IntCounterVec) -> u64 {
    let mut total = 0u64;
    for mf in &counter.collect() {
        for m in mf.get_metric() {
            total += m.get_counter().get_value() as u64;
        }
    }
    total
}

/// Label value for a request path when no route matched.
///
/// Content digests are collapsed to `{hash}` so unmatched probes cannot blow
/// up label cardinality.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.len() == 64 && segment.chars().all(|c| c.is_ascii_hexdigit()) {
                "{hash}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Middleware that records HTTP request metrics via Prometheus.
///
/// Uses the matched route template (`/api/v1/pull/:version`) as the path
/// label when available.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| normalize_path(request.uri().path()));
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let duration = start.elapsed().as_secs_f64();
        let status = response.status().as_u16();
        m.record_request(&method, &path, status, duration);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_metrics_new_starts_at_zero() {
        let m = ApiMetrics::new();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.errors(), 0);
        assert_eq!(m.freezes(), 0);
    }

    #[test]
    fn requests_increments() {
        let m = ApiMetrics::new();
        m.record_request("GET", "/api/v1/versions", 200, 0.01);
        m.record_request("POST", "/api/v1/push", 201, 0.02);
        assert_eq!(m.requests(), 2);
        assert_eq!(m.errors(), 0);
    }

    #[test]
    fn errors_count_4xx_and_5xx() {
        let m = ApiMetrics::new();
        m.record_request("GET", "/api/v1/pull", 404, 0.01);
        m.record_request("GET", "/api/v1/pull", 500, 0.01);
        m.record_request("GET", "/api/v1/pull", 200, 0.01);
        assert_eq!(m.errors(), 2);
    }

    #[test]
    fn push_outcomes_are_labelled() {
        let m = ApiMetrics::new();
        m.record_push("created");
        m.record_push("created");
        m.record_push("duplicate");
        assert_eq!(m.pushes("created"), 2);
        assert_eq!(m.pushes("duplicate"), 1);
        assert_eq!(m.pushes("rejected"), 0);
    }

    #[test]
    fn encode_contains_domain_metrics() {
        let m = ApiMetrics::new();
        m.record_push("created");
        m.record_freeze();
        m.set_catalog_counts(3, 2, 1);
        let text = m.gather_and_encode().unwrap();
        assert!(text.contains("arca_pushes_total{outcome=\"created\"} 1"));
        assert!(text.contains("arca_freezes_total 1"));
        assert!(text.contains("arca_artifacts_total 3"));
        assert!(text.contains("arca_package_names_total 2"));
        assert!(text.contains("arca_versions_total 1"));
    }

    #[test]
    fn normalize_collapses_digests() {
        let hash = "a".repeat(64);
        assert_eq!(
            normalize_path(&format!("/files/{hash}/x")),
            "/files/{hash}/x"
        );
        assert_eq!(normalize_path("/api/v1/apps"), "/api/v1/apps");
    }
}
