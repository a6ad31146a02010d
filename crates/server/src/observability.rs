use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use once_cell::sync::Lazy;
use prometheus::{register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec, TextEncoder};

use service::errors::TaxonomyError;

// Prometheus metrics (default registry)
pub static MUTATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "taxonomy_mutations_total",
        "Taxonomy mutations by operation and outcome",
        &["op", "outcome"]
    )
    .expect("register taxonomy_mutations_total")
});

pub static REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "taxonomy_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "route", "status"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("register taxonomy_http_request_duration_seconds")
});

fn outcome(e: &TaxonomyError) -> &'static str {
    match e {
        TaxonomyError::Validation(_) => "validation",
        TaxonomyError::OrderConflict(_) => "conflict",
        TaxonomyError::ScopeMismatch(_) => "scope_mismatch",
        TaxonomyError::NotFound(_) => "not_found",
        TaxonomyError::MissingTranslation(_) => "missing_translation",
        TaxonomyError::Unauthorized => "unauthorized",
        TaxonomyError::Store(_) => "store_error",
    }
}

/// Count one mutation attempt and hand the result back untouched.
pub fn record_mutation<T>(op: &'static str, result: Result<T, TaxonomyError>) -> Result<T, TaxonomyError> {
    let label = match &result {
        Ok(_) => "ok",
        Err(e) => outcome(e),
    };
    MUTATIONS_TOTAL.with_label_values(&[op, label]).inc();
    result
}

/// Middleware observing request latency per matched route.
pub async fn track_requests(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();
    let res = next.run(req).await;
    REQUEST_DURATION
        .with_label_values(&[&method, &route, res.status().as_str()])
        .observe(start.elapsed().as_secs_f64());
    res
}

pub fn encode_metrics() -> (axum::http::StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (
        axum::http::StatusCode::OK,
        String::from_utf8(buffer).unwrap_or_default(),
    )
}
