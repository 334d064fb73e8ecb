//! Prometheus metrics for microblog-service.
//!
//! Exposes feed, like and registration collectors plus an HTTP handler for the
//! `/metrics` endpoint. Pool gauges are registered by the `db-pool` library.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    /// Feed requests by sort key (`recency`, `likes`, `invalid`).
    pub static ref FEED_REQUEST_TOTAL: IntCounterVec = register_int_counter_vec!(
        "microblog_feed_request_total",
        "Total feed requests segmented by sort key",
        &["sort"]
    )
    .expect("failed to register microblog_feed_request_total");

    /// Feed assembly latency by sort key.
    pub static ref FEED_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "microblog_feed_request_duration_seconds",
        "Feed assembly duration segmented by sort key",
        &["sort"]
    )
    .expect("failed to register microblog_feed_request_duration_seconds");

    /// Like toggles by outcome (`liked`, `unliked`, `self_like`, `not_found`, `error`).
    pub static ref LIKE_TOGGLE_TOTAL: IntCounterVec = register_int_counter_vec!(
        "microblog_like_toggle_total",
        "Like toggle attempts segmented by outcome",
        &["outcome"]
    )
    .expect("failed to register microblog_like_toggle_total");

    /// Accounts created by method (`local`, `external`).
    pub static ref REGISTRATION_TOTAL: IntCounterVec = register_int_counter_vec!(
        "microblog_registration_total",
        "User registrations segmented by method",
        &["method"]
    )
    .expect("failed to register microblog_registration_total");

    /// HTTP requests by method, route pattern and status.
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "microblog_http_requests_total",
        "HTTP requests segmented by method, route and status",
        &["method", "route", "status"]
    )
    .expect("failed to register microblog_http_requests_total");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "microblog_http_request_duration_seconds",
        "HTTP request latency segmented by method and route",
        &["method", "route"]
    )
    .expect("failed to register microblog_http_request_duration_seconds");
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
