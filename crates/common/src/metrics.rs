//! Prometheus metrics for the listings API (default registry).

use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};

pub static ROLLUPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "listings_rollups_total",
        "Aggregate recomputations on listings by kind and outcome",
        &["kind", "outcome"]
    )
    .expect("register rollups_total")
});

pub static CASCADE_DELETES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "listings_cascade_deletes_total",
        "Dependent documents removed by listing cascades"
    )
    .expect("register cascade_deletes_total")
});

pub static HTTP_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "listings_http_errors_total",
        "Error envelopes returned by status code",
        &["status"]
    )
    .expect("register http_errors_total")
});

pub fn record_rollup(kind: &str, ok: bool) {
    let outcome = if ok { "ok" } else { "failed" };
    ROLLUPS_TOTAL.with_label_values(&[kind, outcome]).inc();
}

pub fn record_cascade(removed: u64) {
    CASCADE_DELETES_TOTAL.inc_by(removed);
}

pub fn record_http_error(status: u16) {
    HTTP_ERRORS_TOTAL.with_label_values(&[&status.to_string()]).inc();
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollup_counter_is_exported() {
        record_rollup("averageCost", true);
        let (status, body) = encode_metrics();
        assert_eq!(status, axum::http::StatusCode::OK);
        assert!(body.contains("listings_rollups_total"));
    }
}
