//! Prometheus metrics endpoint
//!
//! Exposes dispatch, race and context-lookup metrics in Prometheus format.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use tracing::debug;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    if metrics::set_global_recorder(recorder).is_err() {
        debug!("A metrics recorder was already installed");
    }
    handle
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    Lazy::force(&PROMETHEUS_HANDLE);
    register_metrics();
}

fn register_metrics() {
    metrics::describe_counter!(
        "relay_dispatch_total",
        "Dispatches by terminal outcome"
    );
    metrics::describe_histogram!(
        "relay_dispatch_duration_seconds",
        "Wall-clock time from request to dispatch outcome"
    );
    metrics::describe_counter!(
        "relay_candidate_total",
        "Race candidates by tier and outcome"
    );
    metrics::describe_counter!(
        "relay_tier_escalations_total",
        "Escalations away from a tier that produced no winner"
    );
    metrics::describe_counter!(
        "relay_context_lookup_total",
        "Search context lookups by result"
    );
}

/// Prometheus metrics endpoint handler
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE.render()
}

/// Record a finished dispatch (`success`, `exhausted`, `stream_success`, ...)
pub fn record_dispatch(outcome: &str, duration_secs: f64) {
    metrics::counter!("relay_dispatch_total", "outcome" => outcome.to_string()).increment(1);
    metrics::histogram!("relay_dispatch_duration_seconds", "outcome" => outcome.to_string())
        .record(duration_secs);
}

/// Record how one race candidate ended
pub fn record_candidate(tier: &str, outcome: &str) {
    metrics::counter!(
        "relay_candidate_total",
        "tier" => tier.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record an escalation from `from` to the next tier
pub fn record_escalation(from: &str, reason: &str) {
    metrics::counter!(
        "relay_tier_escalations_total",
        "from" => from.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record a context lookup (`hit`, `miss`, `error`, `timeout`)
pub fn record_context_lookup(result: &str) {
    metrics::counter!("relay_context_lookup_total", "result" => result.to_string()).increment(1);
}
