//! Prometheus metric definitions for the Talking Stick service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `ts_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded enums, never ids:
//! - `reason`: 4 values (ended, idle, exhausted, never_started)
//! - `trigger`: 4 values (start, timer, skip, target)
//! - `operation`: 5 values (one per platform call)

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle used to render
/// `/metrics`.
///
/// Close durations include the TTS grace window, so buckets run past 5s.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("ts_close_duration_seconds".to_string()),
            &[0.010, 0.100, 0.500, 1.000, 2.500, 5.000, 7.500, 10.000, 30.000],
        )
        .map_err(|e| format!("Failed to set close duration buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

/// Set the number of registered sessions.
///
/// Metric: `ts_sessions_active`
pub fn set_sessions_active(count: usize) {
    // usize to f64 conversion is safe for realistic session counts (< 2^53)
    #[allow(clippy::cast_precision_loss)]
    gauge!("ts_sessions_active").set(count as f64);
}

/// Metric: `ts_sessions_created_total`
pub fn record_session_created() {
    counter!("ts_sessions_created_total").increment(1);
}

/// Record a completed Close and how long it took (including grace waits).
///
/// Metrics: `ts_sessions_closed_total{reason}`, `ts_close_duration_seconds`
pub fn record_session_closed(reason: &'static str, took: Duration) {
    counter!("ts_sessions_closed_total", "reason" => reason).increment(1);
    histogram!("ts_close_duration_seconds").record(took.as_secs_f64());
}

/// Metric: `ts_turns_passed_total{trigger}`
pub fn record_turn_passed(trigger: &'static str) {
    counter!("ts_turns_passed_total", "trigger" => trigger).increment(1);
}

/// Metric: `ts_platform_errors_total{operation}`
pub fn record_platform_error(operation: &'static str) {
    counter!("ts_platform_errors_total", "operation" => operation).increment(1);
}

/// Metric: `ts_messages_deleted_total`
pub fn record_message_deleted() {
    counter!("ts_messages_deleted_total").increment(1);
}
