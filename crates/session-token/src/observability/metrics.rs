//! Metrics for the session token lifecycle.
//!
//! All metrics follow Prometheus naming conventions:
//! - `session_token_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! The crate only emits through the `metrics` facade. Installing a recorder
//! (Prometheus exporter or otherwise) is left to the embedding service.
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `status`: 2 values (success, error)
//! - `error`: one value per `TokenError` code, or `none`
//! - `error_category`: 4 values (see `ErrorCategory`)
//! - `operation`: 3 values (issue, verify, refresh)

use metrics::{counter, gauge, histogram};
use std::time::Duration;

// ============================================================================
// Token Metrics
// ============================================================================

/// Record token issuance outcome.
///
/// Metric: `session_token_issued_total`
/// Labels: `status`
pub fn record_token_issuance(status: &str, duration: Duration) {
    counter!("session_token_issued_total", "status" => status.to_string()).increment(1);
    record_operation_duration("issue", duration);
}

/// Record token verification outcome.
///
/// Metric: `session_token_verifications_total`
/// Labels: `status`, `error`
pub fn record_token_verification(status: &str, error: Option<&str>, duration: Duration) {
    let error = error.unwrap_or("none");
    counter!("session_token_verifications_total", "status" => status.to_string(), "error" => error.to_string())
        .increment(1);
    record_operation_duration("verify", duration);
}

/// Record token refresh outcome.
///
/// Metric: `session_token_refresh_total`
/// Labels: `status`, `error`
pub fn record_token_refresh(status: &str, error: Option<&str>, duration: Duration) {
    let error = error.unwrap_or("none");
    counter!("session_token_refresh_total", "status" => status.to_string(), "error" => error.to_string())
        .increment(1);
    record_operation_duration("refresh", duration);
}

fn record_operation_duration(operation: &'static str, duration: Duration) {
    histogram!("session_token_operation_duration_seconds", "operation" => operation)
        .record(duration.as_secs_f64());
}

// ============================================================================
// Error Metrics
// ============================================================================

/// Record a failed operation by category.
///
/// Metric: `session_token_errors_total`
/// Labels: `operation`, `error_category`, `error`
pub fn record_error(operation: &'static str, error_category: &str, error: &str) {
    counter!("session_token_errors_total",
        "operation" => operation,
        "error_category" => error_category.to_string(),
        "error" => error.to_string()
    )
    .increment(1);
}

// ============================================================================
// Key Management Metrics
// ============================================================================

/// Record key rotation event.
///
/// Metric: `session_token_key_rotations_total`
/// Labels: `status`
pub fn record_key_rotation(status: &str) {
    counter!("session_token_key_rotations_total", "status" => status.to_string()).increment(1);
}

/// Update the number of keys accepted for verification.
///
/// Metric: `session_token_acceptable_keys`
#[allow(clippy::cast_precision_loss)]
pub fn set_acceptable_keys(count: usize) {
    gauge!("session_token_acceptable_keys").set(count as f64);
}
