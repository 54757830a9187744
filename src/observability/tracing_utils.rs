//! Request spans.

use tracing::{span, Level, Span};

/// Create a span covering one logical API call, retries included
pub fn create_request_span(method: &str, destination: Option<&str>) -> Span {
    span!(
        Level::INFO,
        "telegram_request",
        method = %method,
        destination = destination.unwrap_or("-"),
        otel.kind = "client",
        otel.status_code = tracing::field::Empty,
        error.kind = tracing::field::Empty,
    )
}

/// Record success on a span
pub fn record_success(span: &Span) {
    span.record("otel.status_code", "OK");
}

/// Record error on a span
pub fn record_error(span: &Span, error_code: &str) {
    span.record("otel.status_code", "ERROR");
    span.record("error.kind", error_code);
}
