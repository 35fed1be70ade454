//! W3C Trace Context propagation for outbound backend calls.
//!
//! See: https://www.w3.org/TR/trace-context/

use opentelemetry::trace::TraceContextExt;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub const TRACEPARENT_HEADER: &str = "traceparent";

pub const TRACESTATE_HEADER: &str = "tracestate";

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Write `traceparent`/`tracestate` for the current span, when it carries a
/// valid OpenTelemetry context, and an `x-request-id`.
///
/// Without a request id a fresh UUID is used. Existing headers are kept.
pub fn inject_trace_headers(headers: &mut HeaderMap, request_id: Option<&str>) {
    let context = Span::current().context();
    let otel_span = context.span();
    let span_context = otel_span.span_context();

    if span_context.is_valid() {
        // version-trace_id-span_id-trace_flags
        let traceparent = format!(
            "00-{}-{}-{:02x}",
            span_context.trace_id(),
            span_context.span_id(),
            span_context.trace_flags().to_u8()
        );
        if let Ok(value) = HeaderValue::from_str(&traceparent) {
            headers.entry(TRACEPARENT_HEADER).or_insert(value);
        }

        let tracestate = span_context.trace_state().header();
        if !tracestate.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&tracestate) {
                headers.entry(TRACESTATE_HEADER).or_insert(value);
            }
        }
    }

    let request_id = request_id
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.entry(REQUEST_ID_HEADER).or_insert(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_span_means_no_traceparent() {
        let mut headers = HeaderMap::new();
        inject_trace_headers(&mut headers, Some("req-1"));

        assert!(headers.get(TRACEPARENT_HEADER).is_none());
        assert_eq!(headers.get(REQUEST_ID_HEADER).unwrap(), "req-1");
    }

    #[test]
    fn test_generated_request_id() {
        let mut headers = HeaderMap::new();
        inject_trace_headers(&mut headers, None);

        let id = headers.get(REQUEST_ID_HEADER).unwrap().to_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
    }

    #[test]
    fn test_existing_request_id_is_kept() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("abc-123"));
        inject_trace_headers(&mut headers, Some("other"));

        assert_eq!(headers.get(REQUEST_ID_HEADER).unwrap(), "abc-123");
    }
}
