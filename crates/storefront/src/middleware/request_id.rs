//! Request ID middleware for request tracing and correlation.
//!
//! Reuses an upstream `x-request-id` when it looks sane, otherwise generates a
//! UUID v4. The ID is recorded on the tracing span, tagged on the Sentry scope
//! and echoed in the response headers.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream ID accepted verbatim.
const MAX_REQUEST_ID_LEN: usize = 128;

fn upstream_id(request: &Request) -> Option<String> {
    request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_REQUEST_ID_LEN
                && id.bytes().all(|b| b.is_ascii_graphic())
        })
        .map(String::from)
}

/// Middleware that ensures every request has a request ID.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = upstream_id(&request).unwrap_or_else(|| Uuid::new_v4().to_string());

    // Record in current span for structured logging
    Span::current().record("request_id", &request_id);

    // Set in Sentry scope for error correlation
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let header = HeaderValue::from_str(&request_id).ok();
    if let Some(value) = &header {
        request.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
    }

    let mut response = next.run(request).await;

    if let Some(value) = header {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;

    use super::*;

    fn with_header(value: &str) -> Request {
        Request::builder()
            .header(REQUEST_ID_HEADER, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn keeps_reasonable_upstream_ids() {
        assert_eq!(
            upstream_id(&with_header("cf-ray-8a1b2c")).as_deref(),
            Some("cf-ray-8a1b2c")
        );
    }

    #[test]
    fn replaces_oversized_or_odd_ids() {
        assert_eq!(upstream_id(&with_header(&"a".repeat(200))), None);
        assert_eq!(upstream_id(&with_header("has space")), None);
        assert_eq!(upstream_id(&Request::new(Body::empty())), None);
    }
}
