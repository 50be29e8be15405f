//! Request correlation IDs.
//!
//! Every response carries an `x-request-id`. A well-formed ID from an upstream
//! proxy is kept; anything else is replaced with a fresh UUID v4.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

/// Accept an upstream ID only if it is short, non-empty visible ASCII.
fn accept_upstream(value: &HeaderValue) -> Option<String> {
    let value = value.to_str().ok()?.trim();
    let acceptable = !value.is_empty()
        && value.len() <= MAX_REQUEST_ID_LEN
        && value.bytes().all(|b| b.is_ascii_graphic());
    acceptable.then(|| value.to_owned())
}

/// Tag the request with an ID, record it on the tracing span and the Sentry
/// scope, and echo it on the response.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(accept_upstream)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    Span::current().record("request_id", request_id.as_str());
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_proxy_ids() {
        let value = HeaderValue::from_static("cf-8a1b2c3d4e5f");
        assert_eq!(accept_upstream(&value).as_deref(), Some("cf-8a1b2c3d4e5f"));
    }

    #[test]
    fn test_rejects_blank_spaced_and_oversized_ids() {
        assert_eq!(accept_upstream(&HeaderValue::from_static("   ")), None);
        assert_eq!(accept_upstream(&HeaderValue::from_static("a b")), None);

        let long = "x".repeat(MAX_REQUEST_ID_LEN + 1);
        let value = HeaderValue::from_str(&long).unwrap_or_else(|_| HeaderValue::from_static(""));
        assert_eq!(accept_upstream(&value), None);
    }
}
