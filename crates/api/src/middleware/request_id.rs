//! Request correlation IDs.
//!
//! Every response carries `x-request-id`. A well-formed ID sent by the client
//! or a proxy is kept so calls can be traced across services; anything else
//! is replaced by a fresh UUID. The ID lands on the `http_request` span, in
//! the Sentry scope and in the request extensions.

use std::fmt;

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest client-supplied ID that is echoed back.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Correlation ID of the request being served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    /// A new random ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accept a caller-supplied ID if it is short and made of token characters.
    #[must_use]
    pub fn from_client(value: &str) -> Option<Self> {
        let acceptable = !value.is_empty()
            && value.len() <= MAX_REQUEST_ID_LEN
            && value
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b':'));
        acceptable.then(|| Self(value.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tag the request with a [`RequestId`] and echo it on the response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(RequestId::from_client)
        .unwrap_or_else(RequestId::generate);

    Span::current().record("request_id", request_id.as_str());
    sentry::configure_scope(|scope| scope.set_tag("request_id", &request_id));
    request.extensions_mut().insert(request_id.clone());

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::routing::get;
    use axum::{Extension, Router};
    use tower::ServiceExt;

    use super::*;

    async fn handler_sees(header: Option<&str>) -> (String, String) {
        let app = Router::new()
            .route("/", get(|Extension(id): Extension<RequestId>| async move { id.to_string() }))
            .layer(axum::middleware::from_fn(request_id_middleware));

        let mut request = axum::http::Request::get("/");
        if let Some(value) = header {
            request = request.header(REQUEST_ID_HEADER, value);
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let echoed = response.headers()[REQUEST_ID_HEADER].to_str().unwrap().to_owned();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (String::from_utf8(bytes.to_vec()).unwrap(), echoed)
    }

    #[tokio::test]
    async fn test_handlers_see_the_echoed_id() {
        let (seen, echoed) = handler_sees(Some("edge-42")).await;
        assert_eq!(seen, "edge-42");
        assert_eq!(echoed, "edge-42");

        let (seen, echoed) = handler_sees(Some("bad id")).await;
        assert_eq!(seen, echoed);
        assert!(Uuid::parse_str(&seen).is_ok());

        let (seen, echoed) = handler_sees(None).await;
        assert_eq!(seen, echoed);
    }

    #[test]
    fn test_client_ids_are_kept() {
        for id in ["req-123", "abc_DEF.9:1", "0f8c2b1e-7d3a-4c55-9e1a-2b6d4f0a9c11"] {
            assert_eq!(RequestId::from_client(id).map(|r| r.to_string()), Some(id.to_owned()));
        }
    }

    #[test]
    fn test_unusable_client_ids_are_dropped() {
        assert_eq!(RequestId::from_client(""), None);
        assert_eq!(RequestId::from_client("has space"), None);
        assert_eq!(RequestId::from_client("line\nbreak"), None);
        assert_eq!(RequestId::from_client(&"a".repeat(MAX_REQUEST_ID_LEN + 1)), None);
        assert!(RequestId::from_client(&"a".repeat(MAX_REQUEST_ID_LEN)).is_some());
    }

    #[test]
    fn test_generated_ids_are_uuids() {
        let id = RequestId::generate();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
        assert_ne!(id, RequestId::generate());
    }
}
