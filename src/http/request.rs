//! Request-scoped identity and logging span.
//!
//! # Responsibilities
//! - Generate or propagate a unique request ID
//! - Open the tracing span every handler of the request logs under
//!
//! # Design Decisions
//! - An incoming `X-Request-ID` header is honored; otherwise a UUID v4 is generated
//! - The scope is built by a context factory configured on the router, so
//!   applications can swap in their own span fields

use axum::http::request::Parts;
use std::sync::Arc;
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Builds the [`RequestScope`] for each matched request.
pub type ContextFactory = Arc<dyn Fn(&Parts) -> RequestScope + Send + Sync>;

/// Platform values attached to every request context.
#[derive(Debug, Clone)]
pub struct RequestScope {
    request_id: String,
    span: tracing::Span,
}

impl RequestScope {
    pub fn new(request_id: impl Into<String>, span: tracing::Span) -> Self {
        Self {
            request_id: request_id.into(),
            span,
        }
    }

    /// Default scope: propagated or fresh request ID and a `request` span.
    pub fn from_parts(parts: &Parts) -> Self {
        let request_id = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let span = tracing::info_span!(
            "request",
            request_id = %request_id,
            method = %parts.method,
            path = %parts.uri.path(),
        );

        Self { request_id, span }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }
}

/// The factory installed on routers created with `Router::new`.
pub fn default_context_factory() -> ContextFactory {
    Arc::new(RequestScope::from_parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    #[test]
    fn test_request_id_propagated() {
        let (parts, _) = Request::builder()
            .uri("/items")
            .header(X_REQUEST_ID, "abc-123")
            .body(Body::empty())
            .unwrap()
            .into_parts();

        let scope = RequestScope::from_parts(&parts);
        assert_eq!(scope.request_id(), "abc-123");
    }

    #[test]
    fn test_request_id_generated() {
        let (parts, _) = Request::builder()
            .uri("/items")
            .body(Body::empty())
            .unwrap()
            .into_parts();

        let a = RequestScope::from_parts(&parts);
        let b = RequestScope::from_parts(&parts);
        assert!(Uuid::parse_str(a.request_id()).is_ok());
        assert_ne!(a.request_id(), b.request_id());
    }
}
