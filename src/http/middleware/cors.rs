//! CORS helpers.

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ORIGIN,
};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};

use crate::http::handler::{handler, HandlerFn};

/// Echo the request's `Origin` back in `Access-Control-Allow-Origin`.
pub fn allow_all_cors() -> HandlerFn {
    handler(|ctx| {
        Box::pin(async move {
            let origin = ctx
                .request()
                .headers()
                .get(ORIGIN)
                .filter(|origin| !origin.is_empty())
                .cloned();

            if let Some(origin) = origin {
                ctx.writer()
                    .headers_mut()
                    .insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
            }
            Ok(())
        })
    })
}

/// Answer `OPTIONS` preflight requests directly with the allowed methods and headers.
///
/// Any other method passes through untouched.
pub fn cors_preflight<M, H>(methods: M, headers: H) -> HandlerFn
where
    M: IntoIterator<Item = Method>,
    H: IntoIterator<Item = HeaderName>,
{
    let allow_methods = joined(methods.into_iter().map(|m| m.to_string()));
    let allow_headers = joined(headers.into_iter().map(|h| h.to_string()));

    handler(move |ctx| {
        let allow_methods = allow_methods.clone();
        let allow_headers = allow_headers.clone();
        Box::pin(async move {
            if ctx.request().method() != Method::OPTIONS {
                return Ok(());
            }

            let headers = ctx.writer().headers_mut();
            if let Some(value) = allow_methods {
                headers.insert(ACCESS_CONTROL_ALLOW_METHODS, value);
            }
            if let Some(value) = allow_headers {
                headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, value);
            }
            ctx.writer().write_header(StatusCode::OK);
            Ok(())
        })
    })
}

fn joined(items: impl Iterator<Item = String>) -> Option<HeaderValue> {
    let list = items.collect::<Vec<_>>().join(", ");
    match HeaderValue::from_str(&list) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(list = %list, error = %e, "Ignoring invalid CORS header value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::context::Context;
    use crate::http::handler::HandlerFn;
    use crate::http::params::{Params, ParamsConfig};
    use crate::http::request::RequestScope;
    use axum::body::Body;
    use axum::http::header::CONTENT_TYPE;
    use axum::http::{Request, Response};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    async fn run(chain: Vec<HandlerFn>, request: Request<Body>) -> Response<Body> {
        let params = Params::new(Vec::new(), None, ParamsConfig::default());
        let scope = RequestScope::new("test", tracing::Span::none());
        Context::new(request, params, chain.into(), scope).run().await
    }

    fn flag_handler(flag: &Arc<AtomicBool>) -> HandlerFn {
        let flag = flag.clone();
        handler(move |ctx| {
            let flag = flag.clone();
            Box::pin(async move {
                flag.store(true, Ordering::SeqCst);
                ctx.set_result("ok");
                Ok(())
            })
        })
    }

    #[tokio::test]
    async fn test_allow_all_cors_echoes_origin() {
        let request = Request::builder()
            .header(ORIGIN, "https://app.example.com")
            .body(Body::empty())
            .unwrap();

        let response = run(vec![allow_all_cors()], request).await;

        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://app.example.com"
        );
        // Setting headers is not a write, so resolution still ran
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn test_allow_all_cors_without_origin() {
        let response = run(vec![allow_all_cors()], Request::new(Body::empty())).await;
        assert!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn test_preflight_takes_over_options() {
        let reached = Arc::new(AtomicBool::new(false));
        let preflight = cors_preflight(
            [Method::GET, Method::POST],
            [CONTENT_TYPE, HeaderName::from_static("x-api-key")],
        );
        let request = Request::builder()
            .method(Method::OPTIONS)
            .body(Body::empty())
            .unwrap();

        let response = run(vec![preflight, flag_handler(&reached)], request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_METHODS], "GET, POST");
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_HEADERS],
            "content-type, x-api-key"
        );
        assert!(!reached.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_preflight_passes_other_methods_through() {
        let reached = Arc::new(AtomicBool::new(false));
        let preflight = cors_preflight([Method::GET], []);

        let response = run(
            vec![preflight, flag_handler(&reached)],
            Request::new(Body::empty()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(ACCESS_CONTROL_ALLOW_METHODS).is_none());
        assert!(reached.load(Ordering::SeqCst));
    }
}
