//! Shared utilities for integration tests.

use axum::body::Body;
use axum::http::{Method, Request, Response};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use chain_api::http::{handler, HandlerFn};
use chain_api::{Router, ServerConfig};

/// Ordered record of which handlers ran.
pub type Trace = Arc<Mutex<Vec<String>>>;

pub fn trace() -> Trace {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(trace: &Trace) -> Vec<String> {
    trace.lock().unwrap().clone()
}

/// Handler that records `name` and lets the chain continue.
pub fn mark(trace: &Trace, name: &'static str) -> HandlerFn {
    let trace = trace.clone();
    handler(move |_ctx| {
        let trace = trace.clone();
        Box::pin(async move {
            trace.lock().unwrap().push(name.to_string());
            Ok(())
        })
    })
}

/// Handler that sets `value` as the result.
pub fn respond_with(value: serde_json::Value) -> HandlerFn {
    handler(move |ctx| {
        let value = value.clone();
        Box::pin(async move {
            ctx.set_result(value);
            Ok(())
        })
    })
}

pub fn router() -> Router {
    Router::new(&ServerConfig::default())
}

/// Drive one request through the compiled router without a socket.
pub async fn send(router: Router, method: Method, uri: &str) -> Response<Body> {
    send_request(
        router,
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

#[allow(dead_code)]
pub async fn send_request(router: Router, request: Request<Body>) -> Response<Body> {
    router.into_service().oneshot(request).await.unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}
