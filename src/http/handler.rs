//! Handler contract.
//!
//! A handler is one link of a chain: it receives the request context, may
//! mutate it (result, pagination, values, direct writes) and returns an
//! optional error. Middleware is just a handler that awaits
//! [`Context::next`] somewhere in its body.

use futures_util::future::BoxFuture;
use std::sync::Arc;

use crate::http::context::Context;
use crate::http::error::HandlerResult;

/// One link of a handler chain.
pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult>;
}

impl<F> Handler for F
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        self(ctx)
    }
}

/// Shared, type-erased handler.
pub type HandlerFn = Arc<dyn Handler>;

/// Immutable handler sequence for one route, shared by all its requests.
pub type Chain = Arc<[HandlerFn]>;

/// Wrap a closure as a [`HandlerFn`].
///
/// ```
/// use chain_api::http::handler::handler;
///
/// let ping = handler(|ctx| {
///     Box::pin(async move {
///         ctx.set_result(serde_json::json!({ "ok": true }));
///         Ok(())
///     })
/// });
/// # let _ = ping;
/// ```
pub fn handler<F>(f: F) -> HandlerFn
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    Arc::new(f)
}
