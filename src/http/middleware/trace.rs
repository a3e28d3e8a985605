//! Request logging middleware.

use std::time::Instant;

use crate::http::handler::{handler, HandlerFn};

/// Log each request once the downstream chain has finished.
pub fn log_requests() -> HandlerFn {
    handler(|ctx| {
        Box::pin(async move {
            let started = Instant::now();
            let method = ctx.request().method().clone();
            let path = ctx.request().uri().path().to_string();

            ctx.next().await;

            let elapsed_ms = started.elapsed().as_millis() as u64;
            match ctx.err() {
                Some(err) => tracing::warn!(
                    %method,
                    %path,
                    elapsed_ms,
                    error = %err,
                    "Request chain failed"
                ),
                None => tracing::info!(
                    %method,
                    %path,
                    elapsed_ms,
                    written = ctx.response_written(),
                    "Request chain completed"
                ),
            }
            Ok(())
        })
    })
}
