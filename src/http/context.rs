//! Per-request handler chain execution.
//!
//! # Responsibilities
//! - Own the request, response buffer, chain cursor, errors and result
//! - Run handlers one at a time, stopping on the first error or direct write
//! - Hand everything to the resolution policy exactly once
//!
//! # Design Decisions
//! - `next()` is a loop over the cursor, not self-recursion: a chain of
//!   handlers that never call `next()` runs flat
//! - A handler that awaits `next()` resumes only after the whole downstream
//!   chain finished (onion order)
//! - A context is created per request and consumed by `respond()`

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::http::error::{AggregateError, HandlerError, StatusError};
use crate::http::handler::Chain;
use crate::http::params::Params;
use crate::http::request::RequestScope;
use crate::http::response::{self, Pagination, ResponseWriter, ResultBody};
use crate::http::values::Values;

/// Default upper bound for [`Context::parse_body`].
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Request context handed to every handler of a chain.
pub struct Context {
    request: Request<Body>,
    writer: ResponseWriter,
    chain: Chain,
    index: usize,
    errors: Vec<HandlerError>,
    result: Option<Box<dyn ResultBody>>,
    pagination: Option<Pagination>,
    params: Params,
    values: Values,
    scope: RequestScope,
    max_body_bytes: usize,
}

impl Context {
    pub fn new(request: Request<Body>, params: Params, chain: Chain, scope: RequestScope) -> Self {
        Self {
            request,
            writer: ResponseWriter::new(),
            chain,
            index: 0,
            errors: Vec::new(),
            result: None,
            pagination: None,
            params,
            values: Values::new(),
            scope,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Limit the number of body bytes [`Context::parse_body`] will buffer.
    pub fn with_body_limit(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Run the remaining handlers of the chain.
    ///
    /// Middleware awaits this to delay its own code until every downstream
    /// handler has finished. Calling it on an exhausted chain is a no-op.
    pub fn next(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            while let Some(handler) = self.chain.get(self.index).cloned() {
                self.index += 1;

                if let Err(err) = handler.call(self).await {
                    tracing::debug!(
                        handler_index = self.index - 1,
                        error = %err,
                        "Handler returned error, stopping chain"
                    );
                    self.errors.push(err);
                    self.stop();
                } else if self.writer.is_written() {
                    self.stop();
                }
            }
        })
    }

    /// Skip every handler that has not started yet.
    ///
    /// Handlers suspended in their own `next()` call still resume.
    pub fn stop(&mut self) {
        self.index = self.chain.len();
    }

    pub fn is_exhausted(&self) -> bool {
        self.index >= self.chain.len()
    }

    /// Errors recorded so far: none, the single error, or all of them aggregated.
    pub fn err(&self) -> Option<HandlerError> {
        match self.errors.as_slice() {
            [] => None,
            [only] => Some(only.clone()),
            all => Some(AggregateError::new(all.to_vec()).into()),
        }
    }

    pub fn errors(&self) -> &[HandlerError] {
        &self.errors
    }

    /// Set the value serialized as the response body. The last call wins.
    pub fn set_result<T>(&mut self, value: T)
    where
        T: Serialize + Send + 'static,
    {
        self.result = Some(Box::new(value));
    }

    pub fn clear_result(&mut self) {
        self.result = None;
    }

    pub fn has_result(&self) -> bool {
        self.result.is_some()
    }

    pub fn set_pagination(&mut self, pagination: Pagination) {
        self.pagination = Some(pagination);
    }

    pub fn pagination(&self) -> Option<&Pagination> {
        self.pagination.as_ref()
    }

    pub fn request(&self) -> &Request<Body> {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request<Body> {
        &mut self.request
    }

    /// Direct access to the response. Writing a status or body bytes hands
    /// the response over to the handler: the chain stops after it returns
    /// and resolution writes nothing.
    pub fn writer(&mut self) -> &mut ResponseWriter {
        &mut self.writer
    }

    pub fn response_written(&self) -> bool {
        self.writer.is_written()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut Values {
        &mut self.values
    }

    pub fn scope(&self) -> &RequestScope {
        &self.scope
    }

    /// Read the request body and decode it as JSON.
    ///
    /// Malformed JSON is a client error (400); failing to read the body is not.
    pub async fn parse_body<T: DeserializeOwned>(&mut self) -> Result<T, HandlerError> {
        let body = std::mem::take(self.request.body_mut());
        let bytes = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|e| HandlerError::msg(format!("error reading request body: {e}")))?;

        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::debug!(error = %e, "Error unmarshalling body");
            StatusError::BAD_REQUEST.into()
        })
    }

    /// Run the chain from the current cursor and resolve the response.
    pub async fn run(mut self) -> Response<Body> {
        self.next().await;
        self.respond()
    }

    /// Resolve the single response for this request.
    pub fn respond(self) -> Response<Body> {
        let err = self.err();
        response::resolve(self.writer, err, self.result, self.pagination)
    }
}
