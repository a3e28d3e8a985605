//! Route registration and dispatch.
//!
//! # Responsibilities
//! - Register routes as method + path + ordered handler list
//! - Prepend inherited middleware (root first) to every route's chain
//! - Compile the route table into an Axum router
//! - Run a fresh `Context` per matched request
//!
//! # Design Decisions
//! - Sub-routers share the root's route table; only prefix, middleware and
//!   context factory are per scope
//! - Middleware is captured when a route is registered: `use_middleware`
//!   after a route does not change that route's chain
//! - Conflicts are reported at registration instead of panicking in Axum
//! - Unmatched paths and unmatched methods both get a bare 404

use axum::body::Body;
use axum::extract::{FromRequestParts, RawPathParams};
use axum::http::request::Parts;
use axum::http::{Method, Request, Response, StatusCode};
use axum::routing::{MethodFilter, MethodRouter};
use axum::Router as AxumRouter;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use thiserror::Error;
use tracing::Instrument;

use crate::config::ServerConfig;
use crate::http::context::Context;
use crate::http::handler::{Chain, HandlerFn};
use crate::http::params::{Params, ParamsConfig};
use crate::http::request::{default_context_factory, ContextFactory, RequestScope};
use crate::observability::metrics;
use crate::routing::matcher::{PathPattern, PatternError};

/// Error type for route registration.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("no context factory configured for {method} {path}")]
    MissingContextFactory { method: Method, path: String },

    #[error("route {method} {path} is already registered")]
    DuplicateRoute { method: Method, path: String },

    #[error("route {path} conflicts with registered route {existing}")]
    ConflictingRoute { path: String, existing: String },

    #[error("invalid path '{path}': {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: PatternError,
    },

    #[error("unsupported method {0}")]
    UnsupportedMethod(Method),
}

/// Per-request settings shared by every route of a table.
#[derive(Debug, Clone)]
struct DispatchSettings {
    params: ParamsConfig,
    max_body_bytes: usize,
}

#[derive(Clone)]
struct Route {
    method: Method,
    filter: MethodFilter,
    pattern: PathPattern,
    chain: Chain,
    context_factory: ContextFactory,
}

struct RouteTable {
    settings: DispatchSettings,
    routes: Mutex<Vec<Route>>,
}

struct Scope {
    parent: Option<Arc<Scope>>,
    prefix: String,
    middleware: Mutex<Vec<HandlerFn>>,
    context_factory: Mutex<Option<ContextFactory>>,
}

impl Scope {
    fn new(parent: Option<Arc<Scope>>, prefix: String, factory: Option<ContextFactory>) -> Self {
        Self {
            parent,
            prefix,
            middleware: Mutex::new(Vec::new()),
            context_factory: Mutex::new(factory),
        }
    }

    /// Inherited middleware, outermost scope first.
    fn middleware(&self) -> Vec<HandlerFn> {
        let mut chain = match &self.parent {
            Some(parent) => parent.middleware(),
            None => Vec::new(),
        };
        chain.extend(
            self.middleware
                .lock()
                .expect("middleware lock poisoned")
                .iter()
                .cloned(),
        );
        chain
    }

    /// Nearest context factory, walking up to the root.
    fn context_factory(&self) -> Option<ContextFactory> {
        let own = self
            .context_factory
            .lock()
            .expect("context factory lock poisoned")
            .clone();
        own.or_else(|| self.parent.as_ref().and_then(|p| p.context_factory()))
    }
}

/// Handler-chain router. Cloning yields a handle to the same scope.
#[derive(Clone)]
pub struct Router {
    scope: Arc<Scope>,
    table: Arc<RouteTable>,
}

impl Router {
    /// Root router using [`RequestScope::from_parts`] for every request.
    pub fn new(config: &ServerConfig) -> Self {
        Self::root(config, Some(default_context_factory()))
    }

    /// Root router without a context factory.
    ///
    /// Routes can only be registered after [`Router::set_context_factory`]
    /// was called on this router or on the sub-router registering them.
    pub fn bare(config: &ServerConfig) -> Self {
        Self::root(config, None)
    }

    fn root(config: &ServerConfig, factory: Option<ContextFactory>) -> Self {
        let settings = DispatchSettings {
            params: config.params.clone(),
            max_body_bytes: config.body.max_bytes,
        };
        Self {
            scope: Arc::new(Scope::new(None, String::new(), factory)),
            table: Arc::new(RouteTable {
                settings,
                routes: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Replace how request scopes are built for routes registered from now on.
    pub fn set_context_factory<F>(&self, factory: F)
    where
        F: Fn(&Parts) -> RequestScope + Send + Sync + 'static,
    {
        *self
            .scope
            .context_factory
            .lock()
            .expect("context factory lock poisoned") = Some(Arc::new(factory));
    }

    /// Child router whose routes live under `prefix` and run this router's
    /// middleware before their own.
    pub fn sub_router(&self, prefix: &str) -> Router {
        let prefix = format!("{}{}", self.scope.prefix, prefix);
        Router {
            scope: Arc::new(Scope::new(Some(self.scope.clone()), prefix, None)),
            table: self.table.clone(),
        }
    }

    /// Append middleware for routes registered on this router or its children.
    pub fn use_middleware(&self, middleware: HandlerFn) {
        self.scope
            .middleware
            .lock()
            .expect("middleware lock poisoned")
            .push(middleware);
    }

    pub fn get<I>(&self, path: &str, handlers: I) -> Result<(), RouterError>
    where
        I: IntoIterator<Item = HandlerFn>,
    {
        self.route(Method::GET, path, handlers)
    }

    pub fn post<I>(&self, path: &str, handlers: I) -> Result<(), RouterError>
    where
        I: IntoIterator<Item = HandlerFn>,
    {
        self.route(Method::POST, path, handlers)
    }

    pub fn put<I>(&self, path: &str, handlers: I) -> Result<(), RouterError>
    where
        I: IntoIterator<Item = HandlerFn>,
    {
        self.route(Method::PUT, path, handlers)
    }

    pub fn delete<I>(&self, path: &str, handlers: I) -> Result<(), RouterError>
    where
        I: IntoIterator<Item = HandlerFn>,
    {
        self.route(Method::DELETE, path, handlers)
    }

    pub fn options<I>(&self, path: &str, handlers: I) -> Result<(), RouterError>
    where
        I: IntoIterator<Item = HandlerFn>,
    {
        self.route(Method::OPTIONS, path, handlers)
    }

    /// Register `handlers` for `method` at this router's prefix + `path`.
    pub fn route<I>(&self, method: Method, path: &str, handlers: I) -> Result<(), RouterError>
    where
        I: IntoIterator<Item = HandlerFn>,
    {
        let full_path = format!("{}{}", self.scope.prefix, path);
        let pattern = PathPattern::parse(&full_path).map_err(|source| RouterError::InvalidPath {
            path: full_path.clone(),
            source,
        })?;

        let filter = MethodFilter::try_from(method.clone())
            .map_err(|_| RouterError::UnsupportedMethod(method.clone()))?;

        let context_factory =
            self.scope
                .context_factory()
                .ok_or_else(|| RouterError::MissingContextFactory {
                    method: method.clone(),
                    path: full_path.clone(),
                })?;

        let mut chain = self.scope.middleware();
        chain.extend(handlers);
        let chain: Chain = chain.into();

        let mut routes = self.table.routes.lock().expect("route table lock poisoned");
        for existing in routes.iter() {
            if existing.pattern.conflicts_with(&pattern) {
                return Err(RouterError::ConflictingRoute {
                    path: full_path,
                    existing: existing.pattern.as_str().to_string(),
                });
            }
            if existing.pattern == pattern && existing.method == method {
                return Err(RouterError::DuplicateRoute {
                    method,
                    path: full_path,
                });
            }
        }

        tracing::debug!(
            method = %method,
            path = %full_path,
            handlers = chain.len(),
            "Route registered"
        );

        routes.push(Route {
            method,
            filter,
            pattern,
            chain,
            context_factory,
        });
        Ok(())
    }

    /// Registered routes as `(method, path, chain length)`, in registration order.
    pub fn routes(&self) -> Vec<(Method, String, usize)> {
        self.table
            .routes
            .lock()
            .expect("route table lock poisoned")
            .iter()
            .map(|r| (r.method.clone(), r.pattern.as_str().to_string(), r.chain.len()))
            .collect()
    }

    /// Compile every route of the shared table into an Axum router.
    pub fn into_service(self) -> AxumRouter {
        let routes = self
            .table
            .routes
            .lock()
            .expect("route table lock poisoned")
            .clone();
        let settings = Arc::new(self.table.settings.clone());

        let mut by_path: BTreeMap<String, Vec<Route>> = BTreeMap::new();
        for route in routes {
            by_path
                .entry(route.pattern.axum_path().to_string())
                .or_default()
                .push(route);
        }

        let mut app = AxumRouter::new();
        for (path, routes) in by_path {
            let has_get = routes.iter().any(|r| r.method == Method::GET);
            let has_head = routes.iter().any(|r| r.method == Method::HEAD);

            let mut method_router = MethodRouter::<()>::new().fallback(not_found);
            // Axum answers HEAD with the GET handler unless HEAD has its own endpoint
            if has_get && !has_head {
                method_router = method_router.on(MethodFilter::HEAD, not_found);
            }

            for route in routes {
                let filter = route.filter;
                let endpoint = Arc::new(Endpoint {
                    chain: route.chain,
                    context_factory: route.context_factory,
                    settings: settings.clone(),
                });
                method_router = method_router.on(filter, move |request: Request<Body>| {
                    let endpoint = endpoint.clone();
                    async move { endpoint.dispatch(request).await }
                });
            }

            app = app.route(&path, method_router);
        }

        app.fallback(not_found)
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("prefix", &self.scope.prefix)
            .field("routes", &self.routes())
            .finish()
    }
}

/// One compiled route.
struct Endpoint {
    chain: Chain,
    context_factory: ContextFactory,
    settings: Arc<DispatchSettings>,
}

impl Endpoint {
    async fn dispatch(&self, request: Request<Body>) -> Response<Body> {
        let started = Instant::now();
        let (mut parts, body) = request.into_parts();

        let path_params: Vec<(String, String)> =
            match RawPathParams::from_request_parts(&mut parts, &()).await {
                Ok(raw) => raw
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect(),
                Err(rejection) => {
                    // The query string must never stand in for a path segment
                    tracing::debug!(
                        path = %parts.uri.path(),
                        error = %rejection,
                        "Rejecting undecodable path parameters"
                    );
                    metrics::record_response(
                        parts.method.as_str(),
                        StatusCode::BAD_REQUEST.as_u16(),
                        started.elapsed(),
                    );
                    return bare_status(StatusCode::BAD_REQUEST);
                }
            };

        let scope = (self.context_factory)(&parts);
        let span = scope.span().clone();
        let params = Params::new(path_params, parts.uri.query(), self.settings.params.clone());
        let method = parts.method.clone();

        let mut ctx = Context::new(
            Request::from_parts(parts, body),
            params,
            self.chain.clone(),
            scope,
        )
        .with_body_limit(self.settings.max_body_bytes);

        async move {
            ctx.next().await;

            match ctx.errors() {
                [] => {}
                [only] => metrics::record_handler_error(only.kind()),
                _ => metrics::record_handler_error("aggregate"),
            }

            let response = ctx.respond();
            let elapsed = started.elapsed();
            tracing::debug!(
                status = response.status().as_u16(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Request resolved"
            );
            metrics::record_response(method.as_str(), response.status().as_u16(), elapsed);
            response
        }
        .instrument(span)
        .await
    }
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

fn bare_status(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}
