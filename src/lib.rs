//! Handler-chain HTTP dispatch library.
//!
//! Routes map a method and path to an ordered chain of async handlers.
//! Inherited middleware runs first, then the route's own handlers. Each
//! request gets a fresh `Context`; the chain stops at the first error or
//! direct write, and exactly one JSON response is resolved from whatever
//! the handlers left behind.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::ServerConfig;
pub use http::{handler, Context, HandlerError, HandlerFn, HandlerResult, HttpServer};
pub use lifecycle::Shutdown;
pub use routing::{Router, RouterError};
