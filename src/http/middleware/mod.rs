//! Reusable chain handlers.
//!
//! Everything here is an ordinary [`HandlerFn`](crate::http::handler::HandlerFn)
//! meant to be installed with `Router::use_middleware` or listed in a route.

pub mod cors;
pub mod trace;

pub use cors::{allow_all_cors, cors_preflight};
pub use trace::log_requests;
