//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (at startup):
//!     Router::get/post/... (prefix + path, handlers)
//!     → matcher.rs (validate, translate to Axum syntax)
//!     → inherited middleware + handlers = Chain
//!     → shared route table
//!
//! Compilation:
//!     route table → group by path → axum::Router
//!
//! Incoming Request:
//!     axum match → Endpoint::dispatch → Context::next → respond
//! ```
//!
//! # Design Decisions
//! - Route chains are immutable once registered
//! - Registration errors are returned, never panics
//! - Unmatched path or method is a bare 404

pub mod matcher;
pub mod router;

pub use matcher::{PathPattern, PatternError};
pub use router::{Router, RouterError};
