//! HTTP handler-chain subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tower layers)
//!     → [routing layer matches method + path]
//!     → request.rs (request ID, span)
//!     → context.rs (run handler chain: middleware → route handlers)
//!     → response.rs (resolve result/errors into one response)
//!     → Send to client
//! ```

pub mod context;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod params;
pub mod request;
pub mod response;
pub mod server;
pub mod values;

pub use context::Context;
pub use error::{
    AggregateError, FieldError, HandlerError, HandlerResult, StatusError, ValidationError,
};
pub use handler::{handler, Chain, Handler, HandlerFn};
pub use params::{Params, ParamsConfig};
pub use request::{ContextFactory, RequestScope, X_REQUEST_ID};
pub use response::{Pagination, ResponseWriter, X_PAGINATION_NEXT};
pub use server::{HttpServer, ServerError};
pub use values::{Key, Values};
