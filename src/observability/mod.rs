//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request:
//!     → RequestScope span (request_id, method, path)
//!     → handler log events inside the span
//!     → metrics.rs (response counter, latency histogram)
//!
//! Consumers:
//!     → stdout via tracing-subscriber fmt layer
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log line via the request span
//! - Metrics are cheap (no-ops until a recorder is installed)

pub mod logging;
pub mod metrics;
