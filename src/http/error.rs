//! Handler error model.
//!
//! # Responsibilities
//! - Status-coded errors handlers return to short-circuit with a known HTTP outcome
//! - Multi-field validation errors (always surfaced as 422)
//! - Aggregation of errors recorded by several handlers in one chain
//!
//! # Design Decisions
//! - Closed enum: the resolution policy matches it exhaustively
//! - Unclassified errors are kept behind an `Arc` so the whole enum is `Clone`
//! - Handlers never pick status codes for their own errors; `response.rs` does

use axum::http::StatusCode;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Status code used for validation failures.
pub const STATUS_VALIDATION_ERROR: u16 = 422;

/// Result type returned by every handler in a chain.
pub type HandlerResult = Result<(), HandlerError>;

/// Machine-readable field error codes.
pub mod codes {
    /// Value is required.
    pub const REQUIRED: &str = "required";
    /// Numeric/date value is too high, or text is too long.
    pub const VALUE_TOO_HIGH: &str = "value-too-high";
    /// Numeric/date value is too low, or text is too short.
    pub const VALUE_TOO_LOW: &str = "value-too-low";
    /// Username taken, entity already exists.
    pub const DUPLICATE: &str = "duplicate";
    /// Unparseable value.
    pub const SYNTAX_ERROR: &str = "syntax-error";
    /// Value would put the object into an invalid state.
    pub const INVALID_STATE: &str = "invalid-state";
    /// The value references a resource that does not exist.
    pub const NOT_FOUND: &str = "not-found";
}

/// Errors a handler can return.
#[derive(Debug, Clone, Error)]
pub enum HandlerError {
    /// Expected failure with a specific HTTP status.
    #[error(transparent)]
    Status(#[from] StatusError),

    /// One or more input fields were rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Several handlers in the same chain failed.
    ///
    /// Only the engine builds this variant.
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    /// Anything else. Always surfaced as a bare 500.
    #[error("{0}")]
    Other(Arc<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Wrap an arbitrary error as an unclassified failure.
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Arc::new(err))
    }

    /// Unclassified failure carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Other(Arc::new(Message(message.into())))
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::Validation(_) => "validation",
            Self::Aggregate(_) => "aggregate",
            Self::Other(_) => "other",
        }
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);

/// An error with an HTTP status code and an optional client-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusError {
    pub status_code: u16,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl StatusError {
    pub const UNAUTHORIZED: StatusError = StatusError::bare(401);
    pub const FORBIDDEN: StatusError = StatusError::bare(403);
    pub const NOT_FOUND: StatusError = StatusError::bare(404);
    pub const CONFLICT: StatusError = StatusError::bare(409);
    pub const BAD_REQUEST: StatusError = StatusError::bare(400);

    const fn bare(status_code: u16) -> Self {
        Self {
            status_code,
            message: String::new(),
        }
    }

    /// Create a status error. An empty message means no response body.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            message: message.into(),
        }
    }

    /// The carried status, or 500 if the code is not a valid HTTP status.
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API Error ({}): {}", self.status_code, self.message)
    }
}

impl std::error::Error for StatusError {}

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub key: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Collects every field problem found in a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Error)]
#[error("Validation error")]
pub struct ValidationError {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a field error with no message or data.
    pub fn add_error(&mut self, key: impl Into<String>, error_code: impl Into<String>) {
        self.add_error_detailed(key, error_code, None, "");
    }

    /// Record a field error with structured data and a human-readable hint.
    pub fn add_error_detailed(
        &mut self,
        key: impl Into<String>,
        error_code: impl Into<String>,
        data: Option<serde_json::Value>,
        message: impl Into<String>,
    ) {
        self.errors.push(FieldError {
            key: key.into(),
            error_code: error_code.into(),
            message: message.into(),
            data,
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// `Ok(())` when nothing was recorded, otherwise the error itself.
    ///
    /// Lets a validating handler end with `validation.into_result()?`.
    pub fn into_result(self) -> HandlerResult {
        if self.has_errors() {
            Err(HandlerError::Validation(self))
        } else {
            Ok(())
        }
    }
}

/// Errors returned by several handlers of one chain, in recorded order.
#[derive(Debug, Clone, Default)]
pub struct AggregateError {
    pub errors: Vec<HandlerError>,
}

impl AggregateError {
    pub fn new(errors: Vec<HandlerError>) -> Self {
        Self { errors }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.as_slice() {
            [] => f.write_str("(no errors)"),
            [only] => write!(f, "{only}"),
            errors => {
                writeln!(f, "Multiple handlers returned error:")?;
                for (i, err) in errors.iter().enumerate() {
                    writeln!(f, "Error #{}", i + 1)?;
                    writeln!(f, "{err}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for AggregateError {}
