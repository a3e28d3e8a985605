//! Response writing and resolution.
//!
//! # Responsibilities
//! - Buffer whatever handlers write directly and remember that they did
//! - Turn the chain's accumulated result and errors into exactly one response
//! - Map handler errors to HTTP status codes
//!
//! # Design Decisions
//! - Setting headers is not a write; only a status or body bytes count
//! - Once a handler wrote, resolution leaves the response alone
//! - Unclassified errors never leak details: bare 500
//! - Results are serialized late so a failing `Serialize` impl degrades to 500

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Response, StatusCode};
use serde::Serialize;
use url::Url;

use crate::http::error::{FieldError, HandlerError, STATUS_VALIDATION_ERROR};

pub const X_PAGINATION_NEXT: &str = "x-pagination-next";

const VALIDATION_ERROR_CODE: &str = "multi";
const VALIDATION_MESSAGE: &str = "Validation error. See errors array for details.";

/// Reference to the next page of a paginated result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub next: Url,
}

impl Pagination {
    pub fn new(next: Url) -> Self {
        Self { next }
    }
}

/// A handler result whose serialization is deferred until the response is resolved.
pub trait ResultBody: Send {
    fn to_json(&self) -> serde_json::Result<Vec<u8>>;
}

impl<T: Serialize + Send> ResultBody for T {
    fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Outbound response buffer that records whether a handler wrote to it.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
    written: bool,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable headers. Changing headers does not count as a write.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Set the response status. Only the first call takes effect.
    pub fn write_header(&mut self, status: StatusCode) {
        self.written = true;
        match self.status {
            None => self.status = Some(status),
            Some(current) => {
                tracing::warn!(
                    current = %current,
                    ignored = %status,
                    "Superfluous write_header call"
                );
            }
        }
    }

    /// Append body bytes, implying `200 OK` if no status was written yet.
    pub fn write_body(&mut self, bytes: &[u8]) {
        if self.status.is_none() {
            self.write_header(StatusCode::OK);
        }
        self.body.extend_from_slice(bytes);
    }

    /// Whether a status or body has been written.
    pub fn is_written(&self) -> bool {
        self.written
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn into_response(self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

impl std::io::Write for ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.write_body(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationBody {
    status_code: u16,
    error_code: &'static str,
    message: &'static str,
    errors: Vec<FieldError>,
}

/// Produce the single response for a finished chain.
pub(crate) fn resolve(
    mut writer: ResponseWriter,
    err: Option<HandlerError>,
    result: Option<Box<dyn ResultBody>>,
    pagination: Option<Pagination>,
) -> Response<Body> {
    if writer.is_written() {
        return writer.into_response();
    }

    let (status, result) = match err {
        None => {
            if let Some(pagination) = pagination {
                set_pagination_header(&mut writer, &pagination);
            }
            (StatusCode::OK, result)
        }
        Some(HandlerError::Validation(verr)) => {
            tracing::debug!(fields = verr.errors.len(), "Validation failed");
            let body: Box<dyn ResultBody> = Box::new(ValidationBody {
                status_code: STATUS_VALIDATION_ERROR,
                error_code: VALIDATION_ERROR_CODE,
                message: VALIDATION_MESSAGE,
                errors: verr.errors,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Some(body))
        }
        Some(HandlerError::Status(serr)) => {
            tracing::debug!(status = serr.status_code, message = %serr.message, "Handler returned status error");
            let status = serr.status();
            let body: Option<Box<dyn ResultBody>> = if serr.message.is_empty() {
                None
            } else {
                Some(Box::new(serr))
            };
            (status, body)
        }
        Some(other @ (HandlerError::Aggregate(_) | HandlerError::Other(_))) => {
            tracing::error!(error = %other, "Handler chain failed");
            (StatusCode::INTERNAL_SERVER_ERROR, None)
        }
    };

    writer.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );

    match result {
        Some(body) => match body.to_json() {
            Ok(bytes) => {
                writer.write_header(status);
                writer.write_body(&bytes);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response body");
                writer.write_header(StatusCode::INTERNAL_SERVER_ERROR);
            }
        },
        None => writer.write_header(status),
    }

    writer.into_response()
}

fn set_pagination_header(writer: &mut ResponseWriter, pagination: &Pagination) {
    match HeaderValue::from_str(pagination.next.as_str()) {
        Ok(value) => {
            writer.headers_mut().insert(X_PAGINATION_NEXT, value);
        }
        Err(e) => {
            tracing::warn!(next = %pagination.next, error = %e, "Dropping unrepresentable pagination header");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::error::{codes, StatusError, ValidationError};
    use std::io::Write;

    async fn body_string(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_headers_do_not_count_as_write() {
        let mut writer = ResponseWriter::new();
        writer
            .headers_mut()
            .insert("x-custom", HeaderValue::from_static("1"));
        assert!(!writer.is_written());

        writer.write_header(StatusCode::ACCEPTED);
        assert!(writer.is_written());
    }

    #[test]
    fn test_first_status_wins() {
        let mut writer = ResponseWriter::new();
        writer.write_header(StatusCode::CREATED);
        writer.write_header(StatusCode::BAD_REQUEST);
        assert_eq!(writer.status(), Some(StatusCode::CREATED));
    }

    #[tokio::test]
    async fn test_body_write_implies_ok() {
        let mut writer = ResponseWriter::new();
        write!(writer, "hello").unwrap();
        assert_eq!(writer.status(), Some(StatusCode::OK));

        let response = writer.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "hello");
    }

    #[tokio::test]
    async fn test_resolve_success_with_result() {
        let result: Box<dyn ResultBody> = Box::new(serde_json::json!({ "ok": true }));
        let response = resolve(ResponseWriter::new(), None, Some(result), None);

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        assert_eq!(body_string(response).await, r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn test_resolve_success_without_result() {
        let response = resolve(ResponseWriter::new(), None, None, None);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "");
    }

    #[test]
    fn test_resolve_pagination_only_on_success() {
        let next = Url::parse("https://api.example.com/items?page=2").unwrap();

        let response = resolve(
            ResponseWriter::new(),
            None,
            None,
            Some(Pagination::new(next.clone())),
        );
        assert_eq!(
            response.headers()[X_PAGINATION_NEXT],
            "https://api.example.com/items?page=2"
        );

        let response = resolve(
            ResponseWriter::new(),
            Some(StatusError::NOT_FOUND.into()),
            None,
            Some(Pagination::new(next)),
        );
        assert!(response.headers().get(X_PAGINATION_NEXT).is_none());
    }

    #[tokio::test]
    async fn test_resolve_validation_error_replaces_result() {
        let mut verr = ValidationError::new();
        verr.add_error("name", codes::REQUIRED);
        let stale: Box<dyn ResultBody> = Box::new("stale");

        let response = resolve(
            ResponseWriter::new(),
            Some(verr.into()),
            Some(stale),
            None,
        );
        assert_eq!(response.status().as_u16(), 422);

        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "statusCode": 422,
                "errorCode": "multi",
                "message": "Validation error. See errors array for details.",
                "errors": [{ "key": "name", "errorCode": "required" }]
            })
        );
    }

    #[tokio::test]
    async fn test_resolve_status_error_body_depends_on_message() {
        let response = resolve(
            ResponseWriter::new(),
            Some(StatusError::NOT_FOUND.into()),
            Some(Box::new("discarded")),
            None,
        );
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "");

        let response = resolve(
            ResponseWriter::new(),
            Some(StatusError::new(StatusCode::CONFLICT, "already exists").into()),
            None,
            None,
        );
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            body_string(response).await,
            r#"{"statusCode":409,"message":"already exists"}"#
        );
    }

    #[tokio::test]
    async fn test_resolve_other_error_is_bare_500() {
        let response = resolve(
            ResponseWriter::new(),
            Some(HandlerError::msg("database password is hunter2")),
            Some(Box::new("discarded")),
            None,
        );
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(response).await, "");
    }

    #[tokio::test]
    async fn test_resolve_leaves_written_response_alone() {
        let mut writer = ResponseWriter::new();
        writer.write_header(StatusCode::IM_A_TEAPOT);
        writer.write_body(b"short and stout");

        let response = resolve(
            writer,
            Some(HandlerError::msg("ignored")),
            Some(Box::new("ignored")),
            None,
        );
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
        assert_eq!(body_string(response).await, "short and stout");
    }

    #[tokio::test]
    async fn test_resolve_serialization_failure_is_bare_500() {
        use std::collections::HashMap;

        // JSON object keys must be strings
        let mut unserializable = HashMap::new();
        unserializable.insert(vec![1u8], "value");

        let response = resolve(
            ResponseWriter::new(),
            None,
            Some(Box::new(unserializable)),
            None,
        );
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(response).await, "");
    }
}
