//! HTTP response helpers for consistent API responses.
//!
//! Successes are pretty-printed JSON. Errors are a fixed plain-text line:
//! the web frontend displays the body as-is, so the cause of a failure is
//! logged here and never sent to the client.

use std::fmt::Display;

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Body sent when a success value cannot be serialized.
const ENCODE_FAILURE_BODY: &str = "Internal server error\n";

const JSON_CONTENT_TYPE: &str = "application/json";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Standard success response: `200` with 2-space indented JSON.
///
/// A serialization failure only affects this request: it is logged and
/// answered with a `500`.
pub fn json_response<T: Serialize + ?Sized>(data: &T) -> Response {
    match serde_json::to_string_pretty(data) {
        Ok(body) => with_content_type(StatusCode::OK, body, JSON_CONTENT_TYPE),
        Err(e) => {
            log::error!("[API] Failed to encode response: {}", e);
            with_content_type(
                StatusCode::INTERNAL_SERVER_ERROR,
                ENCODE_FAILURE_BODY.to_string(),
                TEXT_CONTENT_TYPE,
            )
        }
    }
}

/// Standard error response: `status` with `message` as a plain-text line.
///
/// `cause` is logged server-side only.
pub fn error_response(status: StatusCode, message: &str, cause: Option<&dyn Display>) -> Response {
    if let Some(cause) = cause {
        log::error!("[API] {}: {}", message, cause);
    }
    log::warn!("[API] {} {}", status.as_u16(), message);
    with_content_type(status, format!("{}\n", message), TEXT_CONTENT_TYPE)
}

fn with_content_type(status: StatusCode, body: String, content_type: &'static str) -> Response {
    let mut response = (status, Body::from(body)).into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde::ser::Error as _;
    use serde::Serializer;

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        String::from_utf8(bytes.to_vec()).expect("utf-8 body")
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("boom"))
        }
    }

    #[tokio::test]
    async fn success_is_indented_json() {
        let response = json_response(&serde_json::json!({ "note": "hi" }));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        assert_eq!(body_string(response).await, "{\n  \"note\": \"hi\"\n}");
    }

    #[tokio::test]
    async fn error_body_is_message_line_without_cause() {
        let cause = "connection refused";
        let response = error_response(
            StatusCode::BAD_GATEWAY,
            "Stream unavailable",
            Some(&cause),
        );
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_string(response).await;
        assert_eq!(body, "Stream unavailable\n");
        assert!(!body.contains(cause));
    }

    #[tokio::test]
    async fn encode_failure_is_isolated_500() {
        let response = json_response(&Unencodable);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(response).await, ENCODE_FAILURE_BODY);
    }
}
