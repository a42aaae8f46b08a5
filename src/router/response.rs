//! Response helpers shared by the router and handlers.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::StatusCode;
use serde::Serialize;
use tracing::warn;

use super::route::Response;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain";

/// JSON body of an error response.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: u16,
    #[serde(skip_serializing_if = "str::is_empty")]
    reason: &'a str,
}

/// Serves `value` as a JSON document followed by a newline.
pub fn json_response<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(mut body) => {
            body.push(b'\n');
            build(status, CONTENT_TYPE_JSON, body)
        }
        Err(e) => {
            warn!(error = %e, "response serialization failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Serves plain text followed by a newline.
pub fn text_response(status: StatusCode, text: &str) -> Response {
    let mut body = Vec::with_capacity(text.len() + 1);
    body.extend_from_slice(text.as_bytes());
    body.push(b'\n');
    build(status, CONTENT_TYPE_TEXT, body)
}

/// Serves `{"code": <status>, "reason": "<status text>"}`.
pub fn error_response(status: StatusCode) -> Response {
    let reason = status.canonical_reason().unwrap_or_default();
    let body = ErrorBody {
        code: status.as_u16(),
        reason,
    };
    match serde_json::to_vec(&body) {
        Ok(mut bytes) => {
            bytes.push(b'\n');
            build(status, CONTENT_TYPE_JSON, bytes)
        }
        Err(_) => build(status, CONTENT_TYPE_TEXT, Vec::new()),
    }
}

fn build(status: StatusCode, content_type: &'static str, body: Vec<u8>) -> Response {
    let mut res = Response::new(Bytes::from(body));
    *res.status_mut() = status;
    res.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body() {
        let res = error_response(StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.headers()[CONTENT_TYPE], CONTENT_TYPE_JSON);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body, serde_json::json!({"code": 405, "reason": "Method Not Allowed"}));
    }

    #[test]
    fn test_text_body_ends_with_newline() {
        let res = text_response(StatusCode::OK, "hello");
        assert_eq!(res.body().as_ref(), b"hello\n");
        assert_eq!(res.headers()[CONTENT_TYPE], CONTENT_TYPE_TEXT);
    }

    #[test]
    fn test_json_response() {
        let res = json_response(StatusCode::CREATED, &serde_json::json!({"id": 7}));
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.body().as_ref(), b"{\"id\":7}\n");
    }
}
