//! HTTP response building helpers
//!
//! Every JSON error body has the shape `{"message": "..."}`.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{header, Response, StatusCode};
use serde::Serialize;
use tracing::error;

use crate::error::WaitlistError;

/// Build a JSON response with the given status code
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(json)))
        .unwrap_or_default()
}

pub fn ok<T: Serialize>(body: &T) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, body)
}

pub fn created<T: Serialize>(body: &T) -> Response<Full<Bytes>> {
    json_response(StatusCode::CREATED, body)
}

/// JSON `{"message": ...}` with the given status
pub fn message(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(status, &serde_json::json!({ "message": message }))
}

pub fn no_content() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(Full::new(Bytes::new()))
        .unwrap_or_default()
}

pub fn bad_request(msg: &str) -> Response<Full<Bytes>> {
    message(StatusCode::BAD_REQUEST, msg)
}

pub fn not_found(msg: &str) -> Response<Full<Bytes>> {
    message(StatusCode::NOT_FOUND, msg)
}

pub fn method_not_allowed() -> Response<Full<Bytes>> {
    message(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// Map a service error to its HTTP response.
///
/// Store-layer details are logged here and replaced by a generic message.
pub fn error_response(err: &WaitlistError) -> Response<Full<Bytes>> {
    match err {
        WaitlistError::Validation(msg) => bad_request(msg),
        WaitlistError::Json(e) => bad_request(&format!("Invalid JSON body: {}", e)),
        WaitlistError::PayloadTooLarge(_) => message(StatusCode::PAYLOAD_TOO_LARGE, &err.to_string()),
        WaitlistError::Auth(msg) => message(StatusCode::UNAUTHORIZED, msg),
        WaitlistError::NotFound(msg) => not_found(msg),
        _ => {
            if err.is_storage() {
                error!(error = %err, "Store operation failed");
            } else {
                error!(error = %err, "Request failed");
            }
            message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}
