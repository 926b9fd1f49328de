//! JSON response construction
//!
//! Responses are built without the fallible `Response::builder()` so no
//! handler path can panic while shaping its answer.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use optin_audit::ReasonCode;
use optin_core::domain::ConsentError;
use serde_json::{json, Value};

/// Response type produced by every handler
pub type ApiResponse = Response<Full<Bytes>>;

/// Content type of every response
pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";

/// Error message for a malformed subject token
pub const MSG_BAD_UUID: &str = "bad uuid";
/// Error message for an absent or empty brief
pub const MSG_MISSING_BRIEF: &str = "consent brief code is missing";
/// Error message for storage and decoding failures
pub const MSG_INTERNAL: &str = "internal error";

/// Builds a response with a JSON body
pub fn json_response(status: StatusCode, body: &Value) -> ApiResponse {
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
    response
}

/// `200 {"status":"ok"}`
pub fn ok() -> ApiResponse {
    json_response(StatusCode::OK, &json!({ "status": "ok" }))
}

/// `{"status":"error","message":...}` with the given status code
pub fn error_response(status: StatusCode, message: &str) -> ApiResponse {
    json_response(status, &json!({ "status": "error", "message": message }))
}

/// Allows browsers on any origin to read the response
pub fn with_cors(mut response: ApiResponse) -> ApiResponse {
    response
        .headers_mut()
        .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

/// How a failed request is reported to the client and the audit trail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub reason: ReasonCode,
    pub status: StatusCode,
    pub message: String,
}

impl Rejection {
    pub fn to_response(&self) -> ApiResponse {
        error_response(self.status, &self.message)
    }
}

impl From<&ConsentError> for Rejection {
    fn from(err: &ConsentError) -> Self {
        let (reason, status, message) = match err {
            ConsentError::InvalidIdentifier(_) => (
                ReasonCode::BadUuid,
                StatusCode::METHOD_NOT_ALLOWED,
                MSG_BAD_UUID.to_string(),
            ),
            ConsentError::Validation(msg) => (
                ReasonCode::MissingBrief,
                StatusCode::METHOD_NOT_ALLOWED,
                msg.clone(),
            ),
            ConsentError::Storage(_) => (
                ReasonCode::StorageFailure,
                StatusCode::METHOD_NOT_ALLOWED,
                MSG_INTERNAL.to_string(),
            ),
            ConsentError::Body(_) => (
                ReasonCode::BodyDecodeFailed,
                StatusCode::METHOD_NOT_ALLOWED,
                MSG_INTERNAL.to_string(),
            ),
            ConsentError::Auth(msg) => {
                (ReasonCode::Unauthorized, StatusCode::UNAUTHORIZED, msg.clone())
            }
        };
        Self {
            reason,
            status,
            message,
        }
    }
}
