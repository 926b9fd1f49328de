//! Reason codes for audit log entries
//!
//! Structured codes for categorizing why a consent request failed. Stored as
//! the `code` of `AuditResult::Failed`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Structured reason codes for failed requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// Address is not a valid subject token
    BadUuid,
    /// No subject matched the address
    SubjectNotFound,
    /// Request body could not be decoded
    BodyDecodeFailed,
    /// The consent brief code was empty or absent
    MissingBrief,
    /// Caller failed authentication
    Unauthorized,
    /// The record store rejected the operation
    StorageFailure,
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReasonCode::BadUuid => "bad_uuid",
            ReasonCode::SubjectNotFound => "subject_not_found",
            ReasonCode::BodyDecodeFailed => "body_decode_failed",
            ReasonCode::MissingBrief => "missing_brief",
            ReasonCode::Unauthorized => "unauthorized",
            ReasonCode::StorageFailure => "storage_failure",
        };
        write!(f, "{s}")
    }
}
