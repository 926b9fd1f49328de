//! Domain error types
//!
//! `DomainError` covers validation of newtypes at construction time.
//! `ConsentError` is the request-level taxonomy the HTTP handlers map to
//! status codes.

use thiserror::Error;

/// Errors that can occur while constructing domain values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Address is not a syntactically valid subject token (UUID)
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Consent brief code is empty
    #[error("Invalid brief: {0}")]
    InvalidBrief(String),

    /// Unknown secondary index name
    #[error("Unknown index: {0}")]
    UnknownIndex(String),
}

/// Failures a consent request can end with
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsentError {
    /// Address fails format validation for modes requiring a direct token
    #[error("bad uuid: {0}")]
    InvalidIdentifier(String),

    /// A required field is missing or empty
    #[error("{0}")]
    Validation(String),

    /// The underlying store is unavailable
    #[error("storage error: {0}")]
    Storage(String),

    /// The caller could not be authenticated for this subject
    #[error("access denied: {0}")]
    Auth(String),

    /// The request body could not be decoded
    #[error("bad request body: {0}")]
    Body(String),
}

impl From<DomainError> for ConsentError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::InvalidIdentifier(msg) => ConsentError::InvalidIdentifier(msg),
            other => ConsentError::Validation(other.to_string()),
        }
    }
}
