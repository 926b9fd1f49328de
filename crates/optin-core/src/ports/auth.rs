//! Authentication port (driving side guard)
//!
//! The HTTP adapter extracts the presented credential and asks the enforcer
//! whether it may act on the given subject. Turning a rejection into a
//! response is the adapter's job.

use thiserror::Error;

use crate::domain::SubjectToken;

/// Reasons a caller is rejected
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No credential was presented
    #[error("missing access token")]
    MissingToken,

    /// The credential does not grant access to this subject
    #[error("access token does not grant access to this subject")]
    InvalidToken,

    /// The credential could not be checked
    #[error("failed to verify access token: {0}")]
    Lookup(String),
}

/// Port trait for request authentication
#[async_trait::async_trait]
pub trait IAuthEnforcer: Send + Sync {
    /// Checks that `presented` grants access to `subject`
    async fn authorize(
        &self,
        presented: Option<&str>,
        subject: &SubjectToken,
    ) -> Result<(), AuthError>;
}
