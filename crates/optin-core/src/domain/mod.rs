//! Domain entities and business logic
//!
//! This module contains the core domain types for Optin:
//! - Newtypes for subject tokens, access modes and consent briefs
//! - Consent records and their status
//! - User directory records
//! - Audit entries for tracking requests
//! - Domain-specific error types

pub mod audit;
pub mod consent;
pub mod errors;
pub mod newtypes;
pub mod user;

// Re-export commonly used types
pub use audit::{AuditAction, AuditEntry, AuditResult};
pub use consent::{ConsentRecord, ConsentStatus};
pub use errors::{ConsentError, DomainError};
pub use newtypes::*;
pub use user::UserRecord;
