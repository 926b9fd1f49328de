//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are interfaces that the domain core depends on, but whose
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IUserDirectory`] - Subject lookup by token or secondary index
//! - [`IConsentLedger`] - Consent record persistence
//! - [`IAuditStore`] - Audit trail persistence
//! - [`IAuthEnforcer`] - Caller authentication for a subject

pub mod audit_store;
pub mod auth;
pub mod consent_ledger;
pub mod user_directory;

pub use audit_store::IAuditStore;
pub use auth::{AuthError, IAuthEnforcer};
pub use consent_ledger::IConsentLedger;
pub use user_directory::IUserDirectory;
