//! Optin Audit - Audit trail recording
//!
//! Provides:
//! - `AuditLogger`: Persists audit entries through `IAuditStore`, never failing
//! - `AuditSession`: Per-request scoped audit event, submitted exactly once
//! - `ReasonCode`: Structured reason codes for failed requests

pub mod logger;
pub mod reason;
pub mod session;

pub use logger::AuditLogger;
pub use reason::ReasonCode;
pub use session::AuditSession;
