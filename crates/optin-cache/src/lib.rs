//! Optin Cache - Record store persistence
//!
//! SQLite-based store for:
//! - User directory (token + email/phone/login indexes)
//! - Consent ledger
//! - Audit trail
//!
//! ## Architecture
//!
//! This crate implements the `IUserDirectory`, `IConsentLedger` and
//! `IAuditStore` ports from `optin-core` using SQLite as the storage
//! backend. It is a driven (secondary) adapter in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteRecordStore`] - Implementation of all record store ports
//! - [`CacheError`] - Error types for cache operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use optin_cache::{DatabasePool, SqliteRecordStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/var/lib/optin/optin.db")).await?;
//! let store = SqliteRecordStore::new(pool.pool().clone());
//! // Use store as IConsentLedger / IUserDirectory / IAuditStore...
//! # Ok(())
//! # }
//! ```

pub mod pool;
pub mod repository;

pub use pool::DatabasePool;
pub use repository::SqliteRecordStore;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Serialization or deserialization of domain types failed
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}
