//! Audit store port (driven/secondary port)

use chrono::{DateTime, Utc};

use crate::domain::AuditEntry;

/// Port trait for audit trail persistence
#[async_trait::async_trait]
pub trait IAuditStore: Send + Sync {
    /// Saves an audit entry
    async fn save_audit(&self, entry: &AuditEntry) -> anyhow::Result<()>;

    /// Retrieves the most recent audit entries for an address
    ///
    /// Returns entries ordered by timestamp (newest first).
    async fn get_audit_for_address(
        &self,
        address: &str,
        limit: u32,
    ) -> anyhow::Result<Vec<AuditEntry>>;

    /// Retrieves audit entries since a given timestamp, up to a limit
    ///
    /// Returns entries ordered by timestamp (newest first).
    async fn get_audit_since(
        &self,
        since: DateTime<Utc>,
        limit: u32,
    ) -> anyhow::Result<Vec<AuditEntry>>;
}
