//! Consent ledger port (driven/secondary port)
//!
//! ## Contract
//!
//! - `create_or_update` upserts by `(subject_key, brief)` atomically; two
//!   concurrent writes to the same pair leave exactly one of them.
//! - `cancel` flips the status of the matching record to `cancel`.
//!   Cancelling a pair with no record is a successful no-op.
//! - `list` returns every record of the subject, cancelled ones included,
//!   in a stable order.

use crate::domain::{Brief, ConsentRecord, SubjectToken};

/// Port trait for consent record persistence
#[async_trait::async_trait]
pub trait IConsentLedger: Send + Sync {
    /// Creates a consent record or overwrites the existing one for the same pair
    async fn create_or_update(&self, record: &ConsentRecord) -> anyhow::Result<()>;

    /// Marks the record for `(token, brief)` as cancelled
    async fn cancel(&self, token: &SubjectToken, brief: &Brief) -> anyhow::Result<()>;

    /// Lists all consent records of a subject
    async fn list(&self, token: &SubjectToken) -> anyhow::Result<Vec<ConsentRecord>>;
}
