//! User directory port (driven/secondary port)
//!
//! Uses `anyhow::Result` because lookup failures are adapter-specific
//! (SQLite, remote directory, ...) and callers treat them as "not found".

use crate::domain::{IndexName, SubjectToken, UserRecord};

/// Port trait for looking up and registering subjects
#[async_trait::async_trait]
pub trait IUserDirectory: Send + Sync {
    /// Retrieves a user by its canonical token
    async fn lookup_user(&self, token: &SubjectToken) -> anyhow::Result<Option<UserRecord>>;

    /// Retrieves a user by a secondary index value
    ///
    /// Implementations normalize `value` with [`IndexName::normalize`]
    /// before comparing.
    async fn lookup_user_by_index(
        &self,
        index: IndexName,
        value: &str,
    ) -> anyhow::Result<Option<UserRecord>>;

    /// Saves a user (insert or update by token)
    async fn save_user(&self, user: &UserRecord) -> anyhow::Result<()>;
}
