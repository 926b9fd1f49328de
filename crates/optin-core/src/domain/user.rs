//! User directory entities
//!
//! A `UserRecord` is the subject side of the ledger: the canonical token plus
//! the secondary index values (email, phone, login) that can be used to find
//! it. Index values are normalized on write so lookups can normalize the same
//! way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{IndexName, SubjectToken};

/// A user known to the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    token: SubjectToken,
    email: Option<String>,
    phone: Option<String>,
    login: Option<String>,
    /// Per-user secret accepted by the auth enforcer for this subject
    access_token: Option<String>,
    created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Creates a user with a fresh random token and no index values
    pub fn new() -> Self {
        Self::with_token(SubjectToken::new(), Utc::now())
    }

    /// Creates a user with a known token (used when loading from storage)
    pub fn with_token(token: SubjectToken, created_at: DateTime<Utc>) -> Self {
        Self {
            token,
            email: None,
            phone: None,
            login: None,
            access_token: None,
            created_at,
        }
    }

    pub fn token(&self) -> &SubjectToken {
        &self.token
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn login(&self) -> Option<&str> {
        self.login.as_deref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the normalized value stored for the given index
    pub fn index_value(&self, index: IndexName) -> Option<&str> {
        match index {
            IndexName::Email => self.email(),
            IndexName::Phone => self.phone(),
            IndexName::Login => self.login(),
        }
    }

    /// Sets an index value, normalizing it. Empty values clear the index.
    pub fn with_index(mut self, index: IndexName, value: &str) -> Self {
        let normalized = index.normalize(value);
        let slot = match index {
            IndexName::Email => &mut self.email,
            IndexName::Phone => &mut self.phone,
            IndexName::Login => &mut self.login,
        };
        *slot = if normalized.is_empty() {
            None
        } else {
            Some(normalized)
        };
        self
    }

    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }
}

impl Default for UserRecord {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_has_no_indexes() {
        let user = UserRecord::new();
        assert!(user.email().is_none());
        assert!(user.phone().is_none());
        assert!(user.login().is_none());
        assert!(user.access_token().is_none());
    }

    #[test]
    fn test_with_index_normalizes() {
        let user = UserRecord::new()
            .with_index(IndexName::Email, " Bob@Example.com")
            .with_index(IndexName::Phone, "+44 20 7946 0000");

        assert_eq!(user.index_value(IndexName::Email), Some("bob@example.com"));
        assert_eq!(user.index_value(IndexName::Phone), Some("+442079460000"));
        assert_eq!(user.index_value(IndexName::Login), None);
    }

    #[test]
    fn test_with_index_empty_clears() {
        let user = UserRecord::new()
            .with_index(IndexName::Login, "carol")
            .with_index(IndexName::Login, "   ");
        assert!(user.login().is_none());
    }
}
