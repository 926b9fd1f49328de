//! Identity resolution use case
//!
//! Turns the `(mode, address)` pair of a request into a canonical subject
//! token. A miss is a normal outcome, not an error: the only hard failure is
//! a malformed address in `token` mode.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{AccessMode, ConsentError, SubjectToken};
use crate::ports::IUserDirectory;

/// Outcome of a successful resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Resolution {
    token: Option<SubjectToken>,
}

impl Resolution {
    pub fn found(token: SubjectToken) -> Self {
        Self { token: Some(token) }
    }

    pub fn not_found() -> Self {
        Self { token: None }
    }

    pub fn token(&self) -> Option<&SubjectToken> {
        self.token.as_ref()
    }

    pub fn is_found(&self) -> bool {
        self.token.is_some()
    }
}

/// Parses an address that must itself be a subject token.
///
/// Cancel and List only accept direct-token addressing, whatever mode name
/// the route carried.
///
/// # Errors
///
/// Returns `ConsentError::InvalidIdentifier` if the address is not a
/// hyphenated UUID.
pub fn require_token(address: &str) -> Result<SubjectToken, ConsentError> {
    Ok(address.parse::<SubjectToken>()?)
}

/// Use case for resolving request addresses to subjects
pub struct IdentityResolver {
    users: Arc<dyn IUserDirectory>,
}

impl IdentityResolver {
    pub fn new(users: Arc<dyn IUserDirectory>) -> Self {
        Self { users }
    }

    /// Resolves `address` according to `mode`
    ///
    /// - `token`: the address must be a UUID; it resolves to itself when a
    ///   user with that token exists.
    /// - index modes: the address is normalized and looked up in the index.
    /// - unsupported modes never match.
    ///
    /// Directory errors are logged and reported as "not found".
    ///
    /// # Errors
    ///
    /// Returns `ConsentError::InvalidIdentifier` only for a malformed address
    /// in `token` mode.
    pub async fn resolve(
        &self,
        mode: &AccessMode,
        address: &str,
    ) -> Result<Resolution, ConsentError> {
        let resolution = match mode {
            AccessMode::Token => {
                let token = require_token(address)?;
                match self.users.lookup_user(&token).await {
                    Ok(Some(_)) => Resolution::found(token),
                    Ok(None) => Resolution::not_found(),
                    Err(e) => {
                        warn!(error = %e, "User lookup by token failed");
                        Resolution::not_found()
                    }
                }
            }
            AccessMode::Index(index) => {
                match self.users.lookup_user_by_index(*index, address).await {
                    Ok(Some(user)) => Resolution::found(*user.token()),
                    Ok(None) => Resolution::not_found(),
                    Err(e) => {
                        warn!(error = %e, index = %index, "User lookup by index failed");
                        Resolution::not_found()
                    }
                }
            }
            AccessMode::Unsupported(name) => {
                debug!(mode = %name, "Unsupported access mode, treating as not found");
                Resolution::not_found()
            }
        };

        debug!(mode = %mode, found = resolution.is_found(), "Resolved identity");
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::{IndexName, UserRecord};

    /// In-memory directory that records lookups
    struct MockDirectory {
        users: Vec<UserRecord>,
        fail: bool,
        lookups: Mutex<u32>,
    }

    impl MockDirectory {
        fn with_users(users: Vec<UserRecord>) -> Self {
            Self {
                users,
                fail: false,
                lookups: Mutex::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                users: vec![],
                fail: true,
                lookups: Mutex::new(0),
            }
        }

        fn lookups(&self) -> u32 {
            *self.lookups.lock().unwrap()
        }
    }

    #[async_trait]
    impl IUserDirectory for MockDirectory {
        async fn lookup_user(&self, token: &SubjectToken) -> anyhow::Result<Option<UserRecord>> {
            *self.lookups.lock().unwrap() += 1;
            if self.fail {
                anyhow::bail!("directory offline");
            }
            Ok(self.users.iter().find(|u| u.token() == token).cloned())
        }

        async fn lookup_user_by_index(
            &self,
            index: IndexName,
            value: &str,
        ) -> anyhow::Result<Option<UserRecord>> {
            *self.lookups.lock().unwrap() += 1;
            if self.fail {
                anyhow::bail!("directory offline");
            }
            let wanted = index.normalize(value);
            Ok(self
                .users
                .iter()
                .find(|u| u.index_value(index) == Some(wanted.as_str()))
                .cloned())
        }

        async fn save_user(&self, _user: &UserRecord) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn resolver(dir: MockDirectory) -> (IdentityResolver, Arc<MockDirectory>) {
        let dir = Arc::new(dir);
        (IdentityResolver::new(dir.clone()), dir)
    }

    #[tokio::test]
    async fn test_token_mode_existing_user() {
        let user = UserRecord::new();
        let token = *user.token();
        let (resolver, _) = resolver(MockDirectory::with_users(vec![user]));

        let res = resolver
            .resolve(&AccessMode::Token, &token.to_string())
            .await
            .unwrap();
        assert_eq!(res.token(), Some(&token));
    }

    #[tokio::test]
    async fn test_token_mode_unknown_user() {
        let (resolver, _) = resolver(MockDirectory::with_users(vec![]));
        let res = resolver
            .resolve(&AccessMode::Token, "11111111-1111-1111-1111-111111111111")
            .await
            .unwrap();
        assert!(!res.is_found());
    }

    #[tokio::test]
    async fn test_token_mode_invalid_uuid_skips_lookup() {
        let (resolver, dir) = resolver(MockDirectory::with_users(vec![]));
        let err = resolver
            .resolve(&AccessMode::Token, "definitely-not-a-uuid")
            .await
            .unwrap_err();
        assert!(matches!(err, ConsentError::InvalidIdentifier(_)));
        assert_eq!(dir.lookups(), 0);
    }

    #[tokio::test]
    async fn test_index_mode_normalizes() {
        let user = UserRecord::new().with_index(IndexName::Email, "alice@example.com");
        let token = *user.token();
        let (resolver, _) = resolver(MockDirectory::with_users(vec![user]));

        let res = resolver
            .resolve(&AccessMode::parse("email"), "  ALICE@example.com")
            .await
            .unwrap();
        assert_eq!(res.token(), Some(&token));
    }

    #[tokio::test]
    async fn test_index_mode_miss() {
        let (resolver, _) = resolver(MockDirectory::with_users(vec![]));
        let res = resolver
            .resolve(&AccessMode::parse("phone"), "+15550100")
            .await
            .unwrap();
        assert_eq!(res, Resolution::not_found());
    }

    #[tokio::test]
    async fn test_unsupported_mode_is_not_found() {
        let (resolver, dir) = resolver(MockDirectory::with_users(vec![UserRecord::new()]));
        let res = resolver
            .resolve(&AccessMode::parse("fax"), "12345")
            .await
            .unwrap();
        assert!(!res.is_found());
        assert_eq!(dir.lookups(), 0);
    }

    #[tokio::test]
    async fn test_directory_error_is_not_found() {
        let (resolver, _) = resolver(MockDirectory::failing());
        let res = resolver
            .resolve(&AccessMode::parse("email"), "a@b.c")
            .await
            .unwrap();
        assert!(!res.is_found());
    }

    #[test]
    fn test_require_token() {
        assert!(require_token("11111111-1111-1111-1111-111111111111").is_ok());
        assert!(matches!(
            require_token("user@example.com"),
            Err(ConsentError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            require_token("{11111111-1111-1111-1111-111111111111}"),
            Err(ConsentError::InvalidIdentifier(_))
        ));
    }
}
