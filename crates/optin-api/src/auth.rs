//! Header token authentication
//!
//! A caller may act on a subject when the presented token equals either the
//! configured root token or the subject's own access token. Tokens are
//! compared in constant time.

use std::sync::Arc;

use async_trait::async_trait;
use optin_core::domain::SubjectToken;
use optin_core::ports::{AuthError, IAuthEnforcer, IUserDirectory};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

/// `IAuthEnforcer` backed by the user directory
pub struct TokenAuthEnforcer {
    root_token: Option<String>,
    users: Arc<dyn IUserDirectory>,
}

impl TokenAuthEnforcer {
    /// Creates an enforcer. An empty root token disables root access.
    pub fn new(root_token: Option<String>, users: Arc<dyn IUserDirectory>) -> Self {
        Self {
            root_token: root_token.filter(|t| !t.is_empty()),
            users,
        }
    }
}

#[async_trait]
impl IAuthEnforcer for TokenAuthEnforcer {
    async fn authorize(
        &self,
        presented: Option<&str>,
        subject: &SubjectToken,
    ) -> Result<(), AuthError> {
        let presented = match presented.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => return Err(AuthError::MissingToken),
        };

        if matches!(self.root_token.as_deref(), Some(root) if tokens_match(presented, root)) {
            debug!(subject = %subject, "Authorized with root token");
            return Ok(());
        }

        match self.users.lookup_user(subject).await {
            Ok(Some(user))
                if user
                    .access_token()
                    .is_some_and(|expected| tokens_match(presented, expected)) =>
            {
                debug!(subject = %subject, "Authorized with user access token");
                Ok(())
            }
            Ok(_) => Err(AuthError::InvalidToken),
            Err(e) => {
                warn!(error = %e, subject = %subject, "Access token lookup failed");
                Err(AuthError::Lookup(e.to_string()))
            }
        }
    }
}

fn tokens_match(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use optin_core::domain::{IndexName, UserRecord};

    struct OneUser(Option<UserRecord>);

    #[async_trait]
    impl IUserDirectory for OneUser {
        async fn lookup_user(&self, token: &SubjectToken) -> anyhow::Result<Option<UserRecord>> {
            Ok(self.0.clone().filter(|u| u.token() == token))
        }
        async fn lookup_user_by_index(
            &self,
            _: IndexName,
            _: &str,
        ) -> anyhow::Result<Option<UserRecord>> {
            Ok(None)
        }
        async fn save_user(&self, _: &UserRecord) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct BrokenDirectory;

    #[async_trait]
    impl IUserDirectory for BrokenDirectory {
        async fn lookup_user(&self, _: &SubjectToken) -> anyhow::Result<Option<UserRecord>> {
            anyhow::bail!("database is locked")
        }
        async fn lookup_user_by_index(
            &self,
            _: IndexName,
            _: &str,
        ) -> anyhow::Result<Option<UserRecord>> {
            anyhow::bail!("database is locked")
        }
        async fn save_user(&self, _: &UserRecord) -> anyhow::Result<()> {
            anyhow::bail!("database is locked")
        }
    }

    const ROOT: &str = "root-token-0123456789";

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match(ROOT, ROOT));
        assert!(!tokens_match("root-token-0123456788", ROOT));
        assert!(!tokens_match("root-token", ROOT));
        assert!(!tokens_match("", ROOT));
    }

    fn enforcer_with(user: Option<UserRecord>) -> TokenAuthEnforcer {
        TokenAuthEnforcer::new(Some(ROOT.to_string()), Arc::new(OneUser(user)))
    }

    #[tokio::test]
    async fn test_missing_token() {
        let enforcer = enforcer_with(None);
        let subject = SubjectToken::new();
        assert_eq!(
            enforcer.authorize(None, &subject).await,
            Err(AuthError::MissingToken)
        );
        assert_eq!(
            enforcer.authorize(Some("  "), &subject).await,
            Err(AuthError::MissingToken)
        );
    }

    #[tokio::test]
    async fn test_root_token_grants_any_subject() {
        let enforcer = enforcer_with(None);
        assert!(enforcer
            .authorize(Some(ROOT), &SubjectToken::new())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_user_access_token() {
        let user = UserRecord::new().with_access_token("user-secret");
        let subject = *user.token();
        let enforcer = enforcer_with(Some(user));

        assert!(enforcer.authorize(Some("user-secret"), &subject).await.is_ok());
        assert_eq!(
            enforcer.authorize(Some("other"), &subject).await,
            Err(AuthError::InvalidToken)
        );
        // The user's token does not grant access to someone else
        assert_eq!(
            enforcer
                .authorize(Some("user-secret"), &SubjectToken::new())
                .await,
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn test_empty_root_token_disabled() {
        let enforcer = TokenAuthEnforcer::new(Some(String::new()), Arc::new(OneUser(None)));
        assert_eq!(
            enforcer.authorize(Some(""), &SubjectToken::new()).await,
            Err(AuthError::MissingToken)
        );
    }

    #[tokio::test]
    async fn test_lookup_failure() {
        let enforcer = TokenAuthEnforcer::new(None, Arc::new(BrokenDirectory));
        let result = enforcer.authorize(Some("x"), &SubjectToken::new()).await;
        assert!(matches!(result, Err(AuthError::Lookup(_))));
    }
}
