//! Request context
//!
//! Everything a handler needs, built once at startup and shared read-only
//! between connections.

use std::sync::Arc;

use optin_audit::AuditLogger;
use optin_core::config::Config;
use optin_core::ports::{IAuditStore, IAuthEnforcer, IConsentLedger, IUserDirectory};
use optin_core::usecases::IdentityResolver;

use crate::auth::TokenAuthEnforcer;

/// Ports and settings shared by all request handlers
pub struct ApiContext {
    pub(crate) resolver: IdentityResolver,
    pub(crate) ledger: Arc<dyn IConsentLedger>,
    pub(crate) audit: AuditLogger,
    pub(crate) auth: Arc<dyn IAuthEnforcer>,
    pub(crate) auth_header: String,
    pub(crate) silent_accept_failures: bool,
    pub(crate) max_body_bytes: usize,
}

impl ApiContext {
    /// Wires the context from individual ports
    ///
    /// Authentication defaults to a `TokenAuthEnforcer` using the configured
    /// root token and the given user directory.
    pub fn new(
        config: &Config,
        users: Arc<dyn IUserDirectory>,
        ledger: Arc<dyn IConsentLedger>,
        audit_store: Arc<dyn IAuditStore>,
    ) -> Self {
        let auth = Arc::new(TokenAuthEnforcer::new(
            config.auth.root_token.clone(),
            Arc::clone(&users),
        ));
        Self {
            resolver: IdentityResolver::new(users),
            ledger,
            audit: AuditLogger::new(audit_store),
            auth,
            auth_header: config.auth.header.clone(),
            silent_accept_failures: config.consent.silent_accept_failures,
            max_body_bytes: config.server.max_body_bytes,
        }
    }

    /// Wires the context from a single store implementing every record port
    pub fn from_store<S>(config: &Config, store: Arc<S>) -> Self
    where
        S: IUserDirectory + IConsentLedger + IAuditStore + 'static,
    {
        Self::new(
            config,
            Arc::clone(&store) as Arc<dyn IUserDirectory>,
            Arc::clone(&store) as Arc<dyn IConsentLedger>,
            store as Arc<dyn IAuditStore>,
        )
    }

    /// Replaces the authentication enforcer
    pub fn with_auth(mut self, auth: Arc<dyn IAuthEnforcer>) -> Self {
        self.auth = auth;
        self
    }
}
