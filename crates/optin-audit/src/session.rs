//! Scoped audit session
//!
//! One `AuditSession` is opened at the top of every request handler. The
//! handler annotates it while it works and submits it when it is done.
//! `submit` consumes the session, so a second submission does not compile.
//! If the session is dropped without being submitted (a panic, an early
//! return through `?`, or the request future being cancelled), `Drop`
//! spawns the submission on the current tokio runtime instead. Either way
//! the request leaves exactly one audit entry behind.
//!
//! Both paths hand the entry to a task tracked by the logger, so a write
//! that has started finishes even if the submitting future is dropped
//! mid-await.

use optin_core::domain::{AuditEntry, AuditResult, SubjectToken};
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::warn;

use crate::{logger::AuditLogger, reason::ReasonCode};

/// Audit event of a single request, pending submission
pub struct AuditSession {
    /// `None` once the entry has been handed to the logger
    entry: Option<AuditEntry>,
    logger: AuditLogger,
}

impl AuditSession {
    pub(crate) fn new(entry: AuditEntry, logger: AuditLogger) -> Self {
        Self {
            entry: Some(entry),
            logger,
        }
    }

    /// Adds or replaces one outcome annotation
    pub fn annotate(&mut self, key: &str, value: impl Into<Value>) {
        if let Some(entry) = self.entry.as_mut() {
            entry.annotate(key, value);
        }
    }

    /// Records the resolved subject
    pub fn set_subject(&mut self, token: SubjectToken) {
        if let Some(entry) = self.entry.as_mut() {
            entry.set_subject_token(token);
        }
    }

    /// Marks the request as failed
    pub fn fail(&mut self, reason: ReasonCode, message: impl Into<String>) {
        if let Some(entry) = self.entry.as_mut() {
            entry.set_result(AuditResult::failed(reason.to_string(), message));
        }
    }

    /// Persists the entry. Store failures are logged, never returned.
    ///
    /// Cancel-safe: once called, the write completes even if this future
    /// is dropped before it resolves.
    pub async fn submit(mut self) {
        let Some(entry) = self.entry.take() else {
            return;
        };
        match Handle::try_current() {
            Ok(runtime) => {
                if let Err(e) = self.logger.spawn_save(entry, &runtime).await {
                    warn!(error = %e, "Audit write task failed");
                }
            }
            Err(_) => self.logger.save(&entry).await,
        }
    }
}

impl Drop for AuditSession {
    fn drop(&mut self) {
        let Some(entry) = self.entry.take() else {
            return;
        };

        match Handle::try_current() {
            Ok(runtime) => {
                self.logger.spawn_save(entry, &runtime);
            }
            Err(_) => warn!(
                action = %entry.action(),
                address = %entry.address(),
                "Audit session dropped outside a runtime, entry not saved"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use optin_core::domain::{AccessMode, AuditAction};
    use serde_json::json;

    use super::*;
    use crate::logger::tests::{MockStore, SlowStore};

    /// Lets spawned submissions run on the test runtime
    async fn settle(store: &MockStore, expected: usize) {
        for _ in 0..100 {
            if store.entries().len() >= expected {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_submit_persists_annotations() {
        let store = Arc::new(MockStore::new());
        let logger = AuditLogger::new(store.clone());
        let token = SubjectToken::new();

        let mut session = logger.begin(AuditAction::ConsentAccept, AccessMode::Token, "a");
        session.set_subject(token);
        session.annotate("brief", "newsletter");
        session.submit().await;

        let entries = store.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].subject_token(), Some(&token));
        assert_eq!(entries[0].details()["brief"], json!("newsletter"));
        assert!(entries[0].result().is_success());
    }

    #[tokio::test]
    async fn test_fail_records_reason() {
        let store = Arc::new(MockStore::new());
        let logger = AuditLogger::new(store.clone());

        let mut session = logger.begin(AuditAction::ConsentCancel, AccessMode::Token, "bad");
        session.fail(ReasonCode::BadUuid, "bad uuid");
        session.submit().await;

        let entries = store.entries();
        assert_eq!(
            entries[0].result(),
            &AuditResult::failed("bad_uuid", "bad uuid")
        );
    }

    #[tokio::test]
    async fn test_dropped_session_submits_once() {
        let store = Arc::new(MockStore::new());
        let logger = AuditLogger::new(store.clone());

        {
            let mut session = logger.begin(AuditAction::ConsentList, AccessMode::Token, "dropped");
            session.annotate("stage", "resolve");
        }
        settle(&store, 1).await;

        // Give any stray duplicate a chance to show up
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        let entries = store.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].address(), "dropped");
    }

    #[tokio::test]
    async fn test_panicking_handler_still_submits() {
        let store = Arc::new(MockStore::new());
        let logger = AuditLogger::new(store.clone());

        let handle = tokio::spawn(async move {
            let _session = logger.begin(AuditAction::ConsentAccept, AccessMode::Token, "boom");
            panic!("handler blew up");
        });
        assert!(handle.await.is_err());

        settle(&store, 1).await;
        assert_eq!(store.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_submitted_session_does_not_resubmit_on_drop() {
        let store = Arc::new(MockStore::new());
        let logger = AuditLogger::new(store.clone());

        logger
            .begin(AuditAction::ConsentAccept, AccessMode::Token, "once")
            .submit()
            .await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(store.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_submit_still_persists() {
        let store = Arc::new(SlowStore::new(Duration::from_millis(50)));
        let logger = AuditLogger::new(store.clone());

        let mut session = logger.begin(AuditAction::ConsentAccept, AccessMode::Token, "gone");
        session.annotate("brief", "newsletter");
        let submitted =
            tokio::time::timeout(Duration::from_millis(10), session.submit()).await;
        assert!(submitted.is_err(), "submit should still be pending");

        logger.drain().await;
        let entries = store.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].details()["brief"], json!("newsletter"));
    }

    #[tokio::test]
    async fn test_dropped_session_is_drained() {
        let store = Arc::new(SlowStore::new(Duration::from_millis(20)));
        let logger = AuditLogger::new(store.clone());

        drop(logger.begin(AuditAction::ConsentCancel, AccessMode::Token, "late"));
        logger.drain().await;
        assert_eq!(store.entries().len(), 1);
    }
}
