//! AuditLogger - audit persistence service
//!
//! Wraps `IAuditStore::save_audit()`. Errors in audit persistence are
//! logged via `tracing::warn!` but never propagated, so an unreachable audit
//! store can never change the outcome of a request.
//!
//! Session writes run on tasks owned by the logger's `TaskTracker`. A write
//! keeps going when the request that started it is cancelled, and
//! [`AuditLogger::drain`] waits for all of them at shutdown.

use std::sync::Arc;

use optin_core::{
    domain::{AccessMode, AuditAction, AuditEntry},
    ports::IAuditStore,
};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use crate::session::AuditSession;

/// Audit logger backed by an audit store
#[derive(Clone)]
pub struct AuditLogger {
    store: Arc<dyn IAuditStore>,
    writes: TaskTracker,
}

impl AuditLogger {
    /// Creates a new `AuditLogger` backed by the given store.
    pub fn new(store: Arc<dyn IAuditStore>) -> Self {
        Self {
            store,
            writes: TaskTracker::new(),
        }
    }

    /// Opens the audit session of one request.
    ///
    /// Never fails: the entry only lives in memory until the session is
    /// submitted or dropped.
    pub fn begin(
        &self,
        action: AuditAction,
        mode: AccessMode,
        address: impl Into<String>,
    ) -> AuditSession {
        AuditSession::new(AuditEntry::new(action, mode, address), self.clone())
    }

    /// Persist an audit entry, swallowing errors with a tracing warning.
    pub async fn save(&self, entry: &AuditEntry) {
        match self.store.save_audit(entry).await {
            Ok(()) => tracing::trace!(action = %entry.action(), "Audit entry saved"),
            Err(e) => tracing::warn!(
                error = %e,
                action = %entry.action(),
                address = %entry.address(),
                "Failed to save audit entry"
            ),
        }
    }

    /// Saves the entry on a tracked task of the given runtime.
    pub(crate) fn spawn_save(&self, entry: AuditEntry, runtime: &Handle) -> JoinHandle<()> {
        let logger = self.clone();
        self.writes
            .spawn_on(async move { logger.save(&entry).await }, runtime)
    }

    /// Waits until every audit write started so far has finished.
    ///
    /// Call before closing the store. Writes spawned afterwards are still
    /// tracked and awaited by a later `drain`.
    pub async fn drain(&self) {
        self.writes.close();
        self.writes.wait().await;
        self.writes.reopen();
    }
}
