//! Integration test: AuditSession → AuditLogger → SQLite → query back
//!
//! Uses a real in-memory SQLite database to verify the full flow.

use std::sync::Arc;

use chrono::{Duration, Utc};
use optin_audit::{AuditLogger, ReasonCode};
use optin_cache::{pool::DatabasePool, SqliteRecordStore};
use optin_core::{
    domain::{AccessMode, AuditAction, SubjectToken},
    ports::IAuditStore,
};

async fn make_store() -> Arc<SqliteRecordStore> {
    let pool = DatabasePool::in_memory()
        .await
        .expect("Failed to create in-memory database");
    Arc::new(SqliteRecordStore::new(pool.pool().clone()))
}

#[tokio::test]
async fn test_sessions_persist_to_sqlite() {
    let store = make_store().await;
    let logger = AuditLogger::new(Arc::clone(&store) as Arc<dyn IAuditStore>);
    let token = SubjectToken::new();
    let address = token.to_string();

    let mut accept = logger.begin(AuditAction::ConsentAccept, AccessMode::Token, &address);
    accept.set_subject(token);
    accept.annotate("brief", "newsletter");
    accept.submit().await;

    let mut cancel = logger.begin(AuditAction::ConsentCancel, AccessMode::Token, &address);
    cancel.fail(ReasonCode::MissingBrief, "consent brief code is missing");
    cancel.submit().await;

    logger
        .begin(AuditAction::ConsentList, AccessMode::Token, "someone-else")
        .submit()
        .await;

    let entries = store.get_audit_for_address(&address, 10).await.unwrap();
    assert_eq!(entries.len(), 2, "Expected 2 audit entries for the address");

    let actions: Vec<String> = entries.iter().map(|e| e.action().to_string()).collect();
    assert!(actions.contains(&"consent_accept".to_string()));
    assert!(actions.contains(&"consent_cancel".to_string()));

    let accepted = entries
        .iter()
        .find(|e| *e.action() == AuditAction::ConsentAccept)
        .unwrap();
    assert_eq!(accepted.subject_token(), Some(&token));
    assert_eq!(accepted.details()["brief"], "newsletter");
    assert!(accepted.id().is_some());

    let cancelled = entries
        .iter()
        .find(|e| *e.action() == AuditAction::ConsentCancel)
        .unwrap();
    assert!(cancelled.result().is_failed());

    let since = Utc::now() - Duration::minutes(5);
    let all = store.get_audit_since(since, 50).await.unwrap();
    assert_eq!(all.len(), 3);
}
