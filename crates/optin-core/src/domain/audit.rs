//! Audit entry domain entities
//!
//! Every consent request produces exactly one `AuditEntry`. The entry is
//! created when the request arrives, annotated while it is handled and
//! persisted once when handling ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::newtypes::{AccessMode, AuditId, SubjectToken};

/// Actions that can be recorded in the audit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A consent decision was recorded
    ConsentAccept,
    /// A consent decision was cancelled
    ConsentCancel,
    /// The consent records of a subject were listed
    ConsentList,
}

impl AuditAction {
    /// Human-readable label used to build the entry description
    pub fn label(&self) -> &'static str {
        match self {
            AuditAction::ConsentAccept => "consent accept",
            AuditAction::ConsentCancel => "consent cancel",
            AuditAction::ConsentList => "consent list of events",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuditAction::ConsentAccept => "consent_accept",
            AuditAction::ConsentCancel => "consent_cancel",
            AuditAction::ConsentList => "consent_list",
        };
        write!(f, "{}", s)
    }
}

/// Result of an audited action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditResult {
    /// The action completed successfully
    Success,
    /// The action failed with an error code and message
    Failed {
        /// Error code for categorization
        code: String,
        /// Human-readable error message
        message: String,
    },
}

impl AuditResult {
    /// Creates a successful result
    pub fn success() -> Self {
        AuditResult::Success
    }

    /// Creates a failed result with the given code and message
    pub fn failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        AuditResult::Failed {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Returns true if the result is a success
    pub fn is_success(&self) -> bool {
        matches!(self, AuditResult::Success)
    }

    /// Returns true if the result is a failure
    pub fn is_failed(&self) -> bool {
        matches!(self, AuditResult::Failed { .. })
    }
}

/// An audit log entry recording one consent request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique identifier for this audit entry (assigned by database)
    id: Option<AuditId>,
    /// When the request arrived
    timestamp: DateTime<Utc>,
    /// The type of action that was requested
    action: AuditAction,
    /// Human-readable label, e.g. "consent accept by email"
    description: String,
    /// How the subject was addressed
    mode: AccessMode,
    /// Raw address presented in the request
    address: String,
    /// Subject token once it has been resolved
    subject_token: Option<SubjectToken>,
    /// Outcome of the request
    result: AuditResult,
    /// Key/value annotations accumulated while handling the request
    details: Map<String, Value>,
}

impl AuditEntry {
    /// Creates a new audit entry for a request
    ///
    /// The result starts as `Success`; handlers downgrade it when they hit a
    /// failure. The `id` is assigned by the database on persist.
    ///
    /// # Example
    ///
    /// ```
    /// use optin_core::domain::audit::{AuditAction, AuditEntry};
    /// use optin_core::domain::AccessMode;
    ///
    /// let entry = AuditEntry::new(AuditAction::ConsentAccept, AccessMode::parse("email"), "a@b.c");
    /// assert_eq!(entry.description(), "consent accept by email");
    /// assert!(entry.result().is_success());
    /// assert!(entry.id().is_none());
    /// ```
    pub fn new(action: AuditAction, mode: AccessMode, address: impl Into<String>) -> Self {
        let description = format!("{} by {}", action.label(), mode);
        Self {
            id: None,
            timestamp: Utc::now(),
            action,
            description,
            mode,
            address: address.into(),
            subject_token: None,
            result: AuditResult::success(),
            details: Map::new(),
        }
    }

    /// Returns the audit entry ID (None if not yet persisted)
    pub fn id(&self) -> Option<AuditId> {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn action(&self) -> &AuditAction {
        &self.action
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn mode(&self) -> &AccessMode {
        &self.mode
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn subject_token(&self) -> Option<&SubjectToken> {
        self.subject_token.as_ref()
    }

    pub fn result(&self) -> &AuditResult {
        &self.result
    }

    pub fn details(&self) -> &Map<String, Value> {
        &self.details
    }

    /// Records the resolved subject
    pub fn set_subject_token(&mut self, token: SubjectToken) {
        self.subject_token = Some(token);
    }

    /// Replaces the outcome of the request
    pub fn set_result(&mut self, result: AuditResult) {
        self.result = result;
    }

    /// Adds or replaces one annotation
    pub fn annotate(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.details.insert(key.into(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_audit_action_serialization() {
        let action = AuditAction::ConsentCancel;
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, "\"consent_cancel\"");

        let deserialized: AuditAction = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, action);
    }

    #[test]
    fn test_audit_action_display() {
        assert_eq!(AuditAction::ConsentAccept.to_string(), "consent_accept");
        assert_eq!(AuditAction::ConsentList.to_string(), "consent_list");
    }

    #[test]
    fn test_description_uses_mode() {
        let entry = AuditEntry::new(AuditAction::ConsentAccept, AccessMode::Token, "x");
        assert_eq!(entry.description(), "consent accept by token");

        let entry = AuditEntry::new(AuditAction::ConsentList, AccessMode::Token, "x");
        assert_eq!(entry.description(), "consent list of events by token");
    }

    #[test]
    fn test_audit_result_failed() {
        let result = AuditResult::failed("bad_uuid", "not a uuid");
        assert!(!result.is_success());
        assert!(result.is_failed());
    }

    #[test]
    fn test_annotate_and_mutate() {
        let mut entry = AuditEntry::new(AuditAction::ConsentCancel, AccessMode::Token, "x");
        let token = SubjectToken::new();
        entry.set_subject_token(token);
        entry.annotate("brief", "newsletter");
        entry.annotate("brief", "sms");
        entry.set_result(AuditResult::failed("missing_brief", "consent brief code is missing"));

        assert_eq!(entry.subject_token(), Some(&token));
        assert_eq!(entry.details().len(), 1);
        assert_eq!(entry.details()["brief"], json!("sms"));
        assert!(entry.result().is_failed());
    }

    #[test]
    fn test_audit_entry_serialization() {
        let mut entry = AuditEntry::new(AuditAction::ConsentAccept, AccessMode::parse("phone"), "555");
        entry.annotate("status", "accept");

        let json = serde_json::to_string(&entry).unwrap();
        let deserialized: AuditEntry = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized, entry);
    }
}
