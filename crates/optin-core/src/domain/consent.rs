//! Consent record domain entities
//!
//! A `ConsentRecord` captures one decision of a subject about one consent
//! topic (`brief`). At most one record exists per `(subject, brief)` pair;
//! accepting again overwrites it, cancelling flips its status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::newtypes::{AccessMode, Brief, SubjectToken};

/// Status string stored for an accepted consent
pub const STATUS_ACCEPT: &str = "accept";
/// Status string stored for a cancelled consent
pub const STATUS_CANCEL: &str = "cancel";

/// Lifecycle state of a consent record
///
/// Clients may send arbitrary status strings on accept, so this is an open
/// string type with the two well-known values as constructors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsentStatus(String);

impl ConsentStatus {
    pub fn accept() -> Self {
        Self(STATUS_ACCEPT.to_string())
    }

    pub fn cancel() -> Self {
        Self(STATUS_CANCEL.to_string())
    }

    /// Empty strings fall back to `accept`.
    pub fn new(status: impl Into<String>) -> Self {
        let status = status.into();
        if status.is_empty() {
            Self::accept()
        } else {
            Self(status)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A record is active until it has been cancelled
    pub fn is_active(&self) -> bool {
        self.0 != STATUS_CANCEL
    }
}

impl Default for ConsentStatus {
    fn default() -> Self {
        Self::accept()
    }
}

impl fmt::Display for ConsentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A consent decision recorded for a subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentRecord {
    /// Resolved subject; serialized as `""` when unresolved
    #[serde(
        rename = "token",
        serialize_with = "token_or_empty",
        deserialize_with = "empty_or_token"
    )]
    subject_token: Option<SubjectToken>,
    mode: AccessMode,
    address: String,
    brief: Brief,
    message: String,
    status: ConsentStatus,
    #[serde(with = "chrono::serde::ts_seconds")]
    when: DateTime<Utc>,
}

impl ConsentRecord {
    /// Creates a new consent record stamped with the current time
    ///
    /// `message` defaults to the brief and `status` to `accept` when absent
    /// or empty.
    pub fn new(
        subject_token: Option<SubjectToken>,
        mode: AccessMode,
        address: impl Into<String>,
        brief: Brief,
        message: Option<String>,
        status: Option<ConsentStatus>,
    ) -> Self {
        let message = match message {
            Some(m) if !m.is_empty() => m,
            _ => brief.as_str().to_string(),
        };
        Self {
            subject_token,
            mode,
            address: address.into(),
            brief,
            message,
            status: status.unwrap_or_default(),
            when: Utc::now(),
        }
    }

    pub fn subject_token(&self) -> Option<&SubjectToken> {
        self.subject_token.as_ref()
    }

    pub fn mode(&self) -> &AccessMode {
        &self.mode
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn brief(&self) -> &Brief {
        &self.brief
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> &ConsentStatus {
        &self.status
    }

    pub fn when(&self) -> DateTime<Utc> {
        self.when
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Sets the timestamp (used when loading from storage)
    pub fn with_when(mut self, when: DateTime<Utc>) -> Self {
        self.when = when;
        self
    }

    /// Key that identifies the subject side of the `(subject, brief)` pair.
    ///
    /// Resolved records use the token. Unresolved ones fall back to
    /// `mode:address` so distinct unknown addresses never share a row.
    pub fn subject_key(&self) -> String {
        match &self.subject_token {
            Some(token) => token.to_string(),
            None => format!("{}:{}", self.mode, self.address),
        }
    }
}

fn token_or_empty<S: Serializer>(
    token: &Option<SubjectToken>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match token {
        Some(t) => t.serialize(serializer),
        None => serializer.serialize_str(""),
    }
}

fn empty_or_token<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<SubjectToken>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(serde::de::Error::custom)
}
