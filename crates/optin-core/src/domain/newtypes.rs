//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers and values.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// Subject token
// ============================================================================

/// Canonical identifier for a user, used as the primary key for consent records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectToken(Uuid);

impl SubjectToken {
    /// Create a new random SubjectToken
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Byte offsets of the hyphens in the canonical `8-4-4-4-12` form
const HYPHENS: [usize; 4] = [8, 13, 18, 23];

impl Default for SubjectToken {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SubjectToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubjectToken {
    type Err = DomainError;

    /// Only the hyphenated form is accepted; simple, braced and URN
    /// spellings are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 36 || HYPHENS.iter().any(|&i| bytes[i] != b'-') {
            return Err(DomainError::InvalidIdentifier(format!(
                "'{s}' is not a hyphenated UUID"
            )));
        }
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidIdentifier(format!("'{s}' is not a UUID: {e}")))
    }
}

impl From<Uuid> for SubjectToken {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Identifier for persisted audit entries (database-assigned)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditId(i64);

impl AuditId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl Display for AuditId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Secondary indexes and access modes
// ============================================================================

/// Secondary user index that can be used to identify a subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexName {
    Email,
    Phone,
    Login,
}

impl IndexName {
    /// Column/route name of the index
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexName::Email => "email",
            IndexName::Phone => "phone",
            IndexName::Login => "login",
        }
    }

    /// Normalizes a raw index value so that lookups and writes agree.
    ///
    /// - email: trimmed, lowercased
    /// - phone: digits only, a leading `+` is kept
    /// - login: trimmed
    pub fn normalize(&self, value: &str) -> String {
        let value = value.trim();
        match self {
            IndexName::Email => value.to_lowercase(),
            IndexName::Phone => {
                let mut out = String::with_capacity(value.len());
                if value.starts_with('+') {
                    out.push('+');
                }
                out.extend(value.chars().filter(char::is_ascii_digit));
                out
            }
            IndexName::Login => value.to_string(),
        }
    }
}

impl Display for IndexName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(IndexName::Email),
            "phone" => Ok(IndexName::Phone),
            "login" => Ok(IndexName::Login),
            other => Err(DomainError::UnknownIndex(other.to_string())),
        }
    }
}

/// How the subject of a request was identified
///
/// Parsing never fails: unknown mode names are kept as `Unsupported` so that
/// they can still be recorded in the audit trail and resolve to "not found".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// The address is the subject token itself
    Token,
    /// The address is a value of a secondary index
    Index(IndexName),
    /// A mode name the directory has no index for
    Unsupported(String),
}

impl AccessMode {
    pub fn parse(mode: &str) -> Self {
        match mode {
            "token" => AccessMode::Token,
            other => match other.parse::<IndexName>() {
                Ok(index) => AccessMode::Index(index),
                Err(_) => AccessMode::Unsupported(other.to_string()),
            },
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AccessMode::Token => "token",
            AccessMode::Index(index) => index.as_str(),
            AccessMode::Unsupported(name) => name,
        }
    }
}

impl Display for AccessMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AccessMode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AccessMode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(AccessMode::parse(&s))
    }
}

// ============================================================================
// Brief
// ============================================================================

/// Short code naming a consent topic (never empty)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Brief(String);

impl Brief {
    pub fn new(brief: impl Into<String>) -> Result<Self, DomainError> {
        let brief = brief.into();
        if brief.is_empty() {
            return Err(DomainError::InvalidBrief(
                "consent brief code is missing".to_string(),
            ));
        }
        Ok(Self(brief))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Brief {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Brief> for String {
    fn from(brief: Brief) -> Self {
        brief.0
    }
}

impl Display for Brief {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
