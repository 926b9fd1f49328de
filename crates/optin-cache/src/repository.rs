//! SQLite implementation of the record store ports
//!
//! ## Type Mapping
//!
//! | Domain Type     | SQL Type | Strategy                                        |
//! |-----------------|----------|-------------------------------------------------|
//! | SubjectToken    | TEXT     | UUID string via `.to_string()` / `FromStr`      |
//! | AccessMode      | TEXT     | `.as_str()` / `AccessMode::parse()`             |
//! | Brief           | TEXT     | `.as_str()` / `Brief::new()`                    |
//! | ConsentStatus   | TEXT     | `.as_str()` / `ConsentStatus::new()`            |
//! | consent `when`  | INTEGER  | unix seconds                                    |
//! | DateTime<Utc>   | TEXT     | RFC 3339 with fixed microsecond precision       |
//! | AuditAction     | TEXT     | `Display` (matches its serde form)              |
//! | AuditResult     | TEXT     | serde_json serialization                        |
//! | audit details   | TEXT     | serde_json object                               |

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use optin_core::domain::{
    AccessMode, AuditEntry, Brief, ConsentRecord, ConsentStatus, IndexName, SubjectToken,
    UserRecord,
};
use optin_core::ports::{IAuditStore, IConsentLedger, IUserDirectory};

use crate::CacheError;

/// SQLite-based implementation of the user directory, consent ledger and
/// audit store ports
///
/// Every write is a single statement, so SQLite serializes concurrent
/// writes to the same `(subject, brief)` key.
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

/// Format a timestamp so that lexical order equals chronological order
fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a DateTime<Utc> from an RFC 3339 string
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            CacheError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

fn parse_token(s: &str) -> Result<SubjectToken, CacheError> {
    SubjectToken::from_str(s).map_err(|e| {
        CacheError::SerializationError(format!("Invalid SubjectToken '{}': {}", s, e))
    })
}

// ============================================================================
// Row mapping functions
// ============================================================================

/// Reconstruct a UserRecord from a database row
fn user_from_row(row: &SqliteRow) -> Result<UserRecord, CacheError> {
    let token_str: String = row.get("token");
    let email: Option<String> = row.get("email");
    let phone: Option<String> = row.get("phone");
    let login: Option<String> = row.get("login");
    let access_token: Option<String> = row.get("access_token");
    let created_at_str: String = row.get("created_at");

    let mut user = UserRecord::with_token(parse_token(&token_str)?, parse_datetime(&created_at_str)?);
    for (index, value) in [
        (IndexName::Email, email),
        (IndexName::Phone, phone),
        (IndexName::Login, login),
    ] {
        if let Some(value) = value {
            user = user.with_index(index, &value);
        }
    }
    if let Some(access_token) = access_token {
        user = user.with_access_token(access_token);
    }

    Ok(user)
}

/// Reconstruct a ConsentRecord from a database row
fn consent_from_row(row: &SqliteRow) -> Result<ConsentRecord, CacheError> {
    let token_str: Option<String> = row.get("token");
    let mode_str: String = row.get("mode");
    let address: String = row.get("address");
    let brief_str: String = row.get("brief");
    let message: String = row.get("message");
    let status_str: String = row.get("status");
    let updated_at: i64 = row.get("updated_at");

    let token = match token_str {
        Some(ref t) if !t.is_empty() => Some(parse_token(t)?),
        _ => None,
    };
    let brief = Brief::new(brief_str.clone()).map_err(|e| {
        CacheError::SerializationError(format!("Invalid Brief '{}': {}", brief_str, e))
    })?;
    let when = DateTime::from_timestamp(updated_at, 0).ok_or_else(|| {
        CacheError::SerializationError(format!("Invalid consent timestamp {}", updated_at))
    })?;

    Ok(ConsentRecord::new(
        token,
        AccessMode::parse(&mode_str),
        address,
        brief,
        Some(message),
        Some(ConsentStatus::new(status_str)),
    )
    .with_when(when))
}

/// Reconstruct an AuditEntry from a database row
///
/// Uses serde JSON deserialization to reconstruct with the stored id and
/// timestamp (rather than the values `AuditEntry::new()` would assign).
fn audit_entry_from_row(row: &SqliteRow) -> Result<AuditEntry, CacheError> {
    let id: i64 = row.get("id");
    let timestamp_str: String = row.get("timestamp");
    let action_str: String = row.get("action");
    let description: String = row.get("description");
    let mode: String = row.get("mode");
    let address: String = row.get("address");
    let subject_token: Option<String> = row.get("subject_token");
    let result_str: String = row.get("result");
    let details_str: String = row.get("details");

    let timestamp = parse_datetime(&timestamp_str)?;
    let result_val: serde_json::Value = serde_json::from_str(&result_str)
        .map_err(|e| CacheError::SerializationError(format!("Invalid audit result JSON: {}", e)))?;
    let details_val: serde_json::Value = serde_json::from_str(&details_str)
        .map_err(|e| CacheError::SerializationError(format!("Invalid audit details JSON: {}", e)))?;

    let entry_json = serde_json::json!({
        "id": id,
        "timestamp": timestamp.to_rfc3339(),
        "action": action_str,
        "description": description,
        "mode": mode,
        "address": address,
        "subject_token": subject_token,
        "result": result_val,
        "details": details_val,
    });

    serde_json::from_value(entry_json).map_err(|e| {
        CacheError::SerializationError(format!("Failed to reconstruct AuditEntry from row: {}", e))
    })
}

// ============================================================================
// IUserDirectory implementation
// ============================================================================

#[async_trait::async_trait]
impl IUserDirectory for SqliteRecordStore {
    async fn lookup_user(&self, token: &SubjectToken) -> anyhow::Result<Option<UserRecord>> {
        let row = sqlx::query("SELECT * FROM users WHERE token = ?")
            .bind(token.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(user_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn lookup_user_by_index(
        &self,
        index: IndexName,
        value: &str,
    ) -> anyhow::Result<Option<UserRecord>> {
        let normalized = index.normalize(value);
        if normalized.is_empty() {
            return Ok(None);
        }

        // The column name comes from a closed enum, never from the request
        let sql = format!("SELECT * FROM users WHERE {} = ?", index.as_str());
        let row = sqlx::query(&sql)
            .bind(&normalized)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(user_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn save_user(&self, user: &UserRecord) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO users (token, email, phone, login, access_token, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(token) DO UPDATE SET \
               email = excluded.email, \
               phone = excluded.phone, \
               login = excluded.login, \
               access_token = excluded.access_token",
        )
        .bind(user.token().to_string())
        .bind(user.email())
        .bind(user.phone())
        .bind(user.login())
        .bind(user.access_token())
        .bind(format_datetime(user.created_at()))
        .execute(&self.pool)
        .await?;

        tracing::debug!(token = %user.token(), "Saved user");
        Ok(())
    }
}

// ============================================================================
// IConsentLedger implementation
// ============================================================================

#[async_trait::async_trait]
impl IConsentLedger for SqliteRecordStore {
    async fn create_or_update(&self, record: &ConsentRecord) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO consents \
             (subject_key, brief, token, mode, address, message, status, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(subject_key, brief) DO UPDATE SET \
               token = excluded.token, \
               mode = excluded.mode, \
               address = excluded.address, \
               message = excluded.message, \
               status = excluded.status, \
               updated_at = excluded.updated_at",
        )
        .bind(record.subject_key())
        .bind(record.brief().as_str())
        .bind(record.subject_token().map(|t| t.to_string()))
        .bind(record.mode().as_str())
        .bind(record.address())
        .bind(record.message())
        .bind(record.status().as_str())
        .bind(record.when().timestamp())
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            subject = %record.subject_key(),
            brief = %record.brief(),
            status = %record.status(),
            "Saved consent record"
        );
        Ok(())
    }

    async fn cancel(&self, token: &SubjectToken, brief: &Brief) -> anyhow::Result<()> {
        let result = sqlx::query(
            "UPDATE consents SET status = ?, updated_at = ? \
             WHERE subject_key = ? AND brief = ?",
        )
        .bind(ConsentStatus::cancel().as_str())
        .bind(Utc::now().timestamp())
        .bind(token.to_string())
        .bind(brief.as_str())
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            token = %token,
            brief = %brief,
            affected = result.rows_affected(),
            "Cancelled consent record"
        );
        Ok(())
    }

    async fn list(&self, token: &SubjectToken) -> anyhow::Result<Vec<ConsentRecord>> {
        let rows = sqlx::query("SELECT * FROM consents WHERE token = ? ORDER BY brief ASC")
            .bind(token.to_string())
            .fetch_all(&self.pool)
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(consent_from_row(row)?);
        }

        Ok(records)
    }
}

// ============================================================================
// IAuditStore implementation
// ============================================================================

#[async_trait::async_trait]
impl IAuditStore for SqliteRecordStore {
    async fn save_audit(&self, entry: &AuditEntry) -> anyhow::Result<()> {
        let action = entry.action().to_string();
        let result = serde_json::to_string(entry.result())
            .map_err(|e| anyhow::anyhow!("Failed to serialize audit result: {}", e))?;
        let details = serde_json::to_string(entry.details())
            .map_err(|e| anyhow::anyhow!("Failed to serialize audit details: {}", e))?;

        sqlx::query(
            "INSERT INTO audit_log \
             (timestamp, action, description, mode, address, subject_token, result, details) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(format_datetime(entry.timestamp()))
        .bind(&action)
        .bind(entry.description())
        .bind(entry.mode().as_str())
        .bind(entry.address())
        .bind(entry.subject_token().map(|t| t.to_string()))
        .bind(&result)
        .bind(&details)
        .execute(&self.pool)
        .await?;

        tracing::trace!(action = %action, "Saved audit entry");
        Ok(())
    }

    async fn get_audit_for_address(
        &self,
        address: &str,
        limit: u32,
    ) -> anyhow::Result<Vec<AuditEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM audit_log WHERE address = ? \
             ORDER BY timestamp DESC, id DESC LIMIT ?",
        )
        .bind(address)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            entries.push(audit_entry_from_row(row)?);
        }

        Ok(entries)
    }

    async fn get_audit_since(
        &self,
        since: DateTime<Utc>,
        limit: u32,
    ) -> anyhow::Result<Vec<AuditEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM audit_log WHERE timestamp > ? \
             ORDER BY timestamp DESC, id DESC LIMIT ?",
        )
        .bind(format_datetime(since))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            entries.push(audit_entry_from_row(row)?);
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_datetime_fixed_width() {
        let a = DateTime::from_timestamp(1_700_000_000, 500_000_000).unwrap();
        let b = DateTime::from_timestamp(1_700_000_000, 123_456_000).unwrap();
        assert_eq!(format_datetime(a).len(), format_datetime(b).len());
        assert!(format_datetime(b) < format_datetime(a));
    }

    #[test]
    fn test_parse_datetime_roundtrip() {
        let now = DateTime::from_timestamp(1_700_000_000, 250_000_000).unwrap();
        assert_eq!(parse_datetime(&format_datetime(now)).unwrap(), now);
        assert!(parse_datetime("yesterday").is_err());
    }
}
