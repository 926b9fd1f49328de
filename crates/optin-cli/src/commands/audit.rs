//! Audit command - View audit log entries
//!
//! Provides the `optin audit` CLI command which:
//! 1. Queries audit entries by address, or by time window
//! 2. Filters them by action
//! 3. Prints a table or JSON

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::Args;
use optin_core::domain::{AuditEntry, AuditResult};
use optin_core::ports::IAuditStore;
use serde_json::{Map, Value};
use tracing::info;

use crate::commands::{load_config, open_store};
use crate::output::{truncate, OutputFormat};

/// Audit command with filter arguments
#[derive(Debug, Args)]
pub struct AuditCommand {
    /// Show entries since this time (e.g., "1h", "2d", "2024-01-01")
    #[arg(long, conflicts_with = "address")]
    pub since: Option<String>,

    /// Show entries for this address only
    #[arg(long)]
    pub address: Option<String>,

    /// Filter by action (consent_accept, consent_cancel, consent_list)
    #[arg(long)]
    pub action: Option<String>,

    /// Maximum number of entries to show
    #[arg(long, default_value = "50")]
    pub limit: u32,
}

impl AuditCommand {
    /// Execute the audit command
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let formatter = format.formatter();
        let config = load_config(config_path)?;
        let Some((pool, store)) = open_store(&config, false).await? else {
            formatter.error("No database found. Start optind first.");
            return Ok(());
        };

        let (entries, since) = match &self.address {
            Some(address) => {
                let entries = store
                    .get_audit_for_address(address, self.limit)
                    .await
                    .context("Failed to query audit entries")?;
                (entries, None)
            }
            None => {
                let since = match &self.since {
                    Some(since_str) => parse_since(since_str).with_context(|| {
                        format!("Invalid --since value: '{}'. Expected formats: '1h', '30m', '2d', '1w', '2024-01-01', '2024-01-01T12:00:00'", since_str)
                    })?,
                    // Default: show last 7 days
                    None => Utc::now() - chrono::Duration::days(7),
                };
                let entries = store
                    .get_audit_since(since, self.limit)
                    .await
                    .context("Failed to query audit entries")?;
                (entries, Some(since))
            }
        };
        pool.close().await;

        info!(count = entries.len(), "Retrieved audit entries");

        let entries: Vec<&AuditEntry> = entries
            .iter()
            .filter(|entry| match &self.action {
                Some(action) => entry.action().to_string().contains(action.as_str()),
                None => true,
            })
            .collect();

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "since": since.map(|s| s.to_rfc3339()),
                "address": self.address,
                "limit": self.limit,
                "count": entries.len(),
                "entries": entries,
            }));
            return Ok(());
        }

        if entries.is_empty() {
            formatter.info("No audit entries found for the specified criteria.");
            return Ok(());
        }

        formatter.success(&format!("Audit Log ({} entries)", entries.len()));
        formatter.info("");
        formatter.row(&[
            ("Timestamp", 19),
            ("Action", 14),
            ("Address", 36),
            ("Result", 18),
            ("Details", 0),
        ]);
        for entry in &entries {
            let timestamp = entry.timestamp().format("%Y-%m-%d %H:%M:%S").to_string();
            let action = entry.action().to_string();
            let result = format_result(entry.result());
            let details = format_details(entry.details());
            formatter.row(&[
                (&timestamp, 19),
                (&action, 14),
                (entry.address(), 36),
                (&result, 18),
                (&details, 0),
            ]);
        }

        if entries.len() as u32 >= self.limit {
            formatter.info("");
            formatter.info(&format!(
                "Showing {} entries (limit). Use --limit to show more.",
                self.limit
            ));
        }

        Ok(())
    }
}

/// Parse the --since argument into a DateTime<Utc>
///
/// Supports:
/// - Relative: "1h" (1 hour ago), "30m" (30 minutes), "2d" (2 days), "1w" (1 week)
/// - Absolute date: "2024-01-01"
/// - Absolute datetime: "2024-01-01T12:00:00"
fn parse_since(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Some(duration) = parse_relative_duration(input) {
        return Ok(Utc::now() - duration);
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        let datetime = date
            .and_hms_opt(0, 0, 0)
            .context("Failed to create datetime from date")?;
        return Ok(DateTime::<Utc>::from_naive_utc_and_offset(datetime, Utc));
    }

    if let Ok(datetime) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S") {
        return Ok(DateTime::<Utc>::from_naive_utc_and_offset(datetime, Utc));
    }

    anyhow::bail!(
        "Could not parse '{}' as a time. Use relative (1h, 30m, 2d, 1w) or absolute (2024-01-01) format.",
        input
    )
}

/// Parse relative duration strings like "1h", "30m", "2d", "1w"
fn parse_relative_duration(input: &str) -> Option<chrono::Duration> {
    if input.len() < 2 {
        return None;
    }

    let (num_str, unit) = input.split_at(input.len() - 1);
    let num: i64 = num_str.parse().ok()?;

    match unit {
        "m" => Some(chrono::Duration::minutes(num)),
        "h" => Some(chrono::Duration::hours(num)),
        "d" => Some(chrono::Duration::days(num)),
        "w" => Some(chrono::Duration::weeks(num)),
        _ => None,
    }
}

fn format_result(result: &AuditResult) -> String {
    match result {
        AuditResult::Success => "ok".to_string(),
        AuditResult::Failed { code, .. } => format!("failed ({})", code),
    }
}

/// Summarize annotations as `key=value` pairs, brief first
fn format_details(details: &Map<String, Value>) -> String {
    let mut parts = Vec::new();
    if let Some(brief) = details.get("brief").and_then(|v| v.as_str()) {
        parts.push(format!("brief={}", brief));
    }
    for (key, value) in details {
        if key == "brief" {
            continue;
        }
        match value {
            Value::String(s) => parts.push(format!("{}={}", key, s)),
            other => parts.push(format!("{}={}", key, other)),
        }
    }
    truncate(&parts.join(" "), 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_relative_duration() {
        assert_eq!(parse_relative_duration("30m"), Some(chrono::Duration::minutes(30)));
        assert_eq!(parse_relative_duration("1h"), Some(chrono::Duration::hours(1)));
        assert_eq!(parse_relative_duration("2d"), Some(chrono::Duration::days(2)));
        assert_eq!(parse_relative_duration("1w"), Some(chrono::Duration::weeks(1)));
    }

    #[test]
    fn test_parse_relative_duration_invalid() {
        assert!(parse_relative_duration("abc").is_none());
        assert!(parse_relative_duration("1x").is_none());
        assert!(parse_relative_duration("h").is_none());
    }

    #[test]
    fn test_parse_since_relative() {
        let parsed = parse_since("1h").unwrap();
        let diff = Utc::now() - parsed;
        assert!(diff.num_seconds() >= 3595 && diff.num_seconds() <= 3605);
    }

    #[test]
    fn test_parse_since_absolute() {
        let parsed = parse_since("2024-01-15").unwrap();
        assert_eq!(parsed.format("%Y-%m-%d").to_string(), "2024-01-15");

        let parsed = parse_since("2024-01-15T14:30:00").unwrap();
        assert_eq!(
            parsed.format("%Y-%m-%dT%H:%M:%S").to_string(),
            "2024-01-15T14:30:00"
        );
    }

    #[test]
    fn test_parse_since_invalid() {
        assert!(parse_since("not-a-time").is_err());
        assert!(parse_since("").is_err());
    }

    #[test]
    fn test_format_result() {
        assert_eq!(format_result(&AuditResult::success()), "ok");
        assert_eq!(
            format_result(&AuditResult::failed("bad_uuid", "bad uuid")),
            "failed (bad_uuid)"
        );
    }

    #[test]
    fn test_format_details_brief_first() {
        let mut details = Map::new();
        details.insert("status".into(), Value::from("accept"));
        details.insert("brief".into(), Value::from("newsletter"));
        details.insert("total".into(), Value::from(3));
        assert_eq!(
            format_details(&details),
            "brief=newsletter status=accept total=3"
        );
    }
}
