//! Consent command - Inspect the consent ledger
//!
//! `optin consent list <token>` prints the same rows the list route returns,
//! without going through HTTP or writing an audit entry.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use optin_core::domain::ConsentRecord;
use optin_core::ports::IConsentLedger;
use optin_core::usecases::require_token;

use crate::commands::{load_config, open_store};
use crate::output::OutputFormat;

/// Consent subcommands
#[derive(Debug, Subcommand)]
pub enum ConsentCommand {
    /// List every consent record of a subject
    List {
        /// Subject token (UUID)
        token: String,
    },
}

impl ConsentCommand {
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        match self {
            ConsentCommand::List { token } => self.execute_list(config_path, token, format).await,
        }
    }

    async fn execute_list(&self, config_path: &Path, token: &str, format: OutputFormat) -> Result<()> {
        let formatter = format.formatter();
        let token = require_token(token).context("Expected a subject token (UUID)")?;

        let config = load_config(config_path)?;
        let Some((pool, store)) = open_store(&config, false).await? else {
            formatter.error("No database found. Start optind or run 'optin user add' first.");
            return Ok(());
        };
        let rows = store.list(&token).await.context("Failed to list consents")?;
        pool.close().await;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "status": "ok",
                "total": rows.len(),
                "rows": rows,
            }));
            return Ok(());
        }

        if rows.is_empty() {
            formatter.info(&format!("No consent records for {}", token));
            return Ok(());
        }

        formatter.success(&format!("Consents of {} ({} records)", token, rows.len()));
        formatter.info("");
        formatter.row(&[("Brief", 20), ("Status", 8), ("Updated", 19), ("Message", 0)]);
        formatter.row(&[("-----", 20), ("------", 8), ("-------", 19), ("-------", 0)]);
        for record in &rows {
            let cells = row_cells(record);
            formatter.row(&[
                (&cells[0], 20),
                (&cells[1], 8),
                (&cells[2], 19),
                (&cells[3], 0),
            ]);
        }
        Ok(())
    }
}

fn row_cells(record: &ConsentRecord) -> [String; 4] {
    [
        record.brief().to_string(),
        record.status().to_string(),
        record.when().format("%Y-%m-%d %H:%M:%S").to_string(),
        record.message().to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use optin_core::domain::{AccessMode, Brief, ConsentStatus, SubjectToken};

    #[test]
    fn test_row_cells() {
        let token = SubjectToken::new();
        let record = ConsentRecord::new(
            Some(token),
            AccessMode::Token,
            token.to_string(),
            Brief::new("newsletter").unwrap(),
            None,
            Some(ConsentStatus::cancel()),
        )
        .with_when(DateTime::from_timestamp(1_700_000_000, 0).unwrap());

        let cells = row_cells(&record);
        assert_eq!(cells[0], "newsletter");
        assert_eq!(cells[1], "cancel");
        assert_eq!(cells[2], "2023-11-14 22:13:20");
        assert_eq!(cells[3], "newsletter");
    }

    #[tokio::test]
    async fn test_list_rejects_non_uuid() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = ConsentCommand::List {
            token: "jane@example.com".to_string(),
        };
        let result = cmd
            .execute(&dir.path().join("config.yaml"), OutputFormat::Json)
            .await;
        assert!(result.is_err());
    }
}
