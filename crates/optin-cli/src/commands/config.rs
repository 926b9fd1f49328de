//! Config command - View and manage Optin configuration
//!
//! Provides the `optin config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Sets individual configuration values via dot-notation keys
//! 3. Validates the configuration file and reports errors

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use optin_core::config::Config;
use tracing::info;

use crate::commands::load_config;
use crate::output::OutputFormat;

/// Keys accepted by `optin config set`
const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("server.bind", "Listen address, e.g. 127.0.0.1:3000"),
    ("server.max_body_bytes", "Largest accepted request body in bytes"),
    ("database.path", "SQLite database file"),
    ("logging.level", "trace|debug|info|warn|error"),
    ("logging.json", "true|false"),
    ("auth.root_token", "Administrator token (empty to unset)"),
    ("auth.header", "Request header carrying the token"),
    ("consent.silent_accept_failures", "true|false"),
];

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "server.bind")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    /// Execute the config command
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(config_path, format),
            ConfigCommand::Set { key, value } => self.execute_set(config_path, key, value, format),
            ConfigCommand::Validate => self.execute_validate(config_path, format),
        }
    }

    fn execute_show(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let formatter = format.formatter();
        let config = load_config(config_path)?;

        info!(config_path = %config_path.display(), "Showing configuration");

        if format.is_json() {
            let json = serde_json::to_value(redacted(&config))
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", config_path.display()));
            formatter.info("");

            let yaml = serde_yaml::to_string(&redacted(&config))
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }

        Ok(())
    }

    fn execute_set(
        &self,
        config_path: &Path,
        key: &str,
        value: &str,
        format: OutputFormat,
    ) -> Result<()> {
        let formatter = format.formatter();
        let mut config = load_config(config_path)?;

        info!(key = %key, "Setting configuration value");

        if let Err(e) = apply_config_value(&mut config, key, value) {
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "error": e.to_string(),
                }));
            } else {
                formatter.error(&format!("Failed to set '{}': {}", key, e));
                formatter.info("");
                formatter.info("Supported keys:");
                for (key, help) in SUPPORTED_KEYS {
                    formatter.info(&format!("  {:<32} - {}", key, help));
                }
            }
            return Ok(());
        }

        let errors: Vec<String> = config.validate().iter().map(|e| e.to_string()).collect();
        if !errors.is_empty() {
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "errors": errors,
                }));
            } else {
                formatter.error(&format!("Invalid value for '{}': {}", key, errors.join("; ")));
            }
            return Ok(());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
        }
        let yaml = serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
        std::fs::write(config_path, yaml).context("Failed to write configuration file")?;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "key": key,
                "config_path": config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Set {}", key));
            formatter.info(&format!("Saved to {}", config_path.display()));
        }
        Ok(())
    }

    fn execute_validate(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let formatter = format.formatter();

        if !config_path.exists() {
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "valid": false,
                    "config_path": config_path.display().to_string(),
                    "errors": ["Configuration file not found. Using defaults."],
                }));
            } else {
                formatter.info(&format!(
                    "Configuration file not found at {}",
                    config_path.display()
                ));
                formatter.info("Using default configuration. Run 'optin config set <key> <value>' to create one.");
            }
            return Ok(());
        }

        let errors: Vec<String> = match Config::load(config_path) {
            Ok(config) => config.validate().iter().map(|e| e.to_string()).collect(),
            Err(e) => vec![format!("Failed to parse configuration: {}", e)],
        };

        info!(config_path = %config_path.display(), errors = errors.len(), "Validated configuration");

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": config_path.display().to_string(),
                "errors": errors,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", config_path.display()));
        } else {
            formatter.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            ));
            formatter.info(&format!("File: {}", config_path.display()));
            formatter.info("");
            for error in &errors {
                formatter.info(&format!("  {}", error));
            }
        }

        Ok(())
    }
}

/// Copy of the configuration safe to print
fn redacted(config: &Config) -> Config {
    let mut config = config.clone();
    if config.auth.root_token.is_some() {
        config.auth.root_token = Some("********".to_string());
    }
    config
}

/// Apply a dot-notation key/value pair to a Config struct
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "server.bind" => config.server.bind = value.to_string(),
        "server.max_body_bytes" => {
            config.server.max_body_bytes = value
                .parse::<usize>()
                .context("Expected a byte count for server.max_body_bytes")?;
        }
        "database.path" => config.database.path = PathBuf::from(value),
        "logging.level" => config.logging.level = value.to_string(),
        "logging.json" => {
            config.logging.json = value
                .parse::<bool>()
                .context("Expected true or false for logging.json")?;
        }
        "auth.root_token" => {
            config.auth.root_token = if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            };
        }
        "auth.header" => config.auth.header = value.to_string(),
        "consent.silent_accept_failures" => {
            config.consent.silent_accept_failures = value
                .parse::<bool>()
                .context("Expected true or false for consent.silent_accept_failures")?;
        }
        _ => anyhow::bail!("Unknown configuration key '{}'", key),
    }
    Ok(())
}
