//! Optin CLI - Administration tool for the Optin consent ledger
//!
//! Provides commands for:
//! - Registering subjects and their access tokens
//! - Inspecting consent records
//! - Reading the audit trail
//! - Viewing and editing configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use optin_core::config::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    audit::AuditCommand, completions::CompletionsCommand, config::ConfigCommand,
    consent::ConsentCommand, user::UserCommand,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "optin", version, about = "Consent ledger administration")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage subjects
    #[command(subcommand)]
    User(UserCommand),
    /// Inspect consent records
    #[command(subcommand)]
    Consent(ConsentCommand),
    /// View audit log entries
    Audit(AuditCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = OutputFormat::from_json_flag(cli.json);
    let config_path = cli.config.unwrap_or_else(Config::default_path);

    match cli.command {
        Commands::User(cmd) => cmd.execute(&config_path, format).await,
        Commands::Consent(cmd) => cmd.execute(&config_path, format).await,
        Commands::Audit(cmd) => cmd.execute(&config_path, format).await,
        Commands::Config(cmd) => cmd.execute(&config_path, format).await,
        Commands::Completions(cmd) => cmd.execute(),
    }
}
