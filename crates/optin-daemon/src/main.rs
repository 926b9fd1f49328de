//! Optin Daemon - consent ledger HTTP service
//!
//! This binary runs as a system service and handles:
//! - Loading and validating the YAML configuration
//! - Opening the SQLite record store
//! - Serving the consent API
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! The daemon wires the SQLite store into an `ApiContext` and runs the
//! `ApiServer` until a `CancellationToken` is triggered by SIGTERM or
//! SIGINT. The server drains open connections before the pool is closed,
//! so pending audit entries reach the database.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use optin_api::{ApiContext, ApiServer};
use optin_cache::{DatabasePool, SqliteRecordStore};
use optin_core::config::Config;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Command line of `optind`
#[derive(Debug, Parser)]
#[command(name = "optind", version, about = "Optin consent ledger service")]
struct Args {
    /// Path to the configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,
}

// ============================================================================
// DaemonService
// ============================================================================

/// Main daemon service that owns the database and serves the API
struct DaemonService {
    /// Application configuration loaded from YAML
    config: Config,
    /// Database pool shared by the record store
    db_pool: DatabasePool,
    /// Token for signalling graceful shutdown to all async tasks
    shutdown: CancellationToken,
}

impl DaemonService {
    /// Creates a new DaemonService
    ///
    /// Validates the configuration and opens the database.
    async fn new(config: Config, shutdown: CancellationToken) -> Result<Self> {
        let errors = config.validate();
        if !errors.is_empty() {
            for e in &errors {
                error!(field = %e.field, "Invalid configuration: {}", e.message);
            }
            anyhow::bail!("configuration has {} error(s)", errors.len());
        }

        let db_pool = DatabasePool::new(&config.database.path)
            .await
            .context("Failed to open database")?;

        Ok(Self {
            config,
            db_pool,
            shutdown,
        })
    }

    /// Binds the API server and serves until shutdown
    async fn run(self) -> Result<()> {
        let server = self.bind().await?;
        let result = server.run(self.shutdown.clone()).await;
        self.db_pool.close().await;
        result
    }

    async fn bind(&self) -> Result<ApiServer> {
        let store = Arc::new(SqliteRecordStore::new(self.db_pool.pool().clone()));
        let ctx = Arc::new(ApiContext::from_store(&self.config, store));

        if self.config.auth.root_token.is_none() {
            info!("No root token configured, cancel and list require user access tokens");
        }

        ApiServer::bind(ctx, &self.config.server.bind)
            .await
            .with_context(|| format!("Failed to bind {}", self.config.server.bind))
    }
}

/// Loads the configuration file
///
/// An explicitly given file must exist; the default location falls back to
/// built-in defaults.
fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(Config::load_or_default(&Config::default_path())),
    }
}

/// Initializes tracing; `RUST_LOG` overrides the configured level
fn init_tracing(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

// ============================================================================
// Graceful shutdown signal handler
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config)?;
    init_tracing(&config);

    info!("Optin daemon starting (optind)");

    let shutdown_token = CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = DaemonService::new(config, shutdown_token).await?;
    let result = service.run().await;

    match &result {
        Ok(()) => info!("Optin daemon shut down gracefully"),
        Err(e) => error!(error = %e, "Optin daemon exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use optin_core::config::ConfigBuilder;

    fn test_config(dir: &tempfile::TempDir) -> Config {
        ConfigBuilder::new()
            .server_bind("127.0.0.1:0")
            .database_path(dir.path().join("optin.db"))
            .auth_root_token("daemon-root-token-0001")
            .build()
    }

    #[test]
    fn test_args_parse_config_flag() {
        let args = Args::parse_from(["optind", "--config", "/etc/optin/config.yaml"]);
        assert_eq!(args.config, Some(PathBuf::from("/etc/optin/config.yaml")));

        let args = Args::parse_from(["optind"]);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_load_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(dir.path().join("missing.yaml"))).is_err());
    }

    #[test]
    fn test_load_explicit_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "server:\n  bind: \"127.0.0.1:4000\"\n").unwrap();

        let config = load_config(Some(path)).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:4000");
        assert!(config.consent.silent_accept_failures);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&dir);
        config.server.bind = "nowhere".to_string();

        let result = DaemonService::new(config, CancellationToken::new()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_service_serves_until_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let shutdown = CancellationToken::new();
        let service = DaemonService::new(test_config(&dir), shutdown.clone())
            .await
            .unwrap();

        let server = service.bind().await.unwrap();
        let base = format!("http://{}", server.local_addr());
        let handle = tokio::spawn(server.run(shutdown.clone()));

        let body: serde_json::Value = reqwest::get(format!("{}/healthz", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");

        shutdown.cancel();
        handle.await.unwrap().unwrap();
        service.db_pool.close().await;
        assert!(dir.path().join("optin.db").exists());
    }
}
