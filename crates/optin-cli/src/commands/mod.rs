//! CLI subcommands
//!
//! Every command works directly on the SQLite database named by the
//! configuration, so it can run while `optind` is serving.

pub mod audit;
pub mod completions;
pub mod config;
pub mod consent;
pub mod user;

use std::path::Path;

use anyhow::{Context, Result};
use optin_cache::{DatabasePool, SqliteRecordStore};
use optin_core::config::Config;

/// Loads the configuration, falling back to defaults when the file is absent
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::load(path).with_context(|| format!("Failed to load {}", path.display()))
    } else {
        Ok(Config::default())
    }
}

/// Opens the record store named by the configuration
///
/// Returns `None` when the database does not exist and `create` is false.
pub async fn open_store(
    config: &Config,
    create: bool,
) -> Result<Option<(DatabasePool, SqliteRecordStore)>> {
    let db_path = &config.database.path;
    if !create && !db_path.exists() {
        return Ok(None);
    }

    let pool = DatabasePool::new(db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    let store = SqliteRecordStore::new(pool.pool().clone());
    Ok(Some((pool, store)))
}
