//! User command - Manage subjects in the user directory
//!
//! Provides the `optin user` CLI commands which:
//! 1. Register a subject with its secondary indexes and access token
//! 2. Show the subject an address resolves to

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Subcommand;
use optin_core::domain::{AccessMode, IndexName, UserRecord};
use optin_core::ports::IUserDirectory;
use optin_core::usecases::IdentityResolver;
use tracing::info;
use uuid::Uuid;

use crate::commands::{load_config, open_store};
use crate::output::OutputFormat;

/// User subcommands
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Register a new subject
    Add {
        /// Email address index
        #[arg(long)]
        email: Option<String>,
        /// Phone number index
        #[arg(long)]
        phone: Option<String>,
        /// Login name index
        #[arg(long)]
        login: Option<String>,
        /// Access token for cancel and list requests
        #[arg(long, conflicts_with = "generate_access_token")]
        access_token: Option<String>,
        /// Generate a random access token
        #[arg(long)]
        generate_access_token: bool,
    },
    /// Show the subject an address resolves to
    Show {
        /// Access mode: token, email, phone or login
        mode: String,
        /// Address to resolve
        address: String,
    },
}

impl UserCommand {
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        match self {
            UserCommand::Add {
                email,
                phone,
                login,
                access_token,
                generate_access_token,
            } => {
                let access_token = if *generate_access_token {
                    Some(Uuid::new_v4().simple().to_string())
                } else {
                    access_token.clone()
                };
                let indexes = [
                    (IndexName::Email, email.as_deref()),
                    (IndexName::Phone, phone.as_deref()),
                    (IndexName::Login, login.as_deref()),
                ];
                self.execute_add(config_path, &indexes, access_token, format)
                    .await
            }
            UserCommand::Show { mode, address } => {
                self.execute_show(config_path, mode, address, format).await
            }
        }
    }

    async fn execute_add(
        &self,
        config_path: &Path,
        indexes: &[(IndexName, Option<&str>)],
        access_token: Option<String>,
        format: OutputFormat,
    ) -> Result<()> {
        let formatter = format.formatter();
        let config = load_config(config_path)?;
        let (pool, store) = open_store(&config, true)
            .await?
            .context("Database could not be created")?;

        let user = match build_user(&store, indexes, access_token).await? {
            Ok(user) => user,
            Err(conflict) => {
                formatter.error(&conflict);
                pool.close().await;
                return Ok(());
            }
        };
        store.save_user(&user).await.context("Failed to save user")?;
        pool.close().await;

        info!(token = %user.token(), "Registered user");

        if format.is_json() {
            formatter.print_json(&user_json(&user));
        } else {
            formatter.success(&format!("Registered subject {}", user.token()));
            print_user(formatter.as_ref(), &user);
        }
        Ok(())
    }

    async fn execute_show(
        &self,
        config_path: &Path,
        mode: &str,
        address: &str,
        format: OutputFormat,
    ) -> Result<()> {
        let formatter = format.formatter();
        let config = load_config(config_path)?;
        let Some((pool, store)) = open_store(&config, false).await? else {
            formatter.error("No database found. Register a user with 'optin user add' first.");
            return Ok(());
        };
        let store: Arc<dyn IUserDirectory> = Arc::new(store);

        let resolver = IdentityResolver::new(Arc::clone(&store));
        let resolution = resolver.resolve(&AccessMode::parse(mode), address).await?;
        let user = match resolution.token() {
            Some(token) => store.lookup_user(token).await?,
            None => None,
        };
        pool.close().await;

        match user {
            Some(user) if format.is_json() => formatter.print_json(&user_json(&user)),
            Some(user) => {
                formatter.success(&format!("Subject {}", user.token()));
                print_user(formatter.as_ref(), &user);
            }
            None if format.is_json() => formatter.print_json(&serde_json::Value::Null),
            None => formatter.error(&format!("No subject found for {} '{}'", mode, address)),
        }
        Ok(())
    }
}

/// Builds a new user, or explains which index value is already taken
async fn build_user(
    store: &dyn IUserDirectory,
    indexes: &[(IndexName, Option<&str>)],
    access_token: Option<String>,
) -> Result<std::result::Result<UserRecord, String>> {
    let mut user = UserRecord::new();
    for (index, value) in indexes {
        let Some(value) = value else { continue };
        if store.lookup_user_by_index(*index, value).await?.is_some() {
            return Ok(Err(format!("{} '{}' is already registered", index, value)));
        }
        user = user.with_index(*index, value);
    }
    if let Some(access_token) = access_token.filter(|t| !t.is_empty()) {
        user = user.with_access_token(access_token);
    }
    Ok(Ok(user))
}

fn user_json(user: &UserRecord) -> serde_json::Value {
    serde_json::json!({
        "token": user.token().to_string(),
        "email": user.email(),
        "phone": user.phone(),
        "login": user.login(),
        "access_token": user.access_token(),
        "created_at": user.created_at().to_rfc3339(),
    })
}

fn print_user(formatter: &dyn crate::output::OutputFormatter, user: &UserRecord) {
    for (label, value) in [
        ("email", user.email()),
        ("phone", user.phone()),
        ("login", user.login()),
        ("access token", user.access_token()),
    ] {
        if let Some(value) = value {
            formatter.info(&format!("{:<13} {}", label, value));
        }
    }
    formatter.info(&format!(
        "{:<13} {}",
        "created",
        user.created_at().format("%Y-%m-%d %H:%M:%S")
    ));
}
