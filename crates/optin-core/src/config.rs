//! Configuration module for Optin.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Optin.
///
/// Missing sections and fields fall back to their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    pub consent: ConsentConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `127.0.0.1:3000`.
    pub bind: String,
    /// Largest request body accepted, in bytes.
    pub max_body_bytes: usize,
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Emit JSON log lines instead of the human format.
    pub json: bool,
}

/// Request authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Administrator token accepted for every subject. `None` disables it.
    pub root_token: Option<String>,
    /// Request header carrying the access token.
    pub header: String,
}

/// Consent flow behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentConfig {
    /// When true, the accept flow answers `{"status":"ok"}` even when the
    /// identifier, body or brief is invalid, or the ledger write fails.
    /// Existing clients rely on this.
    pub silent_accept_failures: bool,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/optin/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("optin")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Config::default()
// ---------------------------------------------------------------------------

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            max_body_bytes: 64 * 1024,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("optin")
                .join("optin.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            root_token: None,
            header: "X-Optin-Token".to_string(),
        }
    }
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            silent_accept_failures: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"server.bind"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- server ---
        if self.server.bind.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError {
                field: "server.bind".into(),
                message: format!("not a socket address: '{}'", self.server.bind),
            });
        }
        if self.server.max_body_bytes == 0 {
            errors.push(ValidationError {
                field: "server.max_body_bytes".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- database ---
        if self.database.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "database.path".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        // --- auth ---
        if self.auth.header.trim().is_empty() {
            errors.push(ValidationError {
                field: "auth.header".into(),
                message: "must not be empty".into(),
            });
        }
        if matches!(self.auth.root_token.as_deref(), Some(t) if t.len() < 16) {
            errors.push(ValidationError {
                field: "auth.root_token".into(),
                message: "must be at least 16 characters".into(),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use optin_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .server_bind("0.0.0.0:8080")
///     .logging_level("debug")
///     .silent_accept_failures(false)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn server_bind(mut self, bind: impl Into<String>) -> Self {
        self.config.server.bind = bind.into();
        self
    }

    pub fn max_body_bytes(mut self, max: usize) -> Self {
        self.config.server.max_body_bytes = max;
        self
    }

    pub fn database_path(mut self, path: PathBuf) -> Self {
        self.config.database.path = path;
        self
    }

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_json(mut self, json: bool) -> Self {
        self.config.logging.json = json;
        self
    }

    pub fn auth_root_token(mut self, token: impl Into<String>) -> Self {
        self.config.auth.root_token = Some(token.into());
        self
    }

    pub fn auth_header(mut self, header: impl Into<String>) -> Self {
        self.config.auth.header = header.into();
        self
    }

    pub fn silent_accept_failures(mut self, silent: bool) -> Self {
        self.config.consent.silent_accept_failures = silent;
        self
    }

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn default_config_has_sensible_values() {
        let cfg = Config::default();
        assert_eq!(cfg.server.bind, "127.0.0.1:3000");
        assert_eq!(cfg.server.max_body_bytes, 65536);
        assert!(cfg.database.path.ends_with("optin/optin.db"));
        assert_eq!(cfg.logging.level, "info");
        assert!(!cfg.logging.json);
        assert!(cfg.auth.root_token.is_none());
        assert_eq!(cfg.auth.header, "X-Optin-Token");
        assert!(cfg.consent.silent_accept_failures);
    }

    #[test]
    fn default_config_passes_validation() {
        let errors = Config::default().validate();
        assert!(errors.is_empty(), "unexpected validation errors: {errors:?}");
    }

    #[test]
    fn load_from_yaml_file() {
        let yaml = r#"
server:
  bind: 0.0.0.0:8080
  max_body_bytes: 1024
database:
  path: /tmp/optin-test.db
logging:
  level: debug
  json: true
auth:
  root_token: "0123456789abcdef0123"
  header: X-Api-Key
consent:
  silent_accept_failures: false
"#;
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.server.bind, "0.0.0.0:8080");
        assert_eq!(cfg.server.max_body_bytes, 1024);
        assert_eq!(cfg.database.path, PathBuf::from("/tmp/optin-test.db"));
        assert_eq!(cfg.logging.level, "debug");
        assert!(cfg.logging.json);
        assert_eq!(cfg.auth.root_token.as_deref(), Some("0123456789abcdef0123"));
        assert_eq!(cfg.auth.header, "X-Api-Key");
        assert!(!cfg.consent.silent_accept_failures);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn partial_yaml_uses_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"logging:\n  level: warn\n").unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).unwrap();
        assert_eq!(cfg.logging.level, "warn");
        assert_eq!(cfg.server.bind, "127.0.0.1:3000");
        assert!(cfg.consent.silent_accept_failures);
    }

    #[test]
    fn load_or_default_on_missing_file() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/optin/config.yaml"));
        assert_eq!(cfg.server.bind, "127.0.0.1:3000");
    }

    #[test]
    fn validate_reports_all_errors() {
        let cfg = ConfigBuilder::new()
            .server_bind("not an address")
            .max_body_bytes(0)
            .logging_level("loud")
            .auth_header(" ")
            .auth_root_token("short")
            .build();
        let fields: Vec<_> = cfg.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "server.bind",
                "server.max_body_bytes",
                "logging.level",
                "auth.header",
                "auth.root_token"
            ]
        );
    }

    #[test]
    fn builder_validated_ok() {
        let cfg = ConfigBuilder::new()
            .server_bind("127.0.0.1:0")
            .database_path(PathBuf::from("/tmp/x.db"))
            .build_validated()
            .unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:0");
    }
}
