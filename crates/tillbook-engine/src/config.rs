//! # Engine Configuration
//!
//! Configuration for the engine, its database and its side-effect sinks.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TILLBOOK_DATABASE_PATH=/var/lib/tillbook/tillbook.db               │
//! │     TILLBOOK_INVOICE_PREFIX=INV                                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tillbook/tillbook.toml (Linux)                           │
//! │     ~/Library/Application Support/com.tillbook.tillbook/tillbook.toml  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # tillbook.toml
//! [database]
//! path = "/var/lib/tillbook/tillbook.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [invoice]
//! prefix = "INV"
//!
//! [logging]
//! filter = "info,tillbook=debug,sqlx=warn"
//!
//! [sinks]
//! event = "outbox"   # tracing | outbox | none
//! audit = "database" # tracing | database | none
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tillbook_core::invoice::validate_prefix;
use tillbook_core::DEFAULT_INVOICE_PREFIX;
use tillbook_db::DbConfig;
use tracing::{debug, info, warn};

use crate::error::ConfigError;

// =============================================================================
// Sink Selection
// =============================================================================

/// Where domain events go after commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSinkKind {
    /// Log each event at `info`.
    #[default]
    Tracing,
    /// Queue in `event_outbox` for a publisher process.
    Outbox,
    /// Drop events.
    None,
}

impl std::str::FromStr for EventSinkKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tracing" | "log" => Ok(EventSinkKind::Tracing),
            "outbox" => Ok(EventSinkKind::Outbox),
            "none" | "off" => Ok(EventSinkKind::None),
            other => Err(ConfigError::Invalid(format!(
                "Unknown event sink: '{}'. Valid options: tracing, outbox, none",
                other
            ))),
        }
    }
}

/// Where audit entries go after commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    #[default]
    Tracing,
    /// Append to the `audit_log` table.
    Database,
    None,
}

impl std::str::FromStr for AuditSinkKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tracing" | "log" => Ok(AuditSinkKind::Tracing),
            "database" | "db" => Ok(AuditSinkKind::Database),
            "none" | "off" => Ok(AuditSinkKind::None),
            other => Err(ConfigError::Invalid(format!(
                "Unknown audit sink: '{}'. Valid options: tracing, database, none",
                other
            ))),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a unit waits for the write lock before `CommitConflict`.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("com", "tillbook", "tillbook")
        .map(|dirs| dirs.data_dir().join("tillbook.db"))
        .unwrap_or_else(|| PathBuf::from("tillbook.db"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceSettings {
    /// Letters before `{YY}{MM}{seq}`.
    #[serde(default = "default_invoice_prefix")]
    pub prefix: String,
}

fn default_invoice_prefix() -> String {
    DEFAULT_INVOICE_PREFIX.to_string()
}

impl Default for InvoiceSettings {
    fn default() -> Self {
        InvoiceSettings {
            prefix: default_invoice_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info,tillbook=debug,sqlx=warn".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_log_filter(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SinkSettings {
    #[serde(default)]
    pub event: EventSinkKind,

    #[serde(default)]
    pub audit: AuditSinkKind,
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub invoice: InvoiceSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub sinks: SinkSettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (tillbook.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load engine config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> Result<(), ConfigError> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::SaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        info!(?path, "Engine config saved");
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.database.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "database.busy_timeout_ms must be greater than 0".into(),
            ));
        }

        validate_prefix(&self.invoice.prefix)
            .map_err(|e| ConfigError::Invalid(format!("invoice.prefix: {}", e)))?;

        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.filter must not be empty".into()));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `TILLBOOK_*` overrides read through `lookup`.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("TILLBOOK_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("TILLBOOK_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring non-numeric TILLBOOK_MAX_CONNECTIONS"),
            }
        }

        if let Some(ms) = lookup("TILLBOOK_BUSY_TIMEOUT_MS") {
            match ms.parse::<u64>() {
                Ok(n) => self.database.busy_timeout_ms = n,
                Err(_) => warn!(value = %ms, "Ignoring non-numeric TILLBOOK_BUSY_TIMEOUT_MS"),
            }
        }

        if let Some(prefix) = lookup("TILLBOOK_INVOICE_PREFIX") {
            debug!(prefix = %prefix, "Overriding invoice prefix from environment");
            self.invoice.prefix = prefix;
        }

        if let Some(filter) = lookup("TILLBOOK_LOG") {
            self.logging.filter = filter;
        }

        if let Some(kind) = lookup("TILLBOOK_EVENT_SINK") {
            match kind.parse() {
                Ok(parsed) => self.sinks.event = parsed,
                Err(e) => warn!(error = %e, "Ignoring TILLBOOK_EVENT_SINK"),
            }
        }

        if let Some(kind) = lookup("TILLBOOK_AUDIT_SINK") {
            match kind.parse() {
                Ok(parsed) => self.sinks.audit = parsed,
                Err(e) => warn!(error = %e, "Ignoring TILLBOOK_AUDIT_SINK"),
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tillbook", "tillbook")
            .map(|dirs| dirs.config_dir().join("tillbook.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Pool settings for [`tillbook_db::Database::new`].
    pub fn to_db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }

    pub fn invoice_prefix(&self) -> &str {
        &self.invoice.prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.invoice_prefix(), "INV");
        assert_eq!(config.sinks.event, EventSinkKind::Tracing);
        assert_eq!(config.sinks.audit, AuditSinkKind::Tracing);
    }

    #[test]
    fn test_toml_sections_fill_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [database]
            path = "/tmp/tb.db"

            [sinks]
            event = "outbox"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/tb.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.sinks.event, EventSinkKind::Outbox);
        assert_eq!(config.sinks.audit, AuditSinkKind::Tracing);
        assert_eq!(config.invoice.prefix, "INV");
    }

    #[test]
    fn test_env_overrides_win() {
        let mut config = EngineConfig::default();
        let vars = env(&[
            ("TILLBOOK_DATABASE_PATH", "/data/shop.db"),
            ("TILLBOOK_MAX_CONNECTIONS", "9"),
            ("TILLBOOK_BUSY_TIMEOUT_MS", "250"),
            ("TILLBOOK_INVOICE_PREFIX", "RCP"),
            ("TILLBOOK_EVENT_SINK", "none"),
            ("TILLBOOK_AUDIT_SINK", "db"),
        ]);
        config.apply_overrides(|k| vars.get(k).cloned());

        assert_eq!(config.database.path, PathBuf::from("/data/shop.db"));
        assert_eq!(config.database.max_connections, 9);
        assert_eq!(config.invoice_prefix(), "RCP");
        assert_eq!(config.sinks.event, EventSinkKind::None);
        assert_eq!(config.sinks.audit, AuditSinkKind::Database);

        let db = config.to_db_config();
        assert_eq!(db.max_connections, 9);
        assert_eq!(db.busy_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_bad_env_values_are_ignored() {
        let mut config = EngineConfig::default();
        let vars = env(&[
            ("TILLBOOK_MAX_CONNECTIONS", "lots"),
            ("TILLBOOK_EVENT_SINK", "kafka"),
        ]);
        config.apply_overrides(|k| vars.get(k).cloned());

        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.sinks.event, EventSinkKind::Tracing);
    }

    #[test]
    fn test_validation() {
        let mut config = EngineConfig::default();
        config.invoice.prefix = "inv-".to_string();
        assert!(config.validate().is_err());

        config.invoice.prefix = "INV".to_string();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&EngineConfig::default()).unwrap();
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[sinks]"));
    }
}
