//! # Server Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CAFE_BIND_ADDR=0.0.0.0:8080                                        │
//! │     CAFE_ADMIN_PIN=...                                                 │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     $CAFE_CONFIG, or                                                   │
//! │     ~/.config/cafe-pos/cafe.toml (Linux)                               │
//! │     ~/Library/Application Support/com.cafe.cafe-pos/cafe.toml (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # cafe.toml
//! [server]
//! bind_addr = "0.0.0.0:8080"
//!
//! [database]
//! path = "/var/lib/cafe/cafe.db"
//! max_connections = 5
//!
//! [store]
//! name = "Café Central"
//! tax_rate_bps = 1900
//! low_stock_threshold = 5
//!
//! [auth]
//! admin_pin_hash = "$argon2id$v=19$..."
//! max_attempts = 3
//! lockout_secs = 60
//! session_ttl_hours = 24
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use cafe_core::{
    DEFAULT_TAX_RATE_BPS, LOW_STOCK_THRESHOLD, PIN_MAX_ATTEMPTS, PIN_SESSION_TTL_HOURS,
};

const CONFIG_FILE_NAME: &str = "cafe.toml";
const DATABASE_FILE_NAME: &str = "cafe.db";

/// Shortest PIN accepted from configuration.
pub const MIN_PIN_LENGTH: usize = 4;

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the HTTP listener binds to.
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite file, or `:memory:`.
    pub path: PathBuf,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Printed at the top of every receipt.
    pub name: String,
    /// VAT share of tax-inclusive prices, in basis points.
    pub tax_rate_bps: u32,
    pub low_stock_threshold: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            name: "Cafe".to_string(),
            tax_rate_bps: DEFAULT_TAX_RATE_BPS,
            low_stock_threshold: LOW_STOCK_THRESHOLD,
        }
    }
}

/// Admin PIN gate settings.
///
/// Either `admin_pin` (hashed at startup) or `admin_pin_hash` (argon2 PHC
/// string) must be set. The hash wins when both are present.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub admin_pin: Option<String>,
    pub admin_pin_hash: Option<String>,
    pub max_attempts: u32,
    pub lockout_secs: i64,
    pub session_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            admin_pin: None,
            admin_pin_hash: None,
            max_attempts: PIN_MAX_ATTEMPTS,
            lockout_secs: 60,
            session_ttl_hours: PIN_SESSION_TTL_HOURS,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("AuthConfig")
            .field("admin_pin", &redact(&self.admin_pin))
            .field("admin_pin_hash", &redact(&self.admin_pin_hash))
            .field("max_attempts", &self.max_attempts)
            .field("lockout_secs", &self.lockout_secs)
            .field("session_ttl_hours", &self.session_ttl_hours)
            .finish()
    }
}

// =============================================================================
// App Config
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSettings,
    pub store: StoreConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Loads defaults, then the TOML file, then environment overrides, and
    /// validates the result.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("CAFE_CONFIG")
            .ok()
            .map(PathBuf::from)
            .or_else(default_config_path);
        Self::load_with(path.as_deref(), |key| std::env::var(key).ok())
    }

    /// [`AppConfig::load`] with an explicit file and variable source.
    pub fn load_with<F>(path: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) if path.exists() => {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(path).map_err(|source| {
                    ConfigError::Read {
                        path: path.to_path_buf(),
                        source,
                    }
                })?;
                toml::from_str(&contents)?
            }
            Some(path) => {
                debug!(?path, "Config file not found, using defaults");
                AppConfig::default()
            }
            None => AppConfig::default(),
        };

        config.apply_env_overrides(env)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = env("CAFE_BIND_ADDR") {
            debug!(%addr, "Overriding bind address from environment");
            self.server.bind_addr = addr;
        }
        if let Some(path) = env("CAFE_DB_PATH") {
            debug!(%path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }
        if let Some(name) = env("CAFE_STORE_NAME") {
            self.store.name = name;
        }
        if let Some(pin) = env("CAFE_ADMIN_PIN") {
            self.auth.admin_pin = Some(pin);
        }
        if let Some(hash) = env("CAFE_ADMIN_PIN_HASH") {
            self.auth.admin_pin_hash = Some(hash);
        }
        if let Some(value) = env("CAFE_TAX_RATE_BPS") {
            self.store.tax_rate_bps = parse_var("CAFE_TAX_RATE_BPS", &value)?;
        }
        if let Some(value) = env("CAFE_LOW_STOCK_THRESHOLD") {
            self.store.low_stock_threshold = parse_var("CAFE_LOW_STOCK_THRESHOLD", &value)?;
        }
        if let Some(value) = env("CAFE_PIN_LOCKOUT_SECS") {
            self.auth.lockout_secs = parse_var("CAFE_PIN_LOCKOUT_SECS", &value)?;
        }
        if let Some(value) = env("CAFE_SESSION_TTL_HOURS") {
            self.auth.session_ttl_hours = parse_var("CAFE_SESSION_TTL_HOURS", &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let has_hash = self
            .auth
            .admin_pin_hash
            .as_deref()
            .is_some_and(|h| !h.trim().is_empty());
        match self.auth.admin_pin.as_deref() {
            _ if has_hash => {}
            Some(pin) if pin.chars().count() >= MIN_PIN_LENGTH => {}
            Some(_) => {
                return Err(ConfigError::InvalidValue(format!(
                    "admin_pin must be at least {} characters",
                    MIN_PIN_LENGTH
                )))
            }
            None => {
                return Err(ConfigError::MissingRequired(
                    "auth.admin_pin or auth.admin_pin_hash (CAFE_ADMIN_PIN)".to_string(),
                ))
            }
        }

        if self.store.tax_rate_bps > 10_000 {
            return Err(ConfigError::InvalidValue(
                "tax_rate_bps must be at most 10000".to_string(),
            ));
        }
        if self.store.low_stock_threshold < 0 {
            return Err(ConfigError::InvalidValue(
                "low_stock_threshold cannot be negative".to_string(),
            ));
        }
        if self.auth.max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "max_attempts must be greater than 0".to_string(),
            ));
        }
        if self.auth.lockout_secs <= 0 || self.auth.session_ttl_hours <= 0 {
            return Err(ConfigError::InvalidValue(
                "lockout_secs and session_ttl_hours must be positive".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "max_connections must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(format!("{}={}", key, value)))
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "cafe", "cafe-pos")
}

fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn default_database_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join(DATABASE_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(DATABASE_FILE_NAME))
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_pin_is_required() {
        let err = AppConfig::load_with(None, env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(_)));
    }

    #[test]
    fn test_env_overrides_defaults() {
        let config = AppConfig::load_with(
            None,
            env_of(&[
                ("CAFE_ADMIN_PIN", "2468"),
                ("CAFE_BIND_ADDR", "127.0.0.1:9000"),
                ("CAFE_DB_PATH", ":memory:"),
                ("CAFE_TAX_RATE_BPS", "800"),
                ("CAFE_SESSION_TTL_HOURS", "8"),
            ]),
        )
        .unwrap();

        assert_eq!(config.server.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.database.path, PathBuf::from(":memory:"));
        assert_eq!(config.store.tax_rate_bps, 800);
        assert_eq!(config.store.low_stock_threshold, LOW_STOCK_THRESHOLD);
        assert_eq!(config.auth.session_ttl_hours, 8);
        assert_eq!(config.auth.max_attempts, PIN_MAX_ATTEMPTS);
    }

    #[test]
    fn test_invalid_number_rejected() {
        let err = AppConfig::load_with(
            None,
            env_of(&[("CAFE_ADMIN_PIN", "2468"), ("CAFE_PIN_LOCKOUT_SECS", "soon")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(msg) if msg.contains("CAFE_PIN_LOCKOUT_SECS")));
    }

    #[test]
    fn test_short_pin_rejected() {
        let err = AppConfig::load_with(None, env_of(&[("CAFE_ADMIN_PIN", "12")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_toml_file_then_env() {
        let dir = std::env::temp_dir().join(format!("cafe-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cafe.toml");
        std::fs::write(
            &path,
            r#"
            [store]
            name = "Café Central"
            low_stock_threshold = 3

            [auth]
            admin_pin = "from-file"
            "#,
        )
        .unwrap();

        let config =
            AppConfig::load_with(Some(&path), env_of(&[("CAFE_STORE_NAME", "Override")])).unwrap();
        assert_eq!(config.store.name, "Override");
        assert_eq!(config.store.low_stock_threshold, 3);
        assert_eq!(config.auth.admin_pin.as_deref(), Some("from-file"));
        assert_eq!(config.store.tax_rate_bps, DEFAULT_TAX_RATE_BPS);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_debug_redacts_pin() {
        let auth = AuthConfig {
            admin_pin: Some("2468".to_string()),
            ..AuthConfig::default()
        };
        let printed = format!("{:?}", auth);
        assert!(!printed.contains("2468"));
        assert!(printed.contains("<redacted>"));
    }
}
