//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/nestedset/nestedset.toml`
//! 3. Explicit config file passed with `--config`
//! 4. Environment variables: `NESTEDSET_*` prefix

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Prefix of the environment variables that override settings.
pub const ENV_PREFIX: &str = "NESTEDSET";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("environment: {0}")]
    Environment(String),

    #[error("invalid setting {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Settings for the `nestedset` binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// SQLite database file
    pub database: PathBuf,
    /// Table holding the nodes
    pub table: String,
    /// Bound on waiting for a tree lock, in milliseconds
    pub lock_timeout_ms: u64,
    /// Depth limit for `show` when none is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_max_level: Option<u32>,
}

/// Raw settings for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub database: Option<PathBuf>,
    pub table: Option<String>,
    pub lock_timeout_ms: Option<u64>,
    pub default_max_level: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: default_database(),
            table: "categories".into(),
            lock_timeout_ms: 5_000,
            default_max_level: None,
        }
    }
}

fn default_database() -> PathBuf {
    ProjectDirs::from("", "", "nestedset")
        .map(|dirs| dirs.data_dir().join("nestedset.db"))
        .unwrap_or_else(|| PathBuf::from("nestedset.db"))
}

/// Get the XDG config directory for nestedset.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "nestedset").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("nestedset.toml"))
}

/// Load a TOML file into RawSettings for merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, SettingsError> {
    let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|e| SettingsError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn env_err(e: ConfigError) -> SettingsError {
    SettingsError::Environment(e.to_string())
}

impl Settings {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            database: overlay
                .database
                .clone()
                .unwrap_or_else(|| self.database.clone()),
            table: overlay.table.clone().unwrap_or_else(|| self.table.clone()),
            lock_timeout_ms: overlay.lock_timeout_ms.unwrap_or(self.lock_timeout_ms),
            default_max_level: overlay.default_max_level.or(self.default_max_level),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Optional explicit config file (`--config`); must exist
    pub fn load(config_file: Option<&Path>) -> Result<Self, SettingsError> {
        Self::load_layers(global_config_path().as_deref(), config_file, ENV_PREFIX)
    }

    /// Load from explicit layer sources.
    ///
    /// A missing global file is skipped; a missing explicit file is an error.
    pub fn load_layers(
        global: Option<&Path>,
        config_file: Option<&Path>,
        env_prefix: &str,
    ) -> Result<Self, SettingsError> {
        let mut current = Self::default();

        if let Some(global_path) = global.filter(|p| p.exists()) {
            debug!("Loading global config: {}", global_path.display());
            current = current.merge_with(&load_raw_settings(global_path)?);
        }

        if let Some(path) = config_file {
            debug!("Loading config file: {}", path.display());
            current = current.merge_with(&load_raw_settings(path)?);
        }

        current = Self::apply_env_overrides(current, env_prefix)?;
        current.validate()?;
        Ok(current)
    }

    /// Apply `<PREFIX>_*` environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self, env_prefix: &str) -> Result<Self, SettingsError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix(env_prefix)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(env_err)?;

        if let Ok(val) = config.get_string("database") {
            settings.database = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("table") {
            settings.table = val;
        }
        match config.get::<u64>("lock_timeout_ms") {
            Ok(val) => settings.lock_timeout_ms = val,
            Err(ConfigError::NotFound(_)) => {}
            Err(e) => return Err(env_err(e)),
        }
        match config.get::<u32>("default_max_level") {
            Ok(val) => settings.default_max_level = Some(val),
            Err(ConfigError::NotFound(_)) => {}
            Err(e) => return Err(env_err(e)),
        }

        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        let valid = self
            .table
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && self.table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(SettingsError::Invalid {
                key: "table",
                message: format!("'{}' is not a plain SQL identifier", self.table),
            });
        }
        if self.lock_timeout_ms == 0 {
            return Err(SettingsError::Invalid {
                key: "lock_timeout_ms",
                message: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// Serialize the effective settings.
    pub fn to_toml(&self) -> Result<String, SettingsError> {
        toml::to_string_pretty(self).map_err(|e| SettingsError::Invalid {
            key: "settings",
            message: e.to_string(),
        })
    }

    /// Commented template for a new config file.
    pub fn template() -> String {
        r#"# nestedset configuration

# SQLite database file
# database = "~/.local/share/nestedset/nestedset.db"

# Table holding the nodes
# table = "categories"

# How long a write waits for the tree lock before giving up (ms)
# lock_timeout_ms = 5000

# Depth limit for `show` when --max-level is not given
# default_max_level = 3
"#
        .to_string()
    }
}
