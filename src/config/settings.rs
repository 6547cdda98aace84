//! Application settings loaded from `config.toml`
//!
//! Every field has a default so the file is optional. Environment variables
//! (usually populated from `.env` by the binary) take precedence over the file.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Default location of the settings file
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Top-level configuration for the ledger service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Database connection URL understood by `SeaORM`
    pub database_url: String,
    /// Issuing company code embedded in invoice numbers
    pub company_code: String,
    /// Per-subscriber buffer of the live notification hub
    pub notification_buffer: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://data/project_ledger.sqlite?mode=rwc".to_string(),
            company_code: "CMP".to_string(),
            notification_buffer: 16,
        }
    }
}

impl AppConfig {
    /// Overrides file values with `DATABASE_URL`, `COMPANY_CODE` and
    /// `NOTIFICATION_BUFFER` when `lookup` returns them.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(code) = lookup("COMPANY_CODE") {
            self.company_code = code;
        }
        if let Some(buffer) = lookup("NOTIFICATION_BUFFER") {
            self.notification_buffer = buffer.parse().map_err(|e| Error::Config {
                message: format!("NOTIFICATION_BUFFER must be a positive integer: {e}"),
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.company_code.trim().is_empty() {
            return Err(Error::Config {
                message: "company_code cannot be empty".to_string(),
            });
        }
        if self.notification_buffer == 0 {
            return Err(Error::Config {
                message: "notification_buffer must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file {:?}: {e}", path.as_ref()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {:?}: {e}", path.as_ref()),
    })
}

/// Loads the effective configuration: `CONFIG_PATH` (or `config.toml`) if it
/// exists, defaults otherwise, then environment overrides.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let file_config = if Path::new(&path).exists() {
        debug!("Loading configuration from {}", path);
        load_config(&path)?
    } else {
        info!("No configuration file at {}, using defaults", path);
        AppConfig::default()
    };

    file_config.apply_overrides(|key| std::env::var(key).ok())
}
