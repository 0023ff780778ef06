use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};
use crate::money::MoneyFormat;

/// Configuration for the expensectl server and CLI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpensesConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub expenses: ListConfig,
    pub money: MoneyFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub cors_permissive: bool,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3030".to_string(),
            cors_permissive: false,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

/// List sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    /// Items per page on paginated lists
    pub page_size: u32,
    /// Items shown on the dashboard and category previews
    pub index_count: u32,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            page_size: 25,
            index_count: 10,
        }
    }
}

impl ExpensesConfig {
    /// Config file path: ~/.expensectl/config.toml
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".expensectl/config.toml")
    }

    /// Load a config file and apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content).map_err(|source| CoreError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        config.apply_env_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    /// Load the default config file, falling back to defaults when it is missing.
    pub fn load_or_default() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            return Self::load_from(&path);
        }
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        let mut config = Self::default();
        config.apply_env_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    /// Override values from `DATABASE_URL` and `EXPENSECTL_BIND`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            self.database.url = Some(url);
        }
        if let Some(bind) = lookup("EXPENSECTL_BIND").filter(|v| !v.is_empty()) {
            self.server.bind = bind;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.expenses.page_size == 0 {
            return Err(CoreError::config("expenses.page_size must be at least 1"));
        }
        if self.database.max_connections == 0 {
            return Err(CoreError::config("database.max_connections must be at least 1"));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CoreError::config(format!("cannot serialize config: {e}")))
    }

    /// Write the config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}
