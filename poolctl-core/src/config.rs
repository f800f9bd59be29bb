use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Centralized configuration for poolctl
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolctlConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

/// Connection and column naming for the store of record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Connection string; `${VAR}` references are expanded from the environment
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Row id column shared by every pool table
    #[serde(default = "default_id_column")]
    pub id_column: String,

    /// Boolean column marking a row as claimed
    #[serde(default = "default_locked_column")]
    pub locked_column: String,

    /// Schemas never scanned for pools
    #[serde(default = "default_system_schemas")]
    pub system_schemas: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Locked ids fetched per page during replay
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_max_connections() -> u32 {
    5
}

fn default_id_column() -> String {
    "rid".to_string()
}

fn default_locked_column() -> String {
    "locked".to_string()
}

fn default_system_schemas() -> Vec<String> {
    ["information_schema", "pg_catalog", "pg_toast", "public"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_batch_size() -> usize {
    10_000
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: default_max_connections(),
            id_column: default_id_column(),
            locked_column: default_locked_column(),
            system_schemas: default_system_schemas(),
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

impl PoolctlConfig {
    /// Load config from an explicit path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {:?}", path))?;

        let mut config: Self =
            toml::from_str(&content).context("Failed to parse config file (invalid TOML)")?;

        config.expand_variables();
        config.validate()?;

        Ok(config)
    }

    /// Get config file path: ~/.poolctl/config.toml
    pub fn config_path() -> PathBuf {
        config_dir().join("config.toml")
    }

    /// Expand ${VAR} references in the database URL
    fn expand_variables(&mut self) {
        if let Some(url) = self.store.database_url.take() {
            self.store.database_url = Some(expand_env(&url));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.bootstrap.batch_size == 0 {
            anyhow::bail!("bootstrap.batch_size must be greater than zero");
        }
        if self.store.max_connections == 0 {
            anyhow::bail!("store.max_connections must be greater than zero");
        }
        if self.store.id_column.trim().is_empty() || self.store.locked_column.trim().is_empty() {
            anyhow::bail!("store.id_column and store.locked_column cannot be empty");
        }
        Ok(())
    }
}

/// Get the poolctl config directory path (~/.poolctl)
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".poolctl")
}

/// Replace `${VAR}` with the value of the environment variable (empty if unset).
fn expand_env(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                result.push_str(&env::var(&after[..end]).unwrap_or_default());
                rest = &after[end + 1..];
            }
            None => {
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    result.push_str(rest);
    result
}
