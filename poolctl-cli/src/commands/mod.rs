//! Command implementations for poolctl CLI

pub mod next;
pub mod replay;

pub use next::run_next;
pub use replay::run_replay;

use anyhow::{Context, Result};
use poolctl_core::{bootstrap_registry, BootstrapReport, PoolRegistry, PoolctlConfig};
use poolctl_store::PgLockSource;

/// Effective settings shared by the database-backed commands
#[derive(Debug, Clone)]
pub struct Session {
    pub config: PoolctlConfig,
    /// From --database-url / DATABASE_URL; wins over the config file
    pub database_url: Option<String>,
}

impl Session {
    pub fn database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .or(self.config.store.database_url.as_deref())
            .filter(|url| !url.trim().is_empty())
            .context(
                "DATABASE_URL not set. Set via --database-url, DATABASE_URL env, \
                 or store.database_url in the config file",
            )
    }

    /// Connect to the store and rebuild every pool from it.
    pub async fn bootstrap(&self) -> Result<(PoolRegistry, BootstrapReport)> {
        let database_url = self.database_url()?;
        let source = PgLockSource::connect(database_url, &self.config.store)
            .await
            .context("Failed to connect to the database")?;

        let (registry, report) = bootstrap_registry(&source, &self.config.bootstrap).await;
        source.close().await;

        Ok((registry, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(flag: Option<&str>, file: Option<&str>) -> Session {
        let mut config = PoolctlConfig::default();
        config.store.database_url = file.map(String::from);
        Session {
            config,
            database_url: flag.map(String::from),
        }
    }

    #[test]
    fn flag_wins_over_config_file() {
        let s = session(Some("postgres://flag/db"), Some("postgres://file/db"));
        assert_eq!(s.database_url().unwrap(), "postgres://flag/db");
    }

    #[test]
    fn config_file_used_without_flag() {
        let s = session(None, Some("postgres://file/db"));
        assert_eq!(s.database_url().unwrap(), "postgres://file/db");
    }

    #[test]
    fn missing_or_blank_url_is_an_error() {
        assert!(session(None, None).database_url().is_err());
        // An unset ${DATABASE_URL} in the config expands to an empty string
        assert!(session(None, Some("")).database_url().is_err());
    }
}
