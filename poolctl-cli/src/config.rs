use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use poolctl_core::config::config_dir;
use poolctl_core::PoolctlConfig;

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a commented config template
    Init(InitArgs),
    /// Print the effective configuration as TOML
    Show,
    /// Show config file path
    Path,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Force overwrite existing config
    #[arg(long, short)]
    pub force: bool,
}

pub fn run_config(args: ConfigArgs, config_path: &Path) -> Result<()> {
    match args.command {
        ConfigCommands::Init(args) => run_init(args, config_path),
        ConfigCommands::Show => run_show(config_path),
        ConfigCommands::Path => {
            println!("{}", config_path.display());
            Ok(())
        }
    }
}

fn run_init(args: InitArgs, config_path: &Path) -> Result<()> {
    if config_path.exists() && !args.force {
        anyhow::bail!(
            "Config already exists at {:?}\n\nUse --force to overwrite",
            config_path
        );
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(config_path, include_str!("../config.template.toml"))
        .context(format!("Failed to write config file: {:?}", config_path))?;

    println!("Created config at: {}", config_path.display());
    Ok(())
}

fn run_show(config_path: &Path) -> Result<()> {
    let config = PoolctlConfig::load_from(config_path)?;
    let toml_str =
        toml::to_string_pretty(&config).context("Failed to serialize config to TOML")?;
    print!("{}", toml_str);
    Ok(())
}

/// Load environment variables from .env files, returning the files read
///
/// The current directory wins over ~/.poolctl/.env; variables already in the
/// environment are never overwritten. Runs before tracing is initialized, so
/// the caller does the logging.
pub fn load_dotenv() -> Vec<String> {
    let mut loaded_from = Vec::new();

    if let Ok(path) = dotenvy::dotenv() {
        loaded_from.push(path.display().to_string());
    }

    let env_file = config_dir().join(".env");
    if env_file.exists() && dotenvy::from_path(&env_file).is_ok() {
        loaded_from.push(env_file.display().to_string());
    }

    loaded_from
}
