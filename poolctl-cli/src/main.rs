//! poolctl CLI - row lock tracking for named pools
//!
//! Entry point for the `poolctl` command-line tool:
//! - Rebuild lock state from PostgreSQL and report it (`replay`)
//! - Find the next free row id of a pool (`next`)
//! - Manage configuration (`config`)
//! - Generate shell completions (`completions`)

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use poolctl_core::PoolctlConfig;
use tracing::debug;

mod commands;
mod config;
mod tracing_setup;

use commands::Session;

#[derive(Parser, Debug)]
#[command(
    name = "poolctl",
    author,
    version,
    about = "Track locked and free row ids across named pools",
    long_about = "Rebuild in-memory lock state for every pool table in a PostgreSQL database \
                  and answer \"next free id\" queries against it."
)]
struct Cli {
    /// Config file (default: ~/.poolctl/config.toml)
    #[arg(long, global = true, env = "POOLCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Database URL (overrides the config file)
    #[arg(long, global = true, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Export traces over OTLP (requires the telemetry feature)
    #[arg(long, global = true)]
    otel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay lock state from the database and print every pool
    Replay(commands::replay::ReplayArgs),
    /// Print the first unlocked id of a pool
    Next(commands::next::NextArgs),
    /// Manage poolctl configuration (init, show, path)
    Config(config::ConfigArgs),
    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)] // PowerShell is a proper noun, not a suffix
enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env must be loaded before clap reads env-backed flags
    let env_files = config::load_dotenv();
    let cli = Cli::parse();

    tracing_setup::init(&tracing_setup::TracingConfig {
        debug: cli.debug,
        otel: cli.otel,
    })
    .ok();

    if env_files.is_empty() {
        debug!("No .env files found (current dir or ~/.poolctl)");
    } else {
        debug!("Loaded environment from: {}", env_files.join(", "));
    }

    let config_path = cli.config.unwrap_or_else(PoolctlConfig::config_path);

    let result = match cli.command {
        Commands::Replay(args) => {
            let session = load_session(&config_path, cli.database_url)?;
            commands::run_replay(args, &session).await
        }
        Commands::Next(args) => {
            let session = load_session(&config_path, cli.database_url)?;
            commands::run_next(args, &session).await
        }
        Commands::Config(args) => config::run_config(args, &config_path),
        Commands::Completions(args) => run_completions(args),
    };

    tracing_setup::shutdown_otel();
    result
}

fn load_session(config_path: &std::path::Path, database_url: Option<String>) -> Result<Session> {
    Ok(Session {
        config: PoolctlConfig::load_from(config_path)?,
        database_url,
    })
}

fn run_completions(args: CompletionsArgs) -> Result<()> {
    use clap_complete::{generate, Shell as CompletionShell};
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    let shell = match args.shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    };

    generate(shell, &mut cmd, bin_name, &mut io::stdout());

    Ok(())
}
