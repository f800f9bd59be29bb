//! `poolctl replay`: rebuild lock state from the store and report it

use anyhow::Result;
use clap::Parser;
use poolctl_core::{BootstrapReport, SkipReason};

use super::Session;

#[derive(Parser, Debug)]
pub struct ReplayArgs {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Exit with an error if any schema or table failed to replay
    #[arg(long)]
    pub strict: bool,
}

pub async fn run_replay(args: ReplayArgs, session: &Session) -> Result<()> {
    let (_registry, report) = session.bootstrap().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&report));
    }

    if args.strict && !report.is_clean() {
        anyhow::bail!("{} schema(s)/table(s) failed to replay", report.failures.len());
    }
    Ok(())
}

fn render_report(report: &BootstrapReport) -> String {
    let mut out = String::new();

    let width = report
        .pools
        .iter()
        .map(|p| p.name.len())
        .max()
        .unwrap_or(0)
        .max("POOL".len());

    out.push_str(&format!("{:<width$}  {:>12}  {:>12}\n", "POOL", "MAX_ID", "LOCKED"));
    for pool in &report.pools {
        out.push_str(&format!(
            "{:<width$}  {:>12}  {:>12}\n",
            pool.name, pool.max_id, pool.locked
        ));
    }

    for skipped in &report.skipped {
        let why = match skipped.reason {
            SkipReason::NoLockedColumn => "no locked column",
            SkipReason::NoLockedRows => "no locked rows",
        };
        out.push_str(&format!("skipped {}: {}\n", skipped.table, why));
    }

    for failure in &report.failures {
        out.push_str(&format!("failed: {}\n", failure));
    }

    out.push_str(&format!(
        "{} pool(s), {} locked id(s), {} skipped, {} failed\n",
        report.pools.len(),
        report.locked_total(),
        report.skipped.len(),
        report.failures.len()
    ));
    out
}
