//! `poolctl next`: first free row id of a pool after replay

use anyhow::{Context, Result};
use clap::Parser;
use poolctl_core::{normalize_pool_name, PoolRegistry};
use serde::Serialize;

use super::Session;

#[derive(Parser, Debug)]
pub struct NextArgs {
    /// Pool name (SCHEMA.TABLE, case-insensitive)
    pub pool: String,

    /// Only consider ids strictly greater than this one
    #[arg(long)]
    pub after: Option<i64>,

    /// Print the answer as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct NextFree {
    pool: String,
    id: i64,
    /// True when the id lies past max_id, i.e. the pool must grow
    past_end: bool,
}

pub async fn run_next(args: NextArgs, session: &Session) -> Result<()> {
    let (registry, _report) = session.bootstrap().await?;
    let answer = next_free(&registry, &args.pool, args.after)?;

    if args.json {
        println!("{}", serde_json::to_string(&answer)?);
    } else {
        println!("{}", answer.id);
    }
    Ok(())
}

fn next_free(registry: &PoolRegistry, pool: &str, after: Option<i64>) -> Result<NextFree> {
    let id = match after {
        Some(after) => registry.first_bigger_unlocked_id(pool, after),
        None => registry.first_unlocked_id(pool),
    }
    .with_context(|| format!("Cannot look up next free id in pool {pool}"))?;

    let max_id = registry.stats(pool)?.max_id;
    Ok(NextFree {
        pool: normalize_pool_name(pool),
        id,
        past_end: id > max_id,
    })
}
