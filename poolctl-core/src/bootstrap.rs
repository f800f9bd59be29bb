//! Startup replay of lock state from the store of record.
//!
//! Every non-system table with a boolean "locked" column and at least one
//! locked row becomes a pool named `SCHEMA.TABLE`. Its locked ids are paged in
//! ascending order and replayed into a fresh tracker, which is registered only
//! once the whole table has been read. A failing schema or table is logged,
//! recorded in the report and skipped; the pass carries on with the rest.

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::BootstrapConfig;
use crate::error::{PoolError, Result};
use crate::registry::{normalize_pool_name, PoolRegistry};
use crate::source::{LockSource, TableRef};
use crate::tracker::{LockTracker, PoolStats};

/// Why a table was not turned into a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoLockedColumn,
    NoLockedRows,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedTable {
    pub table: String,
    pub reason: SkipReason,
}

/// Outcome of one replay pass
#[derive(Debug, Default, Clone, Serialize)]
pub struct BootstrapReport {
    pub pools: Vec<PoolStats>,
    pub skipped: Vec<SkippedTable>,
    pub failures: Vec<PoolError>,
}

impl BootstrapReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn locked_total(&self) -> u64 {
        self.pools.iter().map(|p| p.locked).sum()
    }
}

enum TableOutcome {
    Replayed(LockTracker),
    Skipped(SkipReason),
}

/// Build a registry from scratch by replaying `source`.
pub async fn bootstrap_registry<S: LockSource>(
    source: &S,
    config: &BootstrapConfig,
) -> (PoolRegistry, BootstrapReport) {
    let registry = PoolRegistry::new();
    let report = replay(source, &registry, config).await;
    (registry, report)
}

/// Replay every eligible table of `source` into `registry`.
#[instrument(skip_all, fields(batch_size = config.batch_size))]
pub async fn replay<S: LockSource>(
    source: &S,
    registry: &PoolRegistry,
    config: &BootstrapConfig,
) -> BootstrapReport {
    info!("Bootstrap replay starting");
    let mut report = BootstrapReport::default();
    let batch_size = config.batch_size.max(1);

    let schemas = match source.list_non_system_schemas().await {
        Ok(schemas) => schemas,
        Err(e) => {
            let err = PoolError::bootstrap("schema listing", e);
            warn!(error = %err, "Bootstrap aborted: schemas unavailable");
            report.failures.push(err);
            return report;
        }
    };

    for schema in schemas {
        let tables = match source.list_tables(&schema).await {
            Ok(tables) => tables,
            Err(e) => {
                let err = PoolError::bootstrap(format!("schema {schema}"), e);
                warn!(error = %err, "Skipping schema");
                report.failures.push(err);
                continue;
            }
        };

        for table in tables {
            let table = TableRef::new(schema.as_str(), table);
            match replay_table(source, &table, batch_size).await {
                Ok(TableOutcome::Replayed(tracker)) => {
                    let stats = tracker.stats();
                    info!(
                        pool = %stats.name,
                        max_id = stats.max_id,
                        locked = stats.locked,
                        "Replayed pool"
                    );
                    registry.insert_tracker(tracker);
                    report.pools.push(stats);
                }
                Ok(TableOutcome::Skipped(reason)) => {
                    debug!(table = %table, ?reason, "Skipping table");
                    report.skipped.push(SkippedTable {
                        table: table.full_name(),
                        reason,
                    });
                }
                Err(err) => {
                    warn!(error = %err, "Skipping table");
                    report.failures.push(err);
                }
            }
        }
    }

    info!(
        pools = report.pools.len(),
        skipped = report.skipped.len(),
        failures = report.failures.len(),
        "Bootstrap replay finished"
    );
    report
}

async fn replay_table<S: LockSource>(
    source: &S,
    table: &TableRef,
    batch_size: usize,
) -> Result<TableOutcome> {
    let scope = format!("table {table}");
    let fail = |e: S::Error| PoolError::bootstrap(scope.as_str(), e);

    if !source
        .has_locked_column(&table.schema, &table.table)
        .await
        .map_err(fail)?
    {
        return Ok(TableOutcome::Skipped(SkipReason::NoLockedColumn));
    }

    let locked = source.count_locked(table).await.map_err(fail)?;
    if locked <= 0 {
        return Ok(TableOutcome::Skipped(SkipReason::NoLockedRows));
    }

    let max_id = source.max_id(table).await.map_err(fail)?;
    let tracker = LockTracker::new(normalize_pool_name(&table.full_name()), max_id)
        .map_err(|e| PoolError::bootstrap(scope.as_str(), e))?;

    let mut cursor = 0i64;
    let mut replayed = 0i64;
    loop {
        let page = source
            .page_locked_ids(table, cursor, batch_size)
            .await
            .map_err(fail)?;

        for &id in &page {
            if id <= cursor {
                return Err(PoolError::bootstrap(
                    scope.as_str(),
                    format!("page not ascending: id {id} after {cursor}"),
                ));
            }
            tracker
                .lock(id)
                .map_err(|e| PoolError::bootstrap(scope.as_str(), e))?;
            cursor = id;
        }
        replayed += page.len() as i64;

        if page.len() < batch_size {
            break;
        }
    }

    if replayed != locked {
        warn!(
            table = %table,
            counted = locked,
            replayed,
            "Locked row count changed during replay"
        );
    }

    Ok(TableOutcome::Replayed(tracker))
}
