//! Replay against a live PostgreSQL database
//!
//! Run with: DATABASE_URL=postgres://... cargo test -p poolctl-store -- --ignored

use poolctl_core::{bootstrap_registry, BootstrapConfig, PoolError, SkipReason, StoreSettings};
use poolctl_store::PgLockSource;

const SCHEMA: &str = "poolctl_replay_test";

#[tokio::test]
#[ignore = "requires database"]
async fn replays_locked_rows_from_postgres() {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let source = PgLockSource::connect(&url, &StoreSettings::default())
        .await
        .expect("connection failed");
    let pool = source.pool().clone();

    for statement in [
        format!("DROP SCHEMA IF EXISTS {SCHEMA} CASCADE"),
        format!("CREATE SCHEMA {SCHEMA}"),
        format!("CREATE TABLE {SCHEMA}.seats (rid integer PRIMARY KEY, locked boolean NOT NULL)"),
        format!(
            "INSERT INTO {SCHEMA}.seats SELECT g, g IN (1, 2, 5) FROM generate_series(1, 10) g"
        ),
        format!("CREATE TABLE {SCHEMA}.idle (rid integer PRIMARY KEY, locked boolean NOT NULL)"),
        format!("INSERT INTO {SCHEMA}.idle VALUES (1, false)"),
        format!("CREATE TABLE {SCHEMA}.notes (rid integer PRIMARY KEY, body text)"),
        format!(
            "CREATE TABLE {SCHEMA}.shouty (rid integer PRIMARY KEY, \"Locked\" boolean NOT NULL)"
        ),
        format!("INSERT INTO {SCHEMA}.shouty VALUES (1, true)"),
    ] {
        sqlx::query(&statement)
            .execute(&pool)
            .await
            .expect("fixture setup failed");
    }

    let (registry, report) =
        bootstrap_registry(&source, &BootstrapConfig { batch_size: 2 }).await;

    let seats = format!("{SCHEMA}.seats");
    assert_eq!(registry.first_unlocked_id(&seats).unwrap(), 3);
    assert_eq!(registry.first_bigger_unlocked_id(&seats, 3).unwrap(), 4);
    assert_eq!(registry.stats(&seats).unwrap().max_id, 10);
    assert!(matches!(
        registry.lock(&format!("{SCHEMA}.idle"), 1),
        Err(PoolError::PoolNotFound { .. })
    ));
    assert!(!registry.contains(&format!("{SCHEMA}.notes")));
    // "Locked" is a different column from the configured `locked`
    let shouty = format!("{SCHEMA}.shouty");
    assert!(report
        .skipped
        .iter()
        .any(|t| t.table == shouty && t.reason == SkipReason::NoLockedColumn));
    assert!(!registry.contains(&shouty));
    assert!(report
        .pools
        .iter()
        .any(|p| p.name == seats.to_uppercase() && p.locked == 3));

    sqlx::query(&format!("DROP SCHEMA {SCHEMA} CASCADE"))
        .execute(&pool)
        .await
        .expect("fixture teardown failed");
    source.close().await;
}
