//! PostgreSQL implementation of [`LockSource`].
//!
//! Discovery goes through `information_schema`; counting, max id and paging
//! run against each pool table directly using the configured id and locked
//! column names.

use async_trait::async_trait;
use poolctl_core::{LockSource, StoreSettings, TableRef};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

/// Quote an identifier for interpolation into SQL.
pub fn quote_ident(ident: &str) -> StoreResult<String> {
    if ident.is_empty() || ident.contains('\0') {
        return Err(StoreError::InvalidIdentifier(ident.to_string()));
    }
    Ok(format!("\"{}\"", ident.replace('"', "\"\"")))
}

/// Whether `schema` belongs to the database itself rather than to pools.
pub fn is_system_schema(schema: &str, configured: &[String]) -> bool {
    schema.starts_with("pg_") || configured.iter().any(|s| s.eq_ignore_ascii_case(schema))
}

/// SQL text for the per-table queries.
#[derive(Debug, Clone)]
pub struct TableQueries {
    id_column: String,
    locked_column: String,
}

impl TableQueries {
    pub fn new(id_column: impl Into<String>, locked_column: impl Into<String>) -> Self {
        Self {
            id_column: id_column.into(),
            locked_column: locked_column.into(),
        }
    }

    fn qualified(table: &TableRef) -> StoreResult<String> {
        Ok(format!(
            "{}.{}",
            quote_ident(&table.schema)?,
            quote_ident(&table.table)?
        ))
    }

    pub fn count_locked(&self, table: &TableRef) -> StoreResult<String> {
        Ok(format!(
            "SELECT COUNT(*) FROM {} WHERE {} = true",
            Self::qualified(table)?,
            quote_ident(&self.locked_column)?
        ))
    }

    pub fn max_id(&self, table: &TableRef) -> StoreResult<String> {
        Ok(format!(
            "SELECT MAX({})::bigint FROM {}",
            quote_ident(&self.id_column)?,
            Self::qualified(table)?
        ))
    }

    pub fn page_locked_ids(&self, table: &TableRef) -> StoreResult<String> {
        let id = quote_ident(&self.id_column)?;
        Ok(format!(
            "SELECT {id}::bigint FROM {} WHERE {id} > $1 AND {} = true ORDER BY {id} LIMIT $2",
            Self::qualified(table)?,
            quote_ident(&self.locked_column)?
        ))
    }
}

/// Lock source backed by a PostgreSQL database
#[derive(Clone)]
pub struct PgLockSource {
    pool: PgPool,
    queries: TableQueries,
    locked_column: String,
    system_schemas: Vec<String>,
}

impl PgLockSource {
    /// Open a connection pool sized by `settings.max_connections`.
    ///
    /// `database_url` is passed separately because the command line may
    /// override `settings.database_url`.
    pub async fn connect(database_url: &str, settings: &StoreSettings) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .connect(database_url)
            .await?;
        info!(
            max_connections = settings.max_connections,
            "connected to store"
        );
        Ok(Self::new(pool, settings))
    }

    pub fn new(pool: PgPool, settings: &StoreSettings) -> Self {
        Self {
            pool,
            queries: TableQueries::new(&settings.id_column, &settings.locked_column),
            locked_column: settings.locked_column.clone(),
            system_schemas: settings.system_schemas.clone(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close every connection; bootstrap is a one-shot pass.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl LockSource for PgLockSource {
    type Error = StoreError;

    async fn list_non_system_schemas(&self) -> StoreResult<Vec<String>> {
        let schemas: Vec<String> = sqlx::query_scalar(
            "SELECT schema_name::text FROM information_schema.schemata ORDER BY schema_name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(schemas
            .into_iter()
            .filter(|schema| !is_system_schema(schema, &self.system_schemas))
            .collect())
    }

    async fn list_tables(&self, schema: &str) -> StoreResult<Vec<String>> {
        let tables: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = $1 AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#,
        )
        .bind(schema)
        .fetch_all(&self.pool)
        .await?;

        debug!(schema, count = tables.len(), "listed tables");
        Ok(tables)
    }

    /// Column names match exactly, the way the per-table queries quote them.
    async fn has_locked_column(&self, schema: &str, table: &str) -> StoreResult<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM information_schema.columns
            WHERE table_schema = $1
              AND table_name = $2
              AND column_name = $3
              AND data_type = 'boolean'
            "#,
        )
        .bind(schema)
        .bind(table)
        .bind(&self.locked_column)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn count_locked(&self, table: &TableRef) -> StoreResult<i64> {
        let sql = self.queries.count_locked(table)?;
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn max_id(&self, table: &TableRef) -> StoreResult<i64> {
        let sql = self.queries.max_id(table)?;
        let max: Option<i64> = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(max.unwrap_or(0))
    }

    async fn page_locked_ids(
        &self,
        table: &TableRef,
        after_id: i64,
        limit: usize,
    ) -> StoreResult<Vec<i64>> {
        let sql = self.queries.page_locked_ids(table)?;
        let ids: Vec<i64> = sqlx::query_scalar(&sql)
            .bind(after_id)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}
