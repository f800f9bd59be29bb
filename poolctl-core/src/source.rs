//! The external store as seen by bootstrap.
//!
//! Implementations answer metadata and paging questions about the store of
//! record. `poolctl-store` provides the PostgreSQL implementation; tests use
//! in-memory fakes.

use std::fmt;

use async_trait::async_trait;

/// A table addressed by schema and name, as the store spells them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// `schema.table`, the name the pool is registered under.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Read-only view of the store that bootstrap replays from.
#[async_trait]
pub trait LockSource: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Schemas that may hold pools; system schemas are already filtered out.
    async fn list_non_system_schemas(&self) -> Result<Vec<String>, Self::Error>;

    async fn list_tables(&self, schema: &str) -> Result<Vec<String>, Self::Error>;

    /// Whether the table exposes a boolean "locked" column.
    async fn has_locked_column(&self, schema: &str, table: &str) -> Result<bool, Self::Error>;

    async fn count_locked(&self, table: &TableRef) -> Result<i64, Self::Error>;

    /// Largest row id in the table, 0 when it is empty.
    async fn max_id(&self, table: &TableRef) -> Result<i64, Self::Error>;

    /// Up to `limit` locked ids greater than `after_id`, ascending.
    async fn page_locked_ids(
        &self,
        table: &TableRef,
        after_id: i64,
        limit: usize,
    ) -> Result<Vec<i64>, Self::Error>;
}
