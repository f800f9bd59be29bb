//! Structured error types for poolctl-core.
//!
//! Uses `thiserror` so callers can match on the failure kind.
//! The `poolctl` binary wraps these in `anyhow` at the command boundary.

use serde::Serialize;
use thiserror::Error;

use crate::tracker::MAX_ROW_ID;

/// Main error type for pool and tracker operations
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PoolError {
    /// Operation addressed a pool that is not registered (or was deleted)
    #[error("Pool not found: {pool}")]
    PoolNotFound { pool: String },

    /// Row ids start at 1 and stop at [`MAX_ROW_ID`]
    #[error("Invalid row id {id}: ids must lie in 1..={max}", max = MAX_ROW_ID)]
    InvalidId { id: i64 },

    /// Pool sizes cannot be negative or exceed [`MAX_ROW_ID`]
    #[error("Invalid pool size {size}: size must lie in 0..={max}", max = MAX_ROW_ID)]
    InvalidSize { size: i64 },

    /// A schema or table could not be replayed during bootstrap
    #[error("Bootstrap failed for {scope}: {reason}")]
    BootstrapSource { scope: String, reason: String },
}

/// Result type alias for poolctl-core operations
pub type Result<T> = std::result::Result<T, PoolError>;

impl PoolError {
    /// Create a pool-not-found error
    pub fn pool_not_found(pool: impl Into<String>) -> Self {
        Self::PoolNotFound { pool: pool.into() }
    }

    /// Create a bootstrap error scoped to a schema or table
    pub fn bootstrap(scope: impl Into<String>, reason: impl ToString) -> Self {
        Self::BootstrapSource {
            scope: scope.into(),
            reason: reason.to_string(),
        }
    }
}
