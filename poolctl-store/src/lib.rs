//! poolctl-store: PostgreSQL backing for poolctl bootstrap
//!
//! Provides [`PgLockSource`], the production implementation of
//! `poolctl_core::LockSource`, including its connection setup.

pub mod error;
pub mod source;

pub use error::{StoreError, StoreResult};
pub use source::{is_system_schema, quote_ident, PgLockSource, TableQueries};
