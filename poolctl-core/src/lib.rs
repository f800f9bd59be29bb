//! poolctl-core: in-memory lock tracking for pools of row ids
//!
//! Tracks which integer row ids of each named pool are claimed, answers
//! "first free id" queries in logarithmic time, and rebuilds that state at
//! startup from an external store through the [`LockSource`] trait.

mod bitmap;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod registry;
pub mod source;
pub mod tracker;

pub use bootstrap::{bootstrap_registry, replay, BootstrapReport, SkipReason, SkippedTable};
pub use config::{BootstrapConfig, PoolctlConfig, StoreSettings};
pub use error::{PoolError, Result};
pub use registry::{normalize_pool_name, PoolRegistry};
pub use source::{LockSource, TableRef};
pub use tracker::{LockTracker, PoolStats, MAX_ROW_ID};
