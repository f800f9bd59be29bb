//! Named pool lifecycle and routing.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{PoolError, Result};
use crate::tracker::{LockTracker, PoolStats};

/// Upper-case pool names so lookups are case-insensitive.
pub fn normalize_pool_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Maps pool names to their trackers.
///
/// The map lock is only held long enough to clone a tracker handle; each
/// tracker carries its own lock, so traffic on one pool never waits on another.
#[derive(Debug, Default)]
pub struct PoolRegistry {
    pools: RwLock<HashMap<String, Arc<LockTracker>>>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or replace) a pool with ids `[1, size]` all unlocked.
    pub fn put_pool(&self, name: &str, size: i64) -> Result<()> {
        let key = normalize_pool_name(name);
        let tracker = LockTracker::new(key.clone(), size)?;
        info!(pool = %key, size, "registered pool");
        self.pools.write().insert(key, Arc::new(tracker));
        Ok(())
    }

    /// Register an already populated tracker under its normalized name.
    pub fn insert_tracker(&self, tracker: LockTracker) {
        let key = normalize_pool_name(tracker.name());
        debug!(pool = %key, max_id = tracker.max_id(), "inserted tracker");
        self.pools.write().insert(key, Arc::new(tracker));
    }

    /// Remove a pool. Returns false if it was not registered.
    pub fn delete_pool(&self, name: &str) -> bool {
        let key = normalize_pool_name(name);
        let removed = self.pools.write().remove(&key).is_some();
        if removed {
            info!(pool = %key, "deleted pool");
        }
        removed
    }

    pub fn lock(&self, pool: &str, id: i64) -> Result<()> {
        self.tracker(pool)?.lock(id)
    }

    pub fn unlock(&self, pool: &str, id: i64) -> Result<()> {
        self.tracker(pool)?.unlock(id)
    }

    pub fn first_unlocked_id(&self, pool: &str) -> Result<i64> {
        Ok(self.tracker(pool)?.first_unlocked_id())
    }

    pub fn first_bigger_unlocked_id(&self, pool: &str, id: i64) -> Result<i64> {
        self.tracker(pool)?.first_bigger_unlocked_id(id)
    }

    pub fn is_locked(&self, pool: &str, id: i64) -> Result<bool> {
        self.tracker(pool)?.is_locked(id)
    }

    pub fn stats(&self, pool: &str) -> Result<PoolStats> {
        Ok(self.tracker(pool)?.stats())
    }

    /// Stats for every registered pool, ordered by name.
    pub fn snapshot(&self) -> Vec<PoolStats> {
        let trackers: Vec<Arc<LockTracker>> = self.pools.read().values().cloned().collect();
        let mut stats: Vec<PoolStats> = trackers.iter().map(|t| t.stats()).collect();
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }

    pub fn contains(&self, pool: &str) -> bool {
        self.pools.read().contains_key(&normalize_pool_name(pool))
    }

    pub fn pool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pools.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.pools.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.read().is_empty()
    }

    fn tracker(&self, pool: &str) -> Result<Arc<LockTracker>> {
        let key = normalize_pool_name(pool);
        self.pools
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| PoolError::PoolNotFound { pool: key })
    }
}
