//! Per-pool lock state.
//!
//! A [`LockTracker`] owns the locked/unlocked flag for every row id in
//! `[1, max_id]` of one pool. State lives behind the tracker's own `RwLock`:
//! queries share the read side, mutations (including growth) take the write
//! side, so readers never see a half-resized bitmap.

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::bitmap::HierarchicalBitmap;
use crate::error::{PoolError, Result};

/// Largest row id a tracker will hold, the range of a PostgreSQL `integer`
/// key. Bounds the bitmap at 256 MiB per pool.
pub const MAX_ROW_ID: i64 = i32::MAX as i64;

/// Point-in-time view of a pool for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub name: String,
    pub max_id: i64,
    pub locked: u64,
}

#[derive(Debug)]
struct TrackerState {
    max_id: i64,
    bits: HierarchicalBitmap,
}

/// Lock flags for the row ids of a single pool
#[derive(Debug)]
pub struct LockTracker {
    name: String,
    state: RwLock<TrackerState>,
}

impl LockTracker {
    /// Create a tracker covering `[1, max_id]` with every id unlocked.
    pub fn new(name: impl Into<String>, max_id: i64) -> Result<Self> {
        if !(0..=MAX_ROW_ID).contains(&max_id) {
            return Err(PoolError::InvalidSize { size: max_id });
        }
        let capacity =
            usize::try_from(max_id).map_err(|_| PoolError::InvalidSize { size: max_id })?;
        Ok(Self {
            name: name.into(),
            state: RwLock::new(TrackerState {
                max_id,
                bits: HierarchicalBitmap::with_capacity(capacity),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_id(&self) -> i64 {
        self.state.read().max_id
    }

    pub fn locked_count(&self) -> u64 {
        self.state.read().bits.count_ones() as u64
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.state.read();
        PoolStats {
            name: self.name.clone(),
            max_id: state.max_id,
            locked: state.bits.count_ones() as u64,
        }
    }

    /// Whether `id` is currently locked. Ids past `max_id` are never locked.
    pub fn is_locked(&self, id: i64) -> Result<bool> {
        let bit = bit_index(id)?;
        Ok(self.state.read().bits.get(bit))
    }

    /// Mark `id` as locked, extending the tracked range when `id > max_id`.
    ///
    /// Ids above [`MAX_ROW_ID`] are rejected before anything is allocated.
    pub fn lock(&self, id: i64) -> Result<()> {
        let bit = bit_index(id)?;
        if id > MAX_ROW_ID {
            return Err(PoolError::InvalidId { id });
        }
        let mut state = self.state.write();
        if id > state.max_id {
            state.bits.grow_to(bit + 1, MAX_ROW_ID as usize);
            debug!(
                pool = %self.name,
                from = state.max_id,
                to = id,
                capacity = state.bits.capacity(),
                "extended tracked range"
            );
            state.max_id = id;
        }
        state.bits.set(bit);
        Ok(())
    }

    /// Mark `id` as unlocked. Ids past `max_id` are left alone.
    pub fn unlock(&self, id: i64) -> Result<()> {
        let bit = bit_index(id)?;
        let mut state = self.state.write();
        if id <= state.max_id {
            state.bits.clear(bit);
        }
        Ok(())
    }

    /// Smallest unlocked id in range, or `max_id + 1` when the pool is full.
    pub fn first_unlocked_id(&self) -> i64 {
        self.state.read().next_unlocked(0)
    }

    /// Smallest unlocked id strictly greater than `id`, or `max_id + 1`.
    pub fn first_bigger_unlocked_id(&self, id: i64) -> Result<i64> {
        let bit = bit_index(id)?;
        let state = self.state.read();
        if id >= state.max_id {
            return Ok(state.max_id + 1);
        }
        // Bit `id - 1` holds `id`, so bit `id` is the first id after it.
        Ok(state.next_unlocked(bit + 1))
    }
}

impl TrackerState {
    fn next_unlocked(&self, from_bit: usize) -> i64 {
        let limit = self.max_id as usize;
        match self.bits.next_zero(from_bit) {
            Some(bit) if bit < limit => bit as i64 + 1,
            _ => self.max_id + 1,
        }
    }
}

fn bit_index(id: i64) -> Result<usize> {
    if id < 1 {
        return Err(PoolError::InvalidId { id });
    }
    usize::try_from(id - 1).map_err(|_| PoolError::InvalidId { id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn tracker_with(max_id: i64, locked: &[i64]) -> LockTracker {
        let tracker = LockTracker::new("T", max_id).unwrap();
        for &id in locked {
            tracker.lock(id).unwrap();
        }
        tracker
    }

    #[test]
    fn fresh_tracker_starts_at_one() {
        for size in [1, 5, 64, 65, 10_000] {
            let tracker = LockTracker::new("T", size).unwrap();
            assert_eq!(tracker.first_unlocked_id(), 1);
            assert_eq!(tracker.locked_count(), 0);
        }
    }

    #[test]
    fn empty_tracker_signals_growth() {
        let tracker = LockTracker::new("T", 0).unwrap();
        assert_eq!(tracker.first_unlocked_id(), 1);
        assert_eq!(tracker.first_bigger_unlocked_id(1).unwrap(), 1);
    }

    #[test]
    fn negative_size_is_rejected() {
        assert_eq!(
            LockTracker::new("T", -3).unwrap_err(),
            PoolError::InvalidSize { size: -3 }
        );
    }

    #[test]
    fn queries_skip_locked_prefix() {
        let tracker = tracker_with(5, &[1, 2, 3]);
        assert_eq!(tracker.first_unlocked_id(), 4);
        assert_eq!(tracker.first_bigger_unlocked_id(3).unwrap(), 4);
        assert_eq!(tracker.first_bigger_unlocked_id(4).unwrap(), 5);
        assert_eq!(tracker.first_bigger_unlocked_id(1).unwrap(), 4);
    }

    #[test]
    fn bigger_at_or_past_end_signals_growth() {
        let tracker = tracker_with(5, &[]);
        assert_eq!(tracker.first_bigger_unlocked_id(5).unwrap(), 6);
        assert_eq!(tracker.first_bigger_unlocked_id(50).unwrap(), 6);
    }

    #[test]
    fn fully_locked_pool_returns_max_plus_one() {
        let ids: Vec<i64> = (1..=130).collect();
        let tracker = tracker_with(130, &ids);
        assert_eq!(tracker.first_unlocked_id(), 131);
        assert_eq!(tracker.first_bigger_unlocked_id(7).unwrap(), 131);
    }

    #[test]
    fn unlock_reopens_lowest_id() {
        let tracker = tracker_with(5, &[1, 2, 3]);
        tracker.unlock(2).unwrap();
        assert_eq!(tracker.first_unlocked_id(), 2);
        assert!(!tracker.is_locked(2).unwrap());
        assert!(tracker.is_locked(3).unwrap());
    }

    #[test]
    fn lock_unlock_round_trip() {
        let tracker = tracker_with(200, &[10, 64, 65, 128]);
        let before = tracker.stats();
        tracker.lock(100).unwrap();
        tracker.unlock(100).unwrap();
        assert_eq!(tracker.stats(), before);
        assert_eq!(tracker.first_unlocked_id(), 1);
    }

    #[test]
    fn lock_and_unlock_are_idempotent() {
        let tracker = tracker_with(10, &[4, 4, 4]);
        assert_eq!(tracker.locked_count(), 1);
        tracker.unlock(4).unwrap();
        tracker.unlock(4).unwrap();
        assert_eq!(tracker.locked_count(), 0);
    }

    #[test]
    fn lock_past_end_extends_range() {
        let tracker = tracker_with(3, &[1, 2, 3]);
        tracker.lock(200).unwrap();
        assert_eq!(tracker.max_id(), 200);
        assert!((1..=3).all(|id| tracker.is_locked(id).unwrap()));
        assert_eq!(tracker.first_unlocked_id(), 4);
        assert_eq!(tracker.first_bigger_unlocked_id(199).unwrap(), 201);
    }

    #[test]
    fn unlock_past_end_is_noop() {
        let tracker = tracker_with(3, &[]);
        tracker.unlock(1_000).unwrap();
        assert_eq!(tracker.max_id(), 3);
    }

    #[test]
    fn non_positive_ids_are_rejected() {
        let tracker = tracker_with(3, &[]);
        assert_eq!(tracker.lock(0).unwrap_err(), PoolError::InvalidId { id: 0 });
        assert_eq!(tracker.unlock(-1).unwrap_err(), PoolError::InvalidId { id: -1 });
        assert_eq!(
            tracker.first_bigger_unlocked_id(0).unwrap_err(),
            PoolError::InvalidId { id: 0 }
        );
    }

    #[test]
    fn ids_past_the_ceiling_are_rejected_without_growing() {
        let tracker = tracker_with(5, &[1]);
        assert_eq!(
            tracker.lock(1 << 50).unwrap_err(),
            PoolError::InvalidId { id: 1 << 50 }
        );
        assert_eq!(
            tracker.lock(MAX_ROW_ID + 1).unwrap_err(),
            PoolError::InvalidId { id: MAX_ROW_ID + 1 }
        );
        assert_eq!(tracker.max_id(), 5);
        assert_eq!(tracker.first_unlocked_id(), 2);

        // Read-side queries past the ceiling allocate nothing and still answer.
        assert!(!tracker.is_locked(1 << 50).unwrap());
        tracker.unlock(1 << 50).unwrap();
        assert_eq!(tracker.first_bigger_unlocked_id(1 << 50).unwrap(), 6);
    }

    #[test]
    fn oversized_pool_is_rejected() {
        assert_eq!(
            LockTracker::new("T", MAX_ROW_ID + 1).unwrap_err(),
            PoolError::InvalidSize { size: MAX_ROW_ID + 1 }
        );
        assert_eq!(
            LockTracker::new("T", i64::MAX).unwrap_err(),
            PoolError::InvalidSize { size: i64::MAX }
        );
    }

    #[test]
    fn concurrent_disjoint_locks_are_all_applied() {
        let tracker = Arc::new(LockTracker::new("T", 64).unwrap());
        let workers = 8;
        let per_worker = 500;

        let handles: Vec<_> = (0..workers)
            .map(|w| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    for i in 0..per_worker {
                        // Interleaved ids force growth from several threads at once.
                        let id = (i * workers + w + 1) as i64;
                        tracker.lock(id).unwrap();
                        let _ = tracker.first_unlocked_id();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("worker panicked");
        }

        let total = (workers * per_worker) as i64;
        assert_eq!(tracker.locked_count(), total as u64);
        assert_eq!(tracker.max_id(), total);
        assert_eq!(tracker.first_unlocked_id(), total + 1);
    }
}
