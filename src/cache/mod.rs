// Per-island breakdown cache


use crate::worth::EntityWorthSnapshot;
use chrono::{DateTime, Duration, Utc};
use dashmap::{DashMap, DashSet};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Cached breakdown for one island
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub snapshot: Arc<EntityWorthSnapshot>,
    pub last_refreshed_at: DateTime<Utc>,
    /// Last tick on which the island had an observer
    pub last_observed_at: DateTime<Utc>,
}

/// Outcome of [`EntityCache::refresh_if_needed`]
#[derive(Clone, Debug)]
pub enum Refresh {
    /// Entry was fresh, nothing recomputed
    Cached(Arc<EntityWorthSnapshot>),
    /// A new snapshot was computed and stored
    Refreshed(Arc<EntityWorthSnapshot>),
    /// Recompute failed, the previous snapshot is still served
    Stale(Arc<EntityWorthSnapshot>),
    /// Recompute failed and nothing was cached
    Missing,
}

impl Refresh {
    pub fn snapshot(&self) -> Option<&Arc<EntityWorthSnapshot>> {
        match self {
            Refresh::Cached(s) | Refresh::Refreshed(s) | Refresh::Stale(s) => Some(s),
            Refresh::Missing => None,
        }
    }
}

/// Keyed store of computed breakdowns with TTL and dirty-flag invalidation.
///
/// `mark_dirty` may be called from any thread. The dirty flag is cleared
/// before a refresh reads provider data, so a mark that lands while a refresh
/// is in flight forces one more refresh on the next tick.
pub struct EntityCache {
    entries: DashMap<Uuid, CacheEntry>,
    dirty: DashSet<Uuid>,
    refresh_interval: Duration,
    last_version: AtomicU64,
}

impl EntityCache {
    pub fn new(refresh_interval: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            dirty: DashSet::new(),
            refresh_interval,
            last_version: AtomicU64::new(0),
        }
    }

    /// Read the cached snapshot without refreshing
    pub fn get(&self, island_id: &Uuid) -> Option<Arc<EntityWorthSnapshot>> {
        self.entries
            .get(island_id)
            .map(|entry| Arc::clone(&entry.snapshot))
    }

    /// Force a refresh on the next tick, regardless of age. Idempotent.
    pub fn mark_dirty(&self, island_id: Uuid) {
        self.dirty.insert(island_id);
    }

    /// Mark every cached island dirty, returning how many were marked
    pub fn mark_all_dirty(&self) -> usize {
        let mut marked = 0;
        for entry in self.entries.iter() {
            self.dirty.insert(*entry.key());
            marked += 1;
        }
        marked
    }

    pub fn is_dirty(&self, island_id: &Uuid) -> bool {
        self.dirty.contains(island_id)
    }

    /// Whether the next `refresh_if_needed` would recompute
    pub fn needs_refresh(&self, island_id: &Uuid, now: DateTime<Utc>) -> bool {
        if self.is_dirty(island_id) {
            return true;
        }
        match self.entries.get(island_id) {
            Some(entry) => now - entry.last_refreshed_at > self.refresh_interval,
            None => true,
        }
    }

    /// Recompute the island's snapshot when it is missing, dirty or older
    /// than the refresh interval.
    ///
    /// When `refresh` yields `None` (island no longer resolvable) the previous
    /// snapshot is kept.
    pub fn refresh_if_needed<F>(&self, island_id: Uuid, now: DateTime<Utc>, refresh: F) -> Refresh
    where
        F: FnOnce() -> Option<EntityWorthSnapshot>,
    {
        let was_dirty = self.dirty.remove(&island_id).is_some();

        // Guard dropped before `refresh` runs
        let previous = self.entries.get_mut(&island_id).map(|mut entry| {
            entry.last_observed_at = now;
            let expired = now - entry.last_refreshed_at > self.refresh_interval;
            (Arc::clone(&entry.snapshot), expired)
        });

        if let Some((snapshot, expired)) = &previous {
            if !was_dirty && !expired {
                return Refresh::Cached(Arc::clone(snapshot));
            }
        }

        match refresh() {
            Some(mut snapshot) => {
                snapshot.version = self.last_version.fetch_add(1, Ordering::Relaxed) + 1;
                let snapshot = Arc::new(snapshot);
                self.entries.insert(
                    island_id,
                    CacheEntry {
                        snapshot: Arc::clone(&snapshot),
                        last_refreshed_at: now,
                        last_observed_at: now,
                    },
                );
                Refresh::Refreshed(snapshot)
            }
            None => match previous {
                Some((snapshot, _)) => Refresh::Stale(snapshot),
                None => Refresh::Missing,
            },
        }
    }

    /// Drop entries that have had no observer for longer than `grace`.
    ///
    /// Dirty flags for islands that are neither cached nor observed are
    /// dropped too. Returns the number of evicted entries.
    pub fn evict_unobserved(
        &self,
        observed: &HashSet<Uuid>,
        now: DateTime<Utc>,
        grace: Duration,
    ) -> usize {
        let before = self.entries.len();
        self.entries.retain(|island_id, entry| {
            observed.contains(island_id) || now - entry.last_observed_at <= grace
        });
        self.dirty
            .retain(|island_id| observed.contains(island_id) || self.entries.contains_key(island_id));
        before.saturating_sub(self.entries.len())
    }

    pub fn entry(&self, island_id: &Uuid) -> Option<CacheEntry> {
        self.entries.get(island_id).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.dirty.clear();
    }
}
