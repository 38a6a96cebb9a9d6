//! LRU bookkeeping for resident tile content.
//!
//! The cache tracks which tiles hold content and when each was last
//! touched by a traversal. `enforce_budget` evicts in strict
//! least-recently-used order but never a tile that the current frame
//! needs, so the byte budget is a soft limit: when every resident tile is
//! needed, the total is allowed to exceed it.
//!
//! Eviction here is only a *decision* — the engine owns the tree and
//! performs the actual content teardown for the ids returned.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::tile::TileId;

/// Counters for cache observability.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Tiles evicted over the cache's lifetime.
    pub evictions: u64,
    /// Bytes released by eviction over the cache's lifetime.
    pub bytes_evicted: u64,
}

#[derive(Debug, Clone, Copy)]
struct Resident {
    bytes: u64,
    last_touched: u64,
}

/// Recency-ordered view of all tiles with resident content.
#[derive(Debug, Default)]
pub struct TileCache {
    resident: HashMap<TileId, Resident>,
    total_bytes: u64,
    touch_counter: u64,
    stats: CacheStats,
}

impl TileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bytes of resident content.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn resident_count(&self) -> usize {
        self.resident.len()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Marks `tile` as used now. No-op unless the tile is resident.
    pub fn touch(&mut self, tile: TileId) {
        self.touch_counter += 1;
        let counter = self.touch_counter;
        if let Some(entry) = self.resident.get_mut(&tile) {
            entry.last_touched = counter;
        }
    }

    /// Registers freshly applied content for `tile`.
    pub fn insert(&mut self, tile: TileId, bytes: u64) {
        self.touch_counter += 1;
        let previous = self.resident.insert(
            tile,
            Resident {
                bytes,
                last_touched: self.touch_counter,
            },
        );
        if let Some(old) = previous {
            self.total_bytes -= old.bytes;
        }
        self.total_bytes += bytes;
    }

    /// Removes `tile` from the accounting without counting an eviction
    /// (tree rebuild or external teardown).
    pub fn forget(&mut self, tile: TileId) {
        if let Some(entry) = self.resident.remove(&tile) {
            self.total_bytes -= entry.bytes;
        }
    }

    pub fn clear(&mut self) {
        self.resident.clear();
        self.total_bytes = 0;
    }

    /// Evicts least-recently-used tiles until the total fits `max_bytes`
    /// or only needed tiles remain. Returns the evicted ids, oldest first;
    /// the caller tears their content down.
    pub fn enforce_budget(&mut self, max_bytes: u64, needed: &HashSet<TileId>) -> Vec<TileId> {
        if self.total_bytes <= max_bytes {
            return Vec::new();
        }

        let mut candidates: Vec<(TileId, Resident)> = self
            .resident
            .iter()
            .filter(|(id, _)| !needed.contains(id))
            .map(|(id, entry)| (*id, *entry))
            .collect();
        candidates.sort_by_key(|(_, entry)| entry.last_touched);

        let mut evicted = Vec::new();
        for (id, entry) in candidates {
            if self.total_bytes <= max_bytes {
                break;
            }
            self.resident.remove(&id);
            self.total_bytes -= entry.bytes;
            self.stats.evictions += 1;
            self.stats.bytes_evicted += entry.bytes;
            evicted.push(id);
        }

        if !evicted.is_empty() {
            debug!(
                evicted = evicted.len(),
                resident_bytes = self.total_bytes,
                "cache eviction sweep"
            );
        }
        evicted
    }
}
