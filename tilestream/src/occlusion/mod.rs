//! Occlusion-culling collaborator interface.
//!
//! The host owns the actual occlusion machinery (GPU queries, software
//! rasterization, whatever); the engine only asks it per tile and bounds
//! how many tiles may hold a query at once via [`OcclusionQueryPool`].
//! Query results are allowed to lag: [`TileOcclusionState::Unknown`] means
//! "asked, not yet answered", and the
//! [`delay_refinement_for_occlusion`](crate::TilesetOptions::delay_refinement_for_occlusion)
//! option decides whether traversal waits for the answer or refines
//! optimistically.

use std::collections::HashMap;

use crate::geometry::BoundingVolume;
use crate::tile::TileId;

/// Answer from the host's occlusion system for one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileOcclusionState {
    /// Definitely hidden behind other geometry.
    Occluded,
    /// Definitely at least partially visible.
    Visible,
    /// A query is pending; no answer yet.
    Unknown,
}

/// Host-side occlusion query interface.
///
/// Called once per candidate tile per frame, from the traversal thread.
/// Implementations are expected to start a query on first sight of a tile
/// and report [`TileOcclusionState::Unknown`] until it resolves.
pub trait OcclusionProvider: Send {
    fn query_occlusion_state(
        &mut self,
        tile: TileId,
        bounding_volume: &BoundingVolume,
    ) -> TileOcclusionState;
}

/// Bounds how many tiles hold an occlusion query slot at once.
///
/// Tiles revisited each frame keep their slot; slots whose tile was not
/// visited this frame are reclaimed by [`sweep`](Self::sweep). When the
/// pool is exhausted a tile simply goes unqueried — the engine treats it
/// as visible rather than guessing occlusion.
#[derive(Debug)]
pub struct OcclusionQueryPool {
    capacity: usize,
    active: HashMap<TileId, u64>,
}

impl OcclusionQueryPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            active: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    /// Claims (or renews) a query slot for `tile` during `frame`.
    ///
    /// Returns false when the pool is full and the tile holds no slot.
    pub fn acquire(&mut self, tile: TileId, frame: u64) -> bool {
        if let Some(last_frame) = self.active.get_mut(&tile) {
            *last_frame = frame;
            return true;
        }
        if self.active.len() >= self.capacity {
            return false;
        }
        self.active.insert(tile, frame);
        true
    }

    /// Releases slots whose tile was not visited during `frame`.
    pub fn sweep(&mut self, frame: u64) {
        self.active.retain(|_, last_frame| *last_frame == frame);
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }
}
