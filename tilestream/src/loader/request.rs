//! Load request lifecycle types.

use crate::tile::TileId;

/// Scheduling band for a queued tile load.
///
/// The traversal queues loads into three bands and submits them in band
/// order, so loads that block refinement always win the capacity race over
/// speculative preloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadPriority {
    /// The tile blocks refinement the current view needs.
    High,
    /// The tile is selected for rendering at its own level.
    Medium,
    /// Speculative: preloaded ancestor/sibling or culled-but-enforced tile.
    Low,
}

/// Handle to one submitted load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadRequest {
    pub tile: TileId,
    /// Monotonic id distinguishing this request from earlier, cancelled
    /// requests for the same tile.
    pub request_id: u64,
}
