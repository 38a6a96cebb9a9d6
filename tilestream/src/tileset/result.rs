//! Per-frame output contract.

use crate::tile::TileId;

/// Diagnostic counters for one `update_view` call.
///
/// Purely informational; nothing in the engine depends on them.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    /// Tiles visited by the traversal.
    pub tiles_visited: u32,
    /// Tiles rejected by frustum or fog culling.
    pub tiles_culled: u32,
    /// Tiles rejected by occlusion.
    pub tiles_occluded: u32,
    /// Deepest tree level visited.
    pub max_depth_visited: u32,
    /// Loads submitted to workers this frame.
    pub loads_queued: u32,
    /// Loads in flight after submission.
    pub loads_in_flight: u32,
    /// Bytes of cached tile content after eviction.
    pub cached_bytes: u64,
    /// Percentage estimate of loading completeness for the current view.
    pub load_progress: f32,
}

/// What the host should do with tiles this frame.
///
/// Hiding is two-phase: a tile that dropped out of the render set this
/// frame appears in `tiles_to_hide_next_frame` now and in
/// `tiles_to_hide_this_frame` on the following call. The one-frame delay
/// gives host occlusion systems, whose state lags a frame, time to catch
/// up before geometry disappears.
#[derive(Debug, Default)]
pub struct ViewUpdateResult {
    /// Tiles to render, in traversal order.
    pub tiles_to_render_this_frame: Vec<TileId>,
    /// Tiles whose hide, deferred last frame, should be applied now.
    pub tiles_to_hide_this_frame: Vec<TileId>,
    /// Tiles that left the render set this frame; their hide applies next
    /// frame.
    pub tiles_to_hide_next_frame: Vec<TileId>,
    /// Diagnostic counters.
    pub stats: FrameStats,
}
