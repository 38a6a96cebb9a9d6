//! Tileset configuration.
//!
//! The host hands the engine a plain [`TilesetOptions`] bundle; there is no
//! file parsing or host-object reflection here. Every knob has a documented
//! default matching long-standing streaming-tileset practice, so
//! `TilesetOptions::default()` is a sensible production configuration.

// ==================== Selection Defaults ====================

/// Default maximum screen-space error, in pixels.
///
/// A tile is refined while its projected error exceeds this value. Lower
/// values mean higher detail and more tile loads.
pub const DEFAULT_MAXIMUM_SCREEN_SPACE_ERROR: f64 = 16.0;

/// Default screen-space error target applied to culled tiles when
/// [`TilesetOptions::enforce_culled_screen_space_error`] is set.
pub const DEFAULT_CULLED_SCREEN_SPACE_ERROR: f64 = 64.0;

/// Default bound on unfinished descendant loads tolerated before the
/// traversal stops waiting on deeper refinement and renders the current
/// tile instead.
pub const DEFAULT_LOADING_DESCENDANT_LIMIT: u32 = 20;

// ==================== Loading Defaults ====================

/// Default cap on simultaneously in-flight tile loads.
pub const DEFAULT_MAXIMUM_SIMULTANEOUS_TILE_LOADS: usize = 20;

/// Default content cache budget (256 MiB).
pub const DEFAULT_MAXIMUM_CACHED_BYTES: u64 = 256 * 1024 * 1024;

// ==================== Occlusion Defaults ====================

/// Default number of pooled occlusion queries.
pub const DEFAULT_OCCLUSION_POOL_SIZE: usize = 500;

/// Per-tileset selection, loading, and culling options.
///
/// All options are recognized every frame; changing a value between frames
/// takes effect on the next [`update_view`](crate::Tileset::update_view).
#[derive(Debug, Clone)]
pub struct TilesetOptions {
    /// Maximum screen-space error, in pixels, before a tile must refine.
    pub maximum_screen_space_error: f64,

    /// Load ancestors of rendered tiles so that zooming out is smooth.
    ///
    /// Ancestors are queued at background priority and never displace
    /// loads needed for the current view.
    pub preload_ancestors: bool,

    /// Load siblings of rendered tiles so that panning is smooth.
    pub preload_siblings: bool,

    /// Keep a parent tile rendered until *all* of its children are ready.
    ///
    /// When false, a refining region may transiently render nothing where
    /// a child is still loading, trading visual holes for lower latency.
    pub forbid_holes: bool,

    /// Maximum number of tile loads in flight at once.
    pub maximum_simultaneous_tile_loads: usize,

    /// Byte budget for cached tile content.
    ///
    /// A soft limit: tiles needed for the current frame are never evicted,
    /// so the total may exceed the budget under pressure.
    pub maximum_cached_bytes: u64,

    /// How many unfinished descendant loads a tile tolerates before the
    /// traversal renders it instead of waiting for deeper refinement.
    pub loading_descendant_limit: u32,

    /// Cull tiles entirely outside every view frustum.
    pub enable_frustum_culling: bool,

    /// Cull tiles beyond the per-view fog cutoff distance.
    pub enable_fog_culling: bool,

    /// Keep refining culled tiles toward [`culled_screen_space_error`]
    /// instead of ignoring them outright.
    ///
    /// Useful when culled geometry still matters to the host (shadows,
    /// physics), at the cost of extra loads.
    ///
    /// [`culled_screen_space_error`]: TilesetOptions::culled_screen_space_error
    pub enforce_culled_screen_space_error: bool,

    /// Relaxed screen-space error target for culled tiles.
    pub culled_screen_space_error: f64,

    /// Consult the host's occlusion collaborator during selection.
    pub enable_occlusion_culling: bool,

    /// Maximum number of tiles holding an occlusion query at once.
    pub occlusion_pool_size: usize,

    /// Withhold refinement past a tile whose occlusion state is still
    /// unresolved, rather than optimistically refining.
    ///
    /// Trades refinement latency for fewer wasted loads of tiles that turn
    /// out to be hidden.
    pub delay_refinement_for_occlusion: bool,
}

impl Default for TilesetOptions {
    fn default() -> Self {
        Self {
            maximum_screen_space_error: DEFAULT_MAXIMUM_SCREEN_SPACE_ERROR,
            preload_ancestors: true,
            preload_siblings: true,
            forbid_holes: false,
            maximum_simultaneous_tile_loads: DEFAULT_MAXIMUM_SIMULTANEOUS_TILE_LOADS,
            maximum_cached_bytes: DEFAULT_MAXIMUM_CACHED_BYTES,
            loading_descendant_limit: DEFAULT_LOADING_DESCENDANT_LIMIT,
            enable_frustum_culling: true,
            enable_fog_culling: true,
            enforce_culled_screen_space_error: false,
            culled_screen_space_error: DEFAULT_CULLED_SCREEN_SPACE_ERROR,
            enable_occlusion_culling: false,
            occlusion_pool_size: DEFAULT_OCCLUSION_POOL_SIZE,
            delay_refinement_for_occlusion: true,
        }
    }
}
