//! Tile content loading states.

use std::fmt;

/// Where a tile's content is in its loading lifecycle.
///
/// ```text
/// Unloaded ──► ContentLoading ──► ContentLoaded ──► Renderable
///    ▲               │                                  │
///    │               └────► Failed (terminal)           │
///    └──────────── Destroying ◄─────────────────────────┘
/// ```
///
/// `Failed` is terminal for the session: the engine renders the nearest
/// loaded ancestor instead and only an explicit refresh retries the tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    /// No content resident; nothing in flight.
    Unloaded,
    /// A load request is outstanding.
    ContentLoading,
    /// Content parsed and applied, not yet handed to the renderer.
    ContentLoaded,
    /// Content is in use by the renderer.
    Renderable,
    /// The load failed; terminal until an explicit refresh.
    Failed,
    /// Content is being torn down by eviction.
    Destroying,
}

impl TileState {
    /// True when content is resident (loaded or renderable).
    pub fn has_content(&self) -> bool {
        matches!(self, Self::ContentLoaded | Self::Renderable)
    }

    /// True when the tile may be evicted: content resident and no load in
    /// flight. Whether it is *needed* this frame is the cache's concern.
    pub fn eligible_for_eviction(&self) -> bool {
        self.has_content()
    }
}

impl fmt::Display for TileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unloaded => "unloaded",
            Self::ContentLoading => "loading",
            Self::ContentLoaded => "loaded",
            Self::Renderable => "renderable",
            Self::Failed => "failed",
            Self::Destroying => "destroying",
        };
        f.write_str(name)
    }
}
