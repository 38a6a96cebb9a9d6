//! Host notifications.

use crate::tile::TileId;

/// Out-of-band notifications delivered through the channel returned by
/// [`Tileset::subscribe`](crate::Tileset::subscribe).
///
/// Cancelled loads are silent by contract and never produce an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TilesetEvent {
    /// A tile's content load failed terminally.
    ///
    /// `tile` is `None` when the root metadata itself failed, which leaves
    /// the tileset without a tree until a refresh.
    LoadFailed {
        tile: Option<TileId>,
        uri: String,
        /// HTTP-like status code, when the failure carried one.
        status: Option<u16>,
        message: String,
    },

    /// Every tile needed for the current view has finished loading.
    ///
    /// Fired once per quiescent period; queuing new loads re-arms it.
    FullyLoaded,
}
