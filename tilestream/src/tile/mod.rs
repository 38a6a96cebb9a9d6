//! The tile data model: LOD-tree nodes, their loading state machine, and
//! the arena that owns them.
//!
//! Tiles are owned exclusively by the [`TileArena`]; everything else refers
//! to them through generation-counted [`TileId`]s, so a stale reference
//! after a tree rebuild is detectable instead of dangling.

mod arena;
mod content;
mod node;
mod state;

pub use arena::{TileArena, TileId};
pub use content::{ContentHandle, TileContent};
pub use node::{Tile, TileDescriptor, TileRefine};
pub(crate) use node::{TileChildren, TileSelection};
pub use state::TileState;
