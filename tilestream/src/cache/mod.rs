//! Byte-budgeted cache of loaded tile content.

mod lru;

pub use lru::{CacheStats, TileCache};
