//! Content source collaborator.
//!
//! The engine never talks to the network or decodes payload formats; it
//! delegates both to a [`TileSource`] the host supplies. Tile payload
//! formats (3D Tiles, terrain meshes, imagery) are opaque here — the
//! source parses them into [`TileContent`] and the traversal only sees
//! byte sizes and readiness.
//!
//! # Dyn Compatibility
//!
//! Async methods return [`BoxFuture`] so the source can live behind
//! `Arc<dyn TileSource>` and be shared with loader workers.

use bytes::Bytes;

pub use futures::future::BoxFuture;

use crate::error::LoadError;
use crate::tile::{TileContent, TileDescriptor};

/// Fetches and parses tile payloads on behalf of the engine.
///
/// `fetch` runs on loader worker tasks and may suspend on I/O;
/// `parse_content` is CPU-bound and is invoked from a blocking-friendly
/// context. Neither is ever called on the thread driving
/// [`update_view`](crate::Tileset::update_view).
pub trait TileSource: Send + Sync + 'static {
    /// Fetches raw bytes for a URI.
    ///
    /// # Errors
    ///
    /// [`LoadError::Network`] with the HTTP-like status when one exists.
    fn fetch(&self, uri: &str, headers: &[(String, String)]) -> BoxFuture<'_, Result<Bytes, LoadError>>;

    /// Parses the tileset's root metadata into the tile tree description.
    ///
    /// Called once per connect/refresh with the bytes fetched from the
    /// root URI. Failure here is the engine's only fatal condition.
    fn parse_root(&self, bytes: &[u8]) -> Result<TileDescriptor, LoadError>;

    /// Parses one tile's payload into renderable content.
    ///
    /// # Errors
    ///
    /// [`LoadError::Parse`] for malformed payloads — terminal for the tile.
    fn parse_content(&self, uri: &str, bytes: Bytes) -> Result<TileContent, LoadError>;
}
