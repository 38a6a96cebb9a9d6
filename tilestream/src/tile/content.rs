//! Tile content payloads.

use std::any::Any;

/// Where a tile's content comes from: a URI plus request headers, handed
/// verbatim to the content source collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentHandle {
    pub uri: String,
    pub headers: Vec<(String, String)>,
}

impl ContentHandle {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }
}

/// Parsed, renderable tile content.
///
/// The payload is opaque to the engine — the content source parses it and
/// the host renderer consumes it via [`downcast_ref`](Self::downcast_ref).
/// Only the byte size matters here, for cache accounting.
pub struct TileContent {
    payload: Box<dyn Any + Send + Sync>,
    size_bytes: u64,
}

impl TileContent {
    /// Wraps a parsed payload with its resident size in bytes.
    pub fn new<T: Any + Send + Sync>(payload: T, size_bytes: u64) -> Self {
        Self {
            payload: Box::new(payload),
            size_bytes,
        }
    }

    /// Resident size used for cache budget accounting.
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Borrows the payload as the host's concrete content type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref()
    }
}

impl std::fmt::Debug for TileContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileContent")
            .field("size_bytes", &self.size_bytes)
            .finish_non_exhaustive()
    }
}
