//! Tilestream - View-driven level-of-detail streaming for hierarchical
//! tilesets.
//!
//! The engine walks a tree of tiles once per frame, selects the coarsest
//! set whose screen-space error is acceptable for every active camera,
//! streams missing content through a bounded worker pool, and evicts
//! least-recently-used content over a byte budget. The host calls
//! [`Tileset::update_view`] each frame and renders exactly the tiles the
//! result names; nothing in the engine ever blocks on I/O.
//!
//! # Collaborators
//!
//! The host supplies two trait objects:
//! - [`TileSource`](source::TileSource) fetches and parses tile bytes;
//! - [`OcclusionProvider`](occlusion::OcclusionProvider) (optional)
//!   answers per-tile visibility queries.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tilestream::{ContentHandle, Tileset, TilesetOptions, ViewState};
//! # use tilestream::source::{BoxFuture, TileSource};
//! # use tilestream::{LoadError, TileContent, TileDescriptor};
//! # use bytes::Bytes;
//! # struct MySource;
//! # impl TileSource for MySource {
//! #     fn fetch(&self, _: &str, _: &[(String, String)]) -> BoxFuture<'_, Result<Bytes, LoadError>> {
//! #         unimplemented!()
//! #     }
//! #     fn parse_root(&self, _: &[u8]) -> Result<TileDescriptor, LoadError> { unimplemented!() }
//! #     fn parse_content(&self, _: &str, _: Bytes) -> Result<TileContent, LoadError> { unimplemented!() }
//! # }
//! # fn camera_view() -> ViewState { unimplemented!() }
//!
//! let runtime = tokio::runtime::Runtime::new()?;
//! let mut tileset = Tileset::new(
//!     Arc::new(MySource),
//!     ContentHandle::new("https://example.com/tileset.json"),
//!     TilesetOptions::default(),
//!     runtime.handle().clone(),
//! );
//!
//! // Once per frame, on the main thread:
//! let result = tileset.update_view(&[camera_view()]);
//! for tile in &result.tiles_to_render_this_frame {
//!     let _content = tileset.tile_content(*tile);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod geometry;
pub mod loader;
pub mod occlusion;
pub mod source;
pub mod tile;
pub mod tileset;
pub mod view;

pub use config::TilesetOptions;
pub use error::LoadError;
pub use occlusion::{OcclusionProvider, TileOcclusionState};
pub use source::TileSource;
pub use tile::{ContentHandle, Tile, TileContent, TileDescriptor, TileId, TileRefine, TileState};
pub use tileset::{FrameStats, RootStatus, Tileset, TilesetEvent, ViewUpdateResult};
pub use view::ViewState;
