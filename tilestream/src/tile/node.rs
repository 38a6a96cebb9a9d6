//! Tile tree nodes and the descriptors they are built from.

use std::sync::Arc;

use crate::geometry::BoundingVolume;

use super::arena::TileId;
use super::content::{ContentHandle, TileContent};
use super::state::TileState;

/// How a tile's children relate to it when refining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileRefine {
    /// Children collectively replace the parent; rendering both would
    /// draw the same geometry twice.
    Replace,
    /// Children add detail on top of the parent; both render together.
    Additive,
}

/// Source-provided description of a tile and its subtree.
///
/// Descriptors are the wire between the content source and the tree: the
/// root metadata parse yields one, and the arena instantiates [`Tile`]
/// nodes from them lazily, the first time traversal descends past the
/// parent.
#[derive(Debug, Clone)]
pub struct TileDescriptor {
    pub bounding_volume: BoundingVolume,
    /// Error, in meters, of rendering this tile instead of its subtree.
    /// Non-increasing from parent to child.
    pub geometric_error: f64,
    pub refine: TileRefine,
    /// Content to load, or `None` for a purely structural tile.
    pub content: Option<ContentHandle>,
    pub children: Vec<TileDescriptor>,
}

/// What the previous frame's traversal decided for a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TileSelection {
    None,
    Rendered,
    Refined,
    Culled,
    /// Selected, then removed again because its subtree was not ready.
    Kicked,
}

/// A tile's children: descriptors until first descent, arena ids after.
#[derive(Debug)]
pub(crate) enum TileChildren {
    Pending(Vec<TileDescriptor>),
    Expanded(Vec<TileId>),
}

/// One node in the LOD tree.
///
/// Owned by the [`TileArena`](super::TileArena); the traversal and cache
/// mutate it only from the main thread.
#[derive(Debug)]
pub struct Tile {
    pub(crate) parent: Option<TileId>,
    pub(crate) depth: u32,
    pub(crate) bounding_volume: BoundingVolume,
    pub(crate) geometric_error: f64,
    pub(crate) refine: TileRefine,
    pub(crate) content_handle: Option<ContentHandle>,
    pub(crate) state: TileState,
    pub(crate) content: Option<Arc<TileContent>>,
    pub(crate) children: TileChildren,
    pub(crate) last_selection_frame: u64,
    pub(crate) last_selection: TileSelection,
}

impl Tile {
    pub(crate) fn from_descriptor(
        descriptor: TileDescriptor,
        parent: Option<TileId>,
        depth: u32,
    ) -> Self {
        Self {
            parent,
            depth,
            bounding_volume: descriptor.bounding_volume,
            geometric_error: descriptor.geometric_error,
            refine: descriptor.refine,
            content_handle: descriptor.content,
            state: TileState::Unloaded,
            content: None,
            children: TileChildren::Pending(descriptor.children),
            last_selection_frame: 0,
            last_selection: TileSelection::None,
        }
    }

    pub fn state(&self) -> TileState {
        self.state
    }

    pub fn parent(&self) -> Option<TileId> {
        self.parent
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn bounding_volume(&self) -> &BoundingVolume {
        &self.bounding_volume
    }

    pub fn geometric_error(&self) -> f64 {
        self.geometric_error
    }

    pub fn refine(&self) -> TileRefine {
        self.refine
    }

    /// Shared handle to the loaded content, if resident.
    pub fn content(&self) -> Option<Arc<TileContent>> {
        self.content.clone()
    }

    /// Bytes this tile contributes to the cache budget.
    pub fn content_bytes(&self) -> u64 {
        self.content.as_ref().map_or(0, |c| c.size_bytes())
    }

    pub fn has_children(&self) -> bool {
        match &self.children {
            TileChildren::Pending(descriptors) => !descriptors.is_empty(),
            TileChildren::Expanded(ids) => !ids.is_empty(),
        }
    }

    /// True when selecting this tile can produce pixels right now: either
    /// its content is resident or it has none to load.
    pub fn is_renderable(&self) -> bool {
        match self.state {
            TileState::ContentLoaded | TileState::Renderable => true,
            TileState::Failed => false,
            _ => self.content_handle.is_none(),
        }
    }

    /// True when the tile still needs a content load issued.
    pub fn needs_content_load(&self) -> bool {
        self.content_handle.is_some() && self.state == TileState::Unloaded
    }

    pub(crate) fn rendered_on(&self, frame: u64) -> bool {
        self.last_selection == TileSelection::Rendered && self.last_selection_frame == frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingSphere;
    use glam::DVec3;

    fn descriptor(content: Option<ContentHandle>) -> TileDescriptor {
        TileDescriptor {
            bounding_volume: BoundingVolume::Sphere(BoundingSphere::new(DVec3::ZERO, 10.0)),
            geometric_error: 32.0,
            refine: TileRefine::Replace,
            content,
            children: Vec::new(),
        }
    }

    #[test]
    fn structural_tile_is_immediately_renderable() {
        let tile = Tile::from_descriptor(descriptor(None), None, 0);
        assert!(tile.is_renderable());
        assert!(!tile.needs_content_load());
    }

    #[test]
    fn content_tile_needs_a_load_first() {
        let tile = Tile::from_descriptor(descriptor(Some(ContentHandle::new("0/0/0.b3dm"))), None, 0);
        assert!(!tile.is_renderable());
        assert!(tile.needs_content_load());
    }

    #[test]
    fn failed_tile_is_never_renderable() {
        let mut tile =
            Tile::from_descriptor(descriptor(Some(ContentHandle::new("0/0/0.b3dm"))), None, 0);
        tile.state = TileState::Failed;
        assert!(!tile.is_renderable());
        assert!(!tile.needs_content_load());
    }
}
