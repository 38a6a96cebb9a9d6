//! Slotted tile storage with generation-counted ids.
//!
//! The arena is the single owner of all tile nodes. Handles are
//! `(index, generation)` pairs: rebuilding the tree bumps the generation of
//! every reused slot, so a `TileId` held across a refresh resolves to
//! `None` instead of aliasing an unrelated tile.

use super::node::Tile;

/// Stable handle to a tile in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    index: u32,
    generation: u32,
}

impl TileId {
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl std::fmt::Display for TileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tile#{}.{}", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    tile: Option<Tile>,
}

/// Owning storage for every tile in the tree.
#[derive(Debug, Default)]
pub struct TileArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl TileArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn insert(&mut self, tile: Tile) -> TileId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.tile = Some(tile);
            TileId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                tile: Some(tile),
            });
            TileId {
                index,
                generation: 0,
            }
        }
    }

    pub fn get(&self, id: TileId) -> Option<&Tile> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.tile.as_ref()
    }

    pub fn get_mut(&mut self, id: TileId) -> Option<&mut Tile> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.tile.as_mut()
    }

    /// True when `id` still resolves to a live tile.
    pub fn contains(&self, id: TileId) -> bool {
        self.get(id).is_some()
    }

    /// Removes one tile, invalidating its id.
    pub fn remove(&mut self, id: TileId) -> Option<Tile> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let tile = slot.tile.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(tile)
    }

    /// Drops every tile and invalidates every outstanding id.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.tile.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
        self.live = 0;
    }

    /// Iterates over live tiles.
    pub fn iter(&self) -> impl Iterator<Item = (TileId, &Tile)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.tile.as_ref().map(|tile| {
                (
                    TileId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    tile,
                )
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BoundingSphere, BoundingVolume};
    use crate::tile::{TileDescriptor, TileRefine};
    use glam::DVec3;

    fn tile() -> Tile {
        Tile::from_descriptor(
            TileDescriptor {
                bounding_volume: BoundingVolume::Sphere(BoundingSphere::new(DVec3::ZERO, 1.0)),
                geometric_error: 1.0,
                refine: TileRefine::Replace,
                content: None,
                children: Vec::new(),
            },
            None,
            0,
        )
    }

    #[test]
    fn insert_and_lookup() {
        let mut arena = TileArena::new();
        let id = arena.insert(tile());
        assert!(arena.contains(id));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn stale_id_after_remove_does_not_resolve() {
        let mut arena = TileArena::new();
        let id = arena.insert(tile());
        arena.remove(id);
        assert!(!arena.contains(id));

        // Slot reuse must not resurrect the old id.
        let reused = arena.insert(tile());
        assert_eq!(reused.index(), id.index());
        assert!(!arena.contains(id));
        assert!(arena.contains(reused));
    }

    #[test]
    fn clear_invalidates_all_ids() {
        let mut arena = TileArena::new();
        let a = arena.insert(tile());
        let b = arena.insert(tile());
        arena.clear();
        assert!(arena.is_empty());
        assert!(!arena.contains(a));
        assert!(!arena.contains(b));
    }
}
