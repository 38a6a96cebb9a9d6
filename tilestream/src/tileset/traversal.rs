//! The per-frame tile selection walk.
//!
//! One traversal serves all cameras: a tile is visible when any view's
//! frustum contains it, and its screen-space error is the maximum over the
//! views, so a tile needed by one camera is never regressed to a coarser
//! level for another's sake.
//!
//! The walk never blocks: content that is not resident is simply noted in
//! the subtree's [`TraversalDetails`], and the parent decides between
//! accepting a transient hole and standing in for its children ("kicking"
//! them back out of the render list).

use std::collections::HashSet;

use crate::cache::TileCache;
use crate::config::TilesetOptions;
use crate::geometry::BoundingVolume;
use crate::loader::LoadPriority;
use crate::occlusion::{OcclusionProvider, OcclusionQueryPool, TileOcclusionState};
use crate::tile::{Tile, TileArena, TileChildren, TileId, TileRefine, TileSelection, TileState};
use crate::view::PreparedView;

use super::result::FrameStats;

/// Aggregate readiness of a visited subtree, reported to the parent.
#[derive(Debug, Clone, Copy)]
pub(super) struct TraversalDetails {
    /// Every selected tile in the subtree can produce pixels now.
    pub all_are_renderable: bool,
    /// Some selected tile in the subtree was rendered last frame, so
    /// kicking the subtree would visibly regress detail.
    pub any_were_rendered_last_frame: bool,
    /// Selected tiles still waiting on content.
    pub not_yet_renderable_count: u32,
    /// A tile in the subtree failed terminally.
    pub any_failed: bool,
}

impl TraversalDetails {
    /// Details of a subtree that imposes nothing on its parent (culled or
    /// empty).
    pub fn none() -> Self {
        Self {
            all_are_renderable: true,
            any_were_rendered_last_frame: false,
            not_yet_renderable_count: 0,
            any_failed: false,
        }
    }

    pub fn combine(self, other: Self) -> Self {
        Self {
            all_are_renderable: self.all_are_renderable && other.all_are_renderable,
            any_were_rendered_last_frame: self.any_were_rendered_last_frame
                || other.any_were_rendered_last_frame,
            not_yet_renderable_count: self.not_yet_renderable_count
                + other.not_yet_renderable_count,
            any_failed: self.any_failed || other.any_failed,
        }
    }
}

fn band_index(priority: LoadPriority) -> usize {
    match priority {
        LoadPriority::High => 0,
        LoadPriority::Medium => 1,
        LoadPriority::Low => 2,
    }
}

/// Everything a traversal produces for the frame driver.
#[derive(Debug, Default)]
pub(super) struct TraversalOutput {
    pub render_list: Vec<TileId>,
    /// Tiles touched this frame; the eviction sweep must skip these.
    pub needed: HashSet<TileId>,
    /// Per-band load wishes, submitted high band first.
    pub queues: [Vec<TileId>; 3],
    pub stats: FrameStats,
}

/// Borrowed engine state for one frame's walk.
pub(super) struct Traversal<'a> {
    pub arena: &'a mut TileArena,
    pub cache: &'a mut TileCache,
    pub options: &'a TilesetOptions,
    pub views: &'a [PreparedView],
    pub occlusion: Option<&'a mut (dyn OcclusionProvider + 'a)>,
    pub occlusion_pool: &'a mut OcclusionQueryPool,
    pub frame: u64,
    pub output: TraversalOutput,
}

impl<'a> Traversal<'a> {
    pub fn run(mut self, root: TileId) -> TraversalOutput {
        self.visit_tile(root);
        if self.options.enable_occlusion_culling {
            self.occlusion_pool.sweep(self.frame);
        }
        self.output
    }

    fn visit_tile(&mut self, id: TileId) -> TraversalDetails {
        let Some(tile) = self.arena.get(id) else {
            return TraversalDetails::none();
        };
        let bounding_volume = tile.bounding_volume;
        let geometric_error = tile.geometric_error;
        let depth = tile.depth;
        let refine = tile.refine;
        let has_children = tile.has_children();

        self.output.stats.tiles_visited += 1;
        self.output.stats.max_depth_visited = self.output.stats.max_depth_visited.max(depth);
        self.output.needed.insert(id);
        self.cache.touch(id);

        let visible = self.is_visible(&bounding_volume);
        let mut threshold = self.options.maximum_screen_space_error;
        let mut render_allowed = true;
        if !visible {
            self.output.stats.tiles_culled += 1;
            if !self.options.enforce_culled_screen_space_error {
                self.set_selection(id, TileSelection::Culled);
                return TraversalDetails::none();
            }
            // Keep refining toward the relaxed target, without rendering.
            threshold = self.options.culled_screen_space_error;
            render_allowed = false;
        }

        let mut hold_refinement = false;
        if visible && self.options.enable_occlusion_culling {
            match self.occlusion_state(id, &bounding_volume) {
                TileOcclusionState::Occluded => {
                    self.output.stats.tiles_occluded += 1;
                    self.set_selection(id, TileSelection::Culled);
                    return TraversalDetails::none();
                }
                TileOcclusionState::Unknown => {
                    // Never guess: either wait at this level or refine
                    // optimistically, per configuration.
                    hold_refinement = self.options.delay_refinement_for_occlusion;
                }
                TileOcclusionState::Visible => {}
            }
        }

        let sse = self.max_screen_space_error(geometric_error, &bounding_volume);
        let meets_sse = sse <= threshold;

        if meets_sse || !has_children || hold_refinement {
            let priority = if !render_allowed {
                LoadPriority::Low
            } else if meets_sse {
                LoadPriority::Medium
            } else {
                // Wants to refine but cannot; this tile blocks detail.
                LoadPriority::High
            };
            return self.select_tile(id, render_allowed, priority);
        }

        self.refine_tile(id, refine, render_allowed)
    }

    /// Descends into a tile's children, then applies the hole policy.
    fn refine_tile(
        &mut self,
        id: TileId,
        refine: TileRefine,
        render_allowed: bool,
    ) -> TraversalDetails {
        if self.options.preload_ancestors {
            self.queue_load(id, LoadPriority::Low);
        }

        // Additive parents render alongside their children and are never
        // kicked: a missing additive child just means less detail.
        let additive = refine == TileRefine::Additive;
        let parent_details = if additive {
            Some(self.select_tile(id, render_allowed, LoadPriority::Medium))
        } else {
            None
        };

        let children = self.expand_children(id);
        let render_mark = self.output.render_list.len();
        let queue_marks = [
            self.output.queues[0].len(),
            self.output.queues[1].len(),
            self.output.queues[2].len(),
        ];

        let mut details = TraversalDetails::none();
        for child in &children {
            details = details.combine(self.visit_tile(*child));
        }

        if self.options.preload_siblings {
            for child in &children {
                self.queue_load(*child, LoadPriority::Low);
            }
        }

        let wait_for_subtree = self.options.forbid_holes || details.any_failed;
        let must_kick = !additive
            && wait_for_subtree
            && !details.all_are_renderable
            && !details.any_were_rendered_last_frame;

        if must_kick {
            let kicked: Vec<TileId> = self.output.render_list.drain(render_mark..).collect();
            for tile_id in kicked {
                self.set_selection(tile_id, TileSelection::Kicked);
            }
            if details.not_yet_renderable_count > self.options.loading_descendant_limit {
                // Too much of the subtree is outstanding: stop feeding it
                // and concentrate on making this tile presentable.
                for (band, mark) in self.output.queues.iter_mut().zip(queue_marks) {
                    band.truncate(mark);
                }
                return self.select_tile(id, render_allowed, LoadPriority::High);
            }
            // Subtree keeps loading; this tile stands in meanwhile.
            return self.select_tile(id, render_allowed, LoadPriority::Medium);
        }

        self.set_selection(id, TileSelection::Refined);
        match parent_details {
            Some(parent) => parent.combine(details),
            None => details,
        }
    }

    /// Selects a tile at its own level, queueing its load if content is
    /// missing and rendering it if permitted and ready.
    fn select_tile(
        &mut self,
        id: TileId,
        render: bool,
        priority: LoadPriority,
    ) -> TraversalDetails {
        self.queue_load(id, priority);

        if !render {
            // Culled-but-enforced: load, never render, impose nothing.
            self.set_selection(id, TileSelection::Culled);
            return TraversalDetails::none();
        }

        let previous_frame = self.frame.saturating_sub(1);
        let Some(tile) = self.arena.get_mut(id) else {
            return TraversalDetails::none();
        };
        let renderable = tile.is_renderable();
        let failed = tile.state == TileState::Failed;
        let rendered_last_frame = tile.rendered_on(previous_frame);

        if renderable {
            if tile.state == TileState::ContentLoaded {
                tile.state = TileState::Renderable;
            }
            tile.last_selection = TileSelection::Rendered;
            tile.last_selection_frame = self.frame;
            self.output.render_list.push(id);
        } else {
            tile.last_selection = TileSelection::None;
            tile.last_selection_frame = self.frame;
        }

        TraversalDetails {
            all_are_renderable: renderable,
            any_were_rendered_last_frame: rendered_last_frame,
            not_yet_renderable_count: if renderable || failed { 0 } else { 1 },
            any_failed: failed,
        }
    }

    /// Instantiates a tile's children on first descent.
    fn expand_children(&mut self, id: TileId) -> Vec<TileId> {
        let (descriptors, depth) = {
            let Some(tile) = self.arena.get_mut(id) else {
                return Vec::new();
            };
            let depth = tile.depth + 1;
            match &mut tile.children {
                TileChildren::Expanded(ids) => return ids.clone(),
                TileChildren::Pending(descriptors) => (std::mem::take(descriptors), depth),
            }
        };
        let ids: Vec<TileId> = descriptors
            .into_iter()
            .map(|descriptor| {
                self.arena
                    .insert(Tile::from_descriptor(descriptor, Some(id), depth))
            })
            .collect();
        if let Some(tile) = self.arena.get_mut(id) {
            tile.children = TileChildren::Expanded(ids.clone());
        }
        ids
    }

    fn queue_load(&mut self, id: TileId, priority: LoadPriority) {
        let Some(tile) = self.arena.get(id) else {
            return;
        };
        if tile.needs_content_load() {
            self.output.queues[band_index(priority)].push(id);
        }
    }

    fn set_selection(&mut self, id: TileId, selection: TileSelection) {
        if let Some(tile) = self.arena.get_mut(id) {
            tile.last_selection = selection;
            tile.last_selection_frame = self.frame;
        }
    }

    fn is_visible(&self, bounding_volume: &BoundingVolume) -> bool {
        if self.options.enable_frustum_culling
            && !self
                .views
                .iter()
                .any(|view| view.culling_volume.intersects(bounding_volume))
        {
            return false;
        }
        if self.options.enable_fog_culling && !self.views.is_empty() {
            let beyond_fog_everywhere = self.views.iter().all(|view| {
                view.fog_end_distance
                    .is_some_and(|end| view.distance_to(bounding_volume) > end)
            });
            if beyond_fog_everywhere {
                return false;
            }
        }
        true
    }

    fn max_screen_space_error(
        &self,
        geometric_error: f64,
        bounding_volume: &BoundingVolume,
    ) -> f64 {
        self.views
            .iter()
            .map(|view| {
                view.screen_space_error(geometric_error, view.distance_to(bounding_volume))
            })
            .fold(0.0, f64::max)
    }

    fn occlusion_state(
        &mut self,
        id: TileId,
        bounding_volume: &BoundingVolume,
    ) -> TileOcclusionState {
        let Some(provider) = self.occlusion.as_deref_mut() else {
            return TileOcclusionState::Visible;
        };
        // Out of pooled queries: optimistically visible, never guessed
        // occluded.
        if !self.occlusion_pool.acquire(id, self.frame) {
            return TileOcclusionState::Visible;
        }
        provider.query_occlusion_state(id, bounding_volume)
    }
}
