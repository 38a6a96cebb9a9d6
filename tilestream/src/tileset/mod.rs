//! The tileset engine: traversal scheduling, load application, eviction,
//! and the per-frame output contract.
//!
//! # Frame anatomy
//!
//! Every [`Tileset::update_view`] call, on the host's main thread:
//!
//! 1. **Apply** — drain finished loads from the dispatcher and apply them
//!    to the tree. This is the only point where worker results become
//!    visible, so a tile is never observed half-updated mid-traversal.
//! 2. **Traverse** — walk the tree once for the whole camera set,
//!    producing the render list, the needed set, and load wishes.
//! 3. **Submit** — feed load wishes to the dispatcher, high band first,
//!    until the simultaneous-load cap is hit; the rest retry next frame.
//! 4. **Sweep** — cancel in-flight loads for tiles the frame no longer
//!    reaches, then evict least-recently-used unneeded content until the
//!    byte budget holds. Eviction is two-phase: a tile spends one frame in
//!    `Destroying` with its content intact before teardown, mirroring the
//!    hide deferral.
//! 5. **Report** — emit the [`ViewUpdateResult`], the deferred hide list,
//!    and the fully-loaded signal when everything needed is resident.

mod events;
mod result;
mod traversal;

pub use events::TilesetEvent;
pub use result::{FrameStats, ViewUpdateResult};

use std::collections::HashSet;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::cache::TileCache;
use crate::config::TilesetOptions;
use crate::error::LoadError;
use crate::loader::{LoadDispatcher, SubmitResult};
use crate::occlusion::{OcclusionProvider, OcclusionQueryPool};
use crate::source::TileSource;
use crate::tile::{ContentHandle, Tile, TileArena, TileContent, TileDescriptor, TileId, TileState};
use crate::view::ViewState;

use traversal::{Traversal, TraversalOutput};

/// Where the tileset is in acquiring its root metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootStatus {
    /// The root fetch+parse is still outstanding; frames are empty.
    Pending,
    /// The tree exists and frames select from it.
    Ready,
    /// The root metadata failed to load or parse. Fatal: every frame is
    /// empty until [`Tileset::refresh`].
    Failed,
}

enum RootSlot {
    Pending(oneshot::Receiver<Result<TileDescriptor, LoadError>>),
    Ready(TileId),
    Failed,
}

/// A streamed level-of-detail tileset.
///
/// Owns the tile tree, the content cache, and all in-flight loads. All
/// methods are main-thread, non-blocking; only loader workers suspend.
pub struct Tileset {
    options: TilesetOptions,
    source: Arc<dyn TileSource>,
    runtime: Handle,
    root_handle: ContentHandle,
    root: RootSlot,
    arena: TileArena,
    cache: TileCache,
    dispatcher: LoadDispatcher,
    occlusion_pool: OcclusionQueryPool,
    occlusion_provider: Option<Box<dyn OcclusionProvider>>,
    events: Option<UnboundedSender<TilesetEvent>>,
    frame_number: u64,
    rendered_last_frame: Vec<TileId>,
    pending_hide: Vec<TileId>,
    pending_destroy: Vec<TileId>,
    last_render_list: Vec<TileId>,
    fully_loaded_announced: bool,
    suspend_update: bool,
}

impl Tileset {
    /// Creates a tileset and immediately starts fetching its root
    /// metadata from `root` via `source`, on `runtime`.
    pub fn new(
        source: Arc<dyn TileSource>,
        root: ContentHandle,
        options: TilesetOptions,
        runtime: Handle,
    ) -> Self {
        let dispatcher = LoadDispatcher::new(
            Arc::clone(&source),
            runtime.clone(),
            options.maximum_simultaneous_tile_loads,
        );
        let occlusion_pool = OcclusionQueryPool::new(options.occlusion_pool_size);
        let mut tileset = Self {
            options,
            source,
            runtime,
            root_handle: root,
            root: RootSlot::Failed, // replaced by spawn_root_load below
            arena: TileArena::new(),
            cache: TileCache::new(),
            dispatcher,
            occlusion_pool,
            occlusion_provider: None,
            events: None,
            frame_number: 0,
            rendered_last_frame: Vec::new(),
            pending_hide: Vec::new(),
            pending_destroy: Vec::new(),
            last_render_list: Vec::new(),
            fully_loaded_announced: false,
            suspend_update: false,
        };
        tileset.spawn_root_load();
        tileset
    }

    // ==================== Host surface ====================

    /// Returns the channel carrying load-failure notifications and the
    /// fully-loaded signal. Subscribing again replaces the previous
    /// receiver.
    pub fn subscribe(&mut self) -> UnboundedReceiver<TilesetEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    /// Installs the host's occlusion collaborator.
    pub fn set_occlusion_provider(&mut self, provider: Box<dyn OcclusionProvider>) {
        self.occlusion_provider = Some(provider);
    }

    pub fn options(&self) -> &TilesetOptions {
        &self.options
    }

    /// Options take effect on the next `update_view`.
    pub fn options_mut(&mut self) -> &mut TilesetOptions {
        &mut self.options
    }

    pub fn root_status(&self) -> RootStatus {
        match self.root {
            RootSlot::Pending(_) => RootStatus::Pending,
            RootSlot::Ready(_) => RootStatus::Ready,
            RootSlot::Failed => RootStatus::Failed,
        }
    }

    /// While set, `update_view` replays the previous selection instead of
    /// traversing. Loads already in flight still complete and apply.
    pub fn set_suspend_update(&mut self, suspend: bool) {
        self.suspend_update = suspend;
    }

    pub fn suspend_update(&self) -> bool {
        self.suspend_update
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.arena.get(id)
    }

    /// Shared content handle for rendering; `None` for stale ids or tiles
    /// without resident content.
    pub fn tile_content(&self, id: TileId) -> Option<Arc<TileContent>> {
        self.arena.get(id).and_then(Tile::content)
    }

    pub fn cached_bytes(&self) -> u64 {
        self.cache.total_bytes()
    }

    pub fn loads_in_flight(&self) -> usize {
        self.dispatcher.in_flight_count()
    }

    /// Finished loads awaiting the next `update_view`.
    pub fn pending_load_results(&self) -> usize {
        self.dispatcher.pending_results()
    }

    /// Drops the current tree, cancels every outstanding load, and
    /// re-fetches the root metadata. The only retry path for `Failed`
    /// tiles and a failed root.
    pub fn refresh(&mut self) {
        info!("refreshing tileset");
        self.dispatcher.cancel_all();
        self.arena.clear();
        self.cache.clear();
        self.occlusion_pool.clear();
        self.rendered_last_frame.clear();
        self.pending_hide.clear();
        self.pending_destroy.clear();
        self.last_render_list.clear();
        self.fully_loaded_announced = false;
        self.spawn_root_load();
    }

    // ==================== Frame driver ====================

    /// Runs one selection frame for the given camera set.
    ///
    /// Never blocks on I/O: content that is not ready simply falls back to
    /// the nearest loaded ancestor per the hole policy.
    pub fn update_view(&mut self, views: &[ViewState]) -> ViewUpdateResult {
        self.frame_number += 1;
        self.apply_load_results();
        self.finalize_destroyed();
        self.poll_root();

        let root = match self.root {
            RootSlot::Ready(id) => id,
            _ => {
                let mut result = ViewUpdateResult::default();
                result.stats.loads_in_flight = self.dispatcher.in_flight_count() as u32;
                return result;
            }
        };

        if self.suspend_update {
            let mut result = ViewUpdateResult {
                tiles_to_render_this_frame: self.last_render_list.clone(),
                ..ViewUpdateResult::default()
            };
            result.stats.loads_in_flight = self.dispatcher.in_flight_count() as u32;
            result.stats.cached_bytes = self.cache.total_bytes();
            return result;
        }

        self.dispatcher
            .set_max_in_flight(self.options.maximum_simultaneous_tile_loads);
        self.occlusion_pool
            .set_capacity(self.options.occlusion_pool_size);

        let prepared: Vec<_> = views.iter().map(ViewState::prepare).collect();
        let traversal = Traversal {
            arena: &mut self.arena,
            cache: &mut self.cache,
            options: &self.options,
            views: &prepared,
            occlusion: self.occlusion_provider.as_deref_mut().map(|p| p as _),
            occlusion_pool: &mut self.occlusion_pool,
            frame: self.frame_number,
            output: TraversalOutput::default(),
        };
        let mut output = traversal.run(root);

        let (submitted, unsubmitted) = self.submit_queued_loads(&output);
        self.cancel_unreachable_loads(&output.needed);
        self.evict_over_budget(&output.needed);

        let render_set: HashSet<TileId> =
            output.render_list.iter().copied().collect();
        let newly_hidden: Vec<TileId> = self
            .rendered_last_frame
            .iter()
            .copied()
            .filter(|id| !render_set.contains(id) && self.arena.contains(*id))
            .collect();
        let hide_now: Vec<TileId> = std::mem::take(&mut self.pending_hide)
            .into_iter()
            .filter(|id| !render_set.contains(id) && self.arena.contains(*id))
            .collect();
        self.pending_hide = newly_hidden.clone();
        self.rendered_last_frame = output.render_list.clone();
        self.last_render_list = output.render_list.clone();

        let in_flight = self.dispatcher.in_flight_count();
        let pending = in_flight + unsubmitted;
        if pending == 0 {
            if !self.fully_loaded_announced {
                debug!(frame = self.frame_number, "tileset fully loaded");
                self.emit(TilesetEvent::FullyLoaded);
                self.fully_loaded_announced = true;
            }
        } else {
            self.fully_loaded_announced = false;
        }

        output.stats.loads_queued = submitted;
        output.stats.loads_in_flight = in_flight as u32;
        output.stats.cached_bytes = self.cache.total_bytes();
        output.stats.load_progress = if pending == 0 {
            100.0
        } else {
            let rendered = output.render_list.len() as f32;
            100.0 * rendered / (rendered + pending as f32)
        };

        ViewUpdateResult {
            tiles_to_render_this_frame: output.render_list,
            tiles_to_hide_this_frame: hide_now,
            tiles_to_hide_next_frame: newly_hidden,
            stats: output.stats,
        }
    }

    // ==================== Frame steps ====================

    /// Applies drained worker results to the tree. The sole place tile
    /// content appears, so traversal never sees a partial update.
    fn apply_load_results(&mut self) {
        for outcome in self.dispatcher.drain() {
            let Some(tile) = self.arena.get_mut(outcome.tile) else {
                continue;
            };
            if tile.state != TileState::ContentLoading {
                continue;
            }
            match outcome.result {
                Ok(content) => {
                    let bytes = content.size_bytes();
                    tile.content = Some(Arc::new(content));
                    tile.state = TileState::ContentLoaded;
                    self.cache.insert(outcome.tile, bytes);
                }
                Err(error) if error.is_cancelled() => {
                    tile.state = TileState::Unloaded;
                }
                Err(error) => {
                    tile.state = TileState::Failed;
                    warn!(
                        tile = %outcome.tile,
                        uri = %outcome.uri,
                        %error,
                        "tile content load failed"
                    );
                    self.emit(TilesetEvent::LoadFailed {
                        tile: Some(outcome.tile),
                        uri: outcome.uri,
                        status: error.status(),
                        message: error.to_string(),
                    });
                }
            }
        }
    }

    fn poll_root(&mut self) {
        let RootSlot::Pending(receiver) = &mut self.root else {
            return;
        };
        match receiver.try_recv() {
            Ok(Ok(descriptor)) => {
                let id = self.arena.insert(Tile::from_descriptor(descriptor, None, 0));
                info!(root = %id, "tileset root metadata ready");
                self.root = RootSlot::Ready(id);
            }
            Ok(Err(error)) => {
                error!(uri = %self.root_handle.uri, %error, "tileset root metadata failed");
                self.emit(TilesetEvent::LoadFailed {
                    tile: None,
                    uri: self.root_handle.uri.clone(),
                    status: error.status(),
                    message: error.to_string(),
                });
                self.root = RootSlot::Failed;
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
            Err(oneshot::error::TryRecvError::Closed) => {
                error!("tileset root load task dropped");
                self.root = RootSlot::Failed;
            }
        }
    }

    /// Feeds queued loads to the dispatcher in band order. Returns how
    /// many were submitted and how many still want a load next frame.
    fn submit_queued_loads(&mut self, output: &TraversalOutput) -> (u32, usize) {
        let mut submitted = 0u32;
        let mut unsubmitted = 0usize;
        let mut saturated = false;
        for band in &output.queues {
            for &tile_id in band {
                let Some(tile) = self.arena.get(tile_id) else {
                    continue;
                };
                // Double-queued tiles resolve here: the first submission
                // flips the state.
                if !tile.needs_content_load() {
                    continue;
                }
                if saturated {
                    unsubmitted += 1;
                    continue;
                }
                let Some(handle) = tile.content_handle.clone() else {
                    continue;
                };
                match self.dispatcher.submit(tile_id, &handle) {
                    SubmitResult::Submitted(_) => {
                        if let Some(tile) = self.arena.get_mut(tile_id) {
                            tile.state = TileState::ContentLoading;
                        }
                        submitted += 1;
                    }
                    SubmitResult::AlreadyInFlight => {}
                    SubmitResult::Saturated => {
                        saturated = true;
                        unsubmitted += 1;
                    }
                }
            }
        }
        (submitted, unsubmitted)
    }

    /// Cancels loads for tiles this frame's traversal never reached —
    /// typically deep descendants left behind by camera motion.
    fn cancel_unreachable_loads(&mut self, needed: &HashSet<TileId>) {
        for tile_id in self.dispatcher.in_flight_tiles() {
            if needed.contains(&tile_id) {
                continue;
            }
            self.dispatcher.cancel(tile_id);
            if let Some(tile) = self.arena.get_mut(tile_id) {
                if tile.state == TileState::ContentLoading {
                    tile.state = TileState::Unloaded;
                }
            }
        }
    }

    /// Marks over-budget tiles `Destroying`. Their content survives until
    /// [`finalize_destroyed`](Self::finalize_destroyed) next frame, so a
    /// host still holding the tile's handle gets one frame to let go.
    fn evict_over_budget(&mut self, needed: &HashSet<TileId>) {
        let evicted = self
            .cache
            .enforce_budget(self.options.maximum_cached_bytes, needed);
        for tile_id in evicted {
            if let Some(tile) = self.arena.get_mut(tile_id) {
                tile.state = TileState::Destroying;
                self.pending_destroy.push(tile_id);
            }
        }
    }

    /// Completes evictions decided last frame.
    fn finalize_destroyed(&mut self) {
        for tile_id in std::mem::take(&mut self.pending_destroy) {
            if let Some(tile) = self.arena.get_mut(tile_id) {
                if tile.state == TileState::Destroying {
                    tile.content = None;
                    tile.state = TileState::Unloaded;
                }
            }
        }
    }

    fn spawn_root_load(&mut self) {
        let (tx, rx) = oneshot::channel();
        let source = Arc::clone(&self.source);
        let uri = self.root_handle.uri.clone();
        let headers = self.root_handle.headers.clone();
        self.runtime.spawn(async move {
            let result = async {
                let bytes = source.fetch(&uri, &headers).await?;
                source.parse_root(&bytes)
            }
            .await;
            let _ = tx.send(result);
        });
        self.root = RootSlot::Pending(rx);
    }

    fn emit(&self, event: TilesetEvent) {
        if let Some(sender) = &self.events {
            let _ = sender.send(event);
        }
    }
}

impl Drop for Tileset {
    fn drop(&mut self) {
        // Outstanding workers observe cancellation and their results are
        // discarded with the dispatcher.
        self.dispatcher.cancel_all();
    }
}
