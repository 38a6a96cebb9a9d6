//! End-to-end selection scenarios driven through the public API with a
//! scripted content source.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use glam::DVec3;
use parking_lot::Mutex;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::UnboundedReceiver;

use tilestream::geometry::{BoundingSphere, BoundingVolume};
use tilestream::source::{BoxFuture, TileSource};
use tilestream::{
    ContentHandle, LoadError, OcclusionProvider, RootStatus, TileContent, TileDescriptor, TileId,
    TileOcclusionState, TileRefine, TileState, Tileset, TilesetEvent, TilesetOptions, ViewState,
};

const CONTENT_BYTES: u64 = 64;
const ROOT_URI: &str = "tileset.json";

/// Content source with scriptable failures and per-URI stalls.
struct ScriptedSource {
    root: TileDescriptor,
    fail_root: AtomicBool,
    fail_parse: HashSet<String>,
    blocked: Mutex<HashSet<String>>,
    gate: tokio::sync::Notify,
    fetches: Mutex<Vec<String>>,
}

impl ScriptedSource {
    fn new(root: TileDescriptor) -> Self {
        Self {
            root,
            fail_root: AtomicBool::new(false),
            fail_parse: HashSet::new(),
            blocked: Mutex::new(HashSet::new()),
            gate: tokio::sync::Notify::new(),
            fetches: Mutex::new(Vec::new()),
        }
    }

    fn failing_parse(mut self, uris: &[&str]) -> Self {
        self.fail_parse = uris.iter().map(|s| s.to_string()).collect();
        self
    }

    fn blocking(self, uris: &[&str]) -> Self {
        *self.blocked.lock() = uris.iter().map(|s| s.to_string()).collect();
        self
    }

    fn fetch_count(&self, uri: &str) -> usize {
        self.fetches.lock().iter().filter(|u| *u == uri).count()
    }
}

impl TileSource for ScriptedSource {
    fn fetch(
        &self,
        uri: &str,
        _headers: &[(String, String)],
    ) -> BoxFuture<'_, Result<Bytes, LoadError>> {
        self.fetches.lock().push(uri.to_owned());
        let uri = uri.to_owned();
        Box::pin(async move {
            while self.blocked.lock().contains(&uri) {
                self.gate.notified().await;
            }
            Ok(Bytes::from_static(b"payload"))
        })
    }

    fn parse_root(&self, _bytes: &[u8]) -> Result<TileDescriptor, LoadError> {
        if self.fail_root.load(Ordering::SeqCst) {
            return Err(LoadError::Parse("malformed tileset metadata".into()));
        }
        Ok(self.root.clone())
    }

    fn parse_content(&self, uri: &str, _bytes: Bytes) -> Result<TileContent, LoadError> {
        if self.fail_parse.contains(uri) {
            return Err(LoadError::Parse(format!("unreadable payload: {uri}")));
        }
        Ok(TileContent::new(uri.to_owned(), CONTENT_BYTES))
    }
}

/// Occlusion collaborator answering the same state for every tile.
struct FixedOcclusion(TileOcclusionState);

impl OcclusionProvider for FixedOcclusion {
    fn query_occlusion_state(
        &mut self,
        _tile: TileId,
        _bounding_volume: &BoundingVolume,
    ) -> TileOcclusionState {
        self.0
    }
}

// ==================== Fixtures ====================

/// All test tiles share one bounding sphere at (0, 0, -100); selection is
/// steered purely through geometric error and camera distance.
fn volume() -> BoundingVolume {
    BoundingVolume::Sphere(BoundingSphere::new(DVec3::new(0.0, 0.0, -100.0), 10.0))
}

fn leaf(uri: &str, geometric_error: f64) -> TileDescriptor {
    TileDescriptor {
        bounding_volume: volume(),
        geometric_error,
        refine: TileRefine::Replace,
        content: Some(ContentHandle::new(uri)),
        children: Vec::new(),
    }
}

fn parent(
    uri: Option<&str>,
    geometric_error: f64,
    refine: TileRefine,
    children: Vec<TileDescriptor>,
) -> TileDescriptor {
    TileDescriptor {
        bounding_volume: volume(),
        geometric_error,
        refine,
        content: uri.map(ContentHandle::new),
        children,
    }
}

/// Camera 90 units from the tile surface: geometric error 64 projects to
/// ~273 px (refines) and error 1 to ~4.3 px (satisfies the default 16).
fn near_view() -> ViewState {
    ViewState::new(
        DVec3::ZERO,
        DVec3::NEG_Z,
        DVec3::Y,
        1024.0,
        768.0,
        std::f64::consts::FRAC_PI_2,
        std::f64::consts::FRAC_PI_2,
    )
}

/// Camera ~2090 units out: even geometric error 64 projects under 16 px.
fn far_view() -> ViewState {
    let mut view = near_view();
    view.position = DVec3::new(0.0, 0.0, 2000.0);
    view
}

fn new_tileset(source: Arc<ScriptedSource>, options: TilesetOptions, rt: &Runtime) -> Tileset {
    Tileset::new(
        source,
        ContentHandle::new(ROOT_URI),
        options,
        rt.handle().clone(),
    )
}

fn wait_for_root(tileset: &mut Tileset) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        tileset.update_view(&[]);
        match tileset.root_status() {
            RootStatus::Ready => return,
            RootStatus::Failed => panic!("root load failed"),
            RootStatus::Pending => {}
        }
        assert!(Instant::now() < deadline, "timed out waiting for root");
        std::thread::sleep(Duration::from_millis(2));
    }
}

fn wait_for_results(tileset: &Tileset, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while tileset.pending_load_results() < count {
        assert!(
            Instant::now() < deadline,
            "timed out waiting for {count} load results"
        );
        std::thread::sleep(Duration::from_millis(2));
    }
}

/// Unblocks every stalled fetch, then waits for `count` pending results.
fn release_and_wait(source: &ScriptedSource, tileset: &Tileset, count: usize) {
    source.blocked.lock().clear();
    let deadline = Instant::now() + Duration::from_secs(5);
    while tileset.pending_load_results() < count {
        assert!(
            Instant::now() < deadline,
            "timed out waiting for {count} load results"
        );
        source.gate.notify_waiters();
        std::thread::sleep(Duration::from_millis(2));
    }
}

fn drain_events(rx: &mut UnboundedReceiver<TilesetEvent>) -> Vec<TilesetEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ==================== Scenarios ====================

#[test]
fn root_alone_renders_once_loaded_and_signals_fully_loaded() {
    let rt = Runtime::new().unwrap();
    let source = Arc::new(ScriptedSource::new(leaf("root.bin", 2.0)));
    let mut tileset = new_tileset(Arc::clone(&source), TilesetOptions::default(), &rt);
    let mut events = tileset.subscribe();
    wait_for_root(&mut tileset);
    drain_events(&mut events);

    // First sighting queues the load; nothing is renderable yet.
    let frame = tileset.update_view(&[near_view()]);
    assert!(frame.tiles_to_render_this_frame.is_empty());
    assert_eq!(frame.stats.loads_queued, 1);
    assert!(frame.stats.load_progress < 100.0);

    wait_for_results(&tileset, 1);
    let frame = tileset.update_view(&[near_view()]);
    assert_eq!(frame.tiles_to_render_this_frame.len(), 1);
    let root = frame.tiles_to_render_this_frame[0];
    assert!(tileset.tile_content(root).is_some());
    assert_eq!(frame.stats.load_progress, 100.0);
    assert_eq!(frame.stats.cached_bytes, CONTENT_BYTES);
    assert_eq!(drain_events(&mut events), vec![TilesetEvent::FullyLoaded]);

    // Quiescent frames do not repeat the signal or reload anything.
    tileset.update_view(&[near_view()]);
    assert!(drain_events(&mut events).is_empty());
    assert_eq!(source.fetch_count("root.bin"), 1);
}

#[test]
fn replace_refinement_swaps_parent_for_children_and_defers_hides() {
    let rt = Runtime::new().unwrap();
    let root = parent(
        Some("root.bin"),
        64.0,
        TileRefine::Replace,
        vec![leaf("a.bin", 1.0), leaf("b.bin", 1.0)],
    );
    let source = Arc::new(ScriptedSource::new(root));
    let mut tileset = new_tileset(Arc::clone(&source), TilesetOptions::default(), &rt);
    wait_for_root(&mut tileset);

    tileset.update_view(&[near_view()]);
    wait_for_results(&tileset, 3); // both children plus the ancestor preload

    let frame = tileset.update_view(&[near_view()]);
    let rendered: HashSet<_> = frame.tiles_to_render_this_frame.iter().copied().collect();
    assert_eq!(rendered.len(), 2);
    let children = rendered.clone();

    // Zooming out collapses back to the root; children hide one frame late.
    let frame = tileset.update_view(&[far_view()]);
    assert_eq!(frame.tiles_to_render_this_frame.len(), 1);
    let root_id = frame.tiles_to_render_this_frame[0];
    assert!(!children.contains(&root_id));
    assert!(frame.tiles_to_hide_this_frame.is_empty());
    let deferred: HashSet<_> = frame.tiles_to_hide_next_frame.iter().copied().collect();
    assert_eq!(deferred, children);

    let frame = tileset.update_view(&[far_view()]);
    let hidden: HashSet<_> = frame.tiles_to_hide_this_frame.iter().copied().collect();
    assert_eq!(hidden, children);
}

#[test]
fn forbid_holes_keeps_parent_rendered_until_children_ready() {
    let rt = Runtime::new().unwrap();
    let root = parent(
        Some("root.bin"),
        64.0,
        TileRefine::Replace,
        vec![leaf("a.bin", 1.0), leaf("b.bin", 1.0)],
    );
    let source = Arc::new(ScriptedSource::new(root).blocking(&["a.bin", "b.bin"]));
    let options = TilesetOptions {
        forbid_holes: true,
        ..TilesetOptions::default()
    };
    let mut tileset = new_tileset(Arc::clone(&source), options, &rt);
    wait_for_root(&mut tileset);

    tileset.update_view(&[near_view()]);
    wait_for_results(&tileset, 1); // only the root's own content can finish

    // Children are still loading, so the root stands in.
    let frame = tileset.update_view(&[near_view()]);
    assert_eq!(frame.tiles_to_render_this_frame.len(), 1);
    let root_id = frame.tiles_to_render_this_frame[0];

    release_and_wait(&source, &tileset, 2);
    let frame = tileset.update_view(&[near_view()]);
    assert_eq!(frame.tiles_to_render_this_frame.len(), 2);
    assert!(!frame.tiles_to_render_this_frame.contains(&root_id));
}

#[test]
fn without_forbid_holes_refinement_tolerates_missing_children() {
    let rt = Runtime::new().unwrap();
    let root = parent(
        Some("root.bin"),
        64.0,
        TileRefine::Replace,
        vec![leaf("a.bin", 1.0), leaf("b.bin", 1.0)],
    );
    let source = Arc::new(ScriptedSource::new(root).blocking(&["a.bin", "b.bin"]));
    let mut tileset = new_tileset(Arc::clone(&source), TilesetOptions::default(), &rt);
    wait_for_root(&mut tileset);

    tileset.update_view(&[near_view()]);
    wait_for_results(&tileset, 1);

    // Holes allowed: the refined parent is dropped even though no child
    // can render yet.
    let frame = tileset.update_view(&[near_view()]);
    assert!(frame.tiles_to_render_this_frame.is_empty());
}

#[test]
fn additive_refinement_renders_parent_alongside_children() {
    let rt = Runtime::new().unwrap();
    let root = parent(
        Some("root.bin"),
        64.0,
        TileRefine::Additive,
        vec![leaf("a.bin", 1.0), leaf("b.bin", 1.0)],
    );
    let source = Arc::new(ScriptedSource::new(root));
    let mut tileset = new_tileset(Arc::clone(&source), TilesetOptions::default(), &rt);
    wait_for_root(&mut tileset);

    tileset.update_view(&[near_view()]);
    wait_for_results(&tileset, 3);

    let frame = tileset.update_view(&[near_view()]);
    assert_eq!(frame.tiles_to_render_this_frame.len(), 3);
}

#[test]
fn parse_failure_is_terminal_and_parent_covers_the_hole() {
    let rt = Runtime::new().unwrap();
    let root = parent(
        Some("root.bin"),
        64.0,
        TileRefine::Replace,
        vec![leaf("a.bin", 1.0), leaf("b.bin", 1.0)],
    );
    let source = Arc::new(ScriptedSource::new(root).failing_parse(&["a.bin"]));
    let mut tileset = new_tileset(Arc::clone(&source), TilesetOptions::default(), &rt);
    let mut events = tileset.subscribe();
    wait_for_root(&mut tileset);
    drain_events(&mut events);

    tileset.update_view(&[near_view()]);
    wait_for_results(&tileset, 3);

    // The failed subtree can never complete, so the root stands in.
    let frame = tileset.update_view(&[near_view()]);
    assert_eq!(frame.tiles_to_render_this_frame.len(), 1);
    let failures: Vec<_> = drain_events(&mut events)
        .into_iter()
        .filter(|e| matches!(e, TilesetEvent::LoadFailed { .. }))
        .collect();
    match failures.as_slice() {
        [TilesetEvent::LoadFailed { tile, uri, message, .. }] => {
            assert!(tile.is_some());
            assert_eq!(uri, "a.bin");
            assert!(message.contains("a.bin"));
        }
        other => panic!("expected one failure event, got {other:?}"),
    }

    // No automatic retry: the failed tile is never fetched again.
    tileset.update_view(&[near_view()]);
    let frame = tileset.update_view(&[near_view()]);
    assert_eq!(frame.tiles_to_render_this_frame.len(), 1);
    assert_eq!(source.fetch_count("a.bin"), 1);
    assert!(drain_events(&mut events)
        .iter()
        .all(|e| !matches!(e, TilesetEvent::LoadFailed { .. })));
}

#[test]
fn in_flight_loads_never_exceed_the_cap() {
    let rt = Runtime::new().unwrap();
    let children = vec![
        leaf("a.bin", 1.0),
        leaf("b.bin", 1.0),
        leaf("c.bin", 1.0),
        leaf("d.bin", 1.0),
    ];
    let root = parent(None, 64.0, TileRefine::Replace, children);
    let source = Arc::new(
        ScriptedSource::new(root).blocking(&["a.bin", "b.bin", "c.bin", "d.bin"]),
    );
    let options = TilesetOptions {
        maximum_simultaneous_tile_loads: 2,
        ..TilesetOptions::default()
    };
    let mut tileset = new_tileset(Arc::clone(&source), options, &rt);
    wait_for_root(&mut tileset);

    let frame = tileset.update_view(&[near_view()]);
    assert_eq!(frame.stats.loads_queued, 2);
    assert_eq!(tileset.loads_in_flight(), 2);

    // Re-requesting while saturated changes nothing.
    tileset.update_view(&[near_view()]);
    assert_eq!(tileset.loads_in_flight(), 2);

    release_and_wait(&source, &tileset, 2);
    let frame = tileset.update_view(&[near_view()]);
    assert_eq!(frame.tiles_to_render_this_frame.len(), 2);
    assert_eq!(tileset.loads_in_flight(), 2);

    release_and_wait(&source, &tileset, 2);
    let frame = tileset.update_view(&[near_view()]);
    assert_eq!(frame.tiles_to_render_this_frame.len(), 4);
    assert_eq!(tileset.loads_in_flight(), 0);
    assert_eq!(source.fetches.lock().len(), 5); // root metadata + 4 tiles
}

#[test]
fn needed_tiles_survive_a_zero_byte_budget() {
    let rt = Runtime::new().unwrap();
    let root = parent(
        Some("root.bin"),
        64.0,
        TileRefine::Replace,
        vec![leaf("a.bin", 1.0), leaf("b.bin", 1.0)],
    );
    let source = Arc::new(ScriptedSource::new(root));
    let options = TilesetOptions {
        maximum_cached_bytes: 0,
        ..TilesetOptions::default()
    };
    let mut tileset = new_tileset(Arc::clone(&source), options, &rt);
    wait_for_root(&mut tileset);

    tileset.update_view(&[near_view()]);
    wait_for_results(&tileset, 3);

    // Budget is soft: everything resident is needed this frame.
    let frame = tileset.update_view(&[near_view()]);
    let children: Vec<_> = frame.tiles_to_render_this_frame.clone();
    assert_eq!(children.len(), 2);
    assert_eq!(frame.stats.cached_bytes, 3 * CONTENT_BYTES);

    // Zoomed out, the children leave the needed set. Eviction is
    // two-phase: this frame they only enter `Destroying`, content intact.
    let frame = tileset.update_view(&[far_view()]);
    assert_eq!(frame.tiles_to_render_this_frame.len(), 1);
    assert_eq!(frame.stats.cached_bytes, CONTENT_BYTES);
    for child in &children {
        let tile = tileset.tile(*child).unwrap();
        assert_eq!(tile.state(), TileState::Destroying);
        assert!(tileset.tile_content(*child).is_some());
    }

    // The following frame completes the teardown.
    tileset.update_view(&[far_view()]);
    for child in children {
        let tile = tileset.tile(child).unwrap();
        assert_eq!(tile.state(), TileState::Unloaded);
        assert!(tileset.tile_content(child).is_none());
    }
}

#[test]
fn suspend_update_replays_the_previous_selection() {
    let rt = Runtime::new().unwrap();
    let source = Arc::new(ScriptedSource::new(leaf("root.bin", 2.0)));
    let mut tileset = new_tileset(Arc::clone(&source), TilesetOptions::default(), &rt);
    wait_for_root(&mut tileset);

    tileset.update_view(&[near_view()]);
    wait_for_results(&tileset, 1);
    let frame = tileset.update_view(&[near_view()]);
    let rendered = frame.tiles_to_render_this_frame.clone();
    assert_eq!(rendered.len(), 1);

    // Frozen: the camera moved away but the selection holds.
    tileset.set_suspend_update(true);
    let frame = tileset.update_view(&[far_view()]);
    assert_eq!(frame.tiles_to_render_this_frame, rendered);
    let frame = tileset.update_view(&[]);
    assert_eq!(frame.tiles_to_render_this_frame, rendered);

    tileset.set_suspend_update(false);
    let frame = tileset.update_view(&[near_view()]);
    assert_eq!(frame.tiles_to_render_this_frame, rendered);
}

#[test]
fn refresh_discards_the_tree_and_refetches_the_root() {
    let rt = Runtime::new().unwrap();
    let source = Arc::new(ScriptedSource::new(leaf("root.bin", 2.0)));
    let mut tileset = new_tileset(Arc::clone(&source), TilesetOptions::default(), &rt);
    wait_for_root(&mut tileset);

    tileset.update_view(&[near_view()]);
    wait_for_results(&tileset, 1);
    let frame = tileset.update_view(&[near_view()]);
    let old_root = frame.tiles_to_render_this_frame[0];

    tileset.refresh();
    assert_eq!(tileset.root_status(), RootStatus::Pending);
    assert!(tileset.tile(old_root).is_none());
    assert_eq!(tileset.cached_bytes(), 0);

    wait_for_root(&mut tileset);
    tileset.update_view(&[near_view()]);
    wait_for_results(&tileset, 1);
    let frame = tileset.update_view(&[near_view()]);
    assert_eq!(frame.tiles_to_render_this_frame.len(), 1);
    assert_eq!(source.fetch_count(ROOT_URI), 2);
    assert_eq!(source.fetch_count("root.bin"), 2);
}

#[test]
fn occluded_tiles_are_culled_and_never_loaded() {
    let rt = Runtime::new().unwrap();
    let source = Arc::new(ScriptedSource::new(leaf("root.bin", 2.0)));
    let options = TilesetOptions {
        enable_occlusion_culling: true,
        ..TilesetOptions::default()
    };
    let mut tileset = new_tileset(Arc::clone(&source), options, &rt);
    tileset.set_occlusion_provider(Box::new(FixedOcclusion(TileOcclusionState::Occluded)));
    wait_for_root(&mut tileset);

    let frame = tileset.update_view(&[near_view()]);
    assert!(frame.tiles_to_render_this_frame.is_empty());
    assert_eq!(frame.stats.tiles_occluded, 1);
    assert_eq!(frame.stats.loads_queued, 0);
    assert_eq!(source.fetch_count("root.bin"), 0);
}

#[test]
fn unknown_occlusion_with_delay_holds_refinement() {
    let rt = Runtime::new().unwrap();
    let root = parent(
        Some("root.bin"),
        64.0,
        TileRefine::Replace,
        vec![leaf("a.bin", 1.0), leaf("b.bin", 1.0)],
    );
    let source = Arc::new(ScriptedSource::new(root));
    let options = TilesetOptions {
        enable_occlusion_culling: true,
        ..TilesetOptions::default() // delay_refinement_for_occlusion: true
    };
    let mut tileset = new_tileset(Arc::clone(&source), options, &rt);
    tileset.set_occlusion_provider(Box::new(FixedOcclusion(TileOcclusionState::Unknown)));
    wait_for_root(&mut tileset);

    // The unresolved query pins selection at the root; children are never
    // visited, so only the root's own content is requested.
    let frame = tileset.update_view(&[near_view()]);
    assert_eq!(frame.stats.loads_queued, 1);
    wait_for_results(&tileset, 1);

    let frame = tileset.update_view(&[near_view()]);
    assert_eq!(frame.tiles_to_render_this_frame.len(), 1);
    assert_eq!(source.fetch_count("a.bin"), 0);
    assert_eq!(source.fetch_count("b.bin"), 0);
}

#[test]
fn unknown_occlusion_without_delay_refines_optimistically() {
    let rt = Runtime::new().unwrap();
    let root = parent(
        Some("root.bin"),
        64.0,
        TileRefine::Replace,
        vec![leaf("a.bin", 1.0), leaf("b.bin", 1.0)],
    );
    let source = Arc::new(ScriptedSource::new(root));
    let options = TilesetOptions {
        enable_occlusion_culling: true,
        delay_refinement_for_occlusion: false,
        ..TilesetOptions::default()
    };
    let mut tileset = new_tileset(Arc::clone(&source), options, &rt);
    tileset.set_occlusion_provider(Box::new(FixedOcclusion(TileOcclusionState::Unknown)));
    wait_for_root(&mut tileset);

    tileset.update_view(&[near_view()]);
    wait_for_results(&tileset, 3);

    let frame = tileset.update_view(&[near_view()]);
    assert_eq!(frame.tiles_to_render_this_frame.len(), 2);
    assert_eq!(source.fetch_count("a.bin"), 1);
    assert_eq!(source.fetch_count("b.bin"), 1);
}

#[test]
fn multi_camera_union_selects_the_most_refined_level() {
    let rt = Runtime::new().unwrap();
    let root = parent(
        Some("root.bin"),
        64.0,
        TileRefine::Replace,
        vec![leaf("a.bin", 1.0), leaf("b.bin", 1.0)],
    );
    let source = Arc::new(ScriptedSource::new(root));
    let mut tileset = new_tileset(Arc::clone(&source), TilesetOptions::default(), &rt);
    wait_for_root(&mut tileset);

    // The far camera would settle for the root; the near one demands the
    // children, and the union refines.
    tileset.update_view(&[far_view(), near_view()]);
    wait_for_results(&tileset, 3);
    let frame = tileset.update_view(&[far_view(), near_view()]);
    let refined: HashSet<_> = frame.tiles_to_render_this_frame.iter().copied().collect();
    assert_eq!(refined.len(), 2);

    // The far camera alone falls back to the root.
    let frame = tileset.update_view(&[far_view()]);
    assert_eq!(frame.tiles_to_render_this_frame.len(), 1);
    assert!(!refined.contains(&frame.tiles_to_render_this_frame[0]));
}

#[test]
fn loading_descendant_limit_stops_feeding_the_subtree() {
    let rt = Runtime::new().unwrap();
    let root = parent(
        Some("root.bin"),
        64.0,
        TileRefine::Replace,
        vec![leaf("a.bin", 1.0), leaf("b.bin", 1.0), leaf("c.bin", 1.0)],
    );
    let source = Arc::new(ScriptedSource::new(root).blocking(&["a.bin", "b.bin", "c.bin"]));
    let options = TilesetOptions {
        forbid_holes: true,
        loading_descendant_limit: 2,
        ..TilesetOptions::default()
    };
    let mut tileset = new_tileset(Arc::clone(&source), options, &rt);
    wait_for_root(&mut tileset);

    // Three outstanding descendants exceed the limit of two: their queued
    // loads are dropped and only the root itself is requested.
    let frame = tileset.update_view(&[near_view()]);
    assert_eq!(frame.stats.loads_queued, 1);
    assert_eq!(source.fetch_count("a.bin"), 0);
    assert_eq!(source.fetch_count("b.bin"), 0);
    assert_eq!(source.fetch_count("c.bin"), 0);

    wait_for_results(&tileset, 1);
    let frame = tileset.update_view(&[near_view()]);
    assert_eq!(frame.tiles_to_render_this_frame.len(), 1);
    assert_eq!(source.fetch_count("a.bin"), 0);
}

#[test]
fn fog_culls_only_when_every_view_agrees() {
    let rt = Runtime::new().unwrap();
    let source = Arc::new(ScriptedSource::new(leaf("root.bin", 2.0)));
    let mut tileset = new_tileset(Arc::clone(&source), TilesetOptions::default(), &rt);
    wait_for_root(&mut tileset);

    // The tile sits ~90 units out; a 50-unit fog cutoff hides it.
    let fogged = near_view().with_fog_end_distance(50.0);
    let frame = tileset.update_view(&[fogged.clone()]);
    assert!(frame.tiles_to_render_this_frame.is_empty());
    assert_eq!(frame.stats.tiles_culled, 1);
    assert_eq!(frame.stats.loads_queued, 0);

    // A second, fog-free view keeps the tile alive.
    let frame = tileset.update_view(&[fogged, near_view()]);
    assert_eq!(frame.stats.loads_queued, 1);
}

#[test]
fn enforced_culled_error_loads_without_rendering() {
    let rt = Runtime::new().unwrap();
    let source = Arc::new(ScriptedSource::new(leaf("root.bin", 2.0)));
    let options = TilesetOptions {
        enforce_culled_screen_space_error: true,
        ..TilesetOptions::default()
    };
    let mut tileset = new_tileset(Arc::clone(&source), options, &rt);
    wait_for_root(&mut tileset);

    // Camera facing away from the tile: frustum-culled, but still loaded
    // toward the relaxed error target.
    let mut away = near_view();
    away.direction = DVec3::Z;
    let frame = tileset.update_view(&[away.clone()]);
    assert!(frame.tiles_to_render_this_frame.is_empty());
    assert_eq!(frame.stats.tiles_culled, 1);
    assert_eq!(frame.stats.loads_queued, 1);

    wait_for_results(&tileset, 1);
    let frame = tileset.update_view(&[away]);
    assert!(frame.tiles_to_render_this_frame.is_empty());
    assert_eq!(frame.stats.cached_bytes, CONTENT_BYTES);
    assert_eq!(source.fetch_count("root.bin"), 1);
}

#[test]
fn root_metadata_failure_is_fatal_until_refresh() {
    let rt = Runtime::new().unwrap();
    let source = Arc::new(ScriptedSource::new(leaf("root.bin", 2.0)));
    source.fail_root.store(true, Ordering::SeqCst);
    let mut tileset = new_tileset(Arc::clone(&source), TilesetOptions::default(), &rt);
    let mut events = tileset.subscribe();

    let deadline = Instant::now() + Duration::from_secs(5);
    while tileset.root_status() == RootStatus::Pending {
        assert!(Instant::now() < deadline, "timed out waiting for root");
        tileset.update_view(&[near_view()]);
        std::thread::sleep(Duration::from_millis(2));
    }
    assert_eq!(tileset.root_status(), RootStatus::Failed);
    match drain_events(&mut events).as_slice() {
        [TilesetEvent::LoadFailed { tile: None, uri, .. }] => assert_eq!(uri, ROOT_URI),
        other => panic!("expected a root failure event, got {other:?}"),
    }

    // Every frame stays empty until the host refreshes.
    let frame = tileset.update_view(&[near_view()]);
    assert!(frame.tiles_to_render_this_frame.is_empty());

    source.fail_root.store(false, Ordering::SeqCst);
    tileset.refresh();
    wait_for_root(&mut tileset);
    tileset.update_view(&[near_view()]);
    wait_for_results(&tileset, 1);
    let frame = tileset.update_view(&[near_view()]);
    assert_eq!(frame.tiles_to_render_this_frame.len(), 1);
}
