//! Bounded-concurrency load dispatcher.
//!
//! ```text
//! main thread                       tokio workers
//! ───────────                       ─────────────
//! submit(tile) ──► spawn ─────────► fetch(uri) ──► spawn_blocking(parse)
//!                                          │
//! drain() ◄── results slot (Mutex) ◄───────┘
//! ```
//!
//! Invariants:
//! - at most `max_in_flight` requests outstanding at once;
//! - at most one outstanding request per tile (idempotent submission);
//! - workers only push into the results slot, never into the tile tree;
//! - cancellation is best-effort: a request past the point of cancellation
//!   completes and its result is discarded during `drain`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::LoadError;
use crate::source::TileSource;
use crate::tile::{ContentHandle, TileContent, TileId};

use super::request::LoadRequest;

/// A completed (or discarded) load, delivered to the main thread.
#[derive(Debug)]
pub struct LoadOutcome {
    pub tile: TileId,
    pub request_id: u64,
    pub uri: String,
    pub result: Result<TileContent, LoadError>,
}

/// Result of submitting a tile to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitResult {
    /// A new request was spawned.
    Submitted(LoadRequest),
    /// The tile already has an outstanding request; nothing was spawned.
    AlreadyInFlight,
    /// The in-flight cap is reached; try again a later frame.
    Saturated,
}

struct InFlightLoad {
    request_id: u64,
    token: CancellationToken,
}

/// Owns all in-flight tile loads and the worker handoff.
pub struct LoadDispatcher {
    source: Arc<dyn TileSource>,
    runtime: Handle,
    max_in_flight: usize,
    in_flight: HashMap<TileId, InFlightLoad>,
    results: Arc<Mutex<Vec<LoadOutcome>>>,
    next_request_id: u64,
}

impl LoadDispatcher {
    pub fn new(source: Arc<dyn TileSource>, runtime: Handle, max_in_flight: usize) -> Self {
        Self {
            source,
            runtime,
            max_in_flight,
            in_flight: HashMap::new(),
            results: Arc::new(Mutex::new(Vec::new())),
            next_request_id: 0,
        }
    }

    /// Adjusts the in-flight cap; existing requests are never aborted by a
    /// lower cap, the dispatcher just stops accepting until it drains.
    pub fn set_max_in_flight(&mut self, max_in_flight: usize) {
        self.max_in_flight = max_in_flight;
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_in_flight(&self, tile: TileId) -> bool {
        self.in_flight.contains_key(&tile)
    }

    pub fn has_capacity(&self) -> bool {
        self.in_flight.len() < self.max_in_flight
    }

    /// Number of finished requests waiting to be drained.
    pub fn pending_results(&self) -> usize {
        self.results.lock().len()
    }

    /// Tiles with an outstanding request, in no particular order.
    pub fn in_flight_tiles(&self) -> Vec<TileId> {
        self.in_flight.keys().copied().collect()
    }

    /// Starts a fetch+parse for `tile` unless one is outstanding or the
    /// cap is reached.
    pub fn submit(&mut self, tile: TileId, handle: &ContentHandle) -> SubmitResult {
        if self.in_flight.contains_key(&tile) {
            return SubmitResult::AlreadyInFlight;
        }
        if !self.has_capacity() {
            return SubmitResult::Saturated;
        }

        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let token = CancellationToken::new();
        let worker_token = token.clone();
        let source = Arc::clone(&self.source);
        let results = Arc::clone(&self.results);
        let uri = handle.uri.clone();
        let headers = handle.headers.clone();

        trace!(%tile, %uri, request_id, "submitting tile load");

        self.runtime.spawn(async move {
            let work = async {
                let bytes = source.fetch(&uri, &headers).await?;
                // Parsing is CPU-bound; keep it off the async workers.
                let parse_source = Arc::clone(&source);
                let parse_uri = uri.clone();
                match tokio::task::spawn_blocking(move || {
                    parse_source.parse_content(&parse_uri, bytes)
                })
                .await
                {
                    Ok(parsed) => parsed,
                    // The blocking pool only refuses work during shutdown.
                    Err(_) => Err(LoadError::Cancelled),
                }
            };
            let result = tokio::select! {
                _ = worker_token.cancelled() => Err(LoadError::Cancelled),
                result = work => result,
            };
            results.lock().push(LoadOutcome {
                tile,
                request_id,
                uri,
                result,
            });
        });

        self.in_flight.insert(tile, InFlightLoad { request_id, token });
        SubmitResult::Submitted(LoadRequest { tile, request_id })
    }

    /// Cancels the outstanding request for `tile`, if any.
    ///
    /// Frees the tile's in-flight slot immediately; whatever the worker
    /// still produces is discarded at the next `drain`.
    pub fn cancel(&mut self, tile: TileId) {
        if let Some(load) = self.in_flight.remove(&tile) {
            trace!(%tile, request_id = load.request_id, "cancelling tile load");
            load.token.cancel();
        }
    }

    /// Cancels every outstanding request (tileset refresh or teardown).
    pub fn cancel_all(&mut self) {
        for (_, load) in self.in_flight.drain() {
            load.token.cancel();
        }
    }

    /// Takes all completed loads, dropping results from requests that were
    /// cancelled or superseded since submission.
    pub fn drain(&mut self) -> Vec<LoadOutcome> {
        let raw = std::mem::take(&mut *self.results.lock());
        let mut live = Vec::with_capacity(raw.len());
        for outcome in raw {
            let current = self
                .in_flight
                .get(&outcome.tile)
                .is_some_and(|load| load.request_id == outcome.request_id);
            if current {
                self.in_flight.remove(&outcome.tile);
                live.push(outcome);
            }
        }
        live
    }
}

impl Drop for LoadDispatcher {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
