//! Asynchronous tile content loading.
//!
//! The [`LoadDispatcher`] owns every in-flight fetch+parse. It enforces the
//! simultaneous-load cap, guarantees at most one outstanding request per
//! tile, and hands results back through a thread-safe slot that the engine
//! drains at the start of each frame — workers never touch the tile tree.

mod dispatcher;
mod request;

pub use dispatcher::{LoadDispatcher, LoadOutcome, SubmitResult};
pub use request::{LoadPriority, LoadRequest};
