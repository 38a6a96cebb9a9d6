//! Per-frame camera input.
//!
//! The host supplies one [`ViewState`] per viewport each frame. Before
//! traversal each view is lowered into a [`PreparedView`]: frustum planes,
//! the screen-space-error denominator, and the fog cutoff, so the per-tile
//! work is a handful of dot products.

mod frustum;
mod state;

pub use frustum::CullingVolume;
pub use state::{PreparedView, ViewState, DEFAULT_FAR_PLANE, DEFAULT_NEAR_PLANE};
