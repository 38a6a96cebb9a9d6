//! Spatial primitives used by visibility and error computations.
//!
//! Bounding volumes intentionally stop short of any coordinate-reference-
//! system math: a geographic region carries the bounding sphere its source
//! computed for it, and the engine only ever does plane tests and distance
//! queries in world space.

mod bounding;
mod plane;

pub use bounding::{BoundingSphere, BoundingVolume, OrientedBox, Region};
pub use plane::{Plane, PlaneSide};
