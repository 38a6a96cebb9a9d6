//! World-space planes for frustum tests.

use glam::DVec3;

/// Which side of a plane a volume lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneSide {
    /// Entirely on the normal side.
    Inside,
    /// Entirely on the anti-normal side.
    Outside,
    /// Straddling the plane.
    Intersecting,
}

/// A plane in point-normal form: `normal . p + distance = 0`.
///
/// The normal points toward the half-space considered *inside*.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    /// Unit normal.
    pub normal: DVec3,
    /// Signed distance term.
    pub distance: f64,
}

impl Plane {
    /// Builds the plane through `point` with the given unit `normal`.
    pub fn from_point_normal(point: DVec3, normal: DVec3) -> Self {
        Self {
            normal,
            distance: -normal.dot(point),
        }
    }

    /// Signed distance from `point` to the plane (positive = inside).
    pub fn signed_distance(&self, point: DVec3) -> f64 {
        self.normal.dot(point) + self.distance
    }
}
