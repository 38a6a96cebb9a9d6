//! View frustum construction and containment tests.

use glam::DVec3;

use crate::geometry::{BoundingVolume, Plane, PlaneSide};

/// The six planes of a view frustum, normals pointing inward.
#[derive(Debug, Clone)]
pub struct CullingVolume {
    planes: [Plane; 6],
}

impl CullingVolume {
    /// Builds a frustum from camera basis vectors and field-of-view angles.
    ///
    /// `direction` and `up` must be unit length and orthogonal; the fov
    /// angles are full angles in radians.
    pub fn from_camera(
        position: DVec3,
        direction: DVec3,
        up: DVec3,
        horizontal_fov: f64,
        vertical_fov: f64,
        near: f64,
        far: f64,
    ) -> Self {
        let right = direction.cross(up);
        let tan_half_h = (0.5 * horizontal_fov).tan();
        let tan_half_v = (0.5 * vertical_fov).tan();

        let planes = [
            Plane::from_point_normal(position + direction * near, direction),
            Plane::from_point_normal(position + direction * far, -direction),
            Plane::from_point_normal(position, (direction * tan_half_h + right).normalize()),
            Plane::from_point_normal(position, (direction * tan_half_h - right).normalize()),
            Plane::from_point_normal(position, (direction * tan_half_v + up).normalize()),
            Plane::from_point_normal(position, (direction * tan_half_v - up).normalize()),
        ];
        Self { planes }
    }

    /// True unless the volume is entirely outside some plane.
    pub fn intersects(&self, volume: &BoundingVolume) -> bool {
        self.planes
            .iter()
            .all(|plane| volume.side_of_plane(plane) != PlaneSide::Outside)
    }
}
