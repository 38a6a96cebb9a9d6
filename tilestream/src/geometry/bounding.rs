//! Tile bounding volumes.

use glam::{DMat3, DVec3};

use super::plane::{Plane, PlaneSide};

/// A sphere given by center and radius.
#[derive(Debug, Clone, Copy)]
pub struct BoundingSphere {
    pub center: DVec3,
    pub radius: f64,
}

impl BoundingSphere {
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Squared distance from `point` to the sphere surface, zero inside.
    pub fn distance_squared_to(&self, point: DVec3) -> f64 {
        let to_center = point.distance(self.center);
        let outside = (to_center - self.radius).max(0.0);
        outside * outside
    }

    pub fn side_of_plane(&self, plane: &Plane) -> PlaneSide {
        let d = plane.signed_distance(self.center);
        if d < -self.radius {
            PlaneSide::Outside
        } else if d > self.radius {
            PlaneSide::Inside
        } else {
            PlaneSide::Intersecting
        }
    }
}

/// An oriented box: center plus three half-axis vectors.
///
/// The columns of `half_axes` are the box's local axes scaled by its half
/// extents, so a corner is `center ± x ± y ± z` over the columns.
#[derive(Debug, Clone, Copy)]
pub struct OrientedBox {
    pub center: DVec3,
    pub half_axes: DMat3,
}

impl OrientedBox {
    pub fn new(center: DVec3, half_axes: DMat3) -> Self {
        Self { center, half_axes }
    }

    /// Axis-aligned box helper.
    pub fn axis_aligned(center: DVec3, half_extents: DVec3) -> Self {
        Self {
            center,
            half_axes: DMat3::from_diagonal(half_extents),
        }
    }

    /// Radius of the sphere circumscribing the box.
    pub fn outer_radius(&self) -> f64 {
        (self.half_axes.col(0) + self.half_axes.col(1) + self.half_axes.col(2)).length()
    }

    /// Squared distance from `point` to the box surface, zero inside.
    pub fn distance_squared_to(&self, point: DVec3) -> f64 {
        let offset = point - self.center;
        let mut sum = 0.0;
        for i in 0..3 {
            let axis = self.half_axes.col(i);
            let half_length = axis.length();
            if half_length == 0.0 {
                continue;
            }
            let along = offset.dot(axis / half_length);
            let excess = (along.abs() - half_length).max(0.0);
            sum += excess * excess;
        }
        sum
    }

    pub fn side_of_plane(&self, plane: &Plane) -> PlaneSide {
        // Effective radius: projection of the half-axes onto the normal.
        let radius = plane.normal.dot(self.half_axes.col(0)).abs()
            + plane.normal.dot(self.half_axes.col(1)).abs()
            + plane.normal.dot(self.half_axes.col(2)).abs();
        let d = plane.signed_distance(self.center);
        if d < -radius {
            PlaneSide::Outside
        } else if d > radius {
            PlaneSide::Inside
        } else {
            PlaneSide::Intersecting
        }
    }
}

/// A geographic region in radians plus height bounds.
///
/// The engine does no ellipsoid math; the source that produced the region
/// also supplies the world-space sphere bounding it, and all visibility and
/// distance queries go through that sphere.
#[derive(Debug, Clone, Copy)]
pub struct Region {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
    pub minimum_height: f64,
    pub maximum_height: f64,
    /// World-space sphere enclosing the region, provided by the source.
    pub bounding_sphere: BoundingSphere,
}

/// A tile's bounding volume.
#[derive(Debug, Clone, Copy)]
pub enum BoundingVolume {
    Sphere(BoundingSphere),
    OrientedBox(OrientedBox),
    Region(Region),
}

impl BoundingVolume {
    /// The sphere enclosing this volume.
    pub fn bounding_sphere(&self) -> BoundingSphere {
        match self {
            Self::Sphere(sphere) => *sphere,
            Self::OrientedBox(obb) => BoundingSphere::new(obb.center, obb.outer_radius()),
            Self::Region(region) => region.bounding_sphere,
        }
    }

    /// Squared distance from `point` to the volume, zero when inside.
    pub fn distance_squared_to(&self, point: DVec3) -> f64 {
        match self {
            Self::Sphere(sphere) => sphere.distance_squared_to(point),
            Self::OrientedBox(obb) => obb.distance_squared_to(point),
            Self::Region(region) => region.bounding_sphere.distance_squared_to(point),
        }
    }

    pub fn side_of_plane(&self, plane: &Plane) -> PlaneSide {
        match self {
            Self::Sphere(sphere) => sphere.side_of_plane(plane),
            Self::OrientedBox(obb) => obb.side_of_plane(plane),
            Self::Region(region) => region.bounding_sphere.side_of_plane(plane),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_distance_is_zero_inside() {
        let sphere = BoundingSphere::new(DVec3::ZERO, 10.0);
        assert_eq!(sphere.distance_squared_to(DVec3::new(3.0, 0.0, 0.0)), 0.0);
        assert_eq!(sphere.distance_squared_to(DVec3::new(13.0, 0.0, 0.0)), 9.0);
    }

    #[test]
    fn sphere_plane_classification() {
        let sphere = BoundingSphere::new(DVec3::new(0.0, 0.0, 5.0), 1.0);
        let plane = Plane::from_point_normal(DVec3::ZERO, DVec3::Z);
        assert_eq!(sphere.side_of_plane(&plane), PlaneSide::Inside);

        let behind = BoundingSphere::new(DVec3::new(0.0, 0.0, -5.0), 1.0);
        assert_eq!(behind.side_of_plane(&plane), PlaneSide::Outside);

        let straddling = BoundingSphere::new(DVec3::new(0.0, 0.0, 0.5), 1.0);
        assert_eq!(straddling.side_of_plane(&plane), PlaneSide::Intersecting);
    }

    #[test]
    fn box_distance_accounts_for_orientation() {
        let obb = OrientedBox::axis_aligned(DVec3::ZERO, DVec3::new(2.0, 1.0, 1.0));
        assert_eq!(obb.distance_squared_to(DVec3::new(1.0, 0.0, 0.0)), 0.0);
        assert_eq!(obb.distance_squared_to(DVec3::new(5.0, 0.0, 0.0)), 9.0);
        assert_eq!(obb.distance_squared_to(DVec3::new(0.0, 3.0, 0.0)), 4.0);
    }

    #[test]
    fn box_plane_uses_effective_radius() {
        let obb = OrientedBox::axis_aligned(DVec3::new(0.0, 0.0, 3.0), DVec3::splat(1.0));
        let plane = Plane::from_point_normal(DVec3::ZERO, DVec3::Z);
        assert_eq!(obb.side_of_plane(&plane), PlaneSide::Inside);

        let touching = OrientedBox::axis_aligned(DVec3::new(0.0, 0.0, 0.5), DVec3::splat(1.0));
        assert_eq!(touching.side_of_plane(&plane), PlaneSide::Intersecting);
    }

    #[test]
    fn region_delegates_to_its_sphere() {
        let region = Region {
            west: -0.1,
            south: -0.1,
            east: 0.1,
            north: 0.1,
            minimum_height: 0.0,
            maximum_height: 100.0,
            bounding_sphere: BoundingSphere::new(DVec3::ZERO, 50.0),
        };
        let volume = BoundingVolume::Region(region);
        assert_eq!(volume.bounding_sphere().radius, 50.0);
        assert_eq!(volume.distance_squared_to(DVec3::new(60.0, 0.0, 0.0)), 100.0);
    }
}
