//! Camera view parameters and screen-space-error computation.

use glam::DVec3;

use crate::geometry::BoundingVolume;

use super::frustum::CullingVolume;

/// Default near plane distance when the host does not supply one.
pub const DEFAULT_NEAR_PLANE: f64 = 0.1;

/// Default far plane distance when the host does not supply one.
pub const DEFAULT_FAR_PLANE: f64 = 1.0e9;

/// One viewport's camera parameters for a single frame.
///
/// Plain data crossing the host boundary; the engine derives everything
/// else (frustum planes, projection factors) itself.
#[derive(Debug, Clone)]
pub struct ViewState {
    /// Camera position in world coordinates.
    pub position: DVec3,
    /// Unit view direction.
    pub direction: DVec3,
    /// Unit up vector, orthogonal to `direction`.
    pub up: DVec3,
    /// Viewport width in pixels.
    pub viewport_width: f64,
    /// Viewport height in pixels.
    pub viewport_height: f64,
    /// Full horizontal field of view in radians.
    pub horizontal_fov: f64,
    /// Full vertical field of view in radians.
    pub vertical_fov: f64,
    /// Custom near/far plane distances, if the host overrides the defaults.
    pub near_far: Option<(f64, f64)>,
    /// Distance at which fog fully obscures geometry, if the host's fog
    /// settings define one. Used only when fog culling is enabled.
    pub fog_end_distance: Option<f64>,
}

impl ViewState {
    /// Creates a view with default clip planes and no fog.
    pub fn new(
        position: DVec3,
        direction: DVec3,
        up: DVec3,
        viewport_width: f64,
        viewport_height: f64,
        horizontal_fov: f64,
        vertical_fov: f64,
    ) -> Self {
        Self {
            position,
            direction,
            up,
            viewport_width,
            viewport_height,
            horizontal_fov,
            vertical_fov,
            near_far: None,
            fog_end_distance: None,
        }
    }

    /// Overrides the near/far clip distances.
    pub fn with_near_far(mut self, near: f64, far: f64) -> Self {
        self.near_far = Some((near, far));
        self
    }

    /// Sets the fog cutoff distance.
    pub fn with_fog_end_distance(mut self, distance: f64) -> Self {
        self.fog_end_distance = Some(distance);
        self
    }

    /// Lowers the view into the form the traversal consumes.
    pub fn prepare(&self) -> PreparedView {
        let (near, far) = self.near_far.unwrap_or((DEFAULT_NEAR_PLANE, DEFAULT_FAR_PLANE));
        PreparedView {
            position: self.position,
            culling_volume: CullingVolume::from_camera(
                self.position,
                self.direction,
                self.up,
                self.horizontal_fov,
                self.vertical_fov,
                near,
                far,
            ),
            viewport_height: self.viewport_height,
            sse_denominator: 2.0 * (0.5 * self.vertical_fov).tan(),
            fog_end_distance: self.fog_end_distance,
        }
    }
}

/// A [`ViewState`] with its derived per-frame quantities.
#[derive(Debug, Clone)]
pub struct PreparedView {
    pub position: DVec3,
    pub culling_volume: CullingVolume,
    pub viewport_height: f64,
    pub sse_denominator: f64,
    pub fog_end_distance: Option<f64>,
}

impl PreparedView {
    /// Distance from the camera to a bounding volume, zero when inside.
    pub fn distance_to(&self, volume: &BoundingVolume) -> f64 {
        volume.distance_squared_to(self.position).sqrt()
    }

    /// Screen-space error of a tile with the given geometric error at the
    /// given camera distance.
    ///
    /// `sse = geometric_error * viewport_height / (distance * 2 * tan(fov_y / 2))`
    ///
    /// The exact form matters: selection thresholds and the tests that pin
    /// them assume this formula. A camera inside the bounding volume
    /// (distance zero) yields infinite error, forcing refinement.
    pub fn screen_space_error(&self, geometric_error: f64, distance: f64) -> f64 {
        if geometric_error <= 0.0 {
            return 0.0;
        }
        if distance <= 0.0 {
            return f64::INFINITY;
        }
        (geometric_error * self.viewport_height) / (distance * self.sse_denominator)
    }
}
