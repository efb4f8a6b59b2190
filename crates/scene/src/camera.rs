//! Perspective camera.

use glam::{Mat4, Quat, Vec3};

use crate::bounds::Aabb;

/// A right-handed perspective camera.
///
/// The projection is not Y-flipped; the renderer flips the viewport instead.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Point the camera orbits around.
    pub target: Vec3,
    /// Unit view direction.
    direction: Vec3,
    /// Unit up vector.
    up: Vec3,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(25.0, 45.0, 0.1, 5000.0)
    }
}

impl Camera {
    /// Camera at `(0, 0, distance)` looking down -Z with a vertical field of
    /// view of `fov_degrees`.
    pub fn new(distance: f32, fov_degrees: f32, near: f32, far: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, distance),
            target: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            up: Vec3::Y,
            fov_y: fov_degrees.to_radians(),
            near,
            far,
        }
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    #[inline]
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Sets the view direction. Zero vectors are ignored.
    pub fn set_direction(&mut self, direction: Vec3) {
        if let Some(direction) = direction.try_normalize() {
            self.direction = direction;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.direction, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far)
    }

    /// View-projection for a `width` x `height` target. A zero height falls
    /// back to a square aspect.
    pub fn view_projection(&self, width: u32, height: u32) -> Mat4 {
        let aspect = if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        };
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// Orbits around `target` by `yaw` around the up vector and `pitch`
    /// around the camera's right vector, both in radians. The distance to
    /// the target is preserved and the camera keeps facing it.
    pub fn orbit(&mut self, yaw: f32, pitch: f32) {
        let Some(right) = self.direction.cross(self.up).try_normalize() else {
            return;
        };
        let rotation = Quat::from_axis_angle(self.up, yaw) * Quat::from_axis_angle(right, pitch);
        let direction = rotation * self.direction;

        // Refuse to pitch through the pole.
        let Some(right) = direction.cross(self.up).try_normalize() else {
            return;
        };
        let distance = (self.target - self.position).length();
        self.set_direction(direction);
        self.up = right.cross(self.direction).normalize();
        self.position = self.target - self.direction * distance;
    }

    /// Moves the camera back along its view direction until the bounding
    /// sphere of `bounds` fits the vertical field of view, aimed at its center.
    pub fn frame_bounds(&mut self, bounds: &Aabb) {
        let center = bounds.center();
        let radius = (bounds.size().length() * 0.5).max(f32::EPSILON);
        let distance = radius / (self.fov_y * 0.5).sin();

        self.target = center;
        self.position = center - self.direction * distance;
        if self.far < distance + radius {
            self.far = (distance + radius) * 2.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_default_camera() {
        let camera = Camera::default();
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 25.0));
        assert_eq!(camera.direction(), Vec3::NEG_Z);
        assert!((camera.fov_y - 45f32.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn test_origin_projects_to_center() {
        let camera = Camera::default();
        let clip = camera.view_projection(1280, 720) * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5);
        assert!(ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn test_positive_y_stays_up() {
        // No Y flip in the projection itself.
        let camera = Camera::default();
        let clip = camera.view_projection(800, 800) * Vec4::new(0.0, 1.0, 0.0, 1.0);
        assert!(clip.y / clip.w > 0.0);
    }

    #[test]
    fn test_zero_height_does_not_produce_nan() {
        let camera = Camera::default();
        let m = camera.view_projection(800, 0);
        assert!(m.is_finite());
    }

    #[test]
    fn test_set_direction_ignores_zero() {
        let mut camera = Camera::default();
        camera.set_direction(Vec3::ZERO);
        assert_eq!(camera.direction(), Vec3::NEG_Z);

        camera.set_direction(Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(camera.direction(), Vec3::X);
    }

    #[test]
    fn test_orbit_keeps_unit_vectors() {
        let mut camera = Camera::default();
        camera.orbit(0.3, -0.2);
        assert!((camera.direction().length() - 1.0).abs() < 1e-5);
        assert!((camera.up().length() - 1.0).abs() < 1e-5);
        assert!(camera.direction().dot(camera.up()).abs() < 1e-5);
    }

    #[test]
    fn test_frame_bounds_centers_target() {
        let mut camera = Camera::default();
        let bounds = Aabb::from_points([Vec3::new(-1.0, -1.0, -1.0), Vec3::new(3.0, 1.0, 1.0)])
            .unwrap();
        camera.frame_bounds(&bounds);

        let to_center = (bounds.center() - camera.position).normalize();
        assert!(approx(to_center, camera.direction()));

        let clip = camera.view_projection(1000, 1000) * bounds.center().extend(1.0);
        assert!((clip.x / clip.w).abs() < 1e-4);
    }

    #[test]
    fn test_orbit_keeps_framed_bounds_in_view() {
        let mut camera = Camera::default();
        let bounds = Aabb::from_points([Vec3::new(4.0, 0.0, 0.0), Vec3::new(6.0, 2.0, 2.0)])
            .unwrap();
        camera.frame_bounds(&bounds);
        let distance = (bounds.center() - camera.position).length();

        for _ in 0..20 {
            camera.orbit(0.05, 0.0);
        }
        camera.orbit(0.0, 0.3);

        assert!(approx(camera.target, bounds.center()));
        assert!(((bounds.center() - camera.position).length() - distance).abs() < 1e-3);
        let to_center = (bounds.center() - camera.position).normalize();
        assert!(approx(to_center, camera.direction()));

        let clip = camera.view_projection(1000, 1000) * bounds.center().extend(1.0);
        assert!((clip.x / clip.w).abs() < 1e-3);
        assert!((clip.y / clip.w).abs() < 1e-3);
    }
}
