//! Pinhole camera for debug renders.

use gibake_core::{Aabb, Ray};
use glam::{Mat4, Vec2, Vec3};

/// Camera for rendering.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            direction: Vec3::NEG_Z,
            up: Vec3::Y,
            fov: std::f32::consts::FRAC_PI_4,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    /// Create a new camera.
    pub fn new(position: Vec3, target: Vec3, up: Vec3, fov: f32, aspect: f32) -> Self {
        let direction = (target - position).normalize();
        Self {
            position,
            direction,
            up,
            fov,
            aspect,
            ..Self::default()
        }
    }

    /// Place a camera so the whole box is in view, looking at its center
    /// from the +Z side and slightly above.
    pub fn framing(bounds: &Aabb, aspect: f32) -> Self {
        let center = bounds.center();
        let radius = bounds.half_extents().length().max(1e-3);
        let fov = std::f32::consts::FRAC_PI_4;
        let distance = radius / (fov * 0.5).sin();
        let offset = Vec3::new(0.0, 0.35, 1.0).normalize() * distance;
        Self::new(center + offset, center, Vec3::Y, fov, aspect)
    }

    /// Look at a target position.
    pub fn look_at(&mut self, target: Vec3) {
        self.direction = (target - self.position).normalize();
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.direction, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    /// Get the view-projection matrix.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Primary ray through a point in normalized device coordinates
    /// (`[-1, 1]`, +y up).
    pub fn primary_ray(&self, ndc: Vec2) -> Ray {
        let inverse = self.view_projection_matrix().inverse();
        let far = inverse.project_point3(ndc.extend(1.0));
        Ray::new(self.position, far - self.position)
    }
}
