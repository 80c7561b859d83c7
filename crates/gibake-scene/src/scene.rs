//! Scene container and the sun light.

use gibake_core::color::gamma_to_linear;
use gibake_core::Aabb;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::primitive::Primitive;

/// A single infinitely distant light.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    /// Direction the light travels in (not necessarily normalized)
    pub direction: Vec3,
    /// Gamma-encoded light color
    pub color: Vec3,
    pub power: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(1.0, -5.0, -2.0),
            color: Vec3::new(1.0, 0.9, 0.8),
            power: 1.0,
        }
    }
}

impl DirectionalLight {
    /// Unit vector pointing from a surface toward the light.
    #[inline]
    pub fn to_light(&self) -> Vec3 {
        -self.direction.normalize_or_zero()
    }

    /// Linear radiance carried by the light.
    #[inline]
    pub fn radiance(&self) -> Vec3 {
        gamma_to_linear(self.color) * self.power
    }
}

/// Static scene: primitives plus the sun.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub primitives: Vec<Primitive>,
    pub sun: DirectionalLight,
}

impl Scene {
    pub fn new(primitives: Vec<Primitive>) -> Self {
        Self {
            primitives,
            sun: DirectionalLight::default(),
        }
    }

    /// World bounds of all primitives, empty for a scene without geometry.
    pub fn bounding_box(&self) -> Aabb {
        self.primitives
            .iter()
            .map(Primitive::world_bounds)
            .fold(Aabb::EMPTY, |acc, b| acc.merge(&b))
    }

    pub fn triangle_count(&self) -> usize {
        self.primitives.iter().map(Primitive::triangle_count).sum()
    }
}
