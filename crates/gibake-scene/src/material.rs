//! Baking-time materials that sample CPU-side images.

use std::sync::Arc;

use gibake_core::color::gamma_to_linear;
use glam::{Vec2, Vec3};

use crate::image::Image;

/// Surface description used by the path tracer.
///
/// Each image sampler, when bound, replaces the matching scalar.
#[derive(Clone, Debug)]
pub struct Material {
    /// Gamma-encoded albedo texture
    pub albedo_map: Option<Arc<Image>>,
    /// Tangent-space normal map, carried for the renderer
    pub normal_map: Option<Arc<Image>>,
    /// Roughness texture, read from the green channel
    pub roughness_map: Option<Arc<Image>>,
    /// Linear base color used when no albedo map is bound
    pub base_color: Vec3,
    pub roughness: f32,
    pub metallic: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo_map: None,
            normal_map: None,
            roughness_map: None,
            base_color: Vec3::ONE,
            roughness: 0.5,
            metallic: 0.0,
        }
    }
}

/// Material properties at one surface point, in linear space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceSample {
    pub albedo: Vec3,
    pub roughness: f32,
    pub metallic: f32,
}

impl Material {
    /// Flat-colored material without textures.
    pub fn flat(base_color: Vec3, roughness: f32, metallic: f32) -> Self {
        Self {
            base_color,
            roughness,
            metallic,
            ..Self::default()
        }
    }

    /// Evaluate the material at a texture coordinate.
    pub fn surface_at(&self, uv: Vec2) -> SurfaceSample {
        let albedo = self
            .albedo_map
            .as_ref()
            .map_or(self.base_color, |map| gamma_to_linear(map.sample(uv).truncate()));
        let roughness = self
            .roughness_map
            .as_ref()
            .map_or(self.roughness, |map| map.sample(uv).y);
        SurfaceSample {
            albedo,
            roughness: roughness.clamp(0.0, 1.0),
            metallic: self.metallic.clamp(0.0, 1.0),
        }
    }
}
