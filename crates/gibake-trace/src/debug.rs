//! Camera renders of the baking light transport.
//!
//! Useful for checking materials and lighting before a long bake: the image
//! shows exactly what the path tracer sees, tone mapped for display.

use std::path::Path;
use std::time::Instant;

use gibake_core::color::linear_to_gamma;
use gibake_core::{Error, Result};
use gibake_scene::Camera;
use glam::{Vec2, Vec3};
use image::{ImageBuffer, Rgb};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::info;

use crate::tracer::{PathTracer, TracerConfig};

/// Tone-mapped, gamma-encoded render.
#[derive(Clone, Debug)]
pub struct DebugImage {
    pub width: u32,
    pub height: u32,
    /// Display colors in `[0, 1]`, top row first
    pub pixels: Vec<Vec3>,
}

impl DebugImage {
    /// Write the render as an 8-bit image; the format follows the extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let data: Vec<u8> = self
            .pixels
            .iter()
            .flat_map(|c| (c.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).to_array())
            .map(|v| v.round() as u8)
            .collect();
        let image = ImageBuffer::<Rgb<u8>, _>::from_raw(self.width, self.height, data)
            .ok_or_else(|| Error::InvalidData("debug image size mismatch".to_owned()))?;
        image
            .save(path)
            .map_err(|e| Error::InvalidData(format!("failed to save {}: {e}", path.display())))?;
        info!("Debug render saved: {}", path.display());
        Ok(())
    }
}

/// Renders the scene from a camera through a [`PathTracer`].
pub struct DebugPathTracer<'a> {
    tracer: &'a PathTracer,
}

impl<'a> DebugPathTracer<'a> {
    pub const fn new(tracer: &'a PathTracer) -> Self {
        Self { tracer }
    }

    /// Trace `config.samples_per_pixel` jittered paths per pixel.
    ///
    /// Rows are traced in parallel, each with its own generator seeded from
    /// `seed` and the row index.
    pub fn render(
        &self,
        camera: &Camera,
        width: u32,
        height: u32,
        config: &TracerConfig,
        seed: u64,
    ) -> DebugImage {
        let start = Instant::now();
        let config = *config;
        let spp = config.samples_per_pixel.max(1);
        let size = Vec2::new(width as f32, height as f32);
        let mut camera = camera.clone();
        camera.aspect = size.x / size.y.max(1.0);

        let mut pixels = vec![Vec3::ZERO; width as usize * height as usize];
        self.tracer.install(|| {
            pixels
                .par_chunks_mut(width.max(1) as usize)
                .enumerate()
                .for_each(|(y, row)| {
                    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(y as u64));
                    for (x, pixel) in row.iter_mut().enumerate() {
                        let mut sum = Vec3::ZERO;
                        for _ in 0..spp {
                            let jitter = Vec2::new(rng.random(), rng.random());
                            let p = (Vec2::new(x as f32, y as f32) + jitter) / size;
                            let ndc = Vec2::new(2.0 * p.x - 1.0, 1.0 - 2.0 * p.y);
                            let ray = camera.primary_ray(ndc);
                            sum += self.tracer.trace(ray.origin, ray.direction, &config, &mut rng);
                        }
                        *pixel = tone_map(sum / spp as f32);
                    }
                });
        });

        info!(
            "Debug render {width}x{height} at {spp} spp took {:.2?}",
            start.elapsed()
        );
        DebugImage {
            width,
            height,
            pixels,
        }
    }
}

/// Reinhard tone mapping followed by gamma encoding.
pub fn tone_map(radiance: Vec3) -> Vec3 {
    let radiance = radiance.max(Vec3::ZERO);
    linear_to_gamma(radiance / (radiance + Vec3::ONE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gibake_scene::{DirectionalLight, Material, Primitive, Scene};
    use std::sync::Arc;

    #[test]
    fn tone_map_stays_in_unit_range() {
        assert_eq!(tone_map(Vec3::ZERO), Vec3::ZERO);
        let bright = tone_map(Vec3::splat(1.0e6));
        assert!(bright.max_element() <= 1.0);
        assert!(bright.min_element() > 0.99);
    }

    #[test]
    fn render_sees_lit_floor() {
        let floor = Primitive {
            positions: vec![
                Vec3::new(-5.0, 0.0, -5.0),
                Vec3::new(5.0, 0.0, -5.0),
                Vec3::new(5.0, 0.0, 5.0),
                Vec3::new(-5.0, 0.0, 5.0),
            ],
            normals: vec![Vec3::Y; 4],
            indices: vec![0, 2, 1, 0, 3, 2],
            material: Arc::new(Material::flat(Vec3::splat(0.8), 1.0, 0.0)),
            ..Primitive::new("floor")
        };
        let mut scene = Scene::new(vec![floor]);
        scene.sun = DirectionalLight {
            direction: Vec3::NEG_Y,
            color: Vec3::ONE,
            power: 3.0,
        };
        let tracer = PathTracer::with_threads(&scene, 2).unwrap();
        let camera = Camera::new(Vec3::new(0.0, 3.0, 0.0), Vec3::ZERO, Vec3::Z, 0.5, 1.0);
        let config = TracerConfig {
            samples_per_pixel: 2,
            ..TracerConfig::default()
        };
        let image = DebugPathTracer::new(&tracer).render(&camera, 8, 8, &config, 42);
        assert_eq!(image.pixels.len(), 64);
        assert!(image.pixels.iter().all(|p| p.x > 0.1 && p.x <= 1.0));
    }
}
