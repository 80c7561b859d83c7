//! Lightmap baking.
//!
//! Every triangle of a primitive is rasterized into lightmap texel space
//! through its lightmap UVs. Each covered texel gathers jittered samples; a
//! sample that lands inside the triangle is turned into a world position and
//! normal and handed to a bake operator, which queries the path tracer.
//! Averaged texels are then hole filled so bilinear lookups never pick up
//! unbaked texels at chart borders.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use gibake_core::constants::RAY_EPSILON;
use gibake_core::{Error, Result};
use gibake_scene::{Image, PixelFormat, Primitive};
use gibake_trace::sampling::sample_cosine_hemisphere;
use gibake_trace::{PathTracer, TracerConfig};
use glam::{UVec2, Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, error, info};

use crate::hole_fill::{classify_illegal_texels, fill_illegal_texels};
use crate::texel::texel_triangles;

/// Bakes irradiance and ambient occlusion lightmaps for single primitives.
///
/// The tracer configuration is copied in at construction, so a baker always
/// sees one consistent set of path tracing parameters. Every bake call draws
/// from its own random streams, one per lightmap row.
pub struct IlluminationBaker<'a> {
    tracer: &'a PathTracer,
    config: TracerConfig,
    seed: u64,
    calls: AtomicU64,
}

impl<'a> IlluminationBaker<'a> {
    /// Baker with a random session seed.
    pub fn new(tracer: &'a PathTracer, config: TracerConfig) -> Self {
        Self::with_seed(tracer, config, rand::random())
    }

    /// Baker with a fixed session seed. The same sequence of bake calls on a
    /// new baker repeats the same results.
    pub const fn with_seed(tracer: &'a PathTracer, config: TracerConfig, seed: u64) -> Self {
        Self {
            tracer,
            config,
            seed,
            calls: AtomicU64::new(0),
        }
    }

    pub const fn config(&self) -> &TracerConfig {
        &self.config
    }

    /// Bake incoming light into a 3x16-bit float image.
    ///
    /// Directions are drawn from the cosine-weighted hemisphere, whose pdf
    /// cancels the cosine term, so each traced radiance sample is accumulated
    /// unweighted.
    pub fn bake_irradiance(
        &self,
        primitive: &Primitive,
        width: u32,
        height: u32,
        samples_per_texel: u32,
    ) -> Result<Image> {
        let start = Instant::now();
        let config = self.config;
        let texels = self.bake(primitive, width, height, samples_per_texel, |position, normal, rng| {
            let u = Vec2::new(rng.random(), rng.random());
            let direction = sample_cosine_hemisphere(normal, u);
            self.tracer.trace(position, direction, &config, rng)
        })?;

        let mut image = Image::new(width, height, PixelFormat::Rgb16F);
        write_texels(&mut image, &texels);
        info!(
            "Baked {width}x{height} irradiance map for '{}' in {:.2?}",
            primitive.name,
            start.elapsed()
        );
        Ok(image)
    }

    /// Bake ambient occlusion into a 1x16-bit float image.
    ///
    /// A ray stopped at distance `d` contributes `((max_distance - d) / max_distance)^2`,
    /// which is zero for blockers at or beyond `max_distance`. Escaping rays
    /// contribute 1.
    pub fn bake_ambient_occlusion(
        &self,
        primitive: &Primitive,
        width: u32,
        height: u32,
        samples_per_texel: u32,
        max_distance: f32,
    ) -> Result<Image> {
        if max_distance <= 0.0 || !max_distance.is_finite() {
            return Err(Error::InvalidData(format!(
                "ambient occlusion distance must be positive, got {max_distance}"
            )));
        }
        let start = Instant::now();
        let texels = self.bake(primitive, width, height, samples_per_texel, |position, normal, rng| {
            let u = Vec2::new(rng.random(), rng.random());
            let direction = sample_cosine_hemisphere(normal, u);
            Vec3::splat(ambient_occlusion(
                self.tracer.occlusion_distance(position, direction),
                max_distance,
            ))
        })?;

        let mut image = Image::new(width, height, PixelFormat::R16F);
        write_texels(&mut image, &texels);
        info!(
            "Baked {width}x{height} ambient occlusion map for '{}' in {:.2?}",
            primitive.name,
            start.elapsed()
        );
        Ok(image)
    }

    /// Shared rasterization loop. `op` receives a world position (already
    /// offset off the surface), the unit world normal and the row's generator,
    /// and returns the value to accumulate. Returns hole-filled texels in
    /// row-major order.
    pub fn bake<F>(
        &self,
        primitive: &Primitive,
        width: u32,
        height: u32,
        samples_per_texel: u32,
        op: F,
    ) -> Result<Vec<Vec3>>
    where
        F: Fn(Vec3, Vec3, &mut StdRng) -> Vec3 + Sync,
    {
        if let Err(e) = primitive.validate_light_map() {
            error!("Cannot bake '{}': {e}", primitive.name);
            return Err(e);
        }
        if width == 0 || height == 0 {
            return Err(Error::InvalidData(format!(
                "lightmap size {width}x{height} for '{}' is empty",
                primitive.name
            )));
        }

        let size = UVec2::new(width, height);
        let triangles = texel_triangles(primitive, size);
        let positions = primitive.world_positions();
        let normals = primitive.world_normals();
        debug!(
            "Rasterizing {} triangles of '{}' into {width}x{height} texels",
            triangles.len(),
            primitive.name
        );

        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        let mut texels = vec![Vec3::ZERO; width as usize * height as usize];
        self.tracer.install(|| {
            texels
                .par_chunks_mut(width as usize)
                .enumerate()
                .for_each(|(y, row)| {
                    let mut rng = StdRng::seed_from_u64(stream_seed(self.seed, call, y as u64));
                    let mut counts = vec![0u32; row.len()];
                    let y = y as u32;

                    for triangle in triangles.iter().filter(|t| t.covers_row(y)) {
                        let [i0, i1, i2] = triangle.vertices;
                        for x in triangle.min.x..=triangle.max.x {
                            let centre = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                            for _ in 0..samples_per_texel {
                                let jitter = Vec2::new(rng.random(), rng.random()) - 0.5;
                                let Some(bary) = triangle.barycentric(centre + jitter) else {
                                    continue;
                                };
                                let normal = (normals[i0] * bary.x
                                    + normals[i1] * bary.y
                                    + normals[i2] * bary.z)
                                    .normalize_or_zero();
                                if normal == Vec3::ZERO {
                                    continue;
                                }
                                let position = positions[i0] * bary.x
                                    + positions[i1] * bary.y
                                    + positions[i2] * bary.z
                                    + normal * RAY_EPSILON;

                                row[x as usize] += op(position, normal, &mut rng);
                                counts[x as usize] += 1;
                            }
                        }
                    }

                    for (value, count) in row.iter_mut().zip(counts) {
                        if count > 0 {
                            *value /= count as f32;
                        }
                    }
                });
        });

        let illegal = classify_illegal_texels(primitive, width, height);
        fill_illegal_texels(&mut texels, width, height, &illegal);
        Ok(texels)
    }
}

/// Value of one occlusion ray: 1 when it escapes, otherwise the squared
/// attenuation of the blocker, from 1 at the origin down to 0 at
/// `max_distance`.
pub fn ambient_occlusion(distance: Option<f32>, max_distance: f32) -> f32 {
    distance.map_or(1.0, |d| {
        let attenuation = (max_distance - d).max(0.0) / max_distance;
        attenuation * attenuation
    })
}

/// Seed of the generator for `row` in the `call`-th bake of a session.
fn stream_seed(seed: u64, call: u64, row: u64) -> u64 {
    splitmix64(seed ^ splitmix64(call.rotate_left(32) ^ row))
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

fn write_texels(image: &mut Image, texels: &[Vec3]) {
    let width = image.width();
    for (i, value) in texels.iter().enumerate() {
        let x = i as u32 % width;
        let y = i as u32 / width;
        image.set_texel(x, y, value.extend(1.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use gibake_scene::{DirectionalLight, Scene};
    use glam::Vec4;

    /// Unit square on the XZ plane facing +Y, lightmap UV over [0, 1]^2.
    fn floor(size: f32) -> Primitive {
        let h = size * 0.5;
        let mut quad = Primitive::new("floor");
        quad.positions = vec![
            Vec3::new(-h, 0.0, -h),
            Vec3::new(h, 0.0, -h),
            Vec3::new(h, 0.0, h),
            Vec3::new(-h, 0.0, h),
        ];
        quad.normals = vec![Vec3::Y; 4];
        quad.light_map_tex_coords = vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y];
        quad.indices = vec![0, 2, 1, 0, 3, 2];
        quad
    }

    fn tracer(primitives: Vec<Primitive>) -> PathTracer {
        let mut scene = Scene::new(primitives);
        scene.sun = DirectionalLight {
            direction: Vec3::NEG_Y,
            color: Vec3::ONE,
            power: 1.0,
        };
        PathTracer::with_threads(&scene, 2).unwrap()
    }

    #[test]
    fn occlusion_mapping() {
        assert_abs_diff_eq!(ambient_occlusion(None, 1.0), 1.0);
        assert_abs_diff_eq!(ambient_occlusion(Some(0.0), 1.0), 1.0);
        assert_abs_diff_eq!(ambient_occlusion(Some(0.05), 1.0), 0.9025, epsilon = 1e-6);
        assert_abs_diff_eq!(ambient_occlusion(Some(0.5), 1.0), 0.25);
        assert_abs_diff_eq!(ambient_occlusion(Some(1.0), 1.0), 0.0);
        assert_abs_diff_eq!(ambient_occlusion(Some(3.0), 1.0), 0.0);
        assert_abs_diff_eq!(ambient_occlusion(Some(0.1), 0.2), 0.25);
    }

    #[test]
    fn rejects_uvs_outside_unit_square() {
        let mut quad = floor(1.0);
        let tracer = tracer(vec![quad.clone()]);
        quad.light_map_tex_coords[2] = Vec2::new(1.5, 1.0);
        let baker = IlluminationBaker::with_seed(&tracer, TracerConfig::default(), 1);
        assert!(matches!(
            baker.bake_irradiance(&quad, 4, 4, 1),
            Err(Error::InvalidPrimitive { .. })
        ));
    }

    #[test]
    fn rejects_missing_light_map_uvs() {
        let mut quad = floor(1.0);
        quad.light_map_tex_coords.clear();
        let tracer = tracer(vec![floor(1.0)]);
        let baker = IlluminationBaker::with_seed(&tracer, TracerConfig::default(), 1);
        assert!(baker.bake_ambient_occlusion(&quad, 4, 4, 1, 0.5).is_err());
    }

    #[test]
    fn constant_operator_fills_every_texel() {
        let quad = floor(1.0);
        let tracer = tracer(vec![quad.clone()]);
        let baker = IlluminationBaker::with_seed(&tracer, TracerConfig::default(), 3);
        let texels = baker
            .bake(&quad, 6, 5, 32, |_, normal, _| normal)
            .unwrap();
        assert_eq!(texels.len(), 30);
        for texel in texels {
            assert!(texel.abs_diff_eq(Vec3::Y, 1e-5), "{texel}");
        }
    }

    #[test]
    fn open_floor_is_unoccluded() {
        let quad = floor(2.0);
        let tracer = tracer(vec![quad.clone()]);
        let baker = IlluminationBaker::with_seed(&tracer, TracerConfig::default(), 5);
        let image = baker.bake_ambient_occlusion(&quad, 4, 4, 16, 0.5).unwrap();
        assert_eq!(image.format(), PixelFormat::R16F);
        for y in 0..4 {
            for x in 0..4 {
                assert_abs_diff_eq!(image.texel(x, y).x, 1.0, epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn low_ceiling_attenuates_floor() {
        let quad = floor(2.0);
        let mut ceiling = floor(4.0);
        ceiling.name = "ceiling".to_owned();
        ceiling.transform = glam::Mat4::from_translation(Vec3::new(0.0, 0.2, 0.0));
        let tracer = tracer(vec![quad.clone(), ceiling]);
        let baker = IlluminationBaker::with_seed(&tracer, TracerConfig::default(), 9);
        let image = baker.bake_ambient_occlusion(&quad, 4, 4, 64, 1.0).unwrap();

        // Straight up the ceiling is 0.2 away, so no texel can exceed
        // (1 - 0.2)^2 by more than the few rays that escape past its edge.
        // Over the cosine lobe the squared attenuation averages about 0.45.
        let mut sum = 0.0;
        for y in 0..4 {
            for x in 0..4 {
                let occlusion = image.texel(x, y).x;
                assert!(occlusion < 0.64 + 0.1, "texel ({x}, {y}) = {occlusion}");
                sum += occlusion;
            }
        }
        let mean = sum / 16.0;
        assert!((0.40..0.51).contains(&mean), "mean {mean}");
    }

    #[test]
    fn each_bake_call_draws_fresh_samples() {
        let quad = floor(1.0);
        let mut other = floor(1.0);
        other.name = "other".to_owned();
        let tracer = tracer(vec![quad.clone()]);
        let noise = |_: Vec3, _: Vec3, rng: &mut StdRng| Vec3::splat(rng.random());

        let baker = IlluminationBaker::with_seed(&tracer, TracerConfig::default(), 4);
        let first = baker.bake(&quad, 4, 4, 1, noise).unwrap();
        let second = baker.bake(&other, 4, 4, 1, noise).unwrap();
        assert_ne!(first, second);

        // A new baker with the same seed repeats the first call.
        let again = IlluminationBaker::with_seed(&tracer, TracerConfig::default(), 4)
            .bake(&quad, 4, 4, 1, noise)
            .unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn row_streams_differ() {
        let seeds: std::collections::HashSet<u64> = (0..4)
            .flat_map(|call| (0..64).map(move |row| stream_seed(7, call, row)))
            .collect();
        assert_eq!(seeds.len(), 4 * 64);
        assert_ne!(stream_seed(7, 0, 0), stream_seed(8, 0, 0));
    }

    #[test]
    fn irradiance_format_and_size() {
        let quad = floor(1.0);
        let tracer = tracer(vec![quad.clone()]);
        let baker = IlluminationBaker::with_seed(&tracer, TracerConfig::default(), 2);
        let image = baker.bake_irradiance(&quad, 3, 2, 2).unwrap();
        assert_eq!(image.format(), PixelFormat::Rgb16F);
        assert_eq!(image.size(), UVec2::new(3, 2));
    }

    #[test]
    fn write_texels_is_row_major() {
        let mut image = Image::new(2, 2, PixelFormat::R16F);
        write_texels(&mut image, &[Vec3::ZERO, Vec3::ONE, Vec3::splat(2.0), Vec3::splat(3.0)]);
        assert!(image.texel(1, 0).abs_diff_eq(Vec4::new(1.0, 0.0, 0.0, 1.0), 1e-6));
        assert_abs_diff_eq!(image.texel(0, 1).x, 2.0);
    }
}
