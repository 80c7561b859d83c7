//! Recursive Monte Carlo path tracing with a single directional light.

use gibake_core::constants::RAY_EPSILON;
use gibake_core::{Error, Result};
use gibake_scene::{DirectionalLight, Scene, SurfaceSample};
use glam::{Vec2, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::brdf;
use crate::bvh::{RayScene, SurfaceHit};
use crate::fpu;
use crate::sampling::{pdf_cosine_hemisphere, pdf_ggx, sample_cosine_hemisphere, sample_ggx};

/// Path tracing parameters, snapshotted by value at the start of every trace
/// or bake call.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TracerConfig {
    /// Paths per pixel for camera renders
    pub samples_per_pixel: u32,
    /// Deepest bounce that still gathers light
    pub max_path_depth: u32,
    /// Bounce depth from which radiance is clamped
    pub clamp_depth: u32,
    /// Upper bound for clamped radiance
    pub clamp_radiance: f32,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            samples_per_pixel: 100,
            max_path_depth: 3,
            clamp_depth: 0,
            clamp_radiance: 25.0,
        }
    }
}

/// Path tracer owning the scene's acceleration structure and a worker pool.
///
/// The acceleration structure is read-only once built, so the tracer can be
/// shared by reference across worker threads.
pub struct PathTracer {
    scene: RayScene,
    light: DirectionalLight,
    light_radiance: Vec3,
    pool: rayon::ThreadPool,
}

impl PathTracer {
    /// Build the acceleration structure for `scene` and a pool with one
    /// worker per logical core.
    pub fn new(scene: &Scene) -> Result<Self> {
        Self::with_threads(scene, 0)
    }

    /// Like [`new`](Self::new) with an explicit worker count; zero picks one
    /// worker per logical core.
    pub fn with_threads(scene: &Scene, num_threads: usize) -> Result<Self> {
        let ray_scene = RayScene::build(&scene.primitives)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("gibake-trace-{i}"))
            .start_handler(|_| fpu::enable_flush_to_zero())
            .build()
            .map_err(|e| Error::ThreadPool(e.to_string()))?;
        info!("Path tracer ready with {} worker threads", pool.current_num_threads());

        Ok(Self {
            scene: ray_scene,
            light: scene.sun,
            light_radiance: scene.sun.radiance(),
            pool,
        })
    }

    /// The acceleration structure.
    pub const fn ray_scene(&self) -> &RayScene {
        &self.scene
    }

    pub const fn light(&self) -> &DirectionalLight {
        &self.light
    }

    /// Run `op` inside the tracer's worker pool so that rayon iterators
    /// inside it use the tracing threads.
    pub fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        self.pool.install(op)
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn nearest_hit(&self, origin: Vec3, direction: Vec3) -> Option<SurfaceHit<'_>> {
        self.scene.nearest_hit(origin, direction)
    }

    pub fn is_occluded(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> bool {
        self.scene.is_occluded(origin, direction, max_distance)
    }

    /// Distance to the nearest blocker, `None` when the ray escapes.
    pub fn occlusion_distance(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        self.scene.occlusion_distance(origin, direction)
    }

    /// Radiance arriving at `origin` from `direction`.
    pub fn trace<R: Rng>(
        &self,
        origin: Vec3,
        direction: Vec3,
        config: &TracerConfig,
        rng: &mut R,
    ) -> Vec3 {
        self.trace_path(origin, direction.normalize(), Vec3::ONE, 0, config, rng)
    }

    fn trace_path<R: Rng>(
        &self,
        origin: Vec3,
        direction: Vec3,
        weight: Vec3,
        depth: u32,
        config: &TracerConfig,
        rng: &mut R,
    ) -> Vec3 {
        if depth > config.max_path_depth {
            return Vec3::ZERO;
        }
        let Some(hit) = self.scene.nearest_hit(origin, direction) else {
            return Vec3::ZERO;
        };

        let surface = hit.material.surface_at(hit.tex_coord);
        let normal = hit.normal;
        let wo = -direction;
        let origin = hit.point + hit.geometric_normal * RAY_EPSILON;

        let mut radiance = self.direct_light(origin, normal, wo, &surface);

        // Russian roulette on the path throughput
        let rho = weight.max_element().clamp(0.0, 1.0);
        if rng.random::<f32>() < rho {
            if let Some(indirect) =
                self.indirect_light(origin, normal, wo, &surface, weight, rho, depth, config, rng)
            {
                radiance += indirect;
            }
        }

        if depth >= config.clamp_depth {
            radiance = radiance.clamp(Vec3::ZERO, Vec3::splat(config.clamp_radiance));
        }
        radiance
    }

    fn direct_light(
        &self,
        origin: Vec3,
        normal: Vec3,
        wo: Vec3,
        surface: &SurfaceSample,
    ) -> Vec3 {
        let to_light = self.light.to_light();
        let n_dot_l = normal.dot(to_light);
        if n_dot_l <= 0.0 || self.scene.is_occluded(origin, to_light, f32::INFINITY) {
            return Vec3::ZERO;
        }
        brdf::evaluate(normal, wo, to_light, surface).total() * n_dot_l * self.light_radiance
    }

    #[allow(clippy::too_many_arguments)]
    fn indirect_light<R: Rng>(
        &self,
        origin: Vec3,
        normal: Vec3,
        wo: Vec3,
        surface: &SurfaceSample,
        weight: Vec3,
        rho: f32,
        depth: u32,
        config: &TracerConfig,
        rng: &mut R,
    ) -> Option<Vec3> {
        let p_diffuse = brdf::diffuse_probability(surface)?;
        let u = Vec2::new(rng.random(), rng.random());

        let (wi, pdf, p_lobe, diffuse_lobe) = if rng.random::<f32>() < p_diffuse {
            let wi = sample_cosine_hemisphere(normal, u);
            (wi, pdf_cosine_hemisphere(normal, wi), p_diffuse, true)
        } else {
            let wi = sample_ggx(normal, wo, surface.roughness, u);
            (wi, pdf_ggx(normal, wo, wi, surface.roughness), 1.0 - p_diffuse, false)
        };

        let n_dot_l = normal.dot(wi);
        if n_dot_l <= 0.0 || pdf <= 0.0 || p_lobe <= 0.0 {
            return None;
        }

        let value = brdf::evaluate(normal, wo, wi, surface);
        let lobe = if diffuse_lobe { value.diffuse } else { value.specular };
        let throughput = lobe * n_dot_l / (pdf * rho * p_lobe);
        if !throughput.is_finite() {
            return None;
        }

        let incoming = self.trace_path(origin, wi, weight * throughput, depth + 1, config, rng);
        Some(throughput * incoming)
    }
}
