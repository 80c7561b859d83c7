//! Lambert diffuse plus Cook-Torrance GGX specular reflection.

use std::f32::consts::PI;

use gibake_core::color::luminance;
use gibake_core::constants::DIELECTRIC_F0;
use gibake_scene::SurfaceSample;
use glam::Vec3;

use crate::sampling::{ggx_alpha, ggx_distribution};

/// BRDF value split by lobe. Neither part includes the cosine term.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BrdfValue {
    pub diffuse: Vec3,
    pub specular: Vec3,
}

impl BrdfValue {
    #[inline]
    pub fn total(&self) -> Vec3 {
        self.diffuse + self.specular
    }
}

/// Normal-incidence reflectance: 0.04 for dielectrics, albedo for metals.
#[inline]
pub fn base_reflectance(surface: &SurfaceSample) -> Vec3 {
    Vec3::splat(DIELECTRIC_F0).lerp(surface.albedo, surface.metallic)
}

/// Schlick's Fresnel approximation.
#[inline]
pub fn fresnel_schlick(f0: Vec3, cos_theta: f32) -> Vec3 {
    f0 + (Vec3::ONE - f0) * (1.0 - cos_theta.clamp(0.0, 1.0)).powi(5)
}

/// Smith shadowing-masking with the Schlick-GGX approximation, `k = roughness^2 / 2`.
#[inline]
pub fn smith_geometry(n_dot_v: f32, n_dot_l: f32, roughness: f32) -> f32 {
    let k = roughness * roughness * 0.5;
    let g1 = |x: f32| x / (x * (1.0 - k) + k);
    g1(n_dot_v) * g1(n_dot_l)
}

/// Evaluate both lobes for view direction `wo` and light direction `wi`,
/// both pointing away from the surface.
pub fn evaluate(normal: Vec3, wo: Vec3, wi: Vec3, surface: &SurfaceSample) -> BrdfValue {
    let n_dot_v = normal.dot(wo);
    let n_dot_l = normal.dot(wi);
    if n_dot_v <= 0.0 || n_dot_l <= 0.0 {
        return BrdfValue::default();
    }

    let h = (wo + wi).normalize();
    let n_dot_h = normal.dot(h).max(0.0);
    let v_dot_h = wo.dot(h).max(0.0);

    let f = fresnel_schlick(base_reflectance(surface), v_dot_h);
    let d = ggx_distribution(n_dot_h, ggx_alpha(surface.roughness));
    let g = smith_geometry(n_dot_v, n_dot_l, surface.roughness);

    let specular = f * (d * g / (4.0 * n_dot_v * n_dot_l));
    let diffuse = (Vec3::ONE - f) * (1.0 - surface.metallic) * surface.albedo / PI;
    BrdfValue { diffuse, specular }
}

/// Probability of choosing the diffuse lobe when sampling a bounce,
/// proportional to each lobe's approximate luminance. `None` for a black surface.
pub fn diffuse_probability(surface: &SurfaceSample) -> Option<f32> {
    let diffuse = luminance(surface.albedo * (1.0 - surface.metallic));
    let specular = luminance(base_reflectance(surface));
    let sum = diffuse + specular;
    (sum > 0.0).then(|| diffuse / sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::{pdf_cosine_hemisphere, sample_cosine_hemisphere};
    use approx::assert_relative_eq;
    use glam::Vec2;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn surface(albedo: f32, roughness: f32, metallic: f32) -> SurfaceSample {
        SurfaceSample {
            albedo: Vec3::splat(albedo),
            roughness,
            metallic,
        }
    }

    #[test]
    fn direct_diffuse_never_exceeds_albedo() {
        // Unit radiance from a directional light at several elevations
        let s = surface(0.7, 1.0, 0.0);
        for angle in [0.0_f32, 0.3, 0.8, 1.2] {
            let wi = Vec3::new(angle.sin(), angle.cos(), 0.0);
            let value = evaluate(Vec3::Y, Vec3::Y, wi, &s);
            let reflected = value.diffuse * Vec3::Y.dot(wi) * PI;
            assert!(reflected.x <= 0.7 + 1e-6);
        }
    }

    #[test]
    fn hemispherical_reflectance_below_one() {
        let mut rng = StdRng::seed_from_u64(5);
        let s = surface(0.8, 0.5, 0.0);
        for view_angle in [0.0_f32, 0.8, 1.2] {
            let wo = Vec3::new(view_angle.sin(), view_angle.cos(), 0.0);
            let n = 20_000;
            let mut sum = Vec3::ZERO;
            for _ in 0..n {
                let wi = sample_cosine_hemisphere(Vec3::Y, Vec2::new(rng.random(), rng.random()));
                let pdf = pdf_cosine_hemisphere(Vec3::Y, wi);
                if pdf > 0.0 {
                    sum += evaluate(Vec3::Y, wo, wi, &s).total() * Vec3::Y.dot(wi) / pdf;
                }
            }
            let albedo = sum / n as f32;
            assert!(albedo.x < 1.0, "reflectance {albedo} at view angle {view_angle}");
            assert!(albedo.x > 0.5);
        }
    }

    #[test]
    fn below_horizon_is_black() {
        let s = surface(0.5, 0.5, 0.0);
        let v = evaluate(Vec3::Y, Vec3::Y, Vec3::NEG_Y, &s);
        assert_eq!(v.total(), Vec3::ZERO);
    }

    #[test]
    fn fresnel_limits() {
        let f0 = Vec3::splat(0.04);
        assert_relative_eq!(fresnel_schlick(f0, 1.0).x, 0.04);
        assert_relative_eq!(fresnel_schlick(f0, 0.0).x, 1.0);
    }

    #[test]
    fn metals_have_no_diffuse_lobe() {
        let s = surface(0.9, 0.3, 1.0);
        assert_eq!(diffuse_probability(&s), Some(0.0));
        let v = evaluate(Vec3::Y, Vec3::Y, Vec3::Y, &s);
        assert_eq!(v.diffuse, Vec3::ZERO);
        assert!(v.specular.x > 0.0);
        assert_eq!(diffuse_probability(&surface(0.0, 0.5, 1.0)), None);
    }
}
