//! Hemisphere and microfacet importance sampling.
//!
//! Sampling functions are deterministic: callers pass uniform numbers in
//! `[0, 1)`, which keeps random number generation under the caller's control
//! and makes the distributions testable.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};

/// Orthonormal tangent frame `(x, y)` around a unit normal.
pub fn coordinate_system(normal: Vec3) -> (Vec3, Vec3) {
    let seed = if normal.x.abs() > 0.9 { Vec3::Z } else { Vec3::X };
    let y_axis = normal.cross(seed).normalize();
    let x_axis = y_axis.cross(normal).normalize();
    (x_axis, y_axis)
}

#[inline]
fn to_world(local: Vec3, normal: Vec3) -> Vec3 {
    let (x_axis, y_axis) = coordinate_system(normal);
    (x_axis * local.x + y_axis * local.y + normal * local.z).normalize()
}

/// GGX width parameter for a perceptual roughness. Bounded away from zero so
/// that perfectly smooth surfaces still have a finite distribution.
#[inline]
pub fn ggx_alpha(roughness: f32) -> f32 {
    (roughness * roughness).max(1.0e-3)
}

/// Cosine-weighted direction on the hemisphere around `normal`.
pub fn sample_cosine_hemisphere(normal: Vec3, u: Vec2) -> Vec3 {
    let r = u.x.sqrt();
    let phi = 2.0 * PI * u.y;
    let local = Vec3::new(r * phi.sin(), r * phi.cos(), (1.0 - u.x).max(0.0).sqrt());
    to_world(local, normal)
}

/// Density of [`sample_cosine_hemisphere`] per unit solid angle.
#[inline]
pub fn pdf_cosine_hemisphere(normal: Vec3, wi: Vec3) -> f32 {
    normal.dot(wi).max(0.0) / PI
}

/// GGX normal distribution `D(h)`.
#[inline]
pub fn ggx_distribution(n_dot_h: f32, alpha: f32) -> f32 {
    if n_dot_h <= 0.0 {
        return 0.0;
    }
    let a2 = alpha * alpha;
    let d = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    a2 / (PI * d * d)
}

/// Microfacet normal drawn proportionally to `D(h) * cos(theta_h)`.
pub fn sample_ggx_half_vector(normal: Vec3, roughness: f32, u: Vec2) -> Vec3 {
    let a2 = ggx_alpha(roughness).powi(2);
    let cos2 = ((1.0 - u.x) / (1.0 + (a2 - 1.0) * u.x)).clamp(0.0, 1.0);
    let cos_theta = cos2.sqrt();
    let sin_theta = (1.0 - cos2).sqrt();
    let phi = 2.0 * PI * u.y;
    to_world(
        Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta),
        normal,
    )
}

/// Reflect the view direction `wo` about a GGX-sampled half vector.
///
/// The result may fall below the surface; callers discard such samples.
pub fn sample_ggx(normal: Vec3, wo: Vec3, roughness: f32, u: Vec2) -> Vec3 {
    let h = sample_ggx_half_vector(normal, roughness, u);
    (2.0 * wo.dot(h) * h - wo).normalize()
}

/// Density of [`sample_ggx`] per unit solid angle of `wi`.
pub fn pdf_ggx(normal: Vec3, wo: Vec3, wi: Vec3, roughness: f32) -> f32 {
    let h = (wo + wi).normalize_or_zero();
    let n_dot_h = normal.dot(h);
    let wo_dot_h = wo.dot(h).abs();
    if n_dot_h <= 0.0 || wo_dot_h <= 0.0 {
        return 0.0;
    }
    ggx_distribution(n_dot_h, ggx_alpha(roughness)) * n_dot_h / (4.0 * wo_dot_h)
}
