//! Triangle and box geometry tests shared by the rasterizer, the BVH and
//! the probe voxelizer.

use glam::{Vec2, Vec3};

use crate::math::Aabb;

/// Barycentric coordinates `(u, v, w)` of `p` with respect to triangle `abc`,
/// so that `p = u*a + v*b + w*c`.
///
/// Returns `None` for a zero-area triangle.
pub fn barycentric_2d(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> Option<Vec3> {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;

    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);

    let denom = d00 * d11 - d01 * d01;
    if denom.abs() <= f32::EPSILON * (d00 * d11).max(f32::MIN_POSITIVE) {
        return None;
    }
    let inv_denom = 1.0 / denom;
    let v = (d11 * d20 - d01 * d21) * inv_denom;
    let w = (d00 * d21 - d01 * d20) * inv_denom;
    Some(Vec3::new(1.0 - v - w, v, w))
}

/// Inside test on barycentric coordinates: `v >= 0`, `w >= 0`, `v + w <= 1`.
#[inline]
pub fn is_inside_triangle(bary: Vec3) -> bool {
    bary.y >= 0.0 && bary.z >= 0.0 && bary.y + bary.z <= 1.0
}

/// Result of a ray/triangle intersection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleHit {
    /// Distance along the ray
    pub t: f32,
    /// Barycentric weight of the second vertex
    pub v: f32,
    /// Barycentric weight of the third vertex
    pub w: f32,
}

impl TriangleHit {
    /// Barycentric weights of all three vertices
    #[inline]
    pub fn barycentric(&self) -> Vec3 {
        Vec3::new(1.0 - self.v - self.w, self.v, self.w)
    }
}

/// Möller–Trumbore ray/triangle intersection, two-sided.
///
/// Only hits with `t_min < t < t_max` are reported.
pub fn intersect_ray_triangle(
    origin: Vec3,
    direction: Vec3,
    a: Vec3,
    b: Vec3,
    c: Vec3,
    t_min: f32,
    t_max: f32,
) -> Option<TriangleHit> {
    let e1 = b - a;
    let e2 = c - a;
    let p = direction.cross(e2);
    let det = e1.dot(p);
    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = origin - a;
    let v = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&v) {
        return None;
    }
    let q = s.cross(e1);
    let w = direction.dot(q) * inv_det;
    if w < 0.0 || v + w > 1.0 {
        return None;
    }
    let t = e2.dot(q) * inv_det;
    (t > t_min && t < t_max).then_some(TriangleHit { t, v, w })
}

/// Separating-axis triangle/box overlap test.
///
/// Touching counts as overlapping.
pub fn triangle_intersects_aabb(a: Vec3, b: Vec3, c: Vec3, aabb: &Aabb) -> bool {
    let center = aabb.center();
    let h = aabb.half_extents();
    let v = [a - center, b - center, c - center];
    let edges = [v[1] - v[0], v[2] - v[1], v[0] - v[2]];

    let separated = |axis: Vec3| -> bool {
        if axis.length_squared() < 1e-20 {
            return false;
        }
        let p0 = v[0].dot(axis);
        let p1 = v[1].dot(axis);
        let p2 = v[2].dot(axis);
        let r = h.x * axis.x.abs() + h.y * axis.y.abs() + h.z * axis.z.abs();
        p0.min(p1).min(p2) > r || p0.max(p1).max(p2) < -r
    };

    // Cross products of box axes with triangle edges
    for edge in edges {
        for box_axis in [Vec3::X, Vec3::Y, Vec3::Z] {
            if separated(box_axis.cross(edge)) {
                return false;
            }
        }
    }

    // Box face normals
    let tri_min = v[0].min(v[1]).min(v[2]);
    let tri_max = v[0].max(v[1]).max(v[2]);
    if tri_min.cmpgt(h).any() || tri_max.cmplt(-h).any() {
        return false;
    }

    // Triangle plane
    !separated(edges[0].cross(edges[1]))
}

/// Squared distance from a point to the closest point of a box.
pub fn sq_dist_point_aabb(point: Vec3, aabb: &Aabb) -> f32 {
    let below = (aabb.min - point).max(Vec3::ZERO);
    let above = (point - aabb.max).max(Vec3::ZERO);
    (below + above).length_squared()
}

/// True when the sphere touches the box.
#[inline]
pub fn sphere_intersects_aabb(center: Vec3, radius: f32, aabb: &Aabb) -> bool {
    sq_dist_point_aabb(center, aabb) <= radius * radius
}
