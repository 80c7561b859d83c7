//! Lightmap texel-space rasterization helpers.

use gibake_core::geometry::{barycentric_2d, is_inside_triangle};
use gibake_scene::Primitive;
use glam::{UVec2, Vec2, Vec3};

/// A primitive triangle mapped into lightmap texel space.
///
/// Texel `i` covers `[i, i + 1)` along each axis, so a lightmap UV of 0 lands
/// on the centre of the first texel and a UV of 1 on the centre of the last.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TexelTriangle {
    pub vertices: [usize; 3],
    pub points: [Vec2; 3],
    /// Inclusive texel range covered by the triangle's bounding box
    pub min: UVec2,
    pub max: UVec2,
}

impl TexelTriangle {
    pub fn covers_row(&self, y: u32) -> bool {
        self.min.y <= y && y <= self.max.y
    }

    /// Barycentric coordinates of `p` when it lies inside the triangle.
    pub fn barycentric(&self, p: Vec2) -> Option<Vec3> {
        let [a, b, c] = self.points;
        barycentric_2d(p, a, b, c).filter(|&bary| is_inside_triangle(bary))
    }
}

/// Map a lightmap UV to continuous texel coordinates.
pub(crate) fn to_texel_space(uv: Vec2, size: UVec2) -> Vec2 {
    uv * (size.as_vec2() - Vec2::ONE) + Vec2::splat(0.5)
}

/// Map every triangle of `primitive` into texel space. Triangles whose box
/// falls entirely outside the image are dropped.
pub(crate) fn texel_triangles(primitive: &Primitive, size: UVec2) -> Vec<TexelTriangle> {
    let last = size.saturating_sub(UVec2::ONE).as_vec2();
    primitive
        .triangles()
        .filter_map(|vertices| {
            let points = vertices.map(|i| to_texel_space(primitive.light_map_tex_coords[i], size));
            let lo = points[0].min(points[1]).min(points[2]).floor();
            let hi = points[0].max(points[1]).max(points[2]).floor();
            if hi.x < 0.0 || hi.y < 0.0 || lo.x > last.x || lo.y > last.y {
                return None;
            }
            Some(TexelTriangle {
                vertices,
                points,
                min: lo.clamp(Vec2::ZERO, last).as_uvec2(),
                max: hi.clamp(Vec2::ZERO, last).as_uvec2(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn uv_corners_land_on_texel_centres() {
        let size = UVec2::new(4, 8);
        assert_relative_eq!(to_texel_space(Vec2::ZERO, size).x, 0.5);
        assert_relative_eq!(to_texel_space(Vec2::ONE, size).x, 3.5);
        assert_relative_eq!(to_texel_space(Vec2::ONE, size).y, 7.5);
    }

    #[test]
    fn triangle_box_is_clamped_to_image() {
        let mut quad = Primitive::new("tri");
        quad.positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        quad.light_map_tex_coords = vec![Vec2::ZERO, Vec2::X, Vec2::Y];
        quad.indices = vec![0, 1, 2];

        let tris = texel_triangles(&quad, UVec2::new(4, 4));
        assert_eq!(tris.len(), 1);
        assert_eq!(tris[0].min, UVec2::ZERO);
        assert_eq!(tris[0].max, UVec2::new(3, 3));
        assert!(tris[0].covers_row(2));
        assert!(tris[0].barycentric(Vec2::new(1.0, 1.0)).is_some());
        assert!(tris[0].barycentric(Vec2::new(3.4, 3.4)).is_none());
    }
}
