//! Triangle meshes placed in the world.

use std::sync::Arc;

use gibake_core::{Aabb, Error, Result};
use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::material::Material;

/// One mesh instance: vertex-indexed attribute arrays, a world transform and
/// a material.
///
/// All attribute arrays other than `positions` may be empty when the source
/// did not provide them; non-empty ones run parallel to `positions`.
#[derive(Clone, Debug, Default)]
pub struct Primitive {
    pub name: String,
    pub transform: Mat4,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec4>,
    pub tex_coords: Vec<Vec2>,
    pub light_map_tex_coords: Vec<Vec2>,
    pub indices: Vec<u32>,
    pub material: Arc<Material>,
}

impl Primitive {
    /// Create an empty primitive with an identity transform.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Mat4::IDENTITY,
            ..Self::default()
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> Error {
        Error::InvalidPrimitive {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }

    /// Check the structural invariants needed for tracing.
    pub fn validate(&self) -> Result<()> {
        if self.positions.is_empty() {
            return Err(self.invalid("no vertex positions"));
        }
        if self.indices.is_empty() {
            return Err(self.invalid("no indices"));
        }
        if self.indices.len() % 3 != 0 {
            return Err(self.invalid(format!(
                "index count {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        let vertex_count = self.positions.len();
        if let Some(&bad) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(self.invalid(format!(
                "index {bad} out of range for {vertex_count} vertices"
            )));
        }
        let check_len = |len: usize, what: &str| -> Result<()> {
            if len != 0 && len != vertex_count {
                return Err(self.invalid(format!(
                    "{len} {what} for {vertex_count} vertices"
                )));
            }
            Ok(())
        };
        check_len(self.normals.len(), "normals")?;
        check_len(self.tangents.len(), "tangents")?;
        check_len(self.tex_coords.len(), "texture coordinates")?;
        check_len(self.light_map_tex_coords.len(), "light map coordinates")?;
        Ok(())
    }

    /// Check that the primitive can be baked into a lightmap: geometry is
    /// valid, normals and light map coordinates exist, and every light map
    /// coordinate lies in `[0, 1]`.
    pub fn validate_light_map(&self) -> Result<()> {
        self.validate()?;
        if self.normals.is_empty() {
            return Err(self.invalid("no vertex normals"));
        }
        if self.light_map_tex_coords.is_empty() {
            return Err(self.invalid("no light map texture coordinates"));
        }
        let unit = 0.0..=1.0;
        if let Some(uv) = self
            .light_map_tex_coords
            .iter()
            .find(|uv| !unit.contains(&uv.x) || !unit.contains(&uv.y))
        {
            return Err(self.invalid(format!(
                "light map coordinate {uv} is outside [0,1]"
            )));
        }
        Ok(())
    }

    /// Number of triangles.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex indices of each triangle.
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.indices
            .chunks_exact(3)
            .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
    }

    /// Inverse-transpose of the transform's upper 3x3, for normals.
    pub fn normal_matrix(&self) -> Mat3 {
        Mat3::from_mat4(self.transform).inverse().transpose()
    }

    pub fn world_positions(&self) -> Vec<Vec3> {
        self.positions
            .iter()
            .map(|&p| self.transform.transform_point3(p))
            .collect()
    }

    /// World-space unit normals; empty when the primitive has none.
    pub fn world_normals(&self) -> Vec<Vec3> {
        let m = self.normal_matrix();
        self.normals
            .iter()
            .map(|&n| (m * n).normalize_or_zero())
            .collect()
    }

    /// World-space tangents, keeping the handedness sign in `w`.
    pub fn world_tangents(&self) -> Vec<Vec4> {
        self.tangents
            .iter()
            .map(|t| {
                let dir = self.transform.transform_vector3(t.truncate()).normalize_or_zero();
                dir.extend(t.w)
            })
            .collect()
    }

    /// World-space bounds of the vertices referenced by the index buffer.
    pub fn world_bounds(&self) -> Aabb {
        Aabb::from_points(
            self.indices
                .iter()
                .filter_map(|&i| self.positions.get(i as usize))
                .map(|&p| self.transform.transform_point3(p)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Primitive {
        Primitive {
            positions: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(0.0, 0.0, 1.0),
            ],
            normals: vec![Vec3::Y; 4],
            light_map_tex_coords: vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y],
            indices: vec![0, 2, 1, 0, 3, 2],
            ..Primitive::new("quad")
        }
    }

    #[test]
    fn valid_quad_passes() {
        let q = quad();
        q.validate().unwrap();
        q.validate_light_map().unwrap();
        assert_eq!(q.triangle_count(), 2);
        assert_eq!(q.triangles().next(), Some([0, 2, 1]));
    }

    #[test]
    fn rejects_bad_indices() {
        let mut q = quad();
        q.indices.push(0);
        assert!(matches!(q.validate(), Err(Error::InvalidPrimitive { .. })));

        let mut q = quad();
        q.indices[0] = 9;
        assert!(q.validate().is_err());
    }

    #[test]
    fn rejects_light_map_uvs_outside_unit_square() {
        let mut q = quad();
        q.light_map_tex_coords[2] = Vec2::new(1.01, 0.5);
        q.validate().unwrap();
        assert!(q.validate_light_map().is_err());
    }

    #[test]
    fn normals_use_inverse_transpose() {
        let mut q = quad();
        q.transform = Mat4::from_scale(Vec3::new(2.0, 0.5, 1.0));
        let n = q.world_normals()[0];
        assert!((n - Vec3::Y).length() < 1e-6);
        let bounds = q.world_bounds();
        assert_eq!(bounds.max, Vec3::new(2.0, 0.0, 1.0));
    }
}
