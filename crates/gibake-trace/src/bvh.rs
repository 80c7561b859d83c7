//! Bounding volume hierarchy over world-space triangles.
//!
//! Built once per bake session from every primitive of a scene, with
//! transforms pre-applied. The tree is a flat array; internal nodes store
//! the index of their left child and the right child follows it.

use std::sync::Arc;
use std::time::Instant;

use gibake_core::constants::RAY_EPSILON;
use gibake_core::geometry::{intersect_ray_triangle, TriangleHit};
use gibake_core::{Aabb, Error, Result};
use gibake_scene::{Material, Primitive};
use glam::{Vec2, Vec3, Vec4};
use tracing::info;

/// Triangles per leaf before a node is split.
pub const MAX_LEAF_SIZE: usize = 4;

const STACK_SIZE: usize = 64;

#[derive(Clone, Debug)]
struct Triangle {
    positions: [Vec3; 3],
    normals: [Vec3; 3],
    tex_coords: [Vec2; 3],
    tangents: Option<[Vec4; 3]>,
    geometry: u32,
}

impl Triangle {
    fn bounds(&self) -> Aabb {
        Aabb::from_points(self.positions)
    }

    fn centroid(&self) -> Vec3 {
        (self.positions[0] + self.positions[1] + self.positions[2]) / 3.0
    }
}

#[derive(Clone, Copy, Debug)]
struct BvhNode {
    bounds: Aabb,
    /// Left child index for internal nodes, first triangle for leaves
    first: u32,
    /// Triangle count; zero marks an internal node
    count: u32,
}

impl BvhNode {
    #[inline]
    const fn is_leaf(&self) -> bool {
        self.count > 0
    }
}

/// Shape of a built hierarchy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BvhStats {
    pub node_count: usize,
    pub leaf_count: usize,
    pub triangle_count: usize,
    pub max_depth: usize,
}

/// Nearest intersection along a ray, with interpolated vertex attributes.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceHit<'a> {
    pub point: Vec3,
    /// Interpolated shading normal, flipped to face the incoming ray
    pub normal: Vec3,
    /// Face normal, flipped to face the incoming ray
    pub geometric_normal: Vec3,
    /// Whether the ray struck the side the vertex normals point to
    pub front_face: bool,
    pub tex_coord: Vec2,
    pub tangent: Option<Vec4>,
    pub distance: f32,
    /// Index of the originating primitive
    pub geometry: usize,
    pub material: &'a Material,
}

/// Acceleration structure for ray queries against a static scene.
pub struct RayScene {
    triangles: Vec<Triangle>,
    nodes: Vec<BvhNode>,
    materials: Vec<Arc<Material>>,
    stats: BvhStats,
}

impl RayScene {
    /// Build the hierarchy from every primitive.
    ///
    /// Fails if any primitive lacks positions or indices, or if the scene has
    /// no triangles at all. Degenerate triangles are kept.
    pub fn build(primitives: &[Primitive]) -> Result<Self> {
        let start = Instant::now();
        let mut triangles = Vec::new();
        let mut materials = Vec::with_capacity(primitives.len());

        for (geometry, primitive) in primitives.iter().enumerate() {
            primitive.validate()?;
            materials.push(Arc::clone(&primitive.material));

            let positions = primitive.world_positions();
            let normals = primitive.world_normals();
            let tangents = primitive.world_tangents();

            for [a, b, c] in primitive.triangles() {
                let p = [positions[a], positions[b], positions[c]];
                let n = if normals.is_empty() {
                    let face = (p[1] - p[0]).cross(p[2] - p[0]).normalize_or_zero();
                    [face; 3]
                } else {
                    [normals[a], normals[b], normals[c]]
                };
                let uv = |i: usize| primitive.tex_coords.get(i).copied().unwrap_or(Vec2::ZERO);
                triangles.push(Triangle {
                    positions: p,
                    normals: n,
                    tex_coords: [uv(a), uv(b), uv(c)],
                    tangents: (!tangents.is_empty()).then(|| [tangents[a], tangents[b], tangents[c]]),
                    geometry: geometry as u32,
                });
            }
        }

        if triangles.is_empty() {
            return Err(Error::MissingGeometry(
                "cannot build a ray scene without triangles".to_owned(),
            ));
        }

        let mut scene = Self {
            triangles,
            nodes: Vec::new(),
            materials,
            stats: BvhStats::default(),
        };
        scene.build_hierarchy();

        info!(
            "Built BVH: {} triangles, {} nodes, {} leaves, depth {} in {:.2?}",
            scene.stats.triangle_count,
            scene.stats.node_count,
            scene.stats.leaf_count,
            scene.stats.max_depth,
            start.elapsed()
        );
        Ok(scene)
    }

    fn build_hierarchy(&mut self) {
        let bounds: Vec<Aabb> = self.triangles.iter().map(Triangle::bounds).collect();
        let centroids: Vec<Vec3> = self.triangles.iter().map(Triangle::centroid).collect();
        let mut order: Vec<u32> = (0..self.triangles.len() as u32).collect();

        self.nodes.reserve(2 * self.triangles.len());
        self.nodes.push(BvhNode {
            bounds: Aabb::EMPTY,
            first: 0,
            count: 0,
        });
        let mut stats = BvhStats {
            triangle_count: self.triangles.len(),
            ..BvhStats::default()
        };
        let len = order.len();
        self.subdivide(0, 0, len, 1, &mut order, &bounds, &centroids, &mut stats);
        stats.node_count = self.nodes.len();

        // Leaves address triangles directly, so store them in tree order
        let mut sorted = Vec::with_capacity(self.triangles.len());
        for &i in &order {
            sorted.push(self.triangles[i as usize].clone());
        }
        self.triangles = sorted;
        self.stats = stats;
    }

    #[allow(clippy::too_many_arguments)]
    fn subdivide(
        &mut self,
        node: usize,
        start: usize,
        end: usize,
        depth: usize,
        order: &mut [u32],
        bounds: &[Aabb],
        centroids: &[Vec3],
        stats: &mut BvhStats,
    ) {
        stats.max_depth = stats.max_depth.max(depth);
        let range = &mut order[start..end];
        let node_bounds = range
            .iter()
            .fold(Aabb::EMPTY, |acc, &i| acc.merge(&bounds[i as usize]));
        self.nodes[node].bounds = node_bounds;

        let count = end - start;
        let centroid_bounds = Aabb::from_points(range.iter().map(|&i| centroids[i as usize]));
        let axis = centroid_bounds.longest_axis();
        let extent = centroid_bounds.size()[axis];

        if count <= MAX_LEAF_SIZE || extent <= f32::EPSILON {
            self.nodes[node].first = start as u32;
            self.nodes[node].count = count as u32;
            stats.leaf_count += 1;
            return;
        }

        // Median split along the longest centroid axis
        let mid = count / 2;
        range.select_nth_unstable_by(mid, |&a, &b| {
            centroids[a as usize][axis].total_cmp(&centroids[b as usize][axis])
        });

        let left = self.nodes.len();
        let placeholder = BvhNode {
            bounds: Aabb::EMPTY,
            first: 0,
            count: 0,
        };
        self.nodes.push(placeholder);
        self.nodes.push(placeholder);
        self.nodes[node].first = left as u32;
        self.nodes[node].count = 0;

        self.subdivide(left, start, start + mid, depth + 1, order, bounds, centroids, stats);
        self.subdivide(left + 1, start + mid, end, depth + 1, order, bounds, centroids, stats);
    }

    /// Statistics gathered during construction.
    pub const fn stats(&self) -> BvhStats {
        self.stats
    }

    /// World bounds of every triangle.
    pub fn bounds(&self) -> Aabb {
        self.nodes.first().map_or(Aabb::EMPTY, |n| n.bounds)
    }

    /// Visit candidate triangles front to back, stopping early when `visit`
    /// returns `true`. `t_max` shrinks as `visit` narrows the search.
    fn traverse(
        &self,
        origin: Vec3,
        direction: Vec3,
        t_max: &mut f32,
        mut visit: impl FnMut(usize, &mut f32) -> bool,
    ) {
        let inv_dir = direction.recip();
        let mut stack = [0u32; STACK_SIZE];
        let mut top = 0usize;

        if self.nodes[0].bounds.intersect_inv(origin, inv_dir, *t_max).is_none() {
            return;
        }
        stack[top] = 0;
        top += 1;

        while top > 0 {
            top -= 1;
            let node = self.nodes[stack[top] as usize];

            if node.is_leaf() {
                let first = node.first as usize;
                for index in first..first + node.count as usize {
                    if visit(index, t_max) {
                        return;
                    }
                }
                continue;
            }

            let left = node.first as usize;
            let right = left + 1;
            let hit_left = self.nodes[left].bounds.intersect_inv(origin, inv_dir, *t_max);
            let hit_right = self.nodes[right].bounds.intersect_inv(origin, inv_dir, *t_max);

            // Push the farther child first so the nearer one is popped next
            match (hit_left, hit_right) {
                (Some((tl, _)), Some((tr, _))) => {
                    let (near, far) = if tl <= tr { (left, right) } else { (right, left) };
                    if top + 2 > STACK_SIZE {
                        continue;
                    }
                    stack[top] = far as u32;
                    stack[top + 1] = near as u32;
                    top += 2;
                }
                (Some(_), None) if top < STACK_SIZE => {
                    stack[top] = left as u32;
                    top += 1;
                }
                (None, Some(_)) if top < STACK_SIZE => {
                    stack[top] = right as u32;
                    top += 1;
                }
                _ => {}
            }
        }
    }

    fn closest(&self, origin: Vec3, direction: Vec3) -> Option<(usize, TriangleHit)> {
        let mut best = None;
        let mut t_max = f32::INFINITY;
        self.traverse(origin, direction, &mut t_max, |index, t_max| {
            let [a, b, c] = self.triangles[index].positions;
            if let Some(hit) = intersect_ray_triangle(origin, direction, a, b, c, RAY_EPSILON, *t_max) {
                *t_max = hit.t;
                best = Some((index, hit));
            }
            false
        });
        best
    }

    /// Nearest surface hit along a ray. `direction` must be normalized.
    pub fn nearest_hit(&self, origin: Vec3, direction: Vec3) -> Option<SurfaceHit<'_>> {
        let (index, hit) = self.closest(origin, direction)?;
        let tri = &self.triangles[index];
        let bary = hit.barycentric();

        let face = (tri.positions[1] - tri.positions[0])
            .cross(tri.positions[2] - tri.positions[0])
            .normalize_or_zero();
        let mut normal = (tri.normals[0] * bary.x + tri.normals[1] * bary.y + tri.normals[2] * bary.z)
            .normalize_or(face);

        let front_face = normal.dot(direction) < 0.0;
        if !front_face {
            normal = -normal;
        }
        let geometric_normal = if face.dot(direction) < 0.0 { face } else { -face };

        let tex_coord = tri.tex_coords[0] * bary.x + tri.tex_coords[1] * bary.y + tri.tex_coords[2] * bary.z;
        let tangent = tri
            .tangents
            .map(|t| t[0] * bary.x + t[1] * bary.y + t[2] * bary.z);

        Some(SurfaceHit {
            point: origin + direction * hit.t,
            normal,
            geometric_normal,
            front_face,
            tex_coord,
            tangent,
            distance: hit.t,
            geometry: tri.geometry as usize,
            material: &self.materials[tri.geometry as usize],
        })
    }

    /// Whether anything blocks the ray within `max_distance`.
    pub fn is_occluded(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> bool {
        let mut occluded = false;
        let mut t_max = max_distance;
        self.traverse(origin, direction, &mut t_max, |index, t_max| {
            let [a, b, c] = self.triangles[index].positions;
            occluded = intersect_ray_triangle(origin, direction, a, b, c, RAY_EPSILON, *t_max).is_some();
            occluded
        });
        occluded
    }

    /// Distance to the first blocker along the ray, or `None` if unoccluded.
    pub fn occlusion_distance(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        self.closest(origin, direction).map(|(_, hit)| hit.t)
    }
}
