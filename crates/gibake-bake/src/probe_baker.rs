//! Reflection probe placement.
//!
//! The scene is voxelized twice. A fine grid classifies each voxel as empty,
//! surface (a triangle overlaps it) or solid (its centre is enclosed by a
//! mesh); a coarse grid, `fine_scale` times coarser per axis, takes the most
//! occupied class of its fine voxels. Every empty coarse voxel receives a
//! probe, whose influence box is sized by tracing the six axis directions.

use std::time::Instant;

use gibake_core::geometry::triangle_intersects_aabb;
use gibake_core::{Aabb, Error, Result};
use gibake_scene::{Primitive, Scene};
use gibake_trace::PathTracer;
use gibake_voxel::VoxelGrid;
use glam::{UVec3, Vec3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::probe::ProbeSet;

/// Axis extents below this are padded before voxelizing.
const MIN_EXTENT: f32 = 1e-3;

/// Overlap tests grow each voxel by this fraction of its size, so triangles
/// lying exactly on a voxel face survive rounding.
const SURFACE_SLACK: f32 = 1e-4;

/// Occupancy class of a voxel, ordered from least to most occupied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VoxelType {
    #[default]
    Empty,
    Surface,
    Solid,
}

/// Probe placement parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeBakeConfig {
    /// Coarse (probe) grid size; one probe at most per coarse voxel
    pub grid_dimensions: UVec3,
    /// Fine voxels per coarse voxel along each axis
    pub fine_scale: u32,
    /// Visibility grid size along each axis
    pub visibility_resolution: u32,
    /// Cube map face size stored with the probes
    pub texture_size: i32,
    /// Capture bounces stored with the probes
    pub num_bounces: i32,
}

impl Default for ProbeBakeConfig {
    fn default() -> Self {
        Self {
            grid_dimensions: UVec3::new(8, 4, 8),
            fine_scale: 4,
            visibility_resolution: 32,
            texture_size: 128,
            num_bounces: 2,
        }
    }
}

/// Places reflection probes in the empty space of a scene.
pub struct ReflProbeBaker<'a> {
    tracer: &'a PathTracer,
}

impl<'a> ReflProbeBaker<'a> {
    /// `tracer` must have been built from the scene passed to [`bake`](Self::bake).
    pub const fn new(tracer: &'a PathTracer) -> Self {
        Self { tracer }
    }

    /// Voxelize `scene`, place probes, size their influence boxes and build
    /// the visibility grid. A scene without empty space yields no probes.
    pub fn bake(&self, scene: &Scene, config: &ProbeBakeConfig) -> Result<ProbeSet> {
        if config.grid_dimensions.min_element() == 0 || config.fine_scale == 0 {
            return Err(Error::InvalidData(format!(
                "probe grid {} with fine scale {} is empty",
                config.grid_dimensions, config.fine_scale
            )));
        }
        let start = Instant::now();
        let bounds = padded_bounds(self.tracer.ray_scene().bounds());

        let fine = self.tracer.install(|| {
            classify_voxels(
                &scene.primitives,
                bounds,
                config.grid_dimensions * config.fine_scale,
            )
        });
        let coarse = coarsen(&fine, config.fine_scale);
        let positions = probe_positions(&coarse);

        let extents: Vec<(Vec3, Vec3)> = self.tracer.install(|| {
            positions
                .par_iter()
                .map(|&position| self.influence_extents(position))
                .collect()
        });

        let mut probes = ProbeSet::new(config.texture_size, config.num_bounces);
        for (&position, &(aabb_min, aabb_max)) in positions.iter().zip(&extents) {
            probes.add(position, aabb_min, aabb_max);
        }
        let resolution = UVec3::splat(config.visibility_resolution);
        self.tracer
            .install(|| probes.rebuild_visibility(bounds, resolution));

        if probes.is_empty() {
            warn!("Scene has no empty voxels, no reflection probes placed");
        }
        info!(
            "Placed {} reflection probes on a {} grid in {:.2?}",
            probes.len(),
            config.grid_dimensions,
            start.elapsed()
        );
        Ok(probes)
    }

    /// Influence box of a probe at `position`, relative to it. Axes with no
    /// blocker stay unbounded.
    pub fn influence_extents(&self, position: Vec3) -> (Vec3, Vec3) {
        let mut min = Vec3::NEG_INFINITY;
        let mut max = Vec3::INFINITY;
        for axis in 0..3 {
            let direction = Vec3::AXES[axis];
            if let Some(d) = self.tracer.occlusion_distance(position, direction) {
                max[axis] = d;
            }
            if let Some(d) = self.tracer.occlusion_distance(position, -direction) {
                min[axis] = -d;
            }
        }
        (min, max)
    }
}

/// Pad flat axes so every voxel has a non-zero size.
pub fn padded_bounds(bounds: Aabb) -> Aabb {
    let size = bounds.size();
    let pad = size.max_element().max(1.0) * 0.25;
    let half_pad = Vec3::select(size.cmplt(Vec3::splat(MIN_EXTENT)), Vec3::splat(pad), Vec3::ZERO);
    Aabb::new(bounds.min - half_pad, bounds.max + half_pad)
}

/// Classify every voxel of a `dimensions` grid over `bounds`.
pub fn classify_voxels(
    primitives: &[Primitive],
    bounds: Aabb,
    dimensions: UVec3,
) -> VoxelGrid<VoxelType> {
    let mut grid = VoxelGrid::new(bounds.min, bounds.max, dimensions);

    for primitive in primitives {
        mark_surface_voxels(&mut grid, primitive);
    }

    let meshes: Vec<ClosedMesh> = primitives.iter().filter_map(ClosedMesh::new).collect();
    let min = grid.min();
    let voxel_size = grid.voxel_size();
    grid.par_update(|coord, voxel| {
        if *voxel != VoxelType::Empty {
            return;
        }
        let centre = min + (coord.as_vec3() + 0.5) * voxel_size;
        if meshes.iter().any(|mesh| mesh.contains(centre)) {
            *voxel = VoxelType::Solid;
        }
    });

    let (mut surface, mut solid) = (0usize, 0usize);
    for voxel in grid.as_slice() {
        match voxel {
            VoxelType::Surface => surface += 1,
            VoxelType::Solid => solid += 1,
            VoxelType::Empty => {}
        }
    }
    debug!(
        "Voxelized {} voxels: {surface} surface, {solid} solid",
        grid.len()
    );
    grid
}

fn mark_surface_voxels(grid: &mut VoxelGrid<VoxelType>, primitive: &Primitive) {
    let positions = primitive.world_positions();
    let (origin, voxel_size, bounds) = (grid.min(), grid.voxel_size(), grid.bounds());
    let last = grid.dimensions().saturating_sub(UVec3::ONE).as_vec3();
    let slack = voxel_size * SURFACE_SLACK;
    // Voxels on both sides of a boundary touch a triangle lying on it.
    let voxel_of = |p: Vec3| ((p - origin) / voxel_size).floor();

    for [i0, i1, i2] in primitive.triangles() {
        let (a, b, c) = (positions[i0], positions[i1], positions[i2]);
        let tri_bounds = Aabb::from_points([a, b, c]);
        if !tri_bounds.intersects(&bounds) {
            continue;
        }
        let lo = voxel_of(tri_bounds.min - slack).clamp(Vec3::ZERO, last).as_uvec3();
        let hi = voxel_of(tri_bounds.max + slack).clamp(Vec3::ZERO, last).as_uvec3();
        for z in lo.z..=hi.z {
            for y in lo.y..=hi.y {
                for x in lo.x..=hi.x {
                    let coord = UVec3::new(x, y, z);
                    let cell = grid.voxel_bounds(coord);
                    let cell = Aabb::new(cell.min - slack, cell.max + slack);
                    if triangle_intersects_aabb(a, b, c, &cell) {
                        if let Some(voxel) = grid.get_mut(coord) {
                            *voxel = VoxelType::Surface;
                        }
                    }
                }
            }
        }
    }
}

/// Reduce a fine grid by `scale` per axis. A coarse voxel takes the most
/// occupied class among its fine voxels.
pub fn coarsen(fine: &VoxelGrid<VoxelType>, scale: u32) -> VoxelGrid<VoxelType> {
    let scale = scale.max(1);
    let dimensions = fine.dimensions() / scale;
    let mut coarse = VoxelGrid::new(fine.min(), fine.max(), dimensions);
    coarse.par_update(|coord, voxel| {
        let base = coord * scale;
        let mut class = VoxelType::Empty;
        for z in 0..scale {
            for y in 0..scale {
                for x in 0..scale {
                    if let Some(&fine_class) = fine.get(base + UVec3::new(x, y, z)) {
                        class = class.max(fine_class);
                    }
                }
            }
        }
        *voxel = class;
    });
    coarse
}

/// Centres of all empty voxels, in scan order.
pub fn probe_positions(grid: &VoxelGrid<VoxelType>) -> Vec<Vec3> {
    grid.iter()
        .filter(|(_, class)| **class == VoxelType::Empty)
        .map(|(coord, _)| grid.voxel_center(coord))
        .collect()
}

/// Face planes of one primitive for containment tests.
struct ClosedMesh {
    bounds: Aabb,
    planes: Vec<(Vec3, Vec3)>,
}

impl ClosedMesh {
    fn new(primitive: &Primitive) -> Option<Self> {
        let positions = primitive.world_positions();
        let planes: Vec<(Vec3, Vec3)> = primitive
            .triangles()
            .filter_map(|[i0, i1, i2]| {
                let (a, b, c) = (positions[i0], positions[i1], positions[i2]);
                let normal = (b - a).cross(c - a).normalize_or_zero();
                (normal != Vec3::ZERO).then_some((a, normal))
            })
            .collect();
        if planes.is_empty() {
            return None;
        }
        Some(Self {
            bounds: Aabb::from_points(positions),
            planes,
        })
    }

    /// Strictly behind every face and inside the mesh bounds.
    fn contains(&self, point: Vec3) -> bool {
        self.bounds.contains_point(point)
            && self
                .planes
                .iter()
                .all(|&(origin, normal)| (point - origin).dot(normal) < 0.0)
    }
}
