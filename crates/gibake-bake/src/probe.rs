//! Reflection probes and their visibility grid.

use gibake_core::geometry::sphere_intersects_aabb;
use gibake_core::{Aabb, Error, Result};
use gibake_voxel::VoxelGrid;
use glam::{IVec3, UVec3, Vec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of probe layers recorded per visibility voxel.
pub const PROBES_PER_VOXEL: usize = 3;

/// Layer value marking an unused visibility slot.
pub const NO_PROBE: i32 = -1;

/// A localized environment capture point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReflectionProbe {
    /// World-space capture position
    pub position: Vec3,
    /// Lower influence extent, relative to `position`
    pub aabb_min: Vec3,
    /// Upper influence extent, relative to `position`
    pub aabb_max: Vec3,
    /// Index of the probe's slice in the renderer's probe texture array
    pub layer: u32,
}

impl ReflectionProbe {
    /// World-space influence box.
    pub fn world_bounds(&self) -> Aabb {
        Aabb::new(self.position + self.aabb_min, self.position + self.aabb_max)
    }
}

/// The probe list of a scene, with the visibility grid derived from it.
///
/// Layers are dense: the probes always carry layers `0..len` in list order.
/// Any structural edit (add, remove, move) drops the visibility grid, since
/// its voxels refer to probes by layer. The grid comes back only through
/// [`rebuild_visibility`](Self::rebuild_visibility).
#[derive(Clone, Debug, Default)]
pub struct ProbeSet {
    probes: Vec<ReflectionProbe>,
    visibility: Option<VoxelGrid<IVec3>>,
    /// Cube map face size the renderer captures probes at
    pub texture_size: i32,
    /// Probe capture bounces
    pub num_bounces: i32,
}

impl ProbeSet {
    pub fn new(texture_size: i32, num_bounces: i32) -> Self {
        Self {
            probes: Vec::new(),
            visibility: None,
            texture_size,
            num_bounces,
        }
    }

    /// Reassemble a probe set from stored parts. Layers must be dense and
    /// the grid must only reference existing layers.
    pub fn from_parts(
        probes: Vec<ReflectionProbe>,
        visibility: VoxelGrid<IVec3>,
        texture_size: i32,
        num_bounces: i32,
    ) -> Result<Self> {
        let mut layers: Vec<u32> = probes.iter().map(|p| p.layer).collect();
        layers.sort_unstable();
        if layers.iter().enumerate().any(|(i, &layer)| layer as usize != i) {
            return Err(Error::InvalidData("probe layers are not dense".to_owned()));
        }
        let count = probes.len() as i32;
        if let Some(bad) = visibility
            .as_slice()
            .iter()
            .flat_map(|v| v.to_array())
            .find(|&layer| layer != NO_PROBE && !(0..count).contains(&layer))
        {
            return Err(Error::InvalidData(format!(
                "visibility grid references probe layer {bad} of {count}"
            )));
        }
        Ok(Self {
            probes,
            visibility: Some(visibility),
            texture_size,
            num_bounces,
        })
    }

    pub fn probes(&self) -> &[ReflectionProbe] {
        &self.probes
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ReflectionProbe> {
        self.probes.get(index)
    }

    /// Append a probe with the next free layer and return that layer.
    pub fn add(&mut self, position: Vec3, aabb_min: Vec3, aabb_max: Vec3) -> u32 {
        let layer = self.probes.len() as u32;
        self.probes.push(ReflectionProbe {
            position,
            aabb_min,
            aabb_max,
            layer,
        });
        self.invalidate();
        layer
    }

    /// Remove the probe at `index`, shifting every higher layer down by one.
    pub fn remove(&mut self, index: usize) -> Result<ReflectionProbe> {
        if index >= self.probes.len() {
            return Err(Error::OutOfBounds(format!(
                "probe {index} of {}",
                self.probes.len()
            )));
        }
        let removed = self.probes.remove(index);
        for probe in &mut self.probes {
            if probe.layer > removed.layer {
                probe.layer -= 1;
            }
        }
        self.invalidate();
        Ok(removed)
    }

    /// Move a probe and replace its influence extents.
    pub fn set_transform(
        &mut self,
        index: usize,
        position: Vec3,
        aabb_min: Vec3,
        aabb_max: Vec3,
    ) -> Result<()> {
        let count = self.probes.len();
        let probe = self
            .probes
            .get_mut(index)
            .ok_or_else(|| Error::OutOfBounds(format!("probe {index} of {count}")))?;
        probe.position = position;
        probe.aabb_min = aabb_min;
        probe.aabb_max = aabb_max;
        self.invalidate();
        Ok(())
    }

    /// Probes whose world influence box touches the sphere.
    pub fn probes_overlapping_sphere(
        &self,
        center: Vec3,
        radius: f32,
    ) -> impl Iterator<Item = &ReflectionProbe> + '_ {
        self.probes
            .iter()
            .filter(move |p| sphere_intersects_aabb(center, radius, &p.world_bounds()))
    }

    /// Recompute the visibility grid over `bounds` for the current probes.
    pub fn rebuild_visibility(&mut self, bounds: Aabb, resolution: UVec3) {
        self.visibility = Some(nearest_probe_grid(&self.probes, bounds, resolution));
    }

    /// The visibility grid, if it matches the current probe list.
    pub fn visibility(&self) -> Result<&VoxelGrid<IVec3>> {
        self.visibility.as_ref().ok_or(Error::StaleVisibility)
    }

    pub fn has_visibility(&self) -> bool {
        self.visibility.is_some()
    }

    fn invalidate(&mut self) {
        if self.visibility.take().is_some() {
            debug!("Probe list changed, visibility grid dropped");
        }
    }
}

/// For every voxel of a `resolution` grid over `bounds`, the layers of the
/// nearest probes to the voxel centre, closest first and padded with
/// [`NO_PROBE`]. Equal distances keep list order.
pub fn nearest_probe_grid(
    probes: &[ReflectionProbe],
    bounds: Aabb,
    resolution: UVec3,
) -> VoxelGrid<IVec3> {
    let mut grid =
        VoxelGrid::with_value(bounds.min, bounds.max, resolution, IVec3::splat(NO_PROBE));
    let min = grid.min();
    let voxel_size = grid.voxel_size();

    grid.par_update(|coord, voxel| {
        let centre = min + (coord.as_vec3() + 0.5) * voxel_size;
        let mut nearest = [(f32::INFINITY, NO_PROBE); PROBES_PER_VOXEL];
        for probe in probes {
            let d = probe.position.distance_squared(centre);
            if let Some(slot) = nearest.iter().position(|&(best, _)| d < best) {
                nearest[slot..].rotate_right(1);
                nearest[slot] = (d, probe.layer as i32);
            }
        }
        *voxel = IVec3::new(nearest[0].1, nearest[1].1, nearest[2].1);
    });
    grid
}
