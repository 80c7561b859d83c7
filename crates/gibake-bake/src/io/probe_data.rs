//! Probe data files: the probe list and its visibility grid.
//!
//! ```text
//! [b"GIPD" u32 version]                  (version 1 only)
//! u32 probe_count, i32 texture_size, i32 num_bounces
//! probe_count x { f32x3 position, f32x3 aabb_min, f32x3 aabb_max, u32 layer }
//! i32x3 grid_dimensions
//! f32x3 grid_min
//! f32x3 grid_max
//! grid voxels x i32x3 nearest layers, x fastest
//! ```

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use gibake_core::{Error, Result};
use gibake_voxel::VoxelGrid;
use glam::UVec3;
use tracing::info;

use super::{
    read_header, read_i32, read_ivec3, read_u32, read_vec3, write_header, write_i32, write_ivec3,
    write_u32, write_vec3, FormatVersion,
};
use crate::probe::{ProbeSet, ReflectionProbe};

pub const MAGIC: &[u8; 4] = b"GIPD";

/// Bytes per stored voxel.
const VOXEL_SIZE: u64 = 12;

impl ProbeSet {
    /// Write the probes and their visibility grid to `path`. Fails with
    /// [`Error::StaleVisibility`] when the grid was dropped by an edit.
    pub fn save(&self, path: impl AsRef<Path>, version: FormatVersion) -> Result<()> {
        let path = path.as_ref();
        // Encode fully before touching the file so failures leave nothing behind.
        let mut buf = Vec::new();
        write_probe_data(&mut buf, self, version)?;
        std::fs::write(path, buf)?;
        info!("Saved {} reflection probes to {}", self.len(), path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut r = BufReader::new(File::open(path)?);
        read_probe_data(&mut r)
    }
}

pub fn write_probe_data<W: Write>(
    w: &mut W,
    probes: &ProbeSet,
    version: FormatVersion,
) -> Result<()> {
    let visibility = probes.visibility()?;
    let count = u32::try_from(probes.len())
        .map_err(|_| Error::InvalidData(format!("{} probes do not fit the file", probes.len())))?;
    let dimensions = visibility.dimensions();
    if dimensions.max_element() > i32::MAX as u32 {
        return Err(Error::InvalidData(format!("visibility grid {dimensions} is too large")));
    }

    write_header(w, MAGIC, version)?;
    write_u32(w, count)?;
    write_i32(w, probes.texture_size)?;
    write_i32(w, probes.num_bounces)?;
    for probe in probes.probes() {
        write_vec3(w, probe.position)?;
        write_vec3(w, probe.aabb_min)?;
        write_vec3(w, probe.aabb_max)?;
        write_u32(w, probe.layer)?;
    }

    write_ivec3(w, dimensions.as_ivec3())?;
    write_vec3(w, visibility.min())?;
    write_vec3(w, visibility.max())?;
    for &layers in visibility.as_slice() {
        write_ivec3(w, layers)?;
    }
    Ok(())
}

pub fn read_probe_data<R: Read>(r: &mut R) -> Result<ProbeSet> {
    let count = match read_header(r, MAGIC)? {
        (_, Some(first)) => first,
        (_, None) => read_u32(r)?,
    };
    let texture_size = read_i32(r)?;
    let num_bounces = read_i32(r)?;

    let probes = (0..count)
        .map(|_| {
            Ok(ReflectionProbe {
                position: read_vec3(r)?,
                aabb_min: read_vec3(r)?,
                aabb_max: read_vec3(r)?,
                layer: read_u32(r)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let dimensions = read_ivec3(r)?;
    if dimensions.min_element() < 0 {
        return Err(Error::InvalidData(format!(
            "negative visibility grid size {dimensions}"
        )));
    }
    let dimensions = dimensions.as_uvec3();
    let min = read_vec3(r)?;
    let max = read_vec3(r)?;

    let voxels = voxel_count(dimensions);
    // Capacity grows with the data actually read, not the header's claim.
    let mut layers = Vec::new();
    for _ in 0..voxels {
        layers.push(read_ivec3(r)?);
    }
    let visibility = VoxelGrid::from_raw(min, max, dimensions, layers)?;
    ProbeSet::from_parts(probes, visibility, texture_size, num_bounces)
}

fn voxel_count(dimensions: UVec3) -> u64 {
    u64::from(dimensions.x) * u64::from(dimensions.y) * u64::from(dimensions.z)
}

/// Size in bytes of the visibility payload for a grid of `dimensions`.
pub fn visibility_payload_size(dimensions: UVec3) -> u64 {
    voxel_count(dimensions) * VOXEL_SIZE
}
