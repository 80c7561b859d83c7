//! Dense regular voxel grid.

use gibake_core::{Aabb, Error, Result};
use glam::{UVec3, Vec3};
use rayon::prelude::*;

/// A box `[min, max)` split into `dimensions` cells of equal size, with one
/// `T` stored per cell.
///
/// Storage is flat and row-major: `x + y * dim.x + z * dim.x * dim.y`.
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelGrid<T> {
    min: Vec3,
    max: Vec3,
    voxel_size: Vec3,
    dimensions: UVec3,
    data: Vec<T>,
}

impl<T: Clone + Default> VoxelGrid<T> {
    /// Create a grid with every voxel set to `T::default()`.
    pub fn new(min: Vec3, max: Vec3, dimensions: UVec3) -> Self {
        Self::with_value(min, max, dimensions, T::default())
    }
}

impl<T: Clone> VoxelGrid<T> {
    /// Create a grid with every voxel set to `value`.
    pub fn with_value(min: Vec3, max: Vec3, dimensions: UVec3, value: T) -> Self {
        let len = voxel_count(dimensions);
        Self {
            min,
            max,
            voxel_size: cell_size(min, max, dimensions),
            dimensions,
            data: vec![value; len],
        }
    }

    /// Set every voxel to `value`.
    pub fn fill(&mut self, value: &T) {
        self.data.fill(value.clone());
    }
}

impl<T> VoxelGrid<T> {
    /// Wrap existing row-major voxel data.
    pub fn from_raw(min: Vec3, max: Vec3, dimensions: UVec3, data: Vec<T>) -> Result<Self> {
        let expected = voxel_count(dimensions);
        if data.len() != expected {
            return Err(Error::InvalidData(format!(
                "voxel grid {dimensions} needs {expected} voxels, got {}",
                data.len()
            )));
        }
        Ok(Self {
            min,
            max,
            voxel_size: cell_size(min, max, dimensions),
            dimensions,
            data,
        })
    }

    /// Lower corner of the grid.
    #[inline]
    pub const fn min(&self) -> Vec3 {
        self.min
    }

    /// Upper corner of the grid.
    #[inline]
    pub const fn max(&self) -> Vec3 {
        self.max
    }

    /// World bounds of the whole grid.
    #[inline]
    pub const fn bounds(&self) -> Aabb {
        Aabb::new(self.min, self.max)
    }

    #[inline]
    pub const fn voxel_size(&self) -> Vec3 {
        self.voxel_size
    }

    #[inline]
    pub const fn dimensions(&self) -> UVec3 {
        self.dimensions
    }

    /// Number of voxels.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether `coord` lies inside the grid.
    #[inline]
    pub fn contains(&self, coord: UVec3) -> bool {
        coord.cmplt(self.dimensions).all()
    }

    /// Flat index of a voxel coordinate. The coordinate is not range checked.
    #[inline]
    pub const fn voxel_index(&self, coord: UVec3) -> usize {
        let d = self.dimensions;
        coord.x as usize
            + coord.y as usize * d.x as usize
            + coord.z as usize * d.x as usize * d.y as usize
    }

    /// Inverse of [`voxel_index`](Self::voxel_index).
    #[inline]
    pub const fn voxel_coord_of_index(&self, index: usize) -> UVec3 {
        let dx = self.dimensions.x as usize;
        let dxy = dx * self.dimensions.y as usize;
        UVec3::new(
            (index % dx) as u32,
            ((index / dx) % self.dimensions.y as usize) as u32,
            (index / dxy) as u32,
        )
    }

    /// Coordinate of the voxel containing a world position, if any.
    pub fn voxel_coord(&self, world_pos: Vec3) -> Option<UVec3> {
        if self.is_empty() {
            return None;
        }
        let local = ((world_pos - self.min) / self.voxel_size).floor();
        if local.cmplt(Vec3::ZERO).any() {
            return None;
        }
        let coord = local.as_uvec3();
        self.contains(coord).then_some(coord)
    }

    /// Lower corner of a voxel.
    #[inline]
    pub fn voxel_min(&self, coord: UVec3) -> Vec3 {
        self.min + coord.as_vec3() * self.voxel_size
    }

    /// Upper corner of a voxel.
    #[inline]
    pub fn voxel_max(&self, coord: UVec3) -> Vec3 {
        self.voxel_min(coord) + self.voxel_size
    }

    #[inline]
    pub fn voxel_center(&self, coord: UVec3) -> Vec3 {
        self.voxel_min(coord) + self.voxel_size * 0.5
    }

    /// World bounds of one voxel.
    #[inline]
    pub fn voxel_bounds(&self, coord: UVec3) -> Aabb {
        Aabb::new(self.voxel_min(coord), self.voxel_max(coord))
    }

    pub fn get(&self, coord: UVec3) -> Option<&T> {
        if self.contains(coord) {
            self.data.get(self.voxel_index(coord))
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, coord: UVec3) -> Option<&mut T> {
        if self.contains(coord) {
            let index = self.voxel_index(coord);
            self.data.get_mut(index)
        } else {
            None
        }
    }

    /// Store a value, failing for coordinates outside the grid.
    pub fn set(&mut self, coord: UVec3, value: T) -> Result<()> {
        let dimensions = self.dimensions;
        let slot = self.get_mut(coord).ok_or_else(|| {
            Error::OutOfBounds(format!("voxel {coord} outside grid {dimensions}"))
        })?;
        *slot = value;
        Ok(())
    }

    /// Row-major voxel storage.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<T> {
        self.data
    }

    /// All voxel coordinates in storage order (x fastest, then y, then z).
    pub fn coords(&self) -> impl Iterator<Item = UVec3> {
        let d = self.dimensions;
        (0..d.z).flat_map(move |z| (0..d.y).flat_map(move |y| (0..d.x).map(move |x| UVec3::new(x, y, z))))
    }

    /// Voxels paired with their coordinates, in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (UVec3, &T)> {
        self.coords().zip(self.data.iter())
    }

    /// Visit every voxel coordinate in storage order.
    pub fn for_each_voxel(&self, mut body: impl FnMut(UVec3)) {
        for coord in self.coords() {
            body(coord);
        }
    }

    /// Build a grid of the same shape from a per-voxel function.
    pub fn map<U>(&self, mut f: impl FnMut(UVec3, &T) -> U) -> VoxelGrid<U> {
        VoxelGrid {
            min: self.min,
            max: self.max,
            voxel_size: self.voxel_size,
            dimensions: self.dimensions,
            data: self.iter().map(|(coord, v)| f(coord, v)).collect(),
        }
    }
}

impl<T: Send> VoxelGrid<T> {
    /// Update every voxel in parallel. The closure sees the voxel coordinate.
    pub fn par_update(&mut self, f: impl Fn(UVec3, &mut T) + Sync + Send) {
        let d = self.dimensions;
        let dx = d.x as usize;
        let dxy = dx * d.y as usize;
        self.data.par_iter_mut().enumerate().for_each(|(index, voxel)| {
            let coord = UVec3::new(
                (index % dx) as u32,
                ((index / dx) % d.y as usize) as u32,
                (index / dxy) as u32,
            );
            f(coord, voxel);
        });
    }
}

fn voxel_count(dimensions: UVec3) -> usize {
    dimensions.x as usize * dimensions.y as usize * dimensions.z as usize
}

// A zero dimension yields an empty grid; keep the size finite regardless.
fn cell_size(min: Vec3, max: Vec3, dimensions: UVec3) -> Vec3 {
    (max - min) / dimensions.max(UVec3::ONE).as_vec3()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashSet;

    #[test]
    fn index_roundtrip() {
        let grid: VoxelGrid<u8> = VoxelGrid::new(Vec3::ZERO, Vec3::ONE, UVec3::new(3, 4, 5));
        let mut seen = HashSet::new();
        for coord in grid.coords() {
            let index = grid.voxel_index(coord);
            assert!(index < grid.len());
            assert!(seen.insert(index), "index {index} produced twice");
            assert_eq!(grid.voxel_coord_of_index(index), coord);
        }
        assert_eq!(seen.len(), 60);
    }

    #[test]
    fn storage_is_x_fastest() {
        let grid: VoxelGrid<u8> = VoxelGrid::new(Vec3::ZERO, Vec3::ONE, UVec3::new(2, 3, 4));
        assert_eq!(grid.voxel_index(UVec3::new(1, 0, 0)), 1);
        assert_eq!(grid.voxel_index(UVec3::new(0, 1, 0)), 2);
        assert_eq!(grid.voxel_index(UVec3::new(0, 0, 1)), 6);
        let first: Vec<UVec3> = grid.coords().take(3).collect();
        assert_eq!(first, vec![UVec3::ZERO, UVec3::X, UVec3::Y]);
    }

    #[test]
    fn world_to_voxel() {
        let grid: VoxelGrid<u8> =
            VoxelGrid::new(Vec3::splat(-1.0), Vec3::splat(1.0), UVec3::splat(4));
        assert_eq!(grid.voxel_size(), Vec3::splat(0.5));
        assert_eq!(grid.voxel_coord(Vec3::splat(-0.9)), Some(UVec3::ZERO));
        assert_eq!(grid.voxel_coord(Vec3::new(0.1, -0.6, 0.9)), Some(UVec3::new(2, 0, 3)));
        assert_eq!(grid.voxel_coord(Vec3::splat(1.0)), None);
        assert_eq!(grid.voxel_coord(Vec3::splat(-1.1)), None);

        let center = grid.voxel_center(UVec3::new(2, 0, 3));
        assert_relative_eq!(center.x, 0.25);
        assert_relative_eq!(center.y, -0.75);
        assert_relative_eq!(center.z, 0.75);
    }

    #[test]
    fn set_and_fill() {
        let mut grid: VoxelGrid<i32> = VoxelGrid::new(Vec3::ZERO, Vec3::ONE, UVec3::splat(2));
        grid.set(UVec3::new(1, 1, 1), 7).unwrap();
        assert_eq!(grid.get(UVec3::new(1, 1, 1)), Some(&7));
        assert!(grid.set(UVec3::new(2, 0, 0), 1).is_err());
        grid.fill(&-1);
        assert!(grid.as_slice().iter().all(|&v| v == -1));
    }

    #[test]
    fn par_update_sees_coordinates() {
        let mut grid: VoxelGrid<UVec3> = VoxelGrid::new(Vec3::ZERO, Vec3::ONE, UVec3::new(3, 2, 2));
        grid.par_update(|coord, v| *v = coord);
        for (coord, v) in grid.iter() {
            assert_eq!(coord, *v);
        }
    }

    #[test]
    fn from_raw_checks_length() {
        assert!(VoxelGrid::from_raw(Vec3::ZERO, Vec3::ONE, UVec3::splat(2), vec![0u8; 7]).is_err());
        let grid = VoxelGrid::from_raw(Vec3::ZERO, Vec3::ONE, UVec3::ZERO, Vec::<u8>::new()).unwrap();
        assert!(grid.is_empty());
        assert_eq!(grid.voxel_coord(Vec3::splat(0.5)), None);
    }
}
