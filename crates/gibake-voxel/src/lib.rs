//! Voxel storage for the gibake baker.
//!
//! [`VoxelGrid`] is a dense, regular grid over an axis-aligned world region.
//! The probe baker uses it both for scene classification and for the
//! probe-visibility lookup that is written alongside the baked probes.

pub mod grid;

pub use grid::VoxelGrid;
