//! Offline lighting bakers.
//!
//! [`IlluminationBaker`] rasterizes primitives into lightmap texel space and
//! integrates irradiance or ambient occlusion per texel with the path tracer.
//! [`ReflProbeBaker`] voxelizes the scene, places reflection probes in empty
//! space and builds the probe visibility grid. The [`io`] module reads and
//! writes the baked artifacts.

pub mod hole_fill;
pub mod illumination;
pub mod io;
pub mod probe;
pub mod probe_baker;
mod texel;

pub use illumination::IlluminationBaker;
pub use io::{FormatVersion, Lightmaps};
pub use probe::{ProbeSet, ReflectionProbe};
pub use probe_baker::{ProbeBakeConfig, ReflProbeBaker, VoxelType};
