//! Ray queries and Monte Carlo light transport.
//!
//! - [`RayScene`]: a flattened BVH over all scene triangles, answering
//!   nearest-hit and occlusion queries with interpolated vertex attributes.
//! - [`PathTracer`]: recursive path tracing with one directional light,
//!   Russian roulette and a Lambert + GGX BSDF.
//! - [`DebugPathTracer`]: a camera render of the same light transport, for
//!   checking a scene before committing to a long bake.

pub mod brdf;
pub mod bvh;
pub mod debug;
pub mod fpu;
pub mod sampling;
pub mod tracer;

pub use bvh::{BvhStats, RayScene, SurfaceHit};
pub use debug::DebugPathTracer;
pub use tracer::{PathTracer, TracerConfig};
