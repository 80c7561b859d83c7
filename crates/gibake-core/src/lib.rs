//! Core types, math, and error handling for gibake.
//!
//! This crate provides the foundational pieces shared by every baking stage:
//! - Rays and axis-aligned bounding boxes
//! - Triangle geometry tests (barycentrics, triangle/box overlap, point/box distance)
//! - Color space helpers
//! - The crate-wide error type

pub mod color;
pub mod error;
pub mod geometry;
pub mod math;

pub use error::{Error, Result};
pub use math::{Aabb, Ray};

/// Baker-wide constants
pub mod constants {
    /// Offset applied to ray origins to avoid self-intersection (world units)
    pub const RAY_EPSILON: f32 = 0.001;
    /// Gamma exponent used when decoding/encoding 8-bit color data
    pub const GAMMA: f32 = 2.2;
    /// Dielectric base reflectance used by the Fresnel term
    pub const DIELECTRIC_F0: f32 = 0.04;
}
