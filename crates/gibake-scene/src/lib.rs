//! Scene description consumed by the gibake tracer and bakers.
//!
//! A [`Scene`] is a flat list of [`Primitive`]s (triangle meshes with a world
//! transform and a baking [`Material`]) plus a single [`DirectionalLight`].
//! Scenes are built once on import and stay immutable while baking.

pub mod camera;
pub mod image;
pub mod import;
pub mod material;
pub mod primitive;
pub mod scene;

pub use camera::Camera;
pub use image::{Image, PixelFormat, WrapMode};
pub use import::load_gltf;
pub use material::{Material, SurfaceSample};
pub use primitive::Primitive;
pub use scene::{DirectionalLight, Scene};
