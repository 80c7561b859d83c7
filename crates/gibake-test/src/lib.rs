//! Test harness for the gibake bakers.
//!
//! Provides small analytic scenes and a harness that bakes them with fixed
//! seeds, so integration tests can check lighting statistics.

pub mod fixtures;
pub mod harness;

pub use harness::{BakeHarness, LightmapStats};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestError {
    #[error("Bake error: {0}")]
    Bake(#[from] gibake_core::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, TestError>;

/// Harness configuration.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Worker threads for the path tracer
    pub threads: usize,
    /// Seed for every bake the harness runs
    pub seed: u64,
    /// Directory for preview images of baked maps
    pub output_dir: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            threads: 2,
            seed: 0x5eed,
            output_dir: "target/test_output".to_string(),
        }
    }
}
