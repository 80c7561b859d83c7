//! Bake harness for integration tests.
//!
//! Wraps a scene and its path tracer, runs bakes with a fixed seed and
//! summarizes baked maps so tests can assert on lighting statistics.

use std::ops::Range;
use std::path::PathBuf;

use gibake_bake::{IlluminationBaker, ProbeBakeConfig, ProbeSet, ReflProbeBaker};
use gibake_core::color::{linear_to_gamma, luminance};
use gibake_core::Error;
use gibake_scene::{Image, PixelFormat, Primitive, Scene};
use gibake_trace::{PathTracer, TracerConfig};
use glam::Vec3;
use image::{ImageBuffer, Rgb};
use tracing::info;

use crate::{HarnessConfig, Result};

/// A scene ready to bake.
pub struct BakeHarness {
    scene: Scene,
    tracer: PathTracer,
    tracer_config: TracerConfig,
    config: HarnessConfig,
}

impl BakeHarness {
    /// Create a harness with the default configuration.
    pub fn new(scene: Scene) -> Result<Self> {
        Self::with_config(scene, HarnessConfig::default())
    }

    /// Create a harness, building the tracer with `config.threads` workers.
    pub fn with_config(scene: Scene, config: HarnessConfig) -> Result<Self> {
        let tracer = PathTracer::with_threads(&scene, config.threads)?;
        Ok(Self {
            scene,
            tracer,
            tracer_config: TracerConfig::default(),
            config,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn tracer(&self) -> &PathTracer {
        &self.tracer
    }

    /// Replace the path tracing parameters used by later bakes.
    pub fn set_tracer_config(&mut self, tracer_config: TracerConfig) {
        self.tracer_config = tracer_config;
    }

    fn baker(&self) -> IlluminationBaker<'_> {
        IlluminationBaker::with_seed(&self.tracer, self.tracer_config, self.config.seed)
    }

    fn primitive(&self, index: usize) -> Result<&Primitive> {
        self.scene.primitives.get(index).ok_or_else(|| {
            Error::OutOfBounds(format!(
                "primitive {index} of {}",
                self.scene.primitives.len()
            ))
            .into()
        })
    }

    /// Bake the irradiance map of one primitive.
    pub fn bake_irradiance(
        &self,
        primitive: usize,
        width: u32,
        height: u32,
        samples_per_texel: u32,
    ) -> Result<Image> {
        let primitive = self.primitive(primitive)?;
        Ok(self
            .baker()
            .bake_irradiance(primitive, width, height, samples_per_texel)?)
    }

    /// Bake the ambient occlusion map of one primitive.
    pub fn bake_ambient_occlusion(
        &self,
        primitive: usize,
        width: u32,
        height: u32,
        samples_per_texel: u32,
        max_distance: f32,
    ) -> Result<Image> {
        let primitive = self.primitive(primitive)?;
        Ok(self.baker().bake_ambient_occlusion(
            primitive,
            width,
            height,
            samples_per_texel,
            max_distance,
        )?)
    }

    /// Place reflection probes for the whole scene.
    pub fn bake_probes(&self, config: &ProbeBakeConfig) -> Result<ProbeSet> {
        Ok(ReflProbeBaker::new(&self.tracer).bake(&self.scene, config)?)
    }

    /// Write a gamma-encoded preview of a baked map to the output directory.
    pub fn save_preview(&self, image: &Image, name: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;
        let path = PathBuf::from(&self.config.output_dir).join(format!("{name}.png"));

        let grey = image.format().channels() == 1;
        let preview = ImageBuffer::from_fn(image.width(), image.height(), |x, y| {
            // Lightmap rows start at the bottom.
            let texel = image.texel(x, image.height() - y - 1).truncate();
            let color = if grey { Vec3::splat(texel.x) } else { texel };
            let display = linear_to_gamma(color.max(Vec3::ZERO)).min(Vec3::ONE);
            Rgb((display * 255.0).round().to_array().map(|c| c as u8))
        });
        preview.save(&path)?;
        info!("Preview saved: {}", path.display());
        Ok(path)
    }
}

/// Summary of a region of a baked map. Color maps are reduced by luminance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightmapStats {
    pub mean: f32,
    pub min: f32,
    pub max: f32,
    pub count: usize,
}

impl LightmapStats {
    /// Statistics over the whole map.
    pub fn of(image: &Image) -> Self {
        Self::of_region(image, 0..image.width(), 0..image.height())
    }

    /// Statistics over texel columns `xs` and rows `ys`.
    pub fn of_region(image: &Image, xs: Range<u32>, ys: Range<u32>) -> Self {
        let values: Vec<f32> = ys
            .flat_map(|y| xs.clone().map(move |x| (x, y)))
            .map(|(x, y)| texel_value(image, x, y))
            .collect();
        let count = values.len();
        let mean = if count == 0 {
            0.0
        } else {
            values.iter().sum::<f32>() / count as f32
        };
        Self {
            mean,
            min: values.iter().copied().fold(f32::INFINITY, f32::min),
            max: values.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            count,
        }
    }

    /// Largest distance of any texel from the mean.
    pub fn max_deviation(&self) -> f32 {
        (self.max - self.mean).max(self.mean - self.min)
    }
}

fn texel_value(image: &Image, x: u32, y: u32) -> f32 {
    let texel = image.texel(x, y);
    match image.format() {
        PixelFormat::R8 | PixelFormat::R16F | PixelFormat::R32F => texel.x,
        _ => luminance(texel.truncate()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Vec4;

    #[test]
    fn stats_over_region() {
        let mut image = Image::new(2, 2, PixelFormat::R32F);
        image.set_texel(0, 0, Vec4::splat(1.0));
        image.set_texel(1, 0, Vec4::splat(3.0));
        let all = LightmapStats::of(&image);
        assert_eq!(all.count, 4);
        assert_relative_eq!(all.mean, 1.0);
        assert_relative_eq!(all.max_deviation(), 2.0);

        let row = LightmapStats::of_region(&image, 0..2, 0..1);
        assert_relative_eq!(row.mean, 2.0);
        assert_relative_eq!(row.min, 1.0);
    }

    #[test]
    fn unknown_primitive_is_an_error() {
        let harness = BakeHarness::new(crate::fixtures::unit_quad()).unwrap();
        assert!(harness.bake_irradiance(3, 4, 4, 1).is_err());
    }
}
