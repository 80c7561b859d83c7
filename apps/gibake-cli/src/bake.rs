//! Bake mode.

use std::time::Instant;

use anyhow::Context;
use gibake_bake::{IlluminationBaker, Lightmaps, ProbeBakeConfig, ReflProbeBaker};
use gibake_scene::{load_gltf, Camera, Image, PixelFormat, Scene};
use gibake_trace::{DebugPathTracer, PathTracer, TracerConfig};
use tracing::{info, warn};

use crate::args::{BakeOptions, MapRequest};

pub fn run(options: &BakeOptions) -> anyhow::Result<()> {
    let start = Instant::now();
    let mut scene = load_gltf(&options.scene)
        .with_context(|| format!("failed to load scene {}", options.scene.display()))?;
    scene.sun.power = options.light_strength;
    info!(
        "Loaded {} primitives ({} triangles) from {}",
        scene.primitives.len(),
        scene.triangle_count(),
        options.scene.display()
    );

    let tracer = PathTracer::new(&scene).context("failed to build the path tracer")?;
    let config = TracerConfig {
        max_path_depth: options.max_bounces,
        ..TracerConfig::default()
    };

    if let Some(output) = &options.output {
        let lightmaps = bake_lightmaps(&scene, &tracer, config, options);
        lightmaps
            .save(output, options.format)
            .with_context(|| format!("failed to write {}", output.display()))?;
    }

    if let Some(request) = &options.probes {
        let probe_config = ProbeBakeConfig {
            grid_dimensions: request.grid,
            ..ProbeBakeConfig::default()
        };
        let probes = ReflProbeBaker::new(&tracer)
            .bake(&scene, &probe_config)
            .context("probe placement failed")?;
        probes
            .save(&request.output, options.format)
            .with_context(|| format!("failed to write {}", request.output.display()))?;
    }

    if let Some(request) = &options.debug {
        let aspect = request.width as f32 / request.height.max(1) as f32;
        let camera = Camera::framing(&scene.bounding_box(), aspect);
        let render_config = TracerConfig {
            samples_per_pixel: request.samples,
            ..config
        };
        DebugPathTracer::new(&tracer)
            .render(&camera, request.width, request.height, &render_config, rand::random())
            .save(&request.output)
            .with_context(|| format!("failed to write {}", request.output.display()))?;
    }

    info!("Bake finished in {:.2?}", start.elapsed());
    Ok(())
}

/// Bake the requested maps for every primitive. A primitive that fails
/// validation gets a black map so the lists stay aligned with the scene.
fn bake_lightmaps(
    scene: &Scene,
    tracer: &PathTracer,
    config: TracerConfig,
    options: &BakeOptions,
) -> Lightmaps {
    let baker = IlluminationBaker::new(tracer, config);
    let count = scene.primitives.len();
    let mut lightmaps = Lightmaps::default();

    if options.irradiance.is_none() && options.ambient_occlusion.is_none() {
        warn!("No -irr or -ao requested, writing an empty lightmap file");
    }

    if let Some(MapRequest {
        width,
        height,
        samples,
    }) = options.irradiance
    {
        for (i, primitive) in scene.primitives.iter().enumerate() {
            info!("Baking irradiance map {} of {count} for '{}'", i + 1, primitive.name);
            let image = baker
                .bake_irradiance(primitive, width, height, samples)
                .unwrap_or_else(|e| {
                    warn!("Irradiance bake of '{}' skipped: {e}", primitive.name);
                    Image::new(width, height, PixelFormat::Rgb16F)
                });
            lightmaps.irradiance.push(image);
        }
    }

    if let Some(MapRequest {
        width,
        height,
        samples,
    }) = options.ambient_occlusion
    {
        for (i, primitive) in scene.primitives.iter().enumerate() {
            info!("Baking ambient occlusion map {} of {count} for '{}'", i + 1, primitive.name);
            let image = baker
                .bake_ambient_occlusion(primitive, width, height, samples, options.ao_distance)
                .unwrap_or_else(|e| {
                    warn!("Ambient occlusion bake of '{}' skipped: {e}", primitive.name);
                    Image::new(width, height, PixelFormat::R16F)
                });
            lightmaps.ambient_occlusion.push(image);
        }
    }

    lightmaps
}
