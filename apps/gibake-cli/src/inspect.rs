//! Inspect mode: load a scene with its baked files and report on them.

use std::path::Path;

use anyhow::Context;
use gibake_bake::{Lightmaps, ProbeSet};
use gibake_core::color::luminance;
use gibake_scene::{load_gltf, Image, Scene};
use tracing::{info, warn};

use crate::args::InspectOptions;

pub fn run(options: &InspectOptions) -> anyhow::Result<()> {
    let scene = load_gltf(&options.scene)
        .with_context(|| format!("failed to load scene {}", options.scene.display()))?;
    let bounds = scene.bounding_box();
    info!(
        "Scene {}: {} primitives, {} triangles, bounds {} .. {}",
        options.scene.display(),
        scene.primitives.len(),
        scene.triangle_count(),
        bounds.min,
        bounds.max
    );
    for primitive in &scene.primitives {
        if let Err(e) = primitive.validate_light_map() {
            warn!("{e}");
        }
    }

    if let Some(path) = &options.lightmaps {
        inspect_lightmaps(&scene, path)?;
    }
    if let Some(path) = &options.probe_data {
        inspect_probes(path)?;
    }
    Ok(())
}

fn inspect_lightmaps(scene: &Scene, path: &Path) -> anyhow::Result<()> {
    let lightmaps =
        Lightmaps::load(path).with_context(|| format!("failed to read {}", path.display()))?;
    let count = scene.primitives.len();
    for (kind, maps) in [
        ("irradiance", &lightmaps.irradiance),
        ("ambient occlusion", &lightmaps.ambient_occlusion),
    ] {
        if !maps.is_empty() && maps.len() != count {
            warn!("{} {kind} maps for {count} primitives", maps.len());
        }
        for (image, primitive) in maps.iter().zip(&scene.primitives) {
            info!(
                "{kind} '{}': {}x{}, mean {:.4}",
                primitive.name,
                image.width(),
                image.height(),
                mean_value(image)
            );
        }
    }
    Ok(())
}

fn inspect_probes(path: &Path) -> anyhow::Result<()> {
    let probes = ProbeSet::load(path).with_context(|| format!("failed to read {}", path.display()))?;
    let grid = probes.visibility()?;
    info!(
        "{} reflection probes ({}px, {} bounces), visibility grid {} over {} .. {}",
        probes.len(),
        probes.texture_size,
        probes.num_bounces,
        grid.dimensions(),
        grid.min(),
        grid.max()
    );
    for probe in probes.probes() {
        info!(
            "probe {}: position {}, extents {} .. {}",
            probe.layer, probe.position, probe.aabb_min, probe.aabb_max
        );
    }
    Ok(())
}

fn mean_value(image: &Image) -> f32 {
    let texels = image.width() as usize * image.height() as usize;
    if texels == 0 {
        return 0.0;
    }
    let grey = image.format().channels() == 1;
    let mut sum = 0.0;
    for y in 0..image.height() {
        for x in 0..image.width() {
            let texel = image.texel(x, y);
            sum += if grey { texel.x } else { luminance(texel.truncate()) };
        }
    }
    sum / texels as f32
}
