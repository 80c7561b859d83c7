//! End-to-end lightmap bakes on analytic scenes.

use approx::assert_abs_diff_eq;
use gibake_scene::PixelFormat;
use gibake_test::{fixtures, BakeHarness, LightmapStats};

#[test]
fn lone_quad_receives_no_irradiance() {
    // Every path escapes and there is no sky term.
    let harness = BakeHarness::new(fixtures::unit_quad()).unwrap();
    let image = harness.bake_irradiance(0, 4, 4, 64).unwrap();
    assert_eq!(image.format(), PixelFormat::Rgb16F);

    let stats = LightmapStats::of(&image);
    assert_eq!(stats.count, 16);
    assert_eq!(stats.min, 0.0);
    assert_eq!(stats.max, 0.0);
}

#[test]
fn single_quad_irradiance_is_flat() {
    let harness = BakeHarness::new(fixtures::quad_under_lit_ceiling()).unwrap();
    let image = harness.bake_irradiance(0, 4, 4, 1000).unwrap();
    assert_eq!(image.format(), PixelFormat::Rgb16F);

    let stats = LightmapStats::of(&image);
    assert_eq!(stats.count, 16);
    assert!(stats.mean > 0.05, "mean {}", stats.mean);
    assert!(
        stats.max_deviation() <= 0.1 * stats.mean,
        "texels span {}..{} around {}",
        stats.min,
        stats.max,
        stats.mean
    );
}

#[test]
fn single_quad_is_unoccluded() {
    let harness = BakeHarness::new(fixtures::unit_quad()).unwrap();
    let image = harness.bake_ambient_occlusion(0, 4, 4, 32, 0.15).unwrap();
    let stats = LightmapStats::of(&image);
    assert_abs_diff_eq!(stats.min, 1.0, epsilon = 1e-3);
    assert_abs_diff_eq!(stats.max, 1.0, epsilon = 1e-3);
}

#[test]
fn floor_near_wall_receives_more_bounce_light() {
    let harness = BakeHarness::new(fixtures::floor_and_wall()).unwrap();
    let image = harness.bake_irradiance(0, 8, 8, 64).unwrap();

    let near = LightmapStats::of_region(&image, 6..8, 1..7);
    let far = LightmapStats::of_region(&image, 0..2, 1..7);
    assert!(far.min >= 0.0);
    assert!(
        near.mean > 2.0 * far.mean,
        "near {} vs far {}",
        near.mean,
        far.mean
    );
}

#[test]
fn wall_attenuates_nearby_floor() {
    let harness = BakeHarness::new(fixtures::floor_and_wall()).unwrap();
    let image = harness.bake_ambient_occlusion(0, 8, 8, 64, 0.5).unwrap();

    // From the far edge the wall is past the occlusion distance, so the rays
    // reaching it count as 0 and the rest escape as 1.
    let far = LightmapStats::of_region(&image, 0..2, 0..8);
    assert!(far.mean > 0.85 && far.mean < 0.97, "far {}", far.mean);

    let near = LightmapStats::of_region(&image, 6..8, 1..7);
    assert!(near.mean < far.mean - 0.1, "near {} vs far {}", near.mean, far.mean);
}

#[test]
fn every_primitive_of_the_box_bakes() {
    let harness = BakeHarness::new(fixtures::open_box()).unwrap();
    for index in 0..harness.scene().primitives.len() {
        let image = harness.bake_ambient_occlusion(index, 4, 4, 8, 0.5).unwrap();
        let stats = LightmapStats::of(&image);
        assert!(stats.min >= 0.0 && stats.max <= 1.0 + 1e-3);
    }
}

#[test]
fn invalid_light_map_degrades_single_primitive() {
    let mut scene = fixtures::floor_and_wall();
    scene.primitives[1].light_map_tex_coords[2].x = 2.0;
    let harness = BakeHarness::new(scene).unwrap();
    assert!(harness.bake_irradiance(0, 4, 4, 4).is_ok());
    assert!(harness.bake_irradiance(1, 4, 4, 4).is_err());
}

#[test]
fn preview_is_written() {
    let harness = BakeHarness::new(fixtures::floor_and_wall()).unwrap();
    let image = harness.bake_ambient_occlusion(0, 8, 8, 8, 0.5).unwrap();
    let path = harness.save_preview(&image, "floor_ao").unwrap();
    assert!(path.exists());
}
