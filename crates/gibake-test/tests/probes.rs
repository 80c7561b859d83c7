//! Reflection probe placement in an open box.

use approx::assert_relative_eq;
use gibake_bake::probe::NO_PROBE;
use gibake_bake::ProbeBakeConfig;
use gibake_test::{fixtures, BakeHarness};
use glam::UVec3;

fn box_config() -> ProbeBakeConfig {
    ProbeBakeConfig {
        grid_dimensions: UVec3::new(4, 2, 5),
        fine_scale: 2,
        visibility_resolution: 8,
        ..ProbeBakeConfig::default()
    }
}

#[test]
fn probes_fill_the_box_interior() {
    let harness = BakeHarness::new(fixtures::open_box()).unwrap();
    let probes = harness.bake_probes(&box_config()).unwrap();

    // Walls and floor claim the outer coarse voxels, leaving 2 x 1 x 3.
    assert_eq!(probes.len(), 6);
    for (i, probe) in probes.probes().iter().enumerate() {
        assert_eq!(probe.layer, i as u32);
        assert_relative_eq!(probe.position.y, 2.25, epsilon = 1e-4);

        // The box is open at the top.
        assert!(probe.aabb_max.y.is_infinite());
        let world = probe.world_bounds();
        assert_relative_eq!(world.min.y, 0.0, epsilon = 1e-3);
        assert_relative_eq!(world.min.x, -2.0, epsilon = 1e-3);
        assert_relative_eq!(world.max.x, 2.0, epsilon = 1e-3);
        assert_relative_eq!(world.min.z, -2.0, epsilon = 1e-3);
        assert_relative_eq!(world.max.z, 2.0, epsilon = 1e-3);
    }

    // Scan order: x fastest, then z.
    let first = probes.probes()[0].position;
    let second = probes.probes()[1].position;
    assert!(first.x < second.x);
    assert_relative_eq!(first.z, second.z);
}

#[test]
fn visibility_references_nearest_probes() {
    let harness = BakeHarness::new(fixtures::open_box()).unwrap();
    let probes = harness.bake_probes(&box_config()).unwrap();
    let grid = probes.visibility().unwrap();
    assert_eq!(grid.dimensions(), UVec3::splat(8));

    for (coord, layers) in grid.iter() {
        assert!(layers.min_element() >= 0, "voxel {coord} has {layers}");
        let centre = grid.voxel_center(coord);
        let distance = |layer: i32| {
            probes.probes()[layer as usize]
                .position
                .distance_squared(centre)
        };
        assert!(distance(layers.x) <= distance(layers.y));
        assert!(distance(layers.y) <= distance(layers.z));
        for probe in probes.probes() {
            if ![layers.x, layers.y, layers.z].contains(&(probe.layer as i32)) {
                assert!(probe.position.distance_squared(centre) >= distance(layers.z));
            }
        }
    }
}

#[test]
fn removing_a_probe_requires_a_rebuild() {
    let harness = BakeHarness::new(fixtures::open_box()).unwrap();
    let mut probes = harness.bake_probes(&box_config()).unwrap();
    let bounds = probes.visibility().unwrap().bounds();

    probes.remove(2).unwrap();
    assert!(probes.visibility().is_err());

    probes.rebuild_visibility(bounds, UVec3::splat(4));
    let grid = probes.visibility().unwrap();
    assert!(grid
        .as_slice()
        .iter()
        .all(|v| v.max_element() < 5 && v.min_element() > NO_PROBE));
}
