//! Analytic test scenes.
//!
//! Every quad is two triangles with lightmap UVs covering `[0, 1]^2`; the
//! first lightmap axis runs along the quad's first edge.

use std::sync::Arc;

use gibake_scene::{DirectionalLight, Material, Primitive, Scene};
use glam::{Vec2, Vec3};

/// Quad spanning `corner + s*u + t*v` for `s, t` in `[0, 1]`, facing `u x v`.
pub fn quad(name: &str, corner: Vec3, u: Vec3, v: Vec3) -> Primitive {
    let normal = u.cross(v).normalize();
    let uvs = vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y];
    let mut mesh = Primitive::new(name);
    mesh.positions = vec![corner, corner + u, corner + u + v, corner + v];
    mesh.normals = vec![normal; 4];
    mesh.tex_coords.clone_from(&uvs);
    mesh.light_map_tex_coords = uvs;
    mesh.indices = vec![0, 1, 2, 0, 2, 3];
    mesh
}

/// Sun with white light of the given travel direction and power.
pub fn sun(direction: Vec3, power: f32) -> DirectionalLight {
    DirectionalLight {
        direction,
        color: Vec3::ONE,
        power,
    }
}

/// 1x1 quad on the XZ plane facing +Y, lit straight down at unit power.
pub fn unit_quad() -> Scene {
    let floor = quad("quad", Vec3::new(-0.5, 0.0, 0.5), Vec3::X, Vec3::NEG_Z);
    let mut scene = Scene::new(vec![floor]);
    scene.sun = sun(Vec3::NEG_Y, 1.0);
    scene
}

/// The unit quad under a 200x200 ceiling ten units up. The sun shines
/// upwards at 45 degrees onto the ceiling's underside, so the quad only
/// receives light bounced off the ceiling, nearly uniform across it.
pub fn quad_under_lit_ceiling() -> Scene {
    let floor = quad("quad", Vec3::new(-0.5, 0.0, 0.5), Vec3::X, Vec3::NEG_Z);
    let mut ceiling = quad(
        "ceiling",
        Vec3::new(-100.0, 10.0, -100.0),
        Vec3::X * 200.0,
        Vec3::Z * 200.0,
    );
    ceiling.material = Arc::new(Material::flat(Vec3::splat(0.8), 1.0, 0.0));
    let mut scene = Scene::new(vec![floor, ceiling]);
    scene.sun = sun(Vec3::new(1.0, 1.0, 0.0), 1.0);
    scene
}

/// 2x2 floor facing +Y with a 2x2 wall standing on its +X edge, facing the
/// floor. The sun lights both from the -X side. The floor's first lightmap
/// axis runs along +X, towards the wall.
pub fn floor_and_wall() -> Scene {
    let floor = quad(
        "floor",
        Vec3::new(-1.0, 0.0, 1.0),
        Vec3::X * 2.0,
        Vec3::NEG_Z * 2.0,
    );
    let wall = quad(
        "wall",
        Vec3::new(1.0, 0.0, -1.0),
        Vec3::Z * 2.0,
        Vec3::Y * 2.0,
    );
    let mut scene = Scene::new(vec![floor, wall]);
    scene.sun = sun(Vec3::new(1.0, -1.0, 0.0), 1.0);
    scene
}

/// Floor plus four inward-facing walls of a 4x3x4 box, open at the top.
pub fn open_box() -> Scene {
    let (w, h) = (4.0, 3.0);
    let primitives = vec![
        quad("floor", Vec3::new(-2.0, 0.0, 2.0), Vec3::X * w, Vec3::NEG_Z * w),
        quad("wall_neg_x", Vec3::new(-2.0, 0.0, -2.0), Vec3::Y * h, Vec3::Z * w),
        quad("wall_pos_x", Vec3::new(2.0, 0.0, -2.0), Vec3::Z * w, Vec3::Y * h),
        quad("wall_neg_z", Vec3::new(-2.0, 0.0, -2.0), Vec3::X * w, Vec3::Y * h),
        quad("wall_pos_z", Vec3::new(-2.0, 0.0, 2.0), Vec3::Y * h, Vec3::X * w),
    ];
    let mut scene = Scene::new(primitives);
    scene.sun = sun(Vec3::new(0.3, -1.0, 0.2), 2.0);
    scene
}
