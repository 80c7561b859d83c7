//! Seam hole filling for baked lightmaps.
//!
//! Texels that no triangle covers well enough are "illegal": bilinear
//! filtering at chart borders would blend their (unbaked) values into the
//! chart. Each illegal texel is replaced by the value of the nearest legal
//! texel found along the eight compass directions.

use gibake_scene::Primitive;
use glam::{UVec2, Vec2};
use rayon::prelude::*;

use crate::texel::texel_triangles;

/// Sub-samples per texel axis used for the coverage test.
pub const COVERAGE_SUBSAMPLES: u32 = 8;

/// Fraction of covered sub-samples from which a texel counts as legal.
pub const COVERAGE_THRESHOLD: f32 = 0.5;

const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (-1, 1),
    (1, -1),
    (-1, -1),
];

/// Flag every texel of a `width x height` lightmap that `primitive` does not
/// sufficiently cover. The result is row-major, `true` meaning illegal.
pub fn classify_illegal_texels(primitive: &Primitive, width: u32, height: u32) -> Vec<bool> {
    let size = UVec2::new(width, height);
    let triangles = texel_triangles(primitive, size);
    let total = (COVERAGE_SUBSAMPLES * COVERAGE_SUBSAMPLES) as f32;
    let step = 1.0 / COVERAGE_SUBSAMPLES as f32;

    let mut illegal = vec![true; width as usize * height as usize];
    if width == 0 {
        return illegal;
    }
    illegal
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as u32;
            let row_triangles: Vec<_> = triangles.iter().filter(|t| t.covers_row(y)).collect();
            for (x, texel) in row.iter_mut().enumerate() {
                let x = x as u32;
                let candidates: Vec<_> = row_triangles
                    .iter()
                    .filter(|t| t.min.x <= x && x <= t.max.x)
                    .collect();
                if candidates.is_empty() {
                    continue;
                }
                let mut covered = 0u32;
                for sy in 0..COVERAGE_SUBSAMPLES {
                    for sx in 0..COVERAGE_SUBSAMPLES {
                        let p = Vec2::new(
                            x as f32 + (sx as f32 + 0.5) * step,
                            y as f32 + (sy as f32 + 0.5) * step,
                        );
                        if candidates.iter().any(|t| t.barycentric(p).is_some()) {
                            covered += 1;
                        }
                    }
                }
                *texel = (covered as f32) / total < COVERAGE_THRESHOLD;
            }
        });
    illegal
}

/// Nearest legal texel to `(x, y)` along the eight compass directions, with
/// the radius growing one texel at a time up to the larger image side.
pub fn find_closest_legal_texel(
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    illegal: &[bool],
) -> Option<(u32, u32)> {
    let max_radius = width.max(height) as i32;
    for radius in 1..=max_radius {
        for (dx, dy) in DIRECTIONS {
            let nx = x as i32 + dx * radius;
            let ny = y as i32 + dy * radius;
            if nx < 0 || ny < 0 || nx >= width as i32 || ny >= height as i32 {
                continue;
            }
            let index = ny as usize * width as usize + nx as usize;
            if !illegal[index] {
                return Some((nx as u32, ny as u32));
            }
        }
    }
    None
}

/// Overwrite every illegal texel of `values` with its nearest legal
/// neighbour. Lookups read the unfilled values, so filled texels never
/// propagate further. Texels with no legal texel in reach keep their value.
pub fn fill_illegal_texels<T: Copy + Send + Sync>(
    values: &mut [T],
    width: u32,
    height: u32,
    illegal: &[bool],
) {
    debug_assert_eq!(values.len(), illegal.len());
    if width == 0 || !illegal.contains(&true) {
        return;
    }
    let source = values.to_vec();
    values
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, value) in row.iter_mut().enumerate() {
                let index = y * width as usize + x;
                if !illegal[index] {
                    continue;
                }
                if let Some((lx, ly)) =
                    find_closest_legal_texel(x as u32, y as u32, width, height, illegal)
                {
                    *value = source[ly as usize * width as usize + lx as usize];
                }
            }
        });
}
