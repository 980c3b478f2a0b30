//! Summary numbers over field readbacks.

use serde::Serialize;

use crate::field::GridField;

/// A dye texel counts toward the footprint above this intensity.
pub const DYE_FOOTPRINT_THRESHOLD: f32 = 0.01;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct VelocityStats {
    pub avg_speed: f32,
    pub max_speed: f32,
    pub avg_divergence: f32,
    pub max_divergence: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct DyeStats {
    /// Sum of the RGB channels over all texels.
    pub total: f32,
    /// Fraction of texels with some channel above [`DYE_FOOTPRINT_THRESHOLD`].
    pub footprint: f32,
}

/// Speed and absolute divergence, averaged and maxed over the field.
/// Divergence is the central difference in texel units with wrapped
/// neighbors.
pub fn velocity_stats(velocity: &GridField) -> VelocityStats {
    let mut stats = VelocityStats::default();
    let mut sum_speed = 0.0f32;
    let mut sum_div = 0.0f32;
    for y in 0..velocity.height() {
        for x in 0..velocity.width() {
            let (ix, iy) = (x as i32, y as i32);
            let speed = velocity.get(x, y).truncate().truncate().length();
            sum_speed += speed;
            stats.max_speed = stats.max_speed.max(speed);

            let l = velocity.fetch(ix - 1, iy).x;
            let r = velocity.fetch(ix + 1, iy).x;
            let b = velocity.fetch(ix, iy - 1).y;
            let t = velocity.fetch(ix, iy + 1).y;
            let div = (0.5 * ((r - l) + (t - b))).abs();
            sum_div += div;
            stats.max_divergence = stats.max_divergence.max(div);
        }
    }
    let cells = velocity.resolution().texel_count() as f32;
    stats.avg_speed = sum_speed / cells;
    stats.avg_divergence = sum_div / cells;
    stats
}

pub fn dye_stats(dye: &GridField) -> DyeStats {
    let mut total = 0.0f32;
    let mut covered = 0usize;
    for texel in dye.texels() {
        let rgb = texel.truncate();
        total += rgb.element_sum();
        if rgb.max_element() > DYE_FOOTPRINT_THRESHOLD {
            covered += 1;
        }
    }
    DyeStats {
        total,
        footprint: covered as f32 / dye.texels().len() as f32,
    }
}

/// Largest per-channel absolute difference, or `None` when the fields have
/// different sizes.
pub fn max_abs_difference(a: &GridField, b: &GridField) -> Option<f32> {
    if a.resolution() != b.resolution() {
        return None;
    }
    let max = a
        .texels()
        .iter()
        .zip(b.texels())
        .map(|(x, y)| (*x - *y).abs().max_element())
        .fold(0.0, f32::max);
    Some(max)
}
