//! Splat colors and the wrap-around helper used by color cycling.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Intensity applied to freshly generated pointer colors.
pub const POINTER_COLOR_SCALE: f32 = 0.15;

/// Linear RGB triple.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self::new(self.r * factor, self.g * factor, self.b * factor)
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.r, self.g, self.b)
    }
}

impl From<[f32; 3]> for Rgb {
    fn from([r, g, b]: [f32; 3]) -> Self {
        Self::new(r, g, b)
    }
}

/// Convert hue/saturation/value, each in `[0, 1]`, to RGB.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb {
    let i = (h * 6.0).floor();
    let f = h * 6.0 - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);

    match (i as i32).rem_euclid(6) {
        0 => Rgb::new(v, t, p),
        1 => Rgb::new(q, v, p),
        2 => Rgb::new(p, v, t),
        3 => Rgb::new(p, q, v),
        4 => Rgb::new(t, p, v),
        _ => Rgb::new(v, p, q),
    }
}

/// A random fully saturated hue at 15% intensity.
pub fn generate_color(rng: &mut impl Rng) -> Rgb {
    hsv_to_rgb(rng.random::<f32>(), 1.0, 1.0).scaled(POINTER_COLOR_SCALE)
}

/// Wrap `value` into `[min, max)`.
///
/// An empty range yields `min`. Values below `min` keep the sign of the
/// remainder, matching a plain `%` based wrap.
pub fn wrap(value: f32, min: f32, max: f32) -> f32 {
    let range = max - min;
    if range == 0.0 {
        return min;
    }
    (value - min) % range + min
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_wrap() {
        assert_eq!(wrap(1.5, 0.0, 1.0), 0.5);
        assert_eq!(wrap(0.25, 0.0, 1.0), 0.25);
        assert!((wrap(3.75, 1.0, 2.0) - 1.75).abs() < 1e-6);
    }

    #[test]
    fn test_wrap_degenerate_range() {
        for x in [-3.0, 0.0, 0.5, 42.0, f32::MAX] {
            assert_eq!(wrap(x, 2.0, 2.0), 2.0);
        }
        assert!(!wrap(5.0, 1.0, 1.0).is_nan());
    }

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), Rgb::new(1.0, 0.0, 0.0));
        let green = hsv_to_rgb(1.0 / 3.0, 1.0, 1.0);
        assert!(green.r.abs() < 1e-5 && (green.g - 1.0).abs() < 1e-5 && green.b.abs() < 1e-5);
        let blue = hsv_to_rgb(2.0 / 3.0, 1.0, 1.0);
        assert!(blue.r.abs() < 1e-5 && blue.g.abs() < 1e-5 && (blue.b - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hsv_zero_saturation_is_grey() {
        let c = hsv_to_rgb(0.4, 0.0, 0.6);
        assert_eq!(c, Rgb::new(0.6, 0.6, 0.6));
    }

    #[test]
    fn test_generate_color_intensity() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..64 {
            let c = generate_color(&mut rng);
            let max = c.r.max(c.g).max(c.b);
            let min = c.r.min(c.g).min(c.b);
            assert!((max - POINTER_COLOR_SCALE).abs() < 1e-6);
            assert!(min.abs() < 1e-6);
        }
    }
}
