//! Single 2D grid fields and their sampling rules.
//!
//! A field stores RGBA `f32` texels addressed by normalized coordinates.
//! Texel `(i, j)` has its center at `((i + 0.5) / w, (j + 0.5) / h)`, and
//! every lookup wraps around the domain edges.

use glam::{UVec2, Vec2, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::{FluidError, Result};

/// Width and height of a field in texels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The resolution class used for both simulation and dye grids:
    /// the configured width, half as tall.
    pub const fn half_height(width: u32) -> Self {
        Self {
            width,
            height: width / 2,
        }
    }

    pub fn texel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Reciprocal size, the offset of exactly one texel in uv space.
    pub fn texel_size(self) -> Vec2 {
        Vec2::new(1.0 / self.width as f32, 1.0 / self.height as f32)
    }

    pub fn as_uvec2(self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    pub(crate) fn ensure_non_zero(self) -> Result<Self> {
        if self.width == 0 || self.height == 0 {
            return Err(FluidError::ZeroResolution {
                width: self.width,
                height: self.height,
            });
        }
        Ok(self)
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// How a field is filtered when sampled between texel centers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Filter {
    /// Bilinear blend of the four surrounding texels.
    Linear,
    /// The texel containing the coordinate.
    Nearest,
}

/// A 2D array of RGBA texels.
#[derive(Clone, Debug, PartialEq)]
pub struct GridField {
    resolution: Resolution,
    filter: Filter,
    texels: Vec<Vec4>,
}

impl GridField {
    /// Allocate a zero-initialized field.
    pub fn new(resolution: Resolution, filter: Filter) -> Result<Self> {
        let resolution = resolution.ensure_non_zero()?;
        let count = u64::from(resolution.width) * u64::from(resolution.height);
        let failed = || FluidError::AllocationFailed {
            resolution,
            texels: count,
        };
        let len = usize::try_from(count).map_err(|_| failed())?;
        len.checked_mul(std::mem::size_of::<Vec4>())
            .filter(|&bytes| bytes <= isize::MAX as usize)
            .ok_or_else(failed)?;

        let mut texels = Vec::new();
        texels.try_reserve_exact(len).map_err(|_| failed())?;
        texels.resize(len, Vec4::ZERO);
        Ok(Self {
            resolution,
            filter,
            texels,
        })
    }

    /// A zeroed field with the same size and filter.
    pub fn zeroed_like(&self) -> Result<Self> {
        Self::new(self.resolution, self.filter)
    }

    /// Wrap existing texel data. `texels` must hold exactly `w * h` entries.
    pub fn from_texels(resolution: Resolution, filter: Filter, texels: Vec<Vec4>) -> Result<Self> {
        let resolution = resolution.ensure_non_zero()?;
        if texels.len() != resolution.texel_count() {
            return Err(FluidError::InvalidConfig(format!(
                "{} texels supplied for a {resolution} field",
                texels.len()
            )));
        }
        Ok(Self {
            resolution,
            filter,
            texels,
        })
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn width(&self) -> u32 {
        self.resolution.width
    }

    pub fn height(&self) -> u32 {
        self.resolution.height
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn texel_size(&self) -> Vec2 {
        self.resolution.texel_size()
    }

    pub fn texels(&self) -> &[Vec4] {
        &self.texels
    }

    pub fn texels_mut(&mut self) -> &mut [Vec4] {
        &mut self.texels
    }

    /// Raw bytes, laid out exactly as the GPU storage buffers expect.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }

    pub fn get(&self, x: u32, y: u32) -> Vec4 {
        self.texels[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: Vec4) {
        let i = self.index(x, y);
        self.texels[i] = value;
    }

    pub fn fill(&mut self, value: Vec4) {
        self.texels.fill(value);
    }

    /// Center of texel `(x, y)` in uv space.
    pub fn texel_center(&self, x: u32, y: u32) -> Vec2 {
        (Vec2::new(x as f32, y as f32) + 0.5) / self.resolution.as_uvec2().as_vec2()
    }

    /// Fetch a texel by signed index, wrapping around both axes.
    pub fn fetch(&self, ix: i32, iy: i32) -> Vec4 {
        let w = self.resolution.width as i32;
        let h = self.resolution.height as i32;
        let x = ix.rem_euclid(w) as u32;
        let y = iy.rem_euclid(h) as u32;
        self.get(x, y)
    }

    /// Sample at a normalized coordinate using this field's filter.
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        match self.filter {
            Filter::Linear => self.bilerp(uv),
            Filter::Nearest => self.nearest(uv),
        }
    }

    /// Bilinear sample, blending the four texels around `uv`.
    pub fn bilerp(&self, uv: Vec2) -> Vec4 {
        let st = uv * self.resolution.as_uvec2().as_vec2() - 0.5;
        let base = st.floor();
        let f = st - base;
        let (ix, iy) = (base.x as i32, base.y as i32);

        let a = self.fetch(ix, iy);
        let b = self.fetch(ix + 1, iy);
        let c = self.fetch(ix, iy + 1);
        let d = self.fetch(ix + 1, iy + 1);

        a.lerp(b, f.x).lerp(c.lerp(d, f.x), f.y)
    }

    pub fn nearest(&self, uv: Vec2) -> Vec4 {
        let st = (uv * self.resolution.as_uvec2().as_vec2()).floor();
        self.fetch(st.x as i32, st.y as i32)
    }

    /// Run `kernel` once per texel with the texel's uv center and store the
    /// result. This is the CPU stand-in for drawing a full-screen pass.
    pub fn rasterize(&mut self, mut kernel: impl FnMut(Vec2) -> Vec4) {
        let size = self.resolution.as_uvec2().as_vec2();
        let width = self.resolution.width as usize;
        for (i, texel) in self.texels.iter_mut().enumerate() {
            let x = (i % width) as f32;
            let y = (i / width) as f32;
            *texel = kernel((Vec2::new(x, y) + 0.5) / size);
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.resolution.width as usize + x as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(resolution: Resolution, filter: Filter) -> GridField {
        let mut field = GridField::new(resolution, filter).unwrap();
        for y in 0..resolution.height {
            for x in 0..resolution.width {
                field.set(x, y, Vec4::new(x as f32, y as f32, 0.0, 1.0));
            }
        }
        field
    }

    #[test]
    fn test_zero_resolution_rejected() {
        let err = GridField::new(Resolution::new(0, 4), Filter::Linear).unwrap_err();
        assert!(matches!(err, FluidError::ZeroResolution { width: 0, height: 4 }));
    }

    #[test]
    fn test_oversized_field_is_an_error() {
        let res = Resolution::new(u32::MAX, u32::MAX / 2);
        let err = GridField::new(res, Filter::Linear).unwrap_err();
        assert!(matches!(
            err,
            FluidError::AllocationFailed { resolution, .. } if resolution == res
        ));
    }

    #[test]
    fn test_zeroed_like_keeps_size_and_filter() {
        let field = ramp(Resolution::new(4, 2), Filter::Nearest);
        let zeroed = field.zeroed_like().unwrap();
        assert_eq!(zeroed.resolution(), field.resolution());
        assert_eq!(zeroed.filter(), Filter::Nearest);
        assert!(zeroed.texels().iter().all(|t| *t == Vec4::ZERO));
    }

    #[test]
    fn test_half_height() {
        assert_eq!(Resolution::half_height(256), Resolution::new(256, 128));
        assert_eq!(Resolution::half_height(1).height, 0);
    }

    #[test]
    fn test_sample_at_texel_center_is_exact() {
        let field = ramp(Resolution::new(8, 4), Filter::Linear);
        let uv = field.texel_center(3, 2);
        let v = field.sample(uv);
        assert!((v.x - 3.0).abs() < 1e-5);
        assert!((v.y - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_bilerp_midpoint() {
        let field = ramp(Resolution::new(8, 4), Filter::Linear);
        let a = field.texel_center(2, 1);
        let b = field.texel_center(3, 1);
        let v = field.bilerp((a + b) * 0.5);
        assert!((v.x - 2.5).abs() < 1e-5);
    }

    #[test]
    fn test_fetch_wraps() {
        let field = ramp(Resolution::new(8, 4), Filter::Nearest);
        assert_eq!(field.fetch(-1, 0).x, 7.0);
        assert_eq!(field.fetch(8, 0).x, 0.0);
        assert_eq!(field.fetch(0, -1).y, 3.0);
        assert_eq!(field.fetch(0, 4).y, 0.0);
    }

    #[test]
    fn test_bilerp_wraps_across_edge() {
        let field = ramp(Resolution::new(4, 4), Filter::Linear);
        // Halfway between the last column (3) and the first (0).
        let v = field.bilerp(Vec2::new(1.0, field.texel_center(0, 1).y));
        assert!((v.x - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_nearest_picks_containing_texel() {
        let field = ramp(Resolution::new(8, 4), Filter::Nearest);
        let v = field.sample(Vec2::new(0.30, 0.80));
        assert_eq!(v.x, 2.0);
        assert_eq!(v.y, 3.0);
    }

    #[test]
    fn test_rasterize_visits_texel_centers() {
        let mut field = GridField::new(Resolution::new(4, 2), Filter::Nearest).unwrap();
        field.rasterize(|uv| Vec4::new(uv.x, uv.y, 0.0, 0.0));
        assert_eq!(field.get(0, 0).x, 0.125);
        assert_eq!(field.get(3, 1).y, 0.75);
    }

    #[test]
    fn test_from_texels_checks_length() {
        let res = Resolution::new(2, 2);
        assert!(GridField::from_texels(res, Filter::Linear, vec![Vec4::ONE; 3]).is_err());
        assert!(GridField::from_texels(res, Filter::Linear, vec![Vec4::ONE; 4]).is_ok());
    }
}
