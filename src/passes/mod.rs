//! The stage passes of the solver.
//!
//! Each pass is a pure kernel over a full target domain. A pass module owns
//! its uniform block (a `#[repr(C)]` struct uploaded as-is to the GPU), the
//! CPU kernel that rasterizes it into a [`GridField`](crate::field::GridField),
//! and the WGSL compute shader that does the same on the GPU.

pub mod advection;
pub mod clear;
pub mod curl;
pub mod divergence;
pub mod gradient_subtract;
pub mod pressure;
pub mod splat;
pub mod vorticity;

use glam::Vec2;

use crate::field::Filter;

pub use advection::AdvectionUniforms;
pub use clear::ClearUniforms;
pub use curl::CurlUniforms;
pub use divergence::DivergenceUniforms;
pub use gradient_subtract::GradientSubtractUniforms;
pub use pressure::PressureUniforms;
pub use splat::SplatUniforms;
pub use vorticity::VorticityUniforms;

/// The eight distinct operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PassKind {
    Advection,
    Curl,
    Vorticity,
    Divergence,
    Clear,
    Pressure,
    GradientSubtract,
    Splat,
}

impl PassKind {
    pub const ALL: [PassKind; 8] = [
        PassKind::Advection,
        PassKind::Curl,
        PassKind::Vorticity,
        PassKind::Divergence,
        PassKind::Clear,
        PassKind::Pressure,
        PassKind::GradientSubtract,
        PassKind::Splat,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PassKind::Advection => "advection",
            PassKind::Curl => "curl",
            PassKind::Vorticity => "vorticity",
            PassKind::Divergence => "divergence",
            PassKind::Clear => "clear",
            PassKind::Pressure => "pressure",
            PassKind::GradientSubtract => "gradient-subtract",
            PassKind::Splat => "splat",
        }
    }

    pub(crate) fn shader(self) -> &'static ShaderSource {
        match self {
            PassKind::Advection => &advection::SHADER,
            PassKind::Curl => &curl::SHADER,
            PassKind::Vorticity => &vorticity::SHADER,
            PassKind::Divergence => &divergence::SHADER,
            PassKind::Clear => &clear::SHADER,
            PassKind::Pressure => &pressure::SHADER,
            PassKind::GradientSubtract => &gradient_subtract::SHADER,
            PassKind::Splat => &splat::SHADER,
        }
    }
}

/// Which field a splat is added to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SplatTarget {
    Velocity,
    Dye,
}

/// One pass invocation, routed by a backend to the fields it reads and
/// writes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Stage {
    /// velocity -> curl
    Curl(CurlUniforms),
    /// velocity, curl -> velocity (swap)
    Vorticity(VorticityUniforms),
    /// velocity -> divergence
    Divergence(DivergenceUniforms),
    /// pressure -> pressure (swap)
    ClearPressure(ClearUniforms),
    /// pressure, divergence -> pressure (swap)
    Pressure(PressureUniforms),
    /// pressure, velocity -> velocity (swap)
    GradientSubtract(GradientSubtractUniforms),
    /// velocity advected by itself (swap)
    AdvectVelocity(AdvectionUniforms),
    /// dye advected by velocity (swap)
    AdvectDye(AdvectionUniforms),
    /// target -> target (swap)
    Splat(SplatTarget, SplatUniforms),
}

impl Stage {
    pub fn kind(&self) -> PassKind {
        match self {
            Stage::Curl(_) => PassKind::Curl,
            Stage::Vorticity(_) => PassKind::Vorticity,
            Stage::Divergence(_) => PassKind::Divergence,
            Stage::ClearPressure(_) => PassKind::Clear,
            Stage::Pressure(_) => PassKind::Pressure,
            Stage::GradientSubtract(_) => PassKind::GradientSubtract,
            Stage::AdvectVelocity(_) | Stage::AdvectDye(_) => PassKind::Advection,
            Stage::Splat(..) => PassKind::Splat,
        }
    }

    /// Raw bytes of the uniform block.
    pub fn uniform_bytes(&self) -> &[u8] {
        match self {
            Stage::Curl(u) => bytemuck::bytes_of(u),
            Stage::Vorticity(u) => bytemuck::bytes_of(u),
            Stage::Divergence(u) => bytemuck::bytes_of(u),
            Stage::ClearPressure(u) => bytemuck::bytes_of(u),
            Stage::Pressure(u) => bytemuck::bytes_of(u),
            Stage::GradientSubtract(u) => bytemuck::bytes_of(u),
            Stage::AdvectVelocity(u) | Stage::AdvectDye(u) => bytemuck::bytes_of(u),
            Stage::Splat(_, u) => bytemuck::bytes_of(u),
        }
    }
}

/// The four neighbor coordinates one texel away.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Stencil {
    pub l: Vec2,
    pub r: Vec2,
    pub t: Vec2,
    pub b: Vec2,
}

impl Stencil {
    pub fn around(uv: Vec2, texel: Vec2) -> Self {
        Self {
            l: uv - Vec2::new(texel.x, 0.0),
            r: uv + Vec2::new(texel.x, 0.0),
            t: uv + Vec2::new(0.0, texel.y),
            b: uv - Vec2::new(0.0, texel.y),
        }
    }
}

/// Which domain size a sampled storage buffer has.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SizeSlot {
    Source,
    Velocity,
}

/// A storage buffer the shader samples by normalized coordinate.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SampledInput {
    pub binding: &'static str,
    pub size: SizeSlot,
    pub filter: Filter,
}

/// WGSL for one pass: its bindings and entry point, plus the inputs whose
/// sampling helpers get generated in front of it.
#[derive(Debug)]
pub(crate) struct ShaderSource {
    pub body: &'static str,
    pub sampled: &'static [SampledInput],
}

#[cfg(test)]
pub(crate) mod test_support {
    use glam::Vec4;

    use crate::field::{Filter, GridField, Resolution};

    pub fn field_from_fn(
        resolution: Resolution,
        filter: Filter,
        f: impl Fn(u32, u32) -> Vec4,
    ) -> GridField {
        let mut field = GridField::new(resolution, filter).unwrap();
        for y in 0..resolution.height {
            for x in 0..resolution.width {
                field.set(x, y, f(x, y));
            }
        }
        field
    }

    pub fn uniform_field(resolution: Resolution, filter: Filter, value: Vec4) -> GridField {
        field_from_fn(resolution, filter, |_, _| value)
    }

    pub fn assert_close(actual: f32, expected: f32, tolerance: f32) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected}, got {actual}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_kinds() {
        let advect = AdvectionUniforms::new(Vec2::ONE, 0.1, 0.2);
        assert_eq!(Stage::AdvectVelocity(advect).kind(), PassKind::Advection);
        assert_eq!(Stage::AdvectDye(advect).kind(), PassKind::Advection);
        assert_eq!(
            Stage::ClearPressure(ClearUniforms::new(0.8)).kind(),
            PassKind::Clear
        );
    }

    #[test]
    fn test_uniform_blocks_are_16_byte_multiples() {
        let stages = [
            Stage::Curl(CurlUniforms::new(Vec2::ONE)),
            Stage::Vorticity(VorticityUniforms::new(Vec2::ONE, 30.0, 0.016)),
            Stage::Divergence(DivergenceUniforms::new(Vec2::ONE)),
            Stage::ClearPressure(ClearUniforms::new(0.8)),
            Stage::Pressure(PressureUniforms::new(Vec2::ONE)),
            Stage::GradientSubtract(GradientSubtractUniforms::new(Vec2::ONE)),
            Stage::AdvectDye(AdvectionUniforms::new(Vec2::ONE, 0.016, 1.0)),
            Stage::Splat(
                SplatTarget::Dye,
                SplatUniforms::new(Vec2::splat(0.5), glam::Vec3::X, 0.005, 2.0),
            ),
        ];
        for stage in stages {
            assert_eq!(stage.uniform_bytes().len() % 16, 0, "{:?}", stage.kind());
        }
    }

    #[test]
    fn test_labels_are_unique() {
        let mut labels: Vec<_> = PassKind::ALL.iter().map(|k| k.label()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), PassKind::ALL.len());
    }
}
