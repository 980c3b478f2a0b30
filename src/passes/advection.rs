//! Semi-Lagrangian advection with dissipation.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec4Swizzles};

use super::{SampledInput, ShaderSource, SizeSlot};
use crate::field::{Filter, GridField};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct AdvectionUniforms {
    /// Texel size of the velocity field; scales the back-trace.
    pub texel_size: Vec2,
    pub dt: f32,
    pub dissipation: f32,
}

impl AdvectionUniforms {
    pub fn new(texel_size: Vec2, dt: f32, dissipation: f32) -> Self {
        Self {
            texel_size,
            dt,
            dissipation,
        }
    }
}

/// Trace each target texel back along `velocity` and sample `source` there,
/// decayed by `1 + dissipation * dt`.
///
/// `source` may be `velocity` itself.
pub fn run(u: &AdvectionUniforms, velocity: &GridField, source: &GridField, target: &mut GridField) {
    let decay = 1.0 + u.dissipation * u.dt;
    target.rasterize(|uv| {
        let coord = uv - u.dt * velocity.sample(uv).xy() * u.texel_size;
        source.sample(coord) / decay
    });
}

pub(crate) const SHADER: ShaderSource = ShaderSource {
    body: r#"
struct Params {
  texel_size: vec2<f32>,
  dt: f32,
  dissipation: f32,
};
@group(0) @binding(1) var<uniform> params: Params;
@group(0) @binding(2) var<storage, read> vel_in: array<vec4<f32>>;
@group(0) @binding(3) var<storage, read> src_in: array<vec4<f32>>;
@group(0) @binding(4) var<storage, read_write> dst: array<vec4<f32>>;

@compute @workgroup_size(8, 8, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
  if (gid.x >= grid.target_size.x || gid.y >= grid.target_size.y) { return; }
  let uv = texel_uv(gid.xy);
  let coord = uv - params.dt * sample_vel_in(uv).xy * params.texel_size;
  let decay = 1.0 + params.dissipation * params.dt;
  dst[out_index(gid.xy)] = sample_src_in(coord) / decay;
}
"#,
    sampled: &[
        SampledInput {
            binding: "vel_in",
            size: SizeSlot::Velocity,
            filter: Filter::Linear,
        },
        SampledInput {
            binding: "src_in",
            size: SizeSlot::Source,
            filter: Filter::Linear,
        },
    ],
};
