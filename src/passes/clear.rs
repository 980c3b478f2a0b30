//! Pressure relaxation before the Jacobi solve.

use bytemuck::{Pod, Zeroable};

use super::{SampledInput, ShaderSource, SizeSlot};
use crate::field::{Filter, GridField};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ClearUniforms {
    /// Factor applied to the previous pressure.
    pub value: f32,
    pub _padding: [f32; 3],
}

impl ClearUniforms {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            _padding: [0.0; 3],
        }
    }
}

pub fn run(u: &ClearUniforms, source: &GridField, target: &mut GridField) {
    target.rasterize(|uv| u.value * source.sample(uv));
}

pub(crate) const SHADER: ShaderSource = ShaderSource {
    body: r#"
struct Params {
  value: f32,
  _padding0: f32,
  _padding1: f32,
  _padding2: f32,
};
@group(0) @binding(1) var<uniform> params: Params;
@group(0) @binding(2) var<storage, read> src_in: array<vec4<f32>>;
@group(0) @binding(3) var<storage, read_write> dst: array<vec4<f32>>;

@compute @workgroup_size(8, 8, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
  if (gid.x >= grid.target_size.x || gid.y >= grid.target_size.y) { return; }
  let uv = texel_uv(gid.xy);
  dst[out_index(gid.xy)] = params.value * sample_src_in(uv);
}
"#,
    sampled: &[SampledInput {
        binding: "src_in",
        size: SizeSlot::Source,
        filter: Filter::Nearest,
    }],
};
