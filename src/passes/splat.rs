//! Gaussian impulse added to velocity or dye.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4, Vec4Swizzles};

use super::{SampledInput, ShaderSource, SizeSlot};
use crate::field::{Filter, GridField};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SplatUniforms {
    /// Center in normalized coordinates.
    pub point: Vec2,
    pub aspect_ratio: f32,
    /// Already divided down from the configured percentage.
    pub radius: f32,
    /// `xyz` is added, `w` unused.
    pub color: Vec4,
}

impl SplatUniforms {
    pub fn new(point: Vec2, color: Vec3, radius: f32, aspect_ratio: f32) -> Self {
        Self {
            point,
            aspect_ratio,
            radius,
            color: color.extend(0.0),
        }
    }
}

/// `base.xyz + exp(-|p|^2 / radius) * color` with `p.x` stretched by the
/// aspect ratio. Alpha is written as 1.
pub fn run(u: &SplatUniforms, base: &GridField, target: &mut GridField) {
    target.rasterize(|uv| {
        let mut p = uv - u.point;
        p.x *= u.aspect_ratio;
        let splat = (-p.dot(p) / u.radius).exp() * u.color.xyz();
        (base.sample(uv).xyz() + splat).extend(1.0)
    });
}

pub(crate) const SHADER: ShaderSource = ShaderSource {
    body: r#"
struct Params {
  point: vec2<f32>,
  aspect_ratio: f32,
  radius: f32,
  color: vec4<f32>,
};
@group(0) @binding(1) var<uniform> params: Params;
@group(0) @binding(2) var<storage, read> src_in: array<vec4<f32>>;
@group(0) @binding(3) var<storage, read_write> dst: array<vec4<f32>>;

@compute @workgroup_size(8, 8, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
  if (gid.x >= grid.target_size.x || gid.y >= grid.target_size.y) { return; }
  let uv = texel_uv(gid.xy);
  var p = uv - params.point;
  p.x = p.x * params.aspect_ratio;
  let splat = exp(-dot(p, p) / params.radius) * params.color.xyz;
  let base = sample_src_in(uv).xyz;
  dst[out_index(gid.xy)] = vec4<f32>(base + splat, 1.0);
}
"#,
    sampled: &[SampledInput {
        binding: "src_in",
        size: SizeSlot::Source,
        filter: Filter::Linear,
    }],
};
