//! Velocity divergence with mirrored walls.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec4, Vec4Swizzles};

use super::{SampledInput, ShaderSource, SizeSlot, Stencil};
use crate::field::{Filter, GridField};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct DivergenceUniforms {
    pub texel_size: Vec2,
    pub _padding: [f32; 2],
}

impl DivergenceUniforms {
    pub fn new(texel_size: Vec2) -> Self {
        Self {
            texel_size,
            _padding: [0.0; 2],
        }
    }
}

/// `0.5 * ((R.x - L.x) + (T.y - B.y))`.
///
/// A neighbor whose coordinate leaves `[0, 1]` is replaced by the negated
/// velocity component of the center texel, so no flow crosses the walls.
pub fn run(u: &DivergenceUniforms, velocity: &GridField, target: &mut GridField) {
    target.rasterize(|uv| {
        let s = Stencil::around(uv, u.texel_size);
        let mut l = velocity.sample(s.l).x;
        let mut r = velocity.sample(s.r).x;
        let mut t = velocity.sample(s.t).y;
        let mut b = velocity.sample(s.b).y;

        let c = velocity.sample(uv).xy();
        if s.l.x < 0.0 {
            l = -c.x;
        }
        if s.r.x > 1.0 {
            r = -c.x;
        }
        if s.t.y > 1.0 {
            t = -c.y;
        }
        if s.b.y < 0.0 {
            b = -c.y;
        }

        Vec4::new(0.5 * (r - l + t - b), 0.0, 0.0, 1.0)
    });
}

pub(crate) const SHADER: ShaderSource = ShaderSource {
    body: r#"
struct Params {
  texel_size: vec2<f32>,
  _padding: vec2<f32>,
};
@group(0) @binding(1) var<uniform> params: Params;
@group(0) @binding(2) var<storage, read> vel_in: array<vec4<f32>>;
@group(0) @binding(3) var<storage, read_write> dst: array<vec4<f32>>;

@compute @workgroup_size(8, 8, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
  if (gid.x >= grid.target_size.x || gid.y >= grid.target_size.y) { return; }
  let uv = texel_uv(gid.xy);
  let vl = uv - vec2<f32>(params.texel_size.x, 0.0);
  let vr = uv + vec2<f32>(params.texel_size.x, 0.0);
  let vt = uv + vec2<f32>(0.0, params.texel_size.y);
  let vb = uv - vec2<f32>(0.0, params.texel_size.y);
  var l = sample_vel_in(vl).x;
  var r = sample_vel_in(vr).x;
  var t = sample_vel_in(vt).y;
  var b = sample_vel_in(vb).y;

  let c = sample_vel_in(uv).xy;
  if (vl.x < 0.0) { l = -c.x; }
  if (vr.x > 1.0) { r = -c.x; }
  if (vt.y > 1.0) { t = -c.y; }
  if (vb.y < 0.0) { b = -c.y; }

  dst[out_index(gid.xy)] = vec4<f32>(0.5 * (r - l + t - b), 0.0, 0.0, 1.0);
}
"#,
    sampled: &[SampledInput {
        binding: "vel_in",
        size: SizeSlot::Velocity,
        filter: Filter::Linear,
    }],
};
