//! Scalar vorticity of the velocity field.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec4};

use super::{SampledInput, ShaderSource, SizeSlot, Stencil};
use crate::field::{Filter, GridField};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct CurlUniforms {
    pub texel_size: Vec2,
    pub _padding: [f32; 2],
}

impl CurlUniforms {
    pub fn new(texel_size: Vec2) -> Self {
        Self {
            texel_size,
            _padding: [0.0; 2],
        }
    }
}

/// `0.5 * (dvy/dx - dvx/dy)` from central differences, stored in `x`.
pub fn run(u: &CurlUniforms, velocity: &GridField, target: &mut GridField) {
    target.rasterize(|uv| {
        let s = Stencil::around(uv, u.texel_size);
        let l = velocity.sample(s.l).y;
        let r = velocity.sample(s.r).y;
        let t = velocity.sample(s.t).x;
        let b = velocity.sample(s.b).x;
        let vorticity = r - l - t + b;
        Vec4::new(0.5 * vorticity, 0.0, 0.0, 1.0)
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
  let dx = vec2<f32>(params.texel_size.x, 0.0);
  let dy = vec2<f32>(0.0, params.texel_size.y);
  let l = sample_vel_in(uv - dx).y;
  let r = sample_vel_in(uv + dx).y;
  let t = sample_vel_in(uv + dy).x;
  let b = sample_vel_in(uv - dy).x;
  let vorticity = r - l - t + b;
  dst[out_index(gid.xy)] = vec4<f32>(0.5 * vorticity, 0.0, 0.0, 1.0);
}
"#,
    sampled: &[SampledInput {
        binding: "vel_in",
        size: SizeSlot::Velocity,
        filter: Filter::Linear,
    }],
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Resolution;
    use crate::passes::test_support::{assert_close, field_from_fn, uniform_field};

    #[test]
    fn test_uniform_flow_has_no_curl() {
        let res = Resolution::new(8, 8);
        let velocity = uniform_field(res, Filter::Linear, Vec4::new(3.0, -2.0, 0.0, 1.0));
        let mut curl = GridField::new(res, Filter::Nearest).unwrap();
        run(&CurlUniforms::new(res.texel_size()), &velocity, &mut curl);
        assert!(curl.texels().iter().all(|t| t.x.abs() < 1e-5 && t.w == 1.0));
    }

    #[test]
    fn test_rotation_curl() {
        // v = (-y, x) in texel units: dvy/dx = 1 and dvx/dy = -1 per texel.
        let res = Resolution::new(8, 8);
        let velocity = field_from_fn(res, Filter::Linear, |x, y| {
            Vec4::new(-(y as f32), x as f32, 0.0, 0.0)
        });
        let mut curl = GridField::new(res, Filter::Nearest).unwrap();
        run(&CurlUniforms::new(res.texel_size()), &velocity, &mut curl);

        for y in 1..7 {
            for x in 1..7 {
                assert_close(curl.get(x, y).x, 2.0, 1e-4);
            }
        }
    }
}
