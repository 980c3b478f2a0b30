//! Projection: subtract the pressure gradient from the velocity.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec4Swizzles};

use super::{SampledInput, ShaderSource, SizeSlot, Stencil};
use crate::field::{Filter, GridField};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GradientSubtractUniforms {
    pub texel_size: Vec2,
    pub _padding: [f32; 2],
}

impl GradientSubtractUniforms {
    pub fn new(texel_size: Vec2) -> Self {
        Self {
            texel_size,
            _padding: [0.0; 2],
        }
    }
}

/// `velocity -= (R - L, T - B)` over the pressure neighbors.
pub fn run(
    u: &GradientSubtractUniforms,
    pressure: &GridField,
    velocity: &GridField,
    target: &mut GridField,
) {
    target.rasterize(|uv| {
        let s = Stencil::around(uv, u.texel_size);
        let l = pressure.sample(s.l).x;
        let r = pressure.sample(s.r).x;
        let t = pressure.sample(s.t).x;
        let b = pressure.sample(s.b).x;
        let v = velocity.sample(uv).xy() - Vec2::new(r - l, t - b);
        v.extend(0.0).extend(1.0)
    });
}

pub(crate) const SHADER: ShaderSource = ShaderSource {
    body: r#"
struct Params {
  texel_size: vec2<f32>,
  _padding: vec2<f32>,
};
@group(0) @binding(1) var<uniform> params: Params;
@group(0) @binding(2) var<storage, read> src_in: array<vec4<f32>>;
@group(0) @binding(3) var<storage, read> vel_in: array<vec4<f32>>;
@group(0) @binding(4) var<storage, read_write> dst: array<vec4<f32>>;

@compute @workgroup_size(8, 8, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
  if (gid.x >= grid.target_size.x || gid.y >= grid.target_size.y) { return; }
  let uv = texel_uv(gid.xy);
  let dx = vec2<f32>(params.texel_size.x, 0.0);
  let dy = vec2<f32>(0.0, params.texel_size.y);
  let l = sample_src_in(uv - dx).x;
  let r = sample_src_in(uv + dx).x;
  let t = sample_src_in(uv + dy).x;
  let b = sample_src_in(uv - dy).x;
  let velocity = sample_vel_in(uv).xy - vec2<f32>(r - l, t - b);
  dst[out_index(gid.xy)] = vec4<f32>(velocity, 0.0, 1.0);
}
"#,
    sampled: &[
        SampledInput {
            binding: "src_in",
            size: SizeSlot::Source,
            filter: Filter::Nearest,
        },
        SampledInput {
            binding: "vel_in",
            size: SizeSlot::Velocity,
            filter: Filter::Linear,
        },
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Resolution;
    use crate::passes::test_support::{assert_close, field_from_fn, uniform_field};
    use glam::Vec4;

    #[test]
    fn test_subtracts_pressure_difference() {
        let res = Resolution::new(8, 8);
        let pressure = field_from_fn(res, Filter::Nearest, |x, y| {
            Vec4::new(x as f32 + 3.0 * y as f32, 0.0, 0.0, 1.0)
        });
        let velocity = uniform_field(res, Filter::Linear, Vec4::new(5.0, 1.0, 7.0, 7.0));
        let mut target = GridField::new(res, Filter::Linear).unwrap();

        run(
            &GradientSubtractUniforms::new(res.texel_size()),
            &pressure,
            &velocity,
            &mut target,
        );

        let v = target.get(3, 3);
        assert_close(v.x, 5.0 - 2.0, 1e-5);
        assert_close(v.y, 1.0 - 6.0, 1e-5);
        assert_eq!(v.z, 0.0);
        assert_eq!(v.w, 1.0);
    }

    #[test]
    fn test_flat_pressure_is_noop() {
        let res = Resolution::new(4, 4);
        let pressure = uniform_field(res, Filter::Nearest, Vec4::splat(9.0));
        let velocity = uniform_field(res, Filter::Linear, Vec4::new(-1.0, 2.0, 0.0, 1.0));
        let mut target = GridField::new(res, Filter::Linear).unwrap();

        run(
            &GradientSubtractUniforms::new(res.texel_size()),
            &pressure,
            &velocity,
            &mut target,
        );

        assert!(target.texels().iter().all(|t| *t == Vec4::new(-1.0, 2.0, 0.0, 1.0)));
    }
}
