//! One Jacobi iteration of the pressure Poisson equation.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec4};

use super::{SampledInput, ShaderSource, SizeSlot, Stencil};
use crate::field::{Filter, GridField};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PressureUniforms {
    pub texel_size: Vec2,
    pub _padding: [f32; 2],
}

impl PressureUniforms {
    pub fn new(texel_size: Vec2) -> Self {
        Self {
            texel_size,
            _padding: [0.0; 2],
        }
    }
}

/// `(L + R + B + T - divergence) / 4`.
pub fn run(u: &PressureUniforms, pressure: &GridField, divergence: &GridField, target: &mut GridField) {
    target.rasterize(|uv| {
        let s = Stencil::around(uv, u.texel_size);
        let l = pressure.sample(s.l).x;
        let r = pressure.sample(s.r).x;
        let t = pressure.sample(s.t).x;
        let b = pressure.sample(s.b).x;
        let div = divergence.sample(uv).x;
        Vec4::new((l + r + b + t - div) * 0.25, 0.0, 0.0, 1.0)
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
@group(0) @binding(3) var<storage, read> div_in: array<vec4<f32>>;
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
  let divergence = sample_div_in(uv).x;
  let pressure = (l + r + b + t - divergence) * 0.25;
  dst[out_index(gid.xy)] = vec4<f32>(pressure, 0.0, 0.0, 1.0);
}
"#,
    sampled: &[
        SampledInput {
            binding: "src_in",
            size: SizeSlot::Source,
            filter: Filter::Nearest,
        },
        SampledInput {
            binding: "div_in",
            size: SizeSlot::Velocity,
            filter: Filter::Nearest,
        },
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Resolution;
    use crate::passes::test_support::{assert_close, field_from_fn, uniform_field};

    #[test]
    fn test_jacobi_update() {
        let res = Resolution::new(8, 4);
        let pressure = uniform_field(res, Filter::Nearest, Vec4::new(1.0, 0.0, 0.0, 1.0));
        let divergence = uniform_field(res, Filter::Nearest, Vec4::new(0.4, 0.0, 0.0, 1.0));
        let mut target = GridField::new(res, Filter::Nearest).unwrap();

        run(&PressureUniforms::new(res.texel_size()), &pressure, &divergence, &mut target);

        for texel in target.texels() {
            assert_close(texel.x, 0.9, 1e-6);
            assert_eq!(texel.w, 1.0);
        }
    }

    #[test]
    fn test_uses_four_neighbors_not_center() {
        let res = Resolution::new(8, 8);
        let pressure = field_from_fn(res, Filter::Nearest, |x, y| {
            let v = if (x, y) == (4, 4) { 100.0 } else { 0.0 };
            Vec4::new(v, 0.0, 0.0, 1.0)
        });
        let divergence = uniform_field(res, Filter::Nearest, Vec4::ZERO);
        let mut target = GridField::new(res, Filter::Nearest).unwrap();

        run(&PressureUniforms::new(res.texel_size()), &pressure, &divergence, &mut target);

        assert_eq!(target.get(4, 4).x, 0.0);
        assert_eq!(target.get(3, 4).x, 25.0);
        assert_eq!(target.get(4, 5).x, 25.0);
        assert_eq!(target.get(5, 5).x, 0.0);
    }
}
