//! Vorticity confinement.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec4Swizzles};

use super::{SampledInput, ShaderSource, SizeSlot, Stencil};
use crate::field::{Filter, GridField};

/// Added to the force length before normalizing.
pub const FORCE_EPSILON: f32 = 0.0001;

/// Every velocity component is clamped to `[-VELOCITY_LIMIT, VELOCITY_LIMIT]`.
pub const VELOCITY_LIMIT: f32 = 1000.0;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct VorticityUniforms {
    pub texel_size: Vec2,
    /// Confinement strength.
    pub curl: f32,
    pub dt: f32,
}

impl VorticityUniforms {
    pub fn new(texel_size: Vec2, curl: f32, dt: f32) -> Self {
        Self {
            texel_size,
            curl,
            dt,
        }
    }
}

/// Push velocity along the normalized gradient of `|curl|`, scaled by the
/// local curl.
pub fn run(u: &VorticityUniforms, velocity: &GridField, curl: &GridField, target: &mut GridField) {
    let limit = Vec2::splat(VELOCITY_LIMIT);
    target.rasterize(|uv| {
        let s = Stencil::around(uv, u.texel_size);
        let l = curl.sample(s.l).x;
        let r = curl.sample(s.r).x;
        let t = curl.sample(s.t).x;
        let b = curl.sample(s.b).x;
        let c = curl.sample(uv).x;

        let mut force = 0.5 * Vec2::new(t.abs() - b.abs(), r.abs() - l.abs());
        force /= force.length() + FORCE_EPSILON;
        force *= u.curl * c;
        force.y *= -1.0;

        let v = velocity.sample(uv).xy() + force * u.dt;
        v.clamp(-limit, limit).extend(0.0).extend(1.0)
    });
}

pub(crate) const SHADER: ShaderSource = ShaderSource {
    body: r#"
struct Params {
  texel_size: vec2<f32>,
  curl: f32,
  dt: f32,
};
@group(0) @binding(1) var<uniform> params: Params;
@group(0) @binding(2) var<storage, read> vel_in: array<vec4<f32>>;
@group(0) @binding(3) var<storage, read> curl_in: array<vec4<f32>>;
@group(0) @binding(4) var<storage, read_write> dst: array<vec4<f32>>;

@compute @workgroup_size(8, 8, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
  if (gid.x >= grid.target_size.x || gid.y >= grid.target_size.y) { return; }
  let uv = texel_uv(gid.xy);
  let dx = vec2<f32>(params.texel_size.x, 0.0);
  let dy = vec2<f32>(0.0, params.texel_size.y);
  let l = sample_curl_in(uv - dx).x;
  let r = sample_curl_in(uv + dx).x;
  let t = sample_curl_in(uv + dy).x;
  let b = sample_curl_in(uv - dy).x;
  let c = sample_curl_in(uv).x;

  var force = 0.5 * vec2<f32>(abs(t) - abs(b), abs(r) - abs(l));
  force = force / (length(force) + 0.0001);
  force = force * (params.curl * c);
  force.y = -force.y;

  var velocity = sample_vel_in(uv).xy;
  velocity = velocity + force * params.dt;
  velocity = clamp(velocity, vec2<f32>(-1000.0), vec2<f32>(1000.0));
  dst[out_index(gid.xy)] = vec4<f32>(velocity, 0.0, 1.0);
}
"#,
    sampled: &[
        SampledInput {
            binding: "vel_in",
            size: SizeSlot::Velocity,
            filter: Filter::Linear,
        },
        SampledInput {
            binding: "curl_in",
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
    use glam::Vec4;

    #[test]
    fn test_zero_curl_leaves_velocity() {
        let res = Resolution::new(8, 4);
        let velocity = uniform_field(res, Filter::Linear, Vec4::new(1.5, -2.5, 9.0, 9.0));
        let curl = uniform_field(res, Filter::Nearest, Vec4::ZERO);
        let mut target = GridField::new(res, Filter::Linear).unwrap();

        run(&VorticityUniforms::new(res.texel_size(), 30.0, 0.016), &velocity, &curl, &mut target);

        for texel in target.texels() {
            assert_eq!(*texel, Vec4::new(1.5, -2.5, 0.0, 1.0));
        }
    }

    #[test]
    fn test_velocity_is_clamped() {
        let res = Resolution::new(8, 4);
        let velocity = uniform_field(res, Filter::Linear, Vec4::new(5000.0, -5000.0, 0.0, 0.0));
        let curl = uniform_field(res, Filter::Nearest, Vec4::ZERO);
        let mut target = GridField::new(res, Filter::Linear).unwrap();

        run(&VorticityUniforms::new(res.texel_size(), 30.0, 0.016), &velocity, &curl, &mut target);

        assert_eq!(target.get(2, 2).x, VELOCITY_LIMIT);
        assert_eq!(target.get(2, 2).y, -VELOCITY_LIMIT);
    }

    #[test]
    fn test_force_follows_curl_gradient() {
        // |curl| grows with x, so the force points along -y after the flip.
        let res = Resolution::new(8, 8);
        let velocity = uniform_field(res, Filter::Linear, Vec4::ZERO);
        let curl = field_from_fn(res, Filter::Nearest, |x, _| {
            Vec4::new(1.0 + 0.1 * x as f32, 0.0, 0.0, 1.0)
        });
        let mut target = GridField::new(res, Filter::Linear).unwrap();

        run(&VorticityUniforms::new(res.texel_size(), 2.0, 0.5), &velocity, &curl, &mut target);

        let v = target.get(3, 4);
        let expected = -(0.1 / (0.1 + FORCE_EPSILON)) * 2.0 * 1.3 * 0.5;
        assert_close(v.x, 0.0, 1e-5);
        assert_close(v.y, expected, 1e-3);
    }
}
