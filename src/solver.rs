//! One simulation step as a fixed sequence of stages.

use glam::Vec2;

use crate::backend::Backend;
use crate::config::Config;
use crate::error::Result;
use crate::passes::{
    AdvectionUniforms, ClearUniforms, CurlUniforms, DivergenceUniforms, GradientSubtractUniforms,
    PressureUniforms, Stage, VorticityUniforms,
};

/// The configuration values a step reads, captured once per step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepParams {
    pub dt: f32,
    pub curl: f32,
    pub pressure: f32,
    pub pressure_iterations: u32,
    pub velocity_dissipation: f32,
    pub density_dissipation: f32,
}

impl StepParams {
    pub fn from_config(config: &Config, dt: f32) -> Self {
        Self {
            dt,
            curl: config.curl,
            pressure: config.pressure,
            pressure_iterations: config.pressure_iterations,
            velocity_dissipation: config.velocity_dissipation,
            density_dissipation: config.density_dissipation,
        }
    }
}

/// Stages of one step, in execution order.
///
/// curl, vorticity, divergence, pressure clear, `pressure_iterations` Jacobi
/// iterations, gradient subtract, velocity advection, dye advection. Every
/// stage uses the simulation texel size, including dye advection.
pub fn stages(params: &StepParams, sim_texel: Vec2) -> impl Iterator<Item = Stage> + use<> {
    let head = [
        Stage::Curl(CurlUniforms::new(sim_texel)),
        Stage::Vorticity(VorticityUniforms::new(sim_texel, params.curl, params.dt)),
        Stage::Divergence(DivergenceUniforms::new(sim_texel)),
        Stage::ClearPressure(ClearUniforms::new(params.pressure)),
    ];
    let jacobi = Stage::Pressure(PressureUniforms::new(sim_texel));
    let tail = [
        Stage::GradientSubtract(GradientSubtractUniforms::new(sim_texel)),
        Stage::AdvectVelocity(AdvectionUniforms::new(
            sim_texel,
            params.dt,
            params.velocity_dissipation,
        )),
        Stage::AdvectDye(AdvectionUniforms::new(
            sim_texel,
            params.dt,
            params.density_dissipation,
        )),
    ];
    head.into_iter()
        .chain(std::iter::repeat_n(jacobi, params.pressure_iterations as usize))
        .chain(tail)
}

/// [`stages`], collected.
pub fn plan(params: &StepParams, sim_texel: Vec2) -> Vec<Stage> {
    stages(params, sim_texel).collect()
}

/// Run one step on `backend`. Stages are produced lazily.
pub fn step<B: Backend + ?Sized>(backend: &mut B, params: &StepParams) -> Result<()> {
    let texel = backend.sim_resolution().texel_size();
    for stage in stages(params, texel) {
        backend.execute(&stage)?;
    }
    Ok(())
}
