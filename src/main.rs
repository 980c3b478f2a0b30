use anyhow::{Context, Result};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use splat_fluid::backend::GpuBackend;
use splat_fluid::stats::{self, VelocityStats};
use splat_fluid::{Backend, Config, Effect, FieldId, GridField, Resolution, Rgb, Surface};
use std::io::{self, Read};

#[derive(Debug, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum Request {
    Probe,
    Simulate(Scenario),
    Parity(ParityRequest),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum BackendChoice {
    #[default]
    Cpu,
    Gpu,
}

#[derive(Debug, Clone, Deserialize)]
struct Scenario {
    #[serde(default)]
    config: Config,
    #[serde(default)]
    backend: BackendChoice,
    #[serde(default = "default_steps")]
    steps: u32,
    #[serde(default = "default_dt")]
    dt: f32,
    #[serde(default = "default_seed")]
    seed: u64,
    #[serde(default)]
    surface: Option<Surface>,
    #[serde(default)]
    splats: Vec<SplatSpec>,
    #[serde(default)]
    random_splats: u32,
    #[serde(default)]
    events: Vec<InputEvent>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            config: Config::default(),
            backend: BackendChoice::default(),
            steps: default_steps(),
            dt: default_dt(),
            seed: default_seed(),
            surface: None,
            splats: Vec::new(),
            random_splats: 0,
            events: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ParityRequest {
    #[serde(flatten)]
    scenario: Scenario,
    #[serde(default = "default_tolerance")]
    tolerance: f32,
}

#[derive(Debug, Clone, Deserialize)]
struct SplatSpec {
    position: [f32; 2],
    #[serde(default)]
    velocity: [f32; 2],
    #[serde(default = "default_splat_color")]
    color: Rgb,
}

/// Scripted input, replayed in order before the timed steps.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InputEvent {
    Down {
        #[serde(default)]
        id: i32,
        x: f32,
        y: f32,
    },
    Move {
        x: f32,
        y: f32,
    },
    Up,
    Frame {
        #[serde(default = "default_dt")]
        dt: f32,
    },
}

fn default_steps() -> u32 { 60 }
fn default_dt() -> f32 { 1.0 / 60.0 }
fn default_seed() -> u64 { 1 }
fn default_tolerance() -> f32 { 1e-2 }
fn default_splat_color() -> Rgb { Rgb::new(1.0, 1.0, 1.0) }

#[derive(Debug, Serialize)]
struct ProbeResponse {
    ok: bool,
    backend: String,
    adapter: String,
    max_storage_buffer_binding_size: u64,
    elapsed_ms: f64,
}

#[derive(Debug, Serialize)]
struct SimulateResponse {
    ok: bool,
    backend: String,
    sim: Resolution,
    dye: Resolution,
    steps: u32,
    elapsed_ms: f64,
    sps: f64,
    #[serde(flatten)]
    velocity: VelocityStats,
    dye_footprint: f32,
    dye_total: f32,
}

#[derive(Debug, Serialize)]
struct ParityResponse {
    ok: bool,
    adapter: String,
    steps: u32,
    cpu_ms: f64,
    gpu_ms: f64,
    tolerance: f32,
    max_velocity_diff: f32,
    max_dye_diff: f32,
}

/// Fields read back after a scenario, with the time spent stepping.
struct Outcome {
    elapsed: f64,
    velocity: GridField,
    dye: GridField,
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        let out = serde_json::json!({"ok": false, "error": format!("{err:#}")});
        println!(
            "{}",
            serde_json::to_string_pretty(&out).unwrap_or_else(|_| "{\"ok\":false}".into())
        );
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    let req: Request = if input.trim().is_empty() {
        Request::Simulate(Scenario::default())
    } else {
        serde_json::from_str(&input).context("invalid JSON request")?
    };

    match req {
        Request::Probe => {
            let resp = probe()?;
            println!("{}", serde_json::to_string_pretty(&resp)?);
        }
        Request::Simulate(scenario) => {
            let resp = match scenario.backend {
                BackendChoice::Cpu => {
                    let effect = Effect::new(scenario.config.clone())
                        .context("cpu effect init failed")?;
                    simulate(effect, &scenario)?
                }
                BackendChoice::Gpu => {
                    let effect = Effect::new_gpu(scenario.config.clone())
                        .context("gpu effect init failed")?;
                    simulate(effect, &scenario)?
                }
            };
            println!("{}", serde_json::to_string_pretty(&resp)?);
        }
        Request::Parity(req) => {
            let resp = parity(&req)?;
            println!("{}", serde_json::to_string_pretty(&resp)?);
        }
    }

    Ok(())
}

fn probe() -> Result<ProbeResponse> {
    let t0 = std::time::Instant::now();
    let backend = GpuBackend::new_blocking(Resolution::new(64, 32), Resolution::new(64, 32))
        .context("gpu backend init failed")?;
    let info = backend.adapter_info();
    Ok(ProbeResponse {
        ok: true,
        backend: format!("{:?}/wgpu", info.backend),
        adapter: info.name.clone(),
        max_storage_buffer_binding_size: u64::from(
            backend.device().limits().max_storage_buffer_binding_size,
        ),
        elapsed_ms: t0.elapsed().as_secs_f64() * 1000.0,
    })
}

fn simulate<B: Backend>(effect: Effect<B>, scenario: &Scenario) -> Result<SimulateResponse> {
    let mut effect = effect.with_seed(scenario.seed);
    let backend = effect.backend().name().to_owned();
    let sim = effect.backend().sim_resolution();
    let dye = effect.backend().dye_resolution();

    let outcome = drive(&mut effect, scenario)?;
    effect.dispose();

    let dye_stats = stats::dye_stats(&outcome.dye);
    Ok(SimulateResponse {
        ok: true,
        backend,
        sim,
        dye,
        steps: scenario.steps,
        elapsed_ms: outcome.elapsed * 1000.0,
        sps: (scenario.steps as f64) / outcome.elapsed.max(1e-6),
        velocity: stats::velocity_stats(&outcome.velocity),
        dye_footprint: dye_stats.footprint,
        dye_total: dye_stats.total,
    })
}

fn parity(req: &ParityRequest) -> Result<ParityResponse> {
    let scenario = &req.scenario;

    let mut cpu = Effect::new(scenario.config.clone())
        .context("cpu effect init failed")?
        .with_seed(scenario.seed);
    let cpu_out = drive(&mut cpu, scenario)?;

    let mut gpu = Effect::new_gpu(scenario.config.clone())
        .context("gpu effect init failed")?
        .with_seed(scenario.seed);
    let gpu_out = drive(&mut gpu, scenario)?;
    let adapter = gpu.backend().adapter_info().name.clone();

    let max_velocity_diff = stats::max_abs_difference(&cpu_out.velocity, &gpu_out.velocity)
        .context("velocity sizes differ")?;
    let max_dye_diff =
        stats::max_abs_difference(&cpu_out.dye, &gpu_out.dye).context("dye sizes differ")?;

    Ok(ParityResponse {
        ok: max_velocity_diff <= req.tolerance && max_dye_diff <= req.tolerance,
        adapter,
        steps: scenario.steps,
        cpu_ms: cpu_out.elapsed * 1000.0,
        gpu_ms: gpu_out.elapsed * 1000.0,
        tolerance: req.tolerance,
        max_velocity_diff,
        max_dye_diff,
    })
}

fn drive<B: Backend>(effect: &mut Effect<B>, scenario: &Scenario) -> Result<Outcome> {
    if let Some(surface) = scenario.surface {
        effect.set_surface(surface);
    }
    effect.multiple_splats(scenario.random_splats)?;
    for splat in &scenario.splats {
        effect.add_splat(
            splat.color,
            Vec2::from(splat.position),
            Vec2::from(splat.velocity),
        )?;
    }
    for event in &scenario.events {
        match *event {
            InputEvent::Down { id, x, y } => effect.pointer_down(id, x, y),
            InputEvent::Move { x, y } => effect.pointer_move(x, y),
            InputEvent::Up => effect.pointer_up(),
            InputEvent::Frame { dt } => effect.update(dt)?,
        }
    }

    let t0 = std::time::Instant::now();
    for _ in 0..scenario.steps {
        effect.update(scenario.dt)?;
    }
    let velocity = effect.read_field(FieldId::Velocity)?;
    let dye = effect.read_field(FieldId::Dye)?;
    Ok(Outcome {
        elapsed: t0.elapsed().as_secs_f64(),
        velocity,
        dye,
    })
}
