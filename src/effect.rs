//! The effect controller: owns a backend, the configuration and pointer
//! state, and turns a frame tick into splats plus one solver step.

use std::time::Instant;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::backend::{Backend, CpuBackend, FieldId, GpuBackend};
use crate::color::{Rgb, generate_color, wrap};
use crate::config::Config;
use crate::error::Result;
use crate::field::GridField;
use crate::passes::{SplatTarget, SplatUniforms, Stage};
use crate::pointer::{FREE_POINTER, PointerData, Surface};
use crate::solver::{self, StepParams};

/// Upper bound on the time step of a single update, in seconds.
pub const MAX_DT: f32 = 0.016666;

/// Random splats have their color boosted by this much.
const RANDOM_SPLAT_COLOR_BOOST: f32 = 10.0;

/// Random splat velocity components fall in `[-RANDOM_SPLAT_SPEED / 2, RANDOM_SPLAT_SPEED / 2)`.
const RANDOM_SPLAT_SPEED: f32 = 1000.0;

pub struct Effect<B: Backend = CpuBackend> {
    config: Config,
    backend: B,
    surface: Surface,
    aspect_ratio: f32,
    pointers: Vec<PointerData>,
    splat_stack: Vec<u32>,
    color_update_timer: f32,
    last_update: Instant,
    rng: StdRng,
}

impl Effect<CpuBackend> {
    /// An effect simulated on the CPU.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let backend = CpuBackend::new(config.sim_size(), config.dye_size())?;
        Self::with_backend(config, backend)
    }
}

impl Effect<GpuBackend> {
    /// An effect simulated with wgpu compute shaders. Blocks on adapter and
    /// device creation.
    pub fn new_gpu(config: Config) -> Result<Self> {
        config.validate()?;
        let backend = GpuBackend::new_blocking(config.sim_size(), config.dye_size())?;
        Self::with_backend(config, backend)
    }
}

impl<B: Backend> Effect<B> {
    /// Wrap an existing backend. Its fields are reallocated if their sizes
    /// disagree with `config`.
    pub fn with_backend(config: Config, mut backend: B) -> Result<Self> {
        config.validate()?;
        let (sim, dye) = (config.sim_size(), config.dye_size());
        if backend.sim_resolution() != sim || backend.dye_resolution() != dye {
            backend.reallocate(sim, dye)?;
        }
        let surface = Surface::new(dye.width, dye.height);
        log::debug!(
            "effect on {} backend: sim {sim}, dye {dye}",
            backend.name()
        );
        Ok(Self {
            config,
            backend,
            surface,
            aspect_ratio: surface.aspect_ratio(),
            pointers: vec![PointerData::default()],
            splat_stack: Vec::new(),
            color_update_timer: 0.0,
            last_update: Instant::now(),
            rng: StdRng::from_os_rng(),
        })
    }

    /// Replace the random source with a seeded one.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Advance one frame.
    ///
    /// A `dt` that is not a positive finite number is replaced by the wall
    /// time since the previous update. Either way it is capped at [`MAX_DT`].
    pub fn update(&mut self, dt: f32) -> Result<()> {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f32();
        self.last_update = now;
        let dt = frame_dt(dt, elapsed);

        self.update_colors(dt);
        self.apply_inputs()?;

        if !self.config.paused {
            solver::step(&mut self.backend, &StepParams::from_config(&self.config, dt))?;
        }
        self.backend.finish_frame()
    }

    /// Splat `velocity` and `color` at `position` (normalized, origin
    /// bottom-left) right away.
    pub fn add_splat(&mut self, color: Rgb, position: Vec2, velocity: Vec2) -> Result<()> {
        self.splat(position, velocity, color)
    }

    /// Splat `amount` random impulses right away.
    pub fn multiple_splats(&mut self, amount: u32) -> Result<()> {
        for _ in 0..amount {
            let color = generate_color(&mut self.rng).scaled(RANDOM_SPLAT_COLOR_BOOST);
            let position = Vec2::new(self.rng.random(), self.rng.random());
            let velocity = Vec2::new(
                RANDOM_SPLAT_SPEED * (self.rng.random::<f32>() - 0.5),
                RANDOM_SPLAT_SPEED * (self.rng.random::<f32>() - 0.5),
            );
            self.splat(position, velocity, color)?;
        }
        Ok(())
    }

    /// Queue `amount` random splats for the next update. One queued batch is
    /// applied per update.
    pub fn queue_random_splats(&mut self, amount: u32) {
        self.splat_stack.push(amount);
    }

    /// Pointer press at input coordinates `(x, y)`, origin top-left.
    pub fn pointer_down(&mut self, id: i32, x: f32, y: f32) {
        if !self.accepts_events("pointer down") {
            return;
        }
        let (x, y) = self.scale(x, y);
        let color = generate_color(&mut self.rng);
        let slot = self
            .pointers
            .iter()
            .position(|p| p.id == id)
            .or_else(|| {
                self.pointers
                    .iter()
                    .position(|p| p.id == FREE_POINTER || !p.down)
            });
        let pointer = match slot {
            Some(index) => &mut self.pointers[index],
            None => {
                self.pointers.push(PointerData::default());
                let last = self.pointers.len() - 1;
                &mut self.pointers[last]
            }
        };
        pointer.press(&self.surface, id, x, y, color);
    }

    /// Move the primary pointer while it is down.
    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if !self.accepts_events("pointer move") {
            return;
        }
        let (x, y) = self.scale(x, y);
        let surface = self.surface;
        if let Some(pointer) = self.pointers.first_mut().filter(|p| p.down) {
            pointer.move_to(&surface, x, y);
        }
    }

    /// Release the primary pointer.
    pub fn pointer_up(&mut self) {
        if !self.accepts_events("pointer up") {
            return;
        }
        if let Some(pointer) = self.pointers.first_mut() {
            pointer.release();
        }
    }

    /// Handle to the committed dye field.
    pub fn texture(&self) -> &B::Texture {
        self.backend.texture()
    }

    pub fn read_field(&mut self, field: FieldId) -> Result<GridField> {
        self.backend.read_field(field)
    }

    /// Apply a new configuration. Fields are reallocated, and their contents
    /// lost, only when a resolution changes.
    pub fn set_config(&mut self, config: Config) -> Result<()> {
        config.validate()?;
        if self.config.needs_reallocation(&config) {
            log::debug!(
                "reallocating fields: sim {} -> {}, dye {} -> {}",
                self.config.sim_size(),
                config.sim_size(),
                self.config.dye_size(),
                config.dye_size()
            );
            self.backend
                .reallocate(config.sim_size(), config.dye_size())?;
        }
        self.config = config;
        Ok(())
    }

    /// Set the surface pointer input is relative to. Also resets the splat
    /// aspect ratio to the surface's.
    pub fn set_surface(&mut self, surface: Surface) {
        self.surface = surface;
        self.aspect_ratio = surface.aspect_ratio();
    }

    /// Override the width/height ratio splats are shaped with.
    pub fn set_aspect(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn pointers(&self) -> &[PointerData] {
        &self.pointers
    }

    pub fn color_update_timer(&self) -> f32 {
        self.color_update_timer
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Release the backend and its fields.
    pub fn dispose(self) {
        log::debug!("disposing effect on {} backend", self.backend.name());
    }

    fn accepts_events(&self, event: &str) -> bool {
        if !self.config.event_permission {
            log::warn!("{event} ignored: EVENT_PERMISSION is off");
        }
        self.config.event_permission
    }

    fn scale(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.surface.scale_by_pixel_ratio(x),
            self.surface.scale_by_pixel_ratio(y),
        )
    }

    fn update_colors(&mut self, dt: f32) {
        if !self.config.colorful {
            return;
        }
        self.color_update_timer += dt * self.config.color_update_speed;
        if self.color_update_timer >= 1.0 {
            self.color_update_timer = wrap(self.color_update_timer, 0.0, 1.0);
            for pointer in &mut self.pointers {
                pointer.color = generate_color(&mut self.rng);
            }
        }
    }

    fn apply_inputs(&mut self) -> Result<()> {
        if let Some(amount) = self.splat_stack.pop() {
            self.multiple_splats(amount)?;
        }

        let force = self.config.splat_force;
        let moved: Vec<_> = self
            .pointers
            .iter_mut()
            .filter_map(|p| p.take_moved().then(|| (p.texcoord, p.delta * force, p.color)))
            .collect();
        for (position, velocity, color) in moved {
            self.splat(position, velocity, color)?;
        }
        Ok(())
    }

    fn splat(&mut self, position: Vec2, velocity: Vec2, color: Rgb) -> Result<()> {
        let radius = self.config.splat_radius_uv();
        let velocity = SplatUniforms::new(position, velocity.extend(0.0), radius, self.aspect_ratio);
        self.backend
            .execute(&Stage::Splat(SplatTarget::Velocity, velocity))?;
        let dye = SplatUniforms::new(position, color.to_vec3(), radius, self.aspect_ratio);
        self.backend.execute(&Stage::Splat(SplatTarget::Dye, dye))
    }
}

impl<B: Backend + std::fmt::Debug> std::fmt::Debug for Effect<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("backend", &self.backend)
            .field("pointers", &self.pointers.len())
            .field("queued", &self.splat_stack)
            .finish_non_exhaustive()
    }
}

/// Time step for one update: `requested` when it is a positive finite
/// number, otherwise `elapsed`, capped at [`MAX_DT`].
fn frame_dt(requested: f32, elapsed: f32) -> f32 {
    let dt = if requested.is_finite() && requested > 0.0 {
        requested
    } else {
        elapsed
    };
    dt.min(MAX_DT)
}
