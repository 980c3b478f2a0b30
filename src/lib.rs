//! Real-time 2D stable-fluids simulation.
//!
//! Velocity and dye live on ping-ponged grids. Each frame, pending splats
//! are added and one step runs: vorticity confinement, a Jacobi pressure
//! projection and semi-Lagrangian advection. The committed dye field is the
//! output a display layer draws.
//!
//! [`Effect`] is the entry point. It runs on a [`CpuBackend`] by default, or
//! on a [`GpuBackend`] that dispatches the same passes as wgpu compute
//! shaders.
//!
//! ```no_run
//! use glam::Vec2;
//! use splat_fluid::{Config, Effect, Rgb};
//!
//! let mut effect = Effect::new(Config::default())?;
//! effect.add_splat(Rgb::new(1.0, 0.2, 0.0), Vec2::new(0.5, 0.5), Vec2::new(500.0, 0.0))?;
//! effect.update(1.0 / 60.0)?;
//! let dye = effect.texture();
//! # let _ = dye;
//! # Ok::<(), splat_fluid::FluidError>(())
//! ```

pub mod backend;
pub mod color;
pub mod config;
pub mod double_target;
pub mod effect;
pub mod error;
pub mod field;
pub mod passes;
pub mod pointer;
pub mod solver;
pub mod stats;

pub use backend::{Backend, CpuBackend, FieldId, GpuBackend};
pub use color::Rgb;
pub use config::Config;
pub use double_target::DoubleTarget;
pub use effect::Effect;
pub use error::{FluidError, Result};
pub use field::{Filter, GridField, Resolution};
pub use passes::{PassKind, SplatTarget, Stage};
pub use pointer::{PointerData, Surface};
pub use solver::StepParams;
