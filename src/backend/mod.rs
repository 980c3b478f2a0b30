//! Where the stage passes run.
//!
//! A backend owns the full simulation state (velocity, dye and pressure
//! pairs plus the curl and divergence scratch fields) and routes each
//! [`Stage`] to the fields it reads and writes. [`cpu::CpuBackend`] runs the
//! kernels in `passes` directly; [`gpu::GpuBackend`] dispatches their WGSL
//! twins with wgpu.

pub mod cpu;
pub mod gpu;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::field::{GridField, Resolution};
use crate::passes::Stage;

pub use cpu::CpuBackend;
pub use gpu::GpuBackend;

/// The fields a backend holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldId {
    Velocity,
    Dye,
    Pressure,
    Divergence,
    Curl,
}

impl FieldId {
    pub fn label(self) -> &'static str {
        match self {
            FieldId::Velocity => "velocity",
            FieldId::Dye => "dye",
            FieldId::Pressure => "pressure",
            FieldId::Divergence => "divergence",
            FieldId::Curl => "curl",
        }
    }
}

pub trait Backend {
    /// Handle to the committed dye field, as consumed by a display layer.
    type Texture;

    fn name(&self) -> &str;

    fn sim_resolution(&self) -> Resolution;

    fn dye_resolution(&self) -> Resolution;

    /// Replace every field with zeroed ones at the new sizes.
    ///
    /// The new set is fully allocated before the old one is dropped; on
    /// error the backend keeps its current fields.
    fn reallocate(&mut self, sim: Resolution, dye: Resolution) -> Result<()>;

    /// Run one stage, including the swap of any pair it writes.
    fn execute(&mut self, stage: &Stage) -> Result<()>;

    /// End of frame. Work queued since the last call is flushed.
    fn finish_frame(&mut self) -> Result<()>;

    /// Copy of the committed contents of a field.
    fn read_field(&mut self, field: FieldId) -> Result<GridField>;

    /// Overwrite the committed contents of a field. `data` must have the
    /// field's resolution.
    fn load_field(&mut self, field: FieldId, data: &GridField) -> Result<()>;

    fn texture(&self) -> &Self::Texture;
}
