//! Reference backend: every pass rasterized on the CPU.

use crate::backend::{Backend, FieldId};
use crate::double_target::DoubleTarget;
use crate::error::{FluidError, Result};
use crate::field::{Filter, GridField, Resolution};
use crate::passes::{
    Stage, SplatTarget, advection, clear, curl, divergence, gradient_subtract, pressure, splat,
    vorticity,
};

#[derive(Debug)]
pub struct CpuBackend {
    velocity: DoubleTarget<GridField>,
    dye: DoubleTarget<GridField>,
    pressure: DoubleTarget<GridField>,
    divergence: GridField,
    curl: GridField,
}

impl CpuBackend {
    pub fn new(sim: Resolution, dye: Resolution) -> Result<Self> {
        log::debug!("allocating cpu fields: sim {sim}, dye {dye}");
        Ok(Self {
            velocity: DoubleTarget::new(sim, Filter::Linear)?,
            dye: DoubleTarget::new(dye, Filter::Linear)?,
            pressure: DoubleTarget::new(sim, Filter::Nearest)?,
            divergence: GridField::new(sim, Filter::Nearest)?,
            curl: GridField::new(sim, Filter::Nearest)?,
        })
    }

    pub fn velocity(&self) -> &GridField {
        self.velocity.read()
    }

    pub fn dye(&self) -> &GridField {
        self.dye.read()
    }

    pub fn pressure(&self) -> &GridField {
        self.pressure.read()
    }

    pub fn divergence(&self) -> &GridField {
        &self.divergence
    }

    pub fn curl(&self) -> &GridField {
        &self.curl
    }
}

fn commit(pair: &mut DoubleTarget<GridField>, data: &GridField) -> Result<()> {
    ensure_same_size(pair.resolution(), data)?;
    pair.write_mut().texels_mut().copy_from_slice(data.texels());
    pair.swap();
    Ok(())
}

fn ensure_same_size(expected: Resolution, data: &GridField) -> Result<()> {
    if data.resolution() != expected {
        return Err(FluidError::ResolutionMismatch {
            expected,
            actual: data.resolution(),
        });
    }
    Ok(())
}

impl Backend for CpuBackend {
    type Texture = GridField;

    fn name(&self) -> &str {
        "cpu"
    }

    fn sim_resolution(&self) -> Resolution {
        self.velocity.resolution()
    }

    fn dye_resolution(&self) -> Resolution {
        self.dye.resolution()
    }

    fn reallocate(&mut self, sim: Resolution, dye: Resolution) -> Result<()> {
        let fresh = Self::new(sim, dye)?;
        let old = std::mem::replace(self, fresh);
        old.velocity.dispose();
        old.dye.dispose();
        old.pressure.dispose();
        Ok(())
    }

    fn execute(&mut self, stage: &Stage) -> Result<()> {
        log::trace!("cpu stage {}", stage.kind().label());
        match stage {
            Stage::Curl(u) => curl::run(u, self.velocity.read(), &mut self.curl),
            Stage::Vorticity(u) => {
                let (read, write) = self.velocity.split();
                vorticity::run(u, read, &self.curl, write);
                self.velocity.swap();
            }
            Stage::Divergence(u) => {
                divergence::run(u, self.velocity.read(), &mut self.divergence)
            }
            Stage::ClearPressure(u) => {
                let (read, write) = self.pressure.split();
                clear::run(u, read, write);
                self.pressure.swap();
            }
            Stage::Pressure(u) => {
                let (read, write) = self.pressure.split();
                pressure::run(u, read, &self.divergence, write);
                self.pressure.swap();
            }
            Stage::GradientSubtract(u) => {
                let (read, write) = self.velocity.split();
                gradient_subtract::run(u, self.pressure.read(), read, write);
                self.velocity.swap();
            }
            Stage::AdvectVelocity(u) => {
                let (read, write) = self.velocity.split();
                advection::run(u, read, read, write);
                self.velocity.swap();
            }
            Stage::AdvectDye(u) => {
                let (read, write) = self.dye.split();
                advection::run(u, self.velocity.read(), read, write);
                self.dye.swap();
            }
            Stage::Splat(target, u) => {
                let pair = match target {
                    SplatTarget::Velocity => &mut self.velocity,
                    SplatTarget::Dye => &mut self.dye,
                };
                let (read, write) = pair.split();
                splat::run(u, read, write);
                pair.swap();
            }
        }
        Ok(())
    }

    fn finish_frame(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_field(&mut self, field: FieldId) -> Result<GridField> {
        Ok(match field {
            FieldId::Velocity => self.velocity.read().clone(),
            FieldId::Dye => self.dye.read().clone(),
            FieldId::Pressure => self.pressure.read().clone(),
            FieldId::Divergence => self.divergence.clone(),
            FieldId::Curl => self.curl.clone(),
        })
    }

    fn load_field(&mut self, field: FieldId, data: &GridField) -> Result<()> {
        match field {
            FieldId::Velocity => commit(&mut self.velocity, data),
            FieldId::Dye => commit(&mut self.dye, data),
            FieldId::Pressure => commit(&mut self.pressure, data),
            FieldId::Divergence => {
                ensure_same_size(self.divergence.resolution(), data)?;
                self.divergence.texels_mut().copy_from_slice(data.texels());
                Ok(())
            }
            FieldId::Curl => {
                ensure_same_size(self.curl.resolution(), data)?;
                self.curl.texels_mut().copy_from_slice(data.texels());
                Ok(())
            }
        }
    }

    fn texture(&self) -> &GridField {
        self.dye.read()
    }
}
