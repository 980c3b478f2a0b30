//! wgpu compute backend.
//!
//! Fields live in storage buffers of `vec4<f32>`, one per texel, row-major.
//! Each pass shader is the pass body from `passes` with a shared prelude and
//! generated sampling helpers prepended, so the WGSL samples with the same
//! wrap and filter rules as [`GridField::sample`].
//!
//! Stages are recorded into one command encoder and submitted by
//! [`Backend::finish_frame`] or before any readback.

use bytemuck::{Pod, Zeroable};
use glam::{UVec2, Vec4};
use wgpu::util::DeviceExt;

use crate::backend::{Backend, FieldId};
use crate::double_target::DoubleTarget;
use crate::error::{FluidError, Result};
use crate::field::{Filter, GridField, Resolution};
use crate::passes::{PassKind, SampledInput, ShaderSource, SizeSlot, SplatTarget, Stage};

const TEXEL_BYTES: u64 = std::mem::size_of::<Vec4>() as u64;

const PRELUDE: &str = r#"
struct Grid {
  target_size: vec2<u32>,
  source_size: vec2<u32>,
  velocity_size: vec2<u32>,
  _pad: vec2<u32>,
};
@group(0) @binding(0) var<uniform> grid: Grid;

fn texel_uv(id: vec2<u32>) -> vec2<f32> {
  return (vec2<f32>(id) + vec2<f32>(0.5, 0.5)) / vec2<f32>(grid.target_size);
}
fn out_index(id: vec2<u32>) -> u32 { return id.y * grid.target_size.x + id.x; }
fn wrap_index(i: i32, n: i32) -> i32 { return ((i % n) + n) % n; }
"#;

/// Sizes every pass shader sees at binding 0.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct GridUniforms {
    target_size: UVec2,
    source_size: UVec2,
    velocity_size: UVec2,
    _pad: UVec2,
}

/// One field in a storage buffer.
#[derive(Debug)]
pub struct GpuField {
    buffer: wgpu::Buffer,
    resolution: Resolution,
}

impl GpuField {
    fn new(device: &wgpu::Device, label: &str, resolution: Resolution) -> Result<Self> {
        let resolution = resolution.ensure_non_zero()?;
        let bytes = resolution.texel_count() as u64 * TEXEL_BYTES;
        let limit = u64::from(device.limits().max_storage_buffer_binding_size);
        if bytes > limit {
            return Err(FluidError::FieldTooLarge { bytes, limit });
        }
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: bytes,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(Self { buffer, resolution })
    }

    fn pair(device: &wgpu::Device, label: &str, resolution: Resolution) -> Result<DoubleTarget<Self>> {
        let first = Self::new(device, &format!("{label}-a"), resolution)?;
        let second = Self::new(device, &format!("{label}-b"), resolution)?;
        Ok(DoubleTarget::from_pair(first, second, resolution))
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn size_bytes(&self) -> u64 {
        self.resolution.texel_count() as u64 * TEXEL_BYTES
    }
}

#[derive(Debug)]
struct GpuFields {
    velocity: DoubleTarget<GpuField>,
    dye: DoubleTarget<GpuField>,
    pressure: DoubleTarget<GpuField>,
    divergence: GpuField,
    curl: GpuField,
}

impl GpuFields {
    fn new(device: &wgpu::Device, sim: Resolution, dye: Resolution) -> Result<Self> {
        log::debug!("allocating gpu fields: sim {sim}, dye {dye}");
        Ok(Self {
            velocity: GpuField::pair(device, "velocity", sim)?,
            dye: GpuField::pair(device, "dye", dye)?,
            pressure: GpuField::pair(device, "pressure", sim)?,
            divergence: GpuField::new(device, "divergence", sim)?,
            curl: GpuField::new(device, "curl", sim)?,
        })
    }

    fn committed(&self, field: FieldId) -> &GpuField {
        match field {
            FieldId::Velocity => self.velocity.read(),
            FieldId::Dye => self.dye.read(),
            FieldId::Pressure => self.pressure.read(),
            FieldId::Divergence => &self.divergence,
            FieldId::Curl => &self.curl,
        }
    }
}

pub struct GpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_info: wgpu::AdapterInfo,
    pipelines: [wgpu::ComputePipeline; 8],
    fields: GpuFields,
    encoder: Option<wgpu::CommandEncoder>,
}

impl GpuBackend {
    pub async fn new(sim: Resolution, dye: Resolution) -> Result<Self> {
        let (device, queue, adapter_info) = create_device().await?;
        let pipelines = PassKind::ALL.map(|kind| mk_pipeline(&device, kind));
        let fields = GpuFields::new(&device, sim, dye)?;
        Ok(Self {
            device,
            queue,
            adapter_info,
            pipelines,
            fields,
            encoder: None,
        })
    }

    pub fn new_blocking(sim: Resolution, dye: Resolution) -> Result<Self> {
        pollster::block_on(Self::new(sim, dye))
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    fn flush(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(Some(encoder.finish()));
        }
    }
}

impl std::fmt::Debug for GpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuBackend")
            .field("adapter", &self.adapter_info.name)
            .field("fields", &self.fields)
            .field("pending", &self.encoder.is_some())
            .finish()
    }
}

/// Borrowed state needed to record one dispatch.
struct Recorder<'a> {
    device: &'a wgpu::Device,
    pipelines: &'a [wgpu::ComputePipeline],
    encoder: &'a mut wgpu::CommandEncoder,
    velocity_size: Resolution,
}

impl Recorder<'_> {
    /// `inputs` line up with the shader's storage bindings from 2 on; the
    /// output goes to the binding after the last input.
    fn dispatch(&mut self, stage: &Stage, inputs: &[&GpuField], output: &GpuField) {
        let kind = stage.kind();
        let shader = kind.shader();
        let source_size = shader
            .sampled
            .iter()
            .zip(inputs)
            .find(|(input, _)| input.size == SizeSlot::Source)
            .map_or(output.resolution, |(_, field)| field.resolution);

        let grid = GridUniforms {
            target_size: output.resolution.as_uvec2(),
            source_size: source_size.as_uvec2(),
            velocity_size: self.velocity_size.as_uvec2(),
            _pad: UVec2::ZERO,
        };
        // One buffer per dispatch. A queue write would be visible to every
        // dispatch already recorded in this encoder.
        let grid_buf = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("grid"),
            contents: bytemuck::bytes_of(&grid),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let params_buf = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(kind.label()),
            contents: stage.uniform_bytes(),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: grid_buf.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: params_buf.as_entire_binding(),
            },
        ];
        for (binding, field) in (2..).zip(inputs.iter().chain(std::iter::once(&output))) {
            entries.push(wgpu::BindGroupEntry {
                binding,
                resource: field.buffer.as_entire_binding(),
            });
        }

        let pipeline = &self.pipelines[kind as usize];
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(kind.label()),
            layout: &pipeline.get_bind_group_layout(0),
            entries: &entries,
        });

        let mut pass = self.encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(kind.label()),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(
            output.resolution.width.div_ceil(8),
            output.resolution.height.div_ceil(8),
            1,
        );
    }
}

impl Backend for GpuBackend {
    type Texture = GpuField;

    fn name(&self) -> &str {
        "gpu"
    }

    fn sim_resolution(&self) -> Resolution {
        self.fields.velocity.resolution()
    }

    fn dye_resolution(&self) -> Resolution {
        self.fields.dye.resolution()
    }

    fn reallocate(&mut self, sim: Resolution, dye: Resolution) -> Result<()> {
        self.flush();
        let fresh = GpuFields::new(&self.device, sim, dye)?;
        let old = std::mem::replace(&mut self.fields, fresh);
        old.velocity.dispose();
        old.dye.dispose();
        old.pressure.dispose();
        Ok(())
    }

    fn execute(&mut self, stage: &Stage) -> Result<()> {
        log::trace!("gpu stage {}", stage.kind().label());
        let Self {
            device,
            pipelines,
            fields,
            encoder,
            ..
        } = self;
        let encoder = encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("fluid-frame"),
            })
        });
        let mut rec = Recorder {
            device,
            pipelines,
            encoder,
            velocity_size: fields.velocity.resolution(),
        };

        match stage {
            Stage::Curl(_) => rec.dispatch(stage, &[fields.velocity.read()], &fields.curl),
            Stage::Vorticity(_) => {
                rec.dispatch(
                    stage,
                    &[fields.velocity.read(), &fields.curl],
                    fields.velocity.write(),
                );
                fields.velocity.swap();
            }
            Stage::Divergence(_) => {
                rec.dispatch(stage, &[fields.velocity.read()], &fields.divergence)
            }
            Stage::ClearPressure(_) => {
                rec.dispatch(stage, &[fields.pressure.read()], fields.pressure.write());
                fields.pressure.swap();
            }
            Stage::Pressure(_) => {
                rec.dispatch(
                    stage,
                    &[fields.pressure.read(), &fields.divergence],
                    fields.pressure.write(),
                );
                fields.pressure.swap();
            }
            Stage::GradientSubtract(_) => {
                rec.dispatch(
                    stage,
                    &[fields.pressure.read(), fields.velocity.read()],
                    fields.velocity.write(),
                );
                fields.velocity.swap();
            }
            Stage::AdvectVelocity(_) => {
                rec.dispatch(
                    stage,
                    &[fields.velocity.read(), fields.velocity.read()],
                    fields.velocity.write(),
                );
                fields.velocity.swap();
            }
            Stage::AdvectDye(_) => {
                rec.dispatch(
                    stage,
                    &[fields.velocity.read(), fields.dye.read()],
                    fields.dye.write(),
                );
                fields.dye.swap();
            }
            Stage::Splat(target, _) => {
                let pair = match target {
                    SplatTarget::Velocity => &mut fields.velocity,
                    SplatTarget::Dye => &mut fields.dye,
                };
                rec.dispatch(stage, &[pair.read()], pair.write());
                pair.swap();
            }
        }
        Ok(())
    }

    fn finish_frame(&mut self) -> Result<()> {
        self.flush();
        Ok(())
    }

    fn read_field(&mut self, field: FieldId) -> Result<GridField> {
        self.flush();
        let source = self.fields.committed(field);
        let bytes = source.size_bytes();
        let resolution = source.resolution;

        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback"),
            size: bytes,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        encoder.copy_buffer_to_buffer(&source.buffer, 0, &readback, 0, bytes);
        self.queue.submit(Some(encoder.finish()));

        let slice = readback.slice(..);
        map_wait(&self.device, &slice)?;
        let texels = {
            let mapped = slice.get_mapped_range();
            let floats: &[f32] = bytemuck::cast_slice(&mapped);
            floats.chunks_exact(4).map(Vec4::from_slice).collect()
        };
        readback.unmap();

        let filter = match field {
            FieldId::Velocity | FieldId::Dye => Filter::Linear,
            FieldId::Pressure | FieldId::Divergence | FieldId::Curl => Filter::Nearest,
        };
        GridField::from_texels(resolution, filter, texels)
    }

    fn load_field(&mut self, field: FieldId, data: &GridField) -> Result<()> {
        self.flush();
        let target = self.fields.committed(field);
        if data.resolution() != target.resolution {
            return Err(FluidError::ResolutionMismatch {
                expected: target.resolution,
                actual: data.resolution(),
            });
        }
        self.queue.write_buffer(&target.buffer, 0, data.as_bytes());
        Ok(())
    }

    fn texture(&self) -> &GpuField {
        self.fields.dye.read()
    }
}

async fn create_device() -> Result<(wgpu::Device, wgpu::Queue, wgpu::AdapterInfo)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    });
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions::default())
        .await?;
    let info = adapter.get_info();
    log::info!("gpu adapter: {} ({:?})", info.name, info.backend);

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor::default())
        .await?;
    Ok((device, queue, info))
}

fn mk_pipeline(device: &wgpu::Device, kind: PassKind) -> wgpu::ComputePipeline {
    let wgsl = compose_shader(kind.shader());
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(kind.label()),
        source: wgpu::ShaderSource::Wgsl(wgsl.into()),
    });
    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(kind.label()),
        layout: None,
        module: &shader,
        entry_point: Some("main"),
        compilation_options: wgpu::PipelineCompilationOptions::default(),
        cache: None,
    })
}

/// Prelude, then `fetch_*`/`sample_*` for every sampled input, then the body.
pub(crate) fn compose_shader(source: &ShaderSource) -> String {
    let mut wgsl = String::from(PRELUDE);
    for input in source.sampled {
        wgsl.push_str(&sampling_helpers(input));
    }
    wgsl.push_str(source.body);
    wgsl
}

fn sampling_helpers(input: &SampledInput) -> String {
    let name = input.binding;
    let size = match input.size {
        SizeSlot::Source => "grid.source_size",
        SizeSlot::Velocity => "grid.velocity_size",
    };
    let sample = match input.filter {
        Filter::Linear => format!(
            r#"
fn sample_{name}(uv: vec2<f32>) -> vec4<f32> {{
  let st = uv * vec2<f32>({size}) - vec2<f32>(0.5, 0.5);
  let base = floor(st);
  let f = st - base;
  let ix = i32(base.x);
  let iy = i32(base.y);
  let a = fetch_{name}(ix, iy);
  let b = fetch_{name}(ix + 1, iy);
  let c = fetch_{name}(ix, iy + 1);
  let d = fetch_{name}(ix + 1, iy + 1);
  return mix(mix(a, b, f.x), mix(c, d, f.x), f.y);
}}
"#
        ),
        Filter::Nearest => format!(
            r#"
fn sample_{name}(uv: vec2<f32>) -> vec4<f32> {{
  let st = floor(uv * vec2<f32>({size}));
  return fetch_{name}(i32(st.x), i32(st.y));
}}
"#
        ),
    };
    format!(
        r#"
fn fetch_{name}(ix: i32, iy: i32) -> vec4<f32> {{
  let size = vec2<i32>({size});
  let x = wrap_index(ix, size.x);
  let y = wrap_index(iy, size.y);
  return {name}[u32(y * size.x + x)];
}}
{sample}"#
    )
}

fn map_wait(device: &wgpu::Device, slice: &wgpu::BufferSlice<'_>) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |r| {
        let _ = tx.send(r);
    });
    let _ = device.poll(wgpu::PollType::wait_indefinitely());
    rx.recv().map_err(|_| FluidError::ReadbackChannelClosed)??;
    Ok(())
}
