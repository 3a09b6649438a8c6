//! GPU height-field backend: one compute dispatch per request.

use std::sync::{Mutex, PoisonError, TryLockError};
use std::time::Instant;

use super::device::{
    Binding, ComputeDevice, ComputeList, DeviceError, ImageDesc, ImageUsage, PipelineId, ProgramId,
    ProgramSource, Resource, TexelFormat,
};
use super::uniform::{dispatch_groups, UniformBlock, UNIFORM_BLOCK_SIZE};
use super::wgpu_device::WgpuDevice;
use crate::error::{Result, TerrainError};
use crate::generator::HeightFieldGenerator;
use crate::heightfield::HeightField;
use crate::params::ParameterSet;

/// WGSL source of the height-field compute program
pub const PROGRAM_WGSL: &str = include_str!("heightmap.wgsl");

pub const ENTRY_POINT: &str = "main";

/// Binding slot of the uniform block
pub const PARAMS_SLOT: u32 = 0;

/// Binding slot of the storage image
pub const IMAGE_SLOT: u32 = 1;

/// Per-call resources, freed in reverse creation order when dropped.
///
/// Dropped before the device lock is released, so no other call can observe
/// a half-released device.
struct CallScope<'a, D: ComputeDevice> {
    device: &'a mut D,
    owned: Vec<Resource>,
}

impl<'a, D: ComputeDevice> CallScope<'a, D> {
    fn new(device: &'a mut D) -> Self {
        Self {
            device,
            owned: Vec::with_capacity(3),
        }
    }

    fn track(&mut self, resource: Resource) {
        self.owned.push(resource);
    }
}

impl<D: ComputeDevice> Drop for CallScope<'_, D> {
    fn drop(&mut self) {
        while let Some(resource) = self.owned.pop() {
            self.device.free(resource);
        }
    }
}

struct ReadyState<D: ComputeDevice> {
    device: Mutex<D>,
    program: ProgramId,
    pipeline: PipelineId,
}

enum State<D: ComputeDevice> {
    Ready(ReadyState<D>),
    Disabled(String),
}

/// Generates height fields by dispatching the compute program on `D`.
///
/// The device is handed over at construction and owned until the dispatcher
/// is dropped; the program and pipeline are built once and freed once in
/// `Drop`. Only one request runs at a time. A request that arrives while
/// another is in flight fails with `TerrainError::Busy`.
///
/// If the program or pipeline cannot be built, the dispatcher is disabled
/// for good and every call returns `TerrainError::DeviceUnavailable`.
pub struct ComputeDispatcher<D: ComputeDevice> {
    state: State<D>,
}

impl<D: ComputeDevice> ComputeDispatcher<D> {
    /// Build the compute program and pipeline on `device`
    pub fn new(mut device: D) -> Self {
        let state = match Self::build_pipeline(&mut device) {
            Ok((program, pipeline)) => {
                log::info!("compute: heightmap pipeline ready");
                State::Ready(ReadyState {
                    device: Mutex::new(device),
                    program,
                    pipeline,
                })
            }
            Err(err) => {
                log::warn!("compute: disabling GPU backend, pipeline setup failed: {err}");
                State::Disabled(err.to_string())
            }
        };
        Self { state }
    }

    /// A dispatcher for a host without any compute device
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: State::Disabled(reason.into()),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    fn build_pipeline(device: &mut D) -> std::result::Result<(ProgramId, PipelineId), DeviceError> {
        let program = device.create_program(&ProgramSource {
            label: "terrainforge-heightmap",
            wgsl: PROGRAM_WGSL,
            entry_point: ENTRY_POINT,
        })?;
        match device.create_compute_pipeline(program, ENTRY_POINT) {
            Ok(pipeline) => Ok((program, pipeline)),
            Err(err) => {
                device.free(Resource::Program(program));
                Err(err)
            }
        }
    }

    /// Run one dispatch and read the field back. Blocks until the device is done.
    pub fn generate(&self, params: &ParameterSet) -> Result<HeightField> {
        params.validate()?;

        let ready = match &self.state {
            State::Ready(ready) => ready,
            State::Disabled(reason) => return Err(TerrainError::DeviceUnavailable(reason.clone())),
        };

        let mut device = match ready.device.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(TerrainError::Busy),
            Err(TryLockError::Poisoned(poisoned)) => {
                // The previous holder panicked after its resources were released.
                log::warn!("compute: recovering device lock after a panicked dispatch");
                poisoned.into_inner()
            }
        };

        let start = Instant::now();
        let field = Self::dispatch(&mut *device, ready.pipeline, params)?;
        log::debug!(
            "compute: generated {0}x{0} height field in {1:.2}ms",
            field.size(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(field)
    }

    fn dispatch(device: &mut D, pipeline: PipelineId, params: &ParameterSet) -> Result<HeightField> {
        let side = params.map_size as u32;
        let desc = ImageDesc {
            width: side,
            height: side,
            format: TexelFormat::R32Float,
            usage: ImageUsage::STORAGE | ImageUsage::UPDATE | ImageUsage::READBACK,
        };

        let mut scope = CallScope::new(device);

        let image = scope.device.create_storage_image(&desc)?;
        scope.track(Resource::Image(image));

        let buffer = scope.device.create_uniform_buffer(UNIFORM_BLOCK_SIZE as u64)?;
        scope.track(Resource::Buffer(buffer));
        scope
            .device
            .update_buffer(buffer, 0, &UniformBlock::from(params).to_le_bytes())?;

        let binding_set = scope.device.create_binding_set(
            pipeline,
            &[
                Binding::UniformBuffer {
                    slot: PARAMS_SLOT,
                    buffer,
                },
                Binding::StorageImage {
                    slot: IMAGE_SLOT,
                    image,
                },
            ],
        )?;
        scope.track(Resource::BindingSet(binding_set));

        let groups = dispatch_groups(side);
        log::debug!("compute: dispatching {groups:?} groups for {side}x{side} texels");
        scope.device.submit(&ComputeList {
            pipeline,
            binding_set,
            groups,
        })?;
        scope.device.wait_idle()?;

        let bytes = scope.device.read_image(image)?;
        let expected = desc.byte_len();
        if bytes.len() != expected {
            return Err(TerrainError::ReadbackFailure {
                expected,
                actual: bytes.len(),
            });
        }

        let values = bytes
            .chunks_exact(TexelFormat::R32Float.bytes_per_texel() as usize)
            .map(bytemuck::pod_read_unaligned::<f32>)
            .collect();
        HeightField::from_values(side as usize, values)
    }
}

impl ComputeDispatcher<WgpuDevice> {
    /// Open the default wgpu adapter, or return a disabled dispatcher if there is none
    pub fn with_default_adapter() -> Self {
        match WgpuDevice::new() {
            Ok(device) => Self::new(device),
            Err(err) => {
                log::warn!("compute: no wgpu device available: {err}");
                Self::unavailable(err.to_string())
            }
        }
    }
}

impl<D: ComputeDevice> Drop for ComputeDispatcher<D> {
    fn drop(&mut self) {
        if let State::Ready(ready) = &mut self.state {
            let device = ready.device.get_mut().unwrap_or_else(PoisonError::into_inner);
            device.free(Resource::Pipeline(ready.pipeline));
            device.free(Resource::Program(ready.program));
        }
    }
}

impl<D: ComputeDevice> HeightFieldGenerator for ComputeDispatcher<D> {
    fn generate(&self, params: &ParameterSet) -> Result<HeightField> {
        ComputeDispatcher::generate(self, params)
    }

    fn name(&self) -> &'static str {
        "gpu"
    }
}
