//! GPU compute backend.
//!
//! `ComputeDispatcher` drives any `ComputeDevice`: it uploads the parameter
//! block, dispatches `heightmap.wgsl` over the whole image, and reads the
//! texels back into a `HeightField`. `WgpuDevice` is the real device.

mod device;
mod dispatcher;
mod uniform;
mod wgpu_device;

#[cfg(test)]
pub(crate) mod fake;

pub use device::{
    Binding, BindingSetId, BufferId, ComputeDevice, ComputeList, DeviceError, ImageDesc, ImageId,
    ImageUsage, PipelineId, ProgramId, ProgramSource, Resource, TexelFormat,
};
pub use dispatcher::{ComputeDispatcher, ENTRY_POINT, IMAGE_SLOT, PARAMS_SLOT, PROGRAM_WGSL};
pub use uniform::{dispatch_groups, group_count, UniformBlock, UNIFORM_BLOCK_SIZE, WORKGROUP_SIZE};
pub use wgpu_device::WgpuDevice;
