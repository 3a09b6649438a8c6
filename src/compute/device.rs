//! Capability surface the dispatcher needs from a compute device.
//!
//! Handles are opaque ids owned by the device. The dispatcher creates and
//! frees them explicitly; a device never frees anything on its own.

use std::ops::BitOr;

use thiserror::Error;

/// A device operation failed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("device error: {0}")]
pub struct DeviceError(pub String);

impl DeviceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

macro_rules! handle {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name(pub u64);
        )*
    };
}

handle!(
    /// Compiled compute program
    ProgramId,
    /// Compute pipeline built from a program
    PipelineId,
    /// Device-resident 2D image
    ImageId,
    /// Device-resident buffer
    BufferId,
    /// Resources bound to a pipeline's slots
    BindingSetId,
);

/// Any device object that can be freed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Program(ProgramId),
    Pipeline(PipelineId),
    Image(ImageId),
    Buffer(BufferId),
    BindingSet(BindingSetId),
}

/// Source of a compute program
#[derive(Debug, Clone, Copy)]
pub struct ProgramSource<'a> {
    pub label: &'a str,
    pub wgsl: &'a str,
    pub entry_point: &'a str,
}

/// Texel format of a storage image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexelFormat {
    /// Single-channel 32-bit float
    R32Float,
}

impl TexelFormat {
    pub fn bytes_per_texel(self) -> u32 {
        match self {
            TexelFormat::R32Float => 4,
        }
    }
}

/// Image usage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageUsage(u8);

impl ImageUsage {
    /// Written by a compute program
    pub const STORAGE: Self = Self(1);
    /// Updated from host memory
    pub const UPDATE: Self = Self(1 << 1);
    /// Copied back to host memory
    pub const READBACK: Self = Self(1 << 2);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ImageUsage {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Storage image description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDesc {
    pub width: u32,
    pub height: u32,
    pub format: TexelFormat,
    pub usage: ImageUsage,
}

impl ImageDesc {
    /// Tightly packed size of the image contents
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_texel() as usize
    }
}

/// One resource attached to a pipeline slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    UniformBuffer { slot: u32, buffer: BufferId },
    StorageImage { slot: u32, image: ImageId },
}

/// A recorded compute command sequence: bind pipeline, bind set, dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeList {
    pub pipeline: PipelineId,
    pub binding_set: BindingSetId,
    pub groups: [u32; 3],
}

/// Compute capability consumed by `ComputeDispatcher`
pub trait ComputeDevice: Send {
    fn create_program(&mut self, source: &ProgramSource<'_>) -> Result<ProgramId, DeviceError>;

    fn create_compute_pipeline(
        &mut self,
        program: ProgramId,
        entry_point: &str,
    ) -> Result<PipelineId, DeviceError>;

    fn create_storage_image(&mut self, desc: &ImageDesc) -> Result<ImageId, DeviceError>;

    fn create_uniform_buffer(&mut self, size: u64) -> Result<BufferId, DeviceError>;

    /// Copy `data` into `buffer` at `offset`
    fn update_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<(), DeviceError>;

    fn create_binding_set(
        &mut self,
        pipeline: PipelineId,
        bindings: &[Binding],
    ) -> Result<BindingSetId, DeviceError>;

    /// Record and submit one compute list
    fn submit(&mut self, list: &ComputeList) -> Result<(), DeviceError>;

    /// Block until all submitted work has completed
    fn wait_idle(&mut self) -> Result<(), DeviceError>;

    /// Tightly packed texel bytes of a storage image, row-major
    fn read_image(&mut self, image: ImageId) -> Result<Vec<u8>, DeviceError>;

    fn free(&mut self, resource: Resource);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_flags() {
        let usage = ImageUsage::STORAGE | ImageUsage::READBACK;
        assert!(usage.contains(ImageUsage::STORAGE));
        assert!(usage.contains(ImageUsage::READBACK));
        assert!(!usage.contains(ImageUsage::UPDATE));
    }

    #[test]
    fn test_image_byte_len() {
        let desc = ImageDesc {
            width: 9,
            height: 9,
            format: TexelFormat::R32Float,
            usage: ImageUsage::default(),
        };
        assert_eq!(desc.byte_len(), 9 * 9 * 4);
    }
}
