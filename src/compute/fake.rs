//! In-memory `ComputeDevice` that runs the height-field program on the host.
//!
//! Every resource call is recorded in a shared `FakeLog`, so tests can check
//! bindings, dispatch geometry and that each handle is freed exactly once.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use glam::Vec2;

use super::device::{
    Binding, BindingSetId, BufferId, ComputeDevice, ComputeList, DeviceError, ImageDesc, ImageId,
    PipelineId, ProgramId, ProgramSource, Resource,
};
use super::uniform::{UniformBlock, UNIFORM_BLOCK_SIZE, WORKGROUP_SIZE};
use crate::generator::normalize_height;
use crate::noise::{NoisePrimitive, NoiseSampler};
use crate::params::ParameterSet;

/// Operation the fake should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Failure {
    CreatePipeline,
    CreateBuffer,
    BindingSet,
    Submit,
    /// Return a readback one texel short
    TruncateReadback,
}

#[derive(Debug, Default)]
pub(crate) struct FakeLog {
    pub failure: Option<Failure>,
    pub images: Vec<ImageDesc>,
    pub uniform_sizes: Vec<u64>,
    pub uploads: Vec<Vec<u8>>,
    pub bindings: Vec<Vec<Binding>>,
    pub submitted: Vec<ComputeList>,
    pub live_programs: usize,
    pub live_pipelines: usize,
    pub live_images: usize,
    pub live_buffers: usize,
    pub live_binding_sets: usize,
    pub freed_programs: usize,
    pub freed_pipelines: usize,
}

impl FakeLog {
    /// Images, buffers and binding sets still allocated
    pub fn live_per_call(&self) -> usize {
        self.live_images + self.live_buffers + self.live_binding_sets
    }

    fn fails(&self, failure: Failure) -> bool {
        self.failure == Some(failure)
    }
}

struct Gate {
    entered: Sender<()>,
    release: Receiver<()>,
}

struct FakeImage {
    desc: ImageDesc,
    texels: Vec<f32>,
}

pub(crate) struct FakeDevice {
    log: Arc<Mutex<FakeLog>>,
    next_id: u64,
    programs: HashSet<u64>,
    pipelines: HashSet<u64>,
    images: HashMap<u64, FakeImage>,
    buffers: HashMap<u64, Vec<u8>>,
    binding_sets: HashMap<u64, Vec<Binding>>,
    pending: Vec<ComputeList>,
    gate: Option<Gate>,
}

impl FakeDevice {
    pub fn new() -> (Self, Arc<Mutex<FakeLog>>) {
        let log = Arc::new(Mutex::new(FakeLog::default()));
        let device = Self {
            log: Arc::clone(&log),
            next_id: 1,
            programs: HashSet::new(),
            pipelines: HashSet::new(),
            images: HashMap::new(),
            buffers: HashMap::new(),
            binding_sets: HashMap::new(),
            pending: Vec::new(),
            gate: None,
        };
        (device, log)
    }

    /// Park the next `wait_idle` until the returned sender fires.
    ///
    /// The receiver gets a message once the call is parked.
    pub fn install_gate(&mut self) -> (Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        self.gate = Some(Gate {
            entered: entered_tx,
            release: release_rx,
        });
        (entered_rx, release_tx)
    }

    fn log(&self) -> std::sync::MutexGuard<'_, FakeLog> {
        self.log.lock().unwrap()
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Run one list the way the compute program would: one invocation per
    /// work-group lane, skipping lanes outside the image.
    fn execute(&mut self, list: &ComputeList) -> Result<(), DeviceError> {
        if !self.pipelines.contains(&list.pipeline.0) {
            return Err(DeviceError::new("unknown pipeline"));
        }
        let bindings = self
            .binding_sets
            .get(&list.binding_set.0)
            .ok_or_else(|| DeviceError::new("unknown binding set"))?
            .clone();

        let mut block = None;
        let mut target = None;
        for binding in bindings {
            match binding {
                Binding::UniformBuffer { slot: 0, buffer } => {
                    let bytes: &[u8; UNIFORM_BLOCK_SIZE] = self
                        .buffers
                        .get(&buffer.0)
                        .ok_or_else(|| DeviceError::new("unknown buffer"))?
                        .as_slice()
                        .try_into()
                        .map_err(|_| DeviceError::new("uniform buffer has the wrong size"))?;
                    block = Some(UniformBlock::from_le_bytes(bytes));
                }
                Binding::StorageImage { slot: 1, image } => target = Some(image),
                other => return Err(DeviceError::new(format!("unexpected binding {other:?}"))),
            }
        }
        let block = block.ok_or_else(|| DeviceError::new("slot 0 not bound"))?;
        let target = target.ok_or_else(|| DeviceError::new("slot 1 not bound"))?;
        let image = self
            .images
            .get_mut(&target.0)
            .ok_or_else(|| DeviceError::new("unknown image"))?;

        let (width, height) = (image.desc.width, image.desc.height);
        let params = ParameterSet {
            scale: block.scale,
            octaves: block.octaves,
            persistence: block.persistence,
            lacunarity: block.lacunarity,
            seed: block.seed,
            offset: Vec2::new(block.offset_x, block.offset_y),
            map_size: width as i32,
        };
        let sampler = NoiseSampler::new(&params, NoisePrimitive::Lattice)
            .map_err(|err| DeviceError::new(err.to_string()))?;

        let [groups_x, groups_y, groups_z] = list.groups;
        for _ in 0..groups_z {
            for y in 0..groups_y * WORKGROUP_SIZE {
                for x in 0..groups_x * WORKGROUP_SIZE {
                    if x >= width || y >= height {
                        continue;
                    }
                    let (sx, sy) = params.domain_coords(x, y);
                    image.texels[(y * width + x) as usize] = normalize_height(sampler.sample(sx, sy));
                }
            }
        }
        Ok(())
    }
}

impl ComputeDevice for FakeDevice {
    fn create_program(&mut self, source: &ProgramSource<'_>) -> Result<ProgramId, DeviceError> {
        if source.wgsl.is_empty() {
            return Err(DeviceError::new("empty program"));
        }
        let id = self.allocate_id();
        self.programs.insert(id);
        self.log().live_programs += 1;
        Ok(ProgramId(id))
    }

    fn create_compute_pipeline(
        &mut self,
        program: ProgramId,
        entry_point: &str,
    ) -> Result<PipelineId, DeviceError> {
        if self.log().fails(Failure::CreatePipeline) {
            return Err(DeviceError::new("pipeline creation failed"));
        }
        if !self.programs.contains(&program.0) || entry_point.is_empty() {
            return Err(DeviceError::new("bad program or entry point"));
        }
        let id = self.allocate_id();
        self.pipelines.insert(id);
        self.log().live_pipelines += 1;
        Ok(PipelineId(id))
    }

    fn create_storage_image(&mut self, desc: &ImageDesc) -> Result<ImageId, DeviceError> {
        let id = self.allocate_id();
        let texels = vec![f32::NAN; desc.width as usize * desc.height as usize];
        self.images.insert(id, FakeImage { desc: *desc, texels });
        let mut log = self.log();
        log.images.push(*desc);
        log.live_images += 1;
        Ok(ImageId(id))
    }

    fn create_uniform_buffer(&mut self, size: u64) -> Result<BufferId, DeviceError> {
        if self.log().fails(Failure::CreateBuffer) {
            return Err(DeviceError::new("out of buffer memory"));
        }
        let id = self.allocate_id();
        self.buffers.insert(id, vec![0; size as usize]);
        let mut log = self.log();
        log.uniform_sizes.push(size);
        log.live_buffers += 1;
        Ok(BufferId(id))
    }

    fn update_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<(), DeviceError> {
        let contents = self
            .buffers
            .get_mut(&buffer.0)
            .ok_or_else(|| DeviceError::new("unknown buffer"))?;
        let start = offset as usize;
        let end = start + data.len();
        if end > contents.len() {
            return Err(DeviceError::new("write past end of buffer"));
        }
        contents[start..end].copy_from_slice(data);
        self.log().uploads.push(data.to_vec());
        Ok(())
    }

    fn create_binding_set(
        &mut self,
        pipeline: PipelineId,
        bindings: &[Binding],
    ) -> Result<BindingSetId, DeviceError> {
        if self.log().fails(Failure::BindingSet) {
            return Err(DeviceError::new("binding set rejected"));
        }
        if !self.pipelines.contains(&pipeline.0) {
            return Err(DeviceError::new("unknown pipeline"));
        }
        let id = self.allocate_id();
        self.binding_sets.insert(id, bindings.to_vec());
        let mut log = self.log();
        log.bindings.push(bindings.to_vec());
        log.live_binding_sets += 1;
        Ok(BindingSetId(id))
    }

    fn submit(&mut self, list: &ComputeList) -> Result<(), DeviceError> {
        if self.log().fails(Failure::Submit) {
            return Err(DeviceError::new("queue submission failed"));
        }
        self.pending.push(*list);
        self.log().submitted.push(*list);
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<(), DeviceError> {
        if let Some(gate) = self.gate.take() {
            let _ = gate.entered.send(());
            let _ = gate.release.recv();
        }
        for list in std::mem::take(&mut self.pending) {
            self.execute(&list)?;
        }
        Ok(())
    }

    fn read_image(&mut self, image: ImageId) -> Result<Vec<u8>, DeviceError> {
        let image = self
            .images
            .get(&image.0)
            .ok_or_else(|| DeviceError::new("unknown image"))?;
        let mut bytes: Vec<u8> = bytemuck::cast_slice(&image.texels).to_vec();
        if self.log().fails(Failure::TruncateReadback) {
            bytes.truncate(bytes.len().saturating_sub(4));
        }
        Ok(bytes)
    }

    fn free(&mut self, resource: Resource) {
        let mut log = self.log.lock().unwrap();
        match resource {
            Resource::Program(id) => {
                assert!(self.programs.remove(&id.0), "program freed twice");
                log.live_programs -= 1;
                log.freed_programs += 1;
            }
            Resource::Pipeline(id) => {
                assert!(self.pipelines.remove(&id.0), "pipeline freed twice");
                log.live_pipelines -= 1;
                log.freed_pipelines += 1;
            }
            Resource::Image(id) => {
                assert!(self.images.remove(&id.0).is_some(), "image freed twice");
                log.live_images -= 1;
            }
            Resource::Buffer(id) => {
                assert!(self.buffers.remove(&id.0).is_some(), "buffer freed twice");
                log.live_buffers -= 1;
            }
            Resource::BindingSet(id) => {
                assert!(self.binding_sets.remove(&id.0).is_some(), "binding set freed twice");
                log.live_binding_sets -= 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::device::{ImageUsage, TexelFormat};
    use crate::compute::uniform::dispatch_groups;

    fn run(device: &mut FakeDevice, side: u32, groups: [u32; 3]) -> Vec<f32> {
        let program = device
            .create_program(&ProgramSource {
                label: "test",
                wgsl: "fn main() {}",
                entry_point: "main",
            })
            .unwrap();
        let pipeline = device.create_compute_pipeline(program, "main").unwrap();
        let image = device
            .create_storage_image(&ImageDesc {
                width: side,
                height: side,
                format: TexelFormat::R32Float,
                usage: ImageUsage::STORAGE | ImageUsage::READBACK,
            })
            .unwrap();
        let buffer = device.create_uniform_buffer(UNIFORM_BLOCK_SIZE as u64).unwrap();
        let params = ParameterSet {
            map_size: side as i32,
            scale: 4.0,
            ..Default::default()
        };
        device
            .update_buffer(buffer, 0, &UniformBlock::from(&params).to_le_bytes())
            .unwrap();
        let binding_set = device
            .create_binding_set(
                pipeline,
                &[
                    Binding::UniformBuffer { slot: 0, buffer },
                    Binding::StorageImage { slot: 1, image },
                ],
            )
            .unwrap();
        device
            .submit(&ComputeList {
                pipeline,
                binding_set,
                groups,
            })
            .unwrap();
        device.wait_idle().unwrap();
        let bytes = device.read_image(image).unwrap();
        bytes
            .chunks_exact(4)
            .map(bytemuck::pod_read_unaligned::<f32>)
            .collect()
    }

    #[test]
    fn test_short_dispatch_leaves_texels_unwritten() {
        let (mut device, _log) = FakeDevice::new();
        let texels = run(&mut device, 9, [1, 1, 1]);
        assert!(texels[8].is_nan());
        assert!(texels[9 * 8].is_nan());
        assert!(!texels[0].is_nan());
    }

    #[test]
    fn test_full_dispatch_writes_every_texel() {
        let (mut device, _log) = FakeDevice::new();
        let texels = run(&mut device, 9, dispatch_groups(9));
        assert!(texels.iter().all(|t| (0.0..=1.0).contains(t)));
    }
}
