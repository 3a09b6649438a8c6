//! `ComputeDevice` backed by a headless wgpu device.

use std::borrow::Cow;
use std::collections::HashMap;

use super::device::{
    Binding, BindingSetId, BufferId, ComputeDevice, ComputeList, DeviceError, ImageDesc, ImageId,
    ImageUsage, PipelineId, ProgramId, ProgramSource, Resource, TexelFormat,
};

/// wgpu requires `bytes_per_row` of texture copies to be a multiple of this
const COPY_ROW_ALIGNMENT: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

fn align_to(value: u32, alignment: u32) -> u32 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

fn texture_format(format: TexelFormat) -> wgpu::TextureFormat {
    match format {
        TexelFormat::R32Float => wgpu::TextureFormat::R32Float,
    }
}

fn texture_usage(usage: ImageUsage) -> wgpu::TextureUsages {
    let mut out = wgpu::TextureUsages::empty();
    if usage.contains(ImageUsage::STORAGE) {
        out |= wgpu::TextureUsages::STORAGE_BINDING;
    }
    if usage.contains(ImageUsage::UPDATE) {
        out |= wgpu::TextureUsages::COPY_DST;
    }
    if usage.contains(ImageUsage::READBACK) {
        out |= wgpu::TextureUsages::COPY_SRC;
    }
    out
}

struct StorageImage {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    desc: ImageDesc,
}

/// Headless wgpu device and the objects created through it.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    next_id: u64,
    programs: HashMap<u64, wgpu::ShaderModule>,
    pipelines: HashMap<u64, wgpu::ComputePipeline>,
    images: HashMap<u64, StorageImage>,
    buffers: HashMap<u64, wgpu::Buffer>,
    binding_sets: HashMap<u64, wgpu::BindGroup>,
}

impl WgpuDevice {
    /// Open the default high-performance adapter without a surface
    pub fn new() -> Result<Self, DeviceError> {
        pollster::block_on(Self::request())
    }

    async fn request() -> Result<Self, DeviceError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| DeviceError::new("no suitable GPU adapter found"))?;

        let info = adapter.get_info();
        log::info!("wgpu: using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("terrainforge-compute-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| DeviceError::new(format!("failed to request device: {e}")))?;

        Ok(Self::from_parts(device, queue))
    }

    /// Wrap an existing device and queue, e.g. the renderer's
    pub fn from_parts(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            next_id: 1,
            programs: HashMap::new(),
            pipelines: HashMap::new(),
            images: HashMap::new(),
            buffers: HashMap::new(),
            binding_sets: HashMap::new(),
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Run `f` inside a validation error scope and turn a captured error into `DeviceError`
    fn scoped<T>(&self, what: &str, f: impl FnOnce(&wgpu::Device) -> T) -> Result<T, DeviceError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(DeviceError::new(format!("{what}: {err}"))),
            None => Ok(value),
        }
    }
}

impl ComputeDevice for WgpuDevice {
    fn create_program(&mut self, source: &ProgramSource<'_>) -> Result<ProgramId, DeviceError> {
        let module = self.scoped("create program", |device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(source.label),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source.wgsl)),
            })
        })?;
        let id = self.allocate_id();
        self.programs.insert(id, module);
        Ok(ProgramId(id))
    }

    fn create_compute_pipeline(
        &mut self,
        program: ProgramId,
        entry_point: &str,
    ) -> Result<PipelineId, DeviceError> {
        let module = self
            .programs
            .get(&program.0)
            .ok_or_else(|| DeviceError::new(format!("unknown program {program:?}")))?;
        let pipeline = self.scoped("create compute pipeline", |device| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("terrainforge-heightmap-pipeline"),
                layout: None,
                module,
                entry_point: Some(entry_point),
                compilation_options: Default::default(),
                cache: None,
            })
        })?;
        let id = self.allocate_id();
        self.pipelines.insert(id, pipeline);
        Ok(PipelineId(id))
    }

    fn create_storage_image(&mut self, desc: &ImageDesc) -> Result<ImageId, DeviceError> {
        let format = texture_format(desc.format);
        let texture = self.scoped("create storage image", |device| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some("terrainforge-height-image"),
                size: wgpu::Extent3d {
                    width: desc.width,
                    height: desc.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: texture_usage(desc.usage),
                view_formats: &[],
            })
        })?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let id = self.allocate_id();
        self.images.insert(
            id,
            StorageImage {
                texture,
                view,
                desc: *desc,
            },
        );
        Ok(ImageId(id))
    }

    fn create_uniform_buffer(&mut self, size: u64) -> Result<BufferId, DeviceError> {
        let buffer = self.scoped("create uniform buffer", |device| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("terrainforge-params"),
                size,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        })?;
        let id = self.allocate_id();
        self.buffers.insert(id, buffer);
        Ok(BufferId(id))
    }

    fn update_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<(), DeviceError> {
        let buffer = self
            .buffers
            .get(&buffer.0)
            .ok_or_else(|| DeviceError::new(format!("unknown buffer {buffer:?}")))?;
        self.queue.write_buffer(buffer, offset, data);
        Ok(())
    }

    fn create_binding_set(
        &mut self,
        pipeline: PipelineId,
        bindings: &[Binding],
    ) -> Result<BindingSetId, DeviceError> {
        let pipeline = self
            .pipelines
            .get(&pipeline.0)
            .ok_or_else(|| DeviceError::new(format!("unknown pipeline {pipeline:?}")))?;

        let bind_group = {
            let mut entries = Vec::with_capacity(bindings.len());
            for binding in bindings {
                let entry = match *binding {
                    Binding::UniformBuffer { slot, buffer } => wgpu::BindGroupEntry {
                        binding: slot,
                        resource: self
                            .buffers
                            .get(&buffer.0)
                            .ok_or_else(|| DeviceError::new(format!("unknown buffer {buffer:?}")))?
                            .as_entire_binding(),
                    },
                    Binding::StorageImage { slot, image } => wgpu::BindGroupEntry {
                        binding: slot,
                        resource: wgpu::BindingResource::TextureView(
                            &self
                                .images
                                .get(&image.0)
                                .ok_or_else(|| DeviceError::new(format!("unknown image {image:?}")))?
                                .view,
                        ),
                    },
                };
                entries.push(entry);
            }

            let layout = pipeline.get_bind_group_layout(0);
            self.scoped("create binding set", |device| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("terrainforge-heightmap-bind-group"),
                    layout: &layout,
                    entries: &entries,
                })
            })?
        };
        let id = self.allocate_id();
        self.binding_sets.insert(id, bind_group);
        Ok(BindingSetId(id))
    }

    fn submit(&mut self, list: &ComputeList) -> Result<(), DeviceError> {
        let pipeline = self
            .pipelines
            .get(&list.pipeline.0)
            .ok_or_else(|| DeviceError::new(format!("unknown pipeline {:?}", list.pipeline)))?;
        let bind_group = self
            .binding_sets
            .get(&list.binding_set.0)
            .ok_or_else(|| DeviceError::new(format!("unknown binding set {:?}", list.binding_set)))?;

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("terrainforge-compute-encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("terrainforge-heightmap-pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            let [x, y, z] = list.groups;
            pass.dispatch_workgroups(x, y, z);
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<(), DeviceError> {
        self.device.poll(wgpu::Maintain::Wait);
        Ok(())
    }

    fn read_image(&mut self, image: ImageId) -> Result<Vec<u8>, DeviceError> {
        let image = self
            .images
            .get(&image.0)
            .ok_or_else(|| DeviceError::new(format!("unknown image {image:?}")))?;
        let ImageDesc { width, height, format, .. } = image.desc;

        let row_bytes = width * format.bytes_per_texel();
        let padded_row_bytes = align_to(row_bytes, COPY_ROW_ALIGNMENT);
        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("terrainforge-readback"),
            size: padded_row_bytes as u64 * height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("terrainforge-readback-encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &image.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &readback,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row_bytes),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        // Block until the mapping is ready.
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|_| DeviceError::new("readback mapping callback dropped"))?
            .map_err(|e| DeviceError::new(format!("readback mapping failed: {e}")))?;

        let mut out = Vec::with_capacity((row_bytes * height) as usize);
        {
            let data = slice.get_mapped_range();
            for row in data.chunks_exact(padded_row_bytes as usize) {
                out.extend_from_slice(&row[..row_bytes as usize]);
            }
        }
        readback.unmap();
        readback.destroy();
        Ok(out)
    }

    fn free(&mut self, resource: Resource) {
        match resource {
            Resource::Program(id) => {
                self.programs.remove(&id.0);
            }
            Resource::Pipeline(id) => {
                self.pipelines.remove(&id.0);
            }
            Resource::Image(id) => {
                if let Some(image) = self.images.remove(&id.0) {
                    image.texture.destroy();
                }
            }
            Resource::Buffer(id) => {
                if let Some(buffer) = self.buffers.remove(&id.0) {
                    buffer.destroy();
                }
            }
            Resource::BindingSet(id) => {
                self.binding_sets.remove(&id.0);
            }
        }
    }
}
