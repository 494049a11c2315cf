use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};

use super::{
    capabilities_for, check_capabilities, BufferDesc, BufferHandle, GfxError, GpuInit,
    GraphicsDevice, ShaderHandle, ShaderStage,
};
use crate::shader::ShaderBlob;

/// wgpu-backed [`GraphicsDevice`].
///
/// wgpu has no immediate-mode binding, so "bind" records the object in a
/// per-stage table. Draw code turns that table into bind groups and pipeline
/// stages via [`WgpuDevice::constant_layout`], [`WgpuDevice::create_bind_group`]
/// and [`WgpuDevice::bound_shader`].
pub struct WgpuDevice {
    /// Logical device.
    device: wgpu::Device,

    /// Command queue used for buffer uploads.
    queue: wgpu::Queue,

    next_id: u64,
    buffers: HashMap<BufferHandle, wgpu::Buffer>,
    shaders: HashMap<ShaderHandle, (ShaderStage, wgpu::ShaderModule)>,

    /// `(stage, slot)` → bound constant buffer.
    constant_slots: BTreeMap<(ShaderStage, u32), BufferHandle>,
    bound_shaders: HashMap<ShaderStage, ShaderHandle>,
}

impl WgpuDevice {
    /// Acquires a headless device (no surface).
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(init: GpuInit) -> Result<Self> {
        let GpuInit {
            backends,
            power_preference,
            force_fallback_adapter,
            required_features,
            required_limits,
        } = init;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: None,
                force_fallback_adapter,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        log::info!("using adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("tessel device"),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::MemoryUsage,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        Ok(Self::from_parts(device, queue))
    }

    /// Blocking variant of [`WgpuDevice::new`].
    pub fn new_blocking(init: GpuInit) -> Result<Self> {
        pollster::block_on(Self::new(init))
    }

    /// Wraps a device/queue pair owned by a larger renderer.
    pub fn from_parts(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            next_id: 1,
            buffers: HashMap::new(),
            shaders: HashMap::new(),
            constant_slots: BTreeMap::new(),
            bound_shaders: HashMap::new(),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Buffer currently bound to `slot` of `stage`.
    pub fn bound_constant_buffer(&self, stage: ShaderStage, slot: u32) -> Option<&wgpu::Buffer> {
        self.constant_slots
            .get(&(stage, slot))
            .and_then(|h| self.buffers.get(h))
    }

    /// Shader module currently bound to `stage`.
    pub fn bound_shader(&self, stage: ShaderStage) -> Option<&wgpu::ShaderModule> {
        self.bound_shaders
            .get(&stage)
            .and_then(|h| self.shaders.get(h))
            .map(|(_, module)| module)
    }

    /// Bind group layout matching the constant buffers bound to `stage`.
    ///
    /// Slots map 1:1 to `@binding` indices of group 0.
    pub fn constant_layout(&self, stage: ShaderStage) -> wgpu::BindGroupLayout {
        let entries: Vec<wgpu::BindGroupLayoutEntry> = self
            .stage_slots(stage)
            .map(|(slot, _)| wgpu::BindGroupLayoutEntry {
                binding: slot,
                visibility: stage.wgpu(),
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();

        self.device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("tessel constant buffer bgl"),
                entries: &entries,
            })
    }

    /// Bind group over every constant buffer bound to `stage`.
    pub fn create_bind_group(
        &self,
        layout: &wgpu::BindGroupLayout,
        stage: ShaderStage,
    ) -> wgpu::BindGroup {
        let entries: Vec<wgpu::BindGroupEntry<'_>> = self
            .stage_slots(stage)
            .map(|(slot, buffer)| wgpu::BindGroupEntry {
                binding: slot,
                resource: buffer.as_entire_binding(),
            })
            .collect();

        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tessel constant buffer bind group"),
            layout,
            entries: &entries,
        })
    }

    fn stage_slots(&self, stage: ShaderStage) -> impl Iterator<Item = (u32, &wgpu::Buffer)> {
        self.constant_slots
            .range((stage, 0)..=(stage, u32::MAX))
            .filter_map(|(&(_, slot), h)| self.buffers.get(h).map(|b| (slot, b)))
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl GraphicsDevice for WgpuDevice {
    fn create_constant_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferHandle, GfxError> {
        let max = u64::from(self.device.limits().max_uniform_buffer_binding_size);
        if desc.size == 0 || desc.size > max {
            return Err(GfxError::Device(format!(
                "constant buffer size {} outside 1..={max}",
                desc.size
            )));
        }

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: desc.label,
            size: desc.size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let handle = BufferHandle(self.next_id());
        self.buffers.insert(handle, buffer);
        Ok(handle)
    }

    fn destroy_buffer(&mut self, handle: BufferHandle) {
        if let Some(buffer) = self.buffers.remove(&handle) {
            buffer.destroy();
        }
        self.constant_slots.retain(|_, h| *h != handle);
    }

    fn write_buffer(&mut self, handle: BufferHandle, data: &[u8]) -> Result<(), GfxError> {
        let buffer = self
            .buffers
            .get(&handle)
            .ok_or(GfxError::UnknownHandle(handle.0))?;

        // Queue writes must be a multiple of COPY_BUFFER_ALIGNMENT.
        let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
        let padded_len = data.len().div_ceil(align) * align;
        if padded_len as u64 > buffer.size() {
            return Err(GfxError::Device(format!(
                "write of {} bytes exceeds buffer size {}",
                data.len(),
                buffer.size()
            )));
        }

        if padded_len == data.len() {
            self.queue.write_buffer(buffer, 0, data);
        } else {
            let mut padded = data.to_vec();
            padded.resize(padded_len, 0);
            self.queue.write_buffer(buffer, 0, &padded);
        }
        Ok(())
    }

    fn bind_constant_buffer(
        &mut self,
        stage: ShaderStage,
        slot: u32,
        handle: BufferHandle,
    ) -> Result<(), GfxError> {
        if !self.buffers.contains_key(&handle) {
            return Err(GfxError::UnknownHandle(handle.0));
        }
        self.constant_slots.insert((stage, slot), handle);
        Ok(())
    }

    fn shader_capabilities(&self) -> naga::valid::Capabilities {
        capabilities_for(self.device.features())
    }

    fn create_shader(&mut self, blob: &ShaderBlob) -> Result<ShaderHandle, GfxError> {
        // wgpu validates again on creation and panics on failure; a blob
        // validated within the device's capabilities passes that check.
        check_capabilities(blob, self.shader_capabilities())?;
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(blob.label()),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(blob.source())),
            });

        let handle = ShaderHandle(self.next_id());
        self.shaders.insert(handle, (blob.stage(), module));
        Ok(handle)
    }

    fn destroy_shader(&mut self, handle: ShaderHandle) {
        self.shaders.remove(&handle);
        self.bound_shaders.retain(|_, h| *h != handle);
    }

    fn bind_shader(&mut self, stage: ShaderStage, handle: ShaderHandle) -> Result<(), GfxError> {
        let (shader_stage, _) = self
            .shaders
            .get(&handle)
            .ok_or(GfxError::UnknownHandle(handle.0))?;
        if *shader_stage != stage {
            return Err(GfxError::Device(format!(
                "{shader_stage} shader cannot be bound to the {stage} stage"
            )));
        }
        self.bound_shaders.insert(stage, handle);
        Ok(())
    }
}
