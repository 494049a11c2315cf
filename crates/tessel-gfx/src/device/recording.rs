use std::collections::{BTreeMap, HashMap};

use super::{
    capabilities_for, check_capabilities, BufferDesc, BufferHandle, GfxError,
    GraphicsDevice, ShaderHandle, ShaderStage,
};
use crate::shader::ShaderBlob;

/// One call observed by a [`RecordingDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    CreateBuffer(BufferHandle),
    DestroyBuffer(BufferHandle),
    WriteBuffer(BufferHandle),
    BindConstantBuffer {
        stage: ShaderStage,
        slot: u32,
        handle: BufferHandle,
    },
    CreateShader(ShaderHandle),
    DestroyShader(ShaderHandle),
    BindShader {
        stage: ShaderStage,
        handle: ShaderHandle,
    },
}

/// What a draw issued right now would see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawSnapshot {
    /// Contents of every bound constant buffer, keyed by `(stage, slot)`.
    pub constant_buffers: BTreeMap<(ShaderStage, u32), Vec<u8>>,
    /// Source hash of the shader bound to each stage.
    pub shaders: BTreeMap<ShaderStage, u64>,
}

#[derive(Debug)]
struct FakeBuffer {
    label: Option<String>,
    contents: Vec<u8>,
}

#[derive(Debug)]
struct FakeShader {
    stage: ShaderStage,
    source_hash: u64,
}

/// In-memory [`GraphicsDevice`] that records every call.
///
/// Creation failures can be injected to exercise error paths.
#[derive(Debug)]
pub struct RecordingDevice {
    next_id: u64,
    buffers: HashMap<BufferHandle, FakeBuffer>,
    shaders: HashMap<ShaderHandle, FakeShader>,
    constant_slots: BTreeMap<(ShaderStage, u32), BufferHandle>,
    bound_shaders: BTreeMap<ShaderStage, ShaderHandle>,
    calls: Vec<DeviceCall>,
    fail_buffers: bool,
    fail_shaders: bool,
    features: wgpu::Features,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self {
            next_id: 0,
            buffers: HashMap::new(),
            shaders: HashMap::new(),
            constant_slots: BTreeMap::new(),
            bound_shaders: BTreeMap::new(),
            calls: Vec::new(),
            fail_buffers: false,
            fail_shaders: false,
            features: wgpu::Features::empty(),
        }
    }
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretends the device exposes `features` (none by default).
    pub fn set_features(&mut self, features: wgpu::Features) {
        self.features = features;
    }

    /// Makes every subsequent buffer creation fail.
    pub fn fail_buffer_creation(&mut self, fail: bool) {
        self.fail_buffers = fail;
    }

    /// Makes every subsequent shader creation fail.
    pub fn fail_shader_creation(&mut self, fail: bool) {
        self.fail_shaders = fail;
    }

    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of buffers currently alive.
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Number of shader objects currently alive.
    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    pub fn buffer_contents(&self, handle: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&handle).map(|b| b.contents.as_slice())
    }

    pub fn buffer_label(&self, handle: BufferHandle) -> Option<&str> {
        self.buffers.get(&handle).and_then(|b| b.label.as_deref())
    }

    pub fn bound_constant_buffer(&self, stage: ShaderStage, slot: u32) -> Option<BufferHandle> {
        self.constant_slots.get(&(stage, slot)).copied()
    }

    pub fn bound_shader(&self, stage: ShaderStage) -> Option<ShaderHandle> {
        self.bound_shaders.get(&stage).copied()
    }

    /// Captures the state a draw call would consume.
    pub fn draw(&self) -> DrawSnapshot {
        let constant_buffers = self
            .constant_slots
            .iter()
            .filter_map(|(&key, h)| self.buffers.get(h).map(|b| (key, b.contents.clone())))
            .collect();
        let shaders = self
            .bound_shaders
            .iter()
            .filter_map(|(&stage, h)| self.shaders.get(h).map(|s| (stage, s.source_hash)))
            .collect();
        DrawSnapshot {
            constant_buffers,
            shaders,
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl GraphicsDevice for RecordingDevice {
    fn create_constant_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferHandle, GfxError> {
        if self.fail_buffers {
            return Err(GfxError::Device("injected buffer creation failure".into()));
        }
        if desc.size == 0 {
            return Err(GfxError::Device("zero-sized constant buffer".into()));
        }
        let handle = BufferHandle(self.next_id());
        self.buffers.insert(
            handle,
            FakeBuffer {
                label: desc.label.map(str::to_owned),
                contents: vec![0; desc.size as usize],
            },
        );
        self.calls.push(DeviceCall::CreateBuffer(handle));
        Ok(handle)
    }

    fn destroy_buffer(&mut self, handle: BufferHandle) {
        if self.buffers.remove(&handle).is_some() {
            self.constant_slots.retain(|_, h| *h != handle);
            self.calls.push(DeviceCall::DestroyBuffer(handle));
        }
    }

    fn write_buffer(&mut self, handle: BufferHandle, data: &[u8]) -> Result<(), GfxError> {
        let buffer = self
            .buffers
            .get_mut(&handle)
            .ok_or(GfxError::UnknownHandle(handle.0))?;
        if data.len() > buffer.contents.len() {
            return Err(GfxError::Device(format!(
                "write of {} bytes exceeds buffer size {}",
                data.len(),
                buffer.contents.len()
            )));
        }
        buffer.contents[..data.len()].copy_from_slice(data);
        self.calls.push(DeviceCall::WriteBuffer(handle));
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
        self.calls.push(DeviceCall::BindConstantBuffer { stage, slot, handle });
        Ok(())
    }

    fn shader_capabilities(&self) -> naga::valid::Capabilities {
        capabilities_for(self.features)
    }

    fn create_shader(&mut self, blob: &ShaderBlob) -> Result<ShaderHandle, GfxError> {
        if self.fail_shaders {
            return Err(GfxError::Device("injected shader creation failure".into()));
        }
        check_capabilities(blob, self.shader_capabilities())?;
        let handle = ShaderHandle(self.next_id());
        self.shaders.insert(
            handle,
            FakeShader {
                stage: blob.stage(),
                source_hash: blob.source_hash(),
            },
        );
        self.calls.push(DeviceCall::CreateShader(handle));
        Ok(handle)
    }

    fn destroy_shader(&mut self, handle: ShaderHandle) {
        if self.shaders.remove(&handle).is_some() {
            self.bound_shaders.retain(|_, h| *h != handle);
            self.calls.push(DeviceCall::DestroyShader(handle));
        }
    }

    fn bind_shader(&mut self, stage: ShaderStage, handle: ShaderHandle) -> Result<(), GfxError> {
        let shader = self
            .shaders
            .get(&handle)
            .ok_or(GfxError::UnknownHandle(handle.0))?;
        if shader.stage != stage {
            return Err(GfxError::Device(format!(
                "{} shader cannot be bound to the {stage} stage",
                shader.stage
            )));
        }
        self.bound_shaders.insert(stage, handle);
        self.calls.push(DeviceCall::BindShader { stage, handle });
        Ok(())
    }
}
