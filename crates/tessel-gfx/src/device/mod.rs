//! Graphics device abstraction.
//!
//! Resources never talk to wgpu directly; they go through [`GraphicsDevice`],
//! which has two implementations:
//! - [`WgpuDevice`]: the real backend (headless wgpu device + queue)
//! - [`RecordingDevice`]: an in-memory fake that records every call, used by
//!   tests and by tools that run without a GPU

mod error;
mod gpu;
mod init;
mod recording;

pub use error::GfxError;
pub use gpu::WgpuDevice;
pub use init::GpuInit;
pub use recording::{DeviceCall, DrawSnapshot, RecordingDevice};

use crate::shader::ShaderBlob;

/// Pipeline stage a constant buffer or shader is bound to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ShaderStage {
    Vertex,
    /// Fragment stage.
    Pixel,
}

impl ShaderStage {
    pub(crate) fn naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Pixel => naga::ShaderStage::Fragment,
        }
    }

    pub(crate) fn wgpu(self) -> wgpu::ShaderStages {
        match self {
            ShaderStage::Vertex => wgpu::ShaderStages::VERTEX,
            ShaderStage::Pixel => wgpu::ShaderStages::FRAGMENT,
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Pixel => "pixel",
        })
    }
}

/// Shader capabilities naga may validate against on a device with `features`.
///
/// Only feature-gated capabilities are mapped; anything unmapped stays off,
/// so compilation is never more permissive than the device.
pub fn capabilities_for(features: wgpu::Features) -> naga::valid::Capabilities {
    use naga::valid::Capabilities;

    let mut caps = Capabilities::empty();
    if features.contains(wgpu::Features::SHADER_F64) {
        caps |= Capabilities::FLOAT64;
    }
    if features.contains(wgpu::Features::SHADER_INT64) {
        caps |= Capabilities::SHADER_INT64;
    }
    caps
}

/// Rejects a blob validated against more than `available`.
pub(crate) fn check_capabilities(
    blob: &ShaderBlob,
    available: naga::valid::Capabilities,
) -> Result<(), GfxError> {
    if available.contains(blob.capabilities()) {
        return Ok(());
    }
    Err(GfxError::ShaderCompile {
        label: blob.label().to_string(),
        message: format!(
            "compiled for {:?}, device supports {:?}",
            blob.capabilities(),
            available
        ),
    })
}

/// Opaque id of a device buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BufferHandle(pub(crate) u64);

/// Opaque id of a device shader object.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ShaderHandle(pub(crate) u64);

/// Description of a constant (uniform) buffer.
#[derive(Debug, Copy, Clone)]
pub struct BufferDesc<'a> {
    pub label: Option<&'a str>,
    /// Size in bytes. Already padded to the uniform alignment by the caller.
    pub size: u64,
}

/// The subset of a graphics API that resource adapters need.
///
/// Binding is stateful, as in immediate-mode APIs: a bound object stays bound
/// for subsequent draws until it is replaced or destroyed. Destroying an
/// object unbinds it everywhere.
pub trait GraphicsDevice {
    fn create_constant_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferHandle, GfxError>;

    fn destroy_buffer(&mut self, handle: BufferHandle);

    /// Replaces the leading `data.len()` bytes of the buffer.
    fn write_buffer(&mut self, handle: BufferHandle, data: &[u8]) -> Result<(), GfxError>;

    fn bind_constant_buffer(
        &mut self,
        stage: ShaderStage,
        slot: u32,
        handle: BufferHandle,
    ) -> Result<(), GfxError>;

    /// What shaders compiled for this device may use.
    fn shader_capabilities(&self) -> naga::valid::Capabilities;

    /// Creates the device-side object for already compiled bytecode.
    ///
    /// Fails with [`GfxError::ShaderCompile`] if the blob was validated
    /// against capabilities the device lacks.
    fn create_shader(&mut self, blob: &ShaderBlob) -> Result<ShaderHandle, GfxError>;

    fn destroy_shader(&mut self, handle: ShaderHandle);

    fn bind_shader(&mut self, stage: ShaderStage, handle: ShaderHandle) -> Result<(), GfxError>;
}
