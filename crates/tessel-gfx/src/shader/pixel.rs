use std::path::{Path, PathBuf};

use super::{ShaderBlob, ShaderOptions};
use crate::asset::{GraphicsAsset, Releasable, Resettable};
use crate::device::{GfxError, GraphicsDevice, ShaderHandle, ShaderStage};

/// Lifecycle position of a [`PixelShader`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaderState {
    /// No bytecode.
    Unloaded,
    /// Bytecode present, no device object (released, or creation failed).
    Compiled,
    /// Device object created, not bound since the last reset.
    Ready,
    /// Bound to the pixel stage.
    Bound,
}

/// Pixel (fragment) shader adapter.
///
/// Owns the compiled blob and the device object created from it. `reset`
/// recreates the device object from the retained blob; only `load` touches
/// the source again.
#[derive(Debug, Default)]
pub struct PixelShader {
    options: ShaderOptions,
    path: Option<PathBuf>,
    blob: Option<ShaderBlob>,
    shader: Option<ShaderHandle>,
    bound: bool,
}

impl PixelShader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a custom entry point instead of `fs_main`.
    pub fn with_options(options: ShaderOptions) -> Self {
        Self {
            options: ShaderOptions {
                stage: ShaderStage::Pixel,
                ..options
            },
            ..Self::default()
        }
    }

    /// Compiles the WGSL file at `path` and creates the device object.
    ///
    /// Any previous blob and device object are dropped first; on failure the
    /// shader is left unloaded.
    pub fn load(
        &mut self,
        device: &mut dyn GraphicsDevice,
        path: impl AsRef<Path>,
    ) -> Result<(), GfxError> {
        let path = path.as_ref();
        self.unload(device);

        let source = std::fs::read_to_string(path).map_err(|source| GfxError::ShaderIo {
            path: path.to_path_buf(),
            source,
        })?;

        self.path = Some(path.to_path_buf());
        self.compile_and_reset(device, &path.display().to_string(), &source)
    }

    /// Like [`PixelShader::load`], from in-memory source.
    pub fn load_source(
        &mut self,
        device: &mut dyn GraphicsDevice,
        label: &str,
        source: &str,
    ) -> Result<(), GfxError> {
        self.unload(device);
        self.compile_and_reset(device, label, source)
    }

    /// Attaches the shader to the pixel stage.
    pub fn bind(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), GfxError> {
        let handle = self.shader.ok_or(GfxError::NotAllocated("pixel shader"))?;
        device.bind_shader(ShaderStage::Pixel, handle)?;
        self.bound = true;
        Ok(())
    }

    pub fn state(&self) -> ShaderState {
        match (&self.blob, self.shader, self.bound) {
            (None, _, _) => ShaderState::Unloaded,
            (Some(_), None, _) => ShaderState::Compiled,
            (Some(_), Some(_), false) => ShaderState::Ready,
            (Some(_), Some(_), true) => ShaderState::Bound,
        }
    }

    /// File the shader was last loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn blob(&self) -> Option<&ShaderBlob> {
        self.blob.as_ref()
    }

    pub fn handle(&self) -> Option<ShaderHandle> {
        self.shader
    }

    fn unload(&mut self, device: &mut dyn GraphicsDevice) {
        self.release(device);
        self.blob = None;
        self.path = None;
    }

    fn compile_and_reset(
        &mut self,
        device: &mut dyn GraphicsDevice,
        label: &str,
        source: &str,
    ) -> Result<(), GfxError> {
        let capabilities = device.shader_capabilities();
        let blob = match ShaderBlob::compile(label, source, &self.options, capabilities) {
            Ok(blob) => blob,
            Err(err) => {
                self.path = None;
                return Err(err);
            }
        };
        self.blob = Some(blob);
        self.reset(device)
    }
}

impl Releasable for PixelShader {
    fn release(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(handle) = self.shader.take() {
            device.destroy_shader(handle);
        }
        self.bound = false;
    }
}

impl Resettable for PixelShader {
    /// Recreates the device object from the retained blob. A shader that was
    /// never loaded has nothing to recreate.
    fn reset(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), GfxError> {
        self.release(device);
        let Some(blob) = &self.blob else {
            return Ok(());
        };
        self.shader = Some(device.create_shader(blob)?);
        Ok(())
    }
}

impl GraphicsAsset for PixelShader {}
