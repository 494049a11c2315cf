//! Tessel graphics adapters.
//!
//! Thin, typed wrappers over GPU objects that share one lifecycle contract
//! (`init` / `release` / `reset` / `resize`, see [`asset`]):
//! - [`buffer::ConstantBuffer`]: one uniform buffer sized by its payload type
//! - [`shader::PixelShader`]: compiled WGSL + the device object built from it
//! - [`canvas::Canvas2D`]: fans lifecycle calls out to 2D elements
//!
//! All device access goes through [`device::GraphicsDevice`], implemented by
//! wgpu ([`device::WgpuDevice`]) and by an in-memory recorder
//! ([`device::RecordingDevice`]).

pub mod asset;
pub mod buffer;
pub mod canvas;
pub mod device;
pub mod logging;
pub mod shader;
