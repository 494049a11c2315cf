//! Shader compilation and shader adapters.
//!
//! WGSL is compiled (parsed + validated) by naga into a [`ShaderBlob`]; the
//! blob outlives device objects so they can be recreated after a device loss
//! without touching the source again.

mod blob;
mod pixel;

pub use blob::{ShaderBlob, ShaderOptions};
pub use pixel::{PixelShader, ShaderState};
