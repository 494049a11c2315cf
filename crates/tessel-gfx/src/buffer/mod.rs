//! Typed GPU buffers.

mod constant;

pub use constant::ConstantBuffer;
