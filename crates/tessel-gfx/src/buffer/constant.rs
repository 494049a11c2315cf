use std::marker::PhantomData;

use bytemuck::Pod;

use crate::asset::{GraphicsAsset, Releasable, Resettable};
use crate::device::{BufferDesc, BufferHandle, GfxError, GraphicsDevice, ShaderStage};

/// Uniform buffers are bound in 16-byte units.
const CONSTANT_ALIGNMENT: u64 = 16;

/// Fixed-size constant (uniform) buffer holding one `T`.
///
/// The device buffer exists between `reset` and `release`; `update` and
/// `bind` fail with [`GfxError::NotAllocated`] outside that window. Contents
/// do not survive a reset; callers re-upload after device loss.
pub struct ConstantBuffer<T: Pod> {
    label: Option<String>,
    buffer: Option<BufferHandle>,
    _payload: PhantomData<T>,
}

impl<T: Pod> ConstantBuffer<T> {
    pub fn new() -> Self {
        Self {
            label: None,
            buffer: None,
            _payload: PhantomData,
        }
    }

    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::new()
        }
    }

    /// Device-side size: `size_of::<T>()` rounded up to 16 bytes.
    pub const fn byte_size() -> u64 {
        let size = std::mem::size_of::<T>() as u64;
        let padded = size.div_ceil(CONSTANT_ALIGNMENT) * CONSTANT_ALIGNMENT;
        if padded == 0 { CONSTANT_ALIGNMENT } else { padded }
    }

    pub fn is_allocated(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn handle(&self) -> Option<BufferHandle> {
        self.buffer
    }

    /// Replaces the buffer contents with `data`.
    pub fn update(&mut self, device: &mut dyn GraphicsDevice, data: &T) -> Result<(), GfxError> {
        let handle = self.allocated()?;
        device.write_buffer(handle, bytemuck::bytes_of(data))
    }

    /// Attaches the buffer to `slot` of `stage` for subsequent draws.
    pub fn bind(
        &self,
        device: &mut dyn GraphicsDevice,
        stage: ShaderStage,
        slot: u32,
    ) -> Result<(), GfxError> {
        let handle = self.allocated()?;
        device.bind_constant_buffer(stage, slot, handle)
    }

    pub fn bind_vertex_shader(
        &self,
        device: &mut dyn GraphicsDevice,
        slot: u32,
    ) -> Result<(), GfxError> {
        self.bind(device, ShaderStage::Vertex, slot)
    }

    pub fn bind_pixel_shader(
        &self,
        device: &mut dyn GraphicsDevice,
        slot: u32,
    ) -> Result<(), GfxError> {
        self.bind(device, ShaderStage::Pixel, slot)
    }

    fn allocated(&self) -> Result<BufferHandle, GfxError> {
        self.buffer.ok_or(GfxError::NotAllocated("constant buffer"))
    }
}

impl<T: Pod> Default for ConstantBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Pod> Releasable for ConstantBuffer<T> {
    fn release(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(handle) = self.buffer.take() {
            device.destroy_buffer(handle);
        }
    }
}

impl<T: Pod> Resettable for ConstantBuffer<T> {
    fn reset(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), GfxError> {
        self.release(device);
        let handle = device.create_constant_buffer(&BufferDesc {
            label: self.label.as_deref(),
            size: Self::byte_size(),
        })?;
        self.buffer = Some(handle);
        Ok(())
    }
}

impl<T: Pod> GraphicsAsset for ConstantBuffer<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceCall, RecordingDevice};
    use bytemuck::Zeroable;

    #[repr(C)]
    #[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
    struct Transform {
        offset: [f32; 2],
        scale: f32,
    }

    fn bytes(t: &Transform) -> Vec<u8> {
        let mut v = bytemuck::bytes_of(t).to_vec();
        v.resize(16, 0);
        v
    }

    #[test]
    fn byte_size_rounds_to_uniform_alignment() {
        assert_eq!(ConstantBuffer::<Transform>::byte_size(), 16);
        assert_eq!(ConstantBuffer::<[f32; 4]>::byte_size(), 16);
        assert_eq!(ConstantBuffer::<[f32; 5]>::byte_size(), 32);
        assert_eq!(ConstantBuffer::<()>::byte_size(), 16);
    }

    #[test]
    fn init_allocates_one_buffer() {
        let mut dev = RecordingDevice::new();
        let mut cb = ConstantBuffer::<Transform>::with_label("transform");
        cb.init(&mut dev).unwrap();
        assert!(cb.is_allocated());
        assert_eq!(dev.live_buffers(), 1);
        assert_eq!(dev.buffer_label(cb.handle().unwrap()), Some("transform"));
    }

    #[test]
    fn release_on_unallocated_buffer_is_a_no_op() {
        let mut dev = RecordingDevice::new();
        let mut cb = ConstantBuffer::<Transform>::new();
        cb.release(&mut dev);
        cb.release(&mut dev);
        assert!(dev.calls().is_empty());
    }

    #[test]
    fn update_and_bind_require_allocation() {
        let mut dev = RecordingDevice::new();
        let mut cb = ConstantBuffer::<Transform>::new();
        let t = Transform { offset: [0.0; 2], scale: 1.0 };
        assert!(matches!(cb.update(&mut dev, &t), Err(GfxError::NotAllocated(_))));
        assert!(matches!(cb.bind_pixel_shader(&mut dev, 0), Err(GfxError::NotAllocated(_))));
        assert!(dev.calls().is_empty());
    }

    #[test]
    fn reset_twice_matches_reset_once() {
        let mut dev = RecordingDevice::new();
        let mut cb = ConstantBuffer::<Transform>::new();
        cb.reset(&mut dev).unwrap();
        cb.reset(&mut dev).unwrap();
        assert!(cb.is_allocated());
        assert_eq!(dev.live_buffers(), 1);
    }

    #[test]
    fn latest_update_is_visible_to_next_draw() {
        let mut dev = RecordingDevice::new();
        let mut cb = ConstantBuffer::<Transform>::new();
        cb.init(&mut dev).unwrap();

        let first = Transform { offset: [1.0, 2.0], scale: 3.0 };
        let second = Transform { offset: [4.0, 5.0], scale: 6.0 };
        cb.update(&mut dev, &first).unwrap();
        cb.update(&mut dev, &second).unwrap();
        cb.bind_vertex_shader(&mut dev, 1).unwrap();

        let draw = dev.draw();
        assert_eq!(draw.constant_buffers[&(ShaderStage::Vertex, 1)], bytes(&second));
        assert!(!draw.constant_buffers.contains_key(&(ShaderStage::Pixel, 1)));
    }

    #[test]
    fn update_after_bind_is_still_visible() {
        let mut dev = RecordingDevice::new();
        let mut cb = ConstantBuffer::<Transform>::new();
        cb.init(&mut dev).unwrap();
        cb.bind_pixel_shader(&mut dev, 0).unwrap();

        let t = Transform { offset: [7.0, 8.0], scale: 9.0 };
        cb.update(&mut dev, &t).unwrap();
        assert_eq!(dev.draw().constant_buffers[&(ShaderStage::Pixel, 0)], bytes(&t));
    }

    #[test]
    fn reset_drops_old_binding() {
        let mut dev = RecordingDevice::new();
        let mut cb = ConstantBuffer::<Transform>::new();
        cb.init(&mut dev).unwrap();
        cb.bind_pixel_shader(&mut dev, 0).unwrap();
        let old = cb.handle().unwrap();

        cb.reset(&mut dev).unwrap();
        assert_ne!(cb.handle().unwrap(), old);
        assert!(dev.draw().constant_buffers.is_empty());
        assert!(dev.calls().contains(&DeviceCall::DestroyBuffer(old)));
    }

    #[test]
    fn allocation_failure_is_reported() {
        let mut dev = RecordingDevice::new();
        dev.fail_buffer_creation(true);
        let mut cb = ConstantBuffer::<Transform>::new();
        assert!(matches!(cb.init(&mut dev), Err(GfxError::Device(_))));
        assert!(!cb.is_allocated());
    }
}
