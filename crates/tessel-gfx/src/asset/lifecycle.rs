use crate::device::{GfxError, GraphicsDevice};

/// Releases device objects.
///
/// Must be idempotent and safe on a resource that was never allocated.
pub trait Releasable {
    fn release(&mut self, device: &mut dyn GraphicsDevice);
}

/// Recreates device objects, e.g. after a device loss.
///
/// Implementations release first, so calling `reset` twice leaves the
/// resource in the same state as calling it once.
pub trait Resettable: Releasable {
    fn reset(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), GfxError>;
}

/// Full lifecycle of a device-dependent asset.
pub trait GraphicsAsset: Resettable {
    /// First-time allocation.
    fn init(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), GfxError> {
        self.reset(device)
    }

    /// Called when the render target changes size.
    fn resize(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), GfxError> {
        let _ = device;
        Ok(())
    }
}
