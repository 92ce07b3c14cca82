//! Adapter-scoped resources released by the main loop

use crate::device::EngineDevice;

/// A 2D drawing resource (brush, text format, bitmap) that may hold one native object per device.
///
/// Owners hand these to the main loop for unloading instead of releasing them directly, so the
/// native objects are never torn down while a frame that uses them is still being rendered.
pub trait Drawing2DResource: Send + Sync {
    /// Release everything this resource created on the given device.
    ///
    /// Called once for every enumerated device, including devices that never loaded it.
    fn unload_resources(&self, device: &EngineDevice);
}
