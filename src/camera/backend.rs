//! Pluggable camera backends.
//!
//! A backend knows how to enumerate devices and how to open a live stream on
//! one of them. The [`StreamController`](super::StreamController) is the only
//! owner of the handles a backend returns.

use super::types::{CameraDevice, CameraError, CameraSettings, Frame};

/// Source of camera devices and live streams.
#[allow(async_fn_in_trait)]
pub trait CameraBackend {
    /// Handle to one open stream.
    type Stream: StreamHandle;

    /// Enumerate the devices this backend can open.
    fn list_devices(&self) -> Result<Vec<CameraDevice>, CameraError>;

    /// Open a live stream bound to `device`.
    ///
    /// Resolves once the stream is producing frames or has failed.
    async fn open(
        &self,
        device: &CameraDevice,
        settings: &CameraSettings,
    ) -> Result<Self::Stream, CameraError>;
}

/// A live stream bound to one device.
pub trait StreamHandle {
    /// Most recent frame the device produced, if any.
    fn latest_frame(&self) -> Option<Frame>;

    /// Release the underlying device. Calling it twice is a no-op.
    fn release(&mut self);
}
