//! Ownership of the single live capture stream.

use super::backend::{CameraBackend, StreamHandle};
use super::types::{CameraDevice, CameraError, CameraSettings, Frame, StreamToken};

/// Lifecycle of the controlled stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Closed,
    Opening,
    Open,
}

struct ActiveStream<S> {
    device: CameraDevice,
    token: StreamToken,
    handle: S,
}

/// Owns at most one open stream at a time.
///
/// Opening a new stream always releases the previous one first, so the
/// process never holds two device handles. Dropping the controller releases
/// whatever is still open.
pub struct StreamController<B: CameraBackend> {
    backend: B,
    settings: CameraSettings,
    state: StreamState,
    active: Option<ActiveStream<B::Stream>>,
    next_token: u64,
}

impl<B: CameraBackend> std::fmt::Debug for StreamController<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamController")
            .field("state", &self.state)
            .field("device", &self.device().map(|d| d.id.as_str()))
            .field("token", &self.token())
            .finish_non_exhaustive()
    }
}

impl<B: CameraBackend> StreamController<B> {
    pub fn new(backend: B, settings: CameraSettings) -> Self {
        Self {
            backend,
            settings,
            state: StreamState::Closed,
            active: None,
            next_token: 1,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == StreamState::Open
    }

    /// Token of the open stream, `None` when closed.
    pub fn token(&self) -> Option<StreamToken> {
        self.active.as_ref().map(|a| a.token)
    }

    /// Device the open stream is bound to.
    pub fn device(&self) -> Option<&CameraDevice> {
        self.active.as_ref().map(|a| &a.device)
    }

    /// Open a stream on `device`, releasing any open stream first.
    ///
    /// # Errors
    /// * `CameraError::DeviceAccess` - permission denied or device busy
    /// * `CameraError::DeviceNotFound` - the backend does not know the device
    pub async fn open(&mut self, device: &CameraDevice) -> Result<StreamToken, CameraError> {
        self.close();
        self.state = StreamState::Opening;
        log::debug!("Opening camera stream on {}", device);

        match self.backend.open(device, &self.settings).await {
            Ok(handle) => {
                let token = StreamToken(self.next_token);
                self.next_token += 1;
                self.active = Some(ActiveStream {
                    device: device.clone(),
                    token,
                    handle,
                });
                self.state = StreamState::Open;
                log::info!("Camera stream {} open on {}", token, device);
                Ok(token)
            }
            Err(e) => {
                self.state = StreamState::Closed;
                log::warn!("Failed to open camera {}: {}", device, e);
                Err(e)
            }
        }
    }

    /// Release the open stream. Closing a closed controller is a no-op.
    pub fn close(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.handle.release();
            log::info!("Camera stream {} released", active.token);
        }
        self.state = StreamState::Closed;
    }

    /// Latest frame from the open stream.
    ///
    /// Returns `Ok(None)` when the stream is open but has not produced a
    /// frame yet.
    pub fn latest_frame(&self) -> Result<Option<Frame>, CameraError> {
        match (&self.state, &self.active) {
            (StreamState::Open, Some(active)) => Ok(active.handle.latest_frame()),
            _ => Err(CameraError::NoActiveStream),
        }
    }
}

impl<B: CameraBackend> Drop for StreamController<B> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::SimulatedCamera;

    fn backend() -> SimulatedCamera {
        SimulatedCamera::new()
            .with_device("cam-a", "Front")
            .with_device("cam-b", "Rear")
            .deny_device("cam-locked")
            .with_device("cam-locked", "Locked")
    }

    #[tokio::test]
    async fn test_open_transitions_to_open() {
        let mut controller = StreamController::new(backend(), CameraSettings::default());
        assert_eq!(controller.state(), StreamState::Closed);

        let token = controller
            .open(&CameraDevice::new("cam-a", "Front"))
            .await
            .unwrap();
        assert_eq!(controller.state(), StreamState::Open);
        assert_eq!(controller.token(), Some(token));
        assert_eq!(controller.device().unwrap().id, "cam-a");
        assert!(controller.latest_frame().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_switching_devices_releases_previous_stream_first() {
        let mut controller = StreamController::new(backend(), CameraSettings::default());

        let first = controller
            .open(&CameraDevice::new("cam-a", "Front"))
            .await
            .unwrap();
        let second = controller
            .open(&CameraDevice::new("cam-b", "Rear"))
            .await
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(controller.backend().live_streams(), 1);
        assert_eq!(controller.backend().peak_live_streams(), 1);
        assert_eq!(controller.backend().total_opens(), 2);
    }

    #[tokio::test]
    async fn test_failed_open_returns_to_closed() {
        let mut controller = StreamController::new(backend(), CameraSettings::default());
        controller
            .open(&CameraDevice::new("cam-a", "Front"))
            .await
            .unwrap();

        let err = controller
            .open(&CameraDevice::new("cam-locked", "Locked"))
            .await
            .unwrap_err();

        assert!(matches!(err, CameraError::DeviceAccess { .. }));
        assert_eq!(controller.state(), StreamState::Closed);
        assert_eq!(controller.token(), None);
        assert_eq!(controller.backend().live_streams(), 0);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut controller = StreamController::new(backend(), CameraSettings::default());
        controller.close();
        controller
            .open(&CameraDevice::new("cam-a", "Front"))
            .await
            .unwrap();
        controller.close();
        controller.close();

        assert_eq!(controller.state(), StreamState::Closed);
        assert_eq!(controller.backend().live_streams(), 0);
        assert_eq!(
            controller.latest_frame().unwrap_err(),
            CameraError::NoActiveStream
        );
    }

    #[tokio::test]
    async fn test_drop_releases_stream() {
        let camera = backend();
        {
            let mut controller = StreamController::new(camera.clone(), CameraSettings::default());
            controller
                .open(&CameraDevice::new("cam-a", "Front"))
                .await
                .unwrap();
            assert_eq!(camera.live_streams(), 1);
        }
        assert_eq!(camera.live_streams(), 0);
    }
}
