//! Simulated camera backend.
//!
//! Produces synthetic frames without touching hardware. Used for dry runs
//! (`capture --simulated`) and throughout the test suite, where its handle
//! counters prove streams are released.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::backend::{CameraBackend, StreamHandle};
use super::types::{CameraDevice, CameraError, CameraSettings, Frame, FrameFormat, Resolution};

#[derive(Debug, Default)]
struct Counters {
    live: AtomicUsize,
    peak: AtomicUsize,
    opened: AtomicUsize,
}

/// Simulated camera backend for testing.
#[derive(Debug, Clone, Default)]
pub struct SimulatedCamera {
    devices: Vec<CameraDevice>,
    denied: HashSet<String>,
    deny_listing: bool,
    frame_size: Option<Resolution>,
    counters: Arc<Counters>,
}

impl SimulatedCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend with a single built-in device, used by `--simulated`.
    pub fn with_default_device() -> Self {
        Self::new().with_device("sim0", "Simulated Camera")
    }

    pub fn with_device(mut self, id: &str, label: &str) -> Self {
        self.devices.push(CameraDevice::new(id, label));
        self
    }

    /// Opening this device fails as if permission was denied.
    pub fn deny_device(mut self, id: &str) -> Self {
        self.denied.insert(id.to_string());
        self
    }

    /// Device enumeration fails as if the platform refused it.
    pub fn deny_listing(mut self) -> Self {
        self.deny_listing = true;
        self
    }

    /// Force the size of produced frames; `0x0` simulates a stream that is
    /// open but not yet producing frames.
    pub fn with_frame_size(mut self, resolution: Resolution) -> Self {
        self.frame_size = Some(resolution);
        self
    }

    /// Streams currently open.
    pub fn live_streams(&self) -> usize {
        self.counters.live.load(Ordering::SeqCst)
    }

    /// Highest number of streams ever open at the same time.
    pub fn peak_live_streams(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    /// Total successful opens.
    pub fn total_opens(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }
}

impl CameraBackend for SimulatedCamera {
    type Stream = SimulatedStream;

    fn list_devices(&self) -> Result<Vec<CameraDevice>, CameraError> {
        if self.deny_listing {
            return Err(CameraError::DeviceEnumeration(
                "device listing not permitted".to_string(),
            ));
        }
        Ok(self.devices.clone())
    }

    async fn open(
        &self,
        device: &CameraDevice,
        settings: &CameraSettings,
    ) -> Result<SimulatedStream, CameraError> {
        let seed = self
            .devices
            .iter()
            .position(|d| d.id == device.id)
            .ok_or_else(|| CameraError::DeviceNotFound(device.id.clone()))?;

        if self.denied.contains(&device.id) {
            return Err(CameraError::DeviceAccess {
                device: device.id.clone(),
                reason: "permission denied".to_string(),
            });
        }

        let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(live, Ordering::SeqCst);
        self.counters.opened.fetch_add(1, Ordering::SeqCst);

        let size = self.frame_size.unwrap_or(settings.resolution);
        Ok(SimulatedStream {
            frame: synthetic_frame(size, seed as u8),
            counters: Arc::clone(&self.counters),
            released: false,
        })
    }
}

/// Stream handle returned by [`SimulatedCamera`].
#[derive(Debug)]
pub struct SimulatedStream {
    frame: Frame,
    counters: Arc<Counters>,
    released: bool,
}

impl StreamHandle for SimulatedStream {
    fn latest_frame(&self) -> Option<Frame> {
        if self.released {
            return None;
        }
        Some(self.frame.clone())
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.counters.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for SimulatedStream {
    fn drop(&mut self) {
        self.release();
    }
}

/// Diagonal gradient, tinted per device so frames from different devices differ.
fn synthetic_frame(size: Resolution, seed: u8) -> Frame {
    let width = size.width as usize;
    let height = size.height as usize;
    let mut data = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        for x in 0..width {
            let v = ((x + y) % 256) as u8;
            data.push(v);
            data.push(v.wrapping_add(seed.wrapping_mul(40)));
            data.push(255 - v);
        }
    }
    Frame {
        data,
        width: size.width,
        height: size.height,
        format: FrameFormat::Rgb,
        timestamp: Instant::now(),
    }
}
