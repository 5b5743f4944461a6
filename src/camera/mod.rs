//! Camera access for parcel capture.
//!
//! - Device enumeration via [`list_devices`] and [`DeviceRegistry`]
//! - Stream lifetime via [`StreamController`]
//! - Still capture via [`FrameCapturer`]
//! - Backends: [`FfmpegCamera`] for real hardware, [`SimulatedCamera`] for dry runs and tests

mod backend;
mod capture;
mod device;
mod ffmpeg;
mod frame_utils;
mod simulated;
mod stream;
mod types;

pub use backend::{CameraBackend, StreamHandle};
pub use capture::{EncodedImage, FrameCapturer, DEFAULT_JPEG_QUALITY};
pub use device::{list_devices, DeviceRegistry};
pub use ffmpeg::{FfmpegCamera, FfmpegStream};
pub use simulated::{SimulatedCamera, SimulatedStream};
pub use stream::{StreamController, StreamState};
pub use types::{
    CameraDevice, CameraError, CameraSettings, Frame, FrameFormat, Resolution, StreamToken,
};
