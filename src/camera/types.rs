//! Camera types and data structures.

use std::fmt;
use std::time::Instant;

/// A camera device as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    /// Opaque platform identifier (device path, AVFoundation index, ...)
    pub id: String,
    /// Human-readable name, may be empty
    pub label: String,
}

impl CameraDevice {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// Label shown in device pickers.
    ///
    /// Falls back to `Camera <first five characters of the id>` when the
    /// platform did not provide a name.
    pub fn display_label(&self) -> String {
        if self.label.trim().is_empty() {
            let prefix: String = self.id.chars().take(5).collect();
            format!("Camera {}", prefix)
        } else {
            self.label.clone()
        }
    }
}

impl fmt::Display for CameraDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.id, self.display_label())
    }
}

/// Camera resolution settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Medium resolution (640x480)
    pub const MEDIUM: Resolution = Resolution {
        width: 640,
        height: 480,
    };

    /// HD resolution (1280x720) - ideal for reading handwritten labels
    pub const HD: Resolution = Resolution {
        width: 1280,
        height: 720,
    };

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::HD
    }
}

/// Pixel format of a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    /// RGB format (3 bytes per pixel)
    Rgb,
}

/// A raw frame pulled from a live stream.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw pixel data in RGB format
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel format
    pub format: FrameFormat,
    /// Timestamp when frame was captured
    pub timestamp: Instant,
}

impl Frame {
    /// Get the number of bytes per pixel (3 for RGB).
    pub fn bytes_per_pixel(&self) -> usize {
        match self.format {
            FrameFormat::Rgb => 3,
        }
    }

    /// Number of bytes a well-formed frame of this size carries.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.bytes_per_pixel()
    }
}

/// Settings used when opening a stream.
#[derive(Debug, Clone)]
pub struct CameraSettings {
    /// Requested resolution (the device may pick the closest it supports)
    pub resolution: Resolution,
    /// Target FPS (actual may vary)
    pub fps: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            fps: 30,
        }
    }
}

/// Identity of one opened stream.
///
/// Every successful open mints a new token, so work that started against an
/// older stream can be recognised as stale when it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamToken(pub(crate) u64);

impl fmt::Display for StreamToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream#{}", self.0)
    }
}

/// Errors that can occur during camera operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CameraError {
    /// The platform refused to list devices
    #[error("Could not access camera devices: {0}")]
    DeviceEnumeration(String),

    /// Opening the device failed (permission denied, busy, unplugged)
    #[error("Could not access camera '{device}'. Please check permissions. ({reason})")]
    DeviceAccess { device: String, reason: String },

    /// Requested device id is not in the enumerated set
    #[error("Camera device '{0}' not found. Run 'list-cameras' to see available devices")]
    DeviceNotFound(String),

    /// No stream is open
    #[error("Video stream not available")]
    NoActiveStream,

    /// The frame could not be turned into an image payload
    #[error("Could not encode frame: {0}")]
    Encoding(String),

    /// FFmpeg is required for the system camera backend
    #[error("FFmpeg not found. Please install it to use the system camera")]
    FfmpegNotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_label_uses_label() {
        let device = CameraDevice::new("/dev/video0", "Integrated Webcam");
        assert_eq!(device.display_label(), "Integrated Webcam");
        assert_eq!(format!("{}", device), "[/dev/video0] Integrated Webcam");
    }

    #[test]
    fn test_display_label_falls_back_to_id_prefix() {
        let device = CameraDevice::new("a1b2c3d4e5f6", "");
        assert_eq!(device.display_label(), "Camera a1b2c");

        let short = CameraDevice::new("0", "  ");
        assert_eq!(short.display_label(), "Camera 0");
    }

    #[test]
    fn test_resolution_default_is_hd() {
        let res = Resolution::default();
        assert_eq!(res, Resolution::HD);
        assert!(!res.is_empty());
        assert!(Resolution { width: 0, height: 720 }.is_empty());
    }

    #[test]
    fn test_frame_expected_len() {
        let frame = Frame {
            data: vec![0; 6],
            width: 2,
            height: 1,
            format: FrameFormat::Rgb,
            timestamp: Instant::now(),
        };
        assert_eq!(frame.bytes_per_pixel(), 3);
        assert_eq!(frame.expected_len(), 6);
    }

    #[test]
    fn test_camera_error_display() {
        assert_eq!(
            CameraError::NoActiveStream.to_string(),
            "Video stream not available"
        );
        let err = CameraError::DeviceAccess {
            device: "cam0".to_string(),
            reason: "permission denied".to_string(),
        };
        assert!(err.to_string().contains("Please check permissions"));
        assert!(err.to_string().contains("cam0"));
        assert!(CameraError::DeviceNotFound("x".to_string())
            .to_string()
            .contains("list-cameras"));
    }
}
