//! Still-frame capture from the live stream.

use super::backend::CameraBackend;
use super::frame_utils::{encode_jpeg, mirror_horizontal, to_data_uri, validate_frame};
use super::stream::StreamController;
use super::types::CameraError;

/// Default JPEG quality, trading fidelity for bounded payload size.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

const JPEG_MIME: &str = "image/jpeg";

/// One encoded still image, ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub mime_type: &'static str,
}

impl EncodedImage {
    /// `data:image/jpeg;base64,...` form expected by the recognition backend.
    pub fn to_data_uri(&self) -> String {
        to_data_uri(self.mime_type, &self.bytes)
    }
}

/// Turns the current frame of a stream into an [`EncodedImage`].
#[derive(Debug, Clone)]
pub struct FrameCapturer {
    quality: u8,
    mirror: bool,
}

impl Default for FrameCapturer {
    fn default() -> Self {
        Self {
            quality: DEFAULT_JPEG_QUALITY,
            mirror: false,
        }
    }
}

impl FrameCapturer {
    pub fn new(quality: u8, mirror: bool) -> Self {
        Self { quality, mirror }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Capture and encode exactly one frame.
    ///
    /// # Errors
    /// * `CameraError::NoActiveStream` - the controller is not open
    /// * `CameraError::Encoding` - no frame yet, zero-sized frame, or encoder failure
    pub fn capture<B: CameraBackend>(
        &self,
        stream: &StreamController<B>,
    ) -> Result<EncodedImage, CameraError> {
        let mut frame = stream.latest_frame()?.ok_or_else(|| {
            CameraError::Encoding("stream has not produced a frame yet".to_string())
        })?;

        validate_frame(&frame)?;
        if self.mirror {
            mirror_horizontal(&mut frame);
        }

        let bytes = encode_jpeg(&frame, self.quality)?;
        log::debug!(
            "Captured {}x{} frame ({} bytes JPEG @ q{})",
            frame.width,
            frame.height,
            bytes.len(),
            self.quality
        );

        Ok(EncodedImage {
            bytes,
            width: frame.width,
            height: frame.height,
            mime_type: JPEG_MIME,
        })
    }
}
