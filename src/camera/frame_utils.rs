//! Frame transformation and encoding helpers.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use super::types::{CameraError, Frame, FrameFormat};

/// Check that a frame is non-empty and its buffer matches its dimensions.
pub fn validate_frame(frame: &Frame) -> Result<(), CameraError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(CameraError::Encoding(format!(
            "frame is {}x{}, stream is not producing frames yet",
            frame.width, frame.height
        )));
    }
    if frame.data.len() != frame.expected_len() {
        return Err(CameraError::Encoding(format!(
            "frame buffer holds {} bytes, expected {}",
            frame.data.len(),
            frame.expected_len()
        )));
    }
    Ok(())
}

/// Mirror a frame horizontally (flip left-right).
///
/// Frames whose buffer does not match their dimensions are left untouched.
pub fn mirror_horizontal(frame: &mut Frame) {
    if frame.data.len() != frame.expected_len() {
        return;
    }
    let width = frame.width as usize;
    let height = frame.height as usize;
    let bpp = frame.bytes_per_pixel();

    for y in 0..height {
        let row_start = y * width * bpp;
        let row = &mut frame.data[row_start..row_start + width * bpp];

        for x in 0..width / 2 {
            let left = x * bpp;
            let right = (width - 1 - x) * bpp;
            for i in 0..bpp {
                row.swap(left + i, right + i);
            }
        }
    }
}

/// Encode an RGB frame as JPEG.
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>, CameraError> {
    validate_frame(frame)?;

    let color = match frame.format {
        FrameFormat::Rgb => ExtendedColorType::Rgb8,
    };

    let mut bytes = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
        encoder
            .encode(&frame.data, frame.width, frame.height, color)
            .map_err(|e| CameraError::Encoding(e.to_string()))?;
    }
    Ok(bytes)
}

/// Wrap encoded bytes in a `data:` URI.
pub fn to_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, BASE64.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn frame(data: Vec<u8>, width: u32, height: u32) -> Frame {
        Frame {
            data,
            width,
            height,
            format: FrameFormat::Rgb,
            timestamp: Instant::now(),
        }
    }

    #[test]
    fn test_mirror_horizontal_2x1() {
        let mut f = frame(vec![1, 2, 3, 4, 5, 6], 2, 1);
        mirror_horizontal(&mut f);
        assert_eq!(f.data, vec![4, 5, 6, 1, 2, 3]);
    }

    #[test]
    fn test_mirror_horizontal_single_pixel() {
        let mut f = frame(vec![1, 2, 3], 1, 1);
        mirror_horizontal(&mut f);
        assert_eq!(f.data, vec![1, 2, 3]);
    }

    #[test]
    fn test_mirror_horizontal_short_buffer_is_untouched() {
        let mut f = frame(vec![1, 2, 3, 4, 5], 2, 1);
        mirror_horizontal(&mut f);
        assert_eq!(f.data, vec![1, 2, 3, 4, 5]);
        assert!(matches!(validate_frame(&f), Err(CameraError::Encoding(_))));
    }

    #[test]
    fn test_encode_jpeg_produces_jpeg_magic() {
        let f = frame(vec![128; 8 * 8 * 3], 8, 8);
        let bytes = encode_jpeg(&f, 80).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_encode_jpeg_rejects_zero_dimensions() {
        let f = frame(Vec::new(), 0, 0);
        assert!(matches!(encode_jpeg(&f, 80), Err(CameraError::Encoding(_))));
    }

    #[test]
    fn test_encode_jpeg_rejects_short_buffer() {
        let f = frame(vec![0; 5], 2, 1);
        assert!(matches!(encode_jpeg(&f, 80), Err(CameraError::Encoding(_))));
    }

    #[test]
    fn test_data_uri_prefix() {
        let uri = to_data_uri("image/jpeg", &[1, 2, 3]);
        assert_eq!(uri, "data:image/jpeg;base64,AQID");
    }
}
