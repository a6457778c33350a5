use crate::shared::constants::DEFAULT_JPEG_QUALITY;
use crate::shared::frame::Frame;

/// Re-encodes RGB frames to JPEG via the `image` crate.
pub struct JpegEncoder {
    quality: u8,
}

impl JpegEncoder {
    /// `quality` is the usual 1-100 JPEG scale.
    pub fn new(quality: u8) -> Self {
        Self { quality }
    }

    pub fn encode(&self, frame: &Frame) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let img =
            image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
                .ok_or("Frame buffer does not match its dimensions")?;

        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, self.quality);
        img.write_with_encoder(encoder)?;
        Ok(buf)
    }
}

impl Default for JpegEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame(width: u32, height: u32, value: u8) -> Frame {
        Frame::new(vec![value; (width * height * 3) as usize], width, height, 3, 0)
    }

    #[test]
    fn test_output_is_jpeg() {
        let encoder = JpegEncoder::default();
        let bytes = encoder.encode(&make_frame(32, 24, 128)).unwrap();
        // SOI marker at the start, EOI at the end
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_roundtrip_preserves_dimensions() {
        let encoder = JpegEncoder::new(90);
        let bytes = encoder.encode(&make_frame(40, 30, 200)).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 40);
        assert_eq!(decoded.height(), 30);
    }

    #[test]
    fn test_lower_quality_is_smaller() {
        // A gradient compresses differently at different qualities
        let mut data = Vec::with_capacity(64 * 64 * 3);
        for y in 0..64u32 {
            for x in 0..64u32 {
                data.extend_from_slice(&[(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8]);
            }
        }
        let frame = Frame::new(data, 64, 64, 3, 0);

        let high = JpegEncoder::new(95).encode(&frame).unwrap();
        let low = JpegEncoder::new(20).encode(&frame).unwrap();
        assert!(low.len() < high.len());
    }
}
