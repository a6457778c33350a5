use bytes::Bytes;

use crate::annotate::box_outline::annotate_scans;
use crate::detection::domain::face_scanner::FaceScanner;
use crate::encode::jpeg_encoder::JpegEncoder;
use crate::shared::frame::Frame;

/// Turns one raw frame into one encoded chunk: scan → annotate → encode.
///
/// Any error is a per-frame error; the caller drops the frame and moves on.
pub struct FrameProcessor {
    scanner: FaceScanner,
    encoder: JpegEncoder,
}

impl FrameProcessor {
    pub fn new(scanner: FaceScanner, encoder: JpegEncoder) -> Self {
        Self { scanner, encoder }
    }

    pub fn process(&mut self, mut frame: Frame) -> Result<Bytes, Box<dyn std::error::Error>> {
        let scans = self.scanner.scan(&frame)?;
        annotate_scans(&mut frame, &scans);
        let jpeg = self.encoder.encode(&frame)?;
        Ok(Bytes::from(jpeg))
    }
}
