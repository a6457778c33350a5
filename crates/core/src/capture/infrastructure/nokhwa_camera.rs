use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::capture_format::CaptureFormat;
use crate::shared::frame::Frame;

/// Requested rate when the caller pins a resolution; the backend may
/// negotiate a different one.
const REQUESTED_FPS: u32 = 30;

/// Webcam capture via `nokhwa`, decoding every buffer to RGB24.
///
/// One instance owns one physical device handle. The frame hub is the only
/// intended caller, so reads are never raced across threads.
pub struct NokhwaCamera {
    device_index: u32,
    requested_size: Option<(u32, u32)>,
    camera: Option<Camera>,
    frame_index: usize,
}

impl NokhwaCamera {
    pub fn new(device_index: u32, requested_size: Option<(u32, u32)>) -> Self {
        Self {
            device_index,
            requested_size,
            camera: None,
            frame_index: 0,
        }
    }
}

impl FrameSource for NokhwaCamera {
    fn open(&mut self) -> Result<CaptureFormat, Box<dyn std::error::Error>> {
        let requested = match self.requested_size {
            Some((w, h)) => RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
                CameraFormat::new(Resolution::new(w, h), FrameFormat::MJPEG, REQUESTED_FPS),
            )),
            None => {
                RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate)
            }
        };

        let mut camera = Camera::new(CameraIndex::Index(self.device_index), requested)?;
        camera.open_stream()?;

        let format = camera.camera_format();
        let capture_format = CaptureFormat {
            width: format.resolution().width(),
            height: format.resolution().height(),
            fps: format.frame_rate() as f64,
        };

        log::info!(
            "camera {} opened: {}x{} @ {} fps ({})",
            self.device_index,
            capture_format.width,
            capture_format.height,
            format.frame_rate(),
            format.format(),
        );

        self.camera = Some(camera);
        Ok(capture_format)
    }

    fn read(&mut self) -> Option<Frame> {
        let camera = self.camera.as_mut()?;

        let buffer = match camera.frame() {
            Ok(buffer) => buffer,
            Err(e) => {
                log::warn!("camera read failed, ending stream: {e}");
                return None;
            }
        };

        let image = match buffer.decode_image::<RgbFormat>() {
            Ok(image) => image,
            Err(e) => {
                log::warn!("frame decode failed, ending stream: {e}");
                return None;
            }
        };

        let (width, height) = image.dimensions();
        let index = self.frame_index;
        self.frame_index += 1;
        Some(Frame::new(image.into_raw(), width, height, 3, index))
    }

    fn close(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                log::debug!("error stopping camera stream: {e}");
            }
        }
    }
}
