use crate::capture::domain::frame_source::FrameSource;
use crate::shared::capture_format::CaptureFormat;
use crate::shared::frame::Frame;

const NOMINAL_FPS: f64 = 30.0;

/// Synthetic source producing a deterministic moving gradient.
///
/// Stands in for a webcam on machines without one (`--source test-pattern`)
/// and drives the end-to-end streaming tests, where a bounded frame count
/// exercises end-of-stream handling.
pub struct TestPatternSource {
    width: u32,
    height: u32,
    remaining: Option<usize>,
    frame_index: usize,
}

impl TestPatternSource {
    /// Unbounded pattern.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            remaining: None,
            frame_index: 0,
        }
    }

    /// Pattern that ends after `frames` reads.
    pub fn with_frame_limit(width: u32, height: u32, frames: usize) -> Self {
        Self {
            remaining: Some(frames),
            ..Self::new(width, height)
        }
    }
}

impl FrameSource for TestPatternSource {
    fn open(&mut self) -> Result<CaptureFormat, Box<dyn std::error::Error>> {
        Ok(CaptureFormat {
            width: self.width,
            height: self.height,
            fps: NOMINAL_FPS,
        })
    }

    fn read(&mut self) -> Option<Frame> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }

        // A real device blocks at its frame rate; without this the pipeline
        // would spin flat out on synthetic input.
        std::thread::sleep(std::time::Duration::from_secs_f64(1.0 / NOMINAL_FPS));

        let shift = (self.frame_index * 4 % 256) as u8;
        let mut data = Vec::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let r = ((x * 255) / self.width.max(1)) as u8;
                let g = ((y * 255) / self.height.max(1)) as u8;
                data.extend_from_slice(&[r.wrapping_add(shift), g, shift]);
            }
        }

        let index = self.frame_index;
        self.frame_index += 1;
        Some(Frame::new(data, self.width, self.height, 3, index))
    }

    fn close(&mut self) {}
}
