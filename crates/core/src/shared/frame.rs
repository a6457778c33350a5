use ndarray::ArrayView3;

use crate::shared::region::Region;

/// A single captured frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at the capture boundary only; detection,
/// annotation, and encoding treat pixel data as opaque RGB24.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Monotonically increasing capture index assigned by the source.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The full-frame rectangle at origin, in pixel coordinates.
    pub fn bounds(&self) -> Region {
        Region::new(0, 0, self.width as i32, self.height as i32)
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the pixels under `region` (clamped to frame bounds) into an
    /// owned sub-frame. The crop inherits the capture index.
    ///
    /// Returns `None` when the clamped region is empty.
    pub fn crop(&self, region: &Region) -> Option<Frame> {
        let r = region.clamp_to(&self.bounds());
        if r.is_empty() {
            return None;
        }

        let channels = self.channels as usize;
        let fw = self.width as usize;
        let (rx, ry) = (r.x as usize, r.y as usize);
        let (rw, rh) = (r.width as usize, r.height as usize);

        let mut data = Vec::with_capacity(rw * rh * channels);
        for row in 0..rh {
            let offset = ((ry + row) * fw + rx) * channels;
            data.extend_from_slice(&self.data[offset..offset + rw * channels]);
        }

        Some(Frame::new(
            data,
            rw as u32,
            rh as u32,
            self.channels,
            self.index,
        ))
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
