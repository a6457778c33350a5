use crate::shared::capture_format::CaptureFormat;
use crate::shared::frame::Frame;

/// Supplies raw frames from a capture device.
///
/// Implementations handle device details (backend, pixel format decode)
/// while the pipeline works with the abstract [`Frame`] type.
pub trait FrameSource: Send {
    /// Acquires the device and reports its negotiated format.
    fn open(&mut self) -> Result<CaptureFormat, Box<dyn std::error::Error>>;

    /// Next frame, or `None` once the device stops producing.
    ///
    /// A failed grab is end-of-stream: implementations log the cause and
    /// return `None`. No retry, no backoff.
    fn read(&mut self) -> Option<Frame>;

    /// Releases the device handle.
    fn close(&mut self);
}
