use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Domain interface for single-class object detection.
///
/// Implementations may be stateful (e.g., caching between frames),
/// hence `&mut self`.
pub trait RegionDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>>;
}
