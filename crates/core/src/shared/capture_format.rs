/// Pixel dimensions and nominal frame rate reported by a capture source
/// when it is opened.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureFormat {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}
