pub const FACE_MODEL_NAME: &str = "ultraface-rfb-320.onnx";
pub const FACE_MODEL_URL: &str =
    "https://github.com/facecast-dev/facecast/releases/download/v0.1.0/ultraface-rfb-320.onnx";

pub const EYE_MODEL_NAME: &str = "eyenet-slim-160.onnx";
pub const EYE_MODEL_URL: &str =
    "https://github.com/facecast-dev/facecast/releases/download/v0.1.0/eyenet-slim-160.onnx";

/// Model input resolutions (width, height).
pub const FACE_MODEL_INPUT: (u32, u32) = (320, 240);
pub const EYE_MODEL_INPUT: (u32, u32) = (160, 120);

/// Whole-frame face search accepts weaker candidates than the eye pass.
pub const DEFAULT_FACE_CONFIDENCE: f32 = 0.5;
pub const DEFAULT_EYE_CONFIDENCE: f32 = 0.7;

/// Faces narrower or shorter than this are too small for an eye pass.
pub const MIN_FACE_FOR_EYE_SEARCH: i32 = 24;

pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Capture thread → pipeline thread handoff depth.
pub const FRAME_CHANNEL_CAPACITY: usize = 8;

/// Encoded-chunk fanout depth; lagging subscribers skip to the newest chunk.
pub const BROADCAST_CAPACITY: usize = 32;
