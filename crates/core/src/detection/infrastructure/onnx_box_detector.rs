use std::path::Path;

use crate::detection::domain::region_detector::RegionDetector;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Input normalization used by the UltraFace-style detector family.
const PIXEL_MEAN: f32 = 127.0;
const PIXEL_SCALE: f32 = 128.0;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.3;

/// Single-shot box detector backed by an ONNX Runtime session.
///
/// Expects an SSD-style model with two outputs: scores `[1, N, 2]`
/// (background, object) and boxes `[1, N, 4]` as normalized corner
/// coordinates. The face and eye classifiers are two instances of this
/// type with different models, input resolutions, and thresholds.
pub struct OnnxBoxDetector {
    session: ort::session::Session,
    input_width: u32,
    input_height: u32,
    confidence: f32,
}

impl OnnxBoxDetector {
    /// Load a model. Fails immediately on a missing or malformed file,
    /// so a bad model path surfaces at startup rather than mid-stream.
    pub fn new(
        model_path: &Path,
        input_size: (u32, u32),
        confidence: f32,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?.commit_from_file(model_path)?;
        Ok(Self {
            session,
            input_width: input_size.0,
            input_height: input_size.1,
            confidence,
        })
    }
}

impl RegionDetector for OnnxBoxDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
        let fw = frame.width();
        let fh = frame.height();

        // 1. Preprocess: resize to model resolution, normalize, NCHW
        let input_tensor = preprocess(frame, self.input_width, self.input_height);

        // 2. Inference
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        if outputs.len() < 2 {
            return Err(format!(
                "box detector model expected 2 outputs, got {}",
                outputs.len()
            )
            .into());
        }

        let scores = outputs[0].try_extract_array::<f32>()?;
        let boxes = outputs[1].try_extract_array::<f32>()?;
        let score_data = scores.as_slice().ok_or("Cannot get score slice")?;
        let box_data = boxes.as_slice().ok_or("Cannot get box slice")?;

        // 3. Decode + confidence filter
        let mut raw_dets = decode(score_data, box_data, self.confidence, fw, fh);

        // 4. NMS
        let kept = nms(&mut raw_dets, NMS_IOU_THRESH);

        // 5. Build clamped regions
        let bounds = frame.bounds();
        let regions = kept
            .iter()
            .map(|d| {
                Region::new(
                    d.x1 as i32,
                    d.y1 as i32,
                    (d.x2 - d.x1) as i32,
                    (d.y2 - d.y1) as i32,
                )
                .clamp_to(&bounds)
            })
            .filter(|r| !r.is_empty())
            .collect();

        Ok(regions)
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Resize frame to `width × height` and normalize to `(v - 127) / 128`,
/// NCHW float32.
fn preprocess(frame: &Frame, width: u32, height: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let (w, h) = (width as usize, height as usize);

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, h, w));

    for y in 0..h {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / h as f64) as usize).min(src_h - 1);
        for x in 0..w {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / w as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = (src[[src_y, src_x, c]] as f32 - PIXEL_MEAN) / PIXEL_SCALE;
            }
        }
    }

    tensor
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct RawDet {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    score: f64,
}

/// Decode score/box pairs into frame-coordinate candidates above the
/// confidence threshold. Box coordinates are normalized corners; anything
/// degenerate after clamping to `[0, 1]` is discarded.
fn decode(
    score_data: &[f32],
    box_data: &[f32],
    confidence: f32,
    frame_w: u32,
    frame_h: u32,
) -> Vec<RawDet> {
    let n = (score_data.len() / 2).min(box_data.len() / 4);
    let mut dets = Vec::new();

    for i in 0..n {
        let score = score_data[i * 2 + 1];
        if score < confidence {
            continue;
        }

        let b = &box_data[i * 4..i * 4 + 4];
        let x1 = (b[0].clamp(0.0, 1.0) * frame_w as f32) as f64;
        let y1 = (b[1].clamp(0.0, 1.0) * frame_h as f32) as f64;
        let x2 = (b[2].clamp(0.0, 1.0) * frame_w as f32) as f64;
        let y2 = (b[3].clamp(0.0, 1.0) * frame_h as f32) as f64;

        if x2 <= x1 || y2 <= y1 {
            continue;
        }

        dets.push(RawDet {
            x1,
            y1,
            x2,
            y2,
            score: score as f64,
        });
    }

    dets
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

fn nms(dets: &mut [RawDet], iou_thresh: f64) -> Vec<RawDet> {
    dets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if !suppressed[j] && bbox_iou(&dets[i], &dets[j]) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn bbox_iou(a: &RawDet, b: &RawDet) -> f64 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    inter / (area_a + area_b - inter)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_preprocess_shape() {
        let data = vec![128u8; 200 * 100 * 3];
        let frame = Frame::new(data, 200, 100, 3, 0);
        let tensor = preprocess(&frame, 320, 240);
        assert_eq!(tensor.shape(), &[1, 3, 240, 320]);
    }

    #[test]
    fn test_preprocess_normalization_range() {
        let data = vec![255u8; 50 * 50 * 3];
        let frame = Frame::new(data, 50, 50, 3, 0);
        let tensor = preprocess(&frame, 64, 64);
        // (255 - 127) / 128 = 1.0
        assert_relative_eq!(tensor[[0, 0, 0, 0]], 1.0);

        let zeros = Frame::new(vec![0u8; 50 * 50 * 3], 50, 50, 3, 0);
        let tensor = preprocess(&zeros, 64, 64);
        // (0 - 127) / 128 ≈ -0.992
        assert_relative_eq!(tensor[[0, 0, 0, 0]], -127.0 / 128.0);
    }

    #[test]
    fn test_decode_filters_by_confidence() {
        // Two candidates: one above, one below threshold
        let scores = [0.1f32, 0.9, 0.8, 0.2];
        let boxes = [0.0f32, 0.0, 0.5, 0.5, 0.5, 0.5, 1.0, 1.0];
        let dets = decode(&scores, &boxes, 0.5, 100, 100);
        assert_eq!(dets.len(), 1);
        assert_relative_eq!(dets[0].score, 0.9, epsilon = 1e-6);
        assert_relative_eq!(dets[0].x2, 50.0);
    }

    #[test]
    fn test_decode_clamps_coordinates_to_frame() {
        let scores = [0.0f32, 0.9];
        let boxes = [-0.2f32, -0.1, 1.5, 1.2];
        let dets = decode(&scores, &boxes, 0.5, 100, 80);
        assert_eq!(dets.len(), 1);
        assert_relative_eq!(dets[0].x1, 0.0);
        assert_relative_eq!(dets[0].y1, 0.0);
        assert_relative_eq!(dets[0].x2, 100.0);
        assert_relative_eq!(dets[0].y2, 80.0);
    }

    #[test]
    fn test_decode_drops_degenerate_boxes() {
        let scores = [0.0f32, 0.9];
        let boxes = [0.5f32, 0.5, 0.5, 0.7]; // zero width
        let dets = decode(&scores, &boxes, 0.5, 100, 100);
        assert!(dets.is_empty());
    }

    #[test]
    fn test_decode_empty_input() {
        assert!(decode(&[], &[], 0.5, 100, 100).is_empty());
    }

    fn det(x1: f64, y1: f64, x2: f64, y2: f64, score: f64) -> RawDet {
        RawDet {
            x1,
            y1,
            x2,
            y2,
            score,
        }
    }

    #[test]
    fn test_nms_suppresses_overlapping_lower_score() {
        let mut dets = vec![
            det(0.0, 0.0, 100.0, 100.0, 0.8),
            det(5.0, 5.0, 105.0, 105.0, 0.9),
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].score, 0.9);
    }

    #[test]
    fn test_nms_keeps_disjoint_boxes() {
        let mut dets = vec![
            det(0.0, 0.0, 50.0, 50.0, 0.8),
            det(200.0, 200.0, 250.0, 250.0, 0.9),
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 2);
        // Sorted by score descending
        assert_relative_eq!(kept[0].score, 0.9);
    }

    #[test]
    fn test_bbox_iou_identical() {
        let a = det(0.0, 0.0, 10.0, 10.0, 1.0);
        assert_relative_eq!(bbox_iou(&a, &a), 1.0);
    }

    #[test]
    fn test_bbox_iou_disjoint() {
        let a = det(0.0, 0.0, 10.0, 10.0, 1.0);
        let b = det(20.0, 20.0, 30.0, 30.0, 1.0);
        assert_relative_eq!(bbox_iou(&a, &b), 0.0);
    }
}
