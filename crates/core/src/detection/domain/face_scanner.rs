use crate::detection::domain::region_detector::RegionDetector;
use crate::shared::constants::MIN_FACE_FOR_EYE_SEARCH;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// One detected face and the eye rectangles found inside it, all in frame
/// coordinates. No identity, no lifetime beyond the producing iteration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FaceScan {
    pub face: Region,
    pub eyes: Vec<Region>,
}

/// Two-stage detection: faces over the whole frame, then eyes confined to
/// each face crop.
///
/// Eye rectangles are translated back to frame coordinates and clamped into
/// their parent face, so a scan never reports an eye outside its face.
///
/// With `detect_every > 1`, the detectors run on every Nth frame and the
/// previous scan is reused in between. Live annotation tolerates slightly
/// stale boxes far better than it tolerates per-frame inference cost.
pub struct FaceScanner {
    face_detector: Box<dyn RegionDetector>,
    eye_detector: Box<dyn RegionDetector>,
    detect_every: usize,
    frames_seen: usize,
    last_scans: Vec<FaceScan>,
}

impl FaceScanner {
    pub fn new(
        face_detector: Box<dyn RegionDetector>,
        eye_detector: Box<dyn RegionDetector>,
        detect_every: usize,
    ) -> Result<Self, &'static str> {
        if detect_every < 1 {
            return Err("detect_every must be >= 1");
        }
        Ok(Self {
            face_detector,
            eye_detector,
            detect_every,
            frames_seen: 0,
            last_scans: Vec::new(),
        })
    }

    pub fn scan(&mut self, frame: &Frame) -> Result<Vec<FaceScan>, Box<dyn std::error::Error>> {
        if self.frames_seen % self.detect_every != 0 {
            self.frames_seen += 1;
            return Ok(self.last_scans.clone());
        }

        let scans = self.full_scan(frame)?;
        // Advance only after a successful pass, so the frame after a
        // detection error runs a fresh pass instead of reusing stale boxes.
        self.frames_seen += 1;
        self.last_scans = scans.clone();
        Ok(scans)
    }

    fn full_scan(&mut self, frame: &Frame) -> Result<Vec<FaceScan>, Box<dyn std::error::Error>> {
        let bounds = frame.bounds();
        let faces = self.face_detector.detect(frame)?;

        let mut scans = Vec::with_capacity(faces.len());
        for face in faces {
            let face = face.clamp_to(&bounds);
            if face.is_empty() {
                continue;
            }
            let eyes = self.find_eyes(frame, &face)?;
            scans.push(FaceScan { face, eyes });
        }
        Ok(scans)
    }

    fn find_eyes(
        &mut self,
        frame: &Frame,
        face: &Region,
    ) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
        if face.width < MIN_FACE_FOR_EYE_SEARCH || face.height < MIN_FACE_FOR_EYE_SEARCH {
            return Ok(Vec::new());
        }
        let Some(roi) = frame.crop(face) else {
            return Ok(Vec::new());
        };

        let eyes = self
            .eye_detector
            .detect(&roi)?
            .into_iter()
            .map(|eye| eye.translate(face.x, face.y).clamp_to(face))
            .filter(|eye| !eye.is_empty())
            .collect();
        Ok(eyes)
    }
}
