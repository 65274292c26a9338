/// Track continuation by re-detection.
///
/// Composes the detection capability instead of a correlation filter:
/// every update re-runs the detector, greedily adopts the detection that
/// overlaps the previous region best, and reports IoU-derived confidence.
/// While nothing overlaps, the region is held and confidence decays
/// multiplicatively, so a vanished object shows up as a monotone
/// confidence slide rather than an error.
use std::sync::Arc;

use crate::error::FaceError;
use crate::recognition::domain::vision_backend::{DetectorVariant, VisionBackend};
use crate::shared::frame::Frame;
use crate::shared::geometry::Rect;
use crate::tracking::domain::track_backend::{TrackContext, TrackingBackend};

/// Minimum IoU between the previous region and a detection for the track
/// to jump to it.
pub const MATCH_IOU: f64 = 0.3;

/// Confidence multiplier applied on every unmatched frame.
const LOSS_DECAY: f32 = 0.5;

/// Confidence a freshly started track begins from.
const START_CONFIDENCE: f32 = 1.0;

pub struct RedetectTracker {
    backend: Arc<dyn VisionBackend>,
    variant: DetectorVariant,
}

impl RedetectTracker {
    pub fn new(backend: Arc<dyn VisionBackend>, variant: DetectorVariant) -> Self {
        Self { backend, variant }
    }
}

impl TrackingBackend for RedetectTracker {
    fn start_track(
        &self,
        frame: &Frame,
        region: Rect,
    ) -> Result<Box<dyn TrackContext>, FaceError> {
        if region.is_empty() {
            return Err(FaceError::Recognize(
                "cannot track a degenerate region".into(),
            ));
        }
        if !region.fits_within(frame.width(), frame.height()) {
            return Err(FaceError::Recognize(
                "tracked region outside the starting frame".into(),
            ));
        }
        Ok(Box::new(RedetectContext {
            backend: Arc::clone(&self.backend),
            variant: self.variant,
            region,
            confidence: START_CONFIDENCE,
        }))
    }
}

struct RedetectContext {
    backend: Arc<dyn VisionBackend>,
    variant: DetectorVariant,
    region: Rect,
    confidence: f32,
}

impl TrackContext for RedetectContext {
    fn update(&mut self, frame: &Frame) -> Result<f32, FaceError> {
        let detections = self.backend.detect(frame, self.variant)?;

        let best = detections
            .iter()
            .map(|d| (d, self.region.iou(d)))
            .filter(|(_, iou)| *iou >= MATCH_IOU)
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        match best {
            Some((detection, iou)) => {
                self.region = *detection;
                self.confidence = iou as f32;
            }
            None => self.confidence *= LOSS_DECAY,
        }
        Ok(self.confidence)
    }

    fn position(&self) -> Rect {
        self.region
    }
}
