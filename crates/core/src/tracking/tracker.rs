use std::sync::Arc;

use crate::error::FaceError;
use crate::shared::geometry::Rect;
use crate::shared::image_source::ImageSource;
use crate::tracking::domain::track_backend::{TrackContext, TrackingBackend};

/// Single-object tracker over one tracking backend.
///
/// Holds at most one live track; `start` discards the previous one. Loss
/// is not an error or a state: `update` keeps returning a continuation
/// confidence and the caller decides at which floor to give up and
/// re-`start`. `&mut self` on the frame-advancing calls keeps updates
/// sequential; independent trackers run in parallel freely.
pub struct Tracker {
    backend: Arc<dyn TrackingBackend>,
    context: Option<Box<dyn TrackContext>>,
    last_position: Option<Rect>,
    last_confidence: f32,
}

impl Tracker {
    pub fn new(backend: Arc<dyn TrackingBackend>) -> Self {
        Self {
            backend,
            context: None,
            last_position: None,
            last_confidence: 0.0,
        }
    }

    /// Begin tracking `region` on `source`. Any previous track is
    /// discarded, not merged; an undecodable frame fails before the
    /// previous track is touched.
    pub fn start(&mut self, source: ImageSource<'_>, region: Rect) -> Result<(), FaceError> {
        let frame = source.decode()?;
        // Release the previous context before acquiring the next one.
        self.context = None;
        let context = self.backend.start_track(&frame, region)?;
        self.last_position = Some(context.position());
        self.last_confidence = 0.0;
        self.context = Some(context);
        Ok(())
    }

    /// Advance one frame; returns the new continuation confidence.
    /// Valid only after a successful `start`.
    pub fn update(&mut self, source: ImageSource<'_>) -> Result<f32, FaceError> {
        let context = self
            .context
            .as_mut()
            .ok_or_else(|| FaceError::Recognize("tracker has not been started".into()))?;
        let frame = source.decode()?;
        let confidence = context.update(&frame)?;
        self.last_position = Some(context.position());
        self.last_confidence = confidence;
        Ok(confidence)
    }

    /// Most recently computed region. Survives confidence collapse; fails
    /// only before the first successful `start`.
    pub fn position(&self) -> Result<Rect, FaceError> {
        self.last_position
            .ok_or_else(|| FaceError::Recognize("tracker has no position yet".into()))
    }

    /// Confidence reported by the last `update`, 0.0 right after `start`.
    pub fn confidence(&self) -> f32 {
        self.last_confidence
    }

    pub fn is_tracking(&self) -> bool {
        self.context.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame::Frame;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend whose contexts replay a scripted confidence sequence and
    /// drift their region one pixel right per update.
    struct ScriptedTracking {
        confidences: Vec<f32>,
        started: AtomicUsize,
    }

    impl ScriptedTracking {
        fn with_confidences(confidences: Vec<f32>) -> Arc<Self> {
            Arc::new(Self {
                confidences,
                started: AtomicUsize::new(0),
            })
        }
    }

    impl TrackingBackend for ScriptedTracking {
        fn start_track(
            &self,
            _frame: &Frame,
            region: Rect,
        ) -> Result<Box<dyn TrackContext>, FaceError> {
            if region.is_empty() {
                return Err(FaceError::Recognize("cannot track an empty region".into()));
            }
            self.started.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedContext {
                confidences: self.confidences.clone(),
                step: 0,
                region,
            }))
        }
    }

    struct ScriptedContext {
        confidences: Vec<f32>,
        step: usize,
        region: Rect,
    }

    impl TrackContext for ScriptedContext {
        fn update(&mut self, _frame: &Frame) -> Result<f32, FaceError> {
            let confidence = self.confidences[self.step.min(self.confidences.len() - 1)];
            self.step += 1;
            self.region = Rect::new(
                self.region.x0 + 1,
                self.region.y0,
                self.region.x1 + 1,
                self.region.y1,
            );
            Ok(confidence)
        }

        fn position(&self) -> Rect {
            self.region
        }
    }

    fn frame() -> Frame {
        Frame::new(vec![0u8; 64 * 64 * 3], 64, 64)
    }

    const REGION: Rect = Rect {
        x0: 10,
        y0: 10,
        x1: 30,
        y1: 30,
    };

    // ── lifecycle ────────────────────────────────────────────────────

    #[test]
    fn test_update_before_start_fails() {
        let mut tracker = Tracker::new(ScriptedTracking::with_confidences(vec![1.0]));
        let input = frame();
        let err = tracker.update(ImageSource::Frame(&input)).unwrap_err();
        assert!(matches!(err, FaceError::Recognize(_)));
    }

    #[test]
    fn test_position_before_start_fails() {
        let tracker = Tracker::new(ScriptedTracking::with_confidences(vec![1.0]));
        assert!(tracker.position().is_err());
        assert!(!tracker.is_tracking());
    }

    #[test]
    fn test_start_then_update_reports_position_and_confidence() {
        let mut tracker = Tracker::new(ScriptedTracking::with_confidences(vec![0.9, 0.8]));
        let input = frame();

        tracker.start(ImageSource::Frame(&input), REGION).unwrap();
        assert!(tracker.is_tracking());
        assert_eq!(tracker.position().unwrap(), REGION);

        let confidence = tracker.update(ImageSource::Frame(&input)).unwrap();
        assert_eq!(confidence, 0.9);
        assert_eq!(tracker.confidence(), 0.9);
        assert_eq!(tracker.position().unwrap().x0, REGION.x0 + 1);
    }

    #[test]
    fn test_confidence_decay_keeps_last_position() {
        // Object leaves the frame: confidence slides toward zero while
        // the position freezes at the last computed region.
        let mut tracker =
            Tracker::new(ScriptedTracking::with_confidences(vec![0.9, 0.5, 0.2, 0.05]));
        let input = frame();
        tracker.start(ImageSource::Frame(&input), REGION).unwrap();

        let mut previous = f32::INFINITY;
        for _ in 0..4 {
            let confidence = tracker.update(ImageSource::Frame(&input)).unwrap();
            assert!(confidence <= previous);
            previous = confidence;
        }
        assert!(tracker.confidence() < 0.1);
        assert!(tracker.position().is_ok());
    }

    #[test]
    fn test_start_discards_previous_track() {
        let backend = ScriptedTracking::with_confidences(vec![0.9]);
        let mut tracker = Tracker::new(Arc::clone(&backend) as Arc<dyn TrackingBackend>);
        let input = frame();

        tracker.start(ImageSource::Frame(&input), REGION).unwrap();
        tracker.update(ImageSource::Frame(&input)).unwrap();

        let other = Rect::new(40, 40, 60, 60);
        tracker.start(ImageSource::Frame(&input), other).unwrap();
        assert_eq!(backend.started.load(Ordering::SeqCst), 2);
        // Position and confidence reflect the fresh track, not the old one.
        assert_eq!(tracker.position().unwrap(), other);
        assert_eq!(tracker.confidence(), 0.0);
    }

    #[test]
    fn test_start_with_empty_image_fails_without_touching_state() {
        let mut tracker = Tracker::new(ScriptedTracking::with_confidences(vec![0.9]));
        let input = frame();
        tracker.start(ImageSource::Frame(&input), REGION).unwrap();
        tracker.update(ImageSource::Frame(&input)).unwrap();
        let position = tracker.position().unwrap();

        let err = tracker.start(ImageSource::Bytes(&[]), REGION).unwrap_err();
        assert!(matches!(err, FaceError::ImageLoad(_)));
        assert!(tracker.is_tracking());
        assert_eq!(tracker.position().unwrap(), position);
    }

    #[test]
    fn test_failed_start_allows_recovery() {
        let backend = ScriptedTracking::with_confidences(vec![0.7]);
        let mut tracker = Tracker::new(backend);
        let input = frame();

        let degenerate = Rect::new(5, 5, 5, 5);
        assert!(tracker
            .start(ImageSource::Frame(&input), degenerate)
            .is_err());
        assert!(!tracker.is_tracking());

        tracker.start(ImageSource::Frame(&input), REGION).unwrap();
        assert_eq!(tracker.update(ImageSource::Frame(&input)).unwrap(), 0.7);
    }

    #[test]
    fn test_update_with_bad_image_preserves_track() {
        let mut tracker = Tracker::new(ScriptedTracking::with_confidences(vec![0.9, 0.8]));
        let input = frame();
        tracker.start(ImageSource::Frame(&input), REGION).unwrap();
        tracker.update(ImageSource::Frame(&input)).unwrap();

        let err = tracker.update(ImageSource::Bytes(&[])).unwrap_err();
        assert!(matches!(err, FaceError::ImageLoad(_)));
        assert_eq!(tracker.confidence(), 0.9);
        assert_eq!(tracker.update(ImageSource::Frame(&input)).unwrap(), 0.8);
    }
}
