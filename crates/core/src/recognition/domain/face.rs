use std::sync::Arc;

use crate::recognition::domain::descriptor::Descriptor;
use crate::recognition::domain::vision_backend::Gender;
use crate::shared::frame::Frame;
use crate::shared::geometry::{Point, Rect};

/// A detected face and whatever later stages have filled in.
///
/// Detection produces a face carrying only its rectangle. A subsequent
/// `Recognizer::recognize` fills descriptor and landmarks in place; the
/// demographic calls fill age and gender. Every face from one detect call
/// keeps the decoded source frame alive through a shared handle so those
/// later stages can run without re-decoding.
///
/// `close` releases this face's hold on the shared pixels; after that,
/// backend calls on the face fail instead of touching freed data. Dropping
/// the face releases implicitly.
#[derive(Clone, Debug)]
pub struct Face {
    source: Option<Arc<Frame>>,
    pub rect: Rect,
    landmarks: Vec<Point>,
    descriptor: Option<Descriptor>,
    age: Option<u32>,
    gender: Option<Gender>,
}

impl Face {
    /// A face without retained pixels, e.g. rebuilt from a stored
    /// descriptor. Behaves as already closed.
    pub fn new(rect: Rect, descriptor: Descriptor) -> Self {
        Self {
            source: None,
            rect,
            landmarks: Vec::new(),
            descriptor: Some(descriptor),
            age: None,
            gender: None,
        }
    }

    pub(crate) fn detected(source: Arc<Frame>, rect: Rect) -> Self {
        Self {
            source: Some(source),
            rect,
            landmarks: Vec::new(),
            descriptor: None,
            age: None,
            gender: None,
        }
    }

    /// Landmark points, empty until `recognize` has run.
    pub fn landmarks(&self) -> &[Point] {
        &self.landmarks
    }

    /// Descriptor, absent until `recognize` has run.
    pub fn descriptor(&self) -> Option<&Descriptor> {
        self.descriptor.as_ref()
    }

    pub fn age(&self) -> Option<u32> {
        self.age
    }

    pub fn gender(&self) -> Option<Gender> {
        self.gender
    }

    /// Release this face's hold on the shared source pixels. Safe to call
    /// any number of times; only the first has an effect.
    pub fn close(&mut self) {
        self.source = None;
    }

    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }

    pub(crate) fn source(&self) -> Option<Arc<Frame>> {
        self.source.clone()
    }

    pub(crate) fn set_recognition(&mut self, descriptor: Descriptor, landmarks: Vec<Point>) {
        self.descriptor = Some(descriptor);
        self.landmarks = landmarks;
    }

    pub(crate) fn set_age(&mut self, age: u32) {
        self.age = Some(age);
    }

    pub(crate) fn set_gender(&mut self, gender: Gender) {
        self.gender = Some(gender);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::domain::descriptor::DESCRIPTOR_LEN;

    fn frame() -> Arc<Frame> {
        Arc::new(Frame::new(vec![0u8; 12], 2, 2))
    }

    #[test]
    fn test_detected_face_carries_only_rect() {
        let face = Face::detected(frame(), Rect::new(0, 0, 2, 2));
        assert!(!face.is_closed());
        assert!(face.descriptor().is_none());
        assert!(face.landmarks().is_empty());
        assert!(face.age().is_none());
        assert!(face.gender().is_none());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut face = Face::detected(frame(), Rect::new(0, 0, 2, 2));
        face.close();
        assert!(face.is_closed());
        face.close();
        face.close();
        assert!(face.is_closed());
    }

    #[test]
    fn test_close_releases_shared_pixels() {
        let source = frame();
        let mut face = Face::detected(Arc::clone(&source), Rect::new(0, 0, 2, 2));
        assert_eq!(Arc::strong_count(&source), 2);
        face.close();
        assert_eq!(Arc::strong_count(&source), 1);
    }

    #[test]
    fn test_drop_releases_shared_pixels() {
        let source = frame();
        {
            let _face = Face::detected(Arc::clone(&source), Rect::new(0, 0, 2, 2));
            assert_eq!(Arc::strong_count(&source), 2);
        }
        assert_eq!(Arc::strong_count(&source), 1);
    }

    #[test]
    fn test_rebuilt_face_is_closed() {
        let face = Face::new(
            Rect::new(0, 0, 10, 10),
            Descriptor::new([0.0; DESCRIPTOR_LEN]),
        );
        assert!(face.is_closed());
        assert!(face.descriptor().is_some());
    }

    #[test]
    fn test_recognition_overwrites_previous_result() {
        let mut face = Face::detected(frame(), Rect::new(0, 0, 2, 2));
        face.set_recognition(
            Descriptor::new([1.0; DESCRIPTOR_LEN]),
            vec![Point::new(1, 1)],
        );
        face.set_recognition(
            Descriptor::new([2.0; DESCRIPTOR_LEN]),
            vec![Point::new(3, 3), Point::new(4, 4)],
        );
        assert_eq!(face.descriptor().unwrap().as_slice()[0], 2.0);
        assert_eq!(face.landmarks().len(), 2);
    }
}
