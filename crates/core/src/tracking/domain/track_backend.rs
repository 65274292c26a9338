use crate::error::FaceError;
use crate::shared::frame::Frame;
use crate::shared::geometry::Rect;

/// Factory side of the tracking capability: binds a starting region on a
/// frame to a live context.
pub trait TrackingBackend: Send + Sync {
    fn start_track(&self, frame: &Frame, region: Rect)
        -> Result<Box<dyn TrackContext>, FaceError>;
}

/// Backend-owned state of one in-progress track.
///
/// Inherently sequential — frame N+1 depends on frame N — hence
/// `&mut self` on `update`.
pub trait TrackContext: Send {
    /// Advance by one frame; returns the continuation confidence
    /// (backend-defined range, higher means more confident).
    fn update(&mut self, frame: &Frame) -> Result<f32, FaceError>;

    /// The most recently computed region.
    fn position(&self) -> Rect;
}
