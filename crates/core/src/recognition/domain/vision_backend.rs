use crate::error::FaceError;
use crate::recognition::domain::descriptor::Descriptor;
use crate::shared::frame::Frame;
use crate::shared::geometry::{Point, Rect};

/// Which backend detector to run.
///
/// `Frontal` is the fast default; `Cnn` trades latency for recall on
/// small or rotated faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectorVariant {
    Frontal,
    Cnn,
}

/// Binary gender estimate from the demographic head.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gender {
    Female,
    Male,
}

/// The external vision capability: everything the models do.
///
/// Implementations must tolerate concurrent calls; model state is
/// read-only after construction.
pub trait VisionBackend: Send + Sync {
    /// Face bounding boxes on the frame, in backend order.
    fn detect(&self, frame: &Frame, variant: DetectorVariant) -> Result<Vec<Rect>, FaceError>;

    /// Descriptor and landmark points for one face region.
    fn compute_descriptor(
        &self,
        frame: &Frame,
        rect: Rect,
    ) -> Result<(Descriptor, Vec<Point>), FaceError>;

    fn estimate_age(&self, frame: &Frame, rect: Rect) -> Result<u32, FaceError>;

    fn estimate_gender(&self, frame: &Frame, rect: Rect) -> Result<Gender, FaceError>;
}
