use std::sync::{Arc, PoisonError, RwLock};

use crate::error::FaceError;
use crate::recognition::domain::descriptor::Descriptor;
use crate::recognition::domain::face::Face;
use crate::recognition::domain::sample_set::SampleSet;
use crate::recognition::domain::vision_backend::{DetectorVariant, Gender, VisionBackend};
use crate::shared::frame::Frame;
use crate::shared::image_source::ImageSource;

/// Detection, descriptor extraction and identity classification over one
/// vision backend.
///
/// Safe to share across threads: detection and classification take
/// `&self`, and `set_samples` swaps the sample set atomically. Dropping
/// the recognizer releases the backend handle; each recognizer's sample
/// set is independent of every other instance.
pub struct Recognizer {
    backend: Arc<dyn VisionBackend>,
    samples: RwLock<SampleSet>,
}

impl Recognizer {
    pub fn new(backend: Arc<dyn VisionBackend>) -> Self {
        Self {
            backend,
            samples: RwLock::new(SampleSet::new()),
        }
    }

    /// Detect faces, sorted left to right by the box's left edge (backend
    /// order breaks ties). The returned faces carry only rectangles;
    /// `recognize` fills descriptors and landmarks.
    pub fn detect(
        &self,
        source: ImageSource<'_>,
        variant: DetectorVariant,
    ) -> Result<Vec<Face>, FaceError> {
        let frame = Arc::new(source.decode()?);
        let mut rects = self.backend.detect(&frame, variant)?;
        rects.sort_by_key(|r| r.x0);
        Ok(rects
            .into_iter()
            .map(|rect| Face::detected(Arc::clone(&frame), rect))
            .collect())
    }

    /// Compute the face's descriptor and landmarks in place. Calling again
    /// recomputes and overwrites.
    pub fn recognize(&self, face: &mut Face) -> Result<(), FaceError> {
        let frame = checked_source(face)?;
        let (descriptor, landmarks) = self.backend.compute_descriptor(&frame, face.rect)?;
        face.set_recognition(descriptor, landmarks);
        Ok(())
    }

    /// Estimate the face's age and store it on the face. Independent of
    /// `recognize`; only needs the face's source pixels to be live.
    pub fn estimate_age(&self, face: &mut Face) -> Result<u32, FaceError> {
        let frame = checked_source(face)?;
        let age = self.backend.estimate_age(&frame, face.rect)?;
        face.set_age(age);
        Ok(age)
    }

    /// Estimate the face's gender and store it on the face.
    pub fn estimate_gender(&self, face: &mut Face) -> Result<Gender, FaceError> {
        let frame = checked_source(face)?;
        let gender = self.backend.estimate_gender(&frame, face.rect)?;
        face.set_gender(gender);
        Ok(gender)
    }

    /// Replace the known-sample set used by the classification calls.
    ///
    /// Empty input or mismatched lengths leave the current set unchanged
    /// (logged, not an error). The swap is atomic: readers see either the
    /// old set or the new one, never a mix.
    pub fn set_samples(&self, descriptors: Vec<Descriptor>, categories: Vec<i32>) {
        let (n_descriptors, n_categories) = (descriptors.len(), categories.len());
        let replaced = self
            .samples
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(descriptors, categories);
        if !replaced {
            log::warn!(
                "ignoring sample replacement: {n_descriptors} descriptors vs {n_categories} categories"
            );
        }
    }

    /// Category of the stored sample nearest to `query`; `-1` iff no
    /// samples have been set.
    pub fn classify(&self, query: &Descriptor) -> i32 {
        self.samples
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .classify(query)
    }

    /// Like `classify`, but `-1` when the nearest squared distance exceeds
    /// `tolerance`. Start with 0.6 if unsure.
    pub fn classify_with_tolerance(&self, query: &Descriptor, tolerance: f32) -> i32 {
        self.samples
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .classify_with_tolerance(query, tolerance)
    }

    pub fn samples_len(&self) -> usize {
        self.samples
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// The face's retained source frame, after the guards every backend call
/// shares: the face must not be closed and its rectangle must be a proper
/// region inside that frame.
fn checked_source(face: &Face) -> Result<Arc<Frame>, FaceError> {
    let frame = face
        .source()
        .ok_or_else(|| FaceError::Recognize("face image already released".into()))?;
    if face.rect.is_empty() {
        return Err(FaceError::Recognize("degenerate face region".into()));
    }
    if !face.rect.fits_within(frame.width(), frame.height()) {
        return Err(FaceError::Recognize(
            "face region outside the source frame".into(),
        ));
    }
    Ok(frame)
}
