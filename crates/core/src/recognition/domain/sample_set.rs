use crate::recognition::domain::descriptor::{squared_euclidean_distance, Descriptor};

/// Sentinel returned by the classification calls when nothing matches.
pub const NO_MATCH: i32 = -1;

/// Reference samples for nearest-neighbor identity classification.
///
/// Holds (descriptor, category) pairs supplied by the caller. Lookups
/// never mutate the set; `replace` swaps the whole set at once and the
/// old samples are discarded, not merged.
#[derive(Clone, Debug, Default)]
pub struct SampleSet {
    descriptors: Vec<Descriptor>,
    categories: Vec<i32>,
}

impl SampleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Replace the whole set.
    ///
    /// Empty input or a descriptor/category length mismatch leaves the
    /// current set unchanged and reports `false`: a stale but usable
    /// classifier beats a crash on a caller bug.
    pub fn replace(&mut self, descriptors: Vec<Descriptor>, categories: Vec<i32>) -> bool {
        if descriptors.is_empty() || descriptors.len() != categories.len() {
            return false;
        }
        self.descriptors = descriptors;
        self.categories = categories;
        true
    }

    /// Index and squared distance of the sample nearest to `query`.
    /// Equal distances resolve to the lowest index.
    pub fn nearest(&self, query: &Descriptor) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, sample) in self.descriptors.iter().enumerate() {
            let dist = squared_euclidean_distance(sample, query);
            match best {
                Some((_, best_dist)) if dist >= best_dist => {}
                _ => best = Some((idx, dist)),
            }
        }
        best
    }

    /// Category of the nearest sample; `NO_MATCH` iff the set is empty.
    pub fn classify(&self, query: &Descriptor) -> i32 {
        match self.nearest(query) {
            Some((idx, _)) => self.categories[idx],
            None => NO_MATCH,
        }
    }

    /// Like `classify`, but `NO_MATCH` when the nearest squared distance
    /// exceeds `tolerance`.
    ///
    /// `tolerance` is compared against the squared distance directly;
    /// 0.6 is a good starting point for the bundled embedding model.
    pub fn classify_with_tolerance(&self, query: &Descriptor, tolerance: f32) -> i32 {
        match self.nearest(query) {
            Some((idx, dist)) if dist <= f64::from(tolerance) => self.categories[idx],
            _ => NO_MATCH,
        }
    }
}
