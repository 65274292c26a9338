/// Axis-aligned box in source-image pixel coordinates.
///
/// Corners satisfy `x0 <= x1`, `y0 <= y1`; the constructor reorders
/// swapped corners. Produced by detection, immutable once created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Rect {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> i32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> i32 {
        self.y1 - self.y0
    }

    /// Degenerate: zero area.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Whole box lies inside a `width` x `height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x0 >= 0 && self.y0 >= 0 && self.x1 <= width as i32 && self.y1 <= height as i32
    }

    /// Intersection with the `width` x `height` image bounds.
    pub fn clamped_to(&self, width: u32, height: u32) -> Rect {
        Rect {
            x0: self.x0.clamp(0, width as i32),
            y0: self.y0.clamp(0, height as i32),
            x1: self.x1.clamp(0, width as i32),
            y1: self.y1.clamp(0, height as i32),
        }
    }

    pub fn iou(&self, other: &Rect) -> f64 {
        let ix0 = self.x0.max(other.x0);
        let iy0 = self.y0.max(other.y0);
        let ix1 = self.x1.min(other.x1);
        let iy1 = self.y1.min(other.y1);

        let inter = (ix1 - ix0).max(0) as f64 * (iy1 - iy0).max(0) as f64;
        if inter == 0.0 {
            return 0.0;
        }

        let area_a = self.width() as f64 * self.height() as f64;
        let area_b = other.width() as f64 * other.height() as f64;
        inter / (area_a + area_b - inter)
    }
}

/// Integer pixel coordinate; element of a landmark sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    // ── Construction ─────────────────────────────────────────────────

    #[test]
    fn test_new_normalizes_swapped_corners() {
        let r = Rect::new(100, 80, 10, 20);
        assert_eq!(r, Rect::new(10, 20, 100, 80));
        assert_eq!(r.width(), 90);
        assert_eq!(r.height(), 60);
    }

    #[rstest]
    #[case::zero_width(Rect::new(10, 10, 10, 50), true)]
    #[case::zero_height(Rect::new(10, 10, 50, 10), true)]
    #[case::zero_both(Rect::new(0, 0, 0, 0), true)]
    #[case::proper(Rect::new(0, 0, 1, 1), false)]
    fn test_is_empty(#[case] r: Rect, #[case] expected: bool) {
        assert_eq!(r.is_empty(), expected);
    }

    // ── Bounds ───────────────────────────────────────────────────────

    #[test]
    fn test_fits_within_inside() {
        assert!(Rect::new(0, 0, 100, 100).fits_within(100, 100));
        assert!(Rect::new(10, 20, 30, 40).fits_within(100, 100));
    }

    #[rstest]
    #[case::negative_origin(Rect::new(-1, 0, 50, 50))]
    #[case::past_right(Rect::new(0, 0, 101, 50))]
    #[case::past_bottom(Rect::new(0, 0, 50, 101))]
    fn test_fits_within_outside(#[case] r: Rect) {
        assert!(!r.fits_within(100, 100));
    }

    #[test]
    fn test_clamped_to_crops_overhang() {
        let r = Rect::new(-20, 50, 120, 150).clamped_to(100, 100);
        assert_eq!(r, Rect::new(0, 50, 100, 100));
    }

    #[test]
    fn test_clamped_to_fully_outside_is_empty() {
        let r = Rect::new(200, 200, 300, 300).clamped_to(100, 100);
        assert!(r.is_empty());
    }

    // ── IoU ──────────────────────────────────────────────────────────

    #[test]
    fn test_iou_identical() {
        let a = Rect::new(10, 10, 110, 110);
        assert_relative_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = Rect::new(0, 0, 50, 50);
        let b = Rect::new(100, 100, 150, 150);
        assert_relative_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        // intersection 50x100 = 5000, union 15000
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(50, 0, 150, 100);
        assert_relative_eq!(a.iou(&b), 5000.0 / 15000.0);
    }

    #[test]
    fn test_iou_touching_edges() {
        let a = Rect::new(0, 0, 50, 50);
        let b = Rect::new(50, 0, 100, 50);
        assert_relative_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_symmetric() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(30, 30, 160, 90);
        assert_relative_eq!(a.iou(&b), b.iou(&a));
    }

    #[rstest]
    #[case::zero_width(Rect::new(0, 0, 0, 100))]
    #[case::zero_height(Rect::new(0, 0, 100, 0))]
    fn test_iou_degenerate_is_zero(#[case] a: Rect) {
        let b = Rect::new(0, 0, 50, 50);
        assert_relative_eq!(a.iou(&b), 0.0);
    }
}
