/// Axis-aligned rectangle.
///
/// Used both for texture-space pixel rects (sprite frames, atlas placements;
/// top-left origin, +Y down) and node-local geometry. The struct does not care
/// which; callers do.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub fn max_x(self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn max_y(self) -> f32 {
        self.y + self.height
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Normalizes the rectangle so width/height are non-negative.
    #[inline]
    pub fn normalized(self) -> Self {
        let mut r = self;
        if r.width < 0.0 {
            r.x += r.width;
            r.width = -r.width;
        }
        if r.height < 0.0 {
            r.y += r.height;
            r.height = -r.height;
        }
        r
    }

    /// Grows the rect by `pad` on every side.
    #[inline]
    pub fn expanded(self, pad: f32) -> Self {
        Rect::new(self.x - pad, self.y - pad, self.width + 2.0 * pad, self.height + 2.0 * pad)
    }

    /// True when the interiors overlap. Shared edges do not count.
    #[inline]
    pub fn overlaps(self, other: Rect) -> bool {
        let a = self.normalized();
        let b = other.normalized();
        a.x < b.max_x() && b.x < a.max_x() && a.y < b.max_y() && b.y < a.max_y()
    }

    #[inline]
    pub fn contains_rect(self, other: Rect) -> bool {
        let a = self.normalized();
        let b = other.normalized();
        b.x >= a.x && b.y >= a.y && b.max_x() <= a.max_x() && b.max_y() <= a.max_y()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: f32, y: f32, w: f32, h: f32) -> Rect { Rect::new(x, y, w, h) }

    // ── normalized ────────────────────────────────────────────────────────

    #[test]
    fn normalized_positive_is_identity() {
        let rect = r(1.0, 2.0, 10.0, 20.0);
        assert_eq!(rect.normalized(), rect);
    }

    #[test]
    fn normalized_negative_extent() {
        let n = r(10.0, 10.0, -4.0, -3.0).normalized();
        assert_eq!(n, r(6.0, 7.0, 4.0, 3.0));
    }

    // ── overlaps ──────────────────────────────────────────────────────────

    #[test]
    fn overlapping_rects() {
        assert!(r(0.0, 0.0, 10.0, 10.0).overlaps(r(5.0, 5.0, 10.0, 10.0)));
    }

    #[test]
    fn touching_edge_is_not_overlap() {
        assert!(!r(0.0, 0.0, 10.0, 10.0).overlaps(r(10.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn expanded_touching_rects_overlap() {
        let a = r(0.0, 0.0, 10.0, 10.0).expanded(1.0);
        let b = r(10.0, 0.0, 10.0, 10.0).expanded(1.0);
        assert!(a.overlaps(b));
    }

    // ── containment / emptiness ───────────────────────────────────────────

    #[test]
    fn contains_inner_rect() {
        assert!(r(0.0, 0.0, 100.0, 100.0).contains_rect(r(10.0, 10.0, 20.0, 20.0)));
        assert!(!r(0.0, 0.0, 100.0, 100.0).contains_rect(r(90.0, 90.0, 20.0, 20.0)));
    }

    #[test]
    fn is_empty_zero_size() {
        assert!(r(0.0, 0.0, 0.0, 5.0).is_empty());
        assert!(!r(0.0, 0.0, 1.0, 1.0).is_empty());
    }
}
