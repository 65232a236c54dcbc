//! Greedy strip packer used to lay out one atlas page.

pub const DEFAULT_PADDING: u32 = 3;

/// Places rectangles one after another, growing the packed area in
/// whichever direction keeps it closest to square.
///
/// Every rectangle is followed by `padding` empty pixels on the right and
/// bottom, and the packed area starts with `padding` pixels on the top and
/// left, so neighbours never touch.
#[derive(Clone, Debug)]
pub struct RectanglePack {
    padding: u32,
    width: u32,
    height: u32,
    x: u32,
    y: u32,
}

impl Default for RectanglePack {
    fn default() -> Self {
        Self::new(DEFAULT_PADDING)
    }
}

impl RectanglePack {
    pub fn new(padding: u32) -> Self {
        Self {
            padding,
            width: padding,
            height: padding,
            x: padding,
            y: padding,
        }
    }

    pub fn padding(&self) -> u32 {
        self.padding
    }

    /// Packed width; covers every rectangle placed so far, padding included.
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the top-left corner of the new `width` × `height` rect.
    pub fn add_rect(&mut self, width: u32, height: u32) -> (u32, u32) {
        let w = width + self.padding;
        let h = height + self.padding;
        let (x, y) = (self.x as i64, self.y as i64);
        let (packed_w, packed_h) = (self.width as i64, self.height as i64);
        let area = (packed_w - x) * (packed_h - y);
        if (x + w as i64 - packed_w) * y > area || (y + h as i64 - packed_h) * x > area {
            // Open a new strip along the shorter side.
            if self.width <= self.height {
                self.x = self.width;
                self.y = self.padding;
                self.width += w;
            } else {
                self.x = self.padding;
                self.y = self.height;
                self.height += h;
            }
        }
        let point = (self.x, self.y);
        let overflow_x = self.x as i64 + w as i64 - self.width as i64;
        let overflow_y = self.y as i64 + h as i64 - self.height as i64;
        if overflow_x < overflow_y {
            self.x += w;
        } else {
            self.y += h;
        }
        self.width = self.width.max(point.0 + w);
        self.height = self.height.max(point.1 + h);
        point
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.padding);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_padding() {
        let pack = RectanglePack::default();
        assert_eq!(pack.padding(), 3);
        assert_eq!((pack.width(), pack.height()), (3, 3));
    }

    #[test]
    fn test_placements() {
        let mut pack = RectanglePack::default();
        assert_eq!(pack.add_rect(10, 10), (3, 3));
        assert_eq!((pack.width(), pack.height()), (16, 16));
        assert_eq!(pack.add_rect(10, 10), (16, 3));
        assert_eq!(pack.add_rect(10, 10), (3, 16));
        assert_eq!((pack.width(), pack.height()), (29, 29));
        assert_eq!(pack.add_rect(20, 5), (16, 16));
        assert_eq!((pack.width(), pack.height()), (39, 29));
    }

    #[test]
    fn test_equal_squares_pack_tightly() {
        let mut pack = RectanglePack::new(0);
        let points: Vec<_> = (0..4).map(|_| pack.add_rect(4, 4)).collect();
        assert_eq!(points, vec![(0, 0), (0, 4), (4, 0), (4, 4)]);
        assert_eq!((pack.width(), pack.height()), (8, 8));
    }

    #[test]
    fn test_no_overlap_and_within_bounds() {
        let mut pack = RectanglePack::default();
        let mut placed = Vec::new();
        // Deterministic mix of shapes.
        for i in 0..200u32 {
            let width = (i * 7) % 31 + 1;
            let height = (i * 13) % 23 + 1;
            let (x, y) = pack.add_rect(width, height);
            placed.push((x, y, x + width + 3, y + height + 3));
        }
        for (i, a) in placed.iter().enumerate() {
            assert!(a.2 <= pack.width() && a.3 <= pack.height());
            for b in &placed[i + 1..] {
                let overlaps = a.0 < b.2 && b.0 < a.2 && a.1 < b.3 && b.1 < a.3;
                assert!(!overlaps, "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn test_reset() {
        let mut pack = RectanglePack::new(2);
        pack.add_rect(10, 10);
        pack.reset();
        assert_eq!((pack.width(), pack.height()), (2, 2));
        assert_eq!(pack.add_rect(1, 1), (2, 2));
    }
}
