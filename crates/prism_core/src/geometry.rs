//! Geometry types shared by the filter compositor
//!
//! Points, sizes and rectangles are expressed in working-buffer pixels unless
//! a function says otherwise.

/// 2D point
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 2D size
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Convert to a Rect at the origin (0, 0)
    pub const fn to_rect(self) -> Rect {
        Rect {
            origin: Point::ZERO,
            size: self,
        }
    }

    /// Height over width, the aspect correction used by the mapping matrix
    pub fn ratio(&self) -> f32 {
        self.height / self.width
    }

    /// Whole-pixel extent for texture allocation (at least 1x1)
    pub fn to_extent(&self) -> (u32, u32) {
        (
            self.width.ceil().max(1.0) as u32,
            self.height.ceil().max(1.0) as u32,
        )
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Size::new(width as f32, height as f32)
    }
}

impl From<Size> for Rect {
    /// Convert Size to Rect at origin (0, 0)
    fn from(size: Size) -> Self {
        size.to_rect()
    }
}

/// 2D rectangle
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        origin: Point::ZERO,
        size: Size::ZERO,
    };

    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn x(&self) -> f32 {
        self.origin.x
    }

    pub fn y(&self) -> f32 {
        self.origin.y
    }

    pub fn width(&self) -> f32 {
        self.size.width
    }

    pub fn height(&self) -> f32 {
        self.size.height
    }

    pub fn right(&self) -> f32 {
        self.origin.x + self.size.width
    }

    pub fn bottom(&self) -> f32 {
        self.origin.y + self.size.height
    }

    /// Get the size of this rect
    pub fn size(&self) -> Size {
        self.size
    }

    /// True when the rect covers no pixels
    pub fn is_empty(&self) -> bool {
        self.size.width <= 0.0 || self.size.height <= 0.0
    }
}

/// Clamp a filter region into the working buffer `[0, 0] - [bounds.width, bounds.height]`.
///
/// A negative origin is pushed to zero and the same amount is taken off the
/// extent, so the far edge stays where it was. Overflow past the right or
/// bottom edge shrinks the extent. Extents never go below zero: a region
/// entirely outside the buffer comes back degenerate, not rejected.
///
/// Applying the clamp twice gives the same rect as applying it once.
pub fn cap_filter_area(area: &mut Rect, bounds: Size) {
    if area.origin.x < 0.0 {
        area.size.width += area.origin.x;
        area.origin.x = 0.0;
    }

    if area.origin.y < 0.0 {
        area.size.height += area.origin.y;
        area.origin.y = 0.0;
    }

    if area.right() > bounds.width {
        area.size.width = bounds.width - area.origin.x;
    }

    if area.bottom() > bounds.height {
        area.size.height = bounds.height - area.origin.y;
    }

    area.size.width = area.size.width.max(0.0);
    area.size.height = area.size.height.max(0.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const WORKING: Size = Size::new(800.0, 600.0);

    #[test]
    fn negative_origin_shrinks_extent() {
        let mut area = Rect::new(-10.0, 50.0, 100.0, 100.0);
        cap_filter_area(&mut area, WORKING);
        assert_eq!(area, Rect::new(0.0, 50.0, 90.0, 100.0));
    }

    #[test]
    fn overflow_clips_far_edge() {
        let mut area = Rect::new(700.0, 550.0, 200.0, 200.0);
        cap_filter_area(&mut area, WORKING);
        assert_eq!(area, Rect::new(700.0, 550.0, 100.0, 50.0));
    }

    #[test]
    fn oversized_region_fills_buffer() {
        let mut area = Rect::new(-50.0, -50.0, 2000.0, 2000.0);
        cap_filter_area(&mut area, WORKING);
        assert_eq!(area, WORKING.to_rect());
    }

    #[test]
    fn region_outside_buffer_is_degenerate() {
        let mut right = Rect::new(900.0, 10.0, 50.0, 50.0);
        cap_filter_area(&mut right, WORKING);
        assert!(right.is_empty());

        let mut above = Rect::new(10.0, -200.0, 50.0, 50.0);
        cap_filter_area(&mut above, WORKING);
        assert_eq!(above.height(), 0.0);
        assert_eq!(above.y(), 0.0);
    }

    #[test]
    fn inside_region_untouched() {
        let mut area = Rect::new(10.0, 20.0, 30.0, 40.0);
        cap_filter_area(&mut area, WORKING);
        assert_eq!(area, Rect::new(10.0, 20.0, 30.0, 40.0));
    }

    #[test]
    fn size_extent_rounds_up() {
        assert_eq!(Size::new(799.2, 0.0).to_extent(), (800, 1));
        assert_eq!(Size::from((800, 600)), WORKING);
    }

    fn any_rect() -> impl Strategy<Value = Rect> {
        (
            -2000.0f32..2000.0,
            -2000.0f32..2000.0,
            0.0f32..3000.0,
            0.0f32..3000.0,
        )
            .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
    }

    proptest! {
        #[test]
        fn clamp_is_idempotent(rect in any_rect()) {
            let mut once = rect;
            cap_filter_area(&mut once, WORKING);
            let mut twice = once;
            cap_filter_area(&mut twice, WORKING);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn negative_x_moves_to_zero(x in -2000.0f32..-0.001, w in 0.0f32..700.0) {
            let mut area = Rect::new(x, 0.0, w, 10.0);
            cap_filter_area(&mut area, WORKING);
            prop_assert_eq!(area.x(), 0.0);
            prop_assert_eq!(area.width(), (w + x).max(0.0));
        }

        #[test]
        fn clamped_region_stays_inside(rect in any_rect()) {
            let mut area = rect;
            cap_filter_area(&mut area, WORKING);
            prop_assert!(area.x() >= 0.0 && area.y() >= 0.0);
            prop_assert!(area.width() >= 0.0 && area.height() >= 0.0);
            if !area.is_empty() {
                prop_assert!(area.right() <= WORKING.width + 1e-3);
                prop_assert!(area.bottom() <= WORKING.height + 1e-3);
            }
        }

        #[test]
        fn region_fully_outside_is_degenerate(
            x in 800.0f32..2000.0,
            y in 0.0f32..600.0,
            w in 0.0f32..500.0,
            h in 0.0f32..500.0,
        ) {
            let mut area = Rect::new(x, y, w, h);
            cap_filter_area(&mut area, WORKING);
            prop_assert!(area.width() <= 0.0 || area.height() <= 0.0);
        }
    }
}
