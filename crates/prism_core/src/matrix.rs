//! 2D affine matrix used for projections and texture-space mapping
//!
//! ```text
//! | a  c  tx |
//! | b  d  ty |
//! | 0  0   1 |
//! ```
//!
//! Mutating operations work in place and return `&mut Self` so a caller can
//! reuse one matrix across frames and chain the steps that build it.

use crate::geometry::{Point, Size};

/// 2D affine transformation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub const fn new(a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    /// Orthographic projection from pixel space of a `size` buffer into clip space.
    ///
    /// Off-screen buffers keep Y pointing down in texture space; the root
    /// output (`flip_y`) maps the top row to clip-space +1.
    pub fn projection(size: Size, flip_y: bool) -> Self {
        let a = 2.0 / size.width;
        if flip_y {
            let d = -2.0 / size.height;
            Self::new(a, 0.0, 0.0, d, -1.0, 1.0)
        } else {
            let d = 2.0 / size.height;
            Self::new(a, 0.0, 0.0, d, -1.0, -1.0)
        }
    }

    /// Reset to identity
    pub fn identity(&mut self) -> &mut Self {
        *self = Self::IDENTITY;
        self
    }

    /// Post-translate by (x, y)
    pub fn translate(&mut self, x: f32, y: f32) -> &mut Self {
        self.tx += x;
        self.ty += y;
        self
    }

    /// Post-scale by (x, y), including the translation
    pub fn scale(&mut self, x: f32, y: f32) -> &mut Self {
        self.a *= x;
        self.d *= y;
        self.c *= x;
        self.b *= y;
        self.tx *= x;
        self.ty *= y;
        self
    }

    /// `self = other * self`: `other` is applied after this matrix.
    pub fn prepend(&mut self, other: &Matrix) -> &mut Self {
        let tx1 = self.tx;

        if other.a != 1.0 || other.b != 0.0 || other.c != 0.0 || other.d != 1.0 {
            let a1 = self.a;
            let c1 = self.c;
            self.a = a1 * other.a + self.b * other.c;
            self.b = a1 * other.b + self.b * other.d;
            self.c = c1 * other.a + self.d * other.c;
            self.d = c1 * other.b + self.d * other.d;
        }

        self.tx = tx1 * other.a + self.ty * other.c + other.tx;
        self.ty = tx1 * other.b + self.ty * other.d + other.ty;
        self
    }

    pub fn determinant(&self) -> f32 {
        self.a * self.d - self.b * self.c
    }

    /// Inverse transform, or `None` when the matrix is singular
    pub fn inverse(&self) -> Option<Matrix> {
        let n = self.determinant();
        if n == 0.0 || !n.is_finite() {
            return None;
        }

        Some(Matrix {
            a: self.d / n,
            b: -self.b / n,
            c: -self.c / n,
            d: self.a / n,
            tx: (self.c * self.ty - self.d * self.tx) / n,
            ty: -(self.a * self.ty - self.b * self.tx) / n,
        })
    }

    pub fn apply(&self, point: Point) -> Point {
        Point::new(
            self.a * point.x + self.c * point.y + self.tx,
            self.b * point.x + self.d * point.y + self.ty,
        )
    }

    /// 3x3 elements, row-major, or column-major when `transpose` is set
    /// (the layout a shader uniform expects).
    pub fn to_array(&self, transpose: bool) -> [f32; 9] {
        if transpose {
            [
                self.a, self.b, 0.0, //
                self.c, self.d, 0.0, //
                self.tx, self.ty, 1.0,
            ]
        } else {
            [
                self.a, self.c, self.tx, //
                self.b, self.d, self.ty, //
                0.0, 0.0, 1.0,
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-4 && (a.y - b.y).abs() < 1e-4
    }

    #[test]
    fn translate_then_scale_scales_translation() {
        let mut m = Matrix::IDENTITY;
        m.translate(10.0, 20.0).scale(2.0, 3.0);
        assert_eq!(m, Matrix::new(2.0, 0.0, 0.0, 3.0, 20.0, 60.0));
    }

    #[test]
    fn prepend_applies_other_last() {
        let mut m = Matrix::IDENTITY;
        m.scale(2.0, 2.0);
        m.prepend(&Matrix::new(1.0, 0.0, 0.0, 1.0, 5.0, 0.0));
        // scale first, then the translation
        assert!(approx(m.apply(Point::new(1.0, 1.0)), Point::new(7.0, 2.0)));
    }

    #[test]
    fn inverse_round_trips_points() {
        let m = Matrix::new(2.0, 0.5, -0.25, 1.5, 30.0, -12.0);
        let inv = m.inverse().unwrap();
        let p = Point::new(13.0, -7.5);
        assert!(approx(inv.apply(m.apply(p)), p));
    }

    #[test]
    fn singular_matrix_has_no_inverse() {
        assert!(Matrix::new(0.0, 0.0, 0.0, 1.0, 3.0, 4.0).inverse().is_none());
    }

    #[test]
    fn projection_maps_corners_to_clip_space() {
        let size = Size::new(800.0, 600.0);

        let offscreen = Matrix::projection(size, false);
        assert!(approx(offscreen.apply(Point::ZERO), Point::new(-1.0, -1.0)));
        assert!(approx(
            offscreen.apply(Point::new(800.0, 600.0)),
            Point::new(1.0, 1.0)
        ));

        let root = Matrix::projection(size, true);
        assert!(approx(root.apply(Point::ZERO), Point::new(-1.0, 1.0)));
        assert!(approx(
            root.apply(Point::new(800.0, 600.0)),
            Point::new(1.0, -1.0)
        ));
    }

    #[test]
    fn transposed_array_is_column_major() {
        let m = Matrix::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        assert_eq!(
            m.to_array(true),
            [1.0, 2.0, 0.0, 3.0, 4.0, 0.0, 5.0, 6.0, 1.0]
        );
        assert_eq!(
            m.to_array(false),
            [1.0, 3.0, 5.0, 2.0, 4.0, 6.0, 0.0, 0.0, 1.0]
        );
    }
}
