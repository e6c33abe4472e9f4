//! Points, rectangles and 2D affine matrices.

use serde::{Deserialize, Serialize};

/// A 2D point or vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2d {
    /// X component (+x is right).
    pub x: f64,
    /// Y component (+y is down).
    pub y: f64,
}

impl Vector2d {
    /// Create a new vector.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle.
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest rectangle containing every point, or `None` for no points.
    #[must_use]
    pub fn from_points(points: impl IntoIterator<Item = Vector2d>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in iter {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// The four corners, clockwise from the top-left.
    #[must_use]
    pub fn corners(&self) -> [Vector2d; 4] {
        [
            Vector2d::new(self.x, self.y),
            Vector2d::new(self.x + self.width, self.y),
            Vector2d::new(self.x + self.width, self.y + self.height),
            Vector2d::new(self.x, self.y + self.height),
        ]
    }

    /// Smallest rectangle containing both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let corners = self.corners().into_iter().chain(other.corners());
        // Both inputs contribute four corners, so the iterator is never empty.
        Self::from_points(corners).unwrap_or(*self)
    }

    /// Grow every edge outward by `amount`.
    #[must_use]
    pub fn inflate(&self, amount: f64) -> Self {
        Self::new(
            self.x - amount,
            self.y - amount,
            self.width + amount * 2.0,
            self.height + amount * 2.0,
        )
    }

    /// Check whether the point lies inside (edges inclusive).
    #[must_use]
    pub fn contains(&self, point: Vector2d) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    /// True when the rectangle has a positive area.
    #[must_use]
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// A 2D affine matrix in canvas order `(a, b, c, d, e, f)`:
///
/// ```text
/// x' = a·x + c·y + e
/// y' = b·x + d·y + f
/// ```
///
/// Every builder method post-multiplies, so `m.translate(..).rotate(..)`
/// rotates in the translated space, matching a 2D canvas context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    /// Coefficients `[a, b, c, d, e, f]`.
    pub m: [f64; 6],
}

impl Matrix {
    /// Identity matrix (no transformation).
    pub const IDENTITY: Self = Self {
        m: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
    };

    /// Create a matrix from its six coefficients.
    #[must_use]
    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self {
            m: [a, b, c, d, e, f],
        }
    }

    /// Post-multiply by a translation.
    pub fn translate(&mut self, x: f64, y: f64) -> &mut Self {
        let [a, b, c, d, e, f] = self.m;
        self.m[4] = a * x + c * y + e;
        self.m[5] = b * x + d * y + f;
        self
    }

    /// Post-multiply by a rotation of `radians`, clockwise in a y-down space.
    pub fn rotate(&mut self, radians: f64) -> &mut Self {
        let (sin, cos) = radians.sin_cos();
        self.multiply(&Self::new(cos, sin, -sin, cos, 0.0, 0.0))
    }

    /// Post-multiply by a scale.
    pub fn scale(&mut self, sx: f64, sy: f64) -> &mut Self {
        self.m[0] *= sx;
        self.m[1] *= sx;
        self.m[2] *= sy;
        self.m[3] *= sy;
        self
    }

    /// Post-multiply by a skew with factors (not angles) `sx`, `sy`.
    pub fn skew(&mut self, sx: f64, sy: f64) -> &mut Self {
        self.multiply(&Self::new(1.0, sy, sx, 1.0, 0.0, 0.0))
    }

    /// `self = self · other`: `other` applies first, then `self`.
    pub fn multiply(&mut self, other: &Self) -> &mut Self {
        let [a1, b1, c1, d1, e1, f1] = self.m;
        let [a2, b2, c2, d2, e2, f2] = other.m;
        self.m = [
            a1 * a2 + c1 * b2,
            b1 * a2 + d1 * b2,
            a1 * c2 + c1 * d2,
            b1 * c2 + d1 * d2,
            a1 * e2 + c1 * f2 + e1,
            b1 * e2 + d1 * f2 + f1,
        ];
        self
    }

    /// Return `self · other` without mutating.
    #[must_use]
    pub fn then(&self, other: &Self) -> Self {
        let mut out = *self;
        out.multiply(other);
        out
    }

    /// Inverse matrix, or `None` when the matrix is singular.
    #[must_use]
    pub fn invert(&self) -> Option<Self> {
        let [a, b, c, d, e, f] = self.m;
        let det = a * d - b * c;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        Some(Self::new(
            d / det,
            -b / det,
            -c / det,
            a / det,
            (c * f - d * e) / det,
            (b * e - a * f) / det,
        ))
    }

    /// Map a point through the matrix.
    #[must_use]
    pub fn point(&self, p: Vector2d) -> Vector2d {
        let [a, b, c, d, e, f] = self.m;
        Vector2d::new(a * p.x + c * p.y + e, b * p.x + d * p.y + f)
    }

    /// Axis-aligned bounds of a rectangle after mapping its corners.
    #[must_use]
    pub fn map_rect(&self, rect: &Rect) -> Rect {
        let corners = rect.corners().map(|c| self.point(c));
        Rect::from_points(corners).unwrap_or_default()
    }

    /// Translation part.
    #[must_use]
    pub fn translation(&self) -> Vector2d {
        Vector2d::new(self.m[4], self.m[5])
    }

    /// Length of the transformed unit axes, i.e. the scale ignoring rotation.
    #[must_use]
    pub fn axis_scale(&self) -> Vector2d {
        let [a, b, c, d, ..] = self.m;
        Vector2d::new(a.hypot(b), c.hypot(d))
    }

    /// Check whether this is exactly the identity matrix.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Component-wise comparison with a tolerance.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.m
            .iter()
            .zip(other.m.iter())
            .all(|(x, y)| (x - y).abs() <= epsilon * (1.0 + x.abs().max(y.abs())))
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_identity() {
        let m = Matrix::default();
        assert!(m.is_identity());
        let p = m.point(Vector2d::new(3.0, 4.0));
        assert!(approx(p.x, 3.0) && approx(p.y, 4.0));
    }

    #[test]
    fn test_translate_then_scale() {
        let mut m = Matrix::IDENTITY;
        m.translate(10.0, 0.0).scale(2.0, 2.0);
        // Scale applies first, then translate.
        let p = m.point(Vector2d::new(1.0, 1.0));
        assert!(approx(p.x, 12.0));
        assert!(approx(p.y, 2.0));
    }

    #[test]
    fn test_rotate_is_clockwise_with_y_down() {
        let mut m = Matrix::IDENTITY;
        m.rotate(std::f64::consts::FRAC_PI_2);
        let p = m.point(Vector2d::new(1.0, 0.0));
        // +x rotated a quarter turn clockwise points down the screen.
        assert!(approx(p.x, 0.0));
        assert!(approx(p.y, 1.0));
    }

    #[test]
    fn test_skew() {
        let mut m = Matrix::IDENTITY;
        m.skew(1.0, 0.0);
        let p = m.point(Vector2d::new(0.0, 2.0));
        assert!(approx(p.x, 2.0));
        assert!(approx(p.y, 2.0));
    }

    #[test]
    fn test_singular_has_no_inverse() {
        let mut m = Matrix::IDENTITY;
        m.scale(0.0, 1.0);
        assert!(m.invert().is_none());
    }

    #[test]
    fn test_map_rect() {
        let mut m = Matrix::IDENTITY;
        m.translate(5.0, 5.0).scale(2.0, 3.0);
        let r = m.map_rect(&Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(approx(r.x, 5.0) && approx(r.y, 5.0));
        assert!(approx(r.width, 20.0) && approx(r.height, 30.0));
    }

    #[test]
    fn test_rect_union_and_contains() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, -5.0, 10.0, 10.0);
        let u = a.union(&b);
        assert_eq!(u, Rect::new(0.0, -5.0, 15.0, 15.0));
        assert!(u.contains(Vector2d::new(14.0, -4.0)));
        assert!(!u.contains(Vector2d::new(16.0, 0.0)));
    }

    proptest! {
        #[test]
        fn prop_inverse_round_trips(
            tx in -500.0f64..500.0,
            ty in -500.0f64..500.0,
            angle in -6.3f64..6.3,
            sx in 0.1f64..10.0,
            sy in 0.1f64..10.0,
            px in -100.0f64..100.0,
            py in -100.0f64..100.0,
        ) {
            let mut m = Matrix::IDENTITY;
            m.translate(tx, ty).rotate(angle).scale(sx, sy);
            let inv = m.invert().expect("non-singular");
            let back = inv.point(m.point(Vector2d::new(px, py)));
            prop_assert!((back.x - px).abs() < 1e-6);
            prop_assert!((back.y - py).abs() < 1e-6);
        }
    }
}
