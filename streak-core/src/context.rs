//! The drawing context interface shapes paint through.
//!
//! A context wraps one raster surface and mirrors the 2D canvas API:
//! a save/restore state stack, a current transform, a current path and
//! shape-aware fill and stroke helpers. The renderer crate provides the
//! raster implementation; scene and hit surfaces share this interface so a
//! shape's draw routine runs unchanged on both.

use crate::geometry::Matrix;
use crate::shape::Shape;

/// Canvas-style drawing context.
///
/// Angles are in radians. Arc sweeps follow canvas semantics: `anticlockwise`
/// false sweeps with increasing angle, which is clockwise on a y-down surface.
pub trait Context {
    /// Push the current state (transform, alpha, blend mode, clip).
    fn save(&mut self);

    /// Pop the most recently saved state. Unbalanced calls are ignored.
    fn restore(&mut self);

    /// Post-multiply the current transform by a translation.
    fn translate(&mut self, x: f64, y: f64);

    /// Post-multiply the current transform by a rotation.
    fn rotate(&mut self, radians: f64);

    /// Post-multiply the current transform by a scale.
    fn scale(&mut self, x: f64, y: f64);

    /// Post-multiply the current transform by `matrix`.
    fn transform(&mut self, matrix: &Matrix);

    /// Replace the current transform (in stage coordinates).
    fn set_transform(&mut self, matrix: &Matrix);

    /// Start a new, empty path.
    fn begin_path(&mut self);

    /// Start a new subpath at the point.
    fn move_to(&mut self, x: f64, y: f64);

    /// Straight segment to the point.
    fn line_to(&mut self, x: f64, y: f64);

    /// Quadratic curve through one control point.
    fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64);

    /// Cubic curve through two control points.
    fn bezier_curve_to(&mut self, cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64, x: f64, y: f64);

    /// Circular arc around `(x, y)`.
    fn arc(&mut self, x: f64, y: f64, radius: f64, start: f64, end: f64, anticlockwise: bool);

    /// Elliptical arc around `(x, y)`.
    #[allow(clippy::too_many_arguments)]
    fn ellipse(
        &mut self,
        x: f64,
        y: f64,
        radius_x: f64,
        radius_y: f64,
        rotation: f64,
        start: f64,
        end: f64,
        anticlockwise: bool,
    );

    /// Closed rectangular subpath.
    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64);

    /// Close the current subpath.
    fn close_path(&mut self);

    /// Intersect the clip region with the current path.
    fn clip(&mut self);

    /// Fill the current path with the shape's resolved fill style.
    fn fill_shape(&mut self, shape: &Shape);

    /// Stroke the current path with the shape's resolved stroke style.
    fn stroke_shape(&mut self, shape: &Shape);

    /// Fill, then stroke, the current path.
    fn fill_stroke_shape(&mut self, shape: &Shape) {
        self.fill_shape(shape);
        self.stroke_shape(shape);
    }

    /// True for hit (pick) surfaces.
    fn is_hit(&self) -> bool {
        false
    }
}
