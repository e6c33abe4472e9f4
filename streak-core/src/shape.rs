//! Shapes: the drawable leaves of the scene graph.
//!
//! A shape is a geometry kind plus paint attributes plus an optional user
//! draw routine. Built-in kinds trace their outline through a [`Context`]
//! and then call the context's shape-aware fill/stroke helpers, so the same
//! routine paints both the visible and the hit surface.

use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::attrs::MAX_COUNT;
use crate::color::ColorKey;
use crate::context::Context;
use crate::geometry::{Rect, Vector2d};
use crate::paint::{flag, num, numbers, Paint, PatternImage};

/// User draw routine for scene or hit painting.
pub type DrawFn = Rc<dyn Fn(&mut dyn Context, &Shape)>;

/// Geometry of a shape, in the shape's local space.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    /// Axis-aligned rectangle from the origin.
    Rect {
        /// Width.
        width: f64,
        /// Height.
        height: f64,
        /// Corner radius, limited to half the shorter side.
        corner_radius: f64,
    },
    /// Circle centered on the origin.
    Circle {
        /// Radius.
        radius: f64,
    },
    /// Ellipse centered on the origin.
    Ellipse {
        /// Horizontal radius.
        radius_x: f64,
        /// Vertical radius.
        radius_y: f64,
    },
    /// Annulus centered on the origin.
    Ring {
        /// Hole radius.
        inner_radius: f64,
        /// Outer radius.
        outer_radius: f64,
    },
    /// Annular sector from angle 0 to `angle` degrees.
    Arc {
        /// Inner radius.
        inner_radius: f64,
        /// Outer radius.
        outer_radius: f64,
        /// Sweep in degrees.
        angle: f64,
        /// Draw the complementary sweep.
        clockwise: bool,
    },
    /// Pie slice from angle 0 to `angle` degrees.
    Sector {
        /// Radius.
        radius: f64,
        /// Sweep in degrees.
        angle: f64,
        /// Draw the complementary sweep.
        clockwise: bool,
    },
    /// Polyline through flat `[x0, y0, x1, y1, ...]` points.
    Line {
        /// Flat coordinate list.
        points: Vec<f64>,
        /// Close and fill the outline.
        closed: bool,
        /// Spline tension; 0 draws straight segments.
        tension: f64,
    },
    /// Regular polygon centered on the origin, first vertex straight up.
    RegularPolygon {
        /// Number of sides (at least 3).
        sides: u32,
        /// Circumradius.
        radius: f64,
    },
    /// Star centered on the origin, first point straight up.
    Star {
        /// Number of points (at least 2).
        num_points: u32,
        /// Radius of the inner vertices.
        inner_radius: f64,
        /// Radius of the outer vertices.
        outer_radius: f64,
    },
    /// Custom shape painted entirely by its draw routine.
    Custom {
        /// Nominal width, used for bounds.
        width: f64,
        /// Nominal height, used for bounds.
        height: f64,
    },
}

/// Class names of every shape kind, as used in documents.
pub const SHAPE_CLASS_NAMES: &[&str] = &[
    "Rect",
    "Circle",
    "Ellipse",
    "Ring",
    "Arc",
    "Sector",
    "Line",
    "RegularPolygon",
    "Star",
    "Shape",
];

impl ShapeKind {
    /// Kind with default geometry for a document class name.
    #[must_use]
    pub fn from_class_name(class_name: &str) -> Option<Self> {
        Some(match class_name {
            "Rect" => Self::Rect {
                width: 0.0,
                height: 0.0,
                corner_radius: 0.0,
            },
            "Circle" => Self::Circle { radius: 0.0 },
            "Ellipse" => Self::Ellipse {
                radius_x: 0.0,
                radius_y: 0.0,
            },
            "Ring" => Self::Ring {
                inner_radius: 0.0,
                outer_radius: 0.0,
            },
            "Arc" => Self::Arc {
                inner_radius: 0.0,
                outer_radius: 0.0,
                angle: 0.0,
                clockwise: false,
            },
            "Sector" => Self::Sector {
                radius: 0.0,
                angle: 0.0,
                clockwise: false,
            },
            "Line" => Self::Line {
                points: Vec::new(),
                closed: false,
                tension: 0.0,
            },
            "RegularPolygon" => Self::RegularPolygon {
                sides: 3,
                radius: 0.0,
            },
            "Star" => Self::Star {
                num_points: 5,
                inner_radius: 0.0,
                outer_radius: 0.0,
            },
            "Shape" => Self::Custom {
                width: 0.0,
                height: 0.0,
            },
            _ => return None,
        })
    }

    /// Document class name.
    #[must_use]
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Rect { .. } => "Rect",
            Self::Circle { .. } => "Circle",
            Self::Ellipse { .. } => "Ellipse",
            Self::Ring { .. } => "Ring",
            Self::Arc { .. } => "Arc",
            Self::Sector { .. } => "Sector",
            Self::Line { .. } => "Line",
            Self::RegularPolygon { .. } => "RegularPolygon",
            Self::Star { .. } => "Star",
            Self::Custom { .. } => "Shape",
        }
    }

    /// Local bounds of the geometry, ignoring stroke and shadow.
    #[must_use]
    pub fn self_rect(&self) -> Rect {
        let centered = |rx: f64, ry: f64| Rect::new(-rx, -ry, rx * 2.0, ry * 2.0);
        match self {
            Self::Rect { width, height, .. } | Self::Custom { width, height } => {
                Rect::new(0.0, 0.0, *width, *height)
            }
            Self::Circle { radius }
            | Self::Sector { radius, .. }
            | Self::RegularPolygon { radius, .. } => centered(*radius, *radius),
            Self::Ellipse { radius_x, radius_y } => centered(*radius_x, *radius_y),
            Self::Ring { outer_radius, .. }
            | Self::Arc { outer_radius, .. }
            | Self::Star { outer_radius, .. } => centered(*outer_radius, *outer_radius),
            Self::Line {
                points, tension, ..
            } => {
                let mut coords = points.clone();
                if *tension != 0.0 && points.len() > 4 {
                    coords.extend(expand_points(points, *tension));
                }
                Rect::from_points(
                    coords
                        .chunks_exact(2)
                        .map(|p| Vector2d::new(p[0], p[1])),
                )
                .unwrap_or_default()
            }
        }
    }

    /// Trace the outline as the current path of `ctx`.
    pub fn trace(&self, ctx: &mut dyn Context) {
        ctx.begin_path();
        match self {
            Self::Rect {
                width,
                height,
                corner_radius,
            } => trace_rect(ctx, *width, *height, *corner_radius),
            Self::Circle { radius } => ctx.arc(0.0, 0.0, *radius, 0.0, TAU, false),
            Self::Ellipse { radius_x, radius_y } => {
                ctx.ellipse(0.0, 0.0, *radius_x, *radius_y, 0.0, 0.0, TAU, false);
            }
            Self::Ring {
                inner_radius,
                outer_radius,
            } => {
                ctx.arc(0.0, 0.0, *outer_radius, 0.0, TAU, false);
                ctx.move_to(*inner_radius, 0.0);
                ctx.arc(0.0, 0.0, *inner_radius, TAU, 0.0, true);
            }
            Self::Arc {
                inner_radius,
                outer_radius,
                angle,
                clockwise,
            } => {
                let angle = angle.to_radians();
                ctx.arc(0.0, 0.0, *outer_radius, 0.0, angle, *clockwise);
                ctx.arc(0.0, 0.0, *inner_radius, angle, 0.0, !*clockwise);
            }
            Self::Sector {
                radius,
                angle,
                clockwise,
            } => {
                ctx.arc(0.0, 0.0, *radius, 0.0, angle.to_radians(), *clockwise);
                ctx.line_to(0.0, 0.0);
            }
            Self::Line {
                points,
                closed,
                tension,
            } => trace_line(ctx, points, *closed, *tension),
            Self::RegularPolygon { sides, radius } => {
                let sides = (*sides).clamp(3, MAX_COUNT);
                let step = TAU / f64::from(sides);
                ctx.move_to(0.0, -radius);
                for n in 1..sides {
                    let a = f64::from(n) * step;
                    ctx.line_to(radius * a.sin(), -radius * a.cos());
                }
            }
            Self::Star {
                num_points,
                inner_radius,
                outer_radius,
            } => {
                let num_points = (*num_points).clamp(2, MAX_COUNT);
                let step = PI / f64::from(num_points);
                ctx.move_to(0.0, -outer_radius);
                for n in 1..num_points.saturating_mul(2) {
                    let r = if n % 2 == 0 {
                        outer_radius
                    } else {
                        inner_radius
                    };
                    let a = f64::from(n) * step;
                    ctx.line_to(r * a.sin(), -r * a.cos());
                }
            }
            Self::Custom { .. } => return,
        }
        if !matches!(self, Self::Line { closed: false, .. }) {
            ctx.close_path();
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<Value> {
        Some(match (self, name) {
            (Self::Rect { width, .. } | Self::Custom { width, .. }, "width") => (*width).into(),
            (Self::Rect { height, .. } | Self::Custom { height, .. }, "height") => {
                (*height).into()
            }
            (Self::Rect { corner_radius, .. }, "cornerRadius") => (*corner_radius).into(),
            (
                Self::Circle { radius }
                | Self::Sector { radius, .. }
                | Self::RegularPolygon { radius, .. },
                "radius",
            ) => (*radius).into(),
            (Self::Ellipse { radius_x, .. }, "radiusX") => (*radius_x).into(),
            (Self::Ellipse { radius_y, .. }, "radiusY") => (*radius_y).into(),
            (
                Self::Ring { inner_radius, .. }
                | Self::Arc { inner_radius, .. }
                | Self::Star { inner_radius, .. },
                "innerRadius",
            ) => (*inner_radius).into(),
            (
                Self::Ring { outer_radius, .. }
                | Self::Arc { outer_radius, .. }
                | Self::Star { outer_radius, .. },
                "outerRadius",
            ) => (*outer_radius).into(),
            (Self::Arc { angle, .. } | Self::Sector { angle, .. }, "angle") => (*angle).into(),
            (Self::Arc { clockwise, .. } | Self::Sector { clockwise, .. }, "clockwise") => {
                (*clockwise).into()
            }
            (Self::Line { points, .. }, "points") => points.clone().into(),
            (Self::Line { closed, .. }, "closed") => (*closed).into(),
            (Self::Line { tension, .. }, "tension") => (*tension).into(),
            (Self::RegularPolygon { sides, .. }, "sides") => f64::from(*sides).into(),
            (Self::Star { num_points, .. }, "numPoints") => f64::from(*num_points).into(),
            _ => return None,
        })
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub(crate) fn set(&mut self, name: &str, value: &Value) -> bool {
        let count = |v: &Value| num(v).clamp(0.0, f64::from(MAX_COUNT)) as u32;
        match (self, name) {
            (Self::Rect { width, .. } | Self::Custom { width, .. }, "width") => *width = num(value),
            (Self::Rect { height, .. } | Self::Custom { height, .. }, "height") => {
                *height = num(value);
            }
            (Self::Rect { corner_radius, .. }, "cornerRadius") => *corner_radius = num(value),
            (
                Self::Circle { radius }
                | Self::Sector { radius, .. }
                | Self::RegularPolygon { radius, .. },
                "radius",
            ) => *radius = num(value),
            (Self::Ellipse { radius_x, .. }, "radiusX") => *radius_x = num(value),
            (Self::Ellipse { radius_y, .. }, "radiusY") => *radius_y = num(value),
            (
                Self::Ring { inner_radius, .. }
                | Self::Arc { inner_radius, .. }
                | Self::Star { inner_radius, .. },
                "innerRadius",
            ) => *inner_radius = num(value),
            (
                Self::Ring { outer_radius, .. }
                | Self::Arc { outer_radius, .. }
                | Self::Star { outer_radius, .. },
                "outerRadius",
            ) => *outer_radius = num(value),
            (Self::Arc { angle, .. } | Self::Sector { angle, .. }, "angle") => *angle = num(value),
            (Self::Arc { clockwise, .. } | Self::Sector { clockwise, .. }, "clockwise") => {
                *clockwise = flag(value);
            }
            (Self::Line { points, .. }, "points") => *points = numbers(value),
            (Self::Line { closed, .. }, "closed") => *closed = flag(value),
            (Self::Line { tension, .. }, "tension") => *tension = num(value),
            (Self::RegularPolygon { sides, .. }, "sides") => *sides = count(value).max(3),
            (Self::Star { num_points, .. }, "numPoints") => *num_points = count(value).max(2),
            _ => return false,
        }
        true
    }
}

fn trace_rect(ctx: &mut dyn Context, width: f64, height: f64, corner_radius: f64) {
    let r = corner_radius.min(width / 2.0).min(height / 2.0);
    if r <= 0.0 {
        ctx.rect(0.0, 0.0, width, height);
        return;
    }
    ctx.move_to(r, 0.0);
    ctx.line_to(width - r, 0.0);
    ctx.arc(width - r, r, r, PI * 1.5, 0.0, false);
    ctx.line_to(width, height - r);
    ctx.arc(width - r, height - r, r, 0.0, FRAC_PI_2, false);
    ctx.line_to(r, height);
    ctx.arc(r, height - r, r, FRAC_PI_2, PI, false);
    ctx.line_to(0.0, r);
    ctx.arc(r, r, r, PI, PI * 1.5, false);
}

fn trace_line(ctx: &mut dyn Context, points: &[f64], closed: bool, tension: f64) {
    let len = points.len() - points.len() % 2;
    if len < 2 {
        return;
    }
    ctx.move_to(points[0], points[1]);
    if tension != 0.0 && len > 4 {
        let tp = if closed {
            closed_tension_points(&points[..len], tension)
        } else {
            expand_points(&points[..len], tension)
        };
        let tl = tp.len();
        let mut n = if closed { 0 } else { 4 };
        if !closed {
            ctx.quadratic_curve_to(tp[0], tp[1], tp[2], tp[3]);
        }
        while n + 6 <= tl && n < tl - 2 {
            ctx.bezier_curve_to(tp[n], tp[n + 1], tp[n + 2], tp[n + 3], tp[n + 4], tp[n + 5]);
            n += 6;
        }
        if !closed {
            ctx.quadratic_curve_to(tp[tl - 2], tp[tl - 1], points[len - 2], points[len - 1]);
        }
    } else {
        for p in points[2..len].chunks_exact(2) {
            ctx.line_to(p[0], p[1]);
        }
    }
}

/// Cardinal-spline control points around `(x1, y1)`.
#[must_use]
pub fn control_points(p0: Vector2d, p1: Vector2d, p2: Vector2d, tension: f64) -> [f64; 4] {
    let d01 = (p1.x - p0.x).hypot(p1.y - p0.y);
    let d12 = (p2.x - p1.x).hypot(p2.y - p1.y);
    let total = d01 + d12;
    if total == 0.0 {
        return [p1.x, p1.y, p1.x, p1.y];
    }
    let fa = tension * d01 / total;
    let fb = tension * d12 / total;
    [
        p1.x - fa * (p2.x - p0.x),
        p1.y - fa * (p2.y - p0.y),
        p1.x + fb * (p2.x - p0.x),
        p1.y + fb * (p2.y - p0.y),
    ]
}

fn point_at(points: &[f64], index: usize) -> Vector2d {
    Vector2d::new(points[index], points[index + 1])
}

/// For every interior point, emit `[cp_before, point, cp_after]` flattened.
#[must_use]
pub fn expand_points(points: &[f64], tension: f64) -> Vec<f64> {
    let mut out = Vec::new();
    let mut n = 2;
    while n + 3 < points.len() {
        let cp = control_points(
            point_at(points, n - 2),
            point_at(points, n),
            point_at(points, n + 2),
            tension,
        );
        out.extend_from_slice(&[cp[0], cp[1], points[n], points[n + 1], cp[2], cp[3]]);
        n += 2;
    }
    out
}

/// Control-point sequence for a closed spline: one cubic segment per point.
#[must_use]
pub fn closed_tension_points(points: &[f64], tension: f64) -> Vec<f64> {
    let len = points.len();
    let first = control_points(
        point_at(points, len - 2),
        point_at(points, 0),
        point_at(points, 2),
        tension,
    );
    let last = control_points(
        point_at(points, len - 4),
        point_at(points, len - 2),
        point_at(points, 0),
        tension,
    );
    let mut out = vec![first[2], first[3]];
    out.extend(expand_points(points, tension));
    out.extend_from_slice(&[
        last[0],
        last[1],
        points[len - 2],
        points[len - 1],
        last[2],
        last[3],
        first[0],
        first[1],
        points[0],
        points[1],
    ]);
    out
}

/// A drawable leaf: geometry, paint and optional draw routines.
#[derive(Clone)]
pub struct Shape {
    /// Geometry.
    pub kind: ShapeKind,
    /// Paint attributes.
    pub paint: Paint,
    key: Option<ColorKey>,
    draw_func: Option<DrawFn>,
    hit_func: Option<DrawFn>,
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("kind", &self.kind)
            .field("key", &self.key)
            .field("custom_draw", &self.draw_func.is_some())
            .field("custom_hit", &self.hit_func.is_some())
            .finish_non_exhaustive()
    }
}

impl Shape {
    /// Shape of the given kind with default paint.
    #[must_use]
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            paint: Paint::default(),
            key: None,
            draw_func: None,
            hit_func: None,
        }
    }

    /// Rectangle.
    #[must_use]
    pub fn rect(width: f64, height: f64) -> Self {
        Self::new(ShapeKind::Rect {
            width,
            height,
            corner_radius: 0.0,
        })
    }

    /// Circle.
    #[must_use]
    pub fn circle(radius: f64) -> Self {
        Self::new(ShapeKind::Circle { radius })
    }

    /// Ellipse.
    #[must_use]
    pub fn ellipse(radius_x: f64, radius_y: f64) -> Self {
        Self::new(ShapeKind::Ellipse { radius_x, radius_y })
    }

    /// Ring.
    #[must_use]
    pub fn ring(inner_radius: f64, outer_radius: f64) -> Self {
        Self::new(ShapeKind::Ring {
            inner_radius,
            outer_radius,
        })
    }

    /// Annular arc of `angle` degrees.
    #[must_use]
    pub fn arc(inner_radius: f64, outer_radius: f64, angle: f64) -> Self {
        Self::new(ShapeKind::Arc {
            inner_radius,
            outer_radius,
            angle,
            clockwise: false,
        })
    }

    /// Pie slice of `angle` degrees.
    #[must_use]
    pub fn sector(radius: f64, angle: f64) -> Self {
        Self::new(ShapeKind::Sector {
            radius,
            angle,
            clockwise: false,
        })
    }

    /// Open polyline.
    #[must_use]
    pub fn line(points: Vec<f64>) -> Self {
        Self::new(ShapeKind::Line {
            points,
            closed: false,
            tension: 0.0,
        })
    }

    /// Regular polygon.
    #[must_use]
    pub fn regular_polygon(sides: u32, radius: f64) -> Self {
        Self::new(ShapeKind::RegularPolygon {
            sides: sides.clamp(3, MAX_COUNT),
            radius,
        })
    }

    /// Star.
    #[must_use]
    pub fn star(num_points: u32, inner_radius: f64, outer_radius: f64) -> Self {
        Self::new(ShapeKind::Star {
            num_points: num_points.clamp(2, MAX_COUNT),
            inner_radius,
            outer_radius,
        })
    }

    /// Custom shape painted by `draw`.
    #[must_use]
    pub fn custom(width: f64, height: f64, draw: DrawFn) -> Self {
        Self::new(ShapeKind::Custom { width, height }).with_draw_func(draw)
    }

    /// Set the solid fill.
    #[must_use]
    pub fn with_fill(mut self, color: impl Into<String>) -> Self {
        self.paint.fill = Some(color.into());
        self
    }

    /// Set the solid stroke and its width.
    #[must_use]
    pub fn with_stroke(mut self, color: impl Into<String>, width: f64) -> Self {
        self.paint.stroke = Some(color.into());
        self.paint.stroke_width = width.max(0.0);
        self
    }

    /// Set the pattern image.
    #[must_use]
    pub fn with_pattern(mut self, image: PatternImage) -> Self {
        self.paint.fill_pattern.image = Some(Rc::new(image));
        self
    }

    /// Replace the scene draw routine.
    #[must_use]
    pub fn with_draw_func(mut self, draw: DrawFn) -> Self {
        self.draw_func = Some(draw);
        self
    }

    /// Set a separate routine for the hit surface.
    #[must_use]
    pub fn with_hit_func(mut self, hit: DrawFn) -> Self {
        self.hit_func = Some(hit);
        self
    }

    /// Pick key, assigned when the shape enters a stage.
    #[must_use]
    pub fn color_key(&self) -> Option<ColorKey> {
        self.key
    }

    pub(crate) fn assign_key(&mut self, key: ColorKey) {
        self.key = Some(key);
    }

    pub(crate) fn take_key(&mut self) -> Option<ColorKey> {
        self.key.take()
    }

    /// Document class name.
    #[must_use]
    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    /// Paint onto a scene surface.
    pub fn draw_scene(&self, ctx: &mut dyn Context) {
        match &self.draw_func {
            Some(draw) => draw(ctx, self),
            None => self.draw_default(ctx),
        }
    }

    /// Paint onto a hit surface: the hit routine, else the draw routine.
    pub fn draw_hit(&self, ctx: &mut dyn Context) {
        match self.hit_func.as_ref().or(self.draw_func.as_ref()) {
            Some(draw) => draw(ctx, self),
            None => self.draw_default(ctx),
        }
    }

    fn draw_default(&self, ctx: &mut dyn Context) {
        match &self.kind {
            ShapeKind::Custom { .. } => {}
            ShapeKind::Line { closed: false, .. } => {
                self.kind.trace(ctx);
                ctx.stroke_shape(self);
            }
            kind => {
                kind.trace(ctx);
                ctx.fill_stroke_shape(self);
            }
        }
    }

    /// Local bounds including half the stroke width and the shadow offset.
    #[must_use]
    pub fn client_rect(&self) -> Rect {
        let mut rect = self.kind.self_rect();
        if self.paint.has_stroke() {
            rect = rect.inflate(self.paint.stroke_width / 2.0);
        }
        if self.paint.has_shadow() {
            let shadow = &self.paint.shadow;
            let mut moved = rect.inflate(shadow.blur);
            moved.x += shadow.offset.x;
            moved.y += shadow.offset.y;
            rect = rect.union(&moved);
        }
        rect
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Matrix;

    /// Context that records calls as text.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl Context for Recorder {
        fn save(&mut self) {
            self.calls.push("save".into());
        }
        fn restore(&mut self) {
            self.calls.push("restore".into());
        }
        fn translate(&mut self, _: f64, _: f64) {}
        fn rotate(&mut self, _: f64) {}
        fn scale(&mut self, _: f64, _: f64) {}
        fn transform(&mut self, _: &Matrix) {}
        fn set_transform(&mut self, _: &Matrix) {}
        fn begin_path(&mut self) {
            self.calls.push("begin".into());
        }
        fn move_to(&mut self, x: f64, y: f64) {
            self.calls.push(format!("M{x:.0},{y:.0}"));
        }
        fn line_to(&mut self, x: f64, y: f64) {
            self.calls.push(format!("L{x:.0},{y:.0}"));
        }
        fn quadratic_curve_to(&mut self, _: f64, _: f64, _: f64, _: f64) {
            self.calls.push("Q".into());
        }
        fn bezier_curve_to(&mut self, _: f64, _: f64, _: f64, _: f64, _: f64, _: f64) {
            self.calls.push("C".into());
        }
        fn arc(&mut self, _: f64, _: f64, r: f64, _: f64, _: f64, ccw: bool) {
            self.calls.push(format!("A{r:.0}{}", if ccw { "-" } else { "+" }));
        }
        fn ellipse(&mut self, _: f64, _: f64, _: f64, _: f64, _: f64, _: f64, _: f64, _: bool) {
            self.calls.push("E".into());
        }
        fn rect(&mut self, _: f64, _: f64, w: f64, h: f64) {
            self.calls.push(format!("R{w:.0}x{h:.0}"));
        }
        fn close_path(&mut self) {
            self.calls.push("Z".into());
        }
        fn clip(&mut self) {}
        fn fill_shape(&mut self, _: &Shape) {
            self.calls.push("fill".into());
        }
        fn stroke_shape(&mut self, _: &Shape) {
            self.calls.push("stroke".into());
        }
    }

    fn record(shape: &Shape) -> Vec<String> {
        let mut ctx = Recorder::default();
        shape.draw_scene(&mut ctx);
        ctx.calls
    }

    #[test]
    fn test_rect_without_corners_is_one_rect() {
        let calls = record(&Shape::rect(10.0, 5.0));
        assert_eq!(calls, ["begin", "R10x5", "Z", "fill", "stroke"]);
    }

    #[test]
    fn test_rect_corner_radius_uses_four_arcs() {
        let mut shape = Shape::rect(20.0, 20.0);
        shape.kind = ShapeKind::Rect {
            width: 20.0,
            height: 20.0,
            corner_radius: 4.0,
        };
        let arcs = record(&shape).iter().filter(|c| c.starts_with('A')).count();
        assert_eq!(arcs, 4);
    }

    #[test]
    fn test_ring_arcs_run_in_opposite_directions() {
        let calls = record(&Shape::ring(5.0, 10.0));
        assert!(calls.contains(&"A10+".to_string()));
        assert!(calls.contains(&"A5-".to_string()));
    }

    #[test]
    fn test_open_line_is_only_stroked() {
        let calls = record(&Shape::line(vec![0.0, 0.0, 10.0, 0.0, 10.0, 10.0]));
        assert_eq!(calls, ["begin", "M0,0", "L10,0", "L10,10", "stroke"]);
    }

    #[test]
    fn test_tension_line_uses_curves() {
        let shape = Shape::new(ShapeKind::Line {
            points: vec![0.0, 0.0, 10.0, 10.0, 20.0, 0.0, 30.0, 10.0],
            closed: false,
            tension: 0.5,
        });
        let calls = record(&shape);
        assert_eq!(calls.iter().filter(|c| *c == "Q").count(), 2);
        assert_eq!(calls.iter().filter(|c| *c == "C").count(), 1);
    }

    #[test]
    fn test_closed_tension_line_has_one_curve_per_point() {
        let shape = Shape::new(ShapeKind::Line {
            points: vec![0.0, 0.0, 10.0, 0.0, 10.0, 10.0, 0.0, 10.0],
            closed: true,
            tension: 0.3,
        });
        let calls = record(&shape);
        assert_eq!(calls.iter().filter(|c| *c == "C").count(), 4);
        assert!(calls.ends_with(&["Z".to_string(), "fill".into(), "stroke".into()]));
    }

    #[test]
    fn test_polygon_first_vertex_is_up() {
        let calls = record(&Shape::regular_polygon(4, 10.0));
        assert_eq!(calls[1], "M0,-10");
        assert!(calls[2].starts_with("L10,"));
    }

    #[test]
    fn test_star_alternates_radii() {
        let calls = record(&Shape::star(5, 5.0, 10.0));
        let vertices = calls
            .iter()
            .filter(|c| c.starts_with('M') || c.starts_with('L'))
            .count();
        assert_eq!(vertices, 10);
    }

    #[test]
    fn test_custom_draw_func_replaces_default() {
        let shape = Shape::custom(
            5.0,
            5.0,
            Rc::new(|ctx: &mut dyn Context, shape: &Shape| {
                ctx.begin_path();
                ctx.rect(0.0, 0.0, 1.0, 1.0);
                ctx.fill_shape(shape);
            }),
        );
        assert_eq!(record(&shape), ["begin", "R1x1", "fill"]);
    }

    #[test]
    fn test_custom_without_func_draws_nothing() {
        let shape = Shape::new(ShapeKind::Custom {
            width: 1.0,
            height: 1.0,
        });
        assert!(record(&shape).is_empty());
    }

    #[test]
    fn test_self_rects() {
        assert_eq!(
            Shape::circle(5.0).kind.self_rect(),
            Rect::new(-5.0, -5.0, 10.0, 10.0)
        );
        assert_eq!(
            Shape::line(vec![1.0, 2.0, 5.0, -2.0]).kind.self_rect(),
            Rect::new(1.0, -2.0, 4.0, 4.0)
        );
    }

    #[test]
    fn test_client_rect_includes_stroke() {
        let shape = Shape::rect(10.0, 10.0).with_stroke("black", 4.0);
        assert_eq!(shape.client_rect(), Rect::new(-2.0, -2.0, 14.0, 14.0));
    }

    #[test]
    fn test_geometry_attrs_depend_on_kind() {
        let mut circle = ShapeKind::Circle { radius: 1.0 };
        assert!(circle.set("radius", &Value::from(4.0)));
        assert_eq!(circle.get("radius"), Some(Value::from(4.0)));
        assert!(!circle.set("width", &Value::from(4.0)));
        assert_eq!(circle.get("points"), None);
    }

    #[test]
    fn test_huge_counts_trace_bounded_outlines() {
        let lines = |shape: &Shape| record(shape).iter().filter(|c| c.starts_with('L')).count();
        let star = Shape::new(ShapeKind::Star {
            num_points: 3_000_000_000,
            inner_radius: 1.0,
            outer_radius: 2.0,
        });
        assert_eq!(lines(&star), 2 * MAX_COUNT as usize - 1);
        let polygon = Shape::new(ShapeKind::RegularPolygon {
            sides: u32::MAX,
            radius: 1.0,
        });
        assert_eq!(lines(&polygon), MAX_COUNT as usize - 1);

        let mut kind = ShapeKind::Star {
            num_points: 5,
            inner_radius: 1.0,
            outer_radius: 2.0,
        };
        assert!(kind.set("numPoints", &Value::from(3e9)));
        assert_eq!(kind.get("numPoints"), Some(Value::from(f64::from(MAX_COUNT))));
    }

    #[test]
    fn test_class_names_round_trip() {
        for name in SHAPE_CLASS_NAMES {
            let kind = ShapeKind::from_class_name(name).expect("known class");
            assert_eq!(kind.class_name(), *name);
        }
        assert!(ShapeKind::from_class_name("Text").is_none());
    }
}
