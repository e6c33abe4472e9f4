//! Pixel surfaces backed by a tiny-skia [`Pixmap`].
//!
//! A [`Surface`] implements the core [`Context`] trait in one of two modes.
//! Scene surfaces paint visual styles with anti-aliasing, opacity, blend
//! modes and shadows. Hit surfaces paint every shape in its solid pick
//! color with anti-aliasing off and source blending, so each covered pixel
//! holds exactly one key.
//!
//! Paths are recorded in the coordinates passed to the path calls and are
//! mapped through the transform current at fill, stroke or clip time.

use std::f64::consts::{FRAC_PI_2, TAU};
use std::fmt;

use streak_core::{Context, Matrix, Rect, Shape, Vector2d};
use tiny_skia::{
    BlendMode, Color, FillRule, FilterQuality, Mask, Path, PathBuilder, Pattern, Pixmap,
    PixmapPaint, Shader, SpreadMode, Stroke, Transform,
};

use crate::error::{RenderError, RenderResult};
use crate::style::{self, FillSource, StrokeSource};

/// What a surface paints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceMode {
    /// Visual output.
    Scene,
    /// Pick colors for hit testing.
    Hit,
}

#[derive(Debug, Clone, Copy)]
enum Segment {
    Move(f64, f64),
    Line(f64, f64),
    Quad(f64, f64, f64, f64),
    Cubic(f64, f64, f64, f64, f64, f64),
    Close,
}

#[derive(Clone)]
struct DrawState {
    transform: Matrix,
    alpha: f64,
    blend: BlendMode,
    clip: Option<Mask>,
    smoothing: bool,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            transform: Matrix::IDENTITY,
            alpha: 1.0,
            blend: BlendMode::SourceOver,
            clip: None,
            smoothing: true,
        }
    }
}

/// A raster surface with a canvas-style state stack.
pub struct Surface {
    pixmap: Pixmap,
    width: f64,
    height: f64,
    pixel_ratio: f64,
    mode: SurfaceMode,
    origin: (f64, f64),
    state: DrawState,
    stack: Vec<DrawState>,
    path: Vec<Segment>,
    current: Option<(f64, f64)>,
    subpath_start: Option<(f64, f64)>,
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixel_ratio", &self.pixel_ratio)
            .field("mode", &self.mode)
            .field("pixels", &(self.pixmap.width(), self.pixmap.height()))
            .finish_non_exhaustive()
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn device_size(css: f64, ratio: f64) -> u32 {
    let px = (css.max(0.0) * ratio).ceil();
    if px.is_finite() {
        (px as u32).max(1)
    } else {
        1
    }
}

fn allocate(width: u32, height: u32) -> RenderResult<Pixmap> {
    Pixmap::new(width, height).ok_or_else(|| {
        RenderError::Surface(format!("cannot allocate a {width}x{height} pixmap"))
    })
}

/// Signed sweep of a canvas arc from `start` to `end`.
///
/// Clockwise (`anticlockwise == false`) sweeps are in `[0, 2π]`, a full turn
/// once the angles are at least 2π apart; anticlockwise sweeps mirror that.
#[must_use]
pub fn arc_sweep(start: f64, end: f64, anticlockwise: bool) -> f64 {
    if anticlockwise {
        if start - end >= TAU {
            -TAU
        } else {
            -(start - end).rem_euclid(TAU)
        }
    } else if end - start >= TAU {
        TAU
    } else {
        (end - start).rem_euclid(TAU)
    }
}

impl Surface {
    /// Surface of `width × height` CSS pixels backed by
    /// `ceil(width·ratio) × ceil(height·ratio)` device pixels.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Surface`] when the pixmap cannot be allocated.
    pub fn new(width: f64, height: f64, pixel_ratio: f64, mode: SurfaceMode) -> RenderResult<Self> {
        let pixel_ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            pixel_ratio
        } else {
            1.0
        };
        let pixmap = allocate(
            device_size(width, pixel_ratio),
            device_size(height, pixel_ratio),
        )?;
        tracing::trace!(width, height, pixel_ratio, ?mode, "allocated surface");
        Ok(Self {
            pixmap,
            width,
            height,
            pixel_ratio,
            mode,
            origin: (0.0, 0.0),
            state: DrawState::default(),
            stack: Vec::new(),
            path: Vec::new(),
            current: None,
            subpath_start: None,
        })
    }

    /// One-pixel hit surface whose only pixel sits under `point`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Surface`] when the pixmap cannot be allocated.
    pub fn sample(point: Vector2d, pixel_ratio: f64) -> RenderResult<Self> {
        let mut surface = Self::new(1.0, 1.0, 1.0, SurfaceMode::Hit)?;
        surface.pixel_ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            pixel_ratio
        } else {
            1.0
        };
        surface.origin = (
            (point.x * surface.pixel_ratio).floor(),
            (point.y * surface.pixel_ratio).floor(),
        );
        Ok(surface)
    }

    /// Width in CSS pixels.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Height in CSS pixels.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Device pixels per CSS pixel.
    #[must_use]
    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    /// Scene or hit.
    #[must_use]
    pub fn mode(&self) -> SurfaceMode {
        self.mode
    }

    /// Size of the backing pixmap.
    #[must_use]
    pub fn pixel_size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    /// Backing pixmap.
    #[must_use]
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// True when the surface matches the given CSS size and ratio.
    #[must_use]
    pub fn matches(&self, width: f64, height: f64, pixel_ratio: f64) -> bool {
        self.pixmap.width() == device_size(width, pixel_ratio)
            && self.pixmap.height() == device_size(height, pixel_ratio)
            && (self.pixel_ratio - pixel_ratio).abs() < f64::EPSILON
    }

    /// Reallocate for a new size or ratio, dropping the contents.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Surface`] when the pixmap cannot be allocated.
    pub fn resize(&mut self, width: f64, height: f64, pixel_ratio: f64) -> RenderResult<()> {
        *self = Self::new(width, height, pixel_ratio, self.mode)?;
        Ok(())
    }

    /// Drop every saved state and the current path.
    pub fn reset(&mut self) {
        self.state = DrawState::default();
        self.stack.clear();
        self.begin_path();
    }

    /// Clear every pixel.
    pub fn clear(&mut self) {
        self.pixmap.fill(Color::TRANSPARENT);
    }

    /// Clear a rectangle given in CSS pixels, ignoring the transform.
    #[allow(clippy::cast_possible_truncation)]
    pub fn clear_rect(&mut self, bounds: Rect) {
        let r = self.pixel_ratio;
        let Some(rect) = tiny_skia::Rect::from_xywh(
            (bounds.x * r - self.origin.0) as f32,
            (bounds.y * r - self.origin.1) as f32,
            (bounds.width * r) as f32,
            (bounds.height * r) as f32,
        ) else {
            return;
        };
        let paint = tiny_skia::Paint {
            blend_mode: BlendMode::Clear,
            anti_alias: false,
            ..tiny_skia::Paint::default()
        };
        self.pixmap
            .fill_rect(rect, &paint, Transform::identity(), None);
    }

    /// Straight RGBA of a device pixel.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let px = self.pixmap.pixel(x, y)?.demultiply();
        Some([px.red(), px.green(), px.blue(), px.alpha()])
    }

    /// Straight RGBA of the device pixel under a stage point.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn pixel_at(&self, point: Vector2d) -> Option<[u8; 4]> {
        let x = (point.x * self.pixel_ratio).floor() - self.origin.0;
        let y = (point.y * self.pixel_ratio).floor() - self.origin.1;
        if !(x >= 0.0 && y >= 0.0 && x.is_finite() && y.is_finite()) {
            return None;
        }
        self.pixel(x as u32, y as u32)
    }

    /// Global alpha for subsequent paints; ignored on hit surfaces.
    pub fn set_global_alpha(&mut self, alpha: f64) {
        self.state.alpha = alpha.clamp(0.0, 1.0);
    }

    /// Blend mode for subsequent paints, from a composite keyword; ignored
    /// on hit surfaces.
    pub fn set_composite(&mut self, operation: &str) {
        self.state.blend = style::blend_mode(operation);
    }

    /// Filter pattern images smoothly or with nearest-neighbor sampling.
    pub fn set_image_smoothing(&mut self, enabled: bool) {
        self.state.smoothing = enabled;
    }

    /// Composite another surface of the same pixel size on top.
    pub fn draw_surface(&mut self, other: &Self) {
        self.pixmap.draw_pixmap(
            0,
            0,
            other.pixmap.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }

    fn anti_alias(&self) -> bool {
        self.mode == SurfaceMode::Scene
    }

    fn blend(&self) -> BlendMode {
        match self.mode {
            SurfaceMode::Scene => self.state.blend,
            SurfaceMode::Hit => BlendMode::Source,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn device_transform(&self, shift: Vector2d) -> Transform {
        let r = self.pixel_ratio;
        let [a, b, c, d, e, f] = self.state.transform.m;
        Transform::from_row(
            (a * r) as f32,
            (b * r) as f32,
            (c * r) as f32,
            (d * r) as f32,
            ((e + shift.x) * r - self.origin.0) as f32,
            ((f + shift.y) * r - self.origin.1) as f32,
        )
    }

    #[allow(clippy::cast_possible_truncation)]
    fn build_path(&self) -> Option<Path> {
        let mut pb = PathBuilder::new();
        for segment in &self.path {
            match *segment {
                Segment::Move(x, y) => pb.move_to(x as f32, y as f32),
                Segment::Line(x, y) => pb.line_to(x as f32, y as f32),
                Segment::Quad(x1, y1, x, y) => {
                    pb.quad_to(x1 as f32, y1 as f32, x as f32, y as f32);
                }
                Segment::Cubic(x1, y1, x2, y2, x, y) => pb.cubic_to(
                    x1 as f32, y1 as f32, x2 as f32, y2 as f32, x as f32, y as f32,
                ),
                Segment::Close => pb.close(),
            }
        }
        pb.finish()
    }

    fn ensure_subpath(&mut self, x: f64, y: f64) {
        if self.current.is_none() {
            self.move_to(x, y);
        }
    }

    fn paint_fill(&mut self, shader: Shader<'_>, shift: Vector2d) {
        let Some(path) = self.build_path() else {
            return;
        };
        let paint = tiny_skia::Paint {
            shader,
            blend_mode: self.blend(),
            anti_alias: self.anti_alias(),
            ..tiny_skia::Paint::default()
        };
        let transform = self.device_transform(shift);
        self.pixmap.fill_path(
            &path,
            &paint,
            FillRule::Winding,
            transform,
            self.state.clip.as_ref(),
        );
    }

    fn paint_stroke(&mut self, shader: Shader<'_>, stroke: &Stroke, shift: Vector2d) {
        let Some(path) = self.build_path() else {
            return;
        };
        let paint = tiny_skia::Paint {
            shader,
            blend_mode: self.blend(),
            anti_alias: self.anti_alias(),
            ..tiny_skia::Paint::default()
        };
        let transform = self.device_transform(shift);
        self.pixmap
            .stroke_path(&path, &paint, stroke, transform, self.state.clip.as_ref());
    }

    fn shadow_shader(&self, shape: &Shape) -> Option<(Shader<'static>, Vector2d)> {
        let paint = &shape.paint;
        if !paint.has_shadow() {
            return None;
        }
        let rgba = paint
            .shadow
            .color
            .as_deref()
            .and_then(streak_core::Rgba::parse)?;
        let color = style::color(rgba, self.state.alpha * paint.shadow.opacity);
        Some((Shader::SolidColor(color), paint.shadow.offset))
    }

    fn key_shader(shape: &Shape) -> Option<Shader<'static>> {
        let [r, g, b] = shape.color_key()?.rgb();
        Some(Shader::SolidColor(Color::from_rgba8(r, g, b, 255)))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn fill_scene(&mut self, shape: &Shape) {
        let Some(source) = style::resolve_fill(&shape.paint) else {
            return;
        };
        if let Some((shader, offset)) = self.shadow_shader(shape) {
            self.paint_fill(shader, offset);
        }
        let alpha = self.state.alpha;
        let none = Vector2d::default();
        match source {
            FillSource::Color(rgba) => {
                self.paint_fill(Shader::SolidColor(style::color(rgba, alpha)), none);
            }
            FillSource::Linear(gradient) => {
                if let Some(shader) = style::linear_shader(gradient, alpha) {
                    self.paint_fill(shader, none);
                }
            }
            FillSource::Radial(gradient) => {
                if let Some(shader) = style::radial_shader(gradient, alpha) {
                    self.paint_fill(shader, none);
                }
            }
            FillSource::Pattern(fill, image) => {
                let Some(pixmap) = style::pattern_pixmap(image) else {
                    tracing::warn!("pattern image has too few pixels, skipping fill");
                    return;
                };
                let quality = if self.state.smoothing {
                    FilterQuality::Bilinear
                } else {
                    FilterQuality::Nearest
                };
                let spread = if fill.repeat {
                    SpreadMode::Repeat
                } else {
                    SpreadMode::Pad
                };
                let shader = Pattern::new(
                    pixmap.as_ref(),
                    spread,
                    quality,
                    alpha as f32,
                    style::pattern_transform(fill),
                );
                self.paint_fill(shader, none);
            }
        }
    }

    fn stroke_scene(&mut self, shape: &Shape) {
        let paint = &shape.paint;
        let Some(source) = style::resolve_stroke(paint) else {
            return;
        };
        let stroke = style::stroke(paint, paint.stroke_width, true);
        if paint.shadow.for_stroke {
            if let Some((shader, offset)) = self.shadow_shader(shape) {
                self.paint_stroke(shader, &stroke, offset);
            }
        }
        let alpha = self.state.alpha;
        let shader = match source {
            StrokeSource::Color(rgba) => Some(Shader::SolidColor(style::color(rgba, alpha))),
            StrokeSource::Linear(gradient) => style::linear_shader(gradient, alpha),
        };
        if let Some(shader) = shader {
            self.paint_stroke(shader, &stroke, Vector2d::default());
        }
    }
}

impl Context for Surface {
    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn translate(&mut self, x: f64, y: f64) {
        self.state.transform.translate(x, y);
    }

    fn rotate(&mut self, radians: f64) {
        self.state.transform.rotate(radians);
    }

    fn scale(&mut self, x: f64, y: f64) {
        self.state.transform.scale(x, y);
    }

    fn transform(&mut self, matrix: &Matrix) {
        self.state.transform.multiply(matrix);
    }

    fn set_transform(&mut self, matrix: &Matrix) {
        self.state.transform = *matrix;
    }

    fn begin_path(&mut self) {
        self.path.clear();
        self.current = None;
        self.subpath_start = None;
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.path.push(Segment::Move(x, y));
        self.current = Some((x, y));
        self.subpath_start = Some((x, y));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        if self.current.is_none() {
            self.move_to(x, y);
            return;
        }
        self.path.push(Segment::Line(x, y));
        self.current = Some((x, y));
    }

    fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64) {
        self.ensure_subpath(cpx, cpy);
        self.path.push(Segment::Quad(cpx, cpy, x, y));
        self.current = Some((x, y));
    }

    fn bezier_curve_to(&mut self, cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64, x: f64, y: f64) {
        self.ensure_subpath(cp1x, cp1y);
        self.path.push(Segment::Cubic(cp1x, cp1y, cp2x, cp2y, x, y));
        self.current = Some((x, y));
    }

    fn arc(&mut self, x: f64, y: f64, radius: f64, start: f64, end: f64, anticlockwise: bool) {
        self.ellipse(x, y, radius, radius, 0.0, start, end, anticlockwise);
    }

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
    ) {
        let (rx, ry) = (radius_x.abs(), radius_y.abs());
        let (rot_sin, rot_cos) = rotation.sin_cos();
        let map = |ux: f64, uy: f64| {
            let (px, py) = (rx * ux, ry * uy);
            (x + px * rot_cos - py * rot_sin, y + px * rot_sin + py * rot_cos)
        };

        let (sx, sy) = map(start.cos(), start.sin());
        if self.current.is_some() {
            self.line_to(sx, sy);
        } else {
            self.move_to(sx, sy);
        }

        let sweep = arc_sweep(start, end, anticlockwise);
        if sweep == 0.0 {
            return;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let segments = (sweep.abs() / FRAC_PI_2).ceil().max(1.0) as u32;
        let step = sweep / f64::from(segments);
        let k = 4.0 / 3.0 * (step / 4.0).tan();
        let mut a0 = start;
        for _ in 0..segments {
            let a1 = a0 + step;
            let (s0, c0) = a0.sin_cos();
            let (s1, c1) = a1.sin_cos();
            let (c1x, c1y) = map(c0 - k * s0, s0 + k * c0);
            let (c2x, c2y) = map(c1 + k * s1, s1 - k * c1);
            let (ex, ey) = map(c1, s1);
            self.path.push(Segment::Cubic(c1x, c1y, c2x, c2y, ex, ey));
            self.current = Some((ex, ey));
            a0 = a1;
        }
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.move_to(x, y);
        self.line_to(x + width, y);
        self.line_to(x + width, y + height);
        self.line_to(x, y + height);
        self.close_path();
    }

    fn close_path(&mut self) {
        if self.current.is_none() {
            return;
        }
        self.path.push(Segment::Close);
        self.current = self.subpath_start;
    }

    fn clip(&mut self) {
        let transform = self.device_transform(Vector2d::default());
        let anti_alias = self.anti_alias();
        let path = self.build_path();
        let (w, h) = self.pixel_size();
        let mask = match (self.state.clip.take(), path) {
            (Some(mut mask), Some(path)) => {
                mask.intersect_path(&path, FillRule::Winding, anti_alias, transform);
                Some(mask)
            }
            (None, Some(path)) => Mask::new(w, h).map(|mut mask| {
                mask.fill_path(&path, FillRule::Winding, anti_alias, transform);
                mask
            }),
            (_, None) => Mask::new(w, h),
        };
        self.state.clip = mask;
    }

    fn fill_shape(&mut self, shape: &Shape) {
        match self.mode {
            SurfaceMode::Scene => self.fill_scene(shape),
            SurfaceMode::Hit => {
                if !shape.paint.fill_enabled {
                    return;
                }
                if let Some(shader) = Self::key_shader(shape) {
                    self.paint_fill(shader, Vector2d::default());
                }
            }
        }
    }

    fn stroke_shape(&mut self, shape: &Shape) {
        match self.mode {
            SurfaceMode::Scene => self.stroke_scene(shape),
            SurfaceMode::Hit => {
                let Some(width) = shape.paint.hit_stroke() else {
                    return;
                };
                let stroke = style::stroke(&shape.paint, width, false);
                if let Some(shader) = Self::key_shader(shape) {
                    self.paint_stroke(shader, &stroke, Vector2d::default());
                }
            }
        }
    }

    fn is_hit(&self) -> bool {
        self.mode == SurfaceMode::Hit
    }
}
