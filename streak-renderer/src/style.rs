//! Paint-style resolution: maps a shape's paint attributes onto tiny-skia
//! colors, shaders, strokes and blend modes.

use streak_core::paint::{LinearGradient, PatternFill, RadialGradient};
use streak_core::{FillPriority, LineCap, LineJoin, Paint, PatternImage, Rgba};
use tiny_skia::{
    BlendMode, Color, ColorU8, GradientStop, Pixmap, Point, Shader, SpreadMode, Stroke,
    StrokeDash, Transform,
};

/// Where a fill comes from, after priority resolution.
#[derive(Debug, Clone, Copy)]
pub(crate) enum FillSource<'a> {
    Color(Rgba),
    Linear(&'a LinearGradient),
    Radial(&'a RadialGradient),
    Pattern(&'a PatternFill, &'a PatternImage),
}

/// Where a stroke comes from.
#[derive(Debug, Clone, Copy)]
pub(crate) enum StrokeSource<'a> {
    Color(Rgba),
    Linear(&'a LinearGradient),
}

fn source_for(paint: &Paint, priority: FillPriority) -> Option<FillSource<'_>> {
    match priority {
        FillPriority::Color => paint
            .fill
            .as_deref()
            .and_then(Rgba::parse)
            .map(FillSource::Color),
        FillPriority::LinearGradient => (!paint.fill_linear.stops.is_empty())
            .then_some(FillSource::Linear(&paint.fill_linear)),
        FillPriority::RadialGradient => (!paint.fill_radial.stops.is_empty())
            .then_some(FillSource::Radial(&paint.fill_radial)),
        FillPriority::Pattern => paint
            .fill_pattern
            .image
            .as_deref()
            .map(|image| FillSource::Pattern(&paint.fill_pattern, image)),
    }
}

/// Fill source: the explicit priority when its source is present, then
/// color, linear gradient, radial gradient and pattern in that order.
pub(crate) fn resolve_fill(paint: &Paint) -> Option<FillSource<'_>> {
    if !paint.fill_enabled {
        return None;
    }
    source_for(paint, paint.fill_priority).or_else(|| {
        [
            FillPriority::Color,
            FillPriority::LinearGradient,
            FillPriority::RadialGradient,
            FillPriority::Pattern,
        ]
        .into_iter()
        .find_map(|priority| source_for(paint, priority))
    })
}

/// Stroke source: the linear stroke gradient, else the solid color.
pub(crate) fn resolve_stroke(paint: &Paint) -> Option<StrokeSource<'_>> {
    if !paint.has_stroke() {
        return None;
    }
    if paint.stroke_linear.stops.is_empty() {
        paint
            .stroke
            .as_deref()
            .and_then(Rgba::parse)
            .map(StrokeSource::Color)
    } else {
        Some(StrokeSource::Linear(&paint.stroke_linear))
    }
}

/// tiny-skia color with an extra alpha factor.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn color(rgba: Rgba, alpha: f64) -> Color {
    let mut color = Color::from_rgba8(rgba.r, rgba.g, rgba.b, 255);
    color.apply_opacity((rgba.a * alpha).clamp(0.0, 1.0) as f32);
    color
}

#[allow(clippy::cast_possible_truncation)]
fn stops(stops: &[(f64, String)], alpha: f64) -> Vec<GradientStop> {
    stops
        .iter()
        .filter_map(|(offset, css)| {
            let rgba = Rgba::parse(css)?;
            Some(GradientStop::new(
                offset.clamp(0.0, 1.0) as f32,
                color(rgba, alpha),
            ))
        })
        .collect()
}

#[allow(clippy::cast_possible_truncation)]
fn point(x: f64, y: f64) -> Point {
    Point::from_xy(x as f32, y as f32)
}

/// Shader for a linear gradient in shape space. A single stop yields a
/// solid color, no usable stops yield `None`.
pub(crate) fn linear_shader(gradient: &LinearGradient, alpha: f64) -> Option<Shader<'static>> {
    tiny_skia::LinearGradient::new(
        point(gradient.start.x, gradient.start.y),
        point(gradient.end.x, gradient.end.y),
        stops(&gradient.stops, alpha),
        SpreadMode::Pad,
        Transform::identity(),
    )
}

/// Shader for a radial gradient in shape space. tiny-skia takes one radius,
/// so the end radius is used and the start circle collapses to its center.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn radial_shader(gradient: &RadialGradient, alpha: f64) -> Option<Shader<'static>> {
    tiny_skia::RadialGradient::new(
        point(gradient.start.x, gradient.start.y),
        point(gradient.end.x, gradient.end.y),
        gradient.end_radius.max(gradient.start_radius) as f32,
        stops(&gradient.stops, alpha),
        SpreadMode::Pad,
        Transform::identity(),
    )
}

/// Premultiplied pixmap copy of a straight-alpha pattern image.
pub(crate) fn pattern_pixmap(image: &PatternImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width, image.height)?;
    let expected = image.width as usize * image.height as usize * 4;
    if image.rgba.len() < expected {
        return None;
    }
    for (dst, src) in pixmap
        .pixels_mut()
        .iter_mut()
        .zip(image.rgba.chunks_exact(4))
    {
        *dst = ColorU8::from_rgba(src[0], src[1], src[2], src[3]).premultiply();
    }
    Some(pixmap)
}

/// Pattern placement in shape space: rotate, scale, then shift by the
/// negative offset.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn pattern_transform(fill: &PatternFill) -> Transform {
    Transform::from_rotate(fill.rotation as f32)
        .pre_scale(fill.scale.x as f32, fill.scale.y as f32)
        .pre_translate(-fill.offset.x as f32, -fill.offset.y as f32)
}

/// Stroke settings for a given width.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn stroke(paint: &Paint, width: f64, dashed: bool) -> Stroke {
    let dash = if dashed {
        let dash = paint.active_dash();
        if dash.is_empty() {
            None
        } else {
            StrokeDash::new(
                dash.iter().map(|d| *d as f32).collect(),
                paint.dash_offset as f32,
            )
        }
    } else {
        None
    };
    Stroke {
        width: width as f32,
        line_cap: match paint.line_cap {
            LineCap::Butt => tiny_skia::LineCap::Butt,
            LineCap::Round => tiny_skia::LineCap::Round,
            LineCap::Square => tiny_skia::LineCap::Square,
        },
        line_join: match paint.line_join {
            LineJoin::Miter => tiny_skia::LineJoin::Miter,
            LineJoin::Round => tiny_skia::LineJoin::Round,
            LineJoin::Bevel => tiny_skia::LineJoin::Bevel,
        },
        dash,
        ..Stroke::default()
    }
}

/// Blend mode for a `globalCompositeOperation` keyword.
pub(crate) fn blend_mode(operation: &str) -> BlendMode {
    match operation {
        "source-in" => BlendMode::SourceIn,
        "source-out" => BlendMode::SourceOut,
        "source-atop" => BlendMode::SourceAtop,
        "destination-over" => BlendMode::DestinationOver,
        "destination-in" => BlendMode::DestinationIn,
        "destination-out" => BlendMode::DestinationOut,
        "destination-atop" => BlendMode::DestinationAtop,
        "lighter" => BlendMode::Plus,
        "copy" => BlendMode::Source,
        "xor" => BlendMode::Xor,
        "multiply" => BlendMode::Multiply,
        "screen" => BlendMode::Screen,
        "overlay" => BlendMode::Overlay,
        "darken" => BlendMode::Darken,
        "lighten" => BlendMode::Lighten,
        "color-dodge" => BlendMode::ColorDodge,
        "color-burn" => BlendMode::ColorBurn,
        "hard-light" => BlendMode::HardLight,
        "soft-light" => BlendMode::SoftLight,
        "difference" => BlendMode::Difference,
        "exclusion" => BlendMode::Exclusion,
        "hue" => BlendMode::Hue,
        "saturation" => BlendMode::Saturation,
        "color" => BlendMode::Color,
        "luminosity" => BlendMode::Luminosity,
        _ => BlendMode::SourceOver,
    }
}
