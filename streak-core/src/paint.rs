//! Paint attributes of a shape: fill, stroke, gradients, pattern, shadow
//! and dash.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::attrs::{color_stops_value, parse_color_stops};
use crate::geometry::Vector2d;

/// How the ends of open strokes are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    /// Flat end at the last point.
    #[default]
    Butt,
    /// Half-disc end.
    Round,
    /// Flat end extended by half the stroke width.
    Square,
}

/// How stroke segments are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    /// Sharp corner.
    #[default]
    Miter,
    /// Rounded corner.
    Round,
    /// Cut-off corner.
    Bevel,
}

/// Preferred fill source when several are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillPriority {
    /// Solid `fill` color.
    #[default]
    Color,
    /// Linear gradient.
    LinearGradient,
    /// Radial gradient.
    RadialGradient,
    /// Raster pattern.
    Pattern,
}

macro_rules! keyword_enum {
    ($ty:ty { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// Keyword used in attribute values.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            /// Parse the attribute keyword, falling back to the default.
            #[must_use]
            pub fn from_keyword(keyword: &str) -> Self {
                match keyword {
                    $($text => Self::$variant,)+
                    _ => Self::default(),
                }
            }
        }
    };
}

keyword_enum!(LineCap { Butt => "butt", Round => "round", Square => "square" });
keyword_enum!(LineJoin { Miter => "miter", Round => "round", Bevel => "bevel" });
keyword_enum!(FillPriority {
    Color => "color",
    LinearGradient => "linear-gradient",
    RadialGradient => "radial-gradient",
    Pattern => "pattern",
});

/// Gradient between two points.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinearGradient {
    /// Start point in shape space.
    pub start: Vector2d,
    /// End point in shape space.
    pub end: Vector2d,
    /// `(offset, color)` stops.
    pub stops: Vec<(f64, String)>,
}

/// Two-circle radial gradient.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RadialGradient {
    /// Center of the start circle.
    pub start: Vector2d,
    /// Center of the end circle.
    pub end: Vector2d,
    /// Radius of the start circle.
    pub start_radius: f64,
    /// Radius of the end circle.
    pub end_radius: f64,
    /// `(offset, color)` stops.
    pub stops: Vec<(f64, String)>,
}

/// Raster image supplied by the application for pattern fills.
///
/// Pixels are straight (non-premultiplied) RGBA8, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct PatternImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `width * height * 4` bytes.
    pub rgba: Vec<u8>,
}

impl fmt::Debug for PatternImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Pattern fill placement. The image itself is never serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternFill {
    /// Image to tile.
    pub image: Option<Rc<PatternImage>>,
    /// Tile in both directions, or draw once.
    pub repeat: bool,
    /// Pattern origin.
    pub offset: Vector2d,
    /// Pattern scale.
    pub scale: Vector2d,
    /// Pattern rotation in degrees.
    pub rotation: f64,
}

impl Default for PatternFill {
    fn default() -> Self {
        Self {
            image: None,
            repeat: true,
            offset: Vector2d::default(),
            scale: Vector2d::new(1.0, 1.0),
            rotation: 0.0,
        }
    }
}

/// Drop shadow.
#[derive(Debug, Clone, PartialEq)]
pub struct Shadow {
    /// Shadow color; no shadow when unset.
    pub color: Option<String>,
    /// Blur radius (recorded, not rasterized).
    pub blur: f64,
    /// Offset from the shape.
    pub offset: Vector2d,
    /// Shadow opacity.
    pub opacity: f64,
    /// Master switch.
    pub enabled: bool,
    /// Also shadow the stroke.
    pub for_stroke: bool,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            color: None,
            blur: 0.0,
            offset: Vector2d::default(),
            opacity: 1.0,
            enabled: true,
            for_stroke: true,
        }
    }
}

/// Every paint attribute of a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Paint {
    /// Solid fill color.
    pub fill: Option<String>,
    /// Fill switch.
    pub fill_enabled: bool,
    /// Preferred fill source.
    pub fill_priority: FillPriority,
    /// Linear fill gradient.
    pub fill_linear: LinearGradient,
    /// Radial fill gradient.
    pub fill_radial: RadialGradient,
    /// Pattern fill.
    pub fill_pattern: PatternFill,
    /// Solid stroke color.
    pub stroke: Option<String>,
    /// Stroke switch.
    pub stroke_enabled: bool,
    /// Stroke width in local units.
    pub stroke_width: f64,
    /// Linear stroke gradient.
    pub stroke_linear: LinearGradient,
    /// Whether the stroke is painted on the hit surface.
    pub stroke_hit_enabled: bool,
    /// Width of the stroke on the hit surface; `None` uses `stroke_width`.
    pub hit_stroke_width: Option<f64>,
    /// Line cap.
    pub line_cap: LineCap,
    /// Line join.
    pub line_join: LineJoin,
    /// Dash lengths, alternating on and off.
    pub dash: Vec<f64>,
    /// Dash switch.
    pub dash_enabled: bool,
    /// Phase into the dash pattern.
    pub dash_offset: f64,
    /// Drop shadow.
    pub shadow: Shadow,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            fill: None,
            fill_enabled: true,
            fill_priority: FillPriority::Color,
            fill_linear: LinearGradient::default(),
            fill_radial: RadialGradient::default(),
            fill_pattern: PatternFill::default(),
            stroke: None,
            stroke_enabled: true,
            stroke_width: 2.0,
            stroke_linear: LinearGradient::default(),
            stroke_hit_enabled: true,
            hit_stroke_width: None,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Miter,
            dash: Vec::new(),
            dash_enabled: true,
            dash_offset: 0.0,
            shadow: Shadow::default(),
        }
    }
}

impl Paint {
    /// True when some fill source is present.
    #[must_use]
    pub fn has_fill(&self) -> bool {
        self.fill_enabled
            && (self.fill.is_some()
                || !self.fill_linear.stops.is_empty()
                || !self.fill_radial.stops.is_empty()
                || self.fill_pattern.image.is_some())
    }

    /// True when the stroke would paint anything.
    #[must_use]
    pub fn has_stroke(&self) -> bool {
        self.stroke_enabled
            && self.stroke_width > 0.0
            && (self.stroke.is_some() || !self.stroke_linear.stops.is_empty())
    }

    /// True when a shadow is configured and enabled.
    #[must_use]
    pub fn has_shadow(&self) -> bool {
        self.shadow.enabled && self.shadow.color.is_some() && self.shadow.opacity > 0.0
    }

    /// Stroke width used on the hit surface, or `None` for no hit stroke.
    #[must_use]
    pub fn hit_stroke(&self) -> Option<f64> {
        if !self.stroke_hit_enabled || !self.stroke_enabled {
            return None;
        }
        let width = match self.hit_stroke_width {
            Some(w) => w,
            None if self.has_stroke() => self.stroke_width,
            None => return None,
        };
        (width > 0.0).then_some(width)
    }

    /// Dash pattern in effect, empty for a solid line.
    #[must_use]
    pub fn active_dash(&self) -> &[f64] {
        if self.dash_enabled {
            &self.dash
        } else {
            &[]
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<Value> {
        let stops = color_stops_value;
        Some(match name {
            "fill" => opt_text(self.fill.as_deref()),
            "fillEnabled" => self.fill_enabled.into(),
            "fillPriority" => self.fill_priority.as_str().into(),
            "stroke" => opt_text(self.stroke.as_deref()),
            "strokeEnabled" => self.stroke_enabled.into(),
            "strokeWidth" => self.stroke_width.into(),
            "strokeHitEnabled" => self.stroke_hit_enabled.into(),
            "hitStrokeWidth" => self.hit_stroke_width.map_or(Value::Null, Value::from),
            "lineCap" => self.line_cap.as_str().into(),
            "lineJoin" => self.line_join.as_str().into(),
            "dash" => self.dash.clone().into(),
            "dashEnabled" => self.dash_enabled.into(),
            "dashOffset" => self.dash_offset.into(),
            "shadowColor" => opt_text(self.shadow.color.as_deref()),
            "shadowBlur" => self.shadow.blur.into(),
            "shadowOffsetX" => self.shadow.offset.x.into(),
            "shadowOffsetY" => self.shadow.offset.y.into(),
            "shadowOpacity" => self.shadow.opacity.into(),
            "shadowEnabled" => self.shadow.enabled.into(),
            "shadowForStrokeEnabled" => self.shadow.for_stroke.into(),
            "fillLinearGradientStartPointX" => self.fill_linear.start.x.into(),
            "fillLinearGradientStartPointY" => self.fill_linear.start.y.into(),
            "fillLinearGradientEndPointX" => self.fill_linear.end.x.into(),
            "fillLinearGradientEndPointY" => self.fill_linear.end.y.into(),
            "fillLinearGradientColorStops" => stops(&self.fill_linear.stops),
            "fillRadialGradientStartPointX" => self.fill_radial.start.x.into(),
            "fillRadialGradientStartPointY" => self.fill_radial.start.y.into(),
            "fillRadialGradientEndPointX" => self.fill_radial.end.x.into(),
            "fillRadialGradientEndPointY" => self.fill_radial.end.y.into(),
            "fillRadialGradientStartRadius" => self.fill_radial.start_radius.into(),
            "fillRadialGradientEndRadius" => self.fill_radial.end_radius.into(),
            "fillRadialGradientColorStops" => stops(&self.fill_radial.stops),
            "strokeLinearGradientStartPointX" => self.stroke_linear.start.x.into(),
            "strokeLinearGradientStartPointY" => self.stroke_linear.start.y.into(),
            "strokeLinearGradientEndPointX" => self.stroke_linear.end.x.into(),
            "strokeLinearGradientEndPointY" => self.stroke_linear.end.y.into(),
            "strokeLinearGradientColorStops" => stops(&self.stroke_linear.stops),
            "fillPatternRepeat" => {
                Value::from(if self.fill_pattern.repeat {
                    "repeat"
                } else {
                    "no-repeat"
                })
            }
            "fillPatternX" => self.fill_pattern.offset.x.into(),
            "fillPatternY" => self.fill_pattern.offset.y.into(),
            "fillPatternScaleX" => self.fill_pattern.scale.x.into(),
            "fillPatternScaleY" => self.fill_pattern.scale.y.into(),
            "fillPatternRotation" => self.fill_pattern.rotation.into(),
            _ => return None,
        })
    }

    /// Store an already-validated value. Returns `false` for names that are
    /// not paint attributes.
    pub(crate) fn set(&mut self, name: &str, value: &Value) -> bool {
        match name {
            "fill" => self.fill = text(value),
            "fillEnabled" => self.fill_enabled = flag(value),
            "fillPriority" => self.fill_priority = FillPriority::from_keyword(keyword(value)),
            "stroke" => self.stroke = text(value),
            "strokeEnabled" => self.stroke_enabled = flag(value),
            "strokeWidth" => self.stroke_width = num(value),
            "strokeHitEnabled" => self.stroke_hit_enabled = flag(value),
            "hitStrokeWidth" => self.hit_stroke_width = value.as_f64(),
            "lineCap" => self.line_cap = LineCap::from_keyword(keyword(value)),
            "lineJoin" => self.line_join = LineJoin::from_keyword(keyword(value)),
            "dash" => self.dash = numbers(value),
            "dashEnabled" => self.dash_enabled = flag(value),
            "dashOffset" => self.dash_offset = num(value),
            "shadowColor" => self.shadow.color = text(value),
            "shadowBlur" => self.shadow.blur = num(value),
            "shadowOffsetX" => self.shadow.offset.x = num(value),
            "shadowOffsetY" => self.shadow.offset.y = num(value),
            "shadowOpacity" => self.shadow.opacity = num(value),
            "shadowEnabled" => self.shadow.enabled = flag(value),
            "shadowForStrokeEnabled" => self.shadow.for_stroke = flag(value),
            "fillLinearGradientStartPointX" => self.fill_linear.start.x = num(value),
            "fillLinearGradientStartPointY" => self.fill_linear.start.y = num(value),
            "fillLinearGradientEndPointX" => self.fill_linear.end.x = num(value),
            "fillLinearGradientEndPointY" => self.fill_linear.end.y = num(value),
            "fillLinearGradientColorStops" => self.fill_linear.stops = stops(value),
            "fillRadialGradientStartPointX" => self.fill_radial.start.x = num(value),
            "fillRadialGradientStartPointY" => self.fill_radial.start.y = num(value),
            "fillRadialGradientEndPointX" => self.fill_radial.end.x = num(value),
            "fillRadialGradientEndPointY" => self.fill_radial.end.y = num(value),
            "fillRadialGradientStartRadius" => self.fill_radial.start_radius = num(value),
            "fillRadialGradientEndRadius" => self.fill_radial.end_radius = num(value),
            "fillRadialGradientColorStops" => self.fill_radial.stops = stops(value),
            "strokeLinearGradientStartPointX" => self.stroke_linear.start.x = num(value),
            "strokeLinearGradientStartPointY" => self.stroke_linear.start.y = num(value),
            "strokeLinearGradientEndPointX" => self.stroke_linear.end.x = num(value),
            "strokeLinearGradientEndPointY" => self.stroke_linear.end.y = num(value),
            "strokeLinearGradientColorStops" => self.stroke_linear.stops = stops(value),
            "fillPatternRepeat" => self.fill_pattern.repeat = keyword(value) != "no-repeat",
            "fillPatternX" => self.fill_pattern.offset.x = num(value),
            "fillPatternY" => self.fill_pattern.offset.y = num(value),
            "fillPatternScaleX" => self.fill_pattern.scale.x = num(value),
            "fillPatternScaleY" => self.fill_pattern.scale.y = num(value),
            "fillPatternRotation" => self.fill_pattern.rotation = num(value),
            _ => return false,
        }
        true
    }
}

pub(crate) fn opt_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, Value::from)
}

pub(crate) fn text(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

pub(crate) fn keyword(value: &Value) -> &str {
    value.as_str().unwrap_or_default()
}

pub(crate) fn num(value: &Value) -> f64 {
    value.as_f64().unwrap_or_default()
}

pub(crate) fn flag(value: &Value) -> bool {
    value.as_bool().unwrap_or_default()
}

pub(crate) fn numbers(value: &Value) -> Vec<f64> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(Value::as_f64).collect())
        .unwrap_or_default()
}

fn stops(value: &Value) -> Vec<(f64, String)> {
    value
        .as_array()
        .and_then(|items| parse_color_stops(items))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keywords() {
        assert_eq!(LineCap::from_keyword("round"), LineCap::Round);
        assert_eq!(LineJoin::from_keyword("bevel").as_str(), "bevel");
        assert_eq!(
            FillPriority::from_keyword("radial-gradient"),
            FillPriority::RadialGradient
        );
        assert_eq!(LineCap::from_keyword("??"), LineCap::Butt);
    }

    #[test]
    fn test_get_set_symmetry() {
        let mut paint = Paint::default();
        assert!(paint.set("stroke", &json!("blue")));
        assert!(paint.set("dash", &json!([4.0, 2.0])));
        assert!(paint.set("fillRadialGradientColorStops", &json!([0.0, "red", 1.0, "blue"])));
        assert_eq!(paint.get("stroke"), Some(json!("blue")));
        assert_eq!(paint.get("dash"), Some(json!([4.0, 2.0])));
        assert_eq!(paint.fill_radial.stops.len(), 2);
        assert!(!paint.set("radius", &json!(3.0)));
        assert_eq!(paint.get("radius"), None);
    }

    #[test]
    fn test_has_stroke_needs_a_source() {
        let mut paint = Paint::default();
        assert!(!paint.has_stroke());
        paint.stroke = Some("black".into());
        assert!(paint.has_stroke());
        paint.stroke_width = 0.0;
        assert!(!paint.has_stroke());
    }

    #[test]
    fn test_hit_stroke_width() {
        let mut paint = Paint::default();
        assert_eq!(paint.hit_stroke(), None);
        paint.stroke = Some("black".into());
        assert_eq!(paint.hit_stroke(), Some(2.0));
        paint.hit_stroke_width = Some(10.0);
        assert_eq!(paint.hit_stroke(), Some(10.0));
        paint.stroke_hit_enabled = false;
        assert_eq!(paint.hit_stroke(), None);
    }

    #[test]
    fn test_dash_switch() {
        let mut paint = Paint::default();
        paint.dash = vec![5.0, 5.0];
        assert_eq!(paint.active_dash(), &[5.0, 5.0]);
        paint.dash_enabled = false;
        assert!(paint.active_dash().is_empty());
    }
}
