//! Attribute schema: the validator table consulted on every write.
//!
//! Each known attribute name maps to an [`AttrDef`] giving its value kind,
//! its default and the cache it invalidates. Node kinds store the values in
//! typed fields (see [`crate::node`]); this module only decides whether a
//! value is acceptable and how to coerce it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::color::Rgba;

/// Which cached state a write invalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrEffect {
    /// Local (and therefore every descendant's absolute) transform.
    Transform,
    /// Painted appearance only.
    Paint,
    /// Nothing (unknown or purely informational attributes).
    None,
}

/// Shape of an accepted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Any finite number.
    Number,
    /// Finite number clamped to `>= 0`.
    NonNegative,
    /// Finite number clamped to `[0, 1]`.
    UnitInterval,
    /// Finite number rounded and clamped to `[min, max]`.
    Count {
        /// Smallest accepted count.
        min: u32,
        /// Largest accepted count.
        max: u32,
    },
    /// Boolean.
    Bool,
    /// `true`, `false` or `"inherit"`.
    Tristate,
    /// Free text; numbers are converted to text.
    Text,
    /// Color string understood by [`Rgba::parse`].
    Color,
    /// Array of finite numbers.
    Numbers,
    /// Alternating `[offset, color, offset, color, ...]`.
    ColorStops,
    /// One of a fixed set of strings.
    Choice(&'static [&'static str]),
}

/// Default value of an attribute, as stored in [`AttrDef`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttrDefault {
    /// Absent (`null`).
    Unset,
    /// A number.
    Number(f64),
    /// A boolean.
    Bool(bool),
    /// A string.
    Text(&'static str),
    /// An empty array.
    Empty,
}

impl AttrDefault {
    /// JSON form of the default.
    #[must_use]
    pub fn to_value(self) -> Value {
        match self {
            Self::Unset => Value::Null,
            Self::Number(n) => Value::from(n),
            Self::Bool(b) => Value::Bool(b),
            Self::Text(s) => Value::from(s),
            Self::Empty => Value::Array(Vec::new()),
        }
    }
}

/// One row of the validator table.
#[derive(Debug, Clone, Copy)]
pub struct AttrDef {
    /// Attribute name as used in documents and `set_attr`.
    pub name: &'static str,
    /// Accepted value shape.
    pub kind: ValueKind,
    /// Default value; attributes equal to it are left out of documents.
    pub default: AttrDefault,
    /// Cache invalidated by a write.
    pub effect: AttrEffect,
}

const fn def(
    name: &'static str,
    kind: ValueKind,
    default: AttrDefault,
    effect: AttrEffect,
) -> AttrDef {
    AttrDef {
        name,
        kind,
        default,
        effect,
    }
}

use AttrDefault as D;
use AttrEffect as E;
use ValueKind as K;

/// Largest accepted polygon side or star point count.
pub const MAX_COUNT: u32 = 1024;

/// Accepted `globalCompositeOperation` values.
pub const COMPOSITE_OPERATIONS: &[&str] = &[
    "source-over",
    "source-in",
    "source-out",
    "source-atop",
    "destination-over",
    "destination-in",
    "destination-out",
    "destination-atop",
    "lighter",
    "copy",
    "xor",
    "multiply",
    "screen",
    "overlay",
    "darken",
    "lighten",
    "color-dodge",
    "color-burn",
    "hard-light",
    "soft-light",
    "difference",
    "exclusion",
    "hue",
    "saturation",
    "color",
    "luminosity",
];

const LINE_CAPS: &[&str] = &["butt", "round", "square"];
const LINE_JOINS: &[&str] = &["miter", "round", "bevel"];
const FILL_PRIORITIES: &[&str] = &["color", "linear-gradient", "radial-gradient", "pattern"];
const PATTERN_REPEATS: &[&str] = &["repeat", "no-repeat"];

/// Every attribute the engine understands.
pub static ATTRIBUTES: &[AttrDef] = &[
    // Node
    def("id", K::Text, D::Unset, E::None),
    def("name", K::Text, D::Unset, E::None),
    def("x", K::Number, D::Number(0.0), E::Transform),
    def("y", K::Number, D::Number(0.0), E::Transform),
    def("rotation", K::Number, D::Number(0.0), E::Transform),
    def("scaleX", K::Number, D::Number(1.0), E::Transform),
    def("scaleY", K::Number, D::Number(1.0), E::Transform),
    def("skewX", K::Number, D::Number(0.0), E::Transform),
    def("skewY", K::Number, D::Number(0.0), E::Transform),
    def("offsetX", K::Number, D::Number(0.0), E::Transform),
    def("offsetY", K::Number, D::Number(0.0), E::Transform),
    def("opacity", K::UnitInterval, D::Number(1.0), E::Paint),
    def("visible", K::Tristate, D::Text("inherit"), E::Paint),
    def("listening", K::Tristate, D::Text("inherit"), E::Paint),
    def(
        "globalCompositeOperation",
        K::Choice(COMPOSITE_OPERATIONS),
        D::Text("source-over"),
        E::Paint,
    ),
    // Stage and sized shapes
    def("width", K::NonNegative, D::Number(0.0), E::Paint),
    def("height", K::NonNegative, D::Number(0.0), E::Paint),
    // Containers
    def("clipX", K::Number, D::Number(0.0), E::Paint),
    def("clipY", K::Number, D::Number(0.0), E::Paint),
    def("clipWidth", K::NonNegative, D::Number(0.0), E::Paint),
    def("clipHeight", K::NonNegative, D::Number(0.0), E::Paint),
    // Layers
    def("clearBeforeDraw", K::Bool, D::Bool(true), E::Paint),
    def("imageSmoothingEnabled", K::Bool, D::Bool(true), E::Paint),
    def("hitGraphEnabled", K::Bool, D::Bool(true), E::Paint),
    // Shape paint
    def("fill", K::Color, D::Unset, E::Paint),
    def("fillEnabled", K::Bool, D::Bool(true), E::Paint),
    def(
        "fillPriority",
        K::Choice(FILL_PRIORITIES),
        D::Text("color"),
        E::Paint,
    ),
    def("stroke", K::Color, D::Unset, E::Paint),
    def("strokeEnabled", K::Bool, D::Bool(true), E::Paint),
    def("strokeWidth", K::NonNegative, D::Number(2.0), E::Paint),
    def("strokeHitEnabled", K::Bool, D::Bool(true), E::Paint),
    def("hitStrokeWidth", K::NonNegative, D::Unset, E::Paint),
    def("lineCap", K::Choice(LINE_CAPS), D::Text("butt"), E::Paint),
    def("lineJoin", K::Choice(LINE_JOINS), D::Text("miter"), E::Paint),
    def("dash", K::Numbers, D::Empty, E::Paint),
    def("dashEnabled", K::Bool, D::Bool(true), E::Paint),
    def("dashOffset", K::Number, D::Number(0.0), E::Paint),
    def("shadowColor", K::Color, D::Unset, E::Paint),
    def("shadowBlur", K::NonNegative, D::Number(0.0), E::Paint),
    def("shadowOffsetX", K::Number, D::Number(0.0), E::Paint),
    def("shadowOffsetY", K::Number, D::Number(0.0), E::Paint),
    def("shadowOpacity", K::UnitInterval, D::Number(1.0), E::Paint),
    def("shadowEnabled", K::Bool, D::Bool(true), E::Paint),
    def("shadowForStrokeEnabled", K::Bool, D::Bool(true), E::Paint),
    def("fillLinearGradientStartPointX", K::Number, D::Number(0.0), E::Paint),
    def("fillLinearGradientStartPointY", K::Number, D::Number(0.0), E::Paint),
    def("fillLinearGradientEndPointX", K::Number, D::Number(0.0), E::Paint),
    def("fillLinearGradientEndPointY", K::Number, D::Number(0.0), E::Paint),
    def("fillLinearGradientColorStops", K::ColorStops, D::Empty, E::Paint),
    def("fillRadialGradientStartPointX", K::Number, D::Number(0.0), E::Paint),
    def("fillRadialGradientStartPointY", K::Number, D::Number(0.0), E::Paint),
    def("fillRadialGradientEndPointX", K::Number, D::Number(0.0), E::Paint),
    def("fillRadialGradientEndPointY", K::Number, D::Number(0.0), E::Paint),
    def("fillRadialGradientStartRadius", K::NonNegative, D::Number(0.0), E::Paint),
    def("fillRadialGradientEndRadius", K::NonNegative, D::Number(0.0), E::Paint),
    def("fillRadialGradientColorStops", K::ColorStops, D::Empty, E::Paint),
    def("strokeLinearGradientStartPointX", K::Number, D::Number(0.0), E::Paint),
    def("strokeLinearGradientStartPointY", K::Number, D::Number(0.0), E::Paint),
    def("strokeLinearGradientEndPointX", K::Number, D::Number(0.0), E::Paint),
    def("strokeLinearGradientEndPointY", K::Number, D::Number(0.0), E::Paint),
    def("strokeLinearGradientColorStops", K::ColorStops, D::Empty, E::Paint),
    def("fillPatternRepeat", K::Choice(PATTERN_REPEATS), D::Text("repeat"), E::Paint),
    def("fillPatternX", K::Number, D::Number(0.0), E::Paint),
    def("fillPatternY", K::Number, D::Number(0.0), E::Paint),
    def("fillPatternScaleX", K::Number, D::Number(1.0), E::Paint),
    def("fillPatternScaleY", K::Number, D::Number(1.0), E::Paint),
    def("fillPatternRotation", K::Number, D::Number(0.0), E::Paint),
    // Shape geometry
    def("cornerRadius", K::NonNegative, D::Number(0.0), E::Paint),
    def("radius", K::NonNegative, D::Number(0.0), E::Paint),
    def("radiusX", K::NonNegative, D::Number(0.0), E::Paint),
    def("radiusY", K::NonNegative, D::Number(0.0), E::Paint),
    def("innerRadius", K::NonNegative, D::Number(0.0), E::Paint),
    def("outerRadius", K::NonNegative, D::Number(0.0), E::Paint),
    def("angle", K::Number, D::Number(0.0), E::Paint),
    def("clockwise", K::Bool, D::Bool(false), E::Paint),
    def("points", K::Numbers, D::Empty, E::Paint),
    def("closed", K::Bool, D::Bool(false), E::Paint),
    def("tension", K::Number, D::Number(0.0), E::Paint),
    def("sides", K::Count { min: 3, max: MAX_COUNT }, D::Number(3.0), E::Paint),
    def("numPoints", K::Count { min: 2, max: MAX_COUNT }, D::Number(5.0), E::Paint),
];

/// Look up an attribute definition by name.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static AttrDef> {
    ATTRIBUTES.iter().find(|d| d.name == name)
}

/// Why a write was refused.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrRejection {
    /// Attribute name.
    pub name: &'static str,
    /// Human-readable reason.
    pub reason: String,
}

/// A value that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    /// The (possibly coerced) value to store.
    pub value: Value,
    /// Whether the input had to be coerced.
    pub coerced: bool,
}

impl AttrDef {
    /// Check `value` against this definition. `null` always passes and means
    /// "reset to default".
    ///
    /// # Errors
    ///
    /// Returns [`AttrRejection`] when the value has the wrong shape.
    pub fn validate(&self, value: Value) -> Result<Validated, AttrRejection> {
        if value.is_null() {
            return Ok(Validated {
                value,
                coerced: false,
            });
        }
        let reject = |reason: &str| AttrRejection {
            name: self.name,
            reason: reason.to_string(),
        };
        let clamp = |v: f64, lo: f64, hi: f64| {
            let c = v.clamp(lo, hi);
            Ok(Validated {
                value: Value::from(c),
                coerced: c != v,
            })
        };
        match self.kind {
            K::Number => {
                let v = finite(&value).ok_or_else(|| reject("expected a finite number"))?;
                Ok(Validated {
                    value: Value::from(v),
                    coerced: false,
                })
            }
            K::NonNegative => {
                let v = finite(&value).ok_or_else(|| reject("expected a finite number"))?;
                clamp(v, 0.0, f64::MAX)
            }
            K::UnitInterval => {
                let v = finite(&value).ok_or_else(|| reject("expected a finite number"))?;
                clamp(v, 0.0, 1.0)
            }
            K::Count { min, max } => {
                let v = finite(&value).ok_or_else(|| reject("expected a finite number"))?;
                let c = v.round().clamp(f64::from(min), f64::from(max));
                Ok(Validated {
                    value: Value::from(c),
                    coerced: c != v,
                })
            }
            K::Bool => match value {
                Value::Bool(_) => Ok(Validated {
                    value,
                    coerced: false,
                }),
                _ => Err(reject("expected a boolean")),
            },
            K::Tristate => match &value {
                Value::Bool(_) => Ok(Validated {
                    value,
                    coerced: false,
                }),
                Value::String(s) if s == "inherit" => Ok(Validated {
                    value,
                    coerced: false,
                }),
                _ => Err(reject("expected true, false or \"inherit\"")),
            },
            K::Text => match value {
                Value::String(_) => Ok(Validated {
                    value,
                    coerced: false,
                }),
                Value::Number(n) => Ok(Validated {
                    value: Value::String(n.to_string()),
                    coerced: true,
                }),
                _ => Err(reject("expected a string")),
            },
            K::Color => match &value {
                Value::String(s) if Rgba::parse(s).is_some() => Ok(Validated {
                    value,
                    coerced: false,
                }),
                _ => Err(reject("expected a color string")),
            },
            K::Numbers => {
                let items = value.as_array().ok_or_else(|| reject("expected an array"))?;
                if items.iter().all(|v| finite(v).is_some()) {
                    Ok(Validated {
                        value,
                        coerced: false,
                    })
                } else {
                    Err(reject("expected an array of finite numbers"))
                }
            }
            K::ColorStops => {
                let items = value.as_array().ok_or_else(|| reject("expected an array"))?;
                if parse_color_stops(items).is_some() {
                    Ok(Validated {
                        value,
                        coerced: false,
                    })
                } else {
                    Err(reject("expected [offset, color, ...] pairs"))
                }
            }
            K::Choice(options) => match &value {
                Value::String(s) if options.contains(&s.as_str()) => Ok(Validated {
                    value,
                    coerced: false,
                }),
                _ => Err(reject(&format!("expected one of {options:?}"))),
            },
        }
    }
}

fn finite(value: &Value) -> Option<f64> {
    value.as_f64().filter(|v| v.is_finite())
}

/// Decode alternating offset/color stops; offsets are clamped to `[0, 1]`.
#[must_use]
pub fn parse_color_stops(items: &[Value]) -> Option<Vec<(f64, String)>> {
    if items.len() % 2 != 0 {
        return None;
    }
    items
        .chunks_exact(2)
        .map(|pair| {
            let offset = finite(&pair[0])?;
            let color = pair[1].as_str().filter(|c| Rgba::parse(c).is_some())?;
            Some((offset.clamp(0.0, 1.0), color.to_string()))
        })
        .collect()
}

/// Encode color stops back to their alternating JSON form.
#[must_use]
pub fn color_stops_value(stops: &[(f64, String)]) -> Value {
    Value::Array(
        stops
            .iter()
            .flat_map(|(offset, color)| [Value::from(*offset), Value::from(color.as_str())])
            .collect(),
    )
}

/// Visibility and listening flag: explicit, or taken from the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tristate {
    /// Explicitly on.
    True,
    /// Explicitly off.
    False,
    /// Follow the parent.
    #[default]
    Inherit,
}

impl Tristate {
    /// JSON form.
    #[must_use]
    pub fn to_value(self) -> Value {
        match self {
            Self::True => Value::Bool(true),
            Self::False => Value::Bool(false),
            Self::Inherit => Value::from("inherit"),
        }
    }

    /// Decode a validated JSON value (`null` means inherit).
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Bool(true) => Self::True,
            Value::Bool(false) => Self::False,
            _ => Self::Inherit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validate(name: &str, value: Value) -> Result<Validated, AttrRejection> {
        lookup(name).expect("known attribute").validate(value)
    }

    #[test]
    fn test_names_are_unique() {
        for (i, a) in ATTRIBUTES.iter().enumerate() {
            assert!(
                ATTRIBUTES[i + 1..].iter().all(|b| b.name != a.name),
                "duplicate attribute {}",
                a.name
            );
        }
    }

    #[test]
    fn test_opacity_is_clamped() {
        let v = validate("opacity", json!(1.5)).expect("coerced");
        assert_eq!(v.value, json!(1.0));
        assert!(v.coerced);
        let v = validate("opacity", json!(0.25)).expect("valid");
        assert!(!v.coerced);
    }

    #[test]
    fn test_wrong_shape_is_rejected() {
        assert!(validate("x", json!("ten")).is_err());
        assert!(validate("visible", json!("maybe")).is_err());
        assert!(validate("fill", json!("no-such-color")).is_err());
        assert!(validate("points", json!([1, "a"])).is_err());
        assert!(validate("lineCap", json!("pointy")).is_err());
    }

    #[test]
    fn test_null_always_passes() {
        let v = validate("x", Value::Null).expect("null resets");
        assert!(v.value.is_null());
    }

    #[test]
    fn test_count_rounds_and_floors() {
        let v = validate("sides", json!(1.2)).expect("coerced");
        assert_eq!(v.value, json!(3.0));
        let v = validate("sides", json!(6)).expect("valid");
        assert_eq!(v.value, json!(6.0));
    }

    #[test]
    fn test_count_is_capped() {
        let v = validate("numPoints", json!(3_000_000_000u64)).expect("coerced");
        assert_eq!(v.value, json!(f64::from(MAX_COUNT)));
        assert!(v.coerced);
        let v = validate("sides", json!(4e9)).expect("coerced");
        assert_eq!(v.value, json!(f64::from(MAX_COUNT)));
    }

    #[test]
    fn test_text_accepts_numbers() {
        let v = validate("id", json!(42)).expect("coerced");
        assert_eq!(v.value, json!("42"));
    }

    #[test]
    fn test_color_stops() {
        let stops = parse_color_stops(&[json!(0), json!("red"), json!(1.5), json!("#00f")])
            .expect("stops");
        assert_eq!(stops, vec![(0.0, "red".into()), (1.0, "#00f".into())]);
        assert!(parse_color_stops(&[json!(0)]).is_none());
        assert_eq!(
            color_stops_value(&stops),
            json!([0.0, "red", 1.0, "#00f"])
        );
    }

    #[test]
    fn test_tristate_values() {
        assert_eq!(Tristate::from_value(&json!(true)), Tristate::True);
        assert_eq!(Tristate::from_value(&json!("inherit")), Tristate::Inherit);
        assert_eq!(Tristate::False.to_value(), json!(false));
    }
}
