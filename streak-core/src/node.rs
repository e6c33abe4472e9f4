//! Nodes of the scene graph and their typed attribute storage.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attrs::{self, AttrEffect, Tristate};
use crate::geometry::{Matrix, Rect};
use crate::paint::{flag, num, opt_text, text};
use crate::shape::Shape;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw value.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// The four node types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// Root of the tree.
    Stage,
    /// Direct child of the stage, owning its own surfaces.
    Layer,
    /// Plain container.
    Group,
    /// Drawable leaf.
    Shape,
}

impl NodeType {
    /// Name used in selectors and documents.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stage => "Stage",
            Self::Layer => "Layer",
            Self::Group => "Group",
            Self::Shape => "Shape",
        }
    }

    /// True for types that hold children.
    #[must_use]
    pub fn is_container(self) -> bool {
        !matches!(self, Self::Shape)
    }

    /// Whether `child` may be added under this type.
    #[must_use]
    pub fn accepts(self, child: Self) -> bool {
        match self {
            Self::Stage => child == Self::Layer,
            Self::Layer | Self::Group => matches!(child, Self::Group | Self::Shape),
            Self::Shape => false,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes every node carries.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeAttrs {
    /// Unique-by-convention identifier for `#id` selectors.
    pub id: Option<String>,
    /// Whitespace-separated names for `.name` selectors.
    pub name: Option<String>,
    /// Position.
    pub x: f64,
    /// Position.
    pub y: f64,
    /// Rotation in degrees, clockwise.
    pub rotation: f64,
    /// Horizontal scale.
    pub scale_x: f64,
    /// Vertical scale.
    pub scale_y: f64,
    /// Horizontal skew factor.
    pub skew_x: f64,
    /// Vertical skew factor.
    pub skew_y: f64,
    /// Local point placed at the position.
    pub offset_x: f64,
    /// Local point placed at the position.
    pub offset_y: f64,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Visibility flag.
    pub visible: Tristate,
    /// Hit-testing flag.
    pub listening: Tristate,
    /// Composite operation keyword.
    pub composite: String,
    /// Attributes outside the schema, kept verbatim.
    pub extra: BTreeMap<String, Value>,
}

impl Default for NodeAttrs {
    fn default() -> Self {
        Self {
            id: None,
            name: None,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            skew_x: 0.0,
            skew_y: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
            opacity: 1.0,
            visible: Tristate::Inherit,
            listening: Tristate::Inherit,
            composite: "source-over".to_string(),
            extra: BTreeMap::new(),
        }
    }
}

impl NodeAttrs {
    /// Local transform: `T(position) · R · S · Skew · T(-offset)`.
    #[must_use]
    pub fn local_transform(&self) -> Matrix {
        let mut m = Matrix::IDENTITY;
        if self.x != 0.0 || self.y != 0.0 {
            m.translate(self.x, self.y);
        }
        if self.rotation != 0.0 {
            m.rotate(self.rotation.to_radians());
        }
        if self.scale_x != 1.0 || self.scale_y != 1.0 {
            m.scale(self.scale_x, self.scale_y);
        }
        if self.skew_x != 0.0 || self.skew_y != 0.0 {
            m.skew(self.skew_x, self.skew_y);
        }
        if self.offset_x != 0.0 || self.offset_y != 0.0 {
            m.translate(-self.offset_x, -self.offset_y);
        }
        m
    }

    /// True if `name` is one of the whitespace-separated names.
    #[must_use]
    pub fn has_name(&self, name: &str) -> bool {
        self.name
            .as_deref()
            .is_some_and(|names| names.split_whitespace().any(|n| n == name))
    }

    fn get(&self, name: &str) -> Option<Value> {
        Some(match name {
            "id" => opt_text(self.id.as_deref()),
            "name" => opt_text(self.name.as_deref()),
            "x" => self.x.into(),
            "y" => self.y.into(),
            "rotation" => self.rotation.into(),
            "scaleX" => self.scale_x.into(),
            "scaleY" => self.scale_y.into(),
            "skewX" => self.skew_x.into(),
            "skewY" => self.skew_y.into(),
            "offsetX" => self.offset_x.into(),
            "offsetY" => self.offset_y.into(),
            "opacity" => self.opacity.into(),
            "visible" => self.visible.to_value(),
            "listening" => self.listening.to_value(),
            "globalCompositeOperation" => self.composite.as_str().into(),
            _ => return None,
        })
    }

    fn set(&mut self, name: &str, value: &Value) -> bool {
        match name {
            "id" => self.id = text(value),
            "name" => self.name = text(value),
            "x" => self.x = num(value),
            "y" => self.y = num(value),
            "rotation" => self.rotation = num(value),
            "scaleX" => self.scale_x = num(value),
            "scaleY" => self.scale_y = num(value),
            "skewX" => self.skew_x = num(value),
            "skewY" => self.skew_y = num(value),
            "offsetX" => self.offset_x = num(value),
            "offsetY" => self.offset_y = num(value),
            "opacity" => self.opacity = num(value),
            "visible" => self.visible = Tristate::from_value(value),
            "listening" => self.listening = Tristate::from_value(value),
            "globalCompositeOperation" => {
                self.composite = text(value).unwrap_or_else(|| "source-over".to_string());
            }
            _ => return false,
        }
        true
    }
}

fn clip_get(clip: &Rect, name: &str) -> Option<Value> {
    Some(match name {
        "clipX" => clip.x.into(),
        "clipY" => clip.y.into(),
        "clipWidth" => clip.width.into(),
        "clipHeight" => clip.height.into(),
        _ => return None,
    })
}

fn clip_set(clip: &mut Rect, name: &str, value: &Value) -> bool {
    match name {
        "clipX" => clip.x = num(value),
        "clipY" => clip.y = num(value),
        "clipWidth" => clip.width = num(value),
        "clipHeight" => clip.height = num(value),
        _ => return false,
    }
    true
}

/// Stage-only attributes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StageAttrs {
    /// Width in CSS pixels.
    pub width: f64,
    /// Height in CSS pixels.
    pub height: f64,
}

/// Layer-only attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerAttrs {
    /// Clip region in layer space; inactive without area.
    pub clip: Rect,
    /// Clear the scene surface before each draw.
    pub clear_before_draw: bool,
    /// Smooth scaled images.
    pub image_smoothing: bool,
    /// Cache the hit surface between queries.
    pub hit_graph_enabled: bool,
}

impl Default for LayerAttrs {
    fn default() -> Self {
        Self {
            clip: Rect::default(),
            clear_before_draw: true,
            image_smoothing: true,
            hit_graph_enabled: true,
        }
    }
}

/// Group-only attributes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GroupAttrs {
    /// Clip region in group space; inactive without area.
    pub clip: Rect,
}

/// What a node is, with its kind-specific attributes.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The root.
    Stage(StageAttrs),
    /// A layer.
    Layer(LayerAttrs),
    /// A group.
    Group(GroupAttrs),
    /// A shape.
    Shape(Box<Shape>),
}

impl NodeKind {
    fn get(&self, name: &str) -> Option<Value> {
        match self {
            Self::Stage(stage) => match name {
                "width" => Some(stage.width.into()),
                "height" => Some(stage.height.into()),
                _ => None,
            },
            Self::Layer(layer) => match name {
                "clearBeforeDraw" => Some(layer.clear_before_draw.into()),
                "imageSmoothingEnabled" => Some(layer.image_smoothing.into()),
                "hitGraphEnabled" => Some(layer.hit_graph_enabled.into()),
                _ => clip_get(&layer.clip, name),
            },
            Self::Group(group) => clip_get(&group.clip, name),
            Self::Shape(shape) => shape.paint.get(name).or_else(|| shape.kind.get(name)),
        }
    }

    fn set(&mut self, name: &str, value: &Value) -> bool {
        match self {
            Self::Stage(stage) => match name {
                "width" => stage.width = num(value),
                "height" => stage.height = num(value),
                _ => return false,
            },
            Self::Layer(layer) => match name {
                "clearBeforeDraw" => layer.clear_before_draw = flag(value),
                "imageSmoothingEnabled" => layer.image_smoothing = flag(value),
                "hitGraphEnabled" => layer.hit_graph_enabled = flag(value),
                _ => return clip_set(&mut layer.clip, name, value),
            },
            Self::Group(group) => return clip_set(&mut group.clip, name, value),
            Self::Shape(shape) => {
                return shape.paint.set(name, value) || shape.kind.set(name, value)
            }
        }
        true
    }
}

/// Outcome of a single attribute write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrWrite {
    /// A schema attribute was stored; caches named by the effect are stale.
    Applied(AttrEffect),
    /// Stored in the extension map.
    Extra,
    /// The value had the wrong shape; nothing changed.
    Rejected,
}

/// A node in the stage arena.
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) attrs: NodeAttrs,
    pub(crate) kind: NodeKind,
    pub(crate) revision: u64,
    pub(crate) absolute: Cell<Option<Matrix>>,
    alive: Rc<()>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            id: NodeId::next(),
            parent: None,
            children: Vec::new(),
            attrs: NodeAttrs::default(),
            kind,
            revision: 0,
            absolute: Cell::new(None),
            alive: Rc::new(()),
        }
    }

    /// Handle that stops upgrading once the node is dropped from its arena.
    pub(crate) fn liveness(&self) -> Weak<()> {
        Rc::downgrade(&self.alive)
    }

    /// Identifier.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Node type.
    #[must_use]
    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Stage(_) => NodeType::Stage,
            NodeKind::Layer(_) => NodeType::Layer,
            NodeKind::Group(_) => NodeType::Group,
            NodeKind::Shape(_) => NodeType::Shape,
        }
    }

    /// Document class name (`Circle`, `Layer`, ...).
    #[must_use]
    pub fn class_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Shape(shape) => shape.class_name(),
            _ => self.node_type().as_str(),
        }
    }

    /// Parent, if attached.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in paint order.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Common attributes.
    #[must_use]
    pub fn attrs(&self) -> &NodeAttrs {
        &self.attrs
    }

    /// Kind-specific attributes.
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// The shape, for shape nodes.
    #[must_use]
    pub fn shape(&self) -> Option<&Shape> {
        match &self.kind {
            NodeKind::Shape(shape) => Some(shape),
            _ => None,
        }
    }

    pub(crate) fn shape_mut(&mut self) -> Option<&mut Shape> {
        match &mut self.kind {
            NodeKind::Shape(shape) => Some(shape),
            _ => None,
        }
    }

    /// Layer attributes, for layer nodes.
    #[must_use]
    pub fn layer_attrs(&self) -> Option<&LayerAttrs> {
        match &self.kind {
            NodeKind::Layer(layer) => Some(layer),
            _ => None,
        }
    }

    /// Active clip region of a container.
    #[must_use]
    pub fn clip(&self) -> Option<Rect> {
        let clip = match &self.kind {
            NodeKind::Layer(layer) => layer.clip,
            NodeKind::Group(group) => group.clip,
            _ => return None,
        };
        clip.has_area().then_some(clip)
    }

    /// Local transform matrix.
    #[must_use]
    pub fn local_transform(&self) -> Matrix {
        self.attrs.local_transform()
    }

    /// Schema value of an attribute that applies to this node.
    #[must_use]
    pub fn schema_attr(&self, name: &str) -> Option<Value> {
        attrs::lookup(name)?;
        self.attrs.get(name).or_else(|| self.kind.get(name))
    }

    /// Current value of any attribute; `Null` when unknown and unset.
    #[must_use]
    pub fn get_attr(&self, name: &str) -> Value {
        self.schema_attr(name)
            .or_else(|| self.attrs.extra.get(name).cloned())
            .unwrap_or(Value::Null)
    }

    /// Validate and store one attribute. `Null` resets to the default.
    pub(crate) fn write_attr(&mut self, name: &str, value: Value, warn: bool) -> AttrWrite {
        let def = match attrs::lookup(name) {
            Some(def) if self.schema_attr(name).is_some() => def,
            _ => {
                if value.is_null() {
                    self.attrs.extra.remove(name);
                } else {
                    self.attrs.extra.insert(name.to_string(), value);
                }
                return AttrWrite::Extra;
            }
        };
        let validated = match def.validate(value) {
            Ok(validated) => validated,
            Err(rejection) => {
                if warn {
                    tracing::warn!(
                        node = %self.id,
                        attr = rejection.name,
                        "rejected attribute value: {}",
                        rejection.reason
                    );
                }
                return AttrWrite::Rejected;
            }
        };
        if validated.coerced && warn {
            tracing::warn!(
                node = %self.id,
                attr = def.name,
                value = %validated.value,
                "attribute value coerced into range"
            );
        }
        let value = if validated.value.is_null() {
            def.default.to_value()
        } else {
            validated.value
        };
        let stored = self.attrs.set(name, &value) || self.kind.set(name, &value);
        debug_assert!(stored, "schema attribute {name} has no storage");
        AttrWrite::Applied(def.effect)
    }

    /// Non-default schema attributes plus extension attributes, sorted by
    /// name.
    #[must_use]
    pub fn attr_map(&self) -> serde_json::Map<String, Value> {
        let mut map = serde_json::Map::new();
        for def in attrs::ATTRIBUTES {
            if let Some(value) = self.schema_attr(def.name) {
                if value != def.default.to_value() {
                    map.insert(def.name.to_string(), value);
                }
            }
        }
        for (name, value) in &self.attrs.extra {
            map.insert(name.clone(), value.clone());
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn circle() -> Node {
        Node::new(NodeKind::Shape(Box::new(Shape::circle(10.0))))
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let a = NodeId::next();
        let b = NodeId::next();
        assert!(b > a);
    }

    #[test]
    fn test_type_rules() {
        assert!(NodeType::Stage.accepts(NodeType::Layer));
        assert!(!NodeType::Stage.accepts(NodeType::Shape));
        assert!(NodeType::Layer.accepts(NodeType::Group));
        assert!(!NodeType::Group.accepts(NodeType::Layer));
        assert!(!NodeType::Shape.accepts(NodeType::Shape));
    }

    #[test]
    fn test_local_transform_order() {
        let attrs = NodeAttrs {
            x: 100.0,
            y: 50.0,
            scale_x: 2.0,
            scale_y: 2.0,
            offset_x: 10.0,
            offset_y: 10.0,
            ..NodeAttrs::default()
        };
        let m = attrs.local_transform();
        // The offset point lands on the position.
        let p = m.point(crate::Vector2d::new(10.0, 10.0));
        assert!((p.x - 100.0).abs() < 1e-9);
        assert!((p.y - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_write_and_read_back() {
        let mut node = circle();
        assert_eq!(
            node.write_attr("x", json!(5), true),
            AttrWrite::Applied(AttrEffect::Transform)
        );
        assert_eq!(node.get_attr("x"), json!(5.0));
        assert_eq!(
            node.write_attr("fill", json!("red"), true),
            AttrWrite::Applied(AttrEffect::Paint)
        );
        assert_eq!(node.get_attr("fill"), json!("red"));
        assert_eq!(node.get_attr("radius"), json!(10.0));
    }

    #[test]
    fn test_rejected_write_keeps_old_value() {
        let mut node = circle();
        node.write_attr("x", json!(3.0), false);
        assert_eq!(node.write_attr("x", json!("left"), false), AttrWrite::Rejected);
        assert_eq!(node.get_attr("x"), json!(3.0));
    }

    #[test]
    fn test_inapplicable_names_go_to_extra() {
        let mut node = Node::new(NodeKind::Group(GroupAttrs::default()));
        assert_eq!(node.write_attr("radius", json!(4), true), AttrWrite::Extra);
        assert_eq!(node.write_attr("custom", json!({"a": 1}), true), AttrWrite::Extra);
        assert_eq!(node.get_attr("custom"), json!({"a": 1}));
        node.write_attr("custom", Value::Null, true);
        assert_eq!(node.get_attr("custom"), Value::Null);
    }

    #[test]
    fn test_null_resets_to_default() {
        let mut node = circle();
        node.write_attr("opacity", json!(0.5), true);
        node.write_attr("opacity", Value::Null, true);
        assert_eq!(node.get_attr("opacity"), json!(1.0));
    }

    #[test]
    fn test_attr_map_lists_only_non_defaults() {
        let mut node = circle();
        node.write_attr("fill", json!("blue"), true);
        node.write_attr("x", json!(0.0), true);
        node.write_attr("zz", json!(true), true);
        let map = node.attr_map();
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, ["fill", "radius", "zz"]);
    }

    #[test]
    fn test_clip_requires_area() {
        let mut node = Node::new(NodeKind::Group(GroupAttrs::default()));
        assert_eq!(node.clip(), None);
        node.write_attr("clipWidth", json!(10), true);
        node.write_attr("clipHeight", json!(10), true);
        assert_eq!(node.clip(), Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn test_names() {
        let mut node = circle();
        node.write_attr("name", json!("alpha  beta"), true);
        assert!(node.attrs().has_name("beta"));
        assert!(!node.attrs().has_name("gamma"));
    }
}
