//! The stage: root of the scene graph and owner of every node.
//!
//! Nodes live in an arena keyed by [`NodeId`]. Parent/child links are ids,
//! so moving a subtree never copies nodes. The stage also owns the pick key
//! table that maps hit-surface colors back to shapes.

use std::collections::HashMap;

use serde_json::Value;

use crate::attrs::{AttrEffect, Tristate};
use crate::color::{allocate_key, release_key, ColorKey};
use crate::config::EngineConfig;
use crate::geometry::{Matrix, Rect, Vector2d};
use crate::node::{
    AttrWrite, GroupAttrs, LayerAttrs, Node, NodeId, NodeKind, NodeType, StageAttrs,
};
use crate::selector::Selector;
use crate::shape::{Shape, ShapeKind};
use crate::{SceneError, SceneResult};

/// Root of a scene graph.
#[derive(Debug)]
pub struct Stage {
    root: NodeId,
    nodes: HashMap<NodeId, Node>,
    keys: HashMap<ColorKey, NodeId>,
    config: EngineConfig,
}

impl Stage {
    /// Create an empty stage of the given CSS size with the default config.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self::with_config(width, height, EngineConfig::default())
    }

    /// Create an empty stage with an explicit configuration.
    #[must_use]
    pub fn with_config(width: f64, height: f64, config: EngineConfig) -> Self {
        let root = Node::new(NodeKind::Stage(StageAttrs {
            width: width.max(0.0),
            height: height.max(0.0),
        }));
        let id = root.id();
        let mut nodes = HashMap::new();
        nodes.insert(id, root);
        tracing::debug!(stage = %id, width, height, "created stage");
        Self {
            root: id,
            nodes,
            keys: HashMap::new(),
            config: config.normalized(),
        }
    }

    /// The configuration this stage was built with.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Id of the stage node itself.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Stage size in CSS pixels.
    #[must_use]
    pub fn size(&self) -> (f64, f64) {
        match self.nodes.get(&self.root).map(Node::kind) {
            Some(NodeKind::Stage(stage)) => (stage.width, stage.height),
            _ => (0.0, 0.0),
        }
    }

    /// Resize the stage. Every layer is marked dirty. Returns `false`, and
    /// leaves the size unchanged, when either dimension is not finite.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] if the stage node is missing.
    pub fn set_size(&mut self, width: f64, height: f64) -> SceneResult<bool> {
        if !width.is_finite() || !height.is_finite() {
            if self.config.show_warnings {
                tracing::warn!(width, height, "stage size must be finite, ignoring");
            }
            return Ok(false);
        }
        let root = self.root;
        let width_applied = self.set_attr(root, "width", Value::from(width))?;
        let height_applied = self.set_attr(root, "height", Value::from(height))?;
        Ok(width_applied && height_applied)
    }

    /// Look up a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    fn node_or_err(&self, id: NodeId) -> SceneResult<&Node> {
        self.nodes.get(&id).ok_or(SceneError::NodeNotFound(id))
    }

    /// True if the node is in this stage's arena (attached or not).
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of nodes in the arena, including the stage itself.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the stage node itself is in the arena.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    fn insert(&mut self, node: Node) -> NodeId {
        let id = node.id();
        self.nodes.insert(id, node);
        id
    }

    /// Create a detached layer.
    pub fn create_layer(&mut self) -> NodeId {
        let layer = LayerAttrs {
            hit_graph_enabled: self.config.hit_graph_enabled,
            ..LayerAttrs::default()
        };
        self.insert(Node::new(NodeKind::Layer(layer)))
    }

    /// Create a detached group.
    pub fn create_group(&mut self) -> NodeId {
        self.insert(Node::new(NodeKind::Group(GroupAttrs::default())))
    }

    /// Create a detached shape and give it a pick key.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::ColorKeySpaceExhausted`] when no key is free.
    pub fn create_shape(&mut self, mut shape: Shape) -> SceneResult<NodeId> {
        let key = allocate_key()?;
        shape.assign_key(key);
        let id = self.insert(Node::new(NodeKind::Shape(Box::new(shape))));
        self.keys.insert(key, id);
        tracing::trace!(node = %id, %key, "created shape");
        Ok(id)
    }

    /// Create a detached node from a document class name.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownClass`] for unknown names and
    /// [`SceneError::InvalidHierarchy`] for `Stage`.
    pub fn create(&mut self, class_name: &str) -> SceneResult<NodeId> {
        match class_name {
            "Layer" => Ok(self.create_layer()),
            "Group" => Ok(self.create_group()),
            "Stage" => Err(SceneError::InvalidHierarchy(
                "a stage cannot be nested".to_string(),
            )),
            other => match ShapeKind::from_class_name(other) {
                Some(kind) => self.create_shape(Shape::new(kind)),
                None => Err(SceneError::UnknownClass(other.to_string())),
            },
        }
    }

    // ------------------------------------------------------------------
    // Tree structure
    // ------------------------------------------------------------------

    /// Parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(Node::parent)
    }

    /// Children of a node in paint order; empty for shapes and unknown ids.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(&id).map_or(&[][..], Node::children)
    }

    /// Layers in paint order.
    #[must_use]
    pub fn layers(&self) -> &[NodeId] {
        self.children(self.root)
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// Every descendant in depth-first pre-order, excluding the node.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// Number of ancestors; 0 for the root and detached nodes.
    #[must_use]
    pub fn depth(&self, id: NodeId) -> Option<usize> {
        self.nodes.get(&id)?;
        Some(self.ancestors(id).count())
    }

    /// Nearest layer at or above the node.
    #[must_use]
    pub fn layer_of(&self, id: NodeId) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|n| self.node_type(*n) == Some(NodeType::Layer))
    }

    /// Type of a node.
    #[must_use]
    pub fn node_type(&self, id: NodeId) -> Option<NodeType> {
        self.nodes.get(&id).map(Node::node_type)
    }

    /// Append `child` to `parent`, detaching it from its current parent
    /// first. On error nothing changes.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] for unknown ids and
    /// [`SceneError::InvalidHierarchy`] when the types do not nest or the
    /// parent lies inside the child's subtree.
    pub fn add(&mut self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        let parent_type = self.node_or_err(parent)?.node_type();
        let child_type = self.node_or_err(child)?.node_type();
        if !parent_type.accepts(child_type) {
            return Err(SceneError::InvalidHierarchy(format!(
                "{parent_type} cannot contain {child_type}"
            )));
        }
        if parent == child || self.ancestors(parent).any(|a| a == child) {
            return Err(SceneError::InvalidHierarchy(format!(
                "{child} cannot be added into its own subtree"
            )));
        }
        self.detach(child);
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        self.invalidate_transform(child);
        self.touch(child);
        tracing::debug!(%parent, %child, "added node");
        Ok(())
    }

    /// Same as [`Stage::add`].
    ///
    /// # Errors
    ///
    /// See [`Stage::add`].
    pub fn move_to(&mut self, node: NodeId, container: NodeId) -> SceneResult<()> {
        self.add(container, node)
    }

    /// Unlink from the parent, leaving the node in the arena.
    fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        self.touch(parent);
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.retain(|c| *c != id);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = None;
        }
        self.invalidate_transform(id);
        true
    }

    /// Detach a node from its parent. It stays in the arena and can be added
    /// again.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] for unknown ids.
    pub fn remove(&mut self, id: NodeId) -> SceneResult<()> {
        self.node_or_err(id)?;
        if self.detach(id) {
            tracing::debug!(node = %id, "removed node");
        }
        Ok(())
    }

    /// Detach every child of a container.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] for unknown ids.
    pub fn remove_children(&mut self, id: NodeId) -> SceneResult<()> {
        let children = self.node_or_err(id)?.children.clone();
        for child in children {
            self.detach(child);
        }
        Ok(())
    }

    /// Destroy a node and its whole subtree, releasing their pick keys.
    ///
    /// Returns the destroyed ids in pre-order; unknown (already destroyed)
    /// ids yield an empty list. Destroying the stage node clears the stage
    /// but keeps the root.
    pub fn destroy(&mut self, id: NodeId) -> Vec<NodeId> {
        if !self.nodes.contains_key(&id) {
            return Vec::new();
        }
        if id == self.root {
            let layers = self.layers().to_vec();
            return layers.into_iter().flat_map(|l| self.destroy(l)).collect();
        }
        self.detach(id);
        let mut destroyed = vec![id];
        destroyed.extend(self.descendants(id));
        for node_id in &destroyed {
            if let Some(mut node) = self.nodes.remove(node_id) {
                if let Some(key) = node.shape_mut().and_then(Shape::take_key) {
                    self.keys.remove(&key);
                    release_key(key);
                }
            }
        }
        tracing::debug!(node = %id, count = destroyed.len(), "destroyed subtree");
        destroyed
    }

    /// Destroy every child of a container.
    pub fn destroy_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let children = self.children(id).to_vec();
        children.into_iter().flat_map(|c| self.destroy(c)).collect()
    }

    // ------------------------------------------------------------------
    // Z-order
    // ------------------------------------------------------------------

    fn slot(&self, id: NodeId) -> SceneResult<Option<(NodeId, usize)>> {
        let Some(parent) = self.node_or_err(id)?.parent else {
            return Ok(None);
        };
        Ok(self
            .children(parent)
            .iter()
            .position(|c| *c == id)
            .map(|index| (parent, index)))
    }

    fn reorder(
        &mut self,
        id: NodeId,
        target: impl FnOnce(usize, usize) -> usize,
    ) -> SceneResult<bool> {
        let Some((parent, index)) = self.slot(id)? else {
            return Ok(false);
        };
        let Some(node) = self.nodes.get_mut(&parent) else {
            return Ok(false);
        };
        let last = node.children.len() - 1;
        let to = target(index, last).min(last);
        if to == index {
            return Ok(false);
        }
        let moved = node.children.remove(index);
        node.children.insert(to, moved);
        self.touch(parent);
        Ok(true)
    }

    /// Swap with the next sibling. `false` when already on top or detached.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] for unknown ids.
    pub fn move_up(&mut self, id: NodeId) -> SceneResult<bool> {
        self.reorder(id, |index, last| (index + 1).min(last))
    }

    /// Swap with the previous sibling. `false` when already at the bottom.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] for unknown ids.
    pub fn move_down(&mut self, id: NodeId) -> SceneResult<bool> {
        self.reorder(id, |index, _| index.saturating_sub(1))
    }

    /// Move above every sibling.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] for unknown ids.
    pub fn move_to_top(&mut self, id: NodeId) -> SceneResult<bool> {
        self.reorder(id, |_, last| last)
    }

    /// Move below every sibling.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] for unknown ids.
    pub fn move_to_bottom(&mut self, id: NodeId) -> SceneResult<bool> {
        self.reorder(id, |_, _| 0)
    }

    /// Move to position `index` among the siblings (clamped).
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] for unknown ids.
    pub fn set_z_index(&mut self, id: NodeId, index: usize) -> SceneResult<bool> {
        self.reorder(id, |_, _| index)
    }

    /// Position among the siblings, or `None` when detached.
    #[must_use]
    pub fn z_index(&self, id: NodeId) -> Option<usize> {
        self.slot(id).ok().flatten().map(|(_, index)| index)
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// Current value of an attribute (`Null` when unset or unknown).
    #[must_use]
    pub fn get_attr(&self, id: NodeId, name: &str) -> Value {
        self.nodes
            .get(&id)
            .map_or(Value::Null, |node| node.get_attr(name))
    }

    /// Validate and store an attribute. Returns `false` when the value was
    /// rejected.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] for unknown ids.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: Value) -> SceneResult<bool> {
        let warn = self.config.show_warnings;
        let node = self.nodes.get_mut(&id).ok_or(SceneError::NodeNotFound(id))?;
        match node.write_attr(name, value, warn) {
            AttrWrite::Applied(AttrEffect::Transform) => {
                self.invalidate_transform(id);
                self.touch(id);
            }
            AttrWrite::Applied(AttrEffect::Paint) => self.touch(id),
            AttrWrite::Applied(AttrEffect::None) | AttrWrite::Extra => {}
            AttrWrite::Rejected => return Ok(false),
        }
        Ok(true)
    }

    /// Apply several attributes; returns how many were accepted.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] for unknown ids.
    pub fn set_attrs(
        &mut self,
        id: NodeId,
        attrs: &serde_json::Map<String, Value>,
    ) -> SceneResult<usize> {
        let mut accepted = 0;
        for (name, value) in attrs {
            if self.set_attr(id, name, value.clone())? {
                accepted += 1;
            }
        }
        Ok(accepted)
    }

    /// Non-default and extension attributes of a node.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] for unknown ids.
    pub fn attrs(&self, id: NodeId) -> SceneResult<serde_json::Map<String, Value>> {
        Ok(self.node_or_err(id)?.attr_map())
    }

    /// Set `x` and `y`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] for unknown ids.
    pub fn set_position(&mut self, id: NodeId, x: f64, y: f64) -> SceneResult<()> {
        self.set_attr(id, "x", Value::from(x))?;
        self.set_attr(id, "y", Value::from(y))?;
        Ok(())
    }

    /// Translate by a delta.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] for unknown ids.
    pub fn move_by(&mut self, id: NodeId, dx: f64, dy: f64) -> SceneResult<()> {
        let attrs = self.node_or_err(id)?.attrs();
        let (x, y) = (attrs.x + dx, attrs.y + dy);
        self.set_position(id, x, y)
    }

    /// Add to the rotation, in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] for unknown ids.
    pub fn rotate_by(&mut self, id: NodeId, degrees: f64) -> SceneResult<()> {
        let rotation = self.node_or_err(id)?.attrs().rotation + degrees;
        self.set_attr(id, "rotation", Value::from(rotation))?;
        Ok(())
    }

    /// Set `visible` to `true`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] for unknown ids.
    pub fn show(&mut self, id: NodeId) -> SceneResult<()> {
        self.set_attr(id, "visible", Value::Bool(true)).map(drop)
    }

    /// Set `visible` to `false`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] for unknown ids.
    pub fn hide(&mut self, id: NodeId) -> SceneResult<()> {
        self.set_attr(id, "visible", Value::Bool(false)).map(drop)
    }

    /// Edit a shape outside the attribute schema (draw routines, pattern
    /// image). The pick key is preserved. Returns `false` for non-shapes.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] for unknown ids.
    pub fn update_shape(
        &mut self,
        id: NodeId,
        edit: impl FnOnce(&mut Shape),
    ) -> SceneResult<bool> {
        let node = self.nodes.get_mut(&id).ok_or(SceneError::NodeNotFound(id))?;
        let Some(shape) = node.shape_mut() else {
            return Ok(false);
        };
        let key = shape.color_key();
        edit(shape);
        if let Some(key) = key {
            shape.assign_key(key);
        }
        self.touch(id);
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Derived state
    // ------------------------------------------------------------------

    fn resolve_flag(&self, id: NodeId, flag: impl Fn(&Node) -> Tristate) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let Some(node) = self.nodes.get(&node_id) else {
                return false;
            };
            match flag(node) {
                Tristate::True => return true,
                Tristate::False => return false,
                Tristate::Inherit => current = node.parent,
            }
        }
        true
    }

    /// Resolved visibility: the nearest explicit flag at or above the node.
    #[must_use]
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.resolve_flag(id, |n| n.attrs().visible)
    }

    /// Resolved listening flag, resolved like [`Stage::is_visible`].
    #[must_use]
    pub fn is_listening(&self, id: NodeId) -> bool {
        self.resolve_flag(id, |n| n.attrs().listening)
    }

    /// Product of the opacities from the node up to the root.
    #[must_use]
    pub fn absolute_opacity(&self, id: NodeId) -> f64 {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .filter_map(|n| self.nodes.get(&n))
            .map(|n| n.attrs().opacity)
            .product()
    }

    /// Node-to-stage transform. Cached until a transform attribute of the
    /// node or an ancestor changes.
    #[must_use]
    pub fn absolute_transform(&self, id: NodeId) -> Matrix {
        let mut chain = Vec::new();
        let mut base = Matrix::IDENTITY;
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == self.root {
                break;
            }
            let Some(node) = self.nodes.get(&node_id) else {
                break;
            };
            if let Some(cached) = node.absolute.get() {
                base = cached;
                break;
            }
            chain.push(node);
            current = node.parent;
        }
        for node in chain.into_iter().rev() {
            base = base.then(&node.local_transform());
            node.absolute.set(Some(base));
        }
        base
    }

    /// Stage position of the node's local origin.
    #[must_use]
    pub fn absolute_position(&self, id: NodeId) -> Vector2d {
        self.absolute_transform(id).translation()
    }

    /// Accumulated scale, ignoring rotation.
    #[must_use]
    pub fn absolute_scale(&self, id: NodeId) -> Vector2d {
        self.absolute_transform(id).axis_scale()
    }

    fn invalidate_transform(&self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get(&next) {
                node.absolute.set(None);
                stack.extend(node.children());
            }
        }
    }

    /// Stage-space bounds. Containers union their visible children; `None`
    /// when there is nothing to bound.
    #[must_use]
    pub fn client_rect(&self, id: NodeId) -> Option<Rect> {
        let node = self.nodes.get(&id)?;
        if let Some(shape) = node.shape() {
            return Some(self.absolute_transform(id).map_rect(&shape.client_rect()));
        }
        node.children()
            .iter()
            .filter(|c| {
                self.nodes
                    .get(*c)
                    .is_some_and(|n| n.attrs().visible != Tristate::False)
            })
            .filter_map(|c| self.client_rect(*c))
            .reduce(|a, b| a.union(&b))
    }

    // ------------------------------------------------------------------
    // Dirty tracking and pick keys
    // ------------------------------------------------------------------

    /// Mark the layer owning `id` as changed; the root marks every layer.
    fn touch(&mut self, id: NodeId) {
        let layers = if id == self.root {
            self.layers().to_vec()
        } else {
            self.layer_of(id).into_iter().collect()
        };
        for layer in layers {
            if let Some(node) = self.nodes.get_mut(&layer) {
                node.revision = node.revision.wrapping_add(1);
            }
        }
    }

    /// Change counter of a layer; bumps on every change that affects its
    /// pixels.
    #[must_use]
    pub fn layer_revision(&self, layer: NodeId) -> u64 {
        self.nodes.get(&layer).map_or(0, |n| n.revision)
    }

    /// Shape that owns a pick key.
    #[must_use]
    pub fn shape_by_key(&self, key: ColorKey) -> Option<NodeId> {
        self.keys.get(&key).copied()
    }

    // ------------------------------------------------------------------
    // Selectors
    // ------------------------------------------------------------------

    /// Descendants matching `selector`, depth-first pre-order. Malformed
    /// selectors match nothing.
    #[must_use]
    pub fn find(&self, id: NodeId, selector: &str) -> Vec<NodeId> {
        let Some(selector) = Selector::parse(selector) else {
            return Vec::new();
        };
        self.descendants(id)
            .into_iter()
            .filter(|d| self.nodes.get(d).is_some_and(|n| selector.matches(n)))
            .collect()
    }

    /// First descendant matching `selector`.
    #[must_use]
    pub fn find_one(&self, id: NodeId, selector: &str) -> Option<NodeId> {
        let selector = Selector::parse(selector)?;
        self.descendants(id)
            .into_iter()
            .find(|d| self.nodes.get(d).is_some_and(|n| selector.matches(n)))
    }

    /// Nearest ancestor (or the node itself with `include_self`) matching
    /// `selector`.
    #[must_use]
    pub fn find_ancestor(
        &self,
        id: NodeId,
        selector: &str,
        include_self: bool,
    ) -> Option<NodeId> {
        let selector = Selector::parse(selector)?;
        let start = include_self.then_some(id);
        start
            .into_iter()
            .chain(self.ancestors(id))
            .find(|a| self.nodes.get(a).is_some_and(|n| selector.matches(n)))
    }
}

impl Drop for Stage {
    fn drop(&mut self) {
        for key in self.keys.keys() {
            release_key(*key);
        }
    }
}
