//! Color-key hit testing.
//!
//! Every shape owns a unique 24-bit pick color. A layer's hit surface is
//! painted like its scene but with each shape filled and stroked in that
//! color, unblended and without anti-aliasing. A query reads back one pixel
//! and maps the color to the shape through the stage's key table. Later
//! shapes overwrite earlier ones, so the topmost visible listening shape
//! wins.

use serde_json::Value;
use streak_core::{ColorKey, Context, NodeId, NodeType, SceneResult, Stage, Vector2d};

use crate::draw;
use crate::error::RenderResult;
use crate::surface::{Surface, SurfaceMode};

/// Cached hit surface of one layer.
#[derive(Debug)]
pub(crate) struct HitGraph {
    pub(crate) surface: Surface,
    revision: Option<u64>,
}

impl HitGraph {
    pub(crate) fn new(surface: Surface) -> Self {
        Self {
            surface,
            revision: None,
        }
    }

    /// Repaint when the layer changed since the last paint.
    pub(crate) fn refresh(&mut self, stage: &Stage, layer: NodeId) {
        let revision = stage.layer_revision(layer);
        if self.revision != Some(revision) {
            draw::draw_hit(stage, layer, &mut self.surface);
            self.revision = Some(revision);
        }
    }
}

/// Shape whose key is stored at `point` on a hit surface.
pub(crate) fn resolve(stage: &Stage, surface: &Surface, point: Vector2d) -> Option<NodeId> {
    let [r, g, b, a] = surface.pixel_at(point)?;
    match a {
        0 => None,
        255 => stage.shape_by_key(ColorKey::from_rgb(r, g, b)),
        partial => {
            if stage.config().show_warnings {
                tracing::warn!(
                    x = point.x,
                    y = point.y,
                    alpha = partial,
                    "partially transparent pixel on hit surface, ignoring"
                );
            }
            None
        }
    }
}

/// Paint one layer's hit pass into a throwaway surface and query it.
pub(crate) fn intersect_uncached(
    stage: &Stage,
    layer: NodeId,
    point: Vector2d,
) -> RenderResult<Option<NodeId>> {
    let (width, height) = stage.size();
    let mut surface = Surface::new(width, height, stage.config().pixel_ratio, SurfaceMode::Hit)?;
    draw::draw_hit(stage, layer, &mut surface);
    Ok(resolve(stage, &surface, point))
}

/// Every shape under `container` that covers `point`, in paint order.
///
/// Each visible, listening shape is painted alone (inside its ancestors'
/// clips) onto a one-pixel sample surface.
///
/// # Errors
///
/// Returns an error when the sample surface cannot be allocated.
pub fn get_all_intersections(
    stage: &Stage,
    container: NodeId,
    point: Vector2d,
) -> RenderResult<Vec<NodeId>> {
    let (width, height) = stage.size();
    if !(point.x >= 0.0 && point.y >= 0.0 && point.x < width && point.y < height) {
        return Ok(Vec::new());
    }
    let mut sample = Surface::sample(point, stage.config().pixel_ratio)?;
    let mut hits = Vec::new();
    for id in stage.descendants(container) {
        let Some(shape) = stage.node(id).and_then(|n| n.shape()) else {
            continue;
        };
        if !stage.is_visible(id) || !stage.is_listening(id) {
            continue;
        }
        sample.reset();
        sample.clear();
        sample.save();
        draw::apply_ancestor_clips(stage, id, &mut sample);
        sample.set_transform(&stage.absolute_transform(id));
        shape.draw_hit(&mut sample);
        sample.restore();
        if sample.pixel(0, 0).is_some_and(|[.., a]| a == 255) {
            hits.push(id);
        }
    }
    Ok(hits)
}

/// Cache the layer's hit surface between queries.
///
/// # Errors
///
/// Returns [`streak_core::SceneError::NodeNotFound`] for unknown ids.
pub fn enable_hit_graph(stage: &mut Stage, layer: NodeId) -> SceneResult<bool> {
    set_hit_graph(stage, layer, true)
}

/// Recompute the layer's hit surface on every query.
///
/// # Errors
///
/// Returns [`streak_core::SceneError::NodeNotFound`] for unknown ids.
pub fn disable_hit_graph(stage: &mut Stage, layer: NodeId) -> SceneResult<bool> {
    set_hit_graph(stage, layer, false)
}

fn set_hit_graph(stage: &mut Stage, layer: NodeId, enabled: bool) -> SceneResult<bool> {
    if stage.node_type(layer) != Some(NodeType::Layer) {
        return Ok(false);
    }
    stage.set_attr(layer, "hitGraphEnabled", Value::Bool(enabled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use streak_core::Shape;

    fn stage_with_rects() -> (Stage, NodeId, NodeId, NodeId) {
        let mut stage = Stage::new(50.0, 50.0);
        let layer = stage.create_layer();
        stage.add(stage.root(), layer).expect("layer");
        let a = stage.create_shape(Shape::rect(20.0, 20.0)).expect("a");
        let b = stage.create_shape(Shape::rect(20.0, 20.0)).expect("b");
        stage.add(layer, a).expect("a");
        stage.add(layer, b).expect("b");
        stage.set_position(b, 10.0, 10.0).expect("move");
        (stage, layer, a, b)
    }

    #[test]
    fn test_uncached_query_resolves_topmost() {
        let (stage, layer, a, b) = stage_with_rects();
        let top = intersect_uncached(&stage, layer, Vector2d::new(15.0, 15.0)).expect("query");
        assert_eq!(top, Some(b));
        let only_a = intersect_uncached(&stage, layer, Vector2d::new(5.0, 5.0)).expect("query");
        assert_eq!(only_a, Some(a));
        let none = intersect_uncached(&stage, layer, Vector2d::new(45.0, 5.0)).expect("query");
        assert_eq!(none, None);
    }

    #[test]
    fn test_cached_graph_repaints_after_changes() {
        let (mut stage, layer, a, b) = stage_with_rects();
        let surface = Surface::new(50.0, 50.0, 1.0, SurfaceMode::Hit).expect("surface");
        let mut graph = HitGraph::new(surface);
        graph.refresh(&stage, layer);
        let point = Vector2d::new(15.0, 15.0);
        assert_eq!(resolve(&stage, &graph.surface, point), Some(b));
        stage.move_to_bottom(b).expect("reorder");
        graph.refresh(&stage, layer);
        assert_eq!(resolve(&stage, &graph.surface, point), Some(a));
    }

    #[test]
    fn test_all_intersections_in_paint_order() {
        let (stage, layer, a, b) = stage_with_rects();
        let hits = get_all_intersections(&stage, layer, Vector2d::new(15.0, 15.0)).expect("hits");
        assert_eq!(hits, vec![a, b]);
        let hits = get_all_intersections(&stage, layer, Vector2d::new(25.0, 25.0)).expect("hits");
        assert_eq!(hits, vec![b]);
        let hits = get_all_intersections(&stage, layer, Vector2d::new(80.0, 5.0)).expect("hits");
        assert!(hits.is_empty());
    }

    #[test]
    fn test_toggle_hit_graph() {
        let (mut stage, layer, a, _) = stage_with_rects();
        assert!(disable_hit_graph(&mut stage, layer).expect("disable"));
        assert_eq!(
            stage.node(layer).and_then(|n| n.layer_attrs()).map(|l| l.hit_graph_enabled),
            Some(false)
        );
        assert!(!enable_hit_graph(&mut stage, a).expect("not a layer"));
        assert!(enable_hit_graph(&mut stage, layer).expect("enable"));
    }
}
