//! Scene and hit traversals of a layer.
//!
//! Both walk the tree depth-first in child order, so later siblings paint
//! over earlier ones. Each shape is painted inside its own save/restore
//! pair with the absolute transform set; containers with a clip region
//! wrap their children in a clip.

use streak_core::{Context, NodeId, NodeKind, Stage};

use crate::surface::Surface;

/// Which pass is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pass {
    Scene,
    Hit,
}

impl Pass {
    fn enters(self, stage: &Stage, id: NodeId) -> bool {
        match self {
            Self::Scene => stage.is_visible(id),
            Self::Hit => stage.is_visible(id) && stage.is_listening(id),
        }
    }
}

/// Repaint a layer's scene surface.
pub(crate) fn draw_scene(stage: &Stage, layer: NodeId, surface: &mut Surface) {
    let Some(attrs) = stage.node(layer).and_then(|n| n.layer_attrs()) else {
        return;
    };
    surface.reset();
    if attrs.clear_before_draw {
        surface.clear();
    }
    surface.set_image_smoothing(attrs.image_smoothing);
    if Pass::Scene.enters(stage, layer) {
        draw_node(stage, layer, surface, Pass::Scene);
    }
    tracing::debug!(%layer, "drew layer");
}

/// Repaint a layer's hit surface.
pub(crate) fn draw_hit(stage: &Stage, layer: NodeId, surface: &mut Surface) {
    surface.reset();
    surface.clear();
    if Pass::Hit.enters(stage, layer) {
        draw_node(stage, layer, surface, Pass::Hit);
    }
    tracing::debug!(%layer, "drew hit graph");
}

/// Apply the clips of every container above `id`, outermost first.
pub(crate) fn apply_ancestor_clips(stage: &Stage, id: NodeId, surface: &mut Surface) {
    let mut ancestors: Vec<NodeId> = stage.ancestors(id).collect();
    ancestors.reverse();
    for ancestor in ancestors {
        clip_container(stage, ancestor, surface);
    }
}

fn clip_container(stage: &Stage, id: NodeId, surface: &mut Surface) {
    let Some(clip) = stage.node(id).and_then(|n| n.clip()) else {
        return;
    };
    surface.set_transform(&stage.absolute_transform(id));
    surface.begin_path();
    surface.rect(clip.x, clip.y, clip.width, clip.height);
    surface.clip();
}

fn draw_node(stage: &Stage, id: NodeId, surface: &mut Surface, pass: Pass) {
    let Some(node) = stage.node(id) else {
        return;
    };
    match node.kind() {
        NodeKind::Shape(shape) => {
            surface.save();
            surface.set_transform(&stage.absolute_transform(id));
            match pass {
                Pass::Scene => {
                    surface.set_global_alpha(stage.absolute_opacity(id));
                    surface.set_composite(&node.attrs().composite);
                    shape.draw_scene(surface);
                }
                Pass::Hit => shape.draw_hit(surface),
            }
            surface.restore();
            tracing::trace!(node = %id, class = shape.class_name(), "painted shape");
        }
        _ => {
            surface.save();
            clip_container(stage, id, surface);
            let children = node.children().to_vec();
            for child in children {
                if pass.enters(stage, child) {
                    draw_node(stage, child, surface, pass);
                }
            }
            surface.restore();
        }
    }
}
