//! # Streak Renderer
//!
//! CPU rasterization of a [`streak_core::Stage`] on tiny-skia pixmaps.
//!
//! ## Surfaces
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               StageRenderer                 │
//! ├──────────────────────┬──────────────────────┤
//! │ Layer 1              │ Layer 2 ...          │
//! │  - scene Surface     │  - scene Surface     │
//! │  - hit Surface       │  - hit Surface       │
//! │    (color keys)      │    (color keys)      │
//! └──────────────────────┴──────────────────────┘
//! ```
//!
//! Every layer owns a visible scene surface and, when its hit graph is
//! enabled, a cached hit surface. Picking reads one pixel of the hit
//! surface and maps its color back to a shape through the stage.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod draw;
pub mod error;
pub mod export;
pub mod hit;
mod style;
pub mod surface;

use std::collections::HashMap;

pub use error::{RenderError, RenderResult};
pub use hit::{disable_hit_graph, enable_hit_graph, get_all_intersections};
pub use surface::{Surface, SurfaceMode};

use hit::HitGraph;
use streak_core::animation::LayerPainter;
use streak_core::{NodeId, NodeType, Stage, Vector2d};

/// Surfaces owned for one layer.
#[derive(Debug)]
struct LayerSurfaces {
    scene: Surface,
    hit: Option<HitGraph>,
}

impl LayerSurfaces {
    fn new(width: f64, height: f64, pixel_ratio: f64) -> RenderResult<Self> {
        Ok(Self {
            scene: Surface::new(width, height, pixel_ratio, SurfaceMode::Scene)?,
            hit: None,
        })
    }

    fn hit_graph(&mut self, width: f64, height: f64, pixel_ratio: f64) -> RenderResult<&mut HitGraph> {
        let stale = self
            .hit
            .as_ref()
            .is_some_and(|graph| !graph.surface.matches(width, height, pixel_ratio));
        if stale || self.hit.is_none() {
            let surface = Surface::new(width, height, pixel_ratio, SurfaceMode::Hit)?;
            self.hit = Some(HitGraph::new(surface));
        }
        match self.hit.as_mut() {
            Some(graph) => Ok(graph),
            None => Err(RenderError::Surface("hit surface missing".to_string())),
        }
    }
}

/// Draws the layers of a stage and answers pick queries against them.
#[derive(Debug, Default)]
pub struct StageRenderer {
    layers: HashMap<NodeId, LayerSurfaces>,
    pending: Vec<NodeId>,
}

impl StageRenderer {
    /// Create a renderer with no surfaces allocated yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Redraw every layer of the stage.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Surface`] when a surface cannot be allocated.
    pub fn draw(&mut self, stage: &Stage) -> RenderResult<()> {
        self.prune(stage);
        for layer in stage.layers().to_vec() {
            self.draw_layer_checked(stage, layer)?;
        }
        self.pending.clear();
        Ok(())
    }

    /// Redraw one layer. Non-layer ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Surface`] when a surface cannot be allocated.
    pub fn draw_layer_checked(&mut self, stage: &Stage, layer: NodeId) -> RenderResult<()> {
        if stage.node_type(layer) != Some(NodeType::Layer) {
            return Ok(());
        }
        let surfaces = self.surfaces(stage, layer)?;
        draw::draw_scene(stage, layer, &mut surfaces.scene);
        Ok(())
    }

    /// Queue a layer for the next [`StageRenderer::flush`]. A layer queued
    /// several times is drawn once.
    pub fn batch_draw(&mut self, layer: NodeId) {
        if !self.pending.contains(&layer) {
            self.pending.push(layer);
        }
    }

    /// Number of layers waiting for [`StageRenderer::flush`].
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Draw every queued layer in the order it was queued.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Surface`] when a surface cannot be allocated.
    pub fn flush(&mut self, stage: &Stage) -> RenderResult<()> {
        let pending = std::mem::take(&mut self.pending);
        for layer in pending {
            self.draw_layer_checked(stage, layer)?;
        }
        Ok(())
    }

    /// Scene surface of a layer, if it has been drawn.
    #[must_use]
    pub fn layer_surface(&self, layer: NodeId) -> Option<&Surface> {
        self.layers.get(&layer).map(|s| &s.scene)
    }

    /// Flatten the drawn layers, bottom to top, into one surface.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Surface`] when the output cannot be allocated.
    pub fn composite(&self, stage: &Stage) -> RenderResult<Surface> {
        let (width, height) = stage.size();
        let mut out = Surface::new(width, height, stage.config().pixel_ratio, SurfaceMode::Scene)?;
        for layer in stage.layers() {
            if !stage.is_visible(*layer) {
                continue;
            }
            if let Some(surfaces) = self.layers.get(layer) {
                out.draw_surface(&surfaces.scene);
            }
        }
        Ok(out)
    }

    /// Topmost visible, listening shape under `point`.
    ///
    /// Layers are queried top to bottom. With a selector, a layer's hit
    /// resolves to the nearest ancestor-or-self matching it; a layer whose
    /// hit has no such ancestor yields nothing and the next layer down is
    /// tried.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Surface`] when a hit surface cannot be
    /// allocated.
    pub fn get_intersection(
        &mut self,
        stage: &Stage,
        point: Vector2d,
        selector: Option<&str>,
    ) -> RenderResult<Option<NodeId>> {
        let (width, height) = stage.size();
        if !(point.x >= 0.0 && point.y >= 0.0 && point.x < width && point.y < height) {
            return Ok(None);
        }
        self.prune(stage);
        for layer in stage.layers().iter().rev().copied() {
            let Some(shape) = self.intersect_layer(stage, layer, point)? else {
                continue;
            };
            let found = match selector {
                Some(selector) => stage.find_ancestor(shape, selector, true),
                None => Some(shape),
            };
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    /// Topmost visible, listening shape of one layer under `point`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Surface`] when a hit surface cannot be
    /// allocated.
    pub fn intersect_layer(
        &mut self,
        stage: &Stage,
        layer: NodeId,
        point: Vector2d,
    ) -> RenderResult<Option<NodeId>> {
        let Some(attrs) = stage.node(layer).and_then(|n| n.layer_attrs()) else {
            return Ok(None);
        };
        if !attrs.hit_graph_enabled {
            if let Some(surfaces) = self.layers.get_mut(&layer) {
                surfaces.hit = None;
            }
            return hit::intersect_uncached(stage, layer, point);
        }
        let (width, height) = stage.size();
        let ratio = stage.config().pixel_ratio;
        let graph = self.surfaces(stage, layer)?.hit_graph(width, height, ratio)?;
        graph.refresh(stage, layer);
        Ok(hit::resolve(stage, &graph.surface, point))
    }

    /// Drop surfaces of layers that are no longer on the stage.
    pub fn prune(&mut self, stage: &Stage) {
        let before = self.layers.len();
        self.layers
            .retain(|id, _| stage.node_type(*id) == Some(NodeType::Layer));
        self.pending.retain(|id| stage.contains(*id));
        let dropped = before - self.layers.len();
        if dropped > 0 {
            tracing::debug!(dropped, "released layer surfaces");
        }
    }

    fn surfaces(&mut self, stage: &Stage, layer: NodeId) -> RenderResult<&mut LayerSurfaces> {
        let (width, height) = stage.size();
        let ratio = stage.config().pixel_ratio;
        let fresh = !self
            .layers
            .get(&layer)
            .is_some_and(|s| s.scene.matches(width, height, ratio));
        if fresh {
            tracing::debug!(%layer, width, height, ratio, "allocating layer surfaces");
            self.layers
                .insert(layer, LayerSurfaces::new(width, height, ratio)?);
        }
        self.layers
            .get_mut(&layer)
            .ok_or_else(|| RenderError::Surface(format!("no surfaces for {layer}")))
    }
}

impl LayerPainter for StageRenderer {
    fn draw_layer(&mut self, stage: &Stage, layer: NodeId) {
        if let Err(e) = self.draw_layer_checked(stage, layer) {
            tracing::warn!(%layer, error = %e, "layer draw failed");
        }
    }
}

/// Streak renderer version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
