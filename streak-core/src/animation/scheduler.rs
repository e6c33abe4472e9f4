//! The frame scheduler: runs animation callbacks and tweens once per tick
//! and redraws each touched layer exactly once.

use std::collections::{BTreeMap, HashSet};

use super::tween::{Registration, Tween, TweenConfig, TweenState};
use super::{AnimationControl, AnimationId, Frame, LayerPainter, TickReport};
use crate::config::EngineConfig;
use crate::node::{NodeId, NodeType};
use crate::stage::Stage;
use crate::SceneResult;

/// Per-frame update routine of a callback animation.
pub type UpdateFn = Box<dyn FnMut(&Frame, &mut Stage) -> AnimationControl>;

struct CallbackAnimation {
    layers: Vec<NodeId>,
    update: UpdateFn,
    frame: Frame,
}

enum Entry {
    Callback(CallbackAnimation),
    Tween(Box<Tween>),
}

/// Registry of animations and tweens, driven by an external clock through
/// [`Scheduler::tick`].
pub struct Scheduler {
    entries: BTreeMap<AnimationId, Entry>,
    running: Vec<AnimationId>,
    next_id: u64,
    max_frame_delta_ms: Option<f64>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("entries", &self.entries.len())
            .field("running", &self.running)
            .field("max_frame_delta_ms", &self.max_frame_delta_ms)
            .finish()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Empty scheduler without a delta cap.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            running: Vec::new(),
            next_id: 1,
            max_frame_delta_ms: None,
        }
    }

    /// Empty scheduler using the delta cap from `config`.
    #[must_use]
    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            max_frame_delta_ms: config.max_frame_delta_ms,
            ..Self::new()
        }
    }

    fn register(&mut self, entry: Entry) -> AnimationId {
        let id = AnimationId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, entry);
        id
    }

    fn set_running(&mut self, id: AnimationId, run: bool) {
        let present = self.running.contains(&id);
        if run && !present {
            self.running.push(id);
        } else if !run && present {
            self.running.retain(|r| *r != id);
        }
    }

    // ------------------------------------------------------------------
    // Callback animations
    // ------------------------------------------------------------------

    /// Create a (stopped) animation that redraws `layers` after each update.
    pub fn animate(
        &mut self,
        layers: Vec<NodeId>,
        update: impl FnMut(&Frame, &mut Stage) -> AnimationControl + 'static,
    ) -> AnimationId {
        let id = self.register(Entry::Callback(CallbackAnimation {
            layers,
            update: Box::new(update),
            frame: Frame::default(),
        }));
        tracing::debug!(animation = %id, "created animation");
        id
    }

    /// Add a layer to an animation's redraw set.
    pub fn add_layer(&mut self, id: AnimationId, layer: NodeId) -> bool {
        match self.entries.get_mut(&id) {
            Some(Entry::Callback(anim)) => {
                if !anim.layers.contains(&layer) {
                    anim.layers.push(layer);
                }
                true
            }
            _ => false,
        }
    }

    /// Replace an animation's redraw set.
    pub fn set_layers(&mut self, id: AnimationId, layers: Vec<NodeId>) -> bool {
        match self.entries.get_mut(&id) {
            Some(Entry::Callback(anim)) => {
                anim.layers = layers;
                true
            }
            _ => false,
        }
    }

    /// Layers an animation redraws.
    #[must_use]
    pub fn layers(&self, id: AnimationId) -> &[NodeId] {
        match self.entries.get(&id) {
            Some(Entry::Callback(anim)) => &anim.layers,
            _ => &[],
        }
    }

    /// Frame state of a callback animation.
    #[must_use]
    pub fn frame(&self, id: AnimationId) -> Option<Frame> {
        match self.entries.get(&id) {
            Some(Entry::Callback(anim)) => Some(anim.frame),
            _ => None,
        }
    }

    /// Start a callback animation. Returns `false` for unknown ids and tweens.
    pub fn start(&mut self, id: AnimationId) -> bool {
        let Some(Entry::Callback(anim)) = self.entries.get_mut(&id) else {
            return false;
        };
        anim.frame.time_diff = 0.0;
        anim.frame.frame_rate = 0.0;
        self.set_running(id, true);
        true
    }

    /// Stop a callback animation (it keeps its frame and can be restarted).
    pub fn stop(&mut self, id: AnimationId) -> bool {
        if !matches!(self.entries.get(&id), Some(Entry::Callback(_))) {
            return false;
        }
        self.set_running(id, false);
        true
    }

    /// True while an animation or tween is in the running set. A tween
    /// stops counting as soon as its target is destroyed.
    #[must_use]
    pub fn is_running(&self, id: AnimationId) -> bool {
        self.running.contains(&id) && !self.is_orphan(id)
    }

    /// Number of running entries.
    #[must_use]
    pub fn running_count(&self) -> usize {
        self.running.iter().filter(|id| !self.is_orphan(**id)).count()
    }

    fn is_orphan(&self, id: AnimationId) -> bool {
        matches!(self.entries.get(&id), Some(Entry::Tween(tween)) if tween.is_orphaned())
    }

    /// Drop an animation or tween entirely.
    pub fn remove(&mut self, id: AnimationId) -> bool {
        self.set_running(id, false);
        self.entries.remove(&id).is_some()
    }

    // ------------------------------------------------------------------
    // Ticking
    // ------------------------------------------------------------------

    /// Advance every running entry by `delta_ms`, then redraw the touched
    /// layers once each, in first-touched order.
    pub fn tick(
        &mut self,
        delta_ms: f64,
        stage: &mut Stage,
        painter: &mut dyn LayerPainter,
    ) -> TickReport {
        let mut delta = if delta_ms.is_finite() {
            delta_ms.max(0.0)
        } else {
            0.0
        };
        if let Some(max) = self.max_frame_delta_ms {
            delta = delta.min(max);
        }

        let orphans: Vec<AnimationId> = self
            .entries
            .iter()
            .filter_map(|(id, entry)| match entry {
                Entry::Tween(tween) if tween.is_orphaned() || !stage.contains(tween.target()) => {
                    Some(*id)
                }
                _ => None,
            })
            .collect();
        for id in orphans {
            tracing::debug!(animation = %id, "dropping tween of destroyed node");
            self.remove(id);
        }

        let active = self.running.clone();
        let mut report = TickReport::default();
        let mut touched = Vec::new();
        for id in active {
            let Some(entry) = self.entries.get_mut(&id) else {
                continue;
            };
            report.updated += 1;
            let keep = match entry {
                Entry::Callback(anim) => {
                    anim.frame.advance(delta);
                    let control = (anim.update)(&anim.frame, stage);
                    touched.extend_from_slice(&anim.layers);
                    control == AnimationControl::Continue
                }
                Entry::Tween(tween) => {
                    let registration = tween.advance(stage, delta);
                    touched.extend(stage.layer_of(tween.target()));
                    registration == Registration::Run
                }
            };
            if !keep {
                report.stopped.push(id);
            }
        }
        for id in &report.stopped {
            self.set_running(*id, false);
        }

        let mut seen = HashSet::new();
        for layer in touched {
            if stage.node_type(layer) == Some(NodeType::Layer) && seen.insert(layer) {
                report.redrawn.push(layer);
            }
        }
        for layer in &report.redrawn {
            painter.draw_layer(stage, *layer);
        }
        tracing::trace!(
            updated = report.updated,
            redrawn = report.redrawn.len(),
            "tick"
        );
        report
    }

    // ------------------------------------------------------------------
    // Tweens
    // ------------------------------------------------------------------

    /// Create an idle tween. Begin values are read from the node now.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SceneError::NodeNotFound`] when the node is unknown.
    pub fn tween(&mut self, stage: &Stage, config: TweenConfig) -> SceneResult<AnimationId> {
        let tween = Tween::new(stage, config)?;
        Ok(self.register(Entry::Tween(Box::new(tween))))
    }

    fn tween_ref(&self, id: AnimationId) -> Option<&Tween> {
        match self.entries.get(&id) {
            Some(Entry::Tween(tween)) if !tween.is_orphaned() => Some(tween),
            _ => None,
        }
    }

    fn tween_mut(&mut self, id: AnimationId) -> Option<&mut Tween> {
        match self.entries.get_mut(&id) {
            Some(Entry::Tween(tween)) if !tween.is_orphaned() => Some(tween),
            _ => None,
        }
    }

    fn apply_registration(&mut self, id: AnimationId, registration: Registration) {
        self.set_running(id, registration == Registration::Run);
    }

    /// Start or resume. Returns `false` for finished tweens and unknown ids.
    pub fn play(&mut self, id: AnimationId) -> bool {
        match self.tween_mut(id).and_then(Tween::play) {
            Some(registration) => {
                self.apply_registration(id, registration);
                true
            }
            None => false,
        }
    }

    /// Pause a playing tween.
    pub fn pause(&mut self, id: AnimationId) -> bool {
        match self.tween_mut(id).and_then(Tween::pause) {
            Some(registration) => {
                self.apply_registration(id, registration);
                true
            }
            None => false,
        }
    }

    /// Flip the direction of a tween.
    pub fn reverse(&mut self, id: AnimationId) -> bool {
        self.tween_mut(id).map(Tween::reverse).is_some()
    }

    /// Jump to `t_ms` and apply the values there; the state is unchanged.
    pub fn seek(&mut self, id: AnimationId, stage: &mut Stage, t_ms: f64) -> bool {
        self.tween_mut(id)
            .map(|tween| tween.seek(stage, t_ms))
            .is_some()
    }

    /// Jump to the end, apply the end values and fire `on_finish`.
    pub fn finish(&mut self, id: AnimationId, stage: &mut Stage) -> bool {
        let Some(registration) = self.tween_mut(id).map(|tween| tween.finish(stage)) else {
            return false;
        };
        self.apply_registration(id, registration);
        true
    }

    /// Jump to the beginning, apply the begin values and fire `on_reset`.
    pub fn reset(&mut self, id: AnimationId, stage: &mut Stage) -> bool {
        let Some(registration) = self.tween_mut(id).map(|tween| tween.reset(stage)) else {
            return false;
        };
        self.apply_registration(id, registration);
        true
    }

    /// Drop a tween. Idempotent.
    pub fn destroy(&mut self, id: AnimationId) -> bool {
        if !matches!(self.entries.get(&id), Some(Entry::Tween(_))) {
            return false;
        }
        self.remove(id)
    }

    /// Play state of a tween; `None` once the tween or its target is gone.
    #[must_use]
    pub fn tween_state(&self, id: AnimationId) -> Option<TweenState> {
        self.tween_ref(id).map(Tween::state)
    }

    /// Elapsed time of a tween in milliseconds.
    #[must_use]
    pub fn tween_elapsed(&self, id: AnimationId) -> Option<f64> {
        self.tween_ref(id).map(Tween::elapsed)
    }

    /// Destroy a subtree and forget every tween targeting it and every
    /// destroyed layer in animation redraw sets.
    pub fn destroy_node(&mut self, stage: &mut Stage, node: NodeId) -> Vec<NodeId> {
        let destroyed = stage.destroy(node);
        let gone: HashSet<NodeId> = destroyed.iter().copied().collect();
        let dead: Vec<AnimationId> = self
            .entries
            .iter_mut()
            .filter_map(|(id, entry)| match entry {
                Entry::Tween(tween) => gone.contains(&tween.target()).then_some(*id),
                Entry::Callback(anim) => {
                    anim.layers.retain(|l| !gone.contains(l));
                    None
                }
            })
            .collect();
        for id in dead {
            self.remove(id);
        }
        destroyed
    }
}
