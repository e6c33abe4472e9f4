//! Frame-driven animation: per-frame callbacks, tweens and easing curves.
//!
//! Nothing here owns a clock. The host calls [`Scheduler::tick`] with the
//! elapsed milliseconds; the scheduler runs every active entry and then asks
//! a [`LayerPainter`] to redraw each affected layer once.

mod easing;
mod scheduler;
mod tween;

use std::fmt;

use crate::node::NodeId;
use crate::stage::Stage;

pub use easing::Easing;
pub use scheduler::{Scheduler, UpdateFn};
pub use tween::{StageCallback, TweenConfig, TweenState};

/// Timing information handed to animation callbacks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Frame {
    /// Total running time in milliseconds.
    pub time: f64,
    /// Milliseconds since the previous frame.
    pub time_diff: f64,
    /// `time` of the previous frame.
    pub last_time: f64,
    /// Frames per second derived from `time_diff`, zero for empty frames.
    pub frame_rate: f64,
}

impl Frame {
    pub(crate) fn advance(&mut self, delta: f64) {
        self.last_time = self.time;
        self.time += delta;
        self.time_diff = delta;
        self.frame_rate = if delta > 0.0 { 1000.0 / delta } else { 0.0 };
    }
}

/// Returned by animation callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationControl {
    /// Keep running.
    Continue,
    /// Deregister after this frame.
    Stop,
}

/// Handle to a scheduled animation or tween.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationId(u64);

impl AnimationId {
    /// Raw id.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AnimationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anim#{}", self.0)
    }
}

/// Redraws one layer. Implemented by renderers.
pub trait LayerPainter {
    /// Redraw `layer` from the current state of `stage`.
    fn draw_layer(&mut self, stage: &Stage, layer: NodeId);
}

/// Painter that draws nothing, for headless ticking.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPainter;

impl LayerPainter for NoopPainter {
    fn draw_layer(&mut self, _stage: &Stage, _layer: NodeId) {}
}

/// Outcome of one [`Scheduler::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Entries that ran this frame.
    pub updated: usize,
    /// Entries deregistered after this frame.
    pub stopped: Vec<AnimationId>,
    /// Layers redrawn, in order.
    pub redrawn: Vec<NodeId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_advance() {
        let mut frame = Frame::default();
        frame.advance(0.0);
        assert_eq!(frame.frame_rate, 0.0);
        frame.advance(50.0);
        assert_eq!(frame.time, 50.0);
        assert_eq!(frame.last_time, 0.0);
        assert_eq!(frame.frame_rate, 20.0);
    }

    #[test]
    fn test_animation_id_display() {
        assert_eq!(AnimationId(7).to_string(), "anim#7");
    }
}
