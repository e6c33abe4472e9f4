//! Tweens: interpolate node attributes toward target values over time.

use std::fmt;
use std::rc::Weak;

use serde_json::Value;

use super::easing::Easing;
use crate::attrs::{self, ValueKind};
use crate::color::Rgba;
use crate::node::NodeId;
use crate::stage::Stage;
use crate::{SceneError, SceneResult};

/// Callback invoked with the stage when a tween changes state.
pub type StageCallback = Box<dyn FnMut(&mut Stage)>;

/// Play state of a tween.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweenState {
    /// At the beginning, not advancing.
    Idle,
    /// Advancing on every tick.
    Playing,
    /// Stopped part-way.
    Paused,
    /// At the end.
    Finished,
}

/// Everything needed to build a tween.
///
/// ```
/// use streak_core::animation::{Easing, TweenConfig};
/// # use streak_core::{Shape, Stage};
/// # let mut stage = Stage::new(100.0, 100.0);
/// # let node = stage.create_shape(Shape::circle(5.0)).unwrap();
/// let config = TweenConfig::new(node, 500.0)
///     .to("x", 100.0)
///     .to("fill", "blue")
///     .easing(Easing::EaseInOut);
/// ```
pub struct TweenConfig {
    node: NodeId,
    duration_ms: f64,
    easing: Easing,
    targets: Vec<(String, Value)>,
    on_finish: Option<StageCallback>,
    on_reset: Option<StageCallback>,
    on_update: Option<StageCallback>,
}

impl fmt::Debug for TweenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TweenConfig")
            .field("node", &self.node)
            .field("duration_ms", &self.duration_ms)
            .field("easing", &self.easing)
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}

impl TweenConfig {
    /// Tween `node` over `duration_ms` milliseconds.
    #[must_use]
    pub fn new(node: NodeId, duration_ms: f64) -> Self {
        Self {
            node,
            duration_ms,
            easing: Easing::Linear,
            targets: Vec::new(),
            on_finish: None,
            on_reset: None,
            on_update: None,
        }
    }

    /// Add a target attribute value.
    #[must_use]
    pub fn to(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.targets.push((name.into(), value.into()));
        self
    }

    /// Set the easing curve.
    #[must_use]
    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Called when the tween reaches its end.
    #[must_use]
    pub fn on_finish(mut self, callback: impl FnMut(&mut Stage) + 'static) -> Self {
        self.on_finish = Some(Box::new(callback));
        self
    }

    /// Called when the tween returns to its beginning.
    #[must_use]
    pub fn on_reset(mut self, callback: impl FnMut(&mut Stage) + 'static) -> Self {
        self.on_reset = Some(Box::new(callback));
        self
    }

    /// Called after every applied frame.
    #[must_use]
    pub fn on_update(mut self, callback: impl FnMut(&mut Stage) + 'static) -> Self {
        self.on_update = Some(Box::new(callback));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PropValue {
    Number(f64),
    Color(Rgba),
    Numbers(Vec<f64>),
}

#[derive(Debug, Clone)]
struct TweenProp {
    name: String,
    begin: PropValue,
    end: PropValue,
}

impl TweenProp {
    /// Resolve begin/end for one target, or `None` when it cannot be
    /// interpolated.
    fn resolve(stage: &Stage, node: NodeId, name: &str, end: &Value) -> Option<Self> {
        let def = attrs::lookup(name)?;
        let current = stage.node(node)?.schema_attr(name)?;
        let (begin, end) = match (def.kind, end) {
            (ValueKind::Color, Value::String(text)) => {
                let end = Rgba::parse(text)?;
                let begin = current
                    .as_str()
                    .and_then(Rgba::parse)
                    .unwrap_or_else(|| end.with_alpha(0.0));
                (PropValue::Color(begin), PropValue::Color(end))
            }
            (ValueKind::Numbers, Value::Array(items)) => {
                let end: Vec<f64> = items
                    .iter()
                    .map(|v| v.as_f64().filter(|n| n.is_finite()))
                    .collect::<Option<_>>()?;
                let begin: Vec<f64> = current
                    .as_array()?
                    .iter()
                    .filter_map(Value::as_f64)
                    .collect();
                if begin.len() != end.len() {
                    return None;
                }
                (PropValue::Numbers(begin), PropValue::Numbers(end))
            }
            (
                ValueKind::Number
                | ValueKind::NonNegative
                | ValueKind::UnitInterval
                | ValueKind::Count { .. },
                Value::Number(n),
            ) => {
                let end = n.as_f64().filter(|v| v.is_finite())?;
                let begin = current.as_f64().unwrap_or(0.0);
                (PropValue::Number(begin), PropValue::Number(end))
            }
            _ => return None,
        };
        Some(Self {
            name: name.to_string(),
            begin,
            end,
        })
    }

    fn value_at(&self, easing: Easing, t: f64, duration: f64) -> Value {
        let ease = |b: f64, e: f64| easing.ease(t, b, e - b, duration);
        match (&self.begin, &self.end) {
            (PropValue::Number(b), PropValue::Number(e)) => Value::from(ease(*b, *e)),
            (PropValue::Color(b), PropValue::Color(e)) => {
                let ratio = easing.ease(t, 0.0, 1.0, duration);
                Value::from(b.lerp(e, ratio).to_string())
            }
            (PropValue::Numbers(b), PropValue::Numbers(e)) => Value::from(
                b.iter()
                    .zip(e)
                    .map(|(b, e)| ease(*b, *e))
                    .collect::<Vec<_>>(),
            ),
            _ => Value::Null,
        }
    }
}

fn prop_value(value: &PropValue) -> Value {
    match value {
        PropValue::Number(n) => Value::from(*n),
        PropValue::Color(c) => Value::from(c.to_string()),
        PropValue::Numbers(v) => Value::from(v.clone()),
    }
}

/// What a tween wants after an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Registration {
    /// Keep (or put) it in the running set.
    Run,
    /// Take it out of the running set.
    Idle,
}

pub(crate) struct Tween {
    target: NodeId,
    target_alive: Weak<()>,
    duration: f64,
    easing: Easing,
    props: Vec<TweenProp>,
    elapsed: f64,
    reversed: bool,
    state: TweenState,
    on_finish: Option<StageCallback>,
    on_reset: Option<StageCallback>,
    on_update: Option<StageCallback>,
}

impl Tween {
    pub(crate) fn new(stage: &Stage, config: TweenConfig) -> SceneResult<Self> {
        let target_alive = stage
            .node(config.node)
            .ok_or(SceneError::NodeNotFound(config.node))?
            .liveness();
        let warn = stage.config().show_warnings;
        let mut props = Vec::with_capacity(config.targets.len());
        for (name, end) in &config.targets {
            match TweenProp::resolve(stage, config.node, name, end) {
                Some(prop) => props.push(prop),
                None if warn => {
                    tracing::warn!(node = %config.node, attr = %name, "attribute cannot be tweened, skipping");
                }
                None => {}
            }
        }
        Ok(Self {
            target: config.node,
            target_alive,
            duration: if config.duration_ms.is_finite() {
                config.duration_ms.max(0.0)
            } else {
                0.0
            },
            easing: config.easing,
            props,
            elapsed: 0.0,
            reversed: false,
            state: TweenState::Idle,
            on_finish: config.on_finish,
            on_reset: config.on_reset,
            on_update: config.on_update,
        })
    }

    pub(crate) fn target(&self) -> NodeId {
        self.target
    }

    /// True once the target node has been destroyed.
    pub(crate) fn is_orphaned(&self) -> bool {
        self.target_alive.strong_count() == 0
    }

    pub(crate) fn state(&self) -> TweenState {
        self.state
    }

    pub(crate) fn elapsed(&self) -> f64 {
        self.elapsed
    }

    fn write(&mut self, stage: &mut Stage, values: Vec<(String, Value)>) {
        for (name, value) in values {
            // The target may have been destroyed by a callback.
            if stage.set_attr(self.target, &name, value).is_err() {
                return;
            }
        }
        if let Some(callback) = self.on_update.as_mut() {
            callback(stage);
        }
    }

    fn apply_at(&mut self, stage: &mut Stage, t: f64) {
        let values = self
            .props
            .iter()
            .map(|p| (p.name.clone(), p.value_at(self.easing, t, self.duration)))
            .collect();
        self.write(stage, values);
    }

    fn apply_endpoint(&mut self, stage: &mut Stage, end: bool) {
        let values = self
            .props
            .iter()
            .map(|p| {
                let value = if end { &p.end } else { &p.begin };
                (p.name.clone(), prop_value(value))
            })
            .collect();
        self.write(stage, values);
    }

    pub(crate) fn play(&mut self) -> Option<Registration> {
        match self.state {
            TweenState::Finished => None,
            _ => {
                self.state = TweenState::Playing;
                Some(Registration::Run)
            }
        }
    }

    pub(crate) fn pause(&mut self) -> Option<Registration> {
        (self.state == TweenState::Playing).then(|| {
            self.state = TweenState::Paused;
            Registration::Idle
        })
    }

    /// Flip direction. A finished tween becomes paused at its end so it can
    /// be played backwards.
    pub(crate) fn reverse(&mut self) {
        self.reversed = !self.reversed;
        if self.state == TweenState::Finished {
            self.state = TweenState::Paused;
        }
    }

    pub(crate) fn seek(&mut self, stage: &mut Stage, t: f64) {
        self.elapsed = if t.is_finite() {
            t.clamp(0.0, self.duration)
        } else {
            0.0
        };
        self.apply_at(stage, self.elapsed);
    }

    pub(crate) fn finish(&mut self, stage: &mut Stage) -> Registration {
        self.elapsed = self.duration;
        self.apply_endpoint(stage, true);
        self.state = TweenState::Finished;
        if let Some(callback) = self.on_finish.as_mut() {
            callback(stage);
        }
        Registration::Idle
    }

    /// Back to the beginning, playing forward again next time.
    pub(crate) fn reset(&mut self, stage: &mut Stage) -> Registration {
        self.elapsed = 0.0;
        self.reversed = false;
        self.apply_endpoint(stage, false);
        self.state = TweenState::Idle;
        if let Some(callback) = self.on_reset.as_mut() {
            callback(stage);
        }
        Registration::Idle
    }

    /// Advance by one tick while playing.
    pub(crate) fn advance(&mut self, stage: &mut Stage, delta: f64) -> Registration {
        if self.state != TweenState::Playing {
            return Registration::Idle;
        }
        if self.reversed {
            self.elapsed -= delta;
            if self.elapsed <= 0.0 {
                return self.reset(stage);
            }
        } else {
            self.elapsed += delta;
            if self.elapsed >= self.duration {
                return self.finish(stage);
            }
        }
        self.apply_at(stage, self.elapsed);
        Registration::Run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Shape;
    use serde_json::json;

    fn stage_with_rect() -> (Stage, NodeId) {
        let mut stage = Stage::new(100.0, 100.0);
        let rect = stage
            .create_shape(Shape::rect(10.0, 10.0).with_fill("rgb(0,0,0)"))
            .expect("rect");
        (stage, rect)
    }

    #[test]
    fn test_unsupported_targets_are_skipped() {
        let (stage, rect) = stage_with_rect();
        let config = TweenConfig::new(rect, 100.0)
            .to("x", 50.0)
            .to("radius", 5.0)
            .to("nonsense", 1.0)
            .to("fill", "not a color")
            .to("points", json!([1, 2]));
        let tween = Tween::new(&stage, config).expect("tween");
        assert_eq!(tween.props.len(), 1);
        assert_eq!(tween.props[0].name, "x");
    }

    #[test]
    fn test_color_midpoint() {
        let (mut stage, rect) = stage_with_rect();
        let config = TweenConfig::new(rect, 100.0).to("fill", "rgb(255,255,255)");
        let mut tween = Tween::new(&stage, config).expect("tween");
        tween.seek(&mut stage, 50.0);
        assert_eq!(stage.get_attr(rect, "fill"), json!("rgba(128,128,128,1)"));
    }

    #[test]
    fn test_missing_begin_color_fades_in() {
        let mut stage = Stage::new(10.0, 10.0);
        let rect = stage.create_shape(Shape::rect(1.0, 1.0)).expect("rect");
        let config = TweenConfig::new(rect, 100.0).to("stroke", "red");
        let mut tween = Tween::new(&stage, config).expect("tween");
        tween.seek(&mut stage, 0.0);
        assert_eq!(stage.get_attr(rect, "stroke"), json!("rgba(255,0,0,0)"));
    }

    #[test]
    fn test_number_array_tween() {
        let mut stage = Stage::new(10.0, 10.0);
        let line = stage
            .create_shape(Shape::line(vec![0.0, 0.0, 10.0, 10.0]))
            .expect("line");
        let config = TweenConfig::new(line, 100.0).to("points", json!([10, 10, 20, 30]));
        let mut tween = Tween::new(&stage, config).expect("tween");
        tween.seek(&mut stage, 50.0);
        assert_eq!(stage.get_attr(line, "points"), json!([5.0, 5.0, 15.0, 20.0]));
    }

    #[test]
    fn test_state_machine() {
        let (mut stage, rect) = stage_with_rect();
        let config = TweenConfig::new(rect, 100.0).to("x", 100.0);
        let mut tween = Tween::new(&stage, config).expect("tween");
        assert_eq!(tween.state(), TweenState::Idle);
        assert!(tween.pause().is_none());
        assert_eq!(tween.play(), Some(Registration::Run));
        assert_eq!(tween.advance(&mut stage, 40.0), Registration::Run);
        assert_eq!(tween.pause(), Some(Registration::Idle));
        assert_eq!(tween.state(), TweenState::Paused);
        assert_eq!(tween.advance(&mut stage, 40.0), Registration::Idle);
        assert!((tween.elapsed() - 40.0).abs() < 1e-9);
        tween.play();
        assert_eq!(tween.advance(&mut stage, 100.0), Registration::Idle);
        assert_eq!(tween.state(), TweenState::Finished);
        assert_eq!(stage.get_attr(rect, "x"), json!(100.0));
        assert!(tween.play().is_none());
        tween.reset(&mut stage);
        assert_eq!(tween.state(), TweenState::Idle);
        assert_eq!(stage.get_attr(rect, "x"), json!(0.0));
    }

    #[test]
    fn test_reverse_to_start_resets() {
        let (mut stage, rect) = stage_with_rect();
        let config = TweenConfig::new(rect, 100.0).to("x", 100.0);
        let mut tween = Tween::new(&stage, config).expect("tween");
        tween.play();
        tween.advance(&mut stage, 30.0);
        tween.reverse();
        assert_eq!(tween.advance(&mut stage, 10.0), Registration::Run);
        assert!((tween.elapsed() - 20.0).abs() < 1e-9);
        assert_eq!(tween.advance(&mut stage, 50.0), Registration::Idle);
        assert_eq!(tween.state(), TweenState::Idle);
        assert_eq!(stage.get_attr(rect, "x"), json!(0.0));
    }

    #[test]
    fn test_unknown_target_is_an_error() {
        let (mut stage, rect) = stage_with_rect();
        stage.destroy(rect);
        assert!(matches!(
            Tween::new(&stage, TweenConfig::new(rect, 10.0)),
            Err(SceneError::NodeNotFound(_))
        ));
    }
}
