//! Engine configuration.
//!
//! There are no global settings: an [`EngineConfig`] is handed to
//! [`Stage::with_config`](crate::Stage::with_config) and read back from the
//! stage by every component that needs it.

use serde::{Deserialize, Serialize};

use crate::SceneResult;

/// Smallest accepted device pixel ratio.
pub const MIN_PIXEL_RATIO: f64 = 0.1;

/// Configuration for a stage and everything drawn from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Device pixel ratio used to size every surface of the stage.
    pub pixel_ratio: f64,
    /// Emit `warn` events for rejected writes and skipped tween attributes.
    pub show_warnings: bool,
    /// Whether newly created layers cache their hit surface.
    pub hit_graph_enabled: bool,
    /// Upper bound applied to the delta of a scheduler tick, in milliseconds.
    pub max_frame_delta_ms: Option<f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pixel_ratio: 1.0,
            show_warnings: true,
            hit_graph_enabled: true,
            max_frame_delta_ms: None,
        }
    }
}

impl EngineConfig {
    /// Set the pixel ratio.
    #[must_use]
    pub fn with_pixel_ratio(mut self, ratio: f64) -> Self {
        self.pixel_ratio = ratio;
        self.normalized()
    }

    /// Set whether warnings are emitted.
    #[must_use]
    pub fn with_warnings(mut self, show: bool) -> Self {
        self.show_warnings = show;
        self
    }

    /// Clamp fields into their legal ranges.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if !self.pixel_ratio.is_finite() || self.pixel_ratio < MIN_PIXEL_RATIO {
            let replacement = if self.pixel_ratio.is_finite() && self.pixel_ratio > 0.0 {
                MIN_PIXEL_RATIO
            } else {
                1.0
            };
            tracing::warn!(
                "pixel ratio {} out of range, using {replacement}",
                self.pixel_ratio
            );
            self.pixel_ratio = replacement;
        }
        if let Some(max) = self.max_frame_delta_ms {
            if !max.is_finite() || max <= 0.0 {
                self.max_frame_delta_ms = None;
            }
        }
        self
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not valid JSON for this shape.
    pub fn from_json(json: &str) -> SceneResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.normalized())
    }
}
