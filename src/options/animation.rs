use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::animation::EasingFunction;

/// Durations and easing of the stock transitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Animation", inline)]
#[serde(default)]
pub struct AnimationOptions {
    /// Frame-to-frame move, in milliseconds.
    #[schemars(title = "Frame Move (ms)", range(min = 0.0, max = 10000.0), extend("step" = 100.0))]
    pub frame_duration_ms: f64,
    /// Preview line fade, in milliseconds.
    #[schemars(title = "Preview Fade (ms)", range(min = 0.0, max = 5000.0), extend("step" = 50.0))]
    pub preview_duration_ms: f64,
    /// Neighbor highlight enter/exit, in milliseconds.
    #[schemars(title = "Highlight (ms)", range(min = 0.0, max = 2000.0), extend("step" = 10.0))]
    pub highlight_duration_ms: f64,
    /// Curve shared by the stock transitions.
    #[schemars(skip)]
    pub easing: EasingFunction,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            frame_duration_ms: 4000.0,
            preview_duration_ms: 1000.0,
            highlight_duration_ms: 300.0,
            easing: EasingFunction::EaseInOut,
        }
    }
}
