use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Render", inline)]
#[serde(default)]
/// Tick cadence of the scatterplot driver.
pub struct RenderOptions {
    /// Ticks per second while anything animates (0 = unlimited).
    #[schemars(title = "Target FPS", range(min = 0, max = 240))]
    pub target_fps: u32,
    /// Ticks per second while idle (0 = stop ticking).
    #[schemars(title = "Idle FPS", range(min = 0, max = 60))]
    pub idle_fps: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            target_fps: 60,
            idle_fps: 0,
        }
    }
}
