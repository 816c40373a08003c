use serde::{Deserialize, Serialize};

use crate::display::DisplayMode;
use crate::playback::orchestrator::DEFAULT_VOLUME;

/// User choices that survive restarts.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Settings {
    pub version: String,
    pub display_mode: DisplayMode,
    /// Percent, 0-100.
    pub volume: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            display_mode: DisplayMode::default(),
            volume: DEFAULT_VOLUME,
        }
    }
}

impl Settings {
    pub fn new(display_mode: DisplayMode, volume: f32) -> Self {
        Self {
            display_mode,
            volume: volume.clamp(0.0, 100.0),
            ..Self::default()
        }
    }
}
