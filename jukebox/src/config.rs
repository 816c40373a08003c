//! Kiosk configuration (yaml). Every field has a default so a missing or
//! partial file still yields a usable config.

use std::error::Error;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use crate::display::{Resolution, ResolutionPolicy};

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Timings {
    pub intro_ready_timeout_ms: u64,
    pub intro_poll_interval_ms: u64,
    pub intro_end_threshold_ms: u64,
    pub intro_fade_out_ms: u64,
    pub intro_black_frames: u32,
    pub ui_fade_in_ms: u64,
    pub ui_fade_ms: u64,
    pub dimmed_volume_fraction: f32,
    pub switch_timeout_ms: u64,
    pub stop_settle_attempts: u32,
    pub stop_settle_interval_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            intro_ready_timeout_ms: 10_000,
            intro_poll_interval_ms: 50,
            intro_end_threshold_ms: 150,
            intro_fade_out_ms: 300,
            intro_black_frames: 3,
            ui_fade_in_ms: 500,
            ui_fade_ms: 300,
            dimmed_volume_fraction: 0.75,
            switch_timeout_ms: 5000,
            stop_settle_attempts: 10,
            stop_settle_interval_ms: 20,
        }
    }
}

impl Timings {
    pub fn intro_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.intro_ready_timeout_ms)
    }

    pub fn intro_poll_interval(&self) -> Duration {
        Duration::from_millis(self.intro_poll_interval_ms.max(1))
    }

    /// How many readiness polls fit in the intro timeout.
    pub fn intro_poll_attempts(&self) -> u64 {
        (self.intro_ready_timeout_ms / self.intro_poll_interval_ms.max(1))
            .max(1)
    }

    pub fn intro_end_threshold_seconds(&self) -> f64 {
        self.intro_end_threshold_ms as f64 / 1000.0
    }

    pub fn intro_fade_out(&self) -> Duration {
        Duration::from_millis(self.intro_fade_out_ms)
    }

    pub fn ui_fade_in(&self) -> Duration {
        Duration::from_millis(self.ui_fade_in_ms)
    }

    pub fn ui_fade(&self) -> Duration {
        Duration::from_millis(self.ui_fade_ms)
    }

    pub fn switch_timeout(&self) -> Duration {
        Duration::from_millis(self.switch_timeout_ms)
    }

    pub fn stop_settle_interval(&self) -> Duration {
        Duration::from_millis(self.stop_settle_interval_ms)
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct EmulatorConfig {
    /// Program used to launch games; the game path is appended to `args`.
    pub command: String,
    pub args: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct KioskConfig {
    pub fps: f32,
    pub device: PathBuf,
    pub intro_video: Option<PathBuf>,
    pub library: Option<PathBuf>,
    pub display: ResolutionPolicy,
    pub timings: Timings,
    pub emulator: EmulatorConfig,
    /// Modes advertised by the virtual display in development builds.
    pub virtual_modes: Vec<Resolution>,
    pub virtual_buffers: usize,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            fps: 60.0,
            device: PathBuf::from("/dev/dri/card0"),
            intro_video: None,
            library: None,
            display: ResolutionPolicy::default(),
            timings: Timings::default(),
            emulator: EmulatorConfig::default(),
            virtual_modes: vec![
                Resolution::new(1920, 1080),
                Resolution::new(1280, 720),
                Resolution::new(720, 480),
            ],
            virtual_buffers: 3,
        }
    }
}

impl KioskConfig {
    pub fn parse(yaml: &str) -> Result<Self, Box<dyn Error>> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Missing file means defaults; anything else unreadable is an error.
    pub fn load_or_default(path: &Path) -> Result<Self, Box<dyn Error>> {
        match fs::read_to_string(path) {
            Ok(yaml) => {
                let config = Self::parse(&yaml)?;
                info!("loaded config '{}'", path.display());
                Ok(config)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!("no config at '{}', using defaults", path.display());
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }
}
