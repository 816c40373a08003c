//! In-process stand-ins for the video decoder, the overlay compositor and
//! the button hardware.

use std::path::{Path, PathBuf};

use log::{debug, trace};

use crate::display::{Resolution, Viewport};
use crate::playback::input::{Action, InputEvent, InputSource};
use crate::playback::producers::{
    TransportState, UiCompositor, UiView, VideoBackend,
};

/// A transport that plays every file for `default_duration` seconds.
///
/// With `step_seconds == 0.0` the position only moves when a test sets it;
/// otherwise every `update_state` advances it by one step and yields a frame.
#[derive(Debug)]
pub struct SimulatedVideo {
    pub transport: TransportState,
    pub default_duration: f64,
    pub step_seconds: f64,
    pub fail_loads: bool,
    /// Loads succeed but playback never starts.
    pub stall_loads: bool,
    pub ignore_stop: bool,
    stalled: bool,
    frame_ready: bool,
    volume: f32,
    loaded: Vec<PathBuf>,
    stops: usize,
    updates: usize,
    initialized: bool,
    init_count: usize,
    invalidations: usize,
    renders: usize,
    last_viewport: Option<Viewport>,
}

impl SimulatedVideo {
    pub fn new(default_duration: f64) -> Self {
        Self {
            transport: TransportState::default(),
            default_duration,
            step_seconds: 0.0,
            fail_loads: false,
            stall_loads: false,
            ignore_stop: false,
            stalled: false,
            frame_ready: false,
            volume: 100.0,
            loaded: Vec::new(),
            stops: 0,
            updates: 0,
            initialized: false,
            init_count: 0,
            invalidations: 0,
            renders: 0,
            last_viewport: None,
        }
    }

    pub fn with_step(mut self, step_seconds: f64) -> Self {
        self.step_seconds = step_seconds;
        self
    }

    pub fn set_position(&mut self, position: f64) {
        self.transport.position = position;
    }

    pub fn push_frame(&mut self) {
        self.frame_ready = true;
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn loaded(&self) -> &[PathBuf] {
        &self.loaded
    }

    pub fn stop_count(&self) -> usize {
        self.stops
    }

    pub fn update_count(&self) -> usize {
        self.updates
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn init_count(&self) -> usize {
        self.init_count
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations
    }

    pub fn render_count(&self) -> usize {
        self.renders
    }

    pub fn last_viewport(&self) -> Option<Viewport> {
        self.last_viewport
    }
}

impl VideoBackend for SimulatedVideo {
    fn initialize(&mut self) -> Result<(), String> {
        self.initialized = true;
        self.init_count += 1;
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<(), String> {
        if self.fail_loads {
            return Err(format!("cannot open '{}'", path.display()));
        }
        debug!("simulated load '{}'", path.display());
        self.loaded.push(path.to_path_buf());
        self.stalled = self.stall_loads;
        self.frame_ready = false;
        self.transport = TransportState {
            position: 0.0,
            duration: if self.stalled {
                0.0
            } else {
                self.default_duration
            },
            is_playing: false,
        };
        Ok(())
    }

    fn play(&mut self) {
        if self.stalled || self.loaded.is_empty() {
            return;
        }
        self.transport.is_playing = true;
        self.frame_ready = true;
    }

    fn pause(&mut self) {
        self.transport.is_playing = false;
    }

    fn stop(&mut self) {
        self.stops += 1;
        if self.ignore_stop {
            return;
        }
        self.transport.is_playing = false;
        self.transport.position = 0.0;
    }

    fn seek(&mut self, delta_seconds: f64) {
        let end = self.transport.duration.max(0.0);
        self.transport.position =
            (self.transport.position + delta_seconds).clamp(0.0, end);
    }

    fn set_volume(&mut self, percent: f32) {
        self.volume = percent;
    }

    fn update_state(&mut self) -> TransportState {
        self.updates += 1;
        if self.transport.is_playing && self.step_seconds > 0.0 {
            self.transport.position += self.step_seconds;
            self.frame_ready = true;
            if self.transport.duration_known()
                && self.transport.position >= self.transport.duration
            {
                self.transport.position = self.transport.duration;
                self.transport.is_playing = false;
            }
        }
        self.transport
    }

    fn take_new_frame(&mut self) -> bool {
        std::mem::take(&mut self.frame_ready)
    }

    fn render(&mut self, viewport: Viewport) {
        self.renders += 1;
        self.last_viewport = Some(viewport);
    }

    fn invalidate_gpu_resources(&mut self) {
        self.initialized = false;
        self.invalidations += 1;
    }
}

/// Records what it was asked to draw.
#[derive(Debug, Default)]
pub struct SimulatedUi {
    initialized: bool,
    init_count: usize,
    invalidations: usize,
    bezels: usize,
    last: Option<(UiView, Viewport, f32)>,
}

impl SimulatedUi {
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn init_count(&self) -> usize {
        self.init_count
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations
    }

    pub fn bezel_count(&self) -> usize {
        self.bezels
    }

    pub fn last_render(&self) -> Option<&(UiView, Viewport, f32)> {
        self.last.as_ref()
    }
}

impl UiCompositor for SimulatedUi {
    fn initialize(&mut self) -> Result<(), String> {
        self.initialized = true;
        self.init_count += 1;
        Ok(())
    }

    fn render(&mut self, view: &UiView, viewport: Viewport, opacity: f32) {
        trace!("overlay at {:.2} in {:?}", opacity, viewport);
        self.last = Some((view.clone(), viewport, opacity));
    }

    fn render_bezel(&mut self, _screen: Resolution) {
        self.bezels += 1;
    }

    fn invalidate_gpu_resources(&mut self) {
        self.initialized = false;
        self.invalidations += 1;
    }
}

/// Replays button presses at fixed tick numbers.
///
/// Scripts are comma separated `tick:action[:delta]` entries, e.g.
/// `"90:select,200:rotate:-2,400:quit"`.
#[derive(Clone, Debug, Default)]
pub struct ScriptedInput {
    script: Vec<(u64, InputEvent)>,
    tick: u64,
}

impl ScriptedInput {
    pub fn new(mut script: Vec<(u64, InputEvent)>) -> Self {
        script.sort_by_key(|(tick, _)| *tick);
        Self { script, tick: 0 }
    }

    pub fn parse(script: &str) -> Result<Self, String> {
        let mut entries = Vec::new();
        for entry in script.split(',').map(str::trim).filter(|s| !s.is_empty())
        {
            let mut parts = entry.split(':');
            let tick = parts
                .next()
                .and_then(|t| t.trim().parse::<u64>().ok())
                .ok_or_else(|| format!("invalid tick in '{}'", entry))?;
            let action = parts
                .next()
                .and_then(Action::parse)
                .ok_or_else(|| format!("invalid action in '{}'", entry))?;
            let delta = match parts.next() {
                Some(delta) => delta
                    .trim()
                    .parse::<i32>()
                    .map_err(|_| format!("invalid delta in '{}'", entry))?,
                None => 0,
            };
            entries.push((tick, InputEvent::with_delta(action, delta)));
        }
        Ok(Self::new(entries))
    }

    pub fn is_exhausted(&self) -> bool {
        self.script.iter().all(|(tick, _)| *tick < self.tick)
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> Vec<InputEvent> {
        let tick = self.tick;
        self.tick += 1;
        self.script
            .iter()
            .filter(|(at, _)| *at == tick)
            .map(|(_, event)| *event)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stepping_video_reaches_end_and_stops() {
        let mut video = SimulatedVideo::new(1.0).with_step(0.4);
        video.load(Path::new("/clip.mp4")).unwrap();
        video.play();

        assert!(video.take_new_frame());
        assert!(!video.take_new_frame());

        video.update_state();
        video.update_state();
        let state = video.update_state();
        assert_eq!(state.position, 1.0);
        assert!(!state.is_playing);
    }

    #[test]
    fn stalled_load_never_plays() {
        let mut video = SimulatedVideo::new(10.0);
        video.stall_loads = true;
        video.load(Path::new("/clip.mp4")).unwrap();
        video.play();
        let state = video.update_state();
        assert!(!state.is_playing);
        assert!(!state.duration_known());
    }

    #[test]
    fn script_replays_at_tick_numbers() {
        let mut input = ScriptedInput::parse("2:select, 0:rotate:-3").unwrap();
        assert_eq!(
            input.poll(),
            vec![InputEvent::with_delta(Action::Rotate, -3)]
        );
        assert!(input.poll().is_empty());
        assert_eq!(input.poll(), vec![InputEvent::press(Action::Select)]);
        assert!(input.is_exhausted());
    }

    #[test]
    fn script_rejects_unknown_actions() {
        assert!(ScriptedInput::parse("4:jump").is_err());
        assert!(ScriptedInput::parse("x:select").is_err());
    }
}
