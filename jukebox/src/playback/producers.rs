//! Render producers and the render context. Their internals (decoding, text,
//! shaders) live outside this crate; the engine only drives them.

use std::path::Path;

use crate::display::{Resolution, Viewport};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TransportState {
    /// Seconds.
    pub position: f64,
    /// Seconds; `0.0` until the backend knows it.
    pub duration: f64,
    pub is_playing: bool,
}

impl TransportState {
    pub fn duration_known(&self) -> bool {
        self.duration > 0.0
    }
}

pub trait VideoBackend {
    fn initialize(&mut self) -> Result<(), String>;

    fn load(&mut self, path: &Path) -> Result<(), String>;

    fn play(&mut self);

    fn pause(&mut self);

    fn stop(&mut self);

    fn seek(&mut self, delta_seconds: f64);

    fn set_volume(&mut self, percent: f32);

    fn update_state(&mut self) -> TransportState;

    /// Edge-triggered: `true` once per newly decoded frame.
    fn take_new_frame(&mut self) -> bool;

    fn render(&mut self, viewport: Viewport);

    /// GPU objects were destroyed by another process; the next
    /// [`Self::initialize`] must recreate them.
    fn invalidate_gpu_resources(&mut self);
}

/// What the overlay should show. Rendering it is the compositor's job.
#[derive(Clone, Debug, PartialEq)]
pub enum UiView {
    Browser {
        playlists: Vec<String>,
        selected: usize,
        now_playing: Option<String>,
    },
    Settings {
        items: Vec<(String, String)>,
        selected: usize,
    },
    GameBrowser {
        entries: Vec<String>,
        selected: usize,
        filter: String,
    },
    Keyboard {
        text: String,
        keys: Vec<String>,
        selected: usize,
    },
}

pub trait UiCompositor {
    fn initialize(&mut self) -> Result<(), String>;

    fn render(&mut self, view: &UiView, viewport: Viewport, opacity: f32);

    /// Full-screen bezel with a transparent center, drawn last.
    fn render_bezel(&mut self, screen: Resolution);

    fn invalidate_gpu_resources(&mut self);
}

pub trait RenderContext {
    fn make_current(&mut self) -> Result<(), String>;

    fn clear_black(&mut self);

    fn swap_buffers(&mut self) -> Result<(), String>;
}
