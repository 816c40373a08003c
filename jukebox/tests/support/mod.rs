#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use jukebox::prelude::*;

pub const FRAME: Duration = Duration::from_millis(16);

/// Hands a collaborator to the runtime while the test keeps a handle on it.
pub struct Shared<T>(pub Rc<RefCell<T>>);

impl<T> Shared<T> {
    pub fn new(inner: T) -> (Self, Rc<RefCell<T>>) {
        let rc = Rc::new(RefCell::new(inner));
        (Self(Rc::clone(&rc)), rc)
    }
}

impl VideoBackend for Shared<SimulatedVideo> {
    fn initialize(&mut self) -> Result<(), String> {
        self.0.borrow_mut().initialize()
    }

    fn load(&mut self, path: &Path) -> Result<(), String> {
        self.0.borrow_mut().load(path)
    }

    fn play(&mut self) {
        self.0.borrow_mut().play()
    }

    fn pause(&mut self) {
        self.0.borrow_mut().pause()
    }

    fn stop(&mut self) {
        self.0.borrow_mut().stop()
    }

    fn seek(&mut self, delta_seconds: f64) {
        self.0.borrow_mut().seek(delta_seconds)
    }

    fn set_volume(&mut self, percent: f32) {
        self.0.borrow_mut().set_volume(percent)
    }

    fn update_state(&mut self) -> jukebox::playback::TransportState {
        self.0.borrow_mut().update_state()
    }

    fn take_new_frame(&mut self) -> bool {
        self.0.borrow_mut().take_new_frame()
    }

    fn render(&mut self, viewport: Viewport) {
        self.0.borrow_mut().render(viewport)
    }

    fn invalidate_gpu_resources(&mut self) {
        self.0.borrow_mut().invalidate_gpu_resources()
    }
}

impl UiCompositor for Shared<SimulatedUi> {
    fn initialize(&mut self) -> Result<(), String> {
        self.0.borrow_mut().initialize()
    }

    fn render(&mut self, view: &UiView, viewport: Viewport, opacity: f32) {
        self.0.borrow_mut().render(view, viewport, opacity)
    }

    fn render_bezel(&mut self, screen: Resolution) {
        self.0.borrow_mut().render_bezel(screen)
    }

    fn invalidate_gpu_resources(&mut self) {
        self.0.borrow_mut().invalidate_gpu_resources()
    }
}

impl RenderContext for Shared<VirtualRenderContext> {
    fn make_current(&mut self) -> Result<(), String> {
        self.0.borrow_mut().make_current()
    }

    fn clear_black(&mut self) {
        self.0.borrow_mut().clear_black()
    }

    fn swap_buffers(&mut self) -> Result<(), String> {
        self.0.borrow_mut().swap_buffers()
    }
}

/// Input pushed by the test; each `poll` takes one tick's worth.
#[derive(Clone, Default)]
pub struct QueuedInput(Rc<RefCell<VecDeque<Vec<InputEvent>>>>);

impl QueuedInput {
    pub fn push(&self, events: Vec<InputEvent>) {
        self.0.borrow_mut().push_back(events);
    }
}

impl InputSource for QueuedInput {
    fn poll(&mut self) -> Vec<InputEvent> {
        self.0.borrow_mut().pop_front().unwrap_or_default()
    }
}

/// Records launched games instead of starting a process.
#[derive(Clone, Default)]
pub struct RecordingLauncher(Rc<RefCell<Vec<String>>>);

impl RecordingLauncher {
    pub fn launched(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

impl GameLauncher for RecordingLauncher {
    fn launch(&mut self, game: &GameEntry) -> Result<(), String> {
        self.0.borrow_mut().push(game.name.clone());
        Ok(())
    }
}

pub fn library() -> Library {
    let items = |dir: &str, count: usize| {
        (1..=count)
            .map(|n| PlaylistItem {
                title: format!("{} {}", dir, n),
                path: PathBuf::from(format!("/media/{}/{}.mp4", dir, n)),
            })
            .collect()
    };
    let game = |name: &str| GameEntry {
        name: name.to_string(),
        path: PathBuf::from(format!("/roms/{}", name)),
    };

    Library::new(
        vec![
            Playlist::new("Cartoons", items("toons", 3)),
            Playlist::new("Music", items("music", 2)),
        ],
        vec![game("Pinball"), game("Space Race"), game("Pong")],
    )
}

pub fn virtual_modes() -> Vec<(Resolution, bool)> {
    vec![
        (Resolution::new(1920, 1080), true),
        (Resolution::new(1280, 720), false),
        (Resolution::new(720, 480), false),
    ]
}

fn no_sleep(_: Duration) {}

pub struct Harness {
    pub runtime: Runtime<VirtualDisplay, VirtualGpu>,
    pub video: Rc<RefCell<SimulatedVideo>>,
    pub ui: Rc<RefCell<SimulatedUi>>,
    pub context: Rc<RefCell<VirtualRenderContext>>,
    pub input: QueuedInput,
    pub launcher: RecordingLauncher,
    pub now: Instant,
}

pub struct HarnessBuilder {
    display_mode: DisplayMode,
    settings_dir: Option<PathBuf>,
    commands: Option<RuntimeCommandReceiver>,
    events: Option<RuntimeEventSender>,
    video: SimulatedVideo,
    intro: Option<PathBuf>,
    modes: Vec<(Resolution, bool)>,
    resizable: bool,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            display_mode: DisplayMode::CrtNative,
            settings_dir: None,
            commands: None,
            events: None,
            video: SimulatedVideo::new(30.0).with_step(1.0 / 60.0),
            intro: None,
            modes: virtual_modes(),
            resizable: false,
        }
    }
}

impl HarnessBuilder {
    pub fn display_mode(mut self, display_mode: DisplayMode) -> Self {
        self.display_mode = display_mode;
        self
    }

    pub fn settings_dir(mut self, dir: PathBuf) -> Self {
        self.settings_dir = Some(dir);
        self
    }

    pub fn commands(mut self, commands: RuntimeCommandReceiver) -> Self {
        self.commands = Some(commands);
        self
    }

    pub fn events(mut self, events: RuntimeEventSender) -> Self {
        self.events = Some(events);
        self
    }

    pub fn video(mut self, video: SimulatedVideo) -> Self {
        self.video = video;
        self
    }

    pub fn intro(mut self, path: &str) -> Self {
        self.intro = Some(PathBuf::from(path));
        self
    }

    pub fn modes(mut self, modes: Vec<(Resolution, bool)>) -> Self {
        self.modes = modes;
        self
    }

    /// Lets the runtime rebuild the surface when a mode change alters the
    /// resolution.
    pub fn resizable(mut self) -> Self {
        self.resizable = true;
        self
    }

    pub fn build(self) -> Harness {
        let mut display = DisplayHandle::new(VirtualDisplay::new(self.modes));
        let mode = display
            .select_mode(self.display_mode, &ResolutionPolicy::default())
            .expect("virtual display has a mode");
        let presenter = FramePresenter::new(
            display,
            VirtualGpu::new(mode.resolution, 3),
        )
        .with_sleep(no_sleep);

        let orchestrator = Orchestrator::new(library(), Timings::default())
            .with_display_mode(self.display_mode)
            .with_intro_video(self.intro)
            .with_sleep(no_sleep);

        let (video_handle, video) = Shared::new(self.video);
        let (ui_handle, ui) = Shared::new(SimulatedUi::default());
        let (context_handle, context) =
            Shared::new(VirtualRenderContext::default());
        let input = QueuedInput::default();
        let launcher = RecordingLauncher::default();

        let collaborators = Collaborators {
            video: Box::new(video_handle),
            ui: Box::new(ui_handle),
            render_context: Box::new(context_handle),
            input: Box::new(input.clone()),
            launcher: Box::new(launcher.clone()),
        };

        let mut runtime = Runtime::new(
            presenter,
            orchestrator,
            collaborators,
            ResolutionPolicy::default(),
        )
        .expect("virtual runtime should start")
        .with_settings_dir(self.settings_dir);
        if self.resizable {
            runtime = runtime.with_surface_factory(|resolution| {
                Ok(VirtualGpu::new(resolution, 3))
            });
        }
        if let Some(commands) = self.commands {
            runtime = runtime.with_commands(commands);
        }
        if let Some(events) = self.events {
            runtime = runtime.with_events(events);
        }

        Harness {
            runtime,
            video,
            ui,
            context,
            input,
            launcher,
            now: Instant::now(),
        }
    }
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    /// Skips the intro and runs the first tick, which shows the black
    /// frames that follow the intro.
    pub fn started() -> Self {
        Self::builder().build().start()
    }

    pub fn start(mut self) -> Self {
        self.runtime.start(true);
        self.tick();
        self
    }

    pub fn tick(&mut self) {
        self.now += FRAME;
        self.runtime.tick(self.now);
    }

    pub fn press(&mut self, action: Action) {
        self.input.push(vec![InputEvent::press(action)]);
        self.tick();
    }

    pub fn ticks(&mut self, count: usize) {
        for _ in 0..count {
            self.tick();
        }
    }

    pub fn display(&self) -> &VirtualDisplay {
        self.runtime.presenter().display().device()
    }

    pub fn modesets(&self) -> usize {
        self.display().modeset_count()
    }

    pub fn surface_size(&self) -> Resolution {
        self.runtime.presenter().surface().resolution()
    }
}

pub fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("jukebox-tests-{}", name));
    if dir.exists() {
        std::fs::remove_dir_all(&dir).expect("clear temp dir");
    }
    dir
}
