//! The single-threaded main loop. One tick: drain commands, recover the
//! display if another process had it, poll input, advance the orchestrator,
//! composite and present.

use std::path::PathBuf;
use std::time::Instant;

use log::{debug, error, info, warn};

use super::events::{
    RuntimeCommand, RuntimeCommandReceiver, RuntimeEvent, RuntimeEventSender,
};
use super::frame_clock::FrameClock;
use super::launcher::GameLauncher;
use super::settings::Settings;
use super::storage;
use crate::core::error::{InitError, InitStage};
use crate::display::{
    DisplayDevice, DisplayMode, ModeInfo, Resolution, ResolutionPolicy,
    Viewport, viewport,
};
use crate::playback::input::InputSource;
use crate::playback::library::GameEntry;
use crate::playback::orchestrator::{FramePlan, Orchestrator, Request};
use crate::playback::producers::{RenderContext, UiCompositor, VideoBackend};
use crate::render::{FramePresenter, GpuSurface};

const STATS_LOG_INTERVAL: u64 = 600;

pub struct Collaborators {
    pub video: Box<dyn VideoBackend>,
    pub ui: Box<dyn UiCompositor>,
    pub render_context: Box<dyn RenderContext>,
    pub input: Box<dyn InputSource>,
    pub launcher: Box<dyn GameLauncher>,
}

/// Builds a render surface for a new resolution after a mode change.
pub type SurfaceFactory<S> = Box<dyn FnMut(Resolution) -> Result<S, String>>;

pub struct Runtime<D: DisplayDevice, S: GpuSurface> {
    presenter: FramePresenter<D, S>,
    surface_factory: Option<SurfaceFactory<S>>,
    orchestrator: Orchestrator,
    collaborators: Collaborators,
    policy: ResolutionPolicy,
    viewport: Viewport,
    clock: FrameClock,
    commands: Option<RuntimeCommandReceiver>,
    events: Option<RuntimeEventSender>,
    settings_dir: Option<PathBuf>,
    producers_ready: bool,
    reset_display: bool,
    frames: u64,
    max_frames: Option<u64>,
}

impl<D: DisplayDevice, S: GpuSurface> Runtime<D, S> {
    /// Programs the initial mode and brings up the render context and
    /// producers. Any failure here is fatal for the kiosk.
    pub fn new(
        mut presenter: FramePresenter<D, S>,
        orchestrator: Orchestrator,
        mut collaborators: Collaborators,
        policy: ResolutionPolicy,
    ) -> Result<Self, InitError> {
        let mode = presenter
            .display_mut()
            .select_mode(orchestrator.display_mode(), &policy)
            .map_err(|err| InitError::new(InitStage::Mode, err.to_string()))?;

        let surface = presenter.surface().resolution();
        if surface != mode.resolution {
            return Err(InitError::new(
                InitStage::GpuSurface,
                format!(
                    "surface is {} but the selected mode is {}",
                    surface, mode.resolution
                ),
            ));
        }

        collaborators
            .render_context
            .make_current()
            .map_err(|err| InitError::new(InitStage::RenderContext, err))?;

        collaborators
            .video
            .initialize()
            .map_err(|err| InitError::new(InitStage::Producers, err))?;
        collaborators
            .ui
            .initialize()
            .map_err(|err| InitError::new(InitStage::Producers, err))?;

        let viewport = viewport::content_viewport(
            orchestrator.display_mode(),
            mode.resolution,
        );

        Ok(Self {
            presenter,
            surface_factory: None,
            orchestrator,
            collaborators,
            policy,
            viewport,
            clock: FrameClock::new(60.0),
            commands: None,
            events: None,
            settings_dir: None,
            producers_ready: true,
            reset_display: false,
            frames: 0,
            max_frames: None,
        })
    }

    /// Lets mode changes move to a resolution other than the current
    /// surface's. Without a factory the display stays at a mode of the
    /// surface's size.
    pub fn with_surface_factory(
        mut self,
        factory: impl FnMut(Resolution) -> Result<S, String> + 'static,
    ) -> Self {
        self.surface_factory = Some(Box::new(factory));
        self
    }

    pub fn with_fps(mut self, fps: f32) -> Self {
        self.clock = FrameClock::new(fps);
        self
    }

    pub fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn with_commands(mut self, commands: RuntimeCommandReceiver) -> Self {
        self.commands = Some(commands);
        self
    }

    pub fn with_events(mut self, events: RuntimeEventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Where `SaveSettings` requests are written. Without one, settings
    /// changes only live for the session.
    pub fn with_settings_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.settings_dir = dir;
        self
    }

    pub fn presenter(&self) -> &FramePresenter<D, S> {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut FramePresenter<D, S> {
        &mut self.presenter
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_running(&self) -> bool {
        self.orchestrator.is_running()
            && self.max_frames.is_none_or(|max| self.frames < max)
    }

    /// Marks the display as lent out; recovery runs on the next tick.
    pub fn request_display_reset(&mut self) {
        self.reset_display = true;
    }

    /// Plays the intro and blocks until it shows its first frame (bounded).
    pub fn start(&mut self, skip_intro: bool) {
        let now = Instant::now();
        let video = self.collaborators.video.as_mut();
        if skip_intro {
            self.orchestrator.begin_intro(now, video);
            self.orchestrator.skip_intro(now, video);
            return;
        }
        if self.orchestrator.begin_intro(now, video) {
            self.orchestrator.wait_for_intro_ready(video);
        }
    }

    pub fn run(&mut self) {
        info!("entering main loop at {:.0} fps", self.clock.fps());

        while self.is_running() {
            let now = Instant::now();
            let pacing = self.clock.tick(now);
            if !pacing.should_render {
                std::thread::sleep(self.clock.time_until_next(now));
                continue;
            }
            if pacing.frames_skipped > 0 {
                debug!("fell behind by {} frames", pacing.frames_skipped);
            }

            self.tick(now);

            if self.frames % STATS_LOG_INTERVAL == 0 {
                info!(
                    "{} frames, {:.1} fps avg, {} skipped",
                    self.frames,
                    self.clock.average_fps(),
                    self.clock.skipped_total()
                );
            }
        }

        info!("main loop stopped after {} frames", self.frames);
        self.orchestrator.stop_playback(self.collaborators.video.as_mut());
        self.emit(RuntimeEvent::Stopped);
    }

    /// One iteration of the main loop, exposed so it can be driven with
    /// synthetic time.
    pub fn tick(&mut self, now: Instant) {
        self.drain_commands();

        if self.reset_display {
            self.on_external_handoff_return();
        }
        if !self.producers_ready {
            self.initialize_producers();
        }

        let events = self.collaborators.input.poll();
        let outcome = self.orchestrator.tick(
            now,
            &events,
            self.collaborators.video.as_mut(),
        );

        for request in outcome.requests {
            self.handle_request(request);
        }

        self.render(&outcome.frame);
        self.frames += 1;
    }

    /// Recovers after another process had the display: reacquire master,
    /// restore the mode, reset presentation, show one black frame, and have
    /// the producers rebuild their GPU state.
    pub fn on_external_handoff_return(&mut self) {
        info!("recovering display after external handoff");

        if let Err(err) = self.presenter.display_mut().acquire_master() {
            warn!("cannot reacquire display master yet: {}", err);
            return;
        }
        self.reset_display = false;

        let display_mode = self.orchestrator.display_mode();
        match self
            .presenter
            .display_mut()
            .restore_mode(display_mode, &self.policy)
        {
            Ok(mode) => {
                let mode = self.fit_surface(mode);
                self.viewport =
                    viewport::content_viewport(display_mode, mode.resolution);
            }
            Err(err) => warn!("failed to restore display mode: {}", err),
        }

        self.presenter.reset();

        if let Err(err) = self.collaborators.render_context.make_current() {
            error!("render context lost after handoff: {}", err);
        }
        self.present_black(1);

        self.collaborators.video.invalidate_gpu_resources();
        self.collaborators.ui.invalidate_gpu_resources();
        self.producers_ready = false;
        self.emit(RuntimeEvent::DisplayReset);
    }

    pub fn apply_display_mode(&mut self, display_mode: DisplayMode) {
        self.orchestrator.set_display_mode(display_mode);

        match self
            .presenter
            .display_mut()
            .select_mode(display_mode, &self.policy)
        {
            Ok(mode) => {
                let mode = self.fit_surface(mode);
                self.viewport =
                    viewport::content_viewport(display_mode, mode.resolution);
            }
            Err(err) => {
                warn!("keeping current mode: {}", err);
                if let Some(screen) = self.presenter.display().screen_size() {
                    self.viewport =
                        viewport::content_viewport(display_mode, screen);
                }
            }
        }

        self.presenter.reset();
        self.emit(RuntimeEvent::DisplayModeApplied(display_mode));
    }

    /// Makes the render surface match `mode`, rebuilding it through the
    /// factory. If that is not possible the display goes back to a mode of
    /// the surface's size. Returns the mode that will be programmed.
    fn fit_surface(&mut self, mode: ModeInfo) -> ModeInfo {
        let current = self.presenter.surface().resolution();
        if current == mode.resolution {
            return mode;
        }

        match self.surface_factory.as_mut() {
            Some(factory) => match factory(mode.resolution) {
                Ok(surface) => {
                    self.presenter.replace_surface(surface);
                    if let Err(err) =
                        self.collaborators.render_context.make_current()
                    {
                        error!("render context lost on new surface: {}", err);
                    }
                    return mode;
                }
                Err(err) => warn!(
                    "cannot create {} surface: {}",
                    mode.resolution, err
                ),
            },
            None => warn!(
                "no surface factory; cannot resize {} surface to {}",
                current, mode.resolution
            ),
        }

        match self.presenter.display_mut().select_exact(current) {
            Ok(fallback) => fallback,
            Err(err) => {
                error!("no mode matches the {} surface: {}", current, err);
                mode
            }
        }
    }

    fn drain_commands(&mut self) {
        let Some(commands) = &self.commands else {
            return;
        };
        let pending: Vec<RuntimeCommand> = commands.try_iter().collect();

        for command in pending {
            match command {
                RuntimeCommand::DisplayModeChanged(mode) => {
                    if mode != self.orchestrator.display_mode() {
                        info!("display mode changed externally");
                        self.apply_display_mode(mode);
                    }
                }
                RuntimeCommand::Quit => {
                    self.max_frames = Some(self.frames);
                }
            }
        }
    }

    fn handle_request(&mut self, request: Request) {
        match request {
            Request::ApplyDisplayMode(mode) => self.apply_display_mode(mode),
            Request::SaveSettings => self.save_settings(),
            Request::LaunchGame(game) => self.launch_game(&game),
            Request::Quit => {}
        }
    }

    fn save_settings(&self) {
        let Some(dir) = &self.settings_dir else {
            return;
        };
        let settings = Settings::new(
            self.orchestrator.display_mode(),
            self.orchestrator.volume(),
        );
        if let Err(err) = storage::save_settings(dir, &settings) {
            warn!("failed to save settings: {}", err);
        }
    }

    fn launch_game(&mut self, game: &GameEntry) {
        self.orchestrator
            .stop_playback(self.collaborators.video.as_mut());

        if let Err(err) = self.presenter.display_mut().release_master() {
            warn!("failed to release display master: {}", err);
        }

        match self.collaborators.launcher.launch(game) {
            Ok(()) => info!("'{}' exited", game.name),
            Err(err) => warn!("game '{}' failed: {}", game.name, err),
        }

        self.emit(RuntimeEvent::GameExited(game.name.clone()));
        self.reset_display = true;
    }

    fn initialize_producers(&mut self) {
        let video = self.collaborators.video.initialize();
        let ui = self.collaborators.ui.initialize();
        match (video, ui) {
            (Ok(()), Ok(())) => {
                debug!("render producers reinitialized");
                self.producers_ready = true;
            }
            (Err(err), _) | (_, Err(err)) => {
                warn!("render producer init failed, retrying: {}", err);
            }
        }
    }

    fn render(&mut self, plan: &FramePlan) {
        if plan.black_frames > 0 {
            self.present_black(plan.black_frames);
            return;
        }

        // Without new content the previous frame simply stays on screen.
        let needs_frame = plan.new_video_frame
            || plan.ui.is_some()
            || self.presenter.state().is_first_frame();
        if !needs_frame {
            return;
        }

        let context = self.collaborators.render_context.as_mut();
        context.clear_black();

        if plan.show_video && self.producers_ready {
            self.collaborators.video.render(self.viewport);
        }
        if let Some(layer) = &plan.ui {
            self.collaborators
                .ui
                .render(&layer.view, self.viewport, layer.opacity);
        }
        if self.orchestrator.display_mode() == DisplayMode::ModernTv {
            let screen = self.screen_size();
            self.collaborators.ui.render_bezel(screen);
        }

        self.swap_and_present();
    }

    fn present_black(&mut self, count: u32) {
        for _ in 0..count {
            self.collaborators.render_context.clear_black();
            self.swap_and_present();
        }
    }

    fn swap_and_present(&mut self) {
        if let Err(err) = self.collaborators.render_context.swap_buffers() {
            warn!("swap failed: {}", err);
            self.emit(RuntimeEvent::FrameDropped(self.frames));
            return;
        }

        let event = if self.presenter.present_frame() {
            RuntimeEvent::FramePresented(self.frames)
        } else {
            RuntimeEvent::FrameDropped(self.frames)
        };
        self.emit(event);
    }

    fn screen_size(&self) -> Resolution {
        self.presenter
            .display()
            .screen_size()
            .unwrap_or_else(|| self.viewport.size())
    }

    fn emit(&self, event: RuntimeEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver only means nobody is listening.
            let _ = events.send(event);
        }
    }
}
