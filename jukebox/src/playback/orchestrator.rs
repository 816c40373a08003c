//! The playback/UI state machine.
//!
//! The orchestrator never touches the display. Each [`Orchestrator::tick`]
//! polls the video transport, applies input, advances fades and guards, and
//! returns a [`FramePlan`] describing what the runtime should composite plus
//! any [`Request`]s that need the runtime's resources (mode changes, game
//! launches, persistence).

use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::auto_advance::AUTO_ADVANCE_LEAD_SECONDS;
use super::fade::Ramp;
use super::input::{Action, InputEvent};
use super::library::{GameEntry, Library};
use super::menu::{
    BrowserEntry, GameBrowser, Key, KeyOutcome, Overlay, SETTINGS_ITEMS,
    SettingsItem, SettingsMenu, VirtualKeyboard, keyboard_keys, wrap_index,
};
use super::producers::{TransportState, UiView, VideoBackend};
use super::state::{IntroPhase, PlaybackSessionState, UiFade};
use crate::config::Timings;
use crate::display::DisplayMode;

pub const DEFAULT_VOLUME: f32 = 100.0;
pub const VOLUME_STEP: f32 = 5.0;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    BootIntro(IntroPhase),
    Idle,
    VideoActive { master_shuffle: bool },
    PlaylistSwitching,
    SettingsMenu { game_browser: bool },
    VirtualKeyboard,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UiLayer {
    pub view: UiView,
    pub opacity: f32,
}

/// What to composite this tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FramePlan {
    pub show_video: bool,
    /// The video backend produced a frame since the last tick.
    pub new_video_frame: bool,
    pub ui: Option<UiLayer>,
    /// When non-zero, present this many black frames instead of content.
    pub black_frames: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    ApplyDisplayMode(DisplayMode),
    SaveSettings,
    LaunchGame(GameEntry),
    Quit,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickOutcome {
    pub frame: FramePlan,
    pub requests: Vec<Request>,
}

pub struct Orchestrator {
    session: PlaybackSessionState,
    library: Library,
    timings: Timings,
    display_mode: DisplayMode,
    volume: f32,
    intro_video: Option<PathBuf>,
    intro_frame_seen: bool,
    carried_frame: bool,
    black_frames_pending: u32,
    overlay: Overlay,
    browser_selected: usize,
    settings_menu: SettingsMenu,
    game_browser: GameBrowser,
    keyboard: VirtualKeyboard,
    pending_load: Option<(usize, usize)>,
    rng: StdRng,
    sleep: fn(Duration),
    running: bool,
}

impl Orchestrator {
    pub fn new(library: Library, timings: Timings) -> Self {
        Self {
            session: PlaybackSessionState::default(),
            library: library.with_master_shuffle(),
            timings,
            display_mode: DisplayMode::default(),
            volume: DEFAULT_VOLUME,
            intro_video: None,
            intro_frame_seen: false,
            carried_frame: false,
            black_frames_pending: 0,
            overlay: Overlay::Browser,
            browser_selected: 0,
            settings_menu: SettingsMenu::default(),
            game_browser: GameBrowser::default(),
            keyboard: VirtualKeyboard::default(),
            pending_load: None,
            rng: StdRng::from_os_rng(),
            sleep: std::thread::sleep,
            running: true,
        }
    }

    pub fn with_display_mode(mut self, display_mode: DisplayMode) -> Self {
        self.display_mode = display_mode;
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 100.0);
        self
    }

    pub fn with_intro_video(mut self, path: Option<PathBuf>) -> Self {
        self.intro_video = path;
        self
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Replaces the sleep used while waiting for the transport to settle.
    pub fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn session(&self) -> &PlaybackSessionState {
        &self.session
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    /// Used when the settings file changes underneath us.
    pub fn set_display_mode(&mut self, display_mode: DisplayMode) {
        self.display_mode = display_mode;
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> Mode {
        if self.session.showing_intro {
            return Mode::BootIntro(self.session.intro_phase());
        }
        if self.session.is_switching() {
            return Mode::PlaylistSwitching;
        }
        match self.overlay {
            Overlay::Settings => Mode::SettingsMenu {
                game_browser: false,
            },
            Overlay::GameBrowser => Mode::SettingsMenu { game_browser: true },
            Overlay::Keyboard => Mode::VirtualKeyboard,
            Overlay::Browser if self.session.video_active => {
                Mode::VideoActive {
                    master_shuffle: self.session.master_shuffle_active,
                }
            }
            Overlay::Browser => Mode::Idle,
        }
    }

    /// Starts the boot intro. The intro flag is raised before the load so
    /// nothing renders the overlay while it is in flight. Returns `false`
    /// when there is no intro to play.
    pub fn begin_intro(
        &mut self,
        now: Instant,
        video: &mut dyn VideoBackend,
    ) -> bool {
        self.session.showing_intro = true;

        let Some(path) = self.intro_video.clone() else {
            info!("no intro video configured");
            self.finish_intro(now, video);
            return false;
        };

        if let Err(err) = video.load(&path) {
            warn!("failed to load intro '{}': {}", path.display(), err);
            self.finish_intro(now, video);
            return false;
        }

        video.set_volume(self.volume);
        video.play();
        info!("intro '{}' loading", path.display());
        true
    }

    /// Blocks until the intro is playing and has produced a frame, polling at
    /// the configured interval. Gives up after the configured timeout and
    /// skips the intro.
    pub fn wait_for_intro_ready(
        &mut self,
        video: &mut dyn VideoBackend,
    ) -> bool {
        if !self.session.showing_intro || self.session.intro_complete {
            return false;
        }

        for attempt in 0..self.timings.intro_poll_attempts() {
            let transport = video.update_state();
            if video.take_new_frame() {
                self.intro_frame_seen = true;
            }
            if transport.is_playing && self.intro_frame_seen {
                self.session.intro_ready = true;
                self.carried_frame = true;
                debug!("intro ready after {} polls", attempt + 1);
                return true;
            }
            (self.sleep)(self.timings.intro_poll_interval());
        }

        warn!(
            "intro not ready after {:?}, skipping",
            self.timings.intro_ready_timeout()
        );
        self.finish_intro(Instant::now(), video);
        false
    }

    pub fn skip_intro(&mut self, now: Instant, video: &mut dyn VideoBackend) {
        if self.session.showing_intro && !self.session.intro_complete {
            self.finish_intro(now, video);
        }
    }

    pub fn tick(
        &mut self,
        now: Instant,
        events: &[InputEvent],
        video: &mut dyn VideoBackend,
    ) -> TickOutcome {
        let transport = video.update_state();
        let fresh =
            video.take_new_frame() || std::mem::take(&mut self.carried_frame);

        if self.session.showing_intro {
            self.tick_intro(now, &transport, fresh, video);
        } else {
            self.tick_playback(now, &transport, video);
        }

        let mut requests = Vec::new();
        for event in events.iter().filter(|event| event.pressed) {
            self.handle_event(now, *event, video, &mut requests);
        }

        self.update_fades(now, video);

        TickOutcome {
            frame: self.plan(now, fresh),
            requests,
        }
    }

    /// Stops the active video, e.g. before handing the display to a game.
    pub fn stop_playback(&mut self, video: &mut dyn VideoBackend) {
        if !self.session.video_active {
            return;
        }
        self.stop_and_settle(video);
        self.session.video_active = false;
        self.session.playback_started = false;
        self.session.master_shuffle_active = false;
        self.session.paused = false;
        self.session.ui_visible_while_playing = true;
        self.session.ui_fade = None;
        self.session.switch_guard.finish();
        self.session.auto_advance.clear();
        self.pending_load = None;
        video.set_volume(self.volume);
    }

    pub fn view(&self) -> UiView {
        match self.overlay {
            Overlay::Browser => UiView::Browser {
                playlists: self
                    .library
                    .playlists
                    .iter()
                    .map(|playlist| playlist.name.clone())
                    .collect(),
                selected: self.browser_selected,
                now_playing: self.now_playing_title(),
            },
            Overlay::Settings => UiView::Settings {
                items: SETTINGS_ITEMS
                    .iter()
                    .map(|item| self.settings_row(*item))
                    .collect(),
                selected: self.settings_menu.selected(),
            },
            Overlay::GameBrowser => {
                let games = &self.library.games;
                let filter = self.game_browser.filter();
                UiView::GameBrowser {
                    entries: self
                        .game_browser
                        .entries(games)
                        .into_iter()
                        .map(|entry| match entry {
                            BrowserEntry::Search if filter.is_empty() => {
                                "Search".to_string()
                            }
                            BrowserEntry::Search => {
                                format!("Search: {}", filter)
                            }
                            BrowserEntry::Game(index) => {
                                games[index].name.clone()
                            }
                        })
                        .collect(),
                    selected: self.game_browser.selected(),
                    filter: filter.to_string(),
                }
            }
            Overlay::Keyboard => UiView::Keyboard {
                text: self.keyboard.text().to_string(),
                keys: keyboard_keys().into_iter().map(Key::label).collect(),
                selected: self.keyboard.selected(),
            },
        }
    }

    fn tick_intro(
        &mut self,
        now: Instant,
        transport: &TransportState,
        fresh: bool,
        video: &mut dyn VideoBackend,
    ) {
        if fresh {
            self.intro_frame_seen = true;
        }
        if !self.session.intro_ready
            && transport.is_playing
            && self.intro_frame_seen
        {
            self.session.intro_ready = true;
        }

        if self.session.intro_ready
            && self.session.intro_fade_out.is_none()
            && transport.duration_known()
        {
            let near_end = transport.position
                >= transport.duration
                    - self.timings.intro_end_threshold_seconds();
            if near_end || !transport.is_playing {
                info!("intro finished at {:.2}s", transport.position);
                self.begin_intro_fade_out(now);
            }
        }

        if let Some(ramp) = self.session.intro_fade_out {
            video.set_volume(ramp.value_at(now));
            if ramp.is_complete(now) {
                self.finish_intro(now, video);
            }
        }
    }

    fn begin_intro_fade_out(&mut self, now: Instant) {
        self.session.intro_fade_out = Some(Ramp::new(
            now,
            self.volume,
            0.0,
            self.timings.intro_fade_out(),
        ));
    }

    fn finish_intro(&mut self, now: Instant, video: &mut dyn VideoBackend) {
        self.stop_and_settle(video);
        video.set_volume(self.volume);
        self.session.intro_fade_out = None;
        self.session.intro_complete = true;
        self.session.showing_intro = false;
        self.black_frames_pending = self.timings.intro_black_frames;
        self.session.ui_fade_in =
            Some(Ramp::new(now, 0.0, 1.0, self.timings.ui_fade_in()));
        info!("intro complete");
    }

    fn tick_playback(
        &mut self,
        now: Instant,
        transport: &TransportState,
        video: &mut dyn VideoBackend,
    ) {
        if self.session.video_active
            && !self.session.playback_started
            && transport.is_playing
            && transport.duration_known()
            && transport.position
                < transport.duration - AUTO_ADVANCE_LEAD_SECONDS
        {
            self.session.playback_started = true;
            if self.session.is_switching() {
                debug!("playlist switch complete");
            }
            self.session.switch_guard.finish();
            self.pending_load = None;
        }

        let timeout = self.timings.switch_timeout();
        if self.session.switch_guard.has_expired(now, timeout) {
            warn!("playlist switch stuck for over {:?}, retrying", timeout);
            self.session.switch_guard.finish();
            self.stop_and_settle(video);
            if let Some((playlist, item)) = self.pending_load.take() {
                self.start_item(playlist, item, video);
            }
            return;
        }

        if self.session.video_active
            && self.session.auto_advance.should_advance(
                transport,
                self.session.playback_started,
                self.session.item_index,
            )
        {
            debug!("item {} reached its end", self.session.item_index);
            self.skip(1, video);
        }
    }

    fn update_fades(&mut self, now: Instant, video: &mut dyn VideoBackend) {
        if let Some(fade) = self.session.ui_fade {
            video.set_volume(fade.volume.value_at(now));
            if fade.volume.is_complete(now) {
                self.session.ui_fade = None;
            }
        }
        if self
            .session
            .ui_fade_in
            .is_some_and(|ramp| ramp.is_complete(now))
        {
            self.session.ui_fade_in = None;
        }
    }

    fn plan(&mut self, now: Instant, fresh: bool) -> FramePlan {
        let black_frames = std::mem::take(&mut self.black_frames_pending);
        if black_frames > 0 {
            return FramePlan {
                black_frames,
                ..FramePlan::default()
            };
        }

        if self.session.showing_intro {
            return FramePlan {
                show_video: self.session.intro_ready,
                new_video_frame: fresh,
                ui: None,
                black_frames: 0,
            };
        }

        let opacity = self.overlay_opacity(now);
        let ui = (opacity > 0.0).then(|| UiLayer {
            view: self.view(),
            opacity,
        });

        FramePlan {
            show_video: self.session.video_active,
            new_video_frame: fresh && self.session.video_active,
            ui,
            black_frames: 0,
        }
    }

    fn handle_event(
        &mut self,
        now: Instant,
        event: InputEvent,
        video: &mut dyn VideoBackend,
        requests: &mut Vec<Request>,
    ) {
        if event.action == Action::Quit {
            info!("quit requested");
            self.running = false;
            requests.push(Request::Quit);
            return;
        }

        if self.session.showing_intro {
            if self.session.intro_fade_out.is_none() {
                info!("intro skipped");
                self.begin_intro_fade_out(now);
            }
            return;
        }

        match self.overlay {
            Overlay::Keyboard => self.handle_keyboard(event),
            Overlay::GameBrowser => self.handle_game_browser(event, requests),
            Overlay::Settings => self.handle_settings(event, video, requests),
            Overlay::Browser if self.overlay_hidden() => {
                self.handle_hidden(now, event, video)
            }
            Overlay::Browser => self.handle_browser(now, event, video),
        }
    }

    fn handle_browser(
        &mut self,
        now: Instant,
        event: InputEvent,
        video: &mut dyn VideoBackend,
    ) {
        match event.action {
            Action::Next | Action::Prev | Action::Rotate => {
                self.browser_selected = wrap_index(
                    self.browser_selected,
                    step(&event),
                    self.library.playlists.len(),
                );
            }
            Action::Select => {
                self.select_playlist(now, self.browser_selected, video)
            }
            Action::Menu => {
                self.settings_menu.reset();
                self.overlay = Overlay::Settings;
            }
            Action::PlayPause => self.toggle_pause(video),
            Action::Seek => self.seek(event.delta, video),
            Action::Quit => {}
        }
    }

    fn handle_hidden(
        &mut self,
        now: Instant,
        event: InputEvent,
        video: &mut dyn VideoBackend,
    ) {
        match event.action {
            Action::Select | Action::Menu => self.show_overlay(now),
            Action::Next => self.skip(1, video),
            Action::Prev => self.skip(-1, video),
            Action::Rotate if event.delta != 0 => {
                self.skip(event.delta.signum(), video)
            }
            Action::Seek => self.seek(event.delta, video),
            Action::PlayPause => self.toggle_pause(video),
            Action::Rotate | Action::Quit => {}
        }
    }

    fn handle_settings(
        &mut self,
        event: InputEvent,
        video: &mut dyn VideoBackend,
        requests: &mut Vec<Request>,
    ) {
        let selected = self.settings_menu.selected_item();
        match event.action {
            Action::Rotate if selected == SettingsItem::Volume => {
                self.adjust_volume(event.delta, video, requests)
            }
            Action::Next | Action::Prev | Action::Rotate => {
                self.settings_menu.move_by(step(&event))
            }
            Action::Select => match selected {
                SettingsItem::DisplayMode => {
                    self.display_mode = self.display_mode.toggled();
                    info!("display mode -> {}", self.display_mode.label());
                    requests.push(Request::ApplyDisplayMode(self.display_mode));
                    requests.push(Request::SaveSettings);
                }
                SettingsItem::Volume => {}
                SettingsItem::Games => self.overlay = Overlay::GameBrowser,
                SettingsItem::Back => self.overlay = Overlay::Browser,
            },
            Action::Menu => self.overlay = Overlay::Browser,
            Action::PlayPause => self.toggle_pause(video),
            Action::Seek => self.seek(event.delta, video),
            Action::Quit => {}
        }
    }

    fn handle_game_browser(
        &mut self,
        event: InputEvent,
        requests: &mut Vec<Request>,
    ) {
        match event.action {
            Action::Next | Action::Prev | Action::Rotate => {
                self.game_browser.move_by(step(&event), &self.library.games)
            }
            Action::Select => {
                match self.game_browser.selected_entry(&self.library.games) {
                    BrowserEntry::Search => {
                        self.keyboard =
                            VirtualKeyboard::open(self.game_browser.filter());
                        self.overlay = Overlay::Keyboard;
                    }
                    BrowserEntry::Game(index) => {
                        if let Some(game) = self.library.games.get(index) {
                            info!("launching '{}'", game.name);
                            requests.push(Request::LaunchGame(game.clone()));
                        }
                    }
                }
            }
            Action::Menu => self.overlay = Overlay::Settings,
            _ => {}
        }
    }

    fn handle_keyboard(&mut self, event: InputEvent) {
        match event.action {
            Action::Next | Action::Prev | Action::Rotate => {
                self.keyboard.move_by(step(&event))
            }
            Action::Select => {
                if self.keyboard.press() == KeyOutcome::Confirmed {
                    let filter = self.keyboard.text().trim().to_string();
                    debug!("game filter '{}'", filter);
                    self.game_browser.set_filter(filter);
                    self.overlay = Overlay::GameBrowser;
                }
            }
            Action::Menu => self.overlay = Overlay::GameBrowser,
            _ => {}
        }
    }

    fn select_playlist(
        &mut self,
        now: Instant,
        index: usize,
        video: &mut dyn VideoBackend,
    ) {
        if self.is_playing_playlist(index) {
            self.start_ui_fade(now, false);
            return;
        }

        if !self.session.switch_guard.try_begin(now) {
            debug!("switch in progress, ignoring selection of {}", index);
            return;
        }

        let Some(playlist) = self.library.playlists.get(index) else {
            self.session.switch_guard.finish();
            return;
        };
        let shuffle = playlist.is_master_shuffle();

        let target = if shuffle {
            let current = self
                .session
                .video_active
                .then_some((
                    self.session.playlist_index,
                    self.session.item_index,
                ));
            self.library.random_item(&mut self.rng, current)
        } else if playlist.items.is_empty() {
            None
        } else {
            Some((index, 0))
        };

        let Some((playlist, item)) = target else {
            warn!("nothing to play in playlist {}", index);
            self.session.switch_guard.finish();
            return;
        };

        if self.start_item(playlist, item, video) {
            self.session.master_shuffle_active = shuffle;
            self.session.auto_advance.clear();
            self.start_ui_fade(now, false);
        }
    }

    fn is_playing_playlist(&self, index: usize) -> bool {
        if !self.session.video_active {
            return false;
        }
        if self.session.master_shuffle_active {
            index == 0
        } else {
            index == self.session.playlist_index
        }
    }

    /// Loads and plays one item. Load failure clears the switch guard so the
    /// next selection can retry.
    fn start_item(
        &mut self,
        playlist: usize,
        item: usize,
        video: &mut dyn VideoBackend,
    ) -> bool {
        let Some(entry) = self.library.item(playlist, item) else {
            warn!("no item {} in playlist {}", item, playlist);
            return false;
        };
        let path = entry.path.clone();
        let title = entry.title.clone();

        if self.session.video_active {
            self.stop_and_settle(video);
        }

        self.session.playlist_index = playlist;
        self.session.item_index = item;
        self.session.playback_started = false;
        self.session.paused = false;
        self.pending_load = Some((playlist, item));

        if let Err(err) = video.load(&path) {
            warn!("failed to load '{}': {}", path.display(), err);
            self.session.video_active = false;
            self.session.ui_visible_while_playing = true;
            self.session.ui_fade = None;
            self.session.switch_guard.finish();
            self.pending_load = None;
            return false;
        }

        self.session.video_active = true;
        video.set_volume(self.effective_volume());
        video.play();
        info!("playing '{}'", title);
        true
    }

    fn next_target(&mut self, delta: i32) -> Option<(usize, usize)> {
        if self.session.master_shuffle_active {
            let current =
                (self.session.playlist_index, self.session.item_index);
            return self.library.random_item(&mut self.rng, Some(current));
        }
        let playlist = self.session.playlist_index;
        let len = self.library.playlists.get(playlist)?.items.len();
        if len == 0 {
            return None;
        }
        Some((playlist, wrap_index(self.session.item_index, delta, len)))
    }

    fn skip(&mut self, delta: i32, video: &mut dyn VideoBackend) {
        if let Some((playlist, item)) = self.next_target(delta) {
            self.start_item(playlist, item, video);
        }
    }

    fn stop_and_settle(&mut self, video: &mut dyn VideoBackend) -> bool {
        video.stop();
        for _ in 0..self.timings.stop_settle_attempts {
            if !video.update_state().is_playing {
                return true;
            }
            (self.sleep)(self.timings.stop_settle_interval());
        }
        warn!(
            "video still playing after {} stop checks",
            self.timings.stop_settle_attempts
        );
        false
    }

    fn toggle_pause(&mut self, video: &mut dyn VideoBackend) {
        if !self.session.video_active {
            return;
        }
        if self.session.paused {
            video.play();
        } else {
            video.pause();
        }
        self.session.paused = !self.session.paused;
    }

    fn seek(&mut self, delta: i32, video: &mut dyn VideoBackend) {
        if self.session.video_active && delta != 0 {
            video.seek(delta as f64);
        }
    }

    fn adjust_volume(
        &mut self,
        steps: i32,
        video: &mut dyn VideoBackend,
        requests: &mut Vec<Request>,
    ) {
        let volume =
            (self.volume + steps as f32 * VOLUME_STEP).clamp(0.0, 100.0);
        if volume == self.volume {
            return;
        }
        self.volume = volume;
        self.session.ui_fade = None;
        video.set_volume(self.effective_volume());
        requests.push(Request::SaveSettings);
    }

    fn show_overlay(&mut self, now: Instant) {
        self.overlay = Overlay::Browser;
        self.browser_selected = if self.session.master_shuffle_active {
            0
        } else {
            self.session.playlist_index
        };
        self.start_ui_fade(now, true);
    }

    /// Ramps volume and overlay opacity together. A fade started mid-fade
    /// continues from the current values.
    fn start_ui_fade(&mut self, now: Instant, visible: bool) {
        if !self.session.video_active {
            return;
        }
        let from_volume = self.current_volume(now);
        let from_opacity = self.overlay_opacity(now);

        self.session.ui_visible_while_playing = visible;
        let to_volume = self.effective_volume();
        let to_opacity = if visible { 1.0 } else { 0.0 };
        let duration = self.timings.ui_fade();

        self.session.ui_fade = Some(UiFade {
            volume: Ramp::new(now, from_volume, to_volume, duration),
            opacity: Ramp::new(now, from_opacity, to_opacity, duration),
            to_visible: visible,
        });
    }

    fn overlay_hidden(&self) -> bool {
        self.session.video_active && !self.session.ui_visible_while_playing
    }

    fn effective_volume(&self) -> f32 {
        if self.session.video_active && self.session.ui_visible_while_playing {
            self.volume * self.timings.dimmed_volume_fraction
        } else {
            self.volume
        }
    }

    fn current_volume(&self, now: Instant) -> f32 {
        match self.session.ui_fade {
            Some(fade) => fade.volume.value_at(now),
            None => self.effective_volume(),
        }
    }

    fn overlay_opacity(&self, now: Instant) -> f32 {
        if self.session.video_active {
            if let Some(fade) = self.session.ui_fade {
                return fade.opacity.value_at(now);
            }
            return if self.session.ui_visible_while_playing {
                1.0
            } else {
                0.0
            };
        }
        self.session
            .ui_fade_in
            .map_or(1.0, |ramp| ramp.value_at(now))
    }

    fn now_playing_title(&self) -> Option<String> {
        if !self.session.video_active {
            return None;
        }
        self.library
            .item(self.session.playlist_index, self.session.item_index)
            .map(|item| item.title.clone())
    }

    fn settings_row(&self, item: SettingsItem) -> (String, String) {
        match item {
            SettingsItem::DisplayMode => (
                "Display Mode".to_string(),
                self.display_mode.label().to_string(),
            ),
            SettingsItem::Volume => {
                ("Volume".to_string(), format!("{:.0}%", self.volume))
            }
            SettingsItem::Games => (
                "Games".to_string(),
                self.library.games.len().to_string(),
            ),
            SettingsItem::Back => ("Back".to_string(), String::new()),
        }
    }
}

fn step(event: &InputEvent) -> i32 {
    match event.action {
        Action::Next => 1,
        Action::Prev => -1,
        Action::Rotate => event.delta,
        _ => 0,
    }
}
