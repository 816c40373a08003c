use super::auto_advance::AutoAdvanceGuard;
use super::fade::Ramp;
use super::switch_guard::SwitchGuard;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IntroPhase {
    Loading,
    Playing,
    FadingOut,
    Done,
}

/// Overlay fade while a video plays: output volume ramps between full and
/// dimmed while overlay opacity follows the same curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UiFade {
    pub volume: Ramp,
    pub opacity: Ramp,
    pub to_visible: bool,
}

/// Everything the orchestrator tracks about the current session. Only the
/// orchestrator mutates it.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackSessionState {
    // Boot intro
    pub showing_intro: bool,
    pub intro_ready: bool,
    pub intro_fade_out: Option<Ramp>,
    pub intro_complete: bool,

    // Active video
    pub video_active: bool,
    pub playlist_index: usize,
    pub item_index: usize,
    pub master_shuffle_active: bool,
    pub playback_started: bool,
    pub paused: bool,

    // Overlay
    pub ui_visible_while_playing: bool,
    pub ui_fade: Option<UiFade>,
    pub ui_fade_in: Option<Ramp>,

    pub switch_guard: SwitchGuard,
    pub auto_advance: AutoAdvanceGuard,
}

impl Default for PlaybackSessionState {
    fn default() -> Self {
        Self {
            showing_intro: false,
            intro_ready: false,
            intro_fade_out: None,
            intro_complete: false,
            video_active: false,
            playlist_index: 0,
            item_index: 0,
            master_shuffle_active: false,
            playback_started: false,
            paused: false,
            ui_visible_while_playing: true,
            ui_fade: None,
            ui_fade_in: None,
            switch_guard: SwitchGuard::default(),
            auto_advance: AutoAdvanceGuard::new(),
        }
    }
}

impl PlaybackSessionState {
    pub fn intro_phase(&self) -> IntroPhase {
        if self.intro_complete {
            IntroPhase::Done
        } else if self.intro_fade_out.is_some() {
            IntroPhase::FadingOut
        } else if self.intro_ready {
            IntroPhase::Playing
        } else {
            IntroPhase::Loading
        }
    }

    pub fn is_switching(&self) -> bool {
        self.switch_guard.is_switching()
    }

    pub fn last_advanced_item(&self) -> Option<usize> {
        self.auto_advance.last_advanced_item()
    }
}
