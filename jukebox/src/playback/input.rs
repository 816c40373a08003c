#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Action {
    Select,
    Next,
    Prev,
    Rotate,
    Menu,
    Quit,
    Seek,
    PlayPause,
}

impl Action {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "select" => Some(Action::Select),
            "next" => Some(Action::Next),
            "prev" => Some(Action::Prev),
            "rotate" => Some(Action::Rotate),
            "menu" => Some(Action::Menu),
            "quit" => Some(Action::Quit),
            "seek" => Some(Action::Seek),
            "play_pause" | "playpause" => Some(Action::PlayPause),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputEvent {
    pub action: Action,
    pub pressed: bool,
    /// Rotation steps for `Rotate`, seconds for `Seek`.
    pub delta: i32,
}

impl InputEvent {
    pub fn press(action: Action) -> Self {
        Self {
            action,
            pressed: true,
            delta: 0,
        }
    }

    pub fn with_delta(action: Action, delta: i32) -> Self {
        Self {
            action,
            pressed: true,
            delta,
        }
    }
}

/// Polled once per tick; each call returns what arrived since the last one.
pub trait InputSource {
    fn poll(&mut self) -> Vec<InputEvent>;
}
