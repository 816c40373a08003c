//! Navigation models for the settings menu, the game browser and the
//! on-screen keyboard. Pure selection state; actions are applied by the
//! orchestrator.

use super::library::GameEntry;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Overlay {
    Browser,
    Settings,
    GameBrowser,
    Keyboard,
}

pub fn wrap_index(current: usize, delta: i32, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let len = len as i64;
    (current as i64 + delta as i64).rem_euclid(len) as usize
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SettingsItem {
    DisplayMode,
    Volume,
    Games,
    Back,
}

pub const SETTINGS_ITEMS: [SettingsItem; 4] = [
    SettingsItem::DisplayMode,
    SettingsItem::Volume,
    SettingsItem::Games,
    SettingsItem::Back,
];

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SettingsMenu {
    selected: usize,
}

impl SettingsMenu {
    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_item(&self) -> SettingsItem {
        SETTINGS_ITEMS[self.selected]
    }

    pub fn move_by(&mut self, delta: i32) {
        self.selected = wrap_index(self.selected, delta, SETTINGS_ITEMS.len());
    }

    pub fn reset(&mut self) {
        self.selected = 0;
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BrowserEntry {
    Search,
    Game(usize),
}

/// Lists games matching `filter`; entry 0 is always "Search".
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct GameBrowser {
    selected: usize,
    filter: String,
}

impl GameBrowser {
    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: String) {
        self.filter = filter;
        self.selected = 0;
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn entries(&self, games: &[GameEntry]) -> Vec<BrowserEntry> {
        let needle = self.filter.to_lowercase();
        let mut entries = vec![BrowserEntry::Search];
        entries.extend(
            games
                .iter()
                .enumerate()
                .filter(|(_, game)| {
                    needle.is_empty()
                        || game.name.to_lowercase().contains(&needle)
                })
                .map(|(index, _)| BrowserEntry::Game(index)),
        );
        entries
    }

    pub fn move_by(&mut self, delta: i32, games: &[GameEntry]) {
        let len = self.entries(games).len();
        self.selected = wrap_index(self.selected, delta, len);
    }

    pub fn selected_entry(&self, games: &[GameEntry]) -> BrowserEntry {
        self.entries(games)
            .get(self.selected)
            .cloned()
            .unwrap_or(BrowserEntry::Search)
    }
}

const KEYBOARD_CHARS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 ";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Key {
    Char(char),
    Delete,
    Done,
}

impl Key {
    pub fn label(self) -> String {
        match self {
            Key::Char(' ') => "SPACE".to_string(),
            Key::Char(c) => c.to_string(),
            Key::Delete => "DEL".to_string(),
            Key::Done => "OK".to_string(),
        }
    }
}

pub fn keyboard_keys() -> Vec<Key> {
    KEYBOARD_CHARS
        .chars()
        .map(Key::Char)
        .chain([Key::Delete, Key::Done])
        .collect()
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyOutcome {
    Editing,
    Confirmed,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VirtualKeyboard {
    selected: usize,
    text: String,
}

impl VirtualKeyboard {
    pub fn open(initial: &str) -> Self {
        Self {
            selected: 0,
            text: initial.to_string(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn move_by(&mut self, delta: i32) {
        self.selected = wrap_index(self.selected, delta, keyboard_keys().len());
    }

    pub fn press(&mut self) -> KeyOutcome {
        match keyboard_keys()[self.selected] {
            Key::Char(c) => {
                self.text.push(c);
                KeyOutcome::Editing
            }
            Key::Delete => {
                self.text.pop();
                KeyOutcome::Editing
            }
            Key::Done => KeyOutcome::Confirmed,
        }
    }
}
