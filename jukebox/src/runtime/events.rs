use std::sync::mpsc;
use std::sync::mpsc::{Receiver, Sender};

use crate::display::DisplayMode;

/// Requests delivered to the main loop from other threads. Drained once per
/// tick.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RuntimeCommand {
    DisplayModeChanged(DisplayMode),
    Quit,
}

/// Notifications published by the main loop.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RuntimeEvent {
    FramePresented(u64),
    FrameDropped(u64),
    DisplayModeApplied(DisplayMode),
    DisplayReset,
    GameExited(String),
    Stopped,
}

pub type RuntimeCommandSender = Sender<RuntimeCommand>;
pub type RuntimeCommandReceiver = Receiver<RuntimeCommand>;
pub type RuntimeEventSender = Sender<RuntimeEvent>;
pub type RuntimeEventReceiver = Receiver<RuntimeEvent>;

pub fn command_channel() -> (RuntimeCommandSender, RuntimeCommandReceiver) {
    mpsc::channel()
}

pub fn event_channel() -> (RuntimeEventSender, RuntimeEventReceiver) {
    mpsc::channel()
}
