//! The display-controller seam. One connector, one CRTC, already opened by
//! the backend that implements [`DisplayDevice`].

use std::error::Error;
use std::fmt;
use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::render::surface::PlaneLayout;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A mode advertised by the connector. `index` is the backend's position in
/// its own mode list and is how a mode is handed back for a modeset.
#[derive(Clone, Debug, PartialEq)]
pub struct ModeInfo {
    pub index: usize,
    pub resolution: Resolution,
    pub refresh_hz: u32,
    pub preferred: bool,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct FramebufferId(pub u32);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FlipWait {
    Completed,
    TimedOut,
}

#[derive(Debug)]
pub enum DisplayError {
    NoConnector,
    UnknownMode(usize),
    Framebuffer(String),
    Modeset(String),
    PageFlip(String),
    Master(String),
    Io(io::Error),
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::NoConnector => {
                write!(f, "no connected display connector")
            }
            DisplayError::UnknownMode(index) => {
                write!(f, "mode index {} is not advertised", index)
            }
            DisplayError::Framebuffer(msg) => {
                write!(f, "framebuffer creation failed: {}", msg)
            }
            DisplayError::Modeset(msg) => write!(f, "modeset failed: {}", msg),
            DisplayError::PageFlip(msg) => {
                write!(f, "page flip failed: {}", msg)
            }
            DisplayError::Master(msg) => {
                write!(f, "display master ownership: {}", msg)
            }
            DisplayError::Io(err) => write!(f, "display i/o: {}", err),
        }
    }
}

impl Error for DisplayError {}

impl From<io::Error> for DisplayError {
    fn from(err: io::Error) -> Self {
        DisplayError::Io(err)
    }
}

pub trait DisplayDevice {
    fn modes(&self) -> Result<Vec<ModeInfo>, DisplayError>;

    fn acquire_master(&mut self) -> Result<(), DisplayError>;

    fn release_master(&mut self) -> Result<(), DisplayError>;

    /// Multi-plane registration (explicit modifiers/offsets).
    fn add_planar_framebuffer(
        &mut self,
        layout: &PlaneLayout,
    ) -> Result<FramebufferId, DisplayError>;

    /// Single-plane registration for drivers that reject the planar call.
    fn add_legacy_framebuffer(
        &mut self,
        layout: &PlaneLayout,
    ) -> Result<FramebufferId, DisplayError>;

    fn destroy_framebuffer(
        &mut self,
        framebuffer: FramebufferId,
    ) -> Result<(), DisplayError>;

    /// Blocking modeset: programs `mode` and scans out `framebuffer`.
    fn set_crtc(
        &mut self,
        framebuffer: FramebufferId,
        mode: &ModeInfo,
    ) -> Result<(), DisplayError>;

    /// Queues an asynchronous flip that completes with an event.
    fn page_flip(
        &mut self,
        framebuffer: FramebufferId,
    ) -> Result<(), DisplayError>;

    /// Waits for the pending flip's completion event, at most `timeout`.
    fn wait_for_flip(
        &mut self,
        timeout: Duration,
    ) -> Result<FlipWait, DisplayError>;
}
