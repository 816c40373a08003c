//! The buffer-allocation seam between the GPU surface and the display
//! controller.
//!
//! A [`ScanoutBuffer`] is a scoped lease: dropping it hands the buffer back
//! to the surface's pool. [`DeferredRelease`] keeps the previous frame's lease
//! alive for exactly one more frame so a pool of two or three buffers is
//! enough for pipelined double buffering.

use std::error::Error;
use std::fmt;

use crate::display::Resolution;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct BufferId(pub u64);

/// Everything the controller needs to wrap a buffer in a framebuffer.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PlaneLayout {
    pub width: u32,
    pub height: u32,
    /// DRM fourcc code.
    pub fourcc: u32,
    pub modifier: Option<u64>,
    pub handles: [u32; 4],
    pub pitches: [u32; 4],
    pub offsets: [u32; 4],
    pub depth: u32,
    pub bpp: u32,
}

pub trait ScanoutBuffer {
    fn id(&self) -> BufferId;

    fn layout(&self) -> PlaneLayout;
}

#[derive(Debug)]
pub enum SurfaceError {
    /// Every buffer in the pool is locked; retry after a release.
    Exhausted,
    Lost(String),
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceError::Exhausted => write!(f, "no free buffers in pool"),
            SurfaceError::Lost(msg) => write!(f, "surface lost: {}", msg),
        }
    }
}

impl Error for SurfaceError {}

pub trait GpuSurface {
    type Buffer: ScanoutBuffer;

    /// Size of the buffers this surface renders into. Must match the mode
    /// they are scanned out with.
    fn resolution(&self) -> Resolution;

    /// Locks the most recently rendered buffer for scanout.
    fn lock_front_buffer(&mut self) -> Result<Self::Buffer, SurfaceError>;
}

#[derive(Debug)]
pub struct DeferredRelease<B> {
    held: Option<B>,
}

impl<B> Default for DeferredRelease<B> {
    fn default() -> Self {
        Self { held: None }
    }
}

impl<B> DeferredRelease<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps `buffer` until the next [`Self::release`]. Anything already held
    /// is released first.
    pub fn hold(&mut self, buffer: B) {
        self.held = Some(buffer);
    }

    /// Returns the held buffer to its pool. `true` if something was held.
    pub fn release(&mut self) -> bool {
        self.held.take().is_some()
    }

    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }
}
