//! Frame presentation engine.
//!
//! Hands finished GPU buffers to the display controller. Every call either
//! makes exactly one new frame visible or leaves the previous frame on
//! screen; all failures are recovered locally.

use std::thread;
use std::time::Duration;

use log::{debug, info, trace, warn};

use super::framebuffer_cache::FramebufferCache;
use super::surface::{
    DeferredRelease, GpuSurface, ScanoutBuffer, SurfaceError,
};
use crate::core::util::should_log_occurrence;
use crate::display::{
    DisplayDevice, DisplayError, DisplayHandle, FlipWait, FramebufferId,
};

pub const MAX_CONSECUTIVE_BUFFER_FAILURES: u32 = 6;
pub const BUFFER_FAILURE_BACKOFF: Duration = Duration::from_millis(16);
pub const RESET_MODESET_FRAMES: u32 = 10;
pub const PAGE_FLIP_TIMEOUT: Duration = Duration::from_millis(100);
pub const FLIP_FAILURE_LOG_INTERVAL: u32 = 10;
pub const FLIP_SUCCESS_RESET_INTERVAL: u32 = 100;

#[derive(Debug)]
pub struct PresentationState<B> {
    framebuffer_cache: FramebufferCache,
    previous_buffer: DeferredRelease<B>,
    current_framebuffer: Option<FramebufferId>,
    is_first_frame: bool,
    forced_modeset_frames_remaining: u32,
    consecutive_buffer_failures: u32,
    page_flip_failures: u32,
    successful_page_flips: u32,
}

impl<B> PresentationState<B> {
    fn initial() -> Self {
        Self {
            framebuffer_cache: FramebufferCache::default(),
            previous_buffer: DeferredRelease::new(),
            current_framebuffer: None,
            is_first_frame: true,
            forced_modeset_frames_remaining: 0,
            consecutive_buffer_failures: 0,
            page_flip_failures: 0,
            successful_page_flips: 0,
        }
    }

    fn after_reset() -> Self {
        Self {
            forced_modeset_frames_remaining: RESET_MODESET_FRAMES,
            ..Self::initial()
        }
    }

    fn needs_modeset(&self) -> bool {
        self.is_first_frame || self.forced_modeset_frames_remaining > 0
    }

    pub fn cache_len(&self) -> usize {
        self.framebuffer_cache.len()
    }

    pub fn cache_contains(&self, framebuffer: FramebufferId) -> bool {
        self.framebuffer_cache.contains_framebuffer(framebuffer)
    }

    pub fn current_framebuffer(&self) -> Option<FramebufferId> {
        self.current_framebuffer
    }

    pub fn holds_previous_buffer(&self) -> bool {
        self.previous_buffer.is_held()
    }

    pub fn is_first_frame(&self) -> bool {
        self.is_first_frame
    }

    pub fn forced_modeset_frames_remaining(&self) -> u32 {
        self.forced_modeset_frames_remaining
    }

    pub fn consecutive_buffer_failures(&self) -> u32 {
        self.consecutive_buffer_failures
    }

    pub fn page_flip_failures(&self) -> u32 {
        self.page_flip_failures
    }

    pub fn successful_page_flips(&self) -> u32 {
        self.successful_page_flips
    }
}

pub struct FramePresenter<D: DisplayDevice, S: GpuSurface> {
    // Declared before `surface` so a held buffer goes back to the pool before
    // the pool itself is dropped.
    state: PresentationState<S::Buffer>,
    display: DisplayHandle<D>,
    surface: S,
    sleep: fn(Duration),
}

impl<D: DisplayDevice, S: GpuSurface> FramePresenter<D, S> {
    pub fn new(display: DisplayHandle<D>, surface: S) -> Self {
        Self {
            state: PresentationState::initial(),
            display,
            surface,
            sleep: thread::sleep,
        }
    }

    /// Replaces the backoff sleep. Tests use this to avoid real delays.
    pub fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn state(&self) -> &PresentationState<S::Buffer> {
        &self.state
    }

    pub fn display(&self) -> &DisplayHandle<D> {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut DisplayHandle<D> {
        &mut self.display
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn present_frame(&mut self) -> bool {
        if !self.display.has_master() {
            trace!("skipping present: display master not held");
            return false;
        }

        // Releasing before locking keeps a 2-3 buffer pool from running dry.
        self.state.previous_buffer.release();

        let stale = self
            .state
            .framebuffer_cache
            .evict_over_cap(self.state.current_framebuffer);
        self.destroy_framebuffers(stale);

        let buffer = match self.surface.lock_front_buffer() {
            Ok(buffer) => buffer,
            Err(err) => {
                self.on_buffer_failure(&err);
                return false;
            }
        };
        self.state.consecutive_buffer_failures = 0;

        // Dropping `buffer` on any early return hands it back to the pool.
        let Some(framebuffer) = self.resolve_framebuffer(&buffer) else {
            return false;
        };

        if !self.submit(framebuffer) {
            return false;
        }

        self.state.current_framebuffer = Some(framebuffer);
        self.state.previous_buffer.hold(buffer);
        true
    }

    /// Returns all presentation state to its initial values. Call after
    /// display ownership comes back from another process, or after a mode
    /// change: the next frames are shown with a blocking modeset.
    pub fn reset(&mut self) {
        info!(
            "resetting presentation state ({} cached framebuffers)",
            self.state.framebuffer_cache.len()
        );

        self.state.previous_buffer.release();
        let cached = self.state.framebuffer_cache.drain_all();
        self.destroy_framebuffers(cached);
        self.state = PresentationState::after_reset();
    }

    /// Swaps in a surface rendering at a different size. Framebuffers of the
    /// old surface are destroyed and its buffers returned before it is
    /// dropped, then presentation restarts as after [`Self::reset`].
    pub fn replace_surface(&mut self, surface: S) -> S {
        info!(
            "replacing {} surface with {}",
            self.surface.resolution(),
            surface.resolution()
        );
        self.reset();
        std::mem::replace(&mut self.surface, surface)
    }

    fn on_buffer_failure(&mut self, err: &SurfaceError) {
        self.state.consecutive_buffer_failures += 1;
        let failures = self.state.consecutive_buffer_failures;
        debug!("buffer lock failed ({} in a row): {}", failures, err);

        if failures >= MAX_CONSECUTIVE_BUFFER_FAILURES {
            warn!(
                "{} consecutive buffer lock failures; flushing framebuffer \
                 cache",
                failures
            );
            let flushed = self
                .state
                .framebuffer_cache
                .drain_except(self.state.current_framebuffer);
            self.destroy_framebuffers(flushed);
            self.state.previous_buffer.release();
            self.state.consecutive_buffer_failures = 0;
        }

        (self.sleep)(BUFFER_FAILURE_BACKOFF);
    }

    fn resolve_framebuffer(
        &mut self,
        buffer: &S::Buffer,
    ) -> Option<FramebufferId> {
        let id = buffer.id();
        if let Some(framebuffer) = self.state.framebuffer_cache.get(id) {
            return Some(framebuffer);
        }

        let layout = buffer.layout();
        let device = self.display.device_mut();
        let framebuffer = match device.add_planar_framebuffer(&layout) {
            Ok(fb) => fb,
            Err(planar_err) => {
                debug!("planar framebuffer rejected: {}", planar_err);
                match device.add_legacy_framebuffer(&layout) {
                    Ok(fb) => fb,
                    Err(err) => {
                        warn!("dropping frame for buffer {:?}: {}", id, err);
                        return None;
                    }
                }
            }
        };

        let evicted = self.state.framebuffer_cache.insert(
            id,
            framebuffer,
            self.state.current_framebuffer,
        );
        self.destroy_framebuffers(evicted);
        trace!("registered {:?} for buffer {:?}", framebuffer, id);

        Some(framebuffer)
    }

    fn submit(&mut self, framebuffer: FramebufferId) -> bool {
        if self.state.needs_modeset() {
            return self.modeset(framebuffer);
        }

        match self.display.device_mut().page_flip(framebuffer) {
            Ok(()) => {
                self.await_flip();
                true
            }
            Err(err) => {
                self.record_flip_failure(&err);
                self.modeset(framebuffer)
            }
        }
    }

    fn modeset(&mut self, framebuffer: FramebufferId) -> bool {
        let Some(mode) = self.display.current_mode().cloned() else {
            warn!("cannot present: no display mode selected");
            return false;
        };

        match self.display.device_mut().set_crtc(framebuffer, &mode) {
            Ok(()) => {
                if self.state.is_first_frame {
                    debug!(
                        "first frame shown via modeset at {}",
                        mode.resolution
                    );
                }
                self.state.is_first_frame = false;
                self.state.forced_modeset_frames_remaining = self
                    .state
                    .forced_modeset_frames_remaining
                    .saturating_sub(1);
                true
            }
            Err(err) => {
                warn!("modeset failed, keeping previous frame: {}", err);
                false
            }
        }
    }

    fn await_flip(&mut self) {
        match self.display.device_mut().wait_for_flip(PAGE_FLIP_TIMEOUT) {
            Ok(FlipWait::Completed) => {
                self.state.successful_page_flips += 1;
                if self.state.successful_page_flips
                    >= FLIP_SUCCESS_RESET_INTERVAL
                {
                    self.state.successful_page_flips = 0;
                    self.state.page_flip_failures = 0;
                }
            }
            Ok(FlipWait::TimedOut) => {
                warn!(
                    "page flip event not received within {:?}; continuing",
                    PAGE_FLIP_TIMEOUT
                );
            }
            Err(err) => {
                warn!("waiting for page flip event failed: {}", err);
            }
        }
    }

    fn record_flip_failure(&mut self, err: &DisplayError) {
        self.state.page_flip_failures += 1;
        let failures = self.state.page_flip_failures;
        if should_log_occurrence(failures, FLIP_FAILURE_LOG_INTERVAL) {
            warn!(
                "page flip submit failed ({} so far), using modeset: {}",
                failures, err
            );
        }
    }

    fn destroy_framebuffers(&mut self, framebuffers: Vec<FramebufferId>) {
        for framebuffer in framebuffers {
            if let Err(err) =
                self.display.device_mut().destroy_framebuffer(framebuffer)
            {
                debug!("destroying {:?} failed: {}", framebuffer, err);
            }
        }
    }
}

impl<D: DisplayDevice, S: GpuSurface> Drop for FramePresenter<D, S> {
    fn drop(&mut self) {
        self.state.previous_buffer.release();
        let cached = self.state.framebuffer_cache.drain_all();
        self.destroy_framebuffers(cached);
    }
}
