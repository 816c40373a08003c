use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use log::trace;

use crate::display::{
    DisplayDevice, DisplayError, FlipWait, FramebufferId, ModeInfo,
    Resolution,
};
use crate::render::PlaneLayout;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DisplayOp {
    AcquireMaster,
    ReleaseMaster,
    AddPlanar(FramebufferId),
    AddLegacy(FramebufferId),
    Destroy(FramebufferId),
    SetCrtc(FramebufferId, Resolution),
    PageFlip(FramebufferId),
}

/// In-memory display controller. Records every operation and can be told to
/// fail specific calls.
#[derive(Debug, Default)]
pub struct VirtualDisplay {
    modes: Vec<ModeInfo>,
    master: bool,
    framebuffers: HashMap<FramebufferId, PlaneLayout>,
    next_framebuffer: u32,
    scanout: Option<Resolution>,
    flip_pending: bool,
    ops: Vec<DisplayOp>,
    flip_timeouts: Vec<Duration>,
    pub fail_planar: bool,
    pub fail_legacy: bool,
    pub fail_page_flip: bool,
    pub fail_modeset: bool,
    pub fail_acquire_master: bool,
    /// Page flips are accepted but their completion event never arrives.
    pub drop_flip_events: bool,
}

impl VirtualDisplay {
    /// `modes` are `(resolution, preferred)` pairs, all at 60Hz.
    pub fn new(modes: Vec<(Resolution, bool)>) -> Self {
        let modes = modes
            .into_iter()
            .enumerate()
            .map(|(index, (resolution, preferred))| ModeInfo {
                index,
                resolution,
                refresh_hz: 60,
                preferred,
            })
            .collect();

        Self {
            modes,
            master: true,
            next_framebuffer: 1,
            ..Self::default()
        }
    }

    pub fn ops(&self) -> &[DisplayOp] {
        &self.ops
    }

    pub fn flip_timeouts(&self) -> &[Duration] {
        &self.flip_timeouts
    }

    pub fn modeset_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DisplayOp::SetCrtc(..)))
            .count()
    }

    pub fn page_flip_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DisplayOp::PageFlip(_)))
            .count()
    }

    pub fn live_framebuffers(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn is_master(&self) -> bool {
        self.master
    }

    fn register(&mut self, layout: &PlaneLayout) -> FramebufferId {
        let id = FramebufferId(self.next_framebuffer);
        self.next_framebuffer += 1;
        self.framebuffers.insert(id, layout.clone());
        id
    }

    /// Size of the buffer behind `framebuffer`, if it is registered.
    pub fn framebuffer_size(
        &self,
        framebuffer: FramebufferId,
    ) -> Option<Resolution> {
        self.framebuffers
            .get(&framebuffer)
            .map(|layout| Resolution::new(layout.width, layout.height))
    }

    /// Resolution programmed by the last successful modeset.
    pub fn scanout_size(&self) -> Option<Resolution> {
        self.scanout
    }

    // A controller refuses to scan out a buffer that does not cover the mode.
    fn require_size(
        &self,
        framebuffer: FramebufferId,
        expected: Resolution,
    ) -> Result<(), String> {
        match self.framebuffer_size(framebuffer) {
            None => Err(format!("unknown {:?}", framebuffer)),
            Some(size) if size != expected => Err(format!(
                "{:?} is {} but the mode is {}",
                framebuffer, size, expected
            )),
            Some(_) => Ok(()),
        }
    }

    fn require_master(&self) -> Result<(), DisplayError> {
        if self.master {
            Ok(())
        } else {
            Err(DisplayError::Master("not master".to_string()))
        }
    }
}

impl DisplayDevice for VirtualDisplay {
    fn modes(&self) -> Result<Vec<ModeInfo>, DisplayError> {
        if self.modes.is_empty() {
            return Err(DisplayError::NoConnector);
        }
        Ok(self.modes.clone())
    }

    fn acquire_master(&mut self) -> Result<(), DisplayError> {
        if self.fail_acquire_master {
            return Err(DisplayError::Master("busy".to_string()));
        }
        self.master = true;
        self.ops.push(DisplayOp::AcquireMaster);
        Ok(())
    }

    fn release_master(&mut self) -> Result<(), DisplayError> {
        self.master = false;
        self.ops.push(DisplayOp::ReleaseMaster);
        Ok(())
    }

    fn add_planar_framebuffer(
        &mut self,
        layout: &PlaneLayout,
    ) -> Result<FramebufferId, DisplayError> {
        if self.fail_planar {
            return Err(DisplayError::Framebuffer(
                "planar registration unsupported".to_string(),
            ));
        }
        let id = self.register(layout);
        self.ops.push(DisplayOp::AddPlanar(id));
        Ok(id)
    }

    fn add_legacy_framebuffer(
        &mut self,
        layout: &PlaneLayout,
    ) -> Result<FramebufferId, DisplayError> {
        if self.fail_legacy {
            return Err(DisplayError::Framebuffer(
                "out of framebuffer memory".to_string(),
            ));
        }
        let id = self.register(layout);
        self.ops.push(DisplayOp::AddLegacy(id));
        Ok(id)
    }

    fn destroy_framebuffer(
        &mut self,
        framebuffer: FramebufferId,
    ) -> Result<(), DisplayError> {
        self.framebuffers.remove(&framebuffer).ok_or_else(|| {
            DisplayError::Framebuffer(format!("unknown {:?}", framebuffer))
        })?;
        self.ops.push(DisplayOp::Destroy(framebuffer));
        Ok(())
    }

    fn set_crtc(
        &mut self,
        framebuffer: FramebufferId,
        mode: &ModeInfo,
    ) -> Result<(), DisplayError> {
        self.require_master()?;
        if self.fail_modeset {
            return Err(DisplayError::Modeset("rejected".to_string()));
        }
        if !self.modes.iter().any(|m| m.index == mode.index) {
            return Err(DisplayError::UnknownMode(mode.index));
        }
        self.require_size(framebuffer, mode.resolution)
            .map_err(DisplayError::Modeset)?;
        self.scanout = Some(mode.resolution);
        self.ops.push(DisplayOp::SetCrtc(framebuffer, mode.resolution));
        self.flip_pending = false;
        Ok(())
    }

    fn page_flip(
        &mut self,
        framebuffer: FramebufferId,
    ) -> Result<(), DisplayError> {
        self.require_master()?;
        if self.fail_page_flip {
            return Err(DisplayError::PageFlip("device busy".to_string()));
        }
        let Some(scanout) = self.scanout else {
            return Err(DisplayError::PageFlip("crtc not enabled".to_string()));
        };
        self.require_size(framebuffer, scanout)
            .map_err(DisplayError::PageFlip)?;
        self.ops.push(DisplayOp::PageFlip(framebuffer));
        self.flip_pending = true;
        Ok(())
    }

    fn wait_for_flip(
        &mut self,
        timeout: Duration,
    ) -> Result<FlipWait, DisplayError> {
        self.flip_timeouts.push(timeout);

        if self.drop_flip_events || !self.flip_pending {
            // Nothing will ever wake the wait.
            thread::sleep(timeout);
            trace!("virtual flip wait timed out after {:?}", timeout);
            return Ok(FlipWait::TimedOut);
        }

        self.flip_pending = false;
        Ok(FlipWait::Completed)
    }
}
