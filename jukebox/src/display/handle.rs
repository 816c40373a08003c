use log::{info, warn};

use super::device::{DisplayDevice, DisplayError, ModeInfo, Resolution};
use super::mode_policy::{
    self, DisplayMode, ModeProber, ModeRequest, ResolutionPolicy,
};

/// Owns the open controller connection, the mode currently programmed and
/// whether this process holds master ownership.
pub struct DisplayHandle<D: DisplayDevice> {
    device: D,
    mode: Option<ModeInfo>,
    has_master: bool,
}

impl<D: DisplayDevice> DisplayHandle<D> {
    /// `device` must already be opened; a freshly opened controller node
    /// grants master to its first opener.
    pub fn new(device: D) -> Self {
        Self {
            device,
            mode: None,
            has_master: true,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn current_mode(&self) -> Option<&ModeInfo> {
        self.mode.as_ref()
    }

    pub fn screen_size(&self) -> Option<Resolution> {
        self.mode.as_ref().map(|mode| mode.resolution)
    }

    pub fn has_master(&self) -> bool {
        self.has_master
    }

    pub fn acquire_master(&mut self) -> Result<(), DisplayError> {
        self.device.acquire_master()?;
        self.has_master = true;
        info!("display master acquired");
        Ok(())
    }

    pub fn release_master(&mut self) -> Result<(), DisplayError> {
        self.has_master = false;
        self.device.release_master()?;
        info!("display master released");
        Ok(())
    }

    /// Picks a mode for `display_mode` and remembers it. The mode takes effect
    /// on the next modeset issued by the presenter.
    pub fn select_mode(
        &mut self,
        display_mode: DisplayMode,
        policy: &ResolutionPolicy,
    ) -> Result<ModeInfo, DisplayError> {
        let modes = self.device.modes()?;
        let mode = mode_policy::select_mode(
            display_mode,
            policy,
            modes.as_slice(),
        )
        .ok_or(DisplayError::NoConnector)?;

        info!(
            "selected {} @ {}Hz for {:?}",
            mode.resolution, mode.refresh_hz, display_mode
        );
        self.mode = Some(mode.clone());
        Ok(mode)
    }

    /// Selects the advertised mode with exactly `resolution`, for when the
    /// render surface cannot follow the policy's choice.
    pub fn select_exact(
        &mut self,
        resolution: Resolution,
    ) -> Result<ModeInfo, DisplayError> {
        let modes = self.device.modes()?;
        let mode = modes
            .as_slice()
            .probe(ModeRequest::Exact(resolution))
            .ok_or_else(|| {
                DisplayError::Modeset(format!("{} not advertised", resolution))
            })?;

        info!("selected {} @ {}Hz", mode.resolution, mode.refresh_hz);
        self.mode = Some(mode.clone());
        Ok(mode)
    }

    /// Checks that the remembered mode is still advertised after another
    /// process had the controller, falling back to a fresh selection.
    pub fn restore_mode(
        &mut self,
        display_mode: DisplayMode,
        policy: &ResolutionPolicy,
    ) -> Result<ModeInfo, DisplayError> {
        let modes = self.device.modes()?;

        if let Some(previous) = self.mode.clone() {
            if modes.iter().any(|mode| *mode == previous) {
                return Ok(previous);
            }
            warn!(
                "previous mode {} no longer advertised; reselecting",
                previous.resolution
            );
        }

        self.select_mode(display_mode, policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::virtual_display::{DisplayOp, VirtualDisplay};

    #[test]
    fn select_mode_remembers_choice() {
        let mut handle = DisplayHandle::new(VirtualDisplay::new(vec![
            (Resolution::new(1920, 1080), true),
            (Resolution::new(1280, 720), false),
        ]));

        let mode = handle
            .select_mode(DisplayMode::CrtNative, &ResolutionPolicy::default())
            .unwrap();
        assert_eq!(mode.resolution, Resolution::new(1920, 1080));
        assert_eq!(handle.screen_size(), Some(Resolution::new(1920, 1080)));
    }

    #[test]
    fn master_ownership_round_trip() {
        let mut handle = DisplayHandle::new(VirtualDisplay::new(vec![(
            Resolution::new(720, 480),
            true,
        )]));

        handle.release_master().unwrap();
        assert!(!handle.has_master());
        handle.acquire_master().unwrap();
        assert!(handle.has_master());
        assert_eq!(
            handle.device().ops(),
            &[DisplayOp::ReleaseMaster, DisplayOp::AcquireMaster]
        );
    }

    #[test]
    fn restore_mode_keeps_previous_when_still_advertised() {
        let mut handle = DisplayHandle::new(VirtualDisplay::new(vec![
            (Resolution::new(1920, 1080), true),
            (Resolution::new(1280, 720), false),
        ]));
        let policy = ResolutionPolicy {
            modern_preferred: Resolution::new(1280, 720),
            ..ResolutionPolicy::default()
        };
        handle.select_mode(DisplayMode::ModernTv, &policy).unwrap();

        let restored =
            handle.restore_mode(DisplayMode::ModernTv, &policy).unwrap();
        assert_eq!(restored.resolution, Resolution::new(1280, 720));
    }

    #[test]
    fn select_exact_only_takes_advertised_sizes() {
        let mut handle = DisplayHandle::new(VirtualDisplay::new(vec![
            (Resolution::new(1920, 1080), true),
            (Resolution::new(1280, 720), false),
        ]));

        let mode = handle.select_exact(Resolution::new(1280, 720)).unwrap();
        assert_eq!(mode.index, 1);
        assert_eq!(handle.screen_size(), Some(Resolution::new(1280, 720)));

        assert!(handle.select_exact(Resolution::new(800, 600)).is_err());
        assert_eq!(handle.screen_size(), Some(Resolution::new(1280, 720)));
    }
}
