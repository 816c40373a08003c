//! DRM/KMS display controller and GBM scanout surface.
//!
//! Bring-up order: [`KmsDisplay::open`], select a mode through
//! [`crate::display::DisplayHandle::select_mode`], then create a
//! [`GbmSurface`] at that mode's resolution from a cloned [`Card`]. The EGL
//! context that renders into the surface is supplied by the integrator.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsFd, BorrowedFd};
use std::path::Path;
use std::time::Duration;

use drm::buffer::{self, DrmFourcc, DrmModifier, PlanarBuffer};
use drm::control::{
    self, Device as ControlDevice, FbCmd2Flags, Mode, ModeTypeFlags,
    PageFlipFlags, connector, crtc, framebuffer,
};
use gbm::{BufferObject, BufferObjectFlags};
use log::{debug, info};
use rustix::event::{PollFd, PollFlags, poll};

use crate::core::error::{InitError, InitStage};
use crate::display::{
    DisplayDevice, DisplayError, DisplayHandle, DisplayMode, FlipWait,
    FramebufferId, ModeInfo, Resolution, ResolutionPolicy,
};
use crate::render::{
    BufferId, FramePresenter, GpuSurface, PlaneLayout, ScanoutBuffer,
    SurfaceError,
};

/// An open `/dev/dri/cardN` node.
#[derive(Debug)]
pub struct Card(File);

impl Card {
    pub fn open(path: &Path) -> io::Result<Self> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map(Card)
    }

    pub fn try_clone(&self) -> io::Result<Self> {
        self.0.try_clone().map(Card)
    }
}

impl AsFd for Card {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.0.as_fd()
    }
}

impl drm::Device for Card {}
impl ControlDevice for Card {}

pub struct KmsDisplay {
    card: Card,
    connector: connector::Handle,
    crtc: crtc::Handle,
    flip_pending: bool,
}

impl KmsDisplay {
    /// Opens the node and binds the first connected connector to a CRTC.
    pub fn open(path: &Path) -> Result<Self, DisplayError> {
        let card = Card::open(path)?;
        let resources = card.resource_handles()?;

        let connector = resources
            .connectors()
            .iter()
            .filter_map(|handle| card.get_connector(*handle, true).ok())
            .find(|info| info.state() == connector::State::Connected)
            .ok_or(DisplayError::NoConnector)?;

        let current_crtc = connector
            .current_encoder()
            .and_then(|encoder| card.get_encoder(encoder).ok())
            .and_then(|encoder| encoder.crtc());
        let crtc = match current_crtc {
            Some(crtc) => crtc,
            None => connector
                .encoders()
                .iter()
                .filter_map(|encoder| card.get_encoder(*encoder).ok())
                .flat_map(|encoder| {
                    resources.filter_crtcs(encoder.possible_crtcs())
                })
                .next()
                .ok_or(DisplayError::NoConnector)?,
        };

        info!(
            "using {:?} on {:?} ({} modes)",
            connector.interface(),
            crtc,
            connector.modes().len()
        );

        Ok(Self {
            card,
            connector: connector.handle(),
            crtc,
            flip_pending: false,
        })
    }

    pub fn card(&self) -> &Card {
        &self.card
    }

    fn drm_modes(&self) -> Result<Vec<Mode>, DisplayError> {
        let info = self.card.get_connector(self.connector, false)?;
        Ok(info.modes().to_vec())
    }
}

fn to_framebuffer_id(handle: framebuffer::Handle) -> FramebufferId {
    FramebufferId(u32::from(handle))
}

fn to_framebuffer_handle(
    id: FramebufferId,
) -> Result<framebuffer::Handle, DisplayError> {
    control::from_u32(id.0).ok_or_else(|| {
        DisplayError::Framebuffer(format!("invalid framebuffer id {}", id.0))
    })
}

impl DisplayDevice for KmsDisplay {
    fn modes(&self) -> Result<Vec<ModeInfo>, DisplayError> {
        Ok(self
            .drm_modes()?
            .iter()
            .enumerate()
            .map(|(index, mode)| {
                let (width, height) = mode.size();
                ModeInfo {
                    index,
                    resolution: Resolution::new(width as u32, height as u32),
                    refresh_hz: mode.vrefresh(),
                    preferred: mode
                        .mode_type()
                        .contains(ModeTypeFlags::PREFERRED),
                }
            })
            .collect())
    }

    fn acquire_master(&mut self) -> Result<(), DisplayError> {
        drm::Device::acquire_master_lock(&self.card)
            .map_err(|err| DisplayError::Master(err.to_string()))
    }

    fn release_master(&mut self) -> Result<(), DisplayError> {
        self.flip_pending = false;
        drm::Device::release_master_lock(&self.card)
            .map_err(|err| DisplayError::Master(err.to_string()))
    }

    fn add_planar_framebuffer(
        &mut self,
        layout: &PlaneLayout,
    ) -> Result<FramebufferId, DisplayError> {
        let buffer = LayoutBuffer::new(layout)?;
        let flags = if layout.modifier.is_some() {
            FbCmd2Flags::MODIFIERS
        } else {
            FbCmd2Flags::empty()
        };
        self.card
            .add_planar_framebuffer(&buffer, flags)
            .map(to_framebuffer_id)
            .map_err(|err| DisplayError::Framebuffer(err.to_string()))
    }

    fn add_legacy_framebuffer(
        &mut self,
        layout: &PlaneLayout,
    ) -> Result<FramebufferId, DisplayError> {
        let buffer = LayoutBuffer::new(layout)?;
        self.card
            .add_framebuffer(&buffer, layout.depth, layout.bpp)
            .map(to_framebuffer_id)
            .map_err(|err| DisplayError::Framebuffer(err.to_string()))
    }

    fn destroy_framebuffer(
        &mut self,
        framebuffer: FramebufferId,
    ) -> Result<(), DisplayError> {
        let handle = to_framebuffer_handle(framebuffer)?;
        self.card.destroy_framebuffer(handle)?;
        Ok(())
    }

    fn set_crtc(
        &mut self,
        framebuffer: FramebufferId,
        mode: &ModeInfo,
    ) -> Result<(), DisplayError> {
        let handle = to_framebuffer_handle(framebuffer)?;
        let drm_mode = self
            .drm_modes()?
            .get(mode.index)
            .copied()
            .ok_or(DisplayError::UnknownMode(mode.index))?;

        self.card
            .set_crtc(
                self.crtc,
                Some(handle),
                (0, 0),
                &[self.connector],
                Some(drm_mode),
            )
            .map_err(|err| DisplayError::Modeset(err.to_string()))?;
        self.flip_pending = false;
        Ok(())
    }

    fn page_flip(
        &mut self,
        framebuffer: FramebufferId,
    ) -> Result<(), DisplayError> {
        let handle = to_framebuffer_handle(framebuffer)?;
        self.card
            .page_flip(self.crtc, handle, PageFlipFlags::EVENT, None)
            .map_err(|err| DisplayError::PageFlip(err.to_string()))?;
        self.flip_pending = true;
        Ok(())
    }

    fn wait_for_flip(
        &mut self,
        timeout: Duration,
    ) -> Result<FlipWait, DisplayError> {
        if !self.flip_pending {
            return Ok(FlipWait::TimedOut);
        }

        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;
        let mut fds = [PollFd::new(&self.card, PollFlags::IN)];
        let ready = poll(&mut fds, timeout_ms).map_err(io::Error::from)?;
        if ready == 0 {
            return Ok(FlipWait::TimedOut);
        }

        for event in self.card.receive_events()? {
            if let control::Event::PageFlip(flip) = event {
                debug!("flip completed at frame {}", flip.frame);
                self.flip_pending = false;
                return Ok(FlipWait::Completed);
            }
        }
        Ok(FlipWait::TimedOut)
    }
}

/// Presents a [`PlaneLayout`] through the `drm` buffer traits.
struct LayoutBuffer {
    layout: PlaneLayout,
    format: DrmFourcc,
    primary: buffer::Handle,
}

impl LayoutBuffer {
    fn new(layout: &PlaneLayout) -> Result<Self, DisplayError> {
        let format = DrmFourcc::try_from(layout.fourcc).map_err(|err| {
            DisplayError::Framebuffer(format!("unsupported format: {:?}", err))
        })?;
        let primary = control::from_u32(layout.handles[0]).ok_or_else(|| {
            DisplayError::Framebuffer("buffer has no plane 0 handle".into())
        })?;
        Ok(Self {
            layout: layout.clone(),
            format,
            primary,
        })
    }
}

impl buffer::Buffer for LayoutBuffer {
    fn size(&self) -> (u32, u32) {
        (self.layout.width, self.layout.height)
    }

    fn format(&self) -> DrmFourcc {
        self.format
    }

    fn pitch(&self) -> u32 {
        self.layout.pitches[0]
    }

    fn handle(&self) -> buffer::Handle {
        self.primary
    }
}

impl PlanarBuffer for LayoutBuffer {
    fn size(&self) -> (u32, u32) {
        (self.layout.width, self.layout.height)
    }

    fn format(&self) -> DrmFourcc {
        self.format
    }

    fn modifier(&self) -> Option<DrmModifier> {
        self.layout.modifier.map(DrmModifier::from)
    }

    fn pitches(&self) -> [u32; 4] {
        self.layout.pitches
    }

    fn handles(&self) -> [Option<buffer::Handle>; 4] {
        self.layout.handles.map(|raw| control::from_u32(raw))
    }

    fn offsets(&self) -> [u32; 4] {
        self.layout.offsets
    }
}

/// The GBM surface the render context draws into.
pub struct GbmSurface {
    device: gbm::Device<Card>,
    surface: gbm::Surface<()>,
    resolution: Resolution,
}

impl GbmSurface {
    pub fn new(card: Card, resolution: Resolution) -> io::Result<Self> {
        let device = gbm::Device::new(card)?;
        let surface = device.create_surface::<()>(
            resolution.width,
            resolution.height,
            gbm::Format::Xrgb8888,
            BufferObjectFlags::SCANOUT | BufferObjectFlags::RENDERING,
        )?;
        info!("created {} scanout surface", resolution);
        Ok(Self {
            device,
            surface,
            resolution,
        })
    }

    pub fn device(&self) -> &gbm::Device<Card> {
        &self.device
    }

    /// For building the EGL window surface.
    pub fn surface(&self) -> &gbm::Surface<()> {
        &self.surface
    }
}

impl GpuSurface for GbmSurface {
    type Buffer = GbmBuffer;

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn lock_front_buffer(&mut self) -> Result<GbmBuffer, SurfaceError> {
        // SAFETY: the render context swaps this surface before every
        // present, so a front buffer exists to lock.
        let bo = unsafe { self.surface.lock_front_buffer() }
            .map_err(|_| SurfaceError::Exhausted)?;
        Ok(GbmBuffer { bo })
    }
}

/// A locked GBM buffer object; dropping it releases it to the surface.
pub struct GbmBuffer {
    bo: BufferObject<()>,
}

impl ScanoutBuffer for GbmBuffer {
    fn id(&self) -> BufferId {
        BufferId(u32::from(buffer::Buffer::handle(&self.bo)) as u64)
    }

    fn layout(&self) -> PlaneLayout {
        let (width, height) = PlanarBuffer::size(&self.bo);
        PlaneLayout {
            width,
            height,
            fourcc: PlanarBuffer::format(&self.bo) as u32,
            modifier: PlanarBuffer::modifier(&self.bo)
                .filter(|modifier| *modifier != DrmModifier::Invalid)
                .map(u64::from),
            handles: PlanarBuffer::handles(&self.bo)
                .map(|handle| handle.map_or(0, u32::from)),
            pitches: PlanarBuffer::pitches(&self.bo),
            offsets: PlanarBuffer::offsets(&self.bo),
            depth: 24,
            bpp: 32,
        }
    }
}

/// Opens `device`, selects the mode for `display_mode` and allocates a
/// scanout surface of that mode's size.
pub fn open_presenter(
    device: &Path,
    display_mode: DisplayMode,
    policy: &ResolutionPolicy,
) -> Result<FramePresenter<KmsDisplay, GbmSurface>, InitError> {
    let kms = KmsDisplay::open(device).map_err(|err| {
        InitError::new(
            InitStage::Display,
            format!("{}: {}", device.display(), err),
        )
    })?;
    let card = kms
        .card()
        .try_clone()
        .map_err(|err| InitError::new(InitStage::Display, err.to_string()))?;

    let mut display = DisplayHandle::new(kms);
    let mode = display
        .select_mode(display_mode, policy)
        .map_err(|err| InitError::new(InitStage::Mode, err.to_string()))?;

    let surface = GbmSurface::new(card, mode.resolution).map_err(|err| {
        InitError::new(InitStage::GpuSurface, err.to_string())
    })?;
    Ok(FramePresenter::new(display, surface))
}

/// Surface factory for [`crate::runtime::app::Runtime::with_surface_factory`]:
/// every call allocates on its own handle to the same card.
pub fn surface_factory(
    card: Card,
) -> impl FnMut(Resolution) -> Result<GbmSurface, String> {
    move |resolution| {
        let card = card.try_clone().map_err(|err| err.to_string())?;
        GbmSurface::new(card, resolution).map_err(|err| err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XRGB8888: u32 = 0x3432_5258;

    fn layout(width: u32, height: u32) -> PlaneLayout {
        PlaneLayout {
            width,
            height,
            fourcc: XRGB8888,
            modifier: None,
            handles: [7, 0, 0, 0],
            pitches: [width * 4, 0, 0, 0],
            offsets: [0; 4],
            depth: 24,
            bpp: 32,
        }
    }

    #[test]
    fn framebuffer_ids_map_to_handles() {
        let handle = to_framebuffer_handle(FramebufferId(42)).unwrap();
        assert_eq!(u32::from(handle), 42);
        assert_eq!(to_framebuffer_id(handle), FramebufferId(42));

        assert!(matches!(
            to_framebuffer_handle(FramebufferId(0)),
            Err(DisplayError::Framebuffer(_))
        ));
    }

    #[test]
    fn layout_buffer_exposes_the_plane_layout() {
        let buffer = LayoutBuffer::new(&layout(1280, 720)).unwrap();

        assert_eq!(buffer::Buffer::size(&buffer), (1280, 720));
        assert_eq!(buffer::Buffer::format(&buffer), DrmFourcc::Xrgb8888);
        assert_eq!(buffer::Buffer::pitch(&buffer), 5120);
        assert_eq!(u32::from(buffer::Buffer::handle(&buffer)), 7);

        let handles = PlanarBuffer::handles(&buffer);
        assert!(handles[0].is_some());
        assert!(handles[1..].iter().all(Option::is_none));
        assert_eq!(PlanarBuffer::modifier(&buffer), None);
    }

    #[test]
    fn layout_buffer_rejects_unknown_format_and_missing_plane() {
        let bad_format = PlaneLayout {
            fourcc: 0,
            ..layout(640, 480)
        };
        assert!(LayoutBuffer::new(&bad_format).is_err());

        let no_plane = PlaneLayout {
            handles: [0; 4],
            ..layout(640, 480)
        };
        assert!(LayoutBuffer::new(&no_plane).is_err());
    }

    #[test]
    fn missing_device_node_is_an_io_error() {
        let result = KmsDisplay::open(Path::new("/nonexistent/dri/card9"));
        assert!(matches!(result, Err(DisplayError::Io(_))));

        let err = open_presenter(
            Path::new("/nonexistent/dri/card9"),
            DisplayMode::CrtNative,
            &ResolutionPolicy::default(),
        )
        .err()
        .expect("no device");
        assert_eq!(err.stage, InitStage::Display);
    }
}
