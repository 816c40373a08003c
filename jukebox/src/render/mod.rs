mod framebuffer_cache;
pub mod presenter;
pub mod surface;

pub use presenter::{FramePresenter, PresentationState};
pub use surface::{
    BufferId, DeferredRelease, GpuSurface, PlaneLayout, ScanoutBuffer,
    SurfaceError,
};
