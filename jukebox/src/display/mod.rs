pub mod device;
pub mod handle;
pub mod mode_policy;
pub mod viewport;

pub use device::{
    DisplayDevice, DisplayError, FlipWait, FramebufferId, ModeInfo,
    Resolution,
};
pub use handle::DisplayHandle;
pub use mode_policy::{DisplayMode, ModeProber, ModeRequest, ResolutionPolicy};
pub use viewport::Viewport;
