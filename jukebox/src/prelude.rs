pub use crate::backend::simulated::{ScriptedInput, SimulatedUi, SimulatedVideo};
pub use crate::backend::virtual_display::VirtualDisplay;
pub use crate::backend::virtual_gpu::{VirtualGpu, VirtualRenderContext};
pub use crate::config::{EmulatorConfig, KioskConfig, Timings};
pub use crate::core::error::{InitError, InitStage};
pub use crate::core::logging::init_logger;
pub use crate::core::logging::{debug, error, info, trace, warn};
pub use crate::display::{
    DisplayDevice, DisplayHandle, DisplayMode, Resolution, ResolutionPolicy,
    Viewport,
};
pub use crate::playback::{
    Action, FramePlan, GameEntry, InputEvent, InputSource, Library, Mode,
    Orchestrator, Playlist, PlaylistItem, RenderContext, Request,
    UiCompositor, UiView, VideoBackend,
};
pub use crate::render::{FramePresenter, GpuSurface};
pub use crate::runtime::app::{Collaborators, Runtime};
pub use crate::runtime::events::{
    RuntimeCommand, RuntimeCommandReceiver, RuntimeCommandSender, RuntimeEvent,
    RuntimeEventReceiver, RuntimeEventSender, command_channel, event_channel,
};
pub use crate::runtime::frame_clock::FrameClock;
pub use crate::runtime::launcher::{EmulatorLauncher, GameLauncher};
pub use crate::runtime::settings::Settings;
pub use crate::runtime::settings_watch::SettingsWatch;
pub use crate::runtime::storage;
