pub mod auto_advance;
pub mod fade;
pub mod input;
pub mod library;
pub mod menu;
pub mod orchestrator;
pub mod producers;
pub mod state;
pub mod switch_guard;

pub use input::{Action, InputEvent, InputSource};
pub use library::{GameEntry, Library, Playlist, PlaylistItem};
pub use orchestrator::{FramePlan, Mode, Orchestrator, Request, UiLayer};
pub use producers::{
    RenderContext, TransportState, UiCompositor, UiView, VideoBackend,
};
pub use state::{IntroPhase, PlaybackSessionState};
