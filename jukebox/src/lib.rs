pub mod backend;
pub mod config;
pub mod core;
pub mod display;
pub mod playback;
pub mod prelude;
pub mod render;
pub mod runtime;

pub use runtime::app::{Collaborators, Runtime};
